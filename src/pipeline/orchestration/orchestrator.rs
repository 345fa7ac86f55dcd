use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, instrument, warn, Instrument};
use uuid::Uuid;

use super::result_buffer::{ResultBuffer, Snapshot};
use crate::capture::FrameStream;
use crate::common::Frame;
use crate::config::{Configuration, SchedulerConfig};
use crate::error::{DetectorError, RenderError};
use crate::pipeline::context::{CycleContext, DetectorOutcome};
use crate::pipeline::detector::{
    Capability, DetectorOutput, DetectorSlot, InferenceRequest, ModelConfig, Readiness,
};
use crate::render::{Compositor, RenderSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorPhase {
    Idle,
    Dispatching,
    Aggregating,
    Rendered,
}

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The source has not produced a frame yet.
    NoFrame,
    /// Same frame as last cycle; the last results were drawn again.
    Stale { frame_id: u64 },
    Rendered {
        frame_id: u64,
        /// Capabilities whose result was replaced this cycle.
        updated: Vec<Capability>,
    },
    /// Composition or presentation failed; the frame produced no overlay.
    RenderFailed { frame_id: u64 },
}

/// Strictly increasing millisecond timestamps for dispatch.
struct DispatchClock {
    epoch: Instant,
    last: Option<i64>,
}

impl DispatchClock {
    fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last: None,
        }
    }

    fn next(&mut self) -> i64 {
        let now = self.epoch.elapsed().as_millis() as i64;
        let timestamp = match self.last {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last = Some(timestamp);
        timestamp
    }
}

/// Runs one cycle at a time: fan out the current frame to every ready
/// detector, wait for all of them, commit what came back, then compose.
pub struct PipelineOrchestrator {
    run_id: Uuid,
    slots: Vec<DetectorSlot>,
    results: ResultBuffer,
    compositor: Compositor,
    surface: Box<dyn RenderSurface>,
    scheduler: SchedulerConfig,
    phase: OrchestratorPhase,
    last_frame_id: Option<u64>,
    clock: DispatchClock,
}

impl PipelineOrchestrator {
    pub fn new(
        slots: Vec<DetectorSlot>,
        compositor: Compositor,
        surface: Box<dyn RenderSurface>,
        scheduler: SchedulerConfig,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            slots,
            results: ResultBuffer::new(),
            compositor,
            surface,
            scheduler,
            phase: OrchestratorPhase::Idle,
            last_frame_id: None,
            clock: DispatchClock::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn phase(&self) -> OrchestratorPhase {
        self.phase
    }

    pub fn results(&self) -> &ResultBuffer {
        &self.results
    }

    pub fn readiness(&self) -> Vec<(Capability, Readiness)> {
        self.slots
            .iter()
            .map(|slot| (slot.capability(), slot.readiness()))
            .collect()
    }

    /// Loads every pending detector concurrently. Failures disable only the
    /// detector that failed.
    pub async fn initialize_detectors(
        &mut self,
        configuration: &Configuration,
    ) -> Vec<(Capability, Readiness)> {
        let pending = self.slots.iter_mut().map(|slot| {
            let model_config = ModelConfig::for_capability(slot.capability(), configuration);
            async move {
                let readiness = slot.initialize(&model_config).await;
                (slot.capability(), readiness)
            }
        });
        let readiness = join_all(pending).await;

        let ready = readiness
            .iter()
            .filter(|(_, state)| *state == Readiness::Ready)
            .count();
        info!(
            "{} of {} detectors ready",
            ready,
            readiness.len()
        );
        readiness
    }

    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run_cycle(&mut self, frames: &FrameStream) -> CycleOutcome {
        let Some(frame) = frames.current() else {
            return CycleOutcome::NoFrame;
        };
        let frame_id = frame.id();

        if self.last_frame_id == Some(frame_id) {
            let snapshot = self.results.snapshot(frame, true);
            return match self.render(&snapshot) {
                Ok(()) => CycleOutcome::Stale { frame_id },
                Err(_) => CycleOutcome::RenderFailed { frame_id },
            };
        }
        self.last_frame_id = Some(frame_id);

        let context = CycleContext::new(frame);
        self.phase = OrchestratorPhase::Dispatching;
        let outcomes = self.dispatch(context.frame()).await;

        let mut context = context.into_aggregated(outcomes);
        self.phase = OrchestratorPhase::Aggregating;
        let aggregate_start = Instant::now();
        let dimensions = context.frame().dimensions();
        let updated = self.commit(frame_id, dimensions, context.take_outcomes());
        let snapshot = self.results.snapshot(context.frame().clone(), false);
        context.record_aggregate(aggregate_start.elapsed());

        let render_start = Instant::now();
        let rendered = self.render(&snapshot);
        context.record_render(render_start.elapsed());
        self.phase = OrchestratorPhase::Rendered;

        let state = context.state_name();
        let captured_at = context.frame().captured_at();
        let metrics = context.finish();
        debug!(
            frame_id,
            %captured_at,
            state,
            dispatch_us = metrics.dispatch_duration().map_or(0, |d| d.as_micros() as u64),
            aggregate_us = metrics.aggregate_duration().map_or(0, |d| d.as_micros() as u64),
            render_us = metrics.render_duration().map_or(0, |d| d.as_micros() as u64),
            total_us = metrics.total_us(),
            "Cycle complete"
        );

        match rendered {
            Ok(()) => CycleOutcome::Rendered { frame_id, updated },
            Err(_) => CycleOutcome::RenderFailed { frame_id },
        }
    }

    async fn dispatch(&mut self, frame: &Frame) -> Vec<DetectorOutcome> {
        let timestamp_ms = self.clock.next();
        let calls = self
            .slots
            .iter_mut()
            .filter(|slot| slot.is_ready())
            .map(|slot| {
                let capability = slot.capability();
                let request = InferenceRequest::new(frame.clone(), timestamp_ms);
                async move { (capability, slot.infer(request).await) }
                    .instrument(debug_span!("infer", capability = %capability))
            });
        join_all(calls).await
    }

    /// Commits successful outputs. Failed or skipped detectors keep their
    /// previous result. A mask that does not cover the frame counts as a
    /// failed inference.
    fn commit(
        &mut self,
        frame_id: u64,
        dimensions: (u32, u32),
        outcomes: Vec<DetectorOutcome>,
    ) -> Vec<Capability> {
        let mut updated = Vec::with_capacity(outcomes.len());
        for (capability, outcome) in outcomes {
            match outcome.and_then(|output| aligned_output(output, dimensions)) {
                Ok(output) => {
                    self.results.commit(frame_id, output);
                    updated.push(capability);
                }
                Err(DetectorError::Busy) => {
                    debug!("{} still busy with an earlier frame, skipped", capability)
                }
                Err(e) => warn!("{} produced no update for frame {}: {}", capability, frame_id, e),
            }
        }
        updated.sort();
        updated
    }

    fn render(&mut self, snapshot: &Snapshot) -> Result<(), RenderError> {
        let result = self
            .compositor
            .compose(snapshot)
            .and_then(|overlay| self.surface.present(overlay));
        if let Err(e) = &result {
            warn!("Skipping overlay for frame {}: {}", snapshot.frame.id(), e);
        }
        result
    }

    /// Cycles until cancelled. The token is checked at the top of every
    /// cycle; a cycle already dispatched runs to completion.
    pub async fn run(mut self, frames: FrameStream, cancel_token: CancellationToken) -> Self {
        info!(run_id = %self.run_id, "Orchestrator loop started");

        while !cancel_token.is_cancelled() {
            let pause = match self.run_cycle(&frames).await {
                CycleOutcome::NoFrame | CycleOutcome::Stale { .. } => self.scheduler.idle_backoff(),
                CycleOutcome::Rendered { .. } | CycleOutcome::RenderFailed { .. } => {
                    self.scheduler.frame_interval()
                }
            };

            if pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = cancel_token.cancelled() => {}
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        self.phase = OrchestratorPhase::Idle;
        info!(run_id = %self.run_id, "Orchestrator loop stopped");
        self
    }
}

fn aligned_output(
    output: DetectorOutput,
    dimensions: (u32, u32),
) -> Result<DetectorOutput, DetectorError> {
    match &output {
        DetectorOutput::Segmentation(mask) if mask.dimensions() != dimensions => {
            Err(DetectorError::Inference(format!(
                "mask is {:?} but frame is {:?}",
                mask.dimensions(),
                dimensions
            )))
        }
        _ => Ok(output),
    }
}
