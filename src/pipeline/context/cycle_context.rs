use std::time::{Duration, Instant};

use crate::common::Frame;
use crate::error::DetectorError;
use crate::pipeline::context::metrics::CycleMetrics;
use crate::pipeline::context::state::{AggregatedState, IngestedState, ProcessingState};
use crate::pipeline::detector::{Capability, DetectorOutput};

/// What one detector returned for the cycle's frame.
pub type DetectorOutcome = (Capability, Result<DetectorOutput, DetectorError>);

// CycleContext with compile-time state tracking of how far the cycle got
pub struct CycleContext<S> {
    frame: Frame,
    metrics: CycleMetrics,
    cycle_start: Instant,
    state: S,
}

impl<S> CycleContext<S> {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn metrics(&self) -> &CycleMetrics {
        &self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.cycle_start.elapsed()
    }
}

impl<S: ProcessingState> CycleContext<S> {
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }
}

impl CycleContext<IngestedState> {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            metrics: CycleMetrics::new(),
            cycle_start: Instant::now(),
            state: IngestedState,
        }
    }

    pub fn into_aggregated(mut self, outcomes: Vec<DetectorOutcome>) -> CycleContext<AggregatedState> {
        self.metrics.record_dispatch_duration(self.elapsed());
        CycleContext::<AggregatedState> {
            frame: self.frame,
            metrics: self.metrics,
            cycle_start: self.cycle_start,
            state: AggregatedState { outcomes },
        }
    }
}

impl CycleContext<AggregatedState> {
    pub fn outcomes(&self) -> &[DetectorOutcome] {
        &self.state.outcomes
    }

    /// Hands the outcomes to the caller for committing, leaving the context
    /// around for timing.
    pub fn take_outcomes(&mut self) -> Vec<DetectorOutcome> {
        std::mem::take(&mut self.state.outcomes)
    }

    pub fn record_aggregate(&mut self, duration: Duration) {
        self.metrics.record_aggregate_duration(duration);
    }

    pub fn record_render(&mut self, duration: Duration) {
        self.metrics.record_render_duration(duration);
    }

    pub fn finish(mut self) -> CycleMetrics {
        self.metrics.finalize(self.cycle_start);
        self.metrics
    }
}
