use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capture::{CaptureConstraints, FrameSource};
use crate::common::Frame;
use crate::config::{Configuration, OverlayConfig, SchedulerConfig};
use crate::error::{AppError, ConfigError};
use crate::pipeline::detector::{Capability, DetectorAdapter, DetectorSlot};
use crate::pipeline::orchestration::PipelineOrchestrator;
use crate::render::{Compositor, RenderSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Starting,
    Running,
    Stopping,
    /// Start failed. Needs `acknowledge` before another start.
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct RunningPipeline {
    cancel_token: CancellationToken,
    task: JoinHandle<PipelineOrchestrator>,
}

type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;

fn lock_source(source: &Mutex<Box<dyn FrameSource>>) -> MutexGuard<'_, Box<dyn FrameSource>> {
    source.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Restores `fallback` if a transition is dropped while still in `during`.
struct TransitionGuard<'a> {
    state: &'a watch::Sender<PipelineState>,
    during: PipelineState,
    fallback: PipelineState,
}

impl<'a> TransitionGuard<'a> {
    fn new(
        state: &'a watch::Sender<PipelineState>,
        during: PipelineState,
        fallback: PipelineState,
    ) -> Self {
        Self {
            state,
            during,
            fallback,
        }
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|state| {
            if *state != self.during {
                return false;
            }
            warn!("Pipeline {} interrupted, back to {}", self.during, self.fallback);
            *state = self.fallback;
            true
        });
    }
}

/// Owns the frame source and the orchestrator loop, and is the only writer
/// of [`PipelineState`].
pub struct Coordinator {
    session_id: Uuid,
    configuration: Configuration,
    source: SharedSource,
    orchestrator: Option<PipelineOrchestrator>,
    running: Option<RunningPipeline>,
    state: watch::Sender<PipelineState>,
}

impl Coordinator {
    fn new(
        configuration: Configuration,
        source: Box<dyn FrameSource>,
        orchestrator: PipelineOrchestrator,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            session_id: Uuid::new_v4(),
            configuration,
            source: Arc::new(Mutex::new(source)),
            orchestrator: Some(orchestrator),
            running: None,
            state,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn current_frame(&self) -> Option<Frame> {
        lock_source(&self.source).current_frame()
    }

    fn set_state(&self, next: PipelineState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(session_id = %self.session_id, "Pipeline {} -> {}", previous, next);
        }
    }

    /// Loads the detectors, acquires the capture device and starts the
    /// cycle loop. Does nothing if the pipeline is already up.
    ///
    /// Dropping the returned future before it completes leaves the pipeline
    /// Idle with the device untouched.
    pub async fn start(&mut self) -> Result<(), AppError> {
        match self.state() {
            PipelineState::Starting | PipelineState::Running => return Ok(()),
            PipelineState::Failed => {
                return Err(AppError::Lifecycle(
                    "pipeline failed to start; acknowledge the failure first".to_string(),
                ))
            }
            PipelineState::Stopping => {
                return Err(AppError::Lifecycle("pipeline is still stopping".to_string()))
            }
            PipelineState::Idle => {}
        }
        self.set_state(PipelineState::Starting);
        let _guard = TransitionGuard::new(&self.state, PipelineState::Starting, PipelineState::Idle);

        let Some(orchestrator) = self.orchestrator.as_mut() else {
            self.set_state(PipelineState::Failed);
            return Err(AppError::Lifecycle(
                "orchestrator was lost by an earlier run".to_string(),
            ));
        };
        orchestrator.initialize_detectors(&self.configuration).await;

        let constraints = CaptureConstraints::from(self.configuration.capture);
        let started = lock_source(&self.source).start(constraints);
        let frames = match started {
            Ok(frames) => frames,
            Err(e) => {
                error!("Failed to acquire capture device: {}", e);
                self.set_state(PipelineState::Failed);
                return Err(e.into());
            }
        };

        let orchestrator = self.orchestrator.take().ok_or_else(|| {
            AppError::Lifecycle("orchestrator was lost by an earlier run".to_string())
        })?;
        let run_id = orchestrator.run_id();
        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(orchestrator.run(frames, cancel_token.clone()));
        self.running = Some(RunningPipeline { cancel_token, task });
        self.set_state(PipelineState::Running);
        info!(session_id = %self.session_id, %run_id, "Pipeline running");
        Ok(())
    }

    /// Stops the loop after its current cycle and releases the capture
    /// device. Does nothing unless running.
    ///
    /// If the returned future is dropped early the state goes back to
    /// Running; calling `stop` again finishes the release.
    pub async fn stop(&mut self) {
        if self.state() != PipelineState::Running {
            return;
        }
        self.set_state(PipelineState::Stopping);
        let _guard =
            TransitionGuard::new(&self.state, PipelineState::Stopping, PipelineState::Running);

        if let Some(running) = self.running.as_mut() {
            running.cancel_token.cancel();
            match (&mut running.task).await {
                Ok(orchestrator) => self.orchestrator = Some(orchestrator),
                Err(e) => error!("Orchestrator task ended abnormally: {}", e),
            }
            self.running = None;
        }

        // Joining the capture thread blocks until the device is closed.
        let source = self.source.clone();
        let released = tokio::task::spawn_blocking(move || lock_source(&source).stop()).await;
        if let Err(e) = released {
            error!("Releasing the capture device failed: {}", e);
        }
        self.set_state(PipelineState::Idle);
    }

    /// Clears a failed start so the pipeline can be started again.
    pub fn acknowledge(&mut self) {
        if self.state() == PipelineState::Failed {
            self.set_state(PipelineState::Idle);
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel_token.cancel();
            running.task.abort();
        }
        // Blocks until the capture thread has released the device.
        lock_source(&self.source).stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    source: Option<Box<dyn FrameSource>>,
    detectors: Vec<Box<dyn DetectorAdapter>>,
    surface: Option<Box<dyn RenderSurface>>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            source: None,
            detectors: Vec::new(),
            surface: None,
        }
    }

    pub fn frame_source(mut self, source: Box<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Registers a detector. One per capability.
    pub fn detector(mut self, detector: Box<dyn DetectorAdapter>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    // Replaces the overlay toggles, this will override the default configuration.
    pub fn overlay(mut self, overlay: OverlayConfig) -> Self {
        self.configuration.overlay = overlay;
        self
    }

    // Replaces the scheduler settings, this will override the default configuration.
    pub fn scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.configuration.scheduler = scheduler;
        self
    }

    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let source = self
            .source
            .ok_or_else(|| ConfigError::Invalid("Frame source not set".to_string()))?;
        let surface = self
            .surface
            .ok_or_else(|| ConfigError::Invalid("Render surface not set".to_string()))?;

        let mut registered = BTreeSet::new();
        for detector in &self.detectors {
            if !registered.insert(detector.capability()) {
                return Err(ConfigError::DuplicateCapability(detector.capability()).into());
            }
        }

        let segmentation_enabled = self.configuration.overlay.segmentation_enabled;
        let timeout = self.configuration.scheduler.detector_timeout();
        let slots = self
            .detectors
            .into_iter()
            .filter(|detector| {
                let keep = segmentation_enabled
                    || detector.capability() != Capability::PersonSegmentation;
                if !keep {
                    debug!("Segmentation disabled, not scheduling {}", detector.capability());
                }
                keep
            })
            .map(|detector| DetectorSlot::new(detector, timeout))
            .collect();

        let orchestrator = PipelineOrchestrator::new(
            slots,
            Compositor::from_config(&self.configuration.overlay),
            surface,
            self.configuration.scheduler,
        );
        Ok(Coordinator::new(self.configuration, source, orchestrator))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::capture::CaptureSource;
    use crate::error::DeviceError;
    use crate::render::Layer;
    use crate::testing::{FakeCamera, RecordingSurface, ScriptedDetector};

    fn configuration() -> Configuration {
        Configuration::default().with_capture_size(32, 24)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let camera = FakeCamera::new();
        let camera_calls = camera.calls();
        let detector = ScriptedDetector::new(Capability::FaceLandmarks);
        let detector_calls = detector.calls();
        let mut coordinator = CoordinatorBuilder::new(configuration())
            .frame_source(Box::new(CaptureSource::new(Box::new(camera))))
            .detector(Box::new(detector))
            .surface(Box::new(RecordingSurface::new()))
            .build()
            .unwrap();

        coordinator.start().await.unwrap();
        coordinator.start().await.unwrap();
        assert_eq!(coordinator.state(), PipelineState::Running);
        assert_eq!(camera_calls.open_calls(), 1);
        assert_eq!(detector_calls.initialize_calls(), 1);

        coordinator.stop().await;
        assert_eq!(coordinator.state(), PipelineState::Idle);
        assert_eq!(camera_calls.close_calls(), 1);
    }

    #[tokio::test]
    async fn stop_releases_device_and_halts_dispatch() {
        let camera = FakeCamera::new();
        let camera_calls = camera.calls();
        let detector =
            ScriptedDetector::new(Capability::ObjectDetection).with_delay(Duration::from_millis(10));
        let detector_calls = detector.calls();
        let mut coordinator = CoordinatorBuilder::new(configuration())
            .frame_source(Box::new(CaptureSource::new(Box::new(camera))))
            .detector(Box::new(detector))
            .surface(Box::new(RecordingSurface::new()))
            .build()
            .unwrap();

        coordinator.start().await.unwrap();
        wait_until(|| detector_calls.infer_calls() > 0).await;
        coordinator.stop().await;

        let calls_at_stop = detector_calls.infer_calls();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(detector_calls.infer_calls(), calls_at_stop);
        assert_eq!(camera_calls.close_calls(), 1);
        assert!(coordinator.current_frame().is_none());

        coordinator.stop().await;
        assert_eq!(camera_calls.close_calls(), 1);
    }

    #[tokio::test]
    async fn cancelled_start_returns_to_idle() {
        let camera = FakeCamera::new();
        let camera_calls = camera.calls();
        let detector = ScriptedDetector::new(Capability::FaceLandmarks)
            .with_initialize_delay(Duration::from_millis(200));
        let mut coordinator = CoordinatorBuilder::new(configuration())
            .frame_source(Box::new(CaptureSource::new(Box::new(camera))))
            .detector(Box::new(detector))
            .surface(Box::new(RecordingSurface::new()))
            .build()
            .unwrap();

        let attempt = tokio::time::timeout(Duration::from_millis(20), coordinator.start()).await;
        assert!(attempt.is_err());
        assert_eq!(coordinator.state(), PipelineState::Idle);
        assert_eq!(camera_calls.open_calls(), 0);

        coordinator.start().await.unwrap();
        assert_eq!(coordinator.state(), PipelineState::Running);
        assert_eq!(camera_calls.open_calls(), 1);

        coordinator.stop().await;
        assert_eq!(coordinator.state(), PipelineState::Idle);
        assert_eq!(camera_calls.close_calls(), 1);
    }

    #[tokio::test]
    async fn runtime_keeps_running_while_device_closes() {
        let camera = FakeCamera::new().with_close_delay(Duration::from_millis(60));
        let camera_calls = camera.calls();
        let mut coordinator = CoordinatorBuilder::new(configuration())
            .scheduler(SchedulerConfig {
                idle_backoff_ms: 1,
                ..SchedulerConfig::default()
            })
            .frame_source(Box::new(CaptureSource::new(Box::new(camera))))
            .surface(Box::new(RecordingSurface::new()))
            .build()
            .unwrap();
        coordinator.start().await.unwrap();

        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            })
        };
        tokio::task::yield_now().await;

        let before = ticks.load(std::sync::atomic::Ordering::SeqCst);
        coordinator.stop().await;
        let after = ticks.load(std::sync::atomic::Ordering::SeqCst);
        ticker.abort();

        assert_eq!(camera_calls.close_calls(), 1);
        assert!(after >= before + 2, "ticker advanced {} times", after - before);
    }

    #[tokio::test]
    async fn restart_reopens_device_without_reloading_models() {
        let camera = FakeCamera::new();
        let camera_calls = camera.calls();
        let detector = ScriptedDetector::new(Capability::FaceLandmarks);
        let detector_calls = detector.calls();
        let mut coordinator = CoordinatorBuilder::new(configuration())
            .frame_source(Box::new(CaptureSource::new(Box::new(camera))))
            .detector(Box::new(detector))
            .surface(Box::new(RecordingSurface::new()))
            .build()
            .unwrap();

        coordinator.start().await.unwrap();
        coordinator.stop().await;
        coordinator.start().await.unwrap();
        assert_eq!(coordinator.state(), PipelineState::Running);
        assert_eq!(camera_calls.open_calls(), 2);
        assert_eq!(detector_calls.initialize_calls(), 1);
        coordinator.stop().await;
    }

    #[tokio::test]
    async fn unavailable_device_fails_start_until_acknowledged() {
        let mut coordinator = CoordinatorBuilder::new(configuration())
            .frame_source(Box::new(CaptureSource::new(Box::new(FakeCamera::unavailable()))))
            .detector(Box::new(ScriptedDetector::new(Capability::FaceLandmarks)))
            .surface(Box::new(RecordingSurface::new()))
            .build()
            .unwrap();
        let states = coordinator.subscribe();

        let result = coordinator.start().await;
        assert!(matches!(
            result,
            Err(AppError::Device(DeviceError::Unavailable(_)))
        ));
        assert_eq!(*states.borrow(), PipelineState::Failed);

        assert!(matches!(
            coordinator.start().await,
            Err(AppError::Lifecycle(_))
        ));
        coordinator.stop().await;
        assert_eq!(coordinator.state(), PipelineState::Failed);

        coordinator.acknowledge();
        assert_eq!(coordinator.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn unloadable_model_still_runs_remaining_capabilities() {
        let gestures = ScriptedDetector::new(Capability::GestureRecognition).failing_initialize();
        let surface = RecordingSurface::new();
        let overlay = OverlayConfig {
            show_face_landmarks: true,
            show_object_detections: true,
            ..OverlayConfig::default()
        };
        let mut coordinator = CoordinatorBuilder::new(configuration())
            .overlay(overlay)
            .frame_source(Box::new(CaptureSource::new(Box::new(FakeCamera::new()))))
            .detector(Box::new(ScriptedDetector::new(Capability::FaceLandmarks)))
            .detector(Box::new(ScriptedDetector::new(Capability::ObjectDetection)))
            .detector(Box::new(gestures))
            .surface(Box::new(surface.clone()))
            .build()
            .unwrap();

        coordinator.start().await.unwrap();
        assert_eq!(coordinator.state(), PipelineState::Running);
        wait_until(|| !surface.overlays().is_empty()).await;
        coordinator.stop().await;

        let overlays = surface.overlays();
        assert!(overlays.iter().all(|overlay| !overlay.has_layer(Layer::Hands)));
        assert!(overlays.iter().all(|overlay| overlay.has_layer(Layer::FaceMesh)));
        assert!(overlays.iter().all(|overlay| overlay.person_count == 1));
    }

    #[tokio::test]
    async fn disabled_segmentation_is_never_scheduled() {
        let segmentation = ScriptedDetector::new(Capability::PersonSegmentation);
        let calls = segmentation.calls();
        let surface = RecordingSurface::new();
        let mut coordinator = CoordinatorBuilder::new(configuration())
            .frame_source(Box::new(CaptureSource::new(Box::new(FakeCamera::new()))))
            .detector(Box::new(segmentation))
            .surface(Box::new(surface.clone()))
            .build()
            .unwrap();

        coordinator.start().await.unwrap();
        wait_until(|| !surface.overlays().is_empty()).await;
        coordinator.stop().await;

        assert_eq!(calls.initialize_calls(), 0);
        assert_eq!(calls.infer_calls(), 0);
    }

    #[test]
    fn build_rejects_duplicate_capability() {
        let result = CoordinatorBuilder::new(configuration())
            .frame_source(Box::new(CaptureSource::new(Box::new(FakeCamera::new()))))
            .detector(Box::new(ScriptedDetector::new(Capability::FaceLandmarks)))
            .detector(Box::new(ScriptedDetector::new(Capability::FaceLandmarks)))
            .surface(Box::new(RecordingSurface::new()))
            .build();
        assert!(matches!(
            result,
            Err(AppError::Configuration(ConfigError::DuplicateCapability(
                Capability::FaceLandmarks
            )))
        ));
    }

    #[test]
    fn build_requires_a_frame_source() {
        let result = CoordinatorBuilder::new(configuration())
            .surface(Box::new(RecordingSurface::new()))
            .build();
        assert!(matches!(result, Err(AppError::Configuration(ConfigError::Invalid(_)))));
    }
}
