use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};
use tracing::{info, instrument, warn};

use super::{Capability, DetectorAdapter, DetectorOutput, DetectorService, InferenceRequest, ModelConfig};
use crate::error::DetectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Registered but not yet initialized.
    Pending,
    Ready,
    /// Model failed to load. Stays disabled for the rest of the session.
    Disabled,
}

/// One registered detector plus the service stack used to call it.
pub struct DetectorSlot {
    capability: Capability,
    adapter: Arc<Mutex<Box<dyn DetectorAdapter>>>,
    service: BoxService<InferenceRequest, DetectorOutput, BoxError>,
    timeout: Option<Duration>,
    readiness: Readiness,
}

impl DetectorSlot {
    pub fn new(adapter: Box<dyn DetectorAdapter>, timeout: Option<Duration>) -> Self {
        let capability = adapter.capability();
        let adapter = Arc::new(Mutex::new(adapter));
        let service = ServiceBuilder::new()
            .option_layer(timeout.map(TimeoutLayer::new))
            .service(DetectorService::new(adapter.clone()));

        Self {
            capability,
            adapter,
            service: BoxService::new(service),
            timeout,
            readiness: Readiness::Pending,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    /// Loads the model once. Slots that are already ready or disabled are left alone.
    #[instrument(skip(self, config), fields(capability = %self.capability))]
    pub async fn initialize(&mut self, config: &ModelConfig) -> Readiness {
        if self.readiness != Readiness::Pending {
            return self.readiness;
        }

        let result = self.adapter.lock().await.initialize(config).await;
        self.readiness = match result {
            Ok(()) => {
                info!("Detector {} ready", self.capability);
                Readiness::Ready
            }
            Err(e) => {
                warn!(
                    "Detector {} failed to initialize, disabling it for this session: {}",
                    self.capability, e
                );
                Readiness::Disabled
            }
        };
        self.readiness
    }

    /// Runs one inference through the service stack.
    pub async fn infer(&mut self, request: InferenceRequest) -> Result<DetectorOutput, DetectorError> {
        if !self.is_ready() {
            return Err(DetectorError::NotReady);
        }

        let timeout = self.timeout;
        let service = ServiceExt::<InferenceRequest>::ready(&mut self.service)
            .await
            .map_err(|e| classify(e, timeout))?;
        let output = service
            .call(request)
            .await
            .map_err(|e| classify(e, timeout))?;

        if output.capability() != self.capability {
            return Err(DetectorError::CapabilityMismatch {
                expected: self.capability,
                actual: output.capability(),
            });
        }
        Ok(output)
    }
}

fn classify(error: BoxError, timeout: Option<Duration>) -> DetectorError {
    if error.is::<Elapsed>() {
        return DetectorError::Timeout(timeout.unwrap_or_default());
    }
    match error.downcast::<DetectorError>() {
        Ok(detector_error) => *detector_error,
        Err(other) => DetectorError::Inference(other.to_string()),
    }
}
