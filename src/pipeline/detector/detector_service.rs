use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::Mutex;
use tower::{BoxError, Service};
use tracing::Instrument;

use super::{DetectorAdapter, DetectorOutput};
use crate::common::Frame;
use crate::error::DetectorError;

#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub frame: Frame,
    pub timestamp_ms: i64,
}

impl InferenceRequest {
    pub fn new(frame: Frame, timestamp_ms: i64) -> Self {
        Self {
            frame,
            timestamp_ms,
        }
    }
}

/// Tower service over a single detector.
///
/// Each call runs on its own task holding the detector lock. If an outer
/// timeout gives up on the call, the task keeps draining and the detector
/// reports `Busy` until it finishes; its late result is dropped.
#[derive(Clone)]
pub struct DetectorService {
    inner: Arc<Mutex<Box<dyn DetectorAdapter>>>,
}

impl DetectorService {
    pub fn new(inner: Arc<Mutex<Box<dyn DetectorAdapter>>>) -> Self {
        Self { inner }
    }
}

impl Service<InferenceRequest> for DetectorService {
    type Response = DetectorOutput;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: InferenceRequest) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let mut detector = inner
                .try_lock_owned()
                .map_err(|_| DetectorError::Busy)?;
            let span = tracing::debug_span!("infer", frame = req.frame.id());
            let task = tokio::spawn(
                async move { detector.infer(&req.frame, req.timestamp_ms).await }.instrument(span),
            );
            let output = task
                .await
                .map_err(|e| DetectorError::Inference(format!("detector task failed: {}", e)))??;
            Ok::<_, BoxError>(output)
        })
    }
}
