use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{CaptureConstraints, CaptureDevice, FrameSource, FrameStream};
use crate::common::Frame;
use crate::error::DeviceError;

const EMPTY_GRAB_BACKOFF: Duration = Duration::from_millis(2);
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Frame source that pumps a [`CaptureDevice`] on a dedicated thread.
///
/// The device is handed to the thread on start and handed back when the thread
/// exits, after it has been closed, so `stop` returns only once the hardware is
/// released.
pub struct CaptureSource {
    device: Option<Box<dyn CaptureDevice>>,
    frames: watch::Sender<Option<Frame>>,
    next_frame_id: Arc<AtomicU64>,
    epoch: Instant,
    cancel_token: CancellationToken,
    capture_thread: Option<JoinHandle<Box<dyn CaptureDevice>>>,
}

impl CaptureSource {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            device: Some(device),
            frames,
            next_frame_id: Arc::new(AtomicU64::new(1)),
            epoch: Instant::now(),
            cancel_token: CancellationToken::new(),
            capture_thread: None,
        }
    }

    fn stream(&self) -> FrameStream {
        FrameStream::new(self.frames.subscribe())
    }
}

impl FrameSource for CaptureSource {
    fn start(&mut self, constraints: CaptureConstraints) -> Result<FrameStream, DeviceError> {
        if self.capture_thread.is_some() {
            return Ok(self.stream());
        }

        let mut device = self.device.take().ok_or_else(|| {
            DeviceError::Unavailable("capture device was lost by a failed capture thread".to_string())
        })?;
        let (width, height) = match device.open(&constraints) {
            Ok(resolution) => resolution,
            Err(e) => {
                self.device = Some(device);
                return Err(e);
            }
        };
        info!("Capture device opened at {}x{}", width, height);

        self.cancel_token = CancellationToken::new();
        let capture = CaptureLoop {
            device,
            frames: self.frames.clone(),
            next_frame_id: self.next_frame_id.clone(),
            epoch: self.epoch,
        };
        let cancel_token = self.cancel_token.clone();
        self.capture_thread = Some(std::thread::spawn(move || capture.run(cancel_token)));

        Ok(self.stream())
    }

    fn stop(&mut self) {
        let Some(thread) = self.capture_thread.take() else {
            return;
        };
        self.cancel_token.cancel();
        match thread.join() {
            Ok(device) => self.device = Some(device),
            Err(_) => error!("Capture thread panicked; device handle lost"),
        }
        self.frames.send_replace(None);
        info!("Capture device released");
    }

    fn current_frame(&self) -> Option<Frame> {
        self.frames.borrow().clone()
    }

    fn is_running(&self) -> bool {
        self.capture_thread.is_some()
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CaptureLoop {
    device: Box<dyn CaptureDevice>,
    frames: watch::Sender<Option<Frame>>,
    next_frame_id: Arc<AtomicU64>,
    epoch: Instant,
}

impl CaptureLoop {
    fn run(mut self, cancel_token: CancellationToken) -> Box<dyn CaptureDevice> {
        while !cancel_token.is_cancelled() {
            match self.device.grab() {
                Ok(Some(image)) => {
                    let id = self.next_frame_id.fetch_add(1, Ordering::Relaxed);
                    let timestamp_ms = self.epoch.elapsed().as_millis() as i64;
                    self.frames.send_replace(Some(Frame::new(id, image, timestamp_ms)));
                }
                Ok(None) => std::thread::sleep(EMPTY_GRAB_BACKOFF),
                Err(e) => {
                    warn!("Capture device read failed: {}", e);
                    std::thread::sleep(READ_ERROR_BACKOFF);
                }
            }
        }
        self.device.close();
        self.device
    }
}
