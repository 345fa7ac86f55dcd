pub mod capture_source;
pub mod synthetic;

use image::DynamicImage;
use tokio::sync::watch;

use crate::common::Frame;
use crate::config::CaptureConfig;
use crate::error::DeviceError;

pub use capture_source::CaptureSource;
pub use synthetic::SyntheticCamera;

/// Requested capture resolution. Devices treat it as an ideal, not a hard limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
}

impl From<CaptureConfig> for CaptureConstraints {
    fn from(config: CaptureConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
        }
    }
}

/// Read side of a running source. Always yields the most recent frame.
#[derive(Clone)]
pub struct FrameStream {
    frames: watch::Receiver<Option<Frame>>,
}

impl FrameStream {
    pub fn new(frames: watch::Receiver<Option<Frame>>) -> Self {
        Self { frames }
    }

    pub fn current(&self) -> Option<Frame> {
        self.frames.borrow().clone()
    }
}

/// Live source of sequential frames.
pub trait FrameSource: Send {
    /// Acquires the device. Calling it while running hands out another stream
    /// without reopening anything.
    fn start(&mut self, constraints: CaptureConstraints) -> Result<FrameStream, DeviceError>;

    /// Releases the device. No-op when already stopped.
    fn stop(&mut self);

    fn current_frame(&self) -> Option<Frame>;

    fn is_running(&self) -> bool;
}

/// Raw hardware access used by [`CaptureSource`].
pub trait CaptureDevice: Send + 'static {
    /// Returns the resolution actually negotiated.
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(u32, u32), DeviceError>;

    /// Blocks until the next image is available. `Ok(None)` means nothing yet.
    fn grab(&mut self) -> Result<Option<DynamicImage>, DeviceError>;

    fn close(&mut self);
}
