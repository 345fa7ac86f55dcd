use std::time::{Duration, Instant};

use image::{DynamicImage, Rgb, RgbImage};

use super::{CaptureConstraints, CaptureDevice};
use crate::error::DeviceError;

/// Test-pattern camera: a diagonal gradient that scrolls over time.
pub struct SyntheticCamera {
    fps: u32,
    resolution: Option<(u32, u32)>,
    started_at: Instant,
    next_grab: Instant,
}

impl SyntheticCamera {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            resolution: None,
            started_at: Instant::now(),
            next_grab: Instant::now(),
        }
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }
}

impl CaptureDevice for SyntheticCamera {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(u32, u32), DeviceError> {
        if constraints.width == 0 || constraints.height == 0 {
            return Err(DeviceError::Unavailable(format!(
                "unsupported resolution {}x{}",
                constraints.width, constraints.height
            )));
        }
        self.resolution = Some((constraints.width, constraints.height));
        self.started_at = Instant::now();
        self.next_grab = self.started_at;
        Ok((constraints.width, constraints.height))
    }

    fn grab(&mut self) -> Result<Option<DynamicImage>, DeviceError> {
        let (width, height) = self
            .resolution
            .ok_or_else(|| DeviceError::Read("device is not open".to_string()))?;

        let now = Instant::now();
        if now < self.next_grab {
            std::thread::sleep(self.next_grab - now);
        }
        self.next_grab += self.frame_period();

        let shift = (self.started_at.elapsed().as_millis() / 10) as u32;
        let image = RgbImage::from_fn(width, height, |x, y| {
            let r = (((x + shift) % width) * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            Rgb([r, g, 128])
        });
        Ok(Some(DynamicImage::ImageRgb8(image)))
    }

    fn close(&mut self) {
        self.resolution = None;
    }
}
