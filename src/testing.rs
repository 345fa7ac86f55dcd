//! Fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};

use crate::capture::{CaptureConstraints, CaptureDevice};
use crate::common::Frame;
use crate::error::{DetectorError, DeviceError, RenderError};
use crate::pipeline::detector::{Capability, DetectorAdapter, DetectorOutput, ModelConfig};
use crate::pipeline::domain::{
    BlendShape, BoundingBox, Category, Detection, DetectionResult, Face, FaceResult, GestureResult,
    Hand, HandSide, Handedness, Landmark, SegmentationMask,
};
use crate::render::{Overlay, RenderSurface};

pub const TEST_FRAME_WIDTH: u32 = 32;
pub const TEST_FRAME_HEIGHT: u32 = 24;

pub fn test_frame(id: u64) -> Frame {
    let image = RgbImage::from_fn(TEST_FRAME_WIDTH, TEST_FRAME_HEIGHT, |x, y| {
        Rgb([(x * 8) as u8, (y * 10) as u8, 128])
    });
    Frame::new(id, DynamicImage::ImageRgb8(image), id as i64 * 33)
}

/// A face with a full 478-point mesh (irises included) and blinks summing to 0.3.
pub fn sample_face() -> Face {
    let landmarks = (0..478)
        .map(|i| {
            let angle = i as f32 * 0.1;
            Landmark::new(0.5 + 0.3 * angle.cos(), 0.5 + 0.3 * angle.sin(), 0.0)
        })
        .collect();
    Face::new(
        landmarks,
        vec![
            BlendShape::new("eyeBlinkLeft", 0.2),
            BlendShape::new("eyeBlinkRight", 0.1),
            BlendShape::new("mouthSmileLeft", 0.4),
        ],
    )
}

pub fn sample_hand() -> Hand {
    let landmarks = (0..21)
        .map(|i| Landmark::new(0.2 + i as f32 * 0.03, 0.8 - i as f32 * 0.02, 0.0))
        .collect();
    Hand::new(
        Category::new("Thumb_Up", 0.9),
        landmarks,
        Handedness {
            side: HandSide::Right,
            score: 0.95,
        },
    )
}

fn default_output(capability: Capability, frame: &Frame) -> DetectorOutput {
    match capability {
        Capability::ObjectDetection => DetectorOutput::Objects(DetectionResult::new(vec![
            Detection::new(
                BoundingBox::new(4.0, 4.0, 10.0, 12.0),
                vec![Category::new("person", 0.92)],
            ),
        ])),
        Capability::FaceLandmarks => DetectorOutput::Face(FaceResult::new(vec![sample_face()])),
        Capability::GestureRecognition => {
            DetectorOutput::Gestures(GestureResult::new(vec![sample_hand()]))
        }
        Capability::PersonSegmentation => DetectorOutput::Segmentation(SegmentationMask::filled(
            frame.width(),
            frame.height(),
            0.9,
        )),
    }
}

/// Call counters shared between a [`ScriptedDetector`] and the test.
#[derive(Clone, Default)]
pub struct DetectorCalls {
    initialize_calls: Arc<AtomicUsize>,
    infer_calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(u64, i64)>>>,
}

impl DetectorCalls {
    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub fn infer_calls(&self) -> usize {
        self.infer_calls.load(Ordering::SeqCst)
    }

    pub fn seen_frames(&self) -> Vec<u64> {
        self.requests.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.requests.lock().unwrap().iter().map(|(_, ts)| *ts).collect()
    }
}

/// Detector whose behaviour is set up front by the test.
pub struct ScriptedDetector {
    capability: Capability,
    produces: Capability,
    output: Option<DetectorOutput>,
    fail_initialize: bool,
    /// 1-based call number from which inference starts failing.
    fail_infer_from: Option<usize>,
    delay: Option<Duration>,
    initialize_delay: Option<Duration>,
    calls: DetectorCalls,
}

impl ScriptedDetector {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            produces: capability,
            output: None,
            fail_initialize: false,
            fail_infer_from: None,
            delay: None,
            initialize_delay: None,
            calls: DetectorCalls::default(),
        }
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn failing_infer(self) -> Self {
        self.failing_infer_from(1)
    }

    pub fn failing_infer_from(mut self, call: usize) -> Self {
        self.fail_infer_from = Some(call);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_initialize_delay(mut self, delay: Duration) -> Self {
        self.initialize_delay = Some(delay);
        self
    }

    /// Reports one capability but produces another kind of result.
    pub fn producing(mut self, capability: Capability) -> Self {
        self.produces = capability;
        self
    }

    pub fn with_output(mut self, output: DetectorOutput) -> Self {
        self.output = Some(output);
        self
    }

    pub fn calls(&self) -> DetectorCalls {
        self.calls.clone()
    }
}

#[async_trait]
impl DetectorAdapter for ScriptedDetector {
    fn capability(&self) -> Capability {
        self.capability
    }

    async fn initialize(&mut self, _config: &ModelConfig) -> Result<(), DetectorError> {
        self.calls.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.initialize_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_initialize {
            return Err(DetectorError::ModelLoad {
                capability: self.capability,
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    async fn infer(&mut self, frame: &Frame, timestamp_ms: i64) -> Result<DetectorOutput, DetectorError> {
        let call = self.calls.infer_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls
            .requests
            .lock()
            .unwrap()
            .push((frame.id(), timestamp_ms));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_infer_from.is_some_and(|from| call >= from) {
            return Err(DetectorError::Inference("scripted failure".to_string()));
        }
        Ok(self
            .output
            .clone()
            .unwrap_or_else(|| default_output(self.produces, frame)))
    }
}

#[derive(Clone, Default)]
pub struct CameraCalls {
    open_calls: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
}

impl CameraCalls {
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

/// Capture device producing flat grey frames at roughly 500 fps.
pub struct FakeCamera {
    available: bool,
    resolution: Option<(u32, u32)>,
    close_delay: Option<Duration>,
    calls: CameraCalls,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self {
            available: true,
            resolution: None,
            close_delay: None,
            calls: CameraCalls::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Makes `close` block like hardware that takes a while to release.
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> CameraCalls {
        self.calls.clone()
    }
}

impl CaptureDevice for FakeCamera {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<(u32, u32), DeviceError> {
        self.calls.open_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(DeviceError::Unavailable("no camera attached".to_string()));
        }
        let resolution = (constraints.width, constraints.height);
        self.resolution = Some(resolution);
        Ok(resolution)
    }

    fn grab(&mut self) -> Result<Option<DynamicImage>, DeviceError> {
        let (width, height) = self
            .resolution
            .ok_or_else(|| DeviceError::Read("camera not open".to_string()))?;
        std::thread::sleep(Duration::from_millis(2));
        Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([90, 90, 90]),
        ))))
    }

    fn close(&mut self) {
        if let Some(delay) = self.close_delay {
            std::thread::sleep(delay);
        }
        self.calls.close_calls.fetch_add(1, Ordering::SeqCst);
        self.resolution = None;
    }
}

/// Surface that keeps every overlay it is handed.
#[derive(Clone, Default)]
pub struct RecordingSurface {
    overlays: Arc<Mutex<Vec<Overlay>>>,
    rejecting: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses every overlay with a surface error.
    pub fn rejecting() -> Self {
        Self {
            rejecting: true,
            ..Self::default()
        }
    }

    pub fn overlays(&self) -> Vec<Overlay> {
        self.overlays.lock().unwrap().clone()
    }
}

impl RenderSurface for RecordingSurface {
    fn present(&mut self, overlay: Overlay) -> Result<(), RenderError> {
        if self.rejecting {
            return Err(RenderError::Surface("surface closed".to_string()));
        }
        self.overlays.lock().unwrap().push(overlay);
        Ok(())
    }
}
