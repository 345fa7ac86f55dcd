pub mod detector_service;
pub mod slot;

use std::fmt;

use async_trait::async_trait;

use crate::common::Frame;
use crate::config::Configuration;
use crate::error::DetectorError;
use crate::pipeline::domain::{DetectionResult, FaceResult, GestureResult, SegmentationMask};

pub use detector_service::{DetectorService, InferenceRequest};
pub use slot::{DetectorSlot, Readiness};

/// Which perception result a detector produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    ObjectDetection,
    FaceLandmarks,
    GestureRecognition,
    PersonSegmentation,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::ObjectDetection => "object-detection",
            Capability::FaceLandmarks => "face-landmarks",
            Capability::GestureRecognition => "gesture-recognition",
            Capability::PersonSegmentation => "person-segmentation",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one inference call, tagged by capability.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorOutput {
    Objects(DetectionResult),
    Face(FaceResult),
    Gestures(GestureResult),
    Segmentation(SegmentationMask),
}

impl DetectorOutput {
    pub fn capability(&self) -> Capability {
        match self {
            DetectorOutput::Objects(_) => Capability::ObjectDetection,
            DetectorOutput::Face(_) => Capability::FaceLandmarks,
            DetectorOutput::Gestures(_) => Capability::GestureRecognition,
            DetectorOutput::Segmentation(_) => Capability::PersonSegmentation,
        }
    }
}

/// Settings handed to a detector when it loads its model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub capability: Capability,
    pub model_path: Option<String>,
    pub score_threshold: f32,
    pub segmentation_threshold: f32,
}

impl ModelConfig {
    pub fn for_capability(capability: Capability, configuration: &Configuration) -> Self {
        let models = &configuration.models;
        let model_path = match capability {
            Capability::ObjectDetection => models.object_detection.clone(),
            Capability::FaceLandmarks => models.face_landmarks.clone(),
            Capability::GestureRecognition => models.gesture_recognition.clone(),
            Capability::PersonSegmentation => models.person_segmentation.clone(),
        };
        Self {
            capability,
            model_path,
            score_threshold: configuration.overlay.score_threshold,
            segmentation_threshold: configuration.overlay.segmentation_threshold,
        }
    }
}

/// An opaque perception model behind a common interface.
///
/// `infer` takes `&mut self`, so a detector never sees a second call before
/// the first one resolves.
#[async_trait]
pub trait DetectorAdapter: Send {
    fn capability(&self) -> Capability;

    /// Loads the model. No frame is dispatched before this succeeds.
    async fn initialize(&mut self, config: &ModelConfig) -> Result<(), DetectorError>;

    async fn infer(
        &mut self,
        frame: &Frame,
        timestamp_ms: i64,
    ) -> Result<DetectorOutput, DetectorError>;
}
