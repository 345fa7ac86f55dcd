use std::ops::Deref;
use std::sync::Arc;

use crate::common::Frame;
use crate::pipeline::detector::{Capability, DetectorOutput};
use crate::pipeline::domain::{
    DetectionResult, EngagementScore, FaceResult, GestureResult, SegmentationMask,
};
use crate::pipeline::metrics;

/// A committed detector result and the frame it was computed from.
#[derive(Debug)]
pub struct Committed<T> {
    value: Arc<T>,
    source_frame: Option<u64>,
}

impl<T> Committed<T> {
    fn new(value: T, source_frame: u64) -> Self {
        Self {
            value: Arc::new(value),
            source_frame: Some(source_frame),
        }
    }

    /// `None` until the detector has produced anything.
    pub fn source_frame(&self) -> Option<u64> {
        self.source_frame
    }

    pub fn shared(&self) -> Arc<T> {
        self.value.clone()
    }
}

impl<T: Default> Default for Committed<T> {
    fn default() -> Self {
        Self {
            value: Arc::new(T::default()),
            source_frame: None,
        }
    }
}

impl<T> Clone for Committed<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            source_frame: self.source_frame,
        }
    }
}

impl<T> Deref for Committed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Latest result per capability. Owned by the orchestrator and only written
/// between cycles, after every dispatched call has resolved.
#[derive(Debug, Default)]
pub struct ResultBuffer {
    objects: Committed<DetectionResult>,
    face: Committed<FaceResult>,
    gestures: Committed<GestureResult>,
    mask: Option<Committed<SegmentationMask>>,
}

impl ResultBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored result for the output's capability. Other
    /// capabilities keep whatever they had.
    pub fn commit(&mut self, frame_id: u64, output: DetectorOutput) {
        match output {
            DetectorOutput::Objects(result) => self.objects = Committed::new(result, frame_id),
            DetectorOutput::Face(result) => self.face = Committed::new(result, frame_id),
            DetectorOutput::Gestures(result) => self.gestures = Committed::new(result, frame_id),
            DetectorOutput::Segmentation(mask) => self.mask = Some(Committed::new(mask, frame_id)),
        }
    }

    pub fn source_frame(&self, capability: Capability) -> Option<u64> {
        match capability {
            Capability::ObjectDetection => self.objects.source_frame(),
            Capability::FaceLandmarks => self.face.source_frame(),
            Capability::GestureRecognition => self.gestures.source_frame(),
            Capability::PersonSegmentation => self.mask.as_ref().and_then(|m| m.source_frame()),
        }
    }

    /// Immutable view for the compositor, with metrics computed from the
    /// committed face and object results.
    pub fn snapshot(&self, frame: Frame, stale: bool) -> Snapshot {
        Snapshot {
            frame,
            objects: self.objects.clone(),
            face: self.face.clone(),
            gestures: self.gestures.clone(),
            mask: self.mask.clone(),
            engagement: metrics::engagement_score(&self.face),
            person_count: metrics::person_count(&self.objects),
            stale,
        }
    }
}

/// Merged per-cycle view handed to the compositor.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub frame: Frame,
    pub objects: Committed<DetectionResult>,
    pub face: Committed<FaceResult>,
    pub gestures: Committed<GestureResult>,
    pub mask: Option<Committed<SegmentationMask>>,
    pub engagement: EngagementScore,
    pub person_count: usize,
    pub stale: bool,
}

impl Snapshot {
    /// Snapshot of a frame with no detector results at all.
    pub fn empty(frame: Frame) -> Self {
        ResultBuffer::new().snapshot(frame, false)
    }

    pub fn with_output(mut self, output: DetectorOutput) -> Self {
        let frame_id = self.frame.id();
        match output {
            DetectorOutput::Objects(result) => {
                self.person_count = metrics::person_count(&result);
                self.objects = Committed::new(result, frame_id);
            }
            DetectorOutput::Face(result) => {
                self.engagement = metrics::engagement_score(&result);
                self.face = Committed::new(result, frame_id);
            }
            DetectorOutput::Gestures(result) => self.gestures = Committed::new(result, frame_id),
            DetectorOutput::Segmentation(mask) => self.mask = Some(Committed::new(mask, frame_id)),
        }
        self
    }
}
