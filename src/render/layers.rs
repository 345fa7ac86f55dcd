use image::Rgba;

use super::connections::{
    face_contours, path_edges, HAND_CONNECTIONS, HAND_CONNECTION_COLOR, HAND_POINT_COLOR,
    OBJECT_COLOR,
};
use super::overlay::{DrawOp, Layer};
use crate::error::RenderError;
use crate::pipeline::domain::{Landmark, SegmentationMask};
use crate::pipeline::orchestration::Snapshot;

const OBJECT_LINE_WIDTH: u32 = 2;
const HAND_LINE_WIDTH: u32 = 5;
const HAND_POINT_RADIUS: u32 = 2;
const FACE_LINE_WIDTH: u32 = 1;
const LABEL_LIFT: f32 = 5.0;
const LABEL_TOP_MARGIN: f32 = 10.0;
const BAND_MARGIN: f32 = 10.0;
const BAND_LINE_HEIGHT: f32 = 20.0;

/// One overlay layer. Renderers append instructions and must treat empty
/// results as "nothing to draw".
pub trait LayerRenderer: Send + Sync {
    fn layer(&self) -> Layer;

    fn render(&self, snapshot: &Snapshot, ops: &mut Vec<DrawOp>) -> Result<(), RenderError>;
}

/// The committed mask, if it lines up with the frame being drawn.
fn aligned_mask(snapshot: &Snapshot) -> Result<Option<&SegmentationMask>, RenderError> {
    let Some(mask) = snapshot.mask.as_deref() else {
        return Ok(None);
    };
    let (frame_width, frame_height) = snapshot.frame.dimensions();
    if mask.dimensions() != (frame_width, frame_height) {
        return Err(RenderError::MaskMismatch {
            mask_width: mask.width(),
            mask_height: mask.height(),
            frame_width,
            frame_height,
        });
    }
    Ok(Some(mask))
}

fn to_pixels(landmark: &Landmark, width: f32, height: f32) -> (f32, f32) {
    (landmark.x * width, landmark.y * height)
}

/// Camera image, or the virtual background fill when segmentation is on and
/// a mask is available.
pub struct BackgroundLayer {
    virtual_background: Option<(Rgba<u8>, f32)>,
}

impl BackgroundLayer {
    pub fn plain() -> Self {
        Self {
            virtual_background: None,
        }
    }

    pub fn virtual_background(color: Rgba<u8>, transparency: f32) -> Self {
        Self {
            virtual_background: Some((color, transparency)),
        }
    }
}

impl LayerRenderer for BackgroundLayer {
    fn layer(&self) -> Layer {
        Layer::Background
    }

    fn render(&self, snapshot: &Snapshot, ops: &mut Vec<DrawOp>) -> Result<(), RenderError> {
        match (self.virtual_background, aligned_mask(snapshot)?) {
            (Some((color, transparency)), Some(_)) => ops.push(DrawOp::Fill {
                color,
                camera_weight: transparency,
            }),
            _ => ops.push(DrawOp::Frame),
        }
        Ok(())
    }
}

/// The person cut out of the camera image.
pub struct ForegroundLayer {
    threshold: f32,
}

impl ForegroundLayer {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl LayerRenderer for ForegroundLayer {
    fn layer(&self) -> Layer {
        Layer::Foreground
    }

    fn render(&self, snapshot: &Snapshot, ops: &mut Vec<DrawOp>) -> Result<(), RenderError> {
        if aligned_mask(snapshot)?.is_some() {
            ops.push(DrawOp::MaskedFrame {
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

pub struct FaceMeshLayer;

impl LayerRenderer for FaceMeshLayer {
    fn layer(&self) -> Layer {
        Layer::FaceMesh
    }

    fn render(&self, snapshot: &Snapshot, ops: &mut Vec<DrawOp>) -> Result<(), RenderError> {
        let (width, height) = snapshot.frame.dimensions();
        let (width, height) = (width as f32, height as f32);

        for face in &snapshot.face.faces {
            for (path, color) in face_contours() {
                for (a, b) in path_edges(path) {
                    // Reduced landmark sets simply lose the contours they cannot support.
                    let (Some(start), Some(end)) = (face.landmarks.get(a), face.landmarks.get(b))
                    else {
                        continue;
                    };
                    ops.push(DrawOp::Line {
                        from: to_pixels(start, width, height),
                        to: to_pixels(end, width, height),
                        color,
                        thickness: FACE_LINE_WIDTH,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Bounding boxes with "<category> - <score>%" labels.
pub struct ObjectLayer {
    score_threshold: f32,
}

impl ObjectLayer {
    pub fn new(score_threshold: f32) -> Self {
        Self { score_threshold }
    }
}

impl LayerRenderer for ObjectLayer {
    fn layer(&self) -> Layer {
        Layer::Objects
    }

    fn render(&self, snapshot: &Snapshot, ops: &mut Vec<DrawOp>) -> Result<(), RenderError> {
        for detection in &snapshot.objects.detections {
            let Some(category) = detection.top_category() else {
                continue;
            };
            if category.score < self.score_threshold {
                continue;
            }

            let bbox = detection.bounding_box;
            ops.push(DrawOp::Rect {
                x: bbox.origin_x,
                y: bbox.origin_y,
                width: bbox.width,
                height: bbox.height,
                color: OBJECT_COLOR,
                thickness: OBJECT_LINE_WIDTH,
            });

            let label_y = if bbox.origin_y > 100.0 {
                bbox.origin_y - LABEL_LIFT
            } else {
                LABEL_TOP_MARGIN
            };
            ops.push(DrawOp::Label {
                anchor: (bbox.origin_x, label_y),
                text: format!("{} - {:.2}%", category.name, category.score * 100.0),
                color: OBJECT_COLOR,
            });
        }
        Ok(())
    }
}

pub struct HandLayer;

impl LayerRenderer for HandLayer {
    fn layer(&self) -> Layer {
        Layer::Hands
    }

    fn render(&self, snapshot: &Snapshot, ops: &mut Vec<DrawOp>) -> Result<(), RenderError> {
        let (width, height) = snapshot.frame.dimensions();
        let (width, height) = (width as f32, height as f32);

        for hand in &snapshot.gestures.hands {
            for &(a, b) in HAND_CONNECTIONS {
                let (Some(start), Some(end)) = (hand.landmarks.get(a), hand.landmarks.get(b))
                else {
                    continue;
                };
                ops.push(DrawOp::Line {
                    from: to_pixels(start, width, height),
                    to: to_pixels(end, width, height),
                    color: HAND_CONNECTION_COLOR,
                    thickness: HAND_LINE_WIDTH,
                });
            }
            for landmark in &hand.landmarks {
                ops.push(DrawOp::Point {
                    at: to_pixels(landmark, width, height),
                    radius: HAND_POINT_RADIUS,
                    color: HAND_POINT_COLOR,
                });
            }
        }
        Ok(())
    }
}

/// Text readout of the engagement metrics, person count and gestures.
pub struct MetricsLayer;

impl LayerRenderer for MetricsLayer {
    fn layer(&self) -> Layer {
        Layer::Metrics
    }

    fn render(&self, snapshot: &Snapshot, ops: &mut Vec<DrawOp>) -> Result<(), RenderError> {
        let engagement = snapshot.engagement;
        let mut lines = vec![
            format!("Focus Score: {:.2}%", engagement.focus),
            format!("Interest Score: {:.2}%", engagement.interest),
            format!("Interest Rating: {}", engagement.rating),
            format!("Person Count: {}", snapshot.person_count),
        ];
        for hand in &snapshot.gestures.hands {
            lines.push(format!(
                "Gesture: {} {:.2}% ({})",
                hand.gesture.name,
                hand.gesture.score * 100.0,
                hand.handedness.side
            ));
        }

        let top = snapshot.frame.height() as f32 - BAND_MARGIN - BAND_LINE_HEIGHT * lines.len() as f32;
        ops.push(DrawOp::Band {
            anchor: (BAND_MARGIN, top.max(BAND_MARGIN)),
            lines,
        });
        Ok(())
    }
}
