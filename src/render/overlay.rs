use std::sync::Arc;

use image::Rgba;

use crate::common::Frame;
use crate::pipeline::domain::{EngagementScore, SegmentationMask};

/// Overlay layers, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Background,
    Foreground,
    FaceMesh,
    Objects,
    Hands,
    Metrics,
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Background => "background",
            Layer::Foreground => "foreground",
            Layer::FaceMesh => "face-mesh",
            Layer::Objects => "objects",
            Layer::Hands => "hands",
            Layer::Metrics => "metrics",
        }
    }
}

/// A single drawing instruction in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// The camera image.
    Frame,
    /// Solid colour over the whole frame, mixed with the camera image by
    /// `camera_weight` (0 = opaque colour, 1 = camera only).
    Fill { color: Rgba<u8>, camera_weight: f32 },
    /// The camera image, only where the mask classifies a person.
    MaskedFrame { threshold: f32 },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgba<u8>,
        thickness: u32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba<u8>,
        thickness: u32,
    },
    Point {
        at: (f32, f32),
        radius: u32,
        color: Rgba<u8>,
    },
    Label {
        anchor: (f32, f32),
        text: String,
        color: Rgba<u8>,
    },
    /// Block of text lines, first line at `anchor`.
    Band { anchor: (f32, f32), lines: Vec<String> },
}

/// Everything needed to draw one cycle's result.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub frame: Frame,
    pub mask: Option<Arc<SegmentationMask>>,
    /// Layers that produced at least one instruction, in draw order.
    pub layers: Vec<Layer>,
    pub ops: Vec<DrawOp>,
    pub engagement: EngagementScore,
    pub person_count: usize,
    /// True when re-rendered from a frame that was already processed.
    pub stale: bool,
}

impl Overlay {
    pub fn frame_id(&self) -> u64 {
        self.frame.id()
    }

    pub fn has_layer(&self, layer: Layer) -> bool {
        self.layers.contains(&layer)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Label { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}
