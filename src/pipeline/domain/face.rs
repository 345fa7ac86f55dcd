/// Normalized landmark. `x`/`y` are relative to frame width/height, `z` is
/// relative depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Named facial expression intensity in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct BlendShape {
    pub name: String,
    pub score: f64,
}

impl BlendShape {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Face {
    pub landmarks: Vec<Landmark>,
    pub blend_shapes: Vec<BlendShape>,
}

impl Face {
    pub fn new(landmarks: Vec<Landmark>, blend_shapes: Vec<BlendShape>) -> Self {
        Self {
            landmarks,
            blend_shapes,
        }
    }

    /// Sum of the scores of every blend shape whose name is in `names`.
    pub fn blend_shape_sum(&self, names: &[&str]) -> f64 {
        self.blend_shapes
            .iter()
            .filter(|shape| names.contains(&shape.name.as_str()))
            .map(|shape| shape.score)
            .sum()
    }
}

/// Face landmark and expression output for one frame. Zero faces is valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceResult {
    pub faces: Vec<Face>,
}

impl FaceResult {
    pub fn new(faces: Vec<Face>) -> Self {
        Self { faces }
    }

    /// The face engagement metrics are computed from.
    pub fn primary(&self) -> Option<&Face> {
        self.faces.first()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}
