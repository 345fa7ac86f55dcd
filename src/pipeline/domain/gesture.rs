use super::detection::Category;
use super::face::Landmark;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandSide {
    Left,
    Right,
}

impl std::fmt::Display for HandSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandSide::Left => write!(f, "Left"),
            HandSide::Right => write!(f, "Right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handedness {
    pub side: HandSide,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hand {
    pub gesture: Category,
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
}

impl Hand {
    pub fn new(gesture: Category, landmarks: Vec<Landmark>, handedness: Handedness) -> Self {
        Self {
            gesture,
            landmarks,
            handedness,
        }
    }
}

/// Gesture recognition output for one frame. Zero hands is valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureResult {
    pub hands: Vec<Hand>,
}

impl GestureResult {
    pub fn new(hands: Vec<Hand>) -> Self {
        Self { hands }
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}
