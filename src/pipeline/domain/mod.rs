pub mod detection;
pub mod engagement;
pub mod face;
pub mod gesture;
pub mod segmentation;

pub use detection::{BoundingBox, Category, Detection, DetectionResult};
pub use engagement::{EngagementScore, InterestRating};
pub use face::{BlendShape, Face, FaceResult, Landmark};
pub use gesture::{GestureResult, Hand, Handedness, HandSide};
pub use segmentation::SegmentationMask;
