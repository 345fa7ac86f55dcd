//! Engagement metrics derived from facial expression results.
//!
//! Scores are whole-frame: they come from the first face in the result and
//! are not attributed to individual people. The arithmetic is left unclamped,
//! so unusual blend-shape sums can fall outside [0, 100].

use crate::pipeline::domain::{DetectionResult, EngagementScore, FaceResult, InterestRating};

const BLINK_SHAPES: [&str; 2] = ["eyeBlinkLeft", "eyeBlinkRight"];
const INTEREST_SHAPES: [&str; 4] = ["smile", "mouthOpen", "mouthSmileLeft", "mouthSmileRight"];
const PERSON_CATEGORY: &str = "person";

/// `(1 - (eyeBlinkLeft + eyeBlinkRight)) * 100`, or 0 without a face.
pub fn focus_score(face: &FaceResult) -> f64 {
    match face.primary() {
        Some(primary) => (1.0 - primary.blend_shape_sum(&BLINK_SHAPES)) * 100.0,
        None => 0.0,
    }
}

/// `25 * (smile + mouthOpen + mouthSmileLeft + mouthSmileRight)`, or 0 without a face.
pub fn interest_score(face: &FaceResult) -> f64 {
    match face.primary() {
        Some(primary) => primary.blend_shape_sum(&INTEREST_SHAPES) * 25.0,
        None => 0.0,
    }
}

/// Bands are inclusive on their lower bound.
pub fn interest_rating(score: f64) -> InterestRating {
    if score >= 80.0 {
        InterestRating::VeryGood
    } else if score >= 60.0 {
        InterestRating::Good
    } else if score >= 40.0 {
        InterestRating::Neutral
    } else if score >= 20.0 {
        InterestRating::Bad
    } else {
        InterestRating::VeryBad
    }
}

pub fn engagement_score(face: &FaceResult) -> EngagementScore {
    let interest = interest_score(face);
    EngagementScore {
        focus: focus_score(face),
        interest,
        rating: interest_rating(interest),
    }
}

/// Number of detections whose best category is a person, ignoring case.
pub fn person_count(detections: &DetectionResult) -> usize {
    detections
        .detections
        .iter()
        .filter(|detection| {
            detection
                .top_category()
                .is_some_and(|category| category.name.eq_ignore_ascii_case(PERSON_CATEGORY))
        })
        .count()
}
