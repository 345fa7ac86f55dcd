pub mod engagement;

pub use engagement::{engagement_score, focus_score, interest_rating, interest_score, person_count};
