use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestRating {
    VeryGood,
    Good,
    Neutral,
    Bad,
    VeryBad,
}

impl fmt::Display for InterestRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InterestRating::VeryGood => "Very good",
            InterestRating::Good => "Good",
            InterestRating::Neutral => "Neutral",
            InterestRating::Bad => "Bad",
            InterestRating::VeryBad => "Very bad",
        };
        f.write_str(label)
    }
}

/// Whole-frame engagement derived from the primary face. Recomputed every cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementScore {
    pub focus: f64,
    pub interest: f64,
    pub rating: InterestRating,
}

impl Default for EngagementScore {
    fn default() -> Self {
        Self {
            focus: 0.0,
            interest: 0.0,
            rating: InterestRating::VeryBad,
        }
    }
}
