use crate::pipeline::context::cycle_context::DetectorOutcome;

// Markers to track the state of a cycle
pub struct IngestedState;
pub struct AggregatedState {
    pub(super) outcomes: Vec<DetectorOutcome>,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for IngestedState {
    fn state_name() -> &'static str {
        "Ingested"
    }
}

impl ProcessingState for AggregatedState {
    fn state_name() -> &'static str {
        "Aggregated"
    }
}
