pub mod cycle_context;
pub mod metrics;
pub mod state;

pub use cycle_context::{CycleContext, DetectorOutcome};
pub use metrics::CycleMetrics;
pub use state::{AggregatedState, IngestedState, ProcessingState};
