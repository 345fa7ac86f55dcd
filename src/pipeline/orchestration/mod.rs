pub mod orchestrator;
pub mod result_buffer;

pub use orchestrator::{CycleOutcome, OrchestratorPhase, PipelineOrchestrator};
pub use result_buffer::{Committed, ResultBuffer, Snapshot};
