pub mod context;
pub mod detector;
pub mod domain;
pub mod metrics;
pub mod orchestration;
