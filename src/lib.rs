pub mod capture;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod render;

#[cfg(test)]
mod testing;

pub use error::{AppError, ConfigError, DetectorError, DeviceError, RenderError};

pub use capture::{CaptureSource, FrameSource, SyntheticCamera};
pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder, PipelineState};
pub use pipeline::detector::{Capability, DetectorAdapter, DetectorOutput, ModelConfig};
pub use render::{OverlayChannel, RasterSurface};
