use std::time::Duration;

use thiserror::Error;

use crate::pipeline::detector::Capability;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("Detector Error: {0}")]
    Detector(#[from] DetectorError),
    #[error("Render Error: {0}")]
    Render(#[from] RenderError),
    #[error("Configuration Error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Lifecycle Error: {0}")]
    Lifecycle(String),
}

// Capture device errors. Only `Unavailable` is fatal, and only during start.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Capture device unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read frame from capture device: {0}")]
    Read(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("Failed to load model for {capability}: {reason}")]
    ModelLoad {
        capability: Capability,
        reason: String,
    },
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Inference did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Detector is still busy with a previous frame")]
    Busy,
    #[error("Detector has not reported ready")]
    NotReady,
    #[error("Detector for {expected} produced a {actual} result")]
    CapabilityMismatch {
        expected: Capability,
        actual: Capability,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Segmentation mask is {mask_width}x{mask_height} but frame is {frame_width}x{frame_height}")]
    MaskMismatch {
        mask_width: u32,
        mask_height: u32,
        frame_width: u32,
        frame_height: u32,
    },
    #[error("Render surface rejected overlay: {0}")]
    Surface(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("More than one detector registered for {0}")]
    DuplicateCapability(Capability),
}
