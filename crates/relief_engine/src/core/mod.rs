//! # Core Engine Module
//!
//! Shared configuration used by every subsystem.

pub mod config;

pub use config::{
    ApplicationConfig,
    BloomConfig,
    CameraConfig,
    Config,
    ConfigError,
    RendererConfig,
    RunConfig,
    WindowConfig,
};
