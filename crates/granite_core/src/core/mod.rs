//! Core configuration types shared by the engine and the renderer

pub mod config;

pub use config::{ContextOptions, GraniteConfig, DEFAULT_RESOURCE_BUDGET};
