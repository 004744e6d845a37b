//! Foundation module - Core utilities shared by every layer
//!
//! - Logging initialisation and re-exported log macros

pub mod logging;
