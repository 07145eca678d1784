//! Foundation module - Core utilities shared by the tracker and the controller
//!
//! - Logging setup for capture layers and tools

pub mod logging;
