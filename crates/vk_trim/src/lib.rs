//! # vk_trim
//!
//! Object state tracking and trimmed trace synthesis for Vulkan capture layers.
//!
//! A capture layer normally records every call from process start. `vk_trim`
//! lets it start and stop recording at an arbitrary frame range or hot-key
//! press while still producing a trace that replays from scratch: every
//! object alive when recording starts is re-created from deep-copied creation
//! metadata kept by the [`StateTracker`].
//!
//! ## Features
//!
//! - **Object Registry**: one handle map per Vulkan object category, each
//!   entry owning everything needed to reissue its creation call
//! - **Resource Transitions**: per-command-buffer image layout and buffer
//!   access transitions, applied at submit time
//! - **Command-Buffer Call Log**: recorded calls per command buffer for
//!   re-recording at trim start
//! - **Snapshots**: deep, independent copies of the whole tracker
//! - **Trim Controller**: frame-range or hot-key triggers, creation and
//!   destroy call synthesis
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vk_trim::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TrimConfig::from_env()?;
//!     let tracker = Arc::new(StateTracker::new(TrackerSettings::from(&config)));
//!     let mut controller = TrimController::new(
//!         Arc::clone(&tracker),
//!         config.trigger_options()?,
//!         MemoryTraceWriter::new(),
//!     );
//!
//!     // The interception layer feeds `tracker`; once per present:
//!     controller.advance_frame();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod objects;
pub mod packet;
pub mod tracker;
pub mod trim;

pub use packet::TracePacket;
pub use tracker::{StateTracker, TrackerSettings, TrackerSnapshot};
pub use trim::{TrimController, TrimError, TrimState};

/// Common imports for capture layers
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, TrimConfig},
        objects::{ObjectHandle, ObjectRegistry, ObjectType, WindowConnection},
        packet::TracePacket,
        tracker::{
            BufferTransition, ImageTransition, StateTracker, TrackerSettings, TrackerSnapshot,
        },
        trim::{
            GpuIdleWaiter, HotKey, KeyboardConnector, KeyboardSource, MemoryTraceWriter, ReplayCall,
            TextTraceWriter, TraceWriter, TriggerKind, TriggerOptions, TrimController,
            TrimError, TrimState,
        },
    };
}
