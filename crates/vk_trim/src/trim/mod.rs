//! Trim controller and trace synthesis
//!
//! The [`TrimController`] drives the recording window. It evaluates its
//! trigger once per frame and walks the states
//! `Disabled → PreTrim → InTrim → PostTrim → Finished`:
//!
//! - entering the window it snapshots the [`StateTracker`](crate::StateTracker)
//!   and writes creation calls for every object in the snapshot, in
//!   dependency order,
//! - leaving the window it waits for the GPU and writes destroy calls for
//!   every object still alive.
//!
//! Output goes to a [`TraceWriter`] as [`ReplayCall`]s.

mod controller;
mod destroy;
mod hotkey;
mod replay;
mod synthesis;
mod trigger;
mod writer;

pub use controller::TrimController;
pub use destroy::write_destroy_packets;
pub use hotkey::{HotKey, HotkeyDetector, KeyboardConnector, KeyboardSource, UnknownHotKey};
pub use replay::{ImageBarrier, ReplayCall};
pub use synthesis::{synthesize, SynthesisStats};
pub use trigger::{
    is_trim_trigger_enabled, process_trigger_options, trace_trigger_option_string, FrameRange,
    Trigger, TriggerKind, TriggerOptions,
};
pub use writer::{MemoryTraceWriter, TextTraceWriter, TraceWriteError, TraceWriter};

pub use crate::objects::WindowConnection;

use ash::vk::{self, Handle};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while trimming
#[derive(Debug, Error)]
pub enum TrimError {
    /// The trace writer failed
    #[error("Trace write failed: {0}")]
    Write(#[from] TraceWriteError),

    /// Trim configuration could not be resolved
    #[error("Trim configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Synthesis was requested before a snapshot was taken
    #[error("No tracker snapshot has been taken")]
    NoSnapshot,
}

/// Result type for trim operations
pub type TrimResult<T> = Result<T, TrimError>;

/// Lifecycle of a trim session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrimState {
    /// No trigger configured
    Disabled,
    /// Waiting for the trigger
    PreTrim,
    /// Recording
    InTrim,
    /// Window closed, destroy pass pending
    PostTrim,
    /// Done; later trigger edges are ignored
    Finished,
}

impl TrimState {
    /// Whether calls are currently being recorded
    pub const fn is_recording(self) -> bool {
        matches!(self, Self::InTrim)
    }
}

/// Waits for a device to go idle before the destroy pass
pub trait GpuIdleWaiter {
    /// Block until `device` has no pending work
    ///
    /// # Errors
    /// Returns the driver's error; the controller logs it and continues.
    fn wait_idle(&self, device: vk::Device) -> Result<(), vk::Result>;
}

impl<F> GpuIdleWaiter for F
where
    F: Fn(vk::Device) -> Result<(), vk::Result>,
{
    fn wait_idle(&self, device: vk::Device) -> Result<(), vk::Result> {
        self(device)
    }
}

/// Waits only when asked about the device it wraps
impl GpuIdleWaiter for ash::Device {
    fn wait_idle(&self, device: vk::Device) -> Result<(), vk::Result> {
        if self.handle() != device {
            return Ok(());
        }
        unsafe { self.device_wait_idle() }
    }
}

/// Allocator for handles of temporary objects that never existed in the
/// application
///
/// Values count up from a range applications are very unlikely to see from
/// a driver.
#[derive(Debug, Clone)]
pub struct SyntheticHandles {
    next: u64,
}

impl Default for SyntheticHandles {
    fn default() -> Self {
        Self {
            next: 0xFFFF_FFFF_0000_0000,
        }
    }
}

impl SyntheticHandles {
    /// Fresh allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Next handle of any type
    pub fn next<H: Handle>(&mut self) -> H {
        let raw = self.next;
        self.next = self.next.wrapping_add(1);
        H::from_raw(raw)
    }

    /// Next render pass handle
    pub fn render_pass(&mut self) -> vk::RenderPass {
        self.next()
    }

    /// Next command pool handle
    pub fn command_pool(&mut self) -> vk::CommandPool {
        self.next()
    }

    /// Next command buffer handle
    pub fn command_buffer(&mut self) -> vk::CommandBuffer {
        self.next()
    }
}

/// Totals for one trim session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimStats {
    /// Frame the window opened on
    pub start_frame: Option<u64>,
    /// Frame the window closed on
    pub end_frame: Option<u64>,
    /// Live objects in the snapshot
    pub snapshot_objects: usize,
    /// Creation pass totals
    pub synthesis: SynthesisStats,
    /// Destroy calls written at the end
    pub destroy_calls: usize,
}
