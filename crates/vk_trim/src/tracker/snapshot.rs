//! Frozen copies of the tracker

use std::collections::HashMap;

use ash::vk;

use super::image_order::ImageCall;
use crate::objects::{ObjectRegistry, ObjectType};
use crate::packet::TracePacket;

/// Deep, independent copy of the tracker taken when a trim window opens
///
/// Nothing in a snapshot borrows from the live tracker; later creates and
/// destroys on the tracker are invisible here.
#[derive(Debug, Clone, Default)]
pub struct TrackerSnapshot {
    /// Every object live at snapshot time
    pub objects: ObjectRegistry,
    /// Recorded calls per command buffer
    pub command_calls: HashMap<vk::CommandBuffer, Vec<TracePacket>>,
    /// Image creation and destruction in application order, when ordered
    /// image mode is on
    pub image_calls: Option<Vec<ImageCall>>,
}

impl TrackerSnapshot {
    /// Recorded calls of `command_buffer`
    pub fn command_buffer_calls(&self, command_buffer: vk::CommandBuffer) -> &[TracePacket] {
        self.command_calls
            .get(&command_buffer)
            .map_or(&[], Vec::as_slice)
    }

    /// Total number of recorded calls across all command buffers
    pub fn recorded_call_count(&self) -> usize {
        self.command_calls.values().map(Vec::len).sum()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let counts: Vec<String> = self
            .objects
            .counts()
            .into_iter()
            .map(|(ty, count)| format!("{}={count}", short_name(ty)))
            .collect();
        format!(
            "{} objects [{}], {} recorded calls",
            self.objects.len(),
            counts.join(" "),
            self.recorded_call_count()
        )
    }
}

fn short_name(object_type: ObjectType) -> &'static str {
    let name = object_type.name();
    name.strip_prefix("Vk").unwrap_or(name)
}
