//! Recorded calls per command buffer

use std::collections::HashMap;

use ash::vk;

use crate::packet::TracePacket;

/// Calls recorded into each command buffer since its last begin or reset
#[derive(Debug, Clone, Default)]
pub(crate) struct CommandLog {
    calls: HashMap<vk::CommandBuffer, Vec<TracePacket>>,
}

impl CommandLog {
    pub fn add(&mut self, command_buffer: vk::CommandBuffer, packet: TracePacket) {
        self.calls.entry(command_buffer).or_default().push(packet);
    }

    /// Drop every record of `command_buffer`, returning how many there were
    pub fn remove(&mut self, command_buffer: vk::CommandBuffer) -> usize {
        self.calls.remove(&command_buffer).map_or(0, |calls| calls.len())
    }

    pub fn get(&self, command_buffer: vk::CommandBuffer) -> &[TracePacket] {
        self.calls.get(&command_buffer).map_or(&[], Vec::as_slice)
    }

    pub fn into_map(self) -> HashMap<vk::CommandBuffer, Vec<TracePacket>> {
        self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_calls_keep_recording_order() {
        let mut log = CommandLog::default();
        let command_buffer = vk::CommandBuffer::from_raw(1);
        for call_id in [10, 11, 12] {
            log.add(command_buffer, TracePacket::new(call_id, Vec::<u8>::new()));
        }

        let ids: Vec<u32> = log.get(command_buffer).iter().map(TracePacket::call_id).collect();
        assert_eq!(ids, vec![10, 11, 12]);

        assert_eq!(log.remove(command_buffer), 3);
        assert!(log.get(command_buffer).is_empty());
        assert_eq!(log.remove(command_buffer), 0);
    }
}
