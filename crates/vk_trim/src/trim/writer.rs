//! Trace output sinks

use std::io;

use thiserror::Error;

use super::replay::ReplayCall;

/// Errors raised by a [`TraceWriter`]
#[derive(Debug, Error)]
pub enum TraceWriteError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The writer no longer accepts calls
    #[error("Trace writer is closed")]
    Closed,
}

/// Receives the calls of a trimmed trace in order
pub trait TraceWriter {
    /// Append one call
    ///
    /// # Errors
    /// Fails when the call cannot be written.
    fn write_call(&mut self, call: ReplayCall) -> Result<(), TraceWriteError>;

    /// Push buffered calls to their destination
    ///
    /// # Errors
    /// Fails when buffered calls cannot be written.
    fn flush(&mut self) -> Result<(), TraceWriteError> {
        Ok(())
    }
}

impl<W: TraceWriter + ?Sized> TraceWriter for Box<W> {
    fn write_call(&mut self, call: ReplayCall) -> Result<(), TraceWriteError> {
        (**self).write_call(call)
    }

    fn flush(&mut self) -> Result<(), TraceWriteError> {
        (**self).flush()
    }
}

/// Keeps every call in memory
#[derive(Debug, Default)]
pub struct MemoryTraceWriter {
    calls: Vec<ReplayCall>,
}

impl MemoryTraceWriter {
    /// Empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls written so far
    pub fn calls(&self) -> &[ReplayCall] {
        &self.calls
    }

    /// Take the written calls
    pub fn into_calls(self) -> Vec<ReplayCall> {
        self.calls
    }

    /// Number of written calls
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Forget every written call
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl TraceWriter for MemoryTraceWriter {
    fn write_call(&mut self, call: ReplayCall) -> Result<(), TraceWriteError> {
        self.calls.push(call);
        Ok(())
    }
}

/// Writes one line per call to any [`io::Write`]
///
/// Verbatim packets print their call id and size; synthesized calls print
/// their entry point followed by their arguments.
#[derive(Debug)]
pub struct TextTraceWriter<W: io::Write> {
    out: W,
    index: u64,
}

impl<W: io::Write> TextTraceWriter<W> {
    /// Write to `out`
    pub const fn new(out: W) -> Self {
        Self { out, index: 0 }
    }

    /// Number of calls written
    pub const fn written(&self) -> u64 {
        self.index
    }

    /// Recover the underlying sink
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> TraceWriter for TextTraceWriter<W> {
    fn write_call(&mut self, call: ReplayCall) -> Result<(), TraceWriteError> {
        match &call {
            ReplayCall::Packet(packet) => writeln!(
                self.out,
                "{:>6} packet id={} bytes={}",
                self.index,
                packet.call_id(),
                packet.len()
            )?,
            other => writeln!(self.out, "{:>6} {} {:?}", self.index, other.name(), other)?,
        }
        self.index += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TraceWriteError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::TracePacket;
    use ash::vk::{self, Handle};

    #[test]
    fn test_memory_writer_keeps_order() {
        let mut writer = MemoryTraceWriter::new();
        writer
            .write_call(ReplayCall::DeviceWaitIdle {
                device: vk::Device::from_raw(1),
            })
            .unwrap();
        writer
            .write_call(ReplayCall::Packet(TracePacket::new(9, vec![1u8, 2, 3])))
            .unwrap();

        assert_eq!(writer.len(), 2);
        assert_eq!(writer.calls()[0].name(), "vkDeviceWaitIdle");
        assert!(matches!(writer.calls()[1], ReplayCall::Packet(_)));

        writer.clear();
        assert!(writer.is_empty());
    }

    #[test]
    fn test_text_writer_lines() {
        let mut writer = TextTraceWriter::new(Vec::new());
        writer
            .write_call(ReplayCall::Packet(TracePacket::new(42, vec![0u8; 8])))
            .unwrap();
        writer
            .write_call(ReplayCall::QueueWaitIdle {
                queue: vk::Queue::from_raw(3),
            })
            .unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.written(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "     0 packet id=42 bytes=8");
        assert!(lines[1].starts_with("     1 vkQueueWaitIdle QueueWaitIdle"));
    }

    #[test]
    fn test_boxed_writer() {
        let mut writer: Box<dyn TraceWriter> = Box::new(MemoryTraceWriter::new());
        writer
            .write_call(ReplayCall::DeviceWaitIdle {
                device: vk::Device::from_raw(1),
            })
            .unwrap();
        writer.flush().unwrap();
    }
}
