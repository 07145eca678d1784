//! Opaque trace packets
//!
//! The serializer owns the packet format. The tracker keeps some packets
//! verbatim (instance/device creation, memory maps, swapchain image
//! enumeration, recorded commands) and hands them back unchanged during
//! synthesis. Cloning a packet copies it; dropping it releases it.

use std::fmt;

/// A serialized API call as produced by the trace writer
#[derive(Clone, PartialEq, Eq, Default)]
pub struct TracePacket {
    call_id: u32,
    payload: Box<[u8]>,
}

impl TracePacket {
    /// Wrap a serialized call
    pub fn new(call_id: u32, payload: impl Into<Box<[u8]>>) -> Self {
        Self {
            call_id,
            payload: payload.into(),
        }
    }

    /// Wrap a call whose payload was produced as 32-bit words
    pub fn from_words(call_id: u32, words: &[u32]) -> Self {
        Self::new(call_id, bytemuck::cast_slice::<u32, u8>(words).to_vec())
    }

    /// Identifier of the serialized call
    pub fn call_id(&self) -> u32 {
        self.call_id
    }

    /// Raw packet body
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Body size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the body is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Debug for TracePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracePacket")
            .field("call_id", &self.call_id)
            .field("len", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_is_independent() {
        let mut body = vec![1u8, 2, 3];
        let packet = TracePacket::new(7, body.clone());
        let copy = packet.clone();

        body.clear();
        drop(packet);

        assert_eq!(copy.call_id(), 7);
        assert_eq!(copy.payload(), &[1, 2, 3]);
    }

    #[test]
    fn test_from_words() {
        let packet = TracePacket::from_words(1, &[0x0403_0201]);
        assert_eq!(packet.len(), 4);
        assert_eq!(u32::from_ne_bytes(packet.payload().try_into().unwrap()), 0x0403_0201);
    }
}
