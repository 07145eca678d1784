//! Pending resource transitions per command buffer

use std::collections::HashMap;

use ash::vk;

/// Image layout change recorded in a command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransition {
    /// Transitioned image
    pub image: vk::Image,
    /// Access mask before the transition
    pub src_access_mask: vk::AccessFlags,
    /// Access mask after the transition
    pub dst_access_mask: vk::AccessFlags,
    /// Layout before the transition
    pub old_layout: vk::ImageLayout,
    /// Layout after the transition
    pub new_layout: vk::ImageLayout,
}

impl ImageTransition {
    /// Transition described by an image memory barrier
    pub fn from_barrier(barrier: &vk::ImageMemoryBarrier) -> Self {
        Self {
            image: barrier.image,
            src_access_mask: barrier.src_access_mask,
            dst_access_mask: barrier.dst_access_mask,
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
        }
    }
}

/// Buffer access change recorded in a command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTransition {
    /// Transitioned buffer
    pub buffer: vk::Buffer,
    /// Access mask before the transition
    pub src_access_mask: vk::AccessFlags,
    /// Access mask after the transition
    pub dst_access_mask: vk::AccessFlags,
}

impl BufferTransition {
    /// Transition described by a buffer memory barrier
    pub fn from_barrier(barrier: &vk::BufferMemoryBarrier) -> Self {
        Self {
            buffer: barrier.buffer,
            src_access_mask: barrier.src_access_mask,
            dst_access_mask: barrier.dst_access_mask,
        }
    }
}

/// Transition lists keyed by command buffer
///
/// Lists only grow until cleared; a transition is never edited in place.
#[derive(Debug, Default)]
pub(crate) struct TransitionLog {
    images: HashMap<vk::CommandBuffer, Vec<ImageTransition>>,
    buffers: HashMap<vk::CommandBuffer, Vec<BufferTransition>>,
}

impl TransitionLog {
    pub fn add_image(&mut self, command_buffer: vk::CommandBuffer, transition: ImageTransition) {
        self.images.entry(command_buffer).or_default().push(transition);
    }

    pub fn add_buffer(&mut self, command_buffer: vk::CommandBuffer, transition: BufferTransition) {
        self.buffers.entry(command_buffer).or_default().push(transition);
    }

    pub fn images(&self, command_buffer: vk::CommandBuffer) -> &[ImageTransition] {
        self.images.get(&command_buffer).map_or(&[], Vec::as_slice)
    }

    pub fn buffers(&self, command_buffer: vk::CommandBuffer) -> &[BufferTransition] {
        self.buffers.get(&command_buffer).map_or(&[], Vec::as_slice)
    }

    pub fn clear_images(&mut self, command_buffer: vk::CommandBuffer) {
        self.images.remove(&command_buffer);
    }

    pub fn clear_buffers(&mut self, command_buffer: vk::CommandBuffer) {
        self.buffers.remove(&command_buffer);
    }

    pub fn clear(&mut self, command_buffer: vk::CommandBuffer) {
        self.clear_images(command_buffer);
        self.clear_buffers(command_buffer);
    }
}

/// Final layout and access of every image in `transitions`
///
/// The last transition of an image wins. Images come out in the order of
/// their first transition.
pub fn resolve_image_transitions(
    transitions: &[ImageTransition],
) -> Vec<(vk::Image, vk::ImageLayout, vk::AccessFlags)> {
    let mut resolved: Vec<(vk::Image, vk::ImageLayout, vk::AccessFlags)> = Vec::new();
    for transition in transitions {
        let state = (transition.image, transition.new_layout, transition.dst_access_mask);
        match resolved.iter_mut().find(|(image, ..)| *image == transition.image) {
            Some(slot) => *slot = state,
            None => resolved.push(state),
        }
    }
    resolved
}

/// Final access of every buffer in `transitions`, last transition wins
pub fn resolve_buffer_transitions(
    transitions: &[BufferTransition],
) -> Vec<(vk::Buffer, vk::AccessFlags)> {
    let mut resolved: Vec<(vk::Buffer, vk::AccessFlags)> = Vec::new();
    for transition in transitions {
        match resolved.iter_mut().find(|(buffer, _)| *buffer == transition.buffer) {
            Some(slot) => slot.1 = transition.dst_access_mask,
            None => resolved.push((transition.buffer, transition.dst_access_mask)),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn transition(image: u64, layout: vk::ImageLayout) -> ImageTransition {
        ImageTransition {
            image: vk::Image::from_raw(image),
            src_access_mask: vk::AccessFlags::empty(),
            dst_access_mask: vk::AccessFlags::SHADER_READ,
            old_layout: vk::ImageLayout::UNDEFINED,
            new_layout: layout,
        }
    }

    #[test]
    fn test_last_transition_wins() {
        let transitions = [
            transition(1, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            transition(2, vk::ImageLayout::GENERAL),
            transition(1, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        ];
        let resolved = resolve_image_transitions(&transitions);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].0.as_raw(), 1);
        assert_eq!(resolved[0].1, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(resolved[1].1, vk::ImageLayout::GENERAL);
    }

    #[test]
    fn test_log_clear_is_per_command_buffer() {
        let mut log = TransitionLog::default();
        let first = vk::CommandBuffer::from_raw(1);
        let second = vk::CommandBuffer::from_raw(2);
        log.add_image(first, transition(1, vk::ImageLayout::GENERAL));
        log.add_image(second, transition(2, vk::ImageLayout::GENERAL));
        log.add_buffer(
            first,
            BufferTransition {
                buffer: vk::Buffer::from_raw(3),
                src_access_mask: vk::AccessFlags::empty(),
                dst_access_mask: vk::AccessFlags::UNIFORM_READ,
            },
        );

        log.clear(first);
        assert!(log.images(first).is_empty());
        assert!(log.buffers(first).is_empty());
        assert_eq!(log.images(second).len(), 1);
    }

    #[test]
    fn test_buffer_resolution() {
        let buffer = vk::Buffer::from_raw(4);
        let transitions = [
            BufferTransition {
                buffer,
                src_access_mask: vk::AccessFlags::empty(),
                dst_access_mask: vk::AccessFlags::TRANSFER_WRITE,
            },
            BufferTransition {
                buffer,
                src_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                dst_access_mask: vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            },
        ];
        assert_eq!(
            resolve_buffer_transitions(&transitions),
            vec![(buffer, vk::AccessFlags::VERTEX_ATTRIBUTE_READ)]
        );
    }
}
