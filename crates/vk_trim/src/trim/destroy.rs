//! Destroy call synthesis for the end of a trim window

use std::hash::Hash;

use ash::vk::{self, Handle};

use super::replay::ReplayCall;
use super::writer::{TraceWriteError, TraceWriter};
use crate::objects::{DeviceChild, ObjectHandle, ObjectMap, ObjectRegistry};

/// Write destroy and free calls for every object in `objects`, dependents
/// before what they depend on
///
/// Each category is destroyed newest first. Queues and physical devices
/// have no destroy call and are skipped; swapchain images go with their
/// swapchain. Returns the number of calls written.
///
/// # Errors
/// Stops at the first call the writer rejects.
pub fn write_destroy_packets<W: TraceWriter + ?Sized>(
    objects: &ObjectRegistry,
    writer: &mut W,
) -> Result<usize, TraceWriteError> {
    let mut out = Counted { writer, count: 0 };

    for (device, _) in objects.devices.in_creation_order() {
        out.write(ReplayCall::DeviceWaitIdle { device })?;
    }

    out.destroy_all(&objects.query_pools, |_| true)?;
    out.destroy_all(&objects.events, |_| true)?;
    out.destroy_all(&objects.fences, |_| true)?;
    out.destroy_all(&objects.semaphores, |_| true)?;

    for (pool, entry) in objects.descriptor_pools.in_creation_order() {
        if !entry.info.desc.can_free_sets() {
            continue;
        }
        let sets: Vec<vk::DescriptorSet> = objects
            .descriptor_sets
            .in_creation_order()
            .into_iter()
            .filter(|(_, set)| set.info.pool == pool)
            .map(|(set, _)| set)
            .collect();
        if !sets.is_empty() {
            out.write(ReplayCall::FreeDescriptorSets {
                device: entry.info.device,
                pool,
                sets,
            })?;
        }
    }

    out.destroy_all(&objects.framebuffers, |_| true)?;
    out.destroy_all(&objects.pipelines, |_| true)?;
    out.destroy_all(&objects.pipeline_caches, |_| true)?;
    out.destroy_all(&objects.render_passes, |_| true)?;
    out.destroy_all(&objects.pipeline_layouts, |_| true)?;
    out.destroy_all(&objects.descriptor_update_templates, |_| true)?;
    out.destroy_all(&objects.descriptor_set_layouts, |_| true)?;
    out.destroy_all(&objects.shader_modules, |_| true)?;
    out.destroy_all(&objects.samplers, |_| true)?;

    out.destroy_all(&objects.image_views, |_| true)?;
    out.destroy_all(&objects.images, |info| !info.is_swapchain_image)?;
    out.destroy_all(&objects.buffer_views, |_| true)?;
    out.destroy_all(&objects.buffers, |_| true)?;

    for (memory, entry) in objects.device_memory.in_creation_order().into_iter().rev() {
        if entry.info.mapped.is_some() {
            out.write(ReplayCall::UnmapMemory {
                device: entry.info.device,
                memory,
            })?;
        }
        out.write(ReplayCall::Destroy {
            device: entry.info.device,
            object: memory.into(),
        })?;
    }

    out.destroy_all(&objects.descriptor_pools, |_| true)?;

    for (pool, entry) in objects.command_pools.in_creation_order().into_iter().rev() {
        let command_buffers: Vec<vk::CommandBuffer> = objects
            .command_buffers
            .in_creation_order()
            .into_iter()
            .filter(|(_, command_buffer)| command_buffer.info.pool == pool)
            .map(|(command_buffer, _)| command_buffer)
            .collect();
        if !command_buffers.is_empty() {
            out.write(ReplayCall::FreeCommandBuffers {
                device: entry.info.device,
                pool,
                command_buffers,
            })?;
        }
        out.write(ReplayCall::Destroy {
            device: entry.info.device,
            object: pool.into(),
        })?;
    }

    out.destroy_all(&objects.swapchains, |_| true)?;

    for (device, _) in objects.devices.in_creation_order().into_iter().rev() {
        out.write(ReplayCall::DestroyDevice { device })?;
    }
    for (surface, entry) in objects.surfaces.in_creation_order().into_iter().rev() {
        out.write(ReplayCall::DestroySurface {
            instance: entry.info.instance,
            surface,
        })?;
    }
    for (instance, _) in objects.instances.in_creation_order().into_iter().rev() {
        out.write(ReplayCall::DestroyInstance { instance })?;
    }

    log::info!("Wrote {} destroy calls", out.count);
    Ok(out.count)
}

struct Counted<'a, W: TraceWriter + ?Sized> {
    writer: &'a mut W,
    count: usize,
}

impl<W: TraceWriter + ?Sized> Counted<'_, W> {
    fn write(&mut self, call: ReplayCall) -> Result<(), TraceWriteError> {
        self.count += 1;
        self.writer.write_call(call)
    }

    fn destroy_all<H, T>(
        &mut self,
        map: &ObjectMap<H, T>,
        keep: impl Fn(&T) -> bool,
    ) -> Result<(), TraceWriteError>
    where
        H: Handle + Copy + Eq + Hash + Into<ObjectHandle>,
        T: DeviceChild,
    {
        for (handle, entry) in map.in_creation_order().into_iter().rev() {
            if keep(&entry.info) {
                self.write(ReplayCall::Destroy {
                    device: entry.info.device(),
                    object: handle.into(),
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::desc::{DescriptorPoolDesc, ImageDesc};
    use crate::packet::TracePacket;
    use crate::trim::writer::MemoryTraceWriter;
    use crate::{StateTracker, TrackerSettings};

    fn names(calls: &[ReplayCall]) -> Vec<&'static str> {
        calls.iter().map(ReplayCall::name).collect()
    }

    #[test]
    fn test_reverse_dependency_order() {
        let tracker = StateTracker::new(TrackerSettings::default());
        let instance = vk::Instance::from_raw(1);
        let device = vk::Device::from_raw(2);
        let memory = vk::DeviceMemory::from_raw(3);
        let image = vk::Image::from_raw(4);
        let pool = vk::CommandPool::from_raw(5);
        let command_buffer = vk::CommandBuffer::from_raw(6);

        tracker.track_create_instance(instance, TracePacket::default());
        tracker.track_create_device(vk::PhysicalDevice::from_raw(9), device, TracePacket::default());
        tracker.track_get_device_queue(device, 0, 0, vk::Queue::from_raw(10));
        tracker.track_allocate_memory(device, memory, 64, 0);
        tracker.track_map_memory(memory, 0, 64, TracePacket::default());
        tracker.track_create_image(device, image, ImageDesc::default());
        tracker.track_create_command_pool(device, pool, vk::CommandPoolCreateFlags::empty(), 0);
        tracker.track_allocate_command_buffers(
            device,
            pool,
            vk::CommandBufferLevel::PRIMARY,
            &[command_buffer],
        );

        let mut writer = MemoryTraceWriter::new();
        let count = write_destroy_packets(&tracker.objects(), &mut writer).unwrap();

        assert_eq!(
            names(writer.calls()),
            vec![
                "vkDeviceWaitIdle",
                "vkDestroyImage",
                "vkUnmapMemory",
                "vkFreeMemory",
                "vkFreeCommandBuffers",
                "vkDestroyCommandPool",
                "vkDestroyDevice",
                "vkDestroyInstance",
            ]
        );
        assert_eq!(count, writer.len());
    }

    #[test]
    fn test_descriptor_sets_freed_only_from_freeable_pools() {
        let tracker = StateTracker::new(TrackerSettings::default());
        let device = vk::Device::from_raw(2);
        let freeable = vk::DescriptorPool::from_raw(20);
        let fixed = vk::DescriptorPool::from_raw(21);
        let layout = vk::DescriptorSetLayout::from_raw(22);

        tracker.track_create_descriptor_pool(
            device,
            freeable,
            DescriptorPoolDesc {
                flags: vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET,
                ..DescriptorPoolDesc::default()
            },
        );
        tracker.track_create_descriptor_pool(device, fixed, DescriptorPoolDesc::default());
        tracker.track_allocate_descriptor_sets(
            device,
            freeable,
            &[(vk::DescriptorSet::from_raw(30), layout)],
        );
        tracker.track_allocate_descriptor_sets(
            device,
            fixed,
            &[(vk::DescriptorSet::from_raw(31), layout)],
        );

        let mut writer = MemoryTraceWriter::new();
        write_destroy_packets(&tracker.objects(), &mut writer).unwrap();

        let freed: Vec<_> = writer
            .calls()
            .iter()
            .filter_map(|call| match call {
                ReplayCall::FreeDescriptorSets { pool, sets, .. } => Some((*pool, sets.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(freed, vec![(freeable, vec![vk::DescriptorSet::from_raw(30)])]);
        assert_eq!(
            writer
                .calls()
                .iter()
                .filter(|call| call.name() == "vkDestroyDescriptorPool")
                .count(),
            2
        );
    }

    #[test]
    fn test_swapchain_images_not_destroyed() {
        let mut objects = ObjectRegistry::new();
        let device = vk::Device::from_raw(2);
        objects.images.add(vk::Image::from_raw(40)).info.device = device;
        let entry = objects.images.add(vk::Image::from_raw(41));
        entry.info.device = device;
        entry.info.is_swapchain_image = true;

        let mut writer = MemoryTraceWriter::new();
        write_destroy_packets(&objects, &mut writer).unwrap();

        assert_eq!(writer.len(), 1);
        assert!(matches!(
            writer.calls()[0],
            ReplayCall::Destroy { object: ObjectHandle::Image(image), .. } if image.as_raw() == 40
        ));
    }
}
