//! Object state tracking
//!
//! [`StateTracker`] is the single object the interception layer feeds. Every
//! create, destroy and state-changing call lands in one of four stores:
//!
//! - the [`ObjectRegistry`] with a deep copy of each live object's creation
//!   metadata and its current state,
//! - the command-buffer call log holding recorded calls per command buffer,
//! - the transition log holding pending image layout and buffer access
//!   changes per command buffer,
//! - the ordered image list (only in ordered image mode).
//!
//! # Locking
//!
//! Each store sits behind its own `Mutex` and every method takes the
//! narrowest set of locks it needs. When more than one is held they are
//! always taken in the order objects → calls → transitions → image order;
//! [`StateTracker::snapshot`] holds all four so no add or remove can
//! interleave with the copy.
//!
//! A panic on an application thread while a lock is held poisons it. The
//! tracker keeps going with the data as left behind rather than taking the
//! application down with it.
//!
//! The tracker relies on the application's external synchronization of each
//! handle and adds no ordering of its own.
//!
//! # Example
//!
//! ```rust
//! use ash::vk::{self, Handle};
//! use vk_trim::objects::desc::BufferDesc;
//! use vk_trim::{StateTracker, TrackerSettings};
//!
//! let tracker = StateTracker::new(TrackerSettings::default());
//! let device = vk::Device::from_raw(1);
//! let buffer = vk::Buffer::from_raw(2);
//!
//! tracker.track_create_buffer(device, buffer, BufferDesc { size: 256, ..BufferDesc::default() });
//! let snapshot = tracker.snapshot();
//! tracker.track_destroy(buffer.into());
//!
//! assert!(snapshot.objects.buffers.contains(buffer));
//! assert!(!tracker.objects().buffers.contains(buffer));
//! ```

mod command_log;
mod image_order;
mod snapshot;
mod transitions;

pub use image_order::ImageCall;
pub use snapshot::TrackerSnapshot;
pub use transitions::{
    resolve_buffer_transitions, resolve_image_transitions, BufferTransition, ImageTransition,
};

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use ash::vk;

use crate::config::TrimConfig;
use crate::objects::desc::{
    BufferDesc, BufferViewDesc, DescriptorCopy, DescriptorPoolDesc, DescriptorSetLayoutDesc,
    DescriptorUpdateTemplateDesc, DescriptorWrite, FramebufferDesc, ImageDesc, ImageViewDesc,
    PipelineCacheDesc, PipelineDesc, PipelineLayoutDesc, QueryPoolDesc, RenderPassDesc,
    SamplerDesc, ShaderModuleDesc, SwapchainDesc,
};
use crate::objects::info::{
    BufferInfo, BufferViewInfo, CommandBufferInfo, CommandPoolInfo, DescriptorPoolInfo,
    DescriptorSetInfo, DescriptorSetLayoutInfo, DescriptorUpdateTemplateInfo, DeviceInfo,
    DeviceMemoryInfo, EventInfo, FenceInfo, FramebufferInfo, ImageInfo, ImageViewInfo,
    InstanceInfo, PhysicalDeviceInfo, PipelineCacheInfo, PipelineInfo, PipelineLayoutInfo,
    QueryPoolInfo, QueueInfo, RenderPassInfo, SamplerInfo, SemaphoreInfo, ShaderModuleInfo,
    SurfaceInfo, SwapchainInfo,
};
use crate::objects::{MappedRange, MemoryBinding, ObjectHandle, ObjectRegistry, WindowConnection};
use crate::packet::TracePacket;

use command_log::CommandLog;
use image_order::ImageOrder;
use transitions::TransitionLog;

/// Tracker behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Keep a global ordered list of image creation and destruction so the
    /// trimmed trace recreates images in their original order
    pub ordered_images: bool,
}

impl From<&TrimConfig> for TrackerSettings {
    fn from(config: &TrimConfig) -> Self {
        Self {
            ordered_images: config.ordered_images,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe tracker of every live Vulkan object
#[derive(Debug, Default)]
pub struct StateTracker {
    settings: TrackerSettings,
    objects: Mutex<ObjectRegistry>,
    command_calls: Mutex<CommandLog>,
    transitions: Mutex<TransitionLog>,
    image_order: Mutex<ImageOrder>,
    window_connection: OnceLock<WindowConnection>,
}

impl StateTracker {
    /// Create an empty tracker
    pub fn new(settings: TrackerSettings) -> Self {
        log::debug!("State tracker created with {settings:?}");
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Behavior switches the tracker was created with
    pub const fn settings(&self) -> TrackerSettings {
        self.settings
    }

    /// Lock the object registry
    ///
    /// Hold the guard briefly; every tracking call on other threads waits
    /// on it.
    pub fn objects(&self) -> MutexGuard<'_, ObjectRegistry> {
        lock(&self.objects)
    }

    /// Deep copy of the whole tracker
    pub fn snapshot(&self) -> TrackerSnapshot {
        let objects = lock(&self.objects);
        let calls = lock(&self.command_calls);
        let _transitions = lock(&self.transitions);
        let image_order = lock(&self.image_order);

        TrackerSnapshot {
            objects: objects.clone(),
            command_calls: calls.clone().into_map(),
            image_calls: self
                .settings
                .ordered_images
                .then(|| image_order.calls().to_vec()),
        }
    }

    /// Connection of the first surface the application created
    pub fn window_connection(&self) -> Option<WindowConnection> {
        self.window_connection.get().copied()
    }

    /// Flag an object as used inside the recording window
    pub fn mark_referenced(&self, handle: ObjectHandle) -> bool {
        lock(&self.objects).mark_referenced(handle)
    }

    /// Forget any object, with the side effects its category needs
    ///
    /// Destroying a null handle is a no-op, as in Vulkan.
    pub fn track_destroy(&self, handle: ObjectHandle) {
        if handle.raw() == 0 {
            return;
        }
        match handle {
            ObjectHandle::Instance(instance) => self.track_destroy_instance(instance),
            ObjectHandle::Device(device) => self.track_destroy_device(device),
            ObjectHandle::CommandPool(pool) => self.track_destroy_command_pool(pool),
            ObjectHandle::CommandBuffer(command_buffer) => {
                self.track_free_command_buffers(&[command_buffer]);
            }
            ObjectHandle::DescriptorPool(pool) => self.track_destroy_descriptor_pool(pool),
            ObjectHandle::Image(image) => self.track_destroy_image(image),
            ObjectHandle::Swapchain(swapchain) => {
                if !lock(&self.objects).remove_swapchain(swapchain) {
                    log::warn!("Destroying unknown {handle}");
                }
            }
            other => {
                if !lock(&self.objects).remove(other) {
                    log::warn!("Destroying unknown {other}");
                }
            }
        }
    }
}

// Command-buffer call log and transition lists
impl StateTracker {
    /// Append a recorded call to `command_buffer`'s log
    pub fn add_command_buffer_call(&self, command_buffer: vk::CommandBuffer, packet: TracePacket) {
        lock(&self.command_calls).add(command_buffer, packet);
    }

    /// Drop every recorded call of `command_buffer`
    pub fn remove_command_buffer_calls(&self, command_buffer: vk::CommandBuffer) -> usize {
        lock(&self.command_calls).remove(command_buffer)
    }

    /// Recorded calls of `command_buffer`, oldest first
    pub fn command_buffer_calls(&self, command_buffer: vk::CommandBuffer) -> Vec<TracePacket> {
        lock(&self.command_calls).get(command_buffer).to_vec()
    }

    /// Append an image transition to `command_buffer`
    pub fn add_image_transition(&self, command_buffer: vk::CommandBuffer, transition: ImageTransition) {
        lock(&self.transitions).add_image(command_buffer, transition);
    }

    /// Image transitions recorded in `command_buffer`
    pub fn image_transitions(&self, command_buffer: vk::CommandBuffer) -> Vec<ImageTransition> {
        lock(&self.transitions).images(command_buffer).to_vec()
    }

    /// Drop the image transitions of `command_buffer`
    pub fn clear_image_transitions(&self, command_buffer: vk::CommandBuffer) {
        lock(&self.transitions).clear_images(command_buffer);
    }

    /// Append a buffer transition to `command_buffer`
    pub fn add_buffer_transition(&self, command_buffer: vk::CommandBuffer, transition: BufferTransition) {
        lock(&self.transitions).add_buffer(command_buffer, transition);
    }

    /// Buffer transitions recorded in `command_buffer`
    pub fn buffer_transitions(&self, command_buffer: vk::CommandBuffer) -> Vec<BufferTransition> {
        lock(&self.transitions).buffers(command_buffer).to_vec()
    }

    /// Drop the buffer transitions of `command_buffer`
    pub fn clear_buffer_transitions(&self, command_buffer: vk::CommandBuffer) {
        lock(&self.transitions).clear_buffers(command_buffer);
    }

    /// Ordered image calls so far; empty unless ordered image mode is on
    pub fn image_calls(&self) -> Vec<ImageCall> {
        lock(&self.image_order).calls().to_vec()
    }

    fn forget_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        let mut calls = lock(&self.command_calls);
        let mut transitions = lock(&self.transitions);
        for command_buffer in command_buffers {
            calls.remove(*command_buffer);
            transitions.clear(*command_buffer);
        }
    }
}

// Instances, devices, queues and presentation
impl StateTracker {
    /// `vkCreateInstance`
    pub fn track_create_instance(&self, instance: vk::Instance, packet: TracePacket) {
        lock(&self.objects).instances.insert(
            instance,
            InstanceInfo {
                create_packet: Some(packet),
                enumerate_packets: Vec::new(),
            },
        );
        log::debug!("Tracking instance {instance:?}");
    }

    /// `vkEnumeratePhysicalDevices`, both the count query and the fill
    pub fn track_enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        physical_devices: &[vk::PhysicalDevice],
        packet: TracePacket,
    ) {
        let mut objects = lock(&self.objects);
        if let Some(entry) = objects.instances.get_mut(instance) {
            entry.info.enumerate_packets.push(packet);
        }
        for physical_device in physical_devices {
            if !objects.physical_devices.contains(*physical_device) {
                objects.physical_devices.insert(
                    *physical_device,
                    PhysicalDeviceInfo {
                        instance,
                        query_packets: Vec::new(),
                    },
                );
            }
        }
    }

    /// Property, feature or format query on a physical device
    pub fn track_physical_device_query(&self, physical_device: vk::PhysicalDevice, packet: TracePacket) {
        if let Some(entry) = lock(&self.objects).physical_devices.get_mut(physical_device) {
            entry.info.query_packets.push(packet);
        }
    }

    /// Platform surface creation
    ///
    /// The first surface's connection is kept for hot-key polling; later
    /// ones only land in their [`SurfaceInfo`].
    pub fn track_create_surface(
        &self,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
        connection: WindowConnection,
        packet: TracePacket,
    ) {
        lock(&self.objects).surfaces.insert(
            surface,
            SurfaceInfo {
                instance,
                connection,
                create_packet: Some(packet),
            },
        );
        if self.window_connection.set(connection).is_ok() {
            log::debug!("Window connection captured: {connection:?}");
        }
    }

    /// `vkCreateDevice`
    pub fn track_create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        device: vk::Device,
        packet: TracePacket,
    ) {
        lock(&self.objects).devices.insert(
            device,
            DeviceInfo {
                physical_device,
                create_packet: Some(packet),
            },
        );
        log::debug!("Tracking device {device:?}");
    }

    /// `vkGetDeviceQueue`; repeated queries of one queue are ignored
    pub fn track_get_device_queue(
        &self,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
        queue: vk::Queue,
    ) {
        let mut objects = lock(&self.objects);
        if !objects.queues.contains(queue) {
            objects.queues.insert(
                queue,
                QueueInfo {
                    device,
                    queue_family_index,
                    queue_index,
                },
            );
        }
    }

    /// `vkDestroyDevice`: drops the device and everything it owns
    pub fn track_destroy_device(&self, device: vk::Device) {
        let mut objects = lock(&self.objects);
        let removed = objects.remove_device_objects(device);
        self.forget_removed(&removed);
    }

    /// `vkDestroyInstance`: drops the instance and everything under it
    pub fn track_destroy_instance(&self, instance: vk::Instance) {
        let mut objects = lock(&self.objects);
        let removed = objects.remove_instance_objects(instance);
        self.forget_removed(&removed);
    }

    // Called with the objects lock held.
    fn forget_removed(&self, removed: &[ObjectHandle]) {
        let command_buffers: Vec<vk::CommandBuffer> = removed
            .iter()
            .filter_map(|handle| match handle {
                ObjectHandle::CommandBuffer(command_buffer) => Some(*command_buffer),
                _ => None,
            })
            .collect();
        self.forget_command_buffers(&command_buffers);

        let mut image_order = lock(&self.image_order);
        for handle in removed {
            if let ObjectHandle::Device(device) = handle {
                image_order.remove_device(*device);
            }
        }
    }

    /// `vkCreateSwapchainKHR`
    pub fn track_create_swapchain(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        desc: SwapchainDesc,
        packet: TracePacket,
    ) {
        lock(&self.objects).swapchains.insert(
            swapchain,
            SwapchainInfo {
                device,
                desc,
                create_packet: Some(packet),
                image_packets: Vec::new(),
                images: Vec::new(),
            },
        );
    }

    /// `vkGetSwapchainImagesKHR`, both the count query and the fill
    pub fn track_get_swapchain_images(
        &self,
        swapchain: vk::SwapchainKHR,
        images: &[vk::Image],
        packet: TracePacket,
    ) {
        let mut objects = lock(&self.objects);
        let Some(entry) = objects.swapchains.get_mut(swapchain) else {
            log::warn!("Images queried from unknown swapchain {swapchain:?}");
            return;
        };
        entry.info.image_packets.push(packet);
        if images.is_empty() {
            return;
        }
        entry.info.images = images.to_vec();
        let device = entry.info.device;
        let image_desc = entry.info.desc.image_desc();

        for image in images {
            if !objects.images.contains(*image) {
                objects.images.insert(
                    *image,
                    ImageInfo {
                        device,
                        desc: image_desc.clone(),
                        is_swapchain_image: true,
                        ..ImageInfo::default()
                    },
                );
            }
        }
    }
}

// Command pools, command buffers and submission
impl StateTracker {
    /// `vkCreateCommandPool`
    pub fn track_create_command_pool(
        &self,
        device: vk::Device,
        pool: vk::CommandPool,
        flags: vk::CommandPoolCreateFlags,
        queue_family_index: u32,
    ) {
        lock(&self.objects).command_pools.insert(
            pool,
            CommandPoolInfo {
                device,
                flags,
                queue_family_index,
            },
        );
    }

    /// `vkDestroyCommandPool`: frees every command buffer of the pool
    pub fn track_destroy_command_pool(&self, pool: vk::CommandPool) {
        let mut objects = lock(&self.objects);
        let freed = objects
            .command_buffers
            .remove_where(|_, entry| entry.info.pool == pool);
        objects.command_pools.remove(pool);
        self.forget_command_buffers(&freed);
    }

    /// `vkResetCommandPool`: resets every command buffer of the pool
    pub fn track_reset_command_pool(&self, pool: vk::CommandPool) {
        let objects = lock(&self.objects);
        let reset: Vec<vk::CommandBuffer> = objects
            .command_buffers
            .iter()
            .filter(|(_, entry)| entry.info.pool == pool)
            .map(|(handle, _)| handle)
            .collect();
        self.forget_command_buffers(&reset);
    }

    /// `vkAllocateCommandBuffers`
    pub fn track_allocate_command_buffers(
        &self,
        device: vk::Device,
        pool: vk::CommandPool,
        level: vk::CommandBufferLevel,
        command_buffers: &[vk::CommandBuffer],
    ) {
        let mut objects = lock(&self.objects);
        for command_buffer in command_buffers {
            objects.command_buffers.insert(
                *command_buffer,
                CommandBufferInfo {
                    device,
                    pool,
                    level,
                    active_render_pass: None,
                    submit_queue: None,
                },
            );
        }
    }

    /// `vkFreeCommandBuffers`
    pub fn track_free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        let mut objects = lock(&self.objects);
        for command_buffer in command_buffers {
            objects.command_buffers.remove(*command_buffer);
        }
        self.forget_command_buffers(command_buffers);
    }

    /// `vkBeginCommandBuffer`, which implicitly resets the buffer
    pub fn track_begin_command_buffer(&self, command_buffer: vk::CommandBuffer) {
        self.track_reset_command_buffer(command_buffer);
    }

    /// `vkResetCommandBuffer`: clears the call log and pending transitions
    pub fn track_reset_command_buffer(&self, command_buffer: vk::CommandBuffer) {
        let mut objects = lock(&self.objects);
        if let Some(entry) = objects.command_buffers.get_mut(command_buffer) {
            entry.info.active_render_pass = None;
        }
        self.forget_command_buffers(&[command_buffer]);
    }

    /// `vkCmdPipelineBarrier`: records the layout and access changes
    pub fn track_pipeline_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        image_barriers: &[vk::ImageMemoryBarrier],
        buffer_barriers: &[vk::BufferMemoryBarrier],
    ) {
        let mut transitions = lock(&self.transitions);
        for barrier in image_barriers {
            transitions.add_image(command_buffer, ImageTransition::from_barrier(barrier));
        }
        for barrier in buffer_barriers {
            transitions.add_buffer(command_buffer, BufferTransition::from_barrier(barrier));
        }
    }

    /// `vkCmdBeginRenderPass`: every framebuffer attachment transitions to
    /// its attachment's final layout
    pub fn track_begin_render_pass(
        &self,
        command_buffer: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
    ) {
        let mut objects = lock(&self.objects);
        if let Some(entry) = objects.command_buffers.get_mut(command_buffer) {
            entry.info.active_render_pass = Some(render_pass);
        }

        let Some(pass) = objects.render_passes.get(render_pass).and_then(|e| e.info.latest()) else {
            log::warn!("Render pass {render_pass:?} begun but not tracked");
            return;
        };
        let Some(framebuffer_entry) = objects.framebuffers.get(framebuffer) else {
            log::warn!("Framebuffer {framebuffer:?} begun but not tracked");
            return;
        };

        let mut transitions = lock(&self.transitions);
        for (index, view) in framebuffer_entry.info.desc.attachments.iter().enumerate() {
            let (Some(attachment), Some(view_entry)) =
                (pass.attachments.get(index), objects.image_views.get(*view))
            else {
                continue;
            };
            transitions.add_image(
                command_buffer,
                ImageTransition {
                    image: view_entry.info.desc.image,
                    src_access_mask: vk::AccessFlags::empty(),
                    dst_access_mask: vk::AccessFlags::empty(),
                    old_layout: attachment.initial_layout,
                    new_layout: attachment.final_layout,
                },
            );
        }
    }

    /// `vkCmdEndRenderPass`
    pub fn track_end_render_pass(&self, command_buffer: vk::CommandBuffer) {
        if let Some(entry) = lock(&self.objects).command_buffers.get_mut(command_buffer) {
            entry.info.active_render_pass = None;
        }
    }

    /// `vkQueueSubmit`: applies the submitted buffers' transitions and
    /// updates semaphore and fence signal state
    ///
    /// A null `fence` means no fence.
    pub fn track_queue_submit(
        &self,
        queue: vk::Queue,
        command_buffers: &[vk::CommandBuffer],
        wait_semaphores: &[vk::Semaphore],
        signal_semaphores: &[vk::Semaphore],
        fence: vk::Fence,
    ) {
        let mut objects = lock(&self.objects);
        {
            let transitions = lock(&self.transitions);
            for command_buffer in command_buffers {
                for (image, layout, access) in
                    resolve_image_transitions(transitions.images(*command_buffer))
                {
                    if let Some(entry) = objects.images.get_mut(image) {
                        entry.info.current_layout = layout;
                        entry.info.access_mask = access;
                    }
                }
                for (buffer, access) in
                    resolve_buffer_transitions(transitions.buffers(*command_buffer))
                {
                    if let Some(entry) = objects.buffers.get_mut(buffer) {
                        entry.info.access_mask = access;
                    }
                }
                if let Some(entry) = objects.command_buffers.get_mut(*command_buffer) {
                    entry.info.submit_queue = Some(queue);
                }
            }
        }

        for semaphore in wait_semaphores {
            if let Some(entry) = objects.semaphores.get_mut(*semaphore) {
                entry.info.signaled = false;
            }
        }
        for semaphore in signal_semaphores {
            if let Some(entry) = objects.semaphores.get_mut(*semaphore) {
                entry.info.signaled = true;
            }
        }
        if let Some(entry) = objects.fences.get_mut(fence) {
            entry.info.signaled = true;
        }
    }
}

// Memory, buffers, images and their views
impl StateTracker {
    /// `vkAllocateMemory`
    pub fn track_allocate_memory(
        &self,
        device: vk::Device,
        memory: vk::DeviceMemory,
        allocation_size: vk::DeviceSize,
        memory_type_index: u32,
    ) {
        lock(&self.objects).device_memory.insert(
            memory,
            DeviceMemoryInfo {
                device,
                allocation_size,
                memory_type_index,
                mapped: None,
                map_packet: None,
            },
        );
    }

    /// `vkMapMemory`
    pub fn track_map_memory(
        &self,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        packet: TracePacket,
    ) {
        if let Some(entry) = lock(&self.objects).device_memory.get_mut(memory) {
            entry.info.mapped = Some(MappedRange { offset, size });
            entry.info.map_packet = Some(packet);
        }
    }

    /// `vkUnmapMemory`
    pub fn track_unmap_memory(&self, memory: vk::DeviceMemory) {
        if let Some(entry) = lock(&self.objects).device_memory.get_mut(memory) {
            entry.info.mapped = None;
            entry.info.map_packet = None;
        }
    }

    /// `vkCreateBuffer`
    pub fn track_create_buffer(&self, device: vk::Device, buffer: vk::Buffer, desc: BufferDesc) {
        lock(&self.objects).buffers.insert(
            buffer,
            BufferInfo {
                device,
                desc,
                ..BufferInfo::default()
            },
        );
    }

    /// `vkGetBufferMemoryRequirements`
    pub fn track_buffer_memory_requirements(
        &self,
        buffer: vk::Buffer,
        requirements: vk::MemoryRequirements,
    ) {
        if let Some(entry) = lock(&self.objects).buffers.get_mut(buffer) {
            entry.info.memory_requirements = Some(requirements);
        }
    }

    /// `vkBindBufferMemory`
    pub fn track_bind_buffer_memory(
        &self,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) {
        if let Some(entry) = lock(&self.objects).buffers.get_mut(buffer) {
            entry.info.memory = Some(MemoryBinding { memory, offset });
        }
    }

    /// `vkCreateBufferView`
    pub fn track_create_buffer_view(&self, device: vk::Device, view: vk::BufferView, desc: BufferViewDesc) {
        lock(&self.objects)
            .buffer_views
            .insert(view, BufferViewInfo { device, desc });
    }

    /// `vkCreateImage`; also appended to the ordered list in ordered image mode
    pub fn track_create_image(&self, device: vk::Device, image: vk::Image, desc: ImageDesc) {
        let mut objects = lock(&self.objects);
        if self.settings.ordered_images {
            lock(&self.image_order).push(ImageCall::Create {
                device,
                image,
                desc: desc.clone(),
            });
        }
        objects.images.insert(
            image,
            ImageInfo {
                device,
                current_layout: desc.initial_layout,
                desc,
                ..ImageInfo::default()
            },
        );
    }

    /// `vkDestroyImage`; also appended to the ordered list in ordered image mode
    pub fn track_destroy_image(&self, image: vk::Image) {
        let mut objects = lock(&self.objects);
        let Some(entry) = objects.images.remove(image) else {
            log::warn!("Destroying unknown image {image:?}");
            return;
        };
        if self.settings.ordered_images {
            lock(&self.image_order).push(ImageCall::Destroy {
                device: entry.info.device,
                image,
            });
        }
    }

    /// `vkGetImageMemoryRequirements`
    pub fn track_image_memory_requirements(
        &self,
        image: vk::Image,
        requirements: vk::MemoryRequirements,
    ) {
        if let Some(entry) = lock(&self.objects).images.get_mut(image) {
            entry.info.memory_requirements = Some(requirements);
        }
    }

    /// `vkBindImageMemory`
    pub fn track_bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) {
        if let Some(entry) = lock(&self.objects).images.get_mut(image) {
            entry.info.memory = Some(MemoryBinding { memory, offset });
        }
    }

    /// `vkCreateImageView`
    pub fn track_create_image_view(&self, device: vk::Device, view: vk::ImageView, desc: ImageViewDesc) {
        lock(&self.objects)
            .image_views
            .insert(view, ImageViewInfo { device, desc });
    }

    /// `vkCreateSampler`
    pub fn track_create_sampler(&self, device: vk::Device, sampler: vk::Sampler, desc: SamplerDesc) {
        lock(&self.objects)
            .samplers
            .insert(sampler, SamplerInfo { device, desc });
    }

    /// `vkCreateFramebuffer`
    pub fn track_create_framebuffer(
        &self,
        device: vk::Device,
        framebuffer: vk::Framebuffer,
        desc: FramebufferDesc,
    ) {
        lock(&self.objects)
            .framebuffers
            .insert(framebuffer, FramebufferInfo { device, desc });
    }
}

// Shaders, layouts, render passes and pipelines
impl StateTracker {
    /// `vkCreateShaderModule`
    pub fn track_create_shader_module(
        &self,
        device: vk::Device,
        module: vk::ShaderModule,
        desc: ShaderModuleDesc,
    ) {
        lock(&self.objects)
            .shader_modules
            .insert(module, ShaderModuleInfo { device, desc });
    }

    /// `vkCreateDescriptorSetLayout`
    pub fn track_create_descriptor_set_layout(
        &self,
        device: vk::Device,
        layout: vk::DescriptorSetLayout,
        desc: DescriptorSetLayoutDesc,
    ) {
        lock(&self.objects)
            .descriptor_set_layouts
            .insert(layout, DescriptorSetLayoutInfo { device, desc });
    }

    /// `vkCreateDescriptorUpdateTemplate`
    pub fn track_create_descriptor_update_template(
        &self,
        device: vk::Device,
        template: vk::DescriptorUpdateTemplate,
        desc: DescriptorUpdateTemplateDesc,
    ) {
        lock(&self.objects)
            .descriptor_update_templates
            .insert(template, DescriptorUpdateTemplateInfo { device, desc });
    }

    /// `vkCreatePipelineLayout`; copies the referenced set layouts
    pub fn track_create_pipeline_layout(
        &self,
        device: vk::Device,
        layout: vk::PipelineLayout,
        desc: PipelineLayoutDesc,
    ) {
        let mut objects = lock(&self.objects);
        let set_layout_descs: Vec<Option<DescriptorSetLayoutDesc>> = desc
            .set_layouts
            .iter()
            .map(|set_layout| {
                let copy = objects
                    .descriptor_set_layouts
                    .get(*set_layout)
                    .map(|entry| entry.info.desc.clone());
                if copy.is_none() {
                    log::warn!("Pipeline layout {layout:?} references unknown set layout {set_layout:?}");
                }
                copy
            })
            .collect();

        objects.pipeline_layouts.insert(
            layout,
            PipelineLayoutInfo {
                device,
                desc,
                set_layout_descs,
            },
        );
    }

    /// `vkCreateRenderPass`
    ///
    /// Creating a handle that is still live appends a new version instead
    /// of replacing the entry. Returns the version now current.
    pub fn track_create_render_pass(
        &self,
        device: vk::Device,
        render_pass: vk::RenderPass,
        desc: RenderPassDesc,
    ) -> u32 {
        let mut objects = lock(&self.objects);
        if objects.render_passes.contains(render_pass) {
            return objects
                .add_render_pass_create_info(render_pass, desc)
                .unwrap_or_default();
        }
        objects.render_passes.insert(
            render_pass,
            RenderPassInfo {
                device,
                versions: vec![desc],
            },
        );
        0
    }

    /// `vkCreatePipelineCache`
    pub fn track_create_pipeline_cache(
        &self,
        device: vk::Device,
        cache: vk::PipelineCache,
        desc: PipelineCacheDesc,
    ) {
        lock(&self.objects)
            .pipeline_caches
            .insert(cache, PipelineCacheInfo { device, desc });
    }

    /// `vkCreateGraphicsPipelines` / `vkCreateComputePipelines`, per pipeline
    ///
    /// Copies the shader modules of every stage and the current version of
    /// the render pass, so the pipeline can be rebuilt after either is gone.
    pub fn track_create_pipeline(
        &self,
        device: vk::Device,
        cache: vk::PipelineCache,
        pipeline: vk::Pipeline,
        desc: PipelineDesc,
    ) {
        let mut objects = lock(&self.objects);

        let mut shader_modules: Vec<(vk::ShaderModule, ShaderModuleDesc)> = Vec::new();
        for stage in desc.stages() {
            if shader_modules.iter().any(|(module, _)| *module == stage.module) {
                continue;
            }
            match objects.shader_modules.get(stage.module) {
                Some(entry) => shader_modules.push((stage.module, entry.info.desc.clone())),
                None => log::warn!(
                    "Pipeline {pipeline:?} references unknown shader module {:?}",
                    stage.module
                ),
            }
        }

        let (render_pass_version, render_pass_desc) = desc
            .render_pass()
            .and_then(|render_pass| objects.render_passes.get(render_pass))
            .and_then(|entry| Some((entry.info.current_version()?, entry.info.latest().cloned())))
            .unwrap_or((0, None));

        objects.pipelines.insert(
            pipeline,
            PipelineInfo {
                device,
                cache,
                desc,
                shader_modules,
                render_pass_version,
                render_pass_desc,
            },
        );
    }
}

// Descriptors
impl StateTracker {
    /// `vkCreateDescriptorPool`
    pub fn track_create_descriptor_pool(
        &self,
        device: vk::Device,
        pool: vk::DescriptorPool,
        desc: DescriptorPoolDesc,
    ) {
        lock(&self.objects)
            .descriptor_pools
            .insert(pool, DescriptorPoolInfo { device, desc });
    }

    /// `vkDestroyDescriptorPool`: frees the pool's sets
    pub fn track_destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        let mut objects = lock(&self.objects);
        objects.descriptor_pools.remove(pool);
        objects
            .descriptor_sets
            .remove_where(|_, entry| entry.info.pool == pool);
    }

    /// `vkResetDescriptorPool`: frees the pool's sets
    pub fn track_reset_descriptor_pool(&self, pool: vk::DescriptorPool) {
        lock(&self.objects)
            .descriptor_sets
            .remove_where(|_, entry| entry.info.pool == pool);
    }

    /// `vkAllocateDescriptorSets`, as (set, layout) pairs
    ///
    /// Each set keeps a copy of its layout, which may be destroyed while the
    /// set lives on.
    pub fn track_allocate_descriptor_sets(
        &self,
        device: vk::Device,
        pool: vk::DescriptorPool,
        sets: &[(vk::DescriptorSet, vk::DescriptorSetLayout)],
    ) {
        let mut objects = lock(&self.objects);
        for (set, layout) in sets {
            let layout_desc = objects
                .descriptor_set_layouts
                .get(*layout)
                .map(|entry| entry.info.desc.clone());
            if layout_desc.is_none() {
                log::warn!("Descriptor set {set:?} allocated with unknown layout {layout:?}");
            }
            objects.descriptor_sets.insert(
                *set,
                DescriptorSetInfo {
                    device,
                    pool,
                    layout: *layout,
                    layout_desc,
                    ..DescriptorSetInfo::default()
                },
            );
        }
    }

    /// `vkFreeDescriptorSets`
    pub fn track_free_descriptor_sets(&self, sets: &[vk::DescriptorSet]) {
        let mut objects = lock(&self.objects);
        for set in sets {
            objects.descriptor_sets.remove(*set);
        }
    }

    /// `vkUpdateDescriptorSets`
    ///
    /// Writes apply first, then copies in order, as in Vulkan. A copy takes
    /// the source's contents at this point, so later changes to the source
    /// do not reach the destination.
    pub fn track_update_descriptor_sets(
        &self,
        writes: impl IntoIterator<Item = DescriptorWrite>,
        copies: &[DescriptorCopy],
    ) {
        let mut objects = lock(&self.objects);
        for write in writes {
            match objects.descriptor_sets.get_mut(write.dst_set) {
                Some(entry) => entry.info.record_write(&write),
                None => log::warn!("Write to unknown descriptor set {:?}", write.dst_set),
            }
        }
        for copy in copies {
            let Some(source) = objects.descriptor_sets.get(copy.src_set) else {
                log::warn!("Copy from unknown descriptor set {:?}", copy.src_set);
                continue;
            };
            let values = source
                .info
                .read(copy.src_binding, copy.src_array_element, copy.descriptor_count);
            match objects.descriptor_sets.get_mut(copy.dst_set) {
                Some(entry) => entry.info.assign(copy.dst_binding, copy.dst_array_element, &values),
                None => log::warn!("Copy to unknown descriptor set {:?}", copy.dst_set),
            }
        }
    }
}

// Synchronization and queries
impl StateTracker {
    /// `vkCreateSemaphore`
    pub fn track_create_semaphore(&self, device: vk::Device, semaphore: vk::Semaphore) {
        lock(&self.objects).semaphores.insert(
            semaphore,
            SemaphoreInfo {
                device,
                signaled: false,
            },
        );
    }

    /// `vkCreateFence`
    pub fn track_create_fence(&self, device: vk::Device, fence: vk::Fence, signaled: bool) {
        lock(&self.objects)
            .fences
            .insert(fence, FenceInfo { device, signaled });
    }

    /// `vkResetFences`
    pub fn track_reset_fences(&self, fences: &[vk::Fence]) {
        let mut objects = lock(&self.objects);
        for fence in fences {
            if let Some(entry) = objects.fences.get_mut(*fence) {
                entry.info.signaled = false;
            }
        }
    }

    /// `vkCreateEvent`
    pub fn track_create_event(&self, device: vk::Device, event: vk::Event) {
        lock(&self.objects).events.insert(
            event,
            EventInfo {
                device,
                signaled: false,
            },
        );
    }

    /// `vkSetEvent` / `vkResetEvent`
    pub fn track_set_event(&self, event: vk::Event, signaled: bool) {
        if let Some(entry) = lock(&self.objects).events.get_mut(event) {
            entry.info.signaled = signaled;
        }
    }

    /// `vkCreateQueryPool`
    pub fn track_create_query_pool(&self, device: vk::Device, pool: vk::QueryPool, desc: QueryPoolDesc) {
        lock(&self.objects)
            .query_pools
            .insert(pool, QueryPoolInfo { device, desc });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn device() -> vk::Device {
        vk::Device::from_raw(1)
    }

    fn packet(call_id: u32) -> TracePacket {
        TracePacket::new(call_id, vec![0u8; 4])
    }

    #[test]
    fn test_reset_clears_call_log_and_transitions() {
        let tracker = StateTracker::default();
        let command_buffer = vk::CommandBuffer::from_raw(5);
        tracker.track_allocate_command_buffers(
            device(),
            vk::CommandPool::from_raw(4),
            vk::CommandBufferLevel::PRIMARY,
            &[command_buffer],
        );
        tracker.add_command_buffer_call(command_buffer, packet(1));
        tracker.add_command_buffer_call(command_buffer, packet(2));
        tracker.add_buffer_transition(
            command_buffer,
            BufferTransition {
                buffer: vk::Buffer::from_raw(9),
                src_access_mask: vk::AccessFlags::empty(),
                dst_access_mask: vk::AccessFlags::SHADER_READ,
            },
        );

        tracker.track_reset_command_buffer(command_buffer);

        assert!(tracker.command_buffer_calls(command_buffer).is_empty());
        assert!(tracker.buffer_transitions(command_buffer).is_empty());
        assert!(tracker.objects().command_buffers.contains(command_buffer));
    }

    #[test]
    fn test_submit_applies_last_transition() {
        let tracker = StateTracker::default();
        let image = vk::Image::from_raw(20);
        let command_buffer = vk::CommandBuffer::from_raw(21);
        let queue = vk::Queue::from_raw(22);
        let semaphore = vk::Semaphore::from_raw(23);
        let fence = vk::Fence::from_raw(24);

        tracker.track_create_image(device(), image, ImageDesc::default());
        tracker.track_allocate_command_buffers(
            device(),
            vk::CommandPool::from_raw(1),
            vk::CommandBufferLevel::PRIMARY,
            &[command_buffer],
        );
        tracker.track_create_semaphore(device(), semaphore);
        tracker.track_create_fence(device(), fence, false);

        let barriers = [
            vk::ImageMemoryBarrier {
                image,
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                dst_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                ..Default::default()
            },
            vk::ImageMemoryBarrier {
                image,
                old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                dst_access_mask: vk::AccessFlags::SHADER_READ,
                ..Default::default()
            },
        ];
        tracker.track_pipeline_barrier(command_buffer, &barriers, &[]);

        // Nothing applies before submission.
        assert_eq!(
            tracker.objects().images.get(image).unwrap().info.current_layout,
            vk::ImageLayout::UNDEFINED
        );

        tracker.track_queue_submit(queue, &[command_buffer], &[], &[semaphore], fence);

        let objects = tracker.objects();
        let image_info = &objects.images.get(image).unwrap().info;
        assert_eq!(image_info.current_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(image_info.access_mask, vk::AccessFlags::SHADER_READ);
        assert_eq!(
            objects.command_buffers.get(command_buffer).unwrap().info.submit_queue,
            Some(queue)
        );
        assert!(objects.semaphores.get(semaphore).unwrap().info.signaled);
        assert!(objects.fences.get(fence).unwrap().info.signaled);
    }

    #[test]
    fn test_render_pass_begin_records_final_layouts() {
        let tracker = StateTracker::default();
        let image = vk::Image::from_raw(30);
        let view = vk::ImageView::from_raw(31);
        let render_pass = vk::RenderPass::from_raw(32);
        let framebuffer = vk::Framebuffer::from_raw(33);
        let command_buffer = vk::CommandBuffer::from_raw(34);

        tracker.track_create_image(device(), image, ImageDesc::default());
        tracker.track_create_image_view(
            device(),
            view,
            ImageViewDesc {
                image,
                ..ImageViewDesc::default()
            },
        );
        tracker.track_create_render_pass(
            device(),
            render_pass,
            RenderPassDesc {
                attachments: vec![vk::AttachmentDescription {
                    final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
                    ..Default::default()
                }],
                ..RenderPassDesc::default()
            },
        );
        tracker.track_create_framebuffer(
            device(),
            framebuffer,
            FramebufferDesc {
                render_pass,
                attachments: vec![view],
                ..FramebufferDesc::default()
            },
        );

        tracker.track_begin_render_pass(command_buffer, render_pass, framebuffer);

        let transitions = tracker.image_transitions(command_buffer);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].image, image);
        assert_eq!(transitions[0].new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn test_render_pass_recreation_appends_version() {
        let tracker = StateTracker::default();
        let render_pass = vk::RenderPass::from_raw(40);
        assert_eq!(tracker.track_create_render_pass(device(), render_pass, RenderPassDesc::default()), 0);
        assert_eq!(tracker.track_create_render_pass(device(), render_pass, RenderPassDesc::default()), 1);
        assert_eq!(tracker.objects().render_pass_version(render_pass), Some(1));
    }

    #[test]
    fn test_pipeline_copies_modules_and_render_pass() {
        use crate::objects::desc::{GraphicsPipelineDesc, ShaderStageDesc};

        let tracker = StateTracker::default();
        let module = vk::ShaderModule::from_raw(50);
        let render_pass = vk::RenderPass::from_raw(51);
        let pipeline = vk::Pipeline::from_raw(52);

        tracker.track_create_shader_module(device(), module, ShaderModuleDesc::from_words(vec![1, 2]));
        tracker.track_create_render_pass(device(), render_pass, RenderPassDesc::default());
        tracker.track_create_pipeline(
            device(),
            vk::PipelineCache::null(),
            pipeline,
            PipelineDesc::Graphics(Box::new(GraphicsPipelineDesc {
                stages: vec![
                    ShaderStageDesc {
                        module,
                        ..ShaderStageDesc::default()
                    },
                    ShaderStageDesc {
                        module,
                        ..ShaderStageDesc::default()
                    },
                ],
                render_pass,
                ..GraphicsPipelineDesc::default()
            })),
        );
        tracker.track_destroy(module.into());

        let objects = tracker.objects();
        let info = &objects.pipelines.get(pipeline).unwrap().info;
        assert_eq!(info.shader_modules.len(), 1);
        assert_eq!(info.shader_module(module).unwrap().code, vec![1, 2]);
        assert!(info.render_pass_desc.is_some());
        assert!(!objects.shader_modules.contains(module));
    }

    #[test]
    fn test_destroy_command_pool_frees_buffers_and_logs() {
        let tracker = StateTracker::default();
        let pool = vk::CommandPool::from_raw(60);
        let buffers = [vk::CommandBuffer::from_raw(61), vk::CommandBuffer::from_raw(62)];
        tracker.track_create_command_pool(device(), pool, vk::CommandPoolCreateFlags::empty(), 0);
        tracker.track_allocate_command_buffers(device(), pool, vk::CommandBufferLevel::PRIMARY, &buffers);
        tracker.add_command_buffer_call(buffers[0], packet(3));

        tracker.track_destroy(pool.into());

        assert!(tracker.objects().command_buffers.is_empty());
        assert!(tracker.command_buffer_calls(buffers[0]).is_empty());
    }

    #[test]
    fn test_device_destroy_drops_children_and_logs() {
        let tracker = StateTracker::new(TrackerSettings {
            ordered_images: true,
        });
        let command_buffer = vk::CommandBuffer::from_raw(71);
        tracker.track_create_device(vk::PhysicalDevice::from_raw(2), device(), packet(0));
        tracker.track_create_image(device(), vk::Image::from_raw(70), ImageDesc::default());
        tracker.track_allocate_command_buffers(
            device(),
            vk::CommandPool::from_raw(72),
            vk::CommandBufferLevel::PRIMARY,
            &[command_buffer],
        );
        tracker.add_command_buffer_call(command_buffer, packet(4));

        tracker.track_destroy(device().into());

        assert!(tracker.objects().is_empty());
        assert!(tracker.command_buffer_calls(command_buffer).is_empty());
        assert!(tracker.image_calls().is_empty());
    }

    #[test]
    fn test_swapchain_images_are_tracked_once() {
        let tracker = StateTracker::default();
        let swapchain = vk::SwapchainKHR::from_raw(80);
        let images = [vk::Image::from_raw(81), vk::Image::from_raw(82)];
        tracker.track_create_swapchain(
            device(),
            swapchain,
            SwapchainDesc {
                image_format: vk::Format::B8G8R8A8_SRGB,
                ..SwapchainDesc::default()
            },
            packet(5),
        );
        tracker.track_get_swapchain_images(swapchain, &[], packet(6));
        tracker.track_get_swapchain_images(swapchain, &images, packet(6));

        let objects = tracker.objects();
        assert_eq!(objects.swapchains.get(swapchain).unwrap().info.image_packets.len(), 2);
        let image = &objects.images.get(images[1]).unwrap().info;
        assert!(image.is_swapchain_image);
        assert_eq!(image.desc.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_descriptor_updates_replace_slot() {
        use crate::objects::desc::DescriptorPayload;

        let tracker = StateTracker::default();
        let pool = vk::DescriptorPool::from_raw(90);
        let set = vk::DescriptorSet::from_raw(91);
        tracker.track_create_descriptor_pool(device(), pool, DescriptorPoolDesc::default());
        tracker.track_allocate_descriptor_sets(
            device(),
            pool,
            &[(set, vk::DescriptorSetLayout::from_raw(92))],
        );

        let write = |buffer: u64| DescriptorWrite {
            dst_set: set,
            dst_binding: 0,
            descriptor_count: 1,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            payload: DescriptorPayload::Buffers(vec![vk::DescriptorBufferInfo {
                buffer: vk::Buffer::from_raw(buffer),
                offset: 0,
                range: 64,
            }]),
            ..DescriptorWrite::default()
        };
        tracker.track_update_descriptor_sets([write(1)], &[]);
        tracker.track_update_descriptor_sets([write(2)], &[]);

        {
            let objects = tracker.objects();
            let info = &objects.descriptor_sets.get(set).unwrap().info;
            assert_eq!(info.descriptors.len(), 1);
            assert_eq!(info.writes(set).len(), 1);
        }

        tracker.track_destroy(pool.into());
        assert!(tracker.objects().descriptor_sets.is_empty());
    }

    #[test]
    fn test_descriptor_copies_resolve_in_application_order() {
        use crate::objects::desc::{DescriptorPayload, DescriptorValue};

        let tracker = StateTracker::default();
        let pool = vk::DescriptorPool::from_raw(93);
        let layout = vk::DescriptorSetLayout::from_raw(94);
        let set_a = vk::DescriptorSet::from_raw(0xa);
        let set_b = vk::DescriptorSet::from_raw(0xb);
        tracker.track_create_descriptor_pool(device(), pool, DescriptorPoolDesc::default());
        tracker.track_allocate_descriptor_sets(device(), pool, &[(set_a, layout), (set_b, layout)]);

        let write = |set: vk::DescriptorSet, buffer: u64| DescriptorWrite {
            dst_set: set,
            descriptor_count: 1,
            descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
            payload: DescriptorPayload::Buffers(vec![vk::DescriptorBufferInfo {
                buffer: vk::Buffer::from_raw(buffer),
                offset: 0,
                range: vk::WHOLE_SIZE,
            }]),
            ..DescriptorWrite::default()
        };
        let copy_b_to_a = DescriptorCopy {
            src_set: set_b,
            dst_set: set_a,
            descriptor_count: 1,
            ..DescriptorCopy::default()
        };

        tracker.track_update_descriptor_sets([write(set_b, 300)], &[]);
        tracker.track_update_descriptor_sets(Vec::<DescriptorWrite>::new(), &[copy_b_to_a]);
        let buffer_in = |set: vk::DescriptorSet| {
            let objects = tracker.objects();
            match objects.descriptor_sets.get(set).unwrap().info.descriptors.get(&(0, 0)) {
                Some(bound) => match bound.value {
                    DescriptorValue::Buffer(info) => Some(info.buffer.as_raw()),
                    _ => None,
                },
                None => None,
            }
        };
        assert_eq!(buffer_in(set_a), Some(300));

        // A later write to the destination wins over the earlier copy
        tracker.track_update_descriptor_sets([write(set_a, 400)], &[]);
        assert_eq!(buffer_in(set_a), Some(400));

        // A later write to the source does not reach the destination
        tracker.track_update_descriptor_sets([write(set_b, 500)], &[]);
        assert_eq!(buffer_in(set_a), Some(400));
        assert_eq!(buffer_in(set_b), Some(500));

        // Writes in the same call land before its copies
        tracker.track_update_descriptor_sets([write(set_b, 600)], &[copy_b_to_a]);
        assert_eq!(buffer_in(set_a), Some(600));
    }

    #[test]
    fn test_descriptor_set_keeps_layout_copy() {
        use crate::objects::desc::DescriptorSetLayoutBindingDesc;

        let tracker = StateTracker::default();
        let layout = vk::DescriptorSetLayout::from_raw(95);
        let set = vk::DescriptorSet::from_raw(96);
        tracker.track_create_descriptor_set_layout(
            device(),
            layout,
            DescriptorSetLayoutDesc {
                bindings: vec![DescriptorSetLayoutBindingDesc {
                    binding: 3,
                    descriptor_count: 1,
                    ..DescriptorSetLayoutBindingDesc::default()
                }],
                ..DescriptorSetLayoutDesc::default()
            },
        );
        tracker.track_allocate_descriptor_sets(device(), vk::DescriptorPool::from_raw(97), &[(set, layout)]);
        tracker.track_destroy(layout.into());

        let objects = tracker.objects();
        assert!(!objects.descriptor_set_layouts.contains(layout));
        let desc = objects.descriptor_sets.get(set).unwrap().info.layout_desc.as_ref().unwrap();
        assert_eq!(desc.bindings[0].binding, 3);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        use std::sync::Arc;

        let tracker = Arc::new(StateTracker::default());
        let poisoner = Arc::clone(&tracker);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.objects();
            panic!("application thread panicked");
        })
        .join();
        assert!(result.is_err());

        tracker.track_create_semaphore(device(), vk::Semaphore::from_raw(1));
        assert_eq!(tracker.objects().semaphores.len(), 1);
    }
}
