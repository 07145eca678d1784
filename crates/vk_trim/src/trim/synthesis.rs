//! Creation call synthesis
//!
//! Walks a [`TrackerSnapshot`] in dependency order and writes the calls that
//! bring a fresh replay to the snapshot's state. Objects a dependent needs
//! but that were already destroyed (shader modules, set layouts, stale
//! render pass versions) are re-created temporarily from the copies the
//! dependent kept, then destroyed again right after.

use std::collections::HashMap;

use ash::vk;

use super::replay::{ImageBarrier, ReplayCall};
use super::writer::{TraceWriteError, TraceWriter};
use super::SyntheticHandles;
use crate::objects::desc::PipelineDesc;
use crate::objects::info::PipelineInfo;
use crate::objects::{ObjectHandle, ObjectRegistry};
use crate::tracker::{ImageCall, TrackerSnapshot};

/// Totals for one creation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisStats {
    /// Synthesized calls written
    pub calls: usize,
    /// Verbatim packets written, recorded command buffer calls included
    pub packets: usize,
    /// Temporary objects created and destroyed again
    pub temporaries: usize,
    /// Layout barriers recorded into restoration command buffers
    pub layout_barriers: usize,
}

/// Write creation calls for everything in `snapshot`
///
/// `max_batched_commands` caps the barriers recorded into one layout
/// restoration command buffer.
///
/// # Errors
/// Stops at the first call the writer rejects.
pub fn synthesize<W: TraceWriter + ?Sized>(
    snapshot: &TrackerSnapshot,
    writer: &mut W,
    handles: &mut SyntheticHandles,
    max_batched_commands: u32,
) -> Result<SynthesisStats, TraceWriteError> {
    let mut synthesizer = Synthesizer {
        snapshot,
        objects: &snapshot.objects,
        writer,
        handles,
        max_batched_commands: max_batched_commands.max(1) as usize,
        stats: SynthesisStats::default(),
    };

    synthesizer.instances_and_devices()?;
    synthesizer.swapchains()?;
    synthesizer.pools()?;
    synthesizer.memory()?;
    synthesizer.buffers()?;
    synthesizer.images()?;
    synthesizer.shaders_and_layouts()?;
    synthesizer.pipeline_layouts()?;
    synthesizer.render_passes_and_caches()?;
    synthesizer.pipelines()?;
    synthesizer.framebuffers_and_descriptor_sets()?;
    synthesizer.sync_objects()?;
    synthesizer.restore_image_layouts()?;
    synthesizer.recorded_command_buffers()?;
    synthesizer.signal_semaphores()?;

    let stats = synthesizer.stats;
    log::info!(
        "Synthesized {} calls and {} packets ({} temporaries, {} layout barriers)",
        stats.calls,
        stats.packets,
        stats.temporaries,
        stats.layout_barriers
    );
    Ok(stats)
}

type AllocationGroup = (
    vk::Device,
    vk::CommandPool,
    vk::CommandBufferLevel,
    Vec<vk::CommandBuffer>,
);

struct Synthesizer<'a, W: TraceWriter + ?Sized> {
    snapshot: &'a TrackerSnapshot,
    objects: &'a ObjectRegistry,
    writer: &'a mut W,
    handles: &'a mut SyntheticHandles,
    max_batched_commands: usize,
    stats: SynthesisStats,
}

impl<W: TraceWriter + ?Sized> Synthesizer<'_, W> {
    fn emit(&mut self, call: ReplayCall) -> Result<(), TraceWriteError> {
        if matches!(call, ReplayCall::Packet(_)) {
            self.stats.packets += 1;
        } else {
            self.stats.calls += 1;
        }
        self.writer.write_call(call)
    }

    fn destroy_temporary(
        &mut self,
        device: vk::Device,
        object: ObjectHandle,
    ) -> Result<(), TraceWriteError> {
        self.stats.temporaries += 1;
        self.emit(ReplayCall::Destroy { device, object })
    }

    /// First queue retrieved from `device`, in retrieval order
    fn queue_of(&self, device: vk::Device) -> Option<(vk::Queue, u32)> {
        self.objects
            .queues
            .in_creation_order()
            .into_iter()
            .find(|(_, entry)| entry.info.device == device)
            .map(|(queue, entry)| (queue, entry.info.queue_family_index))
    }

    fn instances_and_devices(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        for (instance, entry) in objects.instances.in_creation_order() {
            match &entry.info.create_packet {
                Some(packet) => self.emit(ReplayCall::Packet(packet.clone()))?,
                None => log::warn!("Instance {instance:?} has no creation packet"),
            }
            for packet in &entry.info.enumerate_packets {
                self.emit(ReplayCall::Packet(packet.clone()))?;
            }
        }

        for (_, entry) in objects.physical_devices.in_creation_order() {
            for packet in &entry.info.query_packets {
                self.emit(ReplayCall::Packet(packet.clone()))?;
            }
        }

        for (surface, entry) in objects.surfaces.in_creation_order() {
            match &entry.info.create_packet {
                Some(packet) => self.emit(ReplayCall::Packet(packet.clone()))?,
                None => log::warn!("Surface {surface:?} has no creation packet"),
            }
        }

        for (device, entry) in objects.devices.in_creation_order() {
            match &entry.info.create_packet {
                Some(packet) => self.emit(ReplayCall::Packet(packet.clone()))?,
                None => log::warn!("Device {device:?} has no creation packet"),
            }
        }

        for (queue, entry) in objects.queues.in_creation_order() {
            self.emit(ReplayCall::GetDeviceQueue {
                device: entry.info.device,
                queue_family_index: entry.info.queue_family_index,
                queue_index: entry.info.queue_index,
                queue,
            })?;
        }
        Ok(())
    }

    fn swapchains(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;
        for (swapchain, entry) in objects.swapchains.in_creation_order() {
            match &entry.info.create_packet {
                Some(packet) => self.emit(ReplayCall::Packet(packet.clone()))?,
                None => {
                    log::warn!("Swapchain {swapchain:?} has no creation packet");
                    continue;
                }
            }
            for packet in &entry.info.image_packets {
                self.emit(ReplayCall::Packet(packet.clone()))?;
            }
        }
        Ok(())
    }

    fn pools(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        for (pool, entry) in objects.command_pools.in_creation_order() {
            self.emit(ReplayCall::CreateCommandPool {
                device: entry.info.device,
                pool,
                flags: entry.info.flags,
                queue_family_index: entry.info.queue_family_index,
            })?;
        }

        // One allocation per (pool, level), in order of first allocation
        let mut groups: Vec<AllocationGroup> = Vec::new();
        for (command_buffer, entry) in objects.command_buffers.in_creation_order() {
            let info = &entry.info;
            match groups
                .iter_mut()
                .find(|(_, pool, level, _)| *pool == info.pool && *level == info.level)
            {
                Some((_, _, _, buffers)) => buffers.push(command_buffer),
                None => groups.push((info.device, info.pool, info.level, vec![command_buffer])),
            }
        }
        for (device, pool, level, command_buffers) in groups {
            self.emit(ReplayCall::AllocateCommandBuffers {
                device,
                pool,
                level,
                command_buffers,
            })?;
        }

        for (pool, entry) in objects.descriptor_pools.in_creation_order() {
            self.emit(ReplayCall::CreateDescriptorPool {
                device: entry.info.device,
                pool,
                desc: entry.info.desc.clone(),
            })?;
        }
        Ok(())
    }

    fn memory(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;
        for (memory, entry) in objects.device_memory.in_creation_order() {
            let info = &entry.info;
            self.emit(ReplayCall::AllocateMemory {
                device: info.device,
                memory,
                allocation_size: info.allocation_size,
                memory_type_index: info.memory_type_index,
            })?;
            if info.mapped.is_some() {
                match &info.map_packet {
                    Some(packet) => self.emit(ReplayCall::Packet(packet.clone()))?,
                    None => log::warn!("Mapped memory {memory:?} has no map packet"),
                }
            }
        }
        Ok(())
    }

    fn buffers(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        for (buffer, entry) in objects.buffers.in_creation_order() {
            let info = &entry.info;
            self.emit(ReplayCall::CreateBuffer {
                device: info.device,
                buffer,
                desc: info.desc.clone(),
            })?;
            if let Some(binding) = info.memory {
                if objects.device_memory.contains(binding.memory) {
                    self.emit(ReplayCall::BindBufferMemory {
                        device: info.device,
                        buffer,
                        memory: binding.memory,
                        offset: binding.offset,
                    })?;
                } else {
                    log::warn!("Buffer {buffer:?} is bound to freed memory; left unbound");
                }
            }
        }

        for (view, entry) in objects.buffer_views.in_creation_order() {
            self.emit(ReplayCall::CreateBufferView {
                device: entry.info.device,
                view,
                desc: entry.info.desc.clone(),
            })?;
        }
        Ok(())
    }

    fn images(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;
        let snapshot = self.snapshot;

        if let Some(calls) = &snapshot.image_calls {
            for call in calls {
                let replay = match call {
                    ImageCall::Create { device, image, desc } => ReplayCall::CreateImage {
                        device: *device,
                        image: *image,
                        desc: desc.clone(),
                    },
                    ImageCall::Destroy { device, image } => ReplayCall::DestroyImage {
                        device: *device,
                        image: *image,
                    },
                };
                self.emit(replay)?;
            }
        } else {
            for (image, entry) in objects.images.in_creation_order() {
                if entry.info.is_swapchain_image {
                    continue;
                }
                self.emit(ReplayCall::CreateImage {
                    device: entry.info.device,
                    image,
                    desc: entry.info.desc.clone(),
                })?;
            }
        }

        for (image, entry) in objects.images.in_creation_order() {
            let info = &entry.info;
            if info.is_swapchain_image {
                continue;
            }
            if let Some(binding) = info.memory {
                if objects.device_memory.contains(binding.memory) {
                    self.emit(ReplayCall::BindImageMemory {
                        device: info.device,
                        image,
                        memory: binding.memory,
                        offset: binding.offset,
                    })?;
                } else {
                    log::warn!("Image {image:?} is bound to freed memory; left unbound");
                }
            }
        }

        for (view, entry) in objects.image_views.in_creation_order() {
            self.emit(ReplayCall::CreateImageView {
                device: entry.info.device,
                view,
                desc: entry.info.desc.clone(),
            })?;
        }
        Ok(())
    }

    fn shaders_and_layouts(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        for (sampler, entry) in objects.samplers.in_creation_order() {
            self.emit(ReplayCall::CreateSampler {
                device: entry.info.device,
                sampler,
                desc: entry.info.desc.clone(),
            })?;
        }
        for (module, entry) in objects.shader_modules.in_creation_order() {
            self.emit(ReplayCall::CreateShaderModule {
                device: entry.info.device,
                module,
                desc: entry.info.desc.clone(),
            })?;
        }
        for (layout, entry) in objects.descriptor_set_layouts.in_creation_order() {
            self.emit(ReplayCall::CreateDescriptorSetLayout {
                device: entry.info.device,
                layout,
                desc: entry.info.desc.clone(),
            })?;
        }
        for (template, entry) in objects.descriptor_update_templates.in_creation_order() {
            self.emit(ReplayCall::CreateDescriptorUpdateTemplate {
                device: entry.info.device,
                template,
                desc: entry.info.desc.clone(),
            })?;
        }
        Ok(())
    }

    fn pipeline_layouts(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        for (layout, entry) in objects.pipeline_layouts.in_creation_order() {
            let info = &entry.info;
            let mut temporaries: Vec<vk::DescriptorSetLayout> = Vec::new();

            for (index, set_layout) in info.desc.set_layouts.iter().copied().enumerate() {
                if set_layout == vk::DescriptorSetLayout::null()
                    || objects.descriptor_set_layouts.contains(set_layout)
                    || temporaries.contains(&set_layout)
                {
                    continue;
                }
                match info.set_layout_descs.get(index).and_then(Option::as_ref) {
                    Some(desc) => {
                        self.emit(ReplayCall::CreateDescriptorSetLayout {
                            device: info.device,
                            layout: set_layout,
                            desc: desc.clone(),
                        })?;
                        temporaries.push(set_layout);
                    }
                    None => log::warn!(
                        "Pipeline layout {layout:?}: set layout {set_layout:?} is gone and was never copied"
                    ),
                }
            }

            self.emit(ReplayCall::CreatePipelineLayout {
                device: info.device,
                layout,
                desc: info.desc.clone(),
            })?;

            for set_layout in temporaries {
                self.destroy_temporary(info.device, set_layout.into())?;
            }
        }
        Ok(())
    }

    fn render_passes_and_caches(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        for (render_pass, entry) in objects.render_passes.in_creation_order() {
            match entry.info.latest() {
                Some(desc) => self.emit(ReplayCall::CreateRenderPass {
                    device: entry.info.device,
                    render_pass,
                    desc: desc.clone(),
                })?,
                None => log::warn!("Render pass {render_pass:?} has no creation info"),
            }
        }
        for (cache, entry) in objects.pipeline_caches.in_creation_order() {
            self.emit(ReplayCall::CreatePipelineCache {
                device: entry.info.device,
                cache,
                desc: entry.info.desc.clone(),
            })?;
        }
        Ok(())
    }

    fn pipelines(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;
        for (pipeline, entry) in objects.pipelines.in_creation_order() {
            self.pipeline(pipeline, &entry.info)?;
        }
        Ok(())
    }

    fn pipeline(&mut self, pipeline: vk::Pipeline, info: &PipelineInfo) -> Result<(), TraceWriteError> {
        let objects = self.objects;
        let device = info.device;
        let mut temporaries: Vec<ObjectHandle> = Vec::new();

        for stage in info.desc.stages() {
            let module = stage.module;
            if objects.shader_modules.contains(module)
                || temporaries.contains(&ObjectHandle::ShaderModule(module))
            {
                continue;
            }
            match info.shader_module(module) {
                Some(desc) => {
                    self.emit(ReplayCall::CreateShaderModule {
                        device,
                        module,
                        desc: desc.clone(),
                    })?;
                    temporaries.push(module.into());
                }
                None => log::warn!("Pipeline {pipeline:?}: shader module {module:?} was never copied"),
            }
        }

        let call = match &info.desc {
            PipelineDesc::Graphics(desc) => {
                let mut desc = desc.clone();
                let current = objects.render_pass_version(desc.render_pass);
                if current != Some(info.render_pass_version) {
                    if let Some(render_pass_desc) = &info.render_pass_desc {
                        let stand_in = self.handles.render_pass();
                        log::debug!(
                            "Pipeline {pipeline:?}: render pass {:?} version {} replaced by {stand_in:?}",
                            desc.render_pass,
                            info.render_pass_version
                        );
                        self.emit(ReplayCall::CreateRenderPass {
                            device,
                            render_pass: stand_in,
                            desc: render_pass_desc.clone(),
                        })?;
                        temporaries.push(stand_in.into());
                        desc.render_pass = stand_in;
                    } else {
                        log::warn!(
                            "Pipeline {pipeline:?}: render pass {:?} changed and no copy was kept",
                            desc.render_pass
                        );
                    }
                }
                ReplayCall::CreateGraphicsPipeline {
                    device,
                    cache: info.cache,
                    pipeline,
                    desc,
                }
            }
            PipelineDesc::Compute(desc) => ReplayCall::CreateComputePipeline {
                device,
                cache: info.cache,
                pipeline,
                desc: desc.clone(),
            },
        };
        self.emit(call)?;

        for object in temporaries {
            self.destroy_temporary(device, object)?;
        }
        Ok(())
    }

    fn framebuffers_and_descriptor_sets(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        for (framebuffer, entry) in objects.framebuffers.in_creation_order() {
            self.emit(ReplayCall::CreateFramebuffer {
                device: entry.info.device,
                framebuffer,
                desc: entry.info.desc.clone(),
            })?;
        }

        // Sets whose layout is gone get a temporary one from their copy. It
        // stays alive until the updates are written.
        let mut temporaries: Vec<(vk::Device, vk::DescriptorSetLayout)> = Vec::new();
        let sets = objects.descriptor_sets.in_creation_order();
        for (set, entry) in &sets {
            let info = &entry.info;
            let layout_missing = info.layout != vk::DescriptorSetLayout::null()
                && !objects.descriptor_set_layouts.contains(info.layout)
                && !temporaries.iter().any(|(_, layout)| *layout == info.layout);
            if layout_missing {
                match &info.layout_desc {
                    Some(desc) => {
                        self.emit(ReplayCall::CreateDescriptorSetLayout {
                            device: info.device,
                            layout: info.layout,
                            desc: desc.clone(),
                        })?;
                        temporaries.push((info.device, info.layout));
                    }
                    None => log::warn!(
                        "Descriptor set {set:?}: layout {:?} is gone and was never copied",
                        info.layout
                    ),
                }
            }
            self.emit(ReplayCall::AllocateDescriptorSet {
                device: info.device,
                pool: info.pool,
                layout: info.layout,
                set: *set,
            })?;
        }
        for (set, entry) in &sets {
            let writes = entry.info.writes(*set);
            if writes.is_empty() {
                continue;
            }
            self.emit(ReplayCall::UpdateDescriptorSets {
                device: entry.info.device,
                writes,
            })?;
        }
        for (device, layout) in temporaries {
            self.destroy_temporary(device, layout.into())?;
        }
        Ok(())
    }

    fn sync_objects(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        for (semaphore, entry) in objects.semaphores.in_creation_order() {
            self.emit(ReplayCall::CreateSemaphore {
                device: entry.info.device,
                semaphore,
            })?;
        }
        for (fence, entry) in objects.fences.in_creation_order() {
            self.emit(ReplayCall::CreateFence {
                device: entry.info.device,
                fence,
                signaled: entry.info.signaled,
            })?;
        }
        for (event, entry) in objects.events.in_creation_order() {
            self.emit(ReplayCall::CreateEvent {
                device: entry.info.device,
                event,
            })?;
            if entry.info.signaled {
                self.emit(ReplayCall::SetEvent {
                    device: entry.info.device,
                    event,
                })?;
            }
        }
        for (pool, entry) in objects.query_pools.in_creation_order() {
            self.emit(ReplayCall::CreateQueryPool {
                device: entry.info.device,
                pool,
                desc: entry.info.desc,
            })?;
        }
        Ok(())
    }

    /// Move every bound image from its creation layout to its tracked layout
    fn restore_image_layouts(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        let mut per_device: HashMap<vk::Device, Vec<ImageBarrier>> = HashMap::new();
        for (image, entry) in objects.images.in_creation_order() {
            let info = &entry.info;
            let bound = info
                .memory
                .is_some_and(|binding| objects.device_memory.contains(binding.memory));
            if info.is_swapchain_image
                || !bound
                || info.current_layout == vk::ImageLayout::UNDEFINED
                || info.current_layout == info.desc.initial_layout
            {
                continue;
            }
            per_device.entry(info.device).or_default().push(ImageBarrier {
                image,
                old_layout: info.desc.initial_layout,
                new_layout: info.current_layout,
                dst_access_mask: info.access_mask,
                subresource_range: info.desc.full_range(),
            });
        }

        for (device, _) in objects.devices.in_creation_order() {
            let Some(barriers) = per_device.remove(&device) else {
                continue;
            };
            let Some((queue, queue_family_index)) = self.queue_of(device) else {
                log::warn!(
                    "Device {device:?} has no queue; {} image layouts not restored",
                    barriers.len()
                );
                continue;
            };

            let pool = self.handles.command_pool();
            let command_buffer = self.handles.command_buffer();
            self.emit(ReplayCall::CreateCommandPool {
                device,
                pool,
                flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                queue_family_index,
            })?;
            self.emit(ReplayCall::AllocateCommandBuffers {
                device,
                pool,
                level: vk::CommandBufferLevel::PRIMARY,
                command_buffers: vec![command_buffer],
            })?;

            for batch in barriers.chunks(self.max_batched_commands) {
                self.emit(ReplayCall::BeginCommandBuffer {
                    command_buffer,
                    flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
                })?;
                self.emit(ReplayCall::CmdPipelineBarrier {
                    command_buffer,
                    image_barriers: batch.to_vec(),
                })?;
                self.emit(ReplayCall::EndCommandBuffer { command_buffer })?;
                self.emit(ReplayCall::QueueSubmit {
                    queue,
                    command_buffers: vec![command_buffer],
                    signal_semaphores: Vec::new(),
                })?;
                self.emit(ReplayCall::QueueWaitIdle { queue })?;
                self.stats.layout_barriers += batch.len();
            }

            self.emit(ReplayCall::FreeCommandBuffers {
                device,
                pool,
                command_buffers: vec![command_buffer],
            })?;
            self.destroy_temporary(device, pool.into())?;
        }
        Ok(())
    }

    fn recorded_command_buffers(&mut self) -> Result<(), TraceWriteError> {
        let snapshot = self.snapshot;
        for (command_buffer, _) in snapshot.objects.command_buffers.in_creation_order() {
            for packet in snapshot.command_buffer_calls(command_buffer) {
                self.emit(ReplayCall::Packet(packet.clone()))?;
            }
        }
        Ok(())
    }

    /// Signaled semaphores come back unsignaled; an empty submit signals them
    fn signal_semaphores(&mut self) -> Result<(), TraceWriteError> {
        let objects = self.objects;

        let mut per_device: HashMap<vk::Device, Vec<vk::Semaphore>> = HashMap::new();
        for (semaphore, entry) in objects.semaphores.in_creation_order() {
            if entry.info.signaled {
                per_device.entry(entry.info.device).or_default().push(semaphore);
            }
        }

        for (device, _) in objects.devices.in_creation_order() {
            let Some(signal_semaphores) = per_device.remove(&device) else {
                continue;
            };
            let Some((queue, _)) = self.queue_of(device) else {
                log::warn!(
                    "Device {device:?} has no queue; {} semaphores left unsignaled",
                    signal_semaphores.len()
                );
                continue;
            };
            self.emit(ReplayCall::QueueSubmit {
                queue,
                command_buffers: Vec::new(),
                signal_semaphores,
            })?;
        }
        Ok(())
    }
}
