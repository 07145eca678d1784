//! Calls emitted into the trimmed trace
//!
//! Synthesis produces typed [`ReplayCall`]s carrying owned creation infos.
//! Calls the tracker kept verbatim (instance and device creation, memory
//! maps, recorded commands) pass through as [`ReplayCall::Packet`]. The
//! serializer behind a [`TraceWriter`](super::TraceWriter) turns both into
//! trace packets.

use ash::vk;

use crate::objects::desc::{
    BufferDesc, BufferViewDesc, ComputePipelineDesc, DescriptorPoolDesc,
    DescriptorSetLayoutDesc, DescriptorUpdateTemplateDesc, DescriptorWrite, FramebufferDesc,
    GraphicsPipelineDesc, ImageDesc, ImageViewDesc, PipelineCacheDesc, PipelineLayoutDesc,
    QueryPoolDesc, RenderPassDesc, SamplerDesc, ShaderModuleDesc,
};
use crate::objects::ObjectHandle;
use crate::packet::TracePacket;

/// Layout transition recorded by synthesized layout-restoration buffers
#[derive(Debug, Clone, Copy)]
pub struct ImageBarrier {
    /// Transitioned image
    pub image: vk::Image,
    /// Layout before the barrier
    pub old_layout: vk::ImageLayout,
    /// Layout after the barrier
    pub new_layout: vk::ImageLayout,
    /// Access after the barrier
    pub dst_access_mask: vk::AccessFlags,
    /// Covered subresources
    pub subresource_range: vk::ImageSubresourceRange,
}

/// One call of the trimmed trace
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum ReplayCall {
    /// A call kept verbatim
    Packet(TracePacket),

    GetDeviceQueue {
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
        queue: vk::Queue,
    },
    CreateCommandPool {
        device: vk::Device,
        pool: vk::CommandPool,
        flags: vk::CommandPoolCreateFlags,
        queue_family_index: u32,
    },
    AllocateCommandBuffers {
        device: vk::Device,
        pool: vk::CommandPool,
        level: vk::CommandBufferLevel,
        command_buffers: Vec<vk::CommandBuffer>,
    },
    CreateDescriptorPool {
        device: vk::Device,
        pool: vk::DescriptorPool,
        desc: DescriptorPoolDesc,
    },
    AllocateMemory {
        device: vk::Device,
        memory: vk::DeviceMemory,
        allocation_size: vk::DeviceSize,
        memory_type_index: u32,
    },
    CreateBuffer {
        device: vk::Device,
        buffer: vk::Buffer,
        desc: BufferDesc,
    },
    BindBufferMemory {
        device: vk::Device,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    },
    CreateBufferView {
        device: vk::Device,
        view: vk::BufferView,
        desc: BufferViewDesc,
    },
    CreateImage {
        device: vk::Device,
        image: vk::Image,
        desc: ImageDesc,
    },
    BindImageMemory {
        device: vk::Device,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    },
    CreateImageView {
        device: vk::Device,
        view: vk::ImageView,
        desc: ImageViewDesc,
    },
    /// Image destruction replayed from the ordered image list
    DestroyImage {
        device: vk::Device,
        image: vk::Image,
    },
    CreateSampler {
        device: vk::Device,
        sampler: vk::Sampler,
        desc: SamplerDesc,
    },
    CreateShaderModule {
        device: vk::Device,
        module: vk::ShaderModule,
        desc: ShaderModuleDesc,
    },
    CreateDescriptorSetLayout {
        device: vk::Device,
        layout: vk::DescriptorSetLayout,
        desc: DescriptorSetLayoutDesc,
    },
    CreateDescriptorUpdateTemplate {
        device: vk::Device,
        template: vk::DescriptorUpdateTemplate,
        desc: DescriptorUpdateTemplateDesc,
    },
    CreatePipelineLayout {
        device: vk::Device,
        layout: vk::PipelineLayout,
        desc: PipelineLayoutDesc,
    },
    CreateRenderPass {
        device: vk::Device,
        render_pass: vk::RenderPass,
        desc: RenderPassDesc,
    },
    CreatePipelineCache {
        device: vk::Device,
        cache: vk::PipelineCache,
        desc: PipelineCacheDesc,
    },
    CreateGraphicsPipeline {
        device: vk::Device,
        cache: vk::PipelineCache,
        pipeline: vk::Pipeline,
        desc: Box<GraphicsPipelineDesc>,
    },
    CreateComputePipeline {
        device: vk::Device,
        cache: vk::PipelineCache,
        pipeline: vk::Pipeline,
        desc: ComputePipelineDesc,
    },
    CreateFramebuffer {
        device: vk::Device,
        framebuffer: vk::Framebuffer,
        desc: FramebufferDesc,
    },
    AllocateDescriptorSet {
        device: vk::Device,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        set: vk::DescriptorSet,
    },
    UpdateDescriptorSets {
        device: vk::Device,
        writes: Vec<DescriptorWrite>,
    },
    CreateSemaphore {
        device: vk::Device,
        semaphore: vk::Semaphore,
    },
    CreateFence {
        device: vk::Device,
        fence: vk::Fence,
        signaled: bool,
    },
    CreateEvent {
        device: vk::Device,
        event: vk::Event,
    },
    SetEvent {
        device: vk::Device,
        event: vk::Event,
    },
    CreateQueryPool {
        device: vk::Device,
        pool: vk::QueryPool,
        desc: QueryPoolDesc,
    },

    BeginCommandBuffer {
        command_buffer: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    },
    EndCommandBuffer {
        command_buffer: vk::CommandBuffer,
    },
    CmdPipelineBarrier {
        command_buffer: vk::CommandBuffer,
        image_barriers: Vec<ImageBarrier>,
    },
    QueueSubmit {
        queue: vk::Queue,
        command_buffers: Vec<vk::CommandBuffer>,
        signal_semaphores: Vec<vk::Semaphore>,
    },
    QueueWaitIdle {
        queue: vk::Queue,
    },
    DeviceWaitIdle {
        device: vk::Device,
    },

    /// Destroy or free a device-level object
    Destroy {
        device: vk::Device,
        object: ObjectHandle,
    },
    FreeCommandBuffers {
        device: vk::Device,
        pool: vk::CommandPool,
        command_buffers: Vec<vk::CommandBuffer>,
    },
    FreeDescriptorSets {
        device: vk::Device,
        pool: vk::DescriptorPool,
        sets: Vec<vk::DescriptorSet>,
    },
    UnmapMemory {
        device: vk::Device,
        memory: vk::DeviceMemory,
    },
    DestroyDevice {
        device: vk::Device,
    },
    DestroySurface {
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
    },
    DestroyInstance {
        instance: vk::Instance,
    },
}

impl ReplayCall {
    /// Vulkan entry point the call replays
    pub fn name(&self) -> &'static str {
        match self {
            Self::Packet(_) => "<packet>",
            Self::GetDeviceQueue { .. } => "vkGetDeviceQueue",
            Self::CreateCommandPool { .. } => "vkCreateCommandPool",
            Self::AllocateCommandBuffers { .. } => "vkAllocateCommandBuffers",
            Self::CreateDescriptorPool { .. } => "vkCreateDescriptorPool",
            Self::AllocateMemory { .. } => "vkAllocateMemory",
            Self::CreateBuffer { .. } => "vkCreateBuffer",
            Self::BindBufferMemory { .. } => "vkBindBufferMemory",
            Self::CreateBufferView { .. } => "vkCreateBufferView",
            Self::CreateImage { .. } => "vkCreateImage",
            Self::BindImageMemory { .. } => "vkBindImageMemory",
            Self::CreateImageView { .. } => "vkCreateImageView",
            Self::DestroyImage { .. } => "vkDestroyImage",
            Self::CreateSampler { .. } => "vkCreateSampler",
            Self::CreateShaderModule { .. } => "vkCreateShaderModule",
            Self::CreateDescriptorSetLayout { .. } => "vkCreateDescriptorSetLayout",
            Self::CreateDescriptorUpdateTemplate { .. } => "vkCreateDescriptorUpdateTemplate",
            Self::CreatePipelineLayout { .. } => "vkCreatePipelineLayout",
            Self::CreateRenderPass { .. } => "vkCreateRenderPass",
            Self::CreatePipelineCache { .. } => "vkCreatePipelineCache",
            Self::CreateGraphicsPipeline { .. } => "vkCreateGraphicsPipelines",
            Self::CreateComputePipeline { .. } => "vkCreateComputePipelines",
            Self::CreateFramebuffer { .. } => "vkCreateFramebuffer",
            Self::AllocateDescriptorSet { .. } => "vkAllocateDescriptorSets",
            Self::UpdateDescriptorSets { .. } => "vkUpdateDescriptorSets",
            Self::CreateSemaphore { .. } => "vkCreateSemaphore",
            Self::CreateFence { .. } => "vkCreateFence",
            Self::CreateEvent { .. } => "vkCreateEvent",
            Self::SetEvent { .. } => "vkSetEvent",
            Self::CreateQueryPool { .. } => "vkCreateQueryPool",
            Self::BeginCommandBuffer { .. } => "vkBeginCommandBuffer",
            Self::EndCommandBuffer { .. } => "vkEndCommandBuffer",
            Self::CmdPipelineBarrier { .. } => "vkCmdPipelineBarrier",
            Self::QueueSubmit { .. } => "vkQueueSubmit",
            Self::QueueWaitIdle { .. } => "vkQueueWaitIdle",
            Self::DeviceWaitIdle { .. } => "vkDeviceWaitIdle",
            Self::Destroy { object, .. } => destroy_entry_point(*object),
            Self::FreeCommandBuffers { .. } => "vkFreeCommandBuffers",
            Self::FreeDescriptorSets { .. } => "vkFreeDescriptorSets",
            Self::UnmapMemory { .. } => "vkUnmapMemory",
            Self::DestroyDevice { .. } => "vkDestroyDevice",
            Self::DestroySurface { .. } => "vkDestroySurfaceKHR",
            Self::DestroyInstance { .. } => "vkDestroyInstance",
        }
    }

    /// Object the call creates, if it creates exactly one
    pub fn created_object(&self) -> Option<ObjectHandle> {
        let handle = match self {
            Self::GetDeviceQueue { queue, .. } => (*queue).into(),
            Self::CreateCommandPool { pool, .. } => (*pool).into(),
            Self::CreateDescriptorPool { pool, .. } => (*pool).into(),
            Self::AllocateMemory { memory, .. } => (*memory).into(),
            Self::CreateBuffer { buffer, .. } => (*buffer).into(),
            Self::CreateBufferView { view, .. } => (*view).into(),
            Self::CreateImage { image, .. } => (*image).into(),
            Self::CreateImageView { view, .. } => (*view).into(),
            Self::CreateSampler { sampler, .. } => (*sampler).into(),
            Self::CreateShaderModule { module, .. } => (*module).into(),
            Self::CreateDescriptorSetLayout { layout, .. } => (*layout).into(),
            Self::CreateDescriptorUpdateTemplate { template, .. } => (*template).into(),
            Self::CreatePipelineLayout { layout, .. } => (*layout).into(),
            Self::CreateRenderPass { render_pass, .. } => (*render_pass).into(),
            Self::CreatePipelineCache { cache, .. } => (*cache).into(),
            Self::CreateGraphicsPipeline { pipeline, .. }
            | Self::CreateComputePipeline { pipeline, .. } => (*pipeline).into(),
            Self::CreateFramebuffer { framebuffer, .. } => (*framebuffer).into(),
            Self::AllocateDescriptorSet { set, .. } => (*set).into(),
            Self::CreateSemaphore { semaphore, .. } => (*semaphore).into(),
            Self::CreateFence { fence, .. } => (*fence).into(),
            Self::CreateEvent { event, .. } => (*event).into(),
            Self::CreateQueryPool { pool, .. } => (*pool).into(),
            _ => return None,
        };
        Some(handle)
    }
}

fn destroy_entry_point(object: ObjectHandle) -> &'static str {
    match object {
        ObjectHandle::DeviceMemory(_) => "vkFreeMemory",
        ObjectHandle::CommandPool(_) => "vkDestroyCommandPool",
        ObjectHandle::DescriptorPool(_) => "vkDestroyDescriptorPool",
        ObjectHandle::Buffer(_) => "vkDestroyBuffer",
        ObjectHandle::BufferView(_) => "vkDestroyBufferView",
        ObjectHandle::Image(_) => "vkDestroyImage",
        ObjectHandle::ImageView(_) => "vkDestroyImageView",
        ObjectHandle::Sampler(_) => "vkDestroySampler",
        ObjectHandle::ShaderModule(_) => "vkDestroyShaderModule",
        ObjectHandle::DescriptorSetLayout(_) => "vkDestroyDescriptorSetLayout",
        ObjectHandle::DescriptorUpdateTemplate(_) => "vkDestroyDescriptorUpdateTemplate",
        ObjectHandle::PipelineLayout(_) => "vkDestroyPipelineLayout",
        ObjectHandle::RenderPass(_) => "vkDestroyRenderPass",
        ObjectHandle::PipelineCache(_) => "vkDestroyPipelineCache",
        ObjectHandle::Pipeline(_) => "vkDestroyPipeline",
        ObjectHandle::Framebuffer(_) => "vkDestroyFramebuffer",
        ObjectHandle::Semaphore(_) => "vkDestroySemaphore",
        ObjectHandle::Fence(_) => "vkDestroyFence",
        ObjectHandle::Event(_) => "vkDestroyEvent",
        ObjectHandle::QueryPool(_) => "vkDestroyQueryPool",
        ObjectHandle::Swapchain(_) => "vkDestroySwapchainKHR",
        ObjectHandle::Surface(_) => "vkDestroySurfaceKHR",
        ObjectHandle::Device(_) => "vkDestroyDevice",
        ObjectHandle::Instance(_) => "vkDestroyInstance",
        ObjectHandle::CommandBuffer(_) => "vkFreeCommandBuffers",
        ObjectHandle::DescriptorSet(_) => "vkFreeDescriptorSets",
        ObjectHandle::Queue(_) | ObjectHandle::PhysicalDevice(_) => "<not destroyable>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_names() {
        let destroy = ReplayCall::Destroy {
            device: vk::Device::from_raw(1),
            object: vk::DeviceMemory::from_raw(2).into(),
        };
        assert_eq!(destroy.name(), "vkFreeMemory");

        let create = ReplayCall::CreateFence {
            device: vk::Device::from_raw(1),
            fence: vk::Fence::from_raw(3),
            signaled: true,
        };
        assert_eq!(create.name(), "vkCreateFence");
        assert_eq!(create.created_object(), Some(ObjectHandle::Fence(vk::Fence::from_raw(3))));
        assert_eq!(destroy.created_object(), None);
    }

    #[test]
    fn test_barrier_call_clones_with_its_ranges() {
        let barrier = ImageBarrier {
            image: vk::Image::from_raw(4),
            old_layout: vk::ImageLayout::UNDEFINED,
            new_layout: vk::ImageLayout::GENERAL,
            dst_access_mask: vk::AccessFlags::SHADER_WRITE,
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 2,
                base_array_layer: 0,
                layer_count: 1,
            },
        };
        let call = ReplayCall::CmdPipelineBarrier {
            command_buffer: vk::CommandBuffer::from_raw(5),
            image_barriers: vec![barrier],
        };
        let cloned = call.clone();

        assert_eq!(cloned.name(), "vkCmdPipelineBarrier");
        assert_eq!(cloned.created_object(), None);
        match cloned {
            ReplayCall::CmdPipelineBarrier { image_barriers, .. } => {
                assert_eq!(image_barriers[0].subresource_range.level_count, 2);
                assert_eq!(image_barriers[0].new_layout, vk::ImageLayout::GENERAL);
            }
            other => panic!("unexpected call {other:?}"),
        }
        assert!(format!("{call:?}").contains("level_count: 2"));
    }
}
