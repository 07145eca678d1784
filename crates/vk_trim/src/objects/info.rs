//! Per-category payloads
//!
//! Each payload holds what is needed to reissue the creation call of its
//! object plus the mutable state later calls change (bound memory, layouts,
//! signal state, descriptor contents). Owner back-references are plain
//! handle values.

use std::collections::BTreeMap;

use ash::vk;

use super::desc::{
    BufferDesc, BufferViewDesc, DescriptorPayload, DescriptorPoolDesc, DescriptorSetLayoutDesc,
    DescriptorUpdateTemplateDesc, DescriptorValue, DescriptorWrite, FramebufferDesc, ImageDesc,
    ImageViewDesc, PipelineCacheDesc, PipelineDesc, PipelineLayoutDesc, QueryPoolDesc,
    RenderPassDesc, SamplerDesc, ShaderModuleDesc, SwapchainDesc,
};
use crate::packet::TracePacket;

/// Payloads owned by a device, so destroying the device removes them
pub trait DeviceChild {
    /// Owning device
    fn device(&self) -> vk::Device;
}

macro_rules! impl_device_child {
    ($($info:ty),* $(,)?) => {
        $(
            impl DeviceChild for $info {
                fn device(&self) -> vk::Device {
                    self.device
                }
            }
        )*
    };
}

/// `VkInstance`
#[derive(Debug, Clone, Default)]
pub struct InstanceInfo {
    /// Verbatim `vkCreateInstance` packet
    pub create_packet: Option<TracePacket>,
    /// Verbatim `vkEnumeratePhysicalDevices` packets, count query included
    pub enumerate_packets: Vec<TracePacket>,
}

/// `VkPhysicalDevice`
#[derive(Debug, Clone, Default)]
pub struct PhysicalDeviceInfo {
    /// Instance the device was enumerated from
    pub instance: vk::Instance,
    /// Property and feature queries the application issued, replayed so the
    /// replayer sees the same answers before device creation
    pub query_packets: Vec<TracePacket>,
}

/// `VkDevice`
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Physical device the device was created on
    pub physical_device: vk::PhysicalDevice,
    /// Verbatim `vkCreateDevice` packet
    pub create_packet: Option<TracePacket>,
}

/// `VkQueue`
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueInfo {
    pub device: vk::Device,
    pub queue_family_index: u32,
    pub queue_index: u32,
}

/// `VkCommandPool`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandPoolInfo {
    pub device: vk::Device,
    pub flags: vk::CommandPoolCreateFlags,
    pub queue_family_index: u32,
}

/// `VkCommandBuffer`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandBufferInfo {
    pub device: vk::Device,
    pub pool: vk::CommandPool,
    pub level: vk::CommandBufferLevel,
    /// Render pass between begin and end, if any
    pub active_render_pass: Option<vk::RenderPass>,
    /// Queue of the most recent submission
    pub submit_queue: Option<vk::Queue>,
}

/// `VkDescriptorPool`
#[derive(Debug, Clone, Default)]
pub struct DescriptorPoolInfo {
    pub device: vk::Device,
    pub desc: DescriptorPoolDesc,
}

/// One descriptor currently bound in a set
#[derive(Debug, Clone, Copy)]
pub struct BoundDescriptor {
    pub descriptor_type: vk::DescriptorType,
    pub value: DescriptorValue,
}

/// `VkDescriptorSet`
///
/// Contents are kept per descriptor, keyed by `(binding, array element)`.
/// Writes overwrite exactly the descriptors they cover and copies are
/// resolved against their source when recorded, so [`writes`](Self::writes)
/// reproduces the current contents without replaying history.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetInfo {
    pub device: vk::Device,
    pub pool: vk::DescriptorPool,
    pub layout: vk::DescriptorSetLayout,
    /// Copy of the set layout taken at allocation; `None` if it was unknown
    pub layout_desc: Option<DescriptorSetLayoutDesc>,
    pub descriptors: BTreeMap<(u32, u32), BoundDescriptor>,
}

impl DescriptorSetInfo {
    /// Slot `offset` descriptors past `(binding, element)`
    ///
    /// Follows the rollover into the next binding when the layout is known.
    pub fn slot(&self, binding: u32, element: u32, offset: u32) -> (u32, u32) {
        let mut binding = binding;
        let mut element = element.saturating_add(offset);
        let Some(layout) = &self.layout_desc else {
            return (binding, element);
        };
        while let Some(count) = layout.descriptor_count(binding) {
            if element < count {
                break;
            }
            let Some(next) = layout.next_binding(binding) else {
                break;
            };
            element -= count;
            binding = next;
        }
        (binding, element)
    }

    /// Current contents of `count` descriptors starting at `(binding, element)`
    pub fn read(&self, binding: u32, element: u32, count: u32) -> Vec<Option<BoundDescriptor>> {
        (0..count)
            .map(|offset| {
                let slot = self.slot(binding, element, offset);
                self.descriptors.get(&slot).copied()
            })
            .collect()
    }

    /// Overwrite descriptors starting at `(binding, element)`
    ///
    /// A `None` marks a descriptor whose contents are no longer known.
    pub fn assign(&mut self, binding: u32, element: u32, values: &[Option<BoundDescriptor>]) {
        for (offset, value) in (0u32..).zip(values) {
            let slot = self.slot(binding, element, offset);
            match value {
                Some(bound) => {
                    self.descriptors.insert(slot, *bound);
                }
                None => {
                    self.descriptors.remove(&slot);
                }
            }
        }
    }

    /// Apply a `VkWriteDescriptorSet`
    pub fn record_write(&mut self, write: &DescriptorWrite) {
        let values: Vec<Option<BoundDescriptor>> = (0..write.descriptor_count as usize)
            .map(|index| {
                write.payload.value(index).map(|value| BoundDescriptor {
                    descriptor_type: write.descriptor_type,
                    value,
                })
            })
            .collect();
        self.assign(write.dst_binding, write.dst_array_element, &values);
    }

    /// Writes that rebuild the current contents of `set`
    ///
    /// Consecutive descriptors of one binding and type are merged into a
    /// single write.
    pub fn writes(&self, set: vk::DescriptorSet) -> Vec<DescriptorWrite> {
        let mut writes: Vec<DescriptorWrite> = Vec::new();
        for (&(binding, element), bound) in &self.descriptors {
            if let Some(last) = writes.last_mut() {
                let follows = last.dst_binding == binding
                    && last.dst_array_element.checked_add(last.descriptor_count) == Some(element)
                    && last.descriptor_type == bound.descriptor_type;
                if follows && last.payload.push(bound.value) {
                    last.descriptor_count += 1;
                    continue;
                }
            }
            writes.push(DescriptorWrite {
                dst_set: set,
                dst_binding: binding,
                dst_array_element: element,
                descriptor_count: 1,
                descriptor_type: bound.descriptor_type,
                payload: DescriptorPayload::from_value(bound.value),
            });
        }
        writes
    }
}

/// `VkDescriptorSetLayout`
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutInfo {
    pub device: vk::Device,
    pub desc: DescriptorSetLayoutDesc,
}

/// `VkDescriptorUpdateTemplate`
#[derive(Debug, Clone, Default)]
pub struct DescriptorUpdateTemplateInfo {
    pub device: vk::Device,
    pub desc: DescriptorUpdateTemplateDesc,
}

/// `VkRenderPass`
///
/// Every creation info ever recorded for the handle, oldest first. The list
/// only grows; a pipeline refers to the version current when it was built.
#[derive(Debug, Clone, Default)]
pub struct RenderPassInfo {
    pub device: vk::Device,
    pub versions: Vec<RenderPassDesc>,
}

impl RenderPassInfo {
    /// Most recent creation info
    pub fn latest(&self) -> Option<&RenderPassDesc> {
        self.versions.last()
    }

    /// Index of the most recent creation info
    pub fn current_version(&self) -> Option<u32> {
        self.versions
            .len()
            .checked_sub(1)
            .and_then(|v| u32::try_from(v).ok())
    }
}

/// `VkPipelineCache`
#[derive(Debug, Clone, Default)]
pub struct PipelineCacheInfo {
    pub device: vk::Device,
    pub desc: PipelineCacheDesc,
}

/// `VkPipeline`
#[derive(Debug, Clone, Default)]
pub struct PipelineInfo {
    pub device: vk::Device,
    pub cache: vk::PipelineCache,
    pub desc: PipelineDesc,
    /// Copies of the shader modules the stages referenced at creation
    pub shader_modules: Vec<(vk::ShaderModule, ShaderModuleDesc)>,
    /// Render pass version the pipeline was built against
    pub render_pass_version: u32,
    /// Copy of that render pass version
    pub render_pass_desc: Option<RenderPassDesc>,
}

impl PipelineInfo {
    /// Retained copy of `module`, if the pipeline used it
    pub fn shader_module(&self, module: vk::ShaderModule) -> Option<&ShaderModuleDesc> {
        self.shader_modules
            .iter()
            .find(|(handle, _)| *handle == module)
            .map(|(_, desc)| desc)
    }
}

/// `VkShaderModule`
#[derive(Debug, Clone, Default)]
pub struct ShaderModuleInfo {
    pub device: vk::Device,
    pub desc: ShaderModuleDesc,
}

/// `VkPipelineLayout`
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutInfo {
    pub device: vk::Device,
    pub desc: PipelineLayoutDesc,
    /// Copies of the set layouts, parallel to `desc.set_layouts`; `None`
    /// where the layout was not live at creation
    pub set_layout_descs: Vec<Option<DescriptorSetLayoutDesc>>,
}

/// `VkSampler`
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerInfo {
    pub device: vk::Device,
    pub desc: SamplerDesc,
}

/// Memory an image or buffer is bound to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryBinding {
    pub memory: vk::DeviceMemory,
    pub offset: vk::DeviceSize,
}

/// `VkImage`
#[derive(Debug, Clone, Default)]
pub struct ImageInfo {
    pub device: vk::Device,
    pub desc: ImageDesc,
    pub memory: Option<MemoryBinding>,
    pub memory_requirements: Option<vk::MemoryRequirements>,
    /// Layout after the last submitted transition
    pub current_layout: vk::ImageLayout,
    pub access_mask: vk::AccessFlags,
    /// Owned by a swapchain; never created or destroyed directly
    pub is_swapchain_image: bool,
}

/// `VkImageView`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageViewInfo {
    pub device: vk::Device,
    pub desc: ImageViewDesc,
}

/// `VkBuffer`
#[derive(Debug, Clone, Default)]
pub struct BufferInfo {
    pub device: vk::Device,
    pub desc: BufferDesc,
    pub memory: Option<MemoryBinding>,
    pub memory_requirements: Option<vk::MemoryRequirements>,
    pub access_mask: vk::AccessFlags,
}

/// `VkBufferView`
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferViewInfo {
    pub device: vk::Device,
    pub desc: BufferViewDesc,
}

/// `VkFramebuffer`
#[derive(Debug, Clone, Default)]
pub struct FramebufferInfo {
    pub device: vk::Device,
    pub desc: FramebufferDesc,
}

/// `VkSemaphore`
#[derive(Debug, Clone, Copy, Default)]
pub struct SemaphoreInfo {
    pub device: vk::Device,
    pub signaled: bool,
}

/// `VkFence`
#[derive(Debug, Clone, Copy, Default)]
pub struct FenceInfo {
    pub device: vk::Device,
    pub signaled: bool,
}

/// Host-mapped range of a memory object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappedRange {
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

/// `VkDeviceMemory`
#[derive(Debug, Clone, Default)]
pub struct DeviceMemoryInfo {
    pub device: vk::Device,
    pub allocation_size: vk::DeviceSize,
    pub memory_type_index: u32,
    pub mapped: Option<MappedRange>,
    /// Verbatim `vkMapMemory` packet while mapped
    pub map_packet: Option<TracePacket>,
}

/// `VkEvent`
#[derive(Debug, Clone, Copy, Default)]
pub struct EventInfo {
    pub device: vk::Device,
    pub signaled: bool,
}

/// `VkQueryPool`
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPoolInfo {
    pub device: vk::Device,
    pub desc: QueryPoolDesc,
}

/// `VkSwapchainKHR`
#[derive(Debug, Clone, Default)]
pub struct SwapchainInfo {
    pub device: vk::Device,
    pub desc: SwapchainDesc,
    /// Verbatim `vkCreateSwapchainKHR` packet
    pub create_packet: Option<TracePacket>,
    /// Verbatim `vkGetSwapchainImagesKHR` packets, count query included
    pub image_packets: Vec<TracePacket>,
    /// Presentable images in swapchain order
    pub images: Vec<vk::Image>,
}

/// Window-system connection the application created its first surface on
///
/// Raw pointers are kept as addresses; they are only ever written to the
/// trace, never dereferenced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowConnection {
    /// `Display*`
    Xlib {
        /// Display address
        display: usize,
    },
    /// `xcb_connection_t*`
    Xcb {
        /// Connection address
        connection: usize,
    },
    /// `wl_display*`
    Wayland {
        /// Display address
        display: usize,
    },
    /// `HINSTANCE`
    Win32 {
        /// Module instance
        hinstance: usize,
    },
    /// Headless or unknown platform
    #[default]
    Headless,
}

/// `VkSurfaceKHR`
#[derive(Debug, Clone, Default)]
pub struct SurfaceInfo {
    pub instance: vk::Instance,
    /// Connection the surface was created on
    pub connection: WindowConnection,
    /// Verbatim platform surface creation packet
    pub create_packet: Option<TracePacket>,
}

impl_device_child!(
    QueueInfo,
    CommandPoolInfo,
    CommandBufferInfo,
    DescriptorPoolInfo,
    DescriptorSetInfo,
    DescriptorSetLayoutInfo,
    DescriptorUpdateTemplateInfo,
    RenderPassInfo,
    PipelineCacheInfo,
    PipelineInfo,
    ShaderModuleInfo,
    PipelineLayoutInfo,
    SamplerInfo,
    ImageInfo,
    ImageViewInfo,
    BufferInfo,
    BufferViewInfo,
    FramebufferInfo,
    SemaphoreInfo,
    FenceInfo,
    DeviceMemoryInfo,
    EventInfo,
    QueryPoolInfo,
    SwapchainInfo,
);
