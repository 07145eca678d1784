//! Tagged object handles
//!
//! [`ObjectHandle`] names any tracked object together with its category so
//! generic operations (lookup, removal, reference marking, destroy emission)
//! dispatch through an exhaustive `match` instead of a runtime type tag.

use std::fmt;

use ash::vk::{self, Handle};

/// Vulkan object categories known to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    /// `VkInstance`
    Instance,
    /// `VkPhysicalDevice`
    PhysicalDevice,
    /// `VkDevice`
    Device,
    /// `VkQueue`
    Queue,
    /// `VkCommandPool`
    CommandPool,
    /// `VkCommandBuffer`
    CommandBuffer,
    /// `VkDescriptorPool`
    DescriptorPool,
    /// `VkDescriptorSet`
    DescriptorSet,
    /// `VkDescriptorSetLayout`
    DescriptorSetLayout,
    /// `VkDescriptorUpdateTemplate`
    DescriptorUpdateTemplate,
    /// `VkRenderPass`
    RenderPass,
    /// `VkPipelineCache`
    PipelineCache,
    /// `VkPipeline`
    Pipeline,
    /// `VkShaderModule`
    ShaderModule,
    /// `VkPipelineLayout`
    PipelineLayout,
    /// `VkSampler`
    Sampler,
    /// `VkImage`
    Image,
    /// `VkImageView`
    ImageView,
    /// `VkBuffer`
    Buffer,
    /// `VkBufferView`
    BufferView,
    /// `VkFramebuffer`
    Framebuffer,
    /// `VkSemaphore`
    Semaphore,
    /// `VkFence`
    Fence,
    /// `VkDeviceMemory`
    DeviceMemory,
    /// `VkEvent`
    Event,
    /// `VkQueryPool`
    QueryPool,
    /// `VkSwapchainKHR`
    Swapchain,
    /// `VkSurfaceKHR`
    Surface,
}

impl ObjectType {
    /// Every category, in creation dependency order
    pub const ALL: [Self; 28] = [
        Self::Instance,
        Self::PhysicalDevice,
        Self::Surface,
        Self::Device,
        Self::Queue,
        Self::Swapchain,
        Self::CommandPool,
        Self::CommandBuffer,
        Self::DescriptorPool,
        Self::DeviceMemory,
        Self::Buffer,
        Self::BufferView,
        Self::Image,
        Self::ImageView,
        Self::Sampler,
        Self::ShaderModule,
        Self::DescriptorSetLayout,
        Self::DescriptorUpdateTemplate,
        Self::PipelineLayout,
        Self::RenderPass,
        Self::PipelineCache,
        Self::Pipeline,
        Self::Framebuffer,
        Self::DescriptorSet,
        Self::Semaphore,
        Self::Fence,
        Self::Event,
        Self::QueryPool,
    ];

    /// Vulkan type name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Instance => "VkInstance",
            Self::PhysicalDevice => "VkPhysicalDevice",
            Self::Device => "VkDevice",
            Self::Queue => "VkQueue",
            Self::CommandPool => "VkCommandPool",
            Self::CommandBuffer => "VkCommandBuffer",
            Self::DescriptorPool => "VkDescriptorPool",
            Self::DescriptorSet => "VkDescriptorSet",
            Self::DescriptorSetLayout => "VkDescriptorSetLayout",
            Self::DescriptorUpdateTemplate => "VkDescriptorUpdateTemplate",
            Self::RenderPass => "VkRenderPass",
            Self::PipelineCache => "VkPipelineCache",
            Self::Pipeline => "VkPipeline",
            Self::ShaderModule => "VkShaderModule",
            Self::PipelineLayout => "VkPipelineLayout",
            Self::Sampler => "VkSampler",
            Self::Image => "VkImage",
            Self::ImageView => "VkImageView",
            Self::Buffer => "VkBuffer",
            Self::BufferView => "VkBufferView",
            Self::Framebuffer => "VkFramebuffer",
            Self::Semaphore => "VkSemaphore",
            Self::Fence => "VkFence",
            Self::DeviceMemory => "VkDeviceMemory",
            Self::Event => "VkEvent",
            Self::QueryPool => "VkQueryPool",
            Self::Swapchain => "VkSwapchainKHR",
            Self::Surface => "VkSurfaceKHR",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A handle of any tracked category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ObjectHandle {
    Instance(vk::Instance),
    PhysicalDevice(vk::PhysicalDevice),
    Device(vk::Device),
    Queue(vk::Queue),
    CommandPool(vk::CommandPool),
    CommandBuffer(vk::CommandBuffer),
    DescriptorPool(vk::DescriptorPool),
    DescriptorSet(vk::DescriptorSet),
    DescriptorSetLayout(vk::DescriptorSetLayout),
    DescriptorUpdateTemplate(vk::DescriptorUpdateTemplate),
    RenderPass(vk::RenderPass),
    PipelineCache(vk::PipelineCache),
    Pipeline(vk::Pipeline),
    ShaderModule(vk::ShaderModule),
    PipelineLayout(vk::PipelineLayout),
    Sampler(vk::Sampler),
    Image(vk::Image),
    ImageView(vk::ImageView),
    Buffer(vk::Buffer),
    BufferView(vk::BufferView),
    Framebuffer(vk::Framebuffer),
    Semaphore(vk::Semaphore),
    Fence(vk::Fence),
    DeviceMemory(vk::DeviceMemory),
    Event(vk::Event),
    QueryPool(vk::QueryPool),
    Swapchain(vk::SwapchainKHR),
    Surface(vk::SurfaceKHR),
}

impl ObjectHandle {
    /// Category of the handle
    pub const fn object_type(self) -> ObjectType {
        match self {
            Self::Instance(_) => ObjectType::Instance,
            Self::PhysicalDevice(_) => ObjectType::PhysicalDevice,
            Self::Device(_) => ObjectType::Device,
            Self::Queue(_) => ObjectType::Queue,
            Self::CommandPool(_) => ObjectType::CommandPool,
            Self::CommandBuffer(_) => ObjectType::CommandBuffer,
            Self::DescriptorPool(_) => ObjectType::DescriptorPool,
            Self::DescriptorSet(_) => ObjectType::DescriptorSet,
            Self::DescriptorSetLayout(_) => ObjectType::DescriptorSetLayout,
            Self::DescriptorUpdateTemplate(_) => ObjectType::DescriptorUpdateTemplate,
            Self::RenderPass(_) => ObjectType::RenderPass,
            Self::PipelineCache(_) => ObjectType::PipelineCache,
            Self::Pipeline(_) => ObjectType::Pipeline,
            Self::ShaderModule(_) => ObjectType::ShaderModule,
            Self::PipelineLayout(_) => ObjectType::PipelineLayout,
            Self::Sampler(_) => ObjectType::Sampler,
            Self::Image(_) => ObjectType::Image,
            Self::ImageView(_) => ObjectType::ImageView,
            Self::Buffer(_) => ObjectType::Buffer,
            Self::BufferView(_) => ObjectType::BufferView,
            Self::Framebuffer(_) => ObjectType::Framebuffer,
            Self::Semaphore(_) => ObjectType::Semaphore,
            Self::Fence(_) => ObjectType::Fence,
            Self::DeviceMemory(_) => ObjectType::DeviceMemory,
            Self::Event(_) => ObjectType::Event,
            Self::QueryPool(_) => ObjectType::QueryPool,
            Self::Swapchain(_) => ObjectType::Swapchain,
            Self::Surface(_) => ObjectType::Surface,
        }
    }

    /// Raw 64-bit handle value
    pub fn raw(self) -> u64 {
        match self {
            Self::Instance(h) => h.as_raw(),
            Self::PhysicalDevice(h) => h.as_raw(),
            Self::Device(h) => h.as_raw(),
            Self::Queue(h) => h.as_raw(),
            Self::CommandPool(h) => h.as_raw(),
            Self::CommandBuffer(h) => h.as_raw(),
            Self::DescriptorPool(h) => h.as_raw(),
            Self::DescriptorSet(h) => h.as_raw(),
            Self::DescriptorSetLayout(h) => h.as_raw(),
            Self::DescriptorUpdateTemplate(h) => h.as_raw(),
            Self::RenderPass(h) => h.as_raw(),
            Self::PipelineCache(h) => h.as_raw(),
            Self::Pipeline(h) => h.as_raw(),
            Self::ShaderModule(h) => h.as_raw(),
            Self::PipelineLayout(h) => h.as_raw(),
            Self::Sampler(h) => h.as_raw(),
            Self::Image(h) => h.as_raw(),
            Self::ImageView(h) => h.as_raw(),
            Self::Buffer(h) => h.as_raw(),
            Self::BufferView(h) => h.as_raw(),
            Self::Framebuffer(h) => h.as_raw(),
            Self::Semaphore(h) => h.as_raw(),
            Self::Fence(h) => h.as_raw(),
            Self::DeviceMemory(h) => h.as_raw(),
            Self::Event(h) => h.as_raw(),
            Self::QueryPool(h) => h.as_raw(),
            Self::Swapchain(h) => h.as_raw(),
            Self::Surface(h) => h.as_raw(),
        }
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", self.object_type(), self.raw())
    }
}

macro_rules! impl_from_handle {
    ($($variant:ident => $handle:ty),* $(,)?) => {
        $(
            impl From<$handle> for ObjectHandle {
                fn from(handle: $handle) -> Self {
                    Self::$variant(handle)
                }
            }
        )*
    };
}

impl_from_handle! {
    Instance => vk::Instance,
    PhysicalDevice => vk::PhysicalDevice,
    Device => vk::Device,
    Queue => vk::Queue,
    CommandPool => vk::CommandPool,
    CommandBuffer => vk::CommandBuffer,
    DescriptorPool => vk::DescriptorPool,
    DescriptorSet => vk::DescriptorSet,
    DescriptorSetLayout => vk::DescriptorSetLayout,
    DescriptorUpdateTemplate => vk::DescriptorUpdateTemplate,
    RenderPass => vk::RenderPass,
    PipelineCache => vk::PipelineCache,
    Pipeline => vk::Pipeline,
    ShaderModule => vk::ShaderModule,
    PipelineLayout => vk::PipelineLayout,
    Sampler => vk::Sampler,
    Image => vk::Image,
    ImageView => vk::ImageView,
    Buffer => vk::Buffer,
    BufferView => vk::BufferView,
    Framebuffer => vk::Framebuffer,
    Semaphore => vk::Semaphore,
    Fence => vk::Fence,
    DeviceMemory => vk::DeviceMemory,
    Event => vk::Event,
    QueryPool => vk::QueryPool,
    Swapchain => vk::SwapchainKHR,
    Surface => vk::SurfaceKHR,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_tag_and_raw() {
        let handle = ObjectHandle::from(vk::Buffer::from_raw(0x42));
        assert_eq!(handle.object_type(), ObjectType::Buffer);
        assert_eq!(handle.raw(), 0x42);
        assert_eq!(handle.to_string(), "VkBuffer(0x42)");
    }

    #[test]
    fn test_all_lists_each_category_once() {
        let mut all = ObjectType::ALL.to_vec();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), ObjectType::ALL.len());
    }
}
