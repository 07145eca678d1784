//! The object registry
//!
//! One [`ObjectMap`] per category. Category-generic operations are written
//! once against [`ObjectHandle`] / [`ObjectType`] and expanded over every
//! map by `registry_categories!`.

use ash::vk;

use super::desc::RenderPassDesc;
use super::entry::ObjectMap;
use super::handle::{ObjectHandle, ObjectType};
use super::info::{
    BufferInfo, BufferViewInfo, CommandBufferInfo, CommandPoolInfo, DescriptorPoolInfo,
    DescriptorSetInfo, DescriptorSetLayoutInfo, DescriptorUpdateTemplateInfo, DeviceChild,
    DeviceInfo, DeviceMemoryInfo, EventInfo, FenceInfo, FramebufferInfo, ImageInfo,
    ImageViewInfo, InstanceInfo, PhysicalDeviceInfo, PipelineCacheInfo, PipelineInfo,
    PipelineLayoutInfo, QueryPoolInfo, QueueInfo, RenderPassInfo, SamplerInfo, SemaphoreInfo,
    ShaderModuleInfo, SurfaceInfo, SwapchainInfo,
};

/// Every live Vulkan object, keyed by handle
///
/// `Clone` produces a fully independent registry; this is the snapshot taken
/// when a trim window opens.
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)]
pub struct ObjectRegistry {
    pub instances: ObjectMap<vk::Instance, InstanceInfo>,
    pub physical_devices: ObjectMap<vk::PhysicalDevice, PhysicalDeviceInfo>,
    pub devices: ObjectMap<vk::Device, DeviceInfo>,
    pub queues: ObjectMap<vk::Queue, QueueInfo>,
    pub command_pools: ObjectMap<vk::CommandPool, CommandPoolInfo>,
    pub command_buffers: ObjectMap<vk::CommandBuffer, CommandBufferInfo>,
    pub descriptor_pools: ObjectMap<vk::DescriptorPool, DescriptorPoolInfo>,
    pub descriptor_sets: ObjectMap<vk::DescriptorSet, DescriptorSetInfo>,
    pub descriptor_set_layouts: ObjectMap<vk::DescriptorSetLayout, DescriptorSetLayoutInfo>,
    pub descriptor_update_templates:
        ObjectMap<vk::DescriptorUpdateTemplate, DescriptorUpdateTemplateInfo>,
    pub render_passes: ObjectMap<vk::RenderPass, RenderPassInfo>,
    pub pipeline_caches: ObjectMap<vk::PipelineCache, PipelineCacheInfo>,
    pub pipelines: ObjectMap<vk::Pipeline, PipelineInfo>,
    pub shader_modules: ObjectMap<vk::ShaderModule, ShaderModuleInfo>,
    pub pipeline_layouts: ObjectMap<vk::PipelineLayout, PipelineLayoutInfo>,
    pub samplers: ObjectMap<vk::Sampler, SamplerInfo>,
    pub images: ObjectMap<vk::Image, ImageInfo>,
    pub image_views: ObjectMap<vk::ImageView, ImageViewInfo>,
    pub buffers: ObjectMap<vk::Buffer, BufferInfo>,
    pub buffer_views: ObjectMap<vk::BufferView, BufferViewInfo>,
    pub framebuffers: ObjectMap<vk::Framebuffer, FramebufferInfo>,
    pub semaphores: ObjectMap<vk::Semaphore, SemaphoreInfo>,
    pub fences: ObjectMap<vk::Fence, FenceInfo>,
    pub device_memory: ObjectMap<vk::DeviceMemory, DeviceMemoryInfo>,
    pub events: ObjectMap<vk::Event, EventInfo>,
    pub query_pools: ObjectMap<vk::QueryPool, QueryPoolInfo>,
    pub swapchains: ObjectMap<vk::SwapchainKHR, SwapchainInfo>,
    pub surfaces: ObjectMap<vk::SurfaceKHR, SurfaceInfo>,
}

macro_rules! registry_categories {
    (
        top: [$($top_variant:ident => $top_field:ident),* $(,)?],
        device: [$($variant:ident => $field:ident),* $(,)?] $(,)?
    ) => {
        impl ObjectRegistry {
            /// Whether `handle` is live
            pub fn contains(&self, handle: ObjectHandle) -> bool {
                match handle {
                    $(ObjectHandle::$top_variant(h) => self.$top_field.contains(h),)*
                    $(ObjectHandle::$variant(h) => self.$field.contains(h),)*
                }
            }

            /// Drop the entry for `handle`, returning whether it was live
            ///
            /// Removing a handle that is not live is a no-op.
            pub fn remove(&mut self, handle: ObjectHandle) -> bool {
                match handle {
                    $(ObjectHandle::$top_variant(h) => self.$top_field.remove(h).is_some(),)*
                    $(ObjectHandle::$variant(h) => self.$field.remove(h).is_some(),)*
                }
            }

            /// Flag `handle` as used inside the recording window
            pub fn mark_referenced(&mut self, handle: ObjectHandle) -> bool {
                match handle {
                    $(ObjectHandle::$top_variant(h) => self.$top_field.mark_referenced(h),)*
                    $(ObjectHandle::$variant(h) => self.$field.mark_referenced(h),)*
                }
            }

            /// Whether `handle` is live and flagged as used in the window
            pub fn is_referenced(&self, handle: ObjectHandle) -> bool {
                match handle {
                    $(ObjectHandle::$top_variant(h) => self.$top_field.get(h).is_some_and(|e| e.referenced_in_trim),)*
                    $(ObjectHandle::$variant(h) => self.$field.get(h).is_some_and(|e| e.referenced_in_trim),)*
                }
            }

            /// Number of live objects of one category
            pub fn count(&self, object_type: ObjectType) -> usize {
                match object_type {
                    $(ObjectType::$top_variant => self.$top_field.len(),)*
                    $(ObjectType::$variant => self.$field.len(),)*
                }
            }

            /// Clear every referenced flag
            pub fn clear_referenced(&mut self) {
                $(self.$top_field.clear_referenced();)*
                $(self.$field.clear_referenced();)*
            }

            /// Drop every object owned by `device`, returning the removed handles
            ///
            /// The device entry itself is left in place.
            pub fn remove_device_children(&mut self, device: vk::Device) -> Vec<ObjectHandle> {
                let mut removed = Vec::new();
                $(
                    removed.extend(
                        self.$field
                            .remove_where(|_, entry| entry.info.device() == device)
                            .into_iter()
                            .map(ObjectHandle::$variant),
                    );
                )*
                removed
            }
        }
    };
}

registry_categories! {
    top: [
        Instance => instances,
        PhysicalDevice => physical_devices,
        Device => devices,
        Surface => surfaces,
    ],
    device: [
        Queue => queues,
        CommandPool => command_pools,
        CommandBuffer => command_buffers,
        DescriptorPool => descriptor_pools,
        DescriptorSet => descriptor_sets,
        DescriptorSetLayout => descriptor_set_layouts,
        DescriptorUpdateTemplate => descriptor_update_templates,
        RenderPass => render_passes,
        PipelineCache => pipeline_caches,
        Pipeline => pipelines,
        ShaderModule => shader_modules,
        PipelineLayout => pipeline_layouts,
        Sampler => samplers,
        Image => images,
        ImageView => image_views,
        Buffer => buffers,
        BufferView => buffer_views,
        Framebuffer => framebuffers,
        Semaphore => semaphores,
        Fence => fences,
        DeviceMemory => device_memory,
        Event => events,
        QueryPool => query_pools,
        Swapchain => swapchains,
    ],
}

impl ObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of live objects
    pub fn len(&self) -> usize {
        ObjectType::ALL.iter().map(|ty| self.count(*ty)).sum()
    }

    /// Whether nothing is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live object count per category, skipping empty ones
    pub fn counts(&self) -> Vec<(ObjectType, usize)> {
        ObjectType::ALL
            .iter()
            .map(|ty| (*ty, self.count(*ty)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Drop `device` and everything it owns, returning the removed handles
    pub fn remove_device_objects(&mut self, device: vk::Device) -> Vec<ObjectHandle> {
        let mut removed = self.remove_device_children(device);
        if self.devices.remove(device).is_some() {
            removed.push(ObjectHandle::Device(device));
        }
        log::debug!("Removed {} objects owned by device {device:?}", removed.len());
        removed
    }

    /// Drop `instance` with its devices, physical devices and surfaces
    pub fn remove_instance_objects(&mut self, instance: vk::Instance) -> Vec<ObjectHandle> {
        let physical_devices: Vec<vk::PhysicalDevice> = self
            .physical_devices
            .iter()
            .filter(|(_, entry)| entry.info.instance == instance)
            .map(|(handle, _)| handle)
            .collect();

        let devices: Vec<vk::Device> = self
            .devices
            .iter()
            .filter(|(_, entry)| physical_devices.contains(&entry.info.physical_device))
            .map(|(handle, _)| handle)
            .collect();

        let mut removed = Vec::new();
        for device in devices {
            removed.extend(self.remove_device_objects(device));
        }
        for physical_device in physical_devices {
            self.physical_devices.remove(physical_device);
            removed.push(ObjectHandle::PhysicalDevice(physical_device));
        }
        removed.extend(
            self.surfaces
                .remove_where(|_, entry| entry.info.instance == instance)
                .into_iter()
                .map(ObjectHandle::Surface),
        );
        if self.instances.remove(instance).is_some() {
            removed.push(ObjectHandle::Instance(instance));
        }
        removed
    }

    /// Drop a swapchain together with its presentable images
    pub fn remove_swapchain(&mut self, swapchain: vk::SwapchainKHR) -> bool {
        let Some(entry) = self.swapchains.remove(swapchain) else {
            return false;
        };
        for image in entry.info.images {
            self.images.remove(image);
        }
        true
    }

    /// Append a creation info to a live render pass
    ///
    /// Returns the new version number; a handle that is not live is API
    /// misuse and yields `None`.
    pub fn add_render_pass_create_info(
        &mut self,
        render_pass: vk::RenderPass,
        desc: RenderPassDesc,
    ) -> Option<u32> {
        let Some(entry) = self.render_passes.get_mut(render_pass) else {
            debug_assert!(false, "render pass {render_pass:?} is not live");
            log::warn!("Creation info for unknown render pass {render_pass:?} dropped");
            return None;
        };
        entry.info.versions.push(desc);
        entry.info.current_version()
    }

    /// Creation info of `render_pass` at `version`
    pub fn render_pass_create_info(
        &self,
        render_pass: vk::RenderPass,
        version: u32,
    ) -> Option<&RenderPassDesc> {
        self.render_passes
            .get(render_pass)?
            .info
            .versions
            .get(version as usize)
    }

    /// Latest version number of `render_pass`
    pub fn render_pass_version(&self, render_pass: vk::RenderPass) -> Option<u32> {
        self.render_passes.get(render_pass)?.info.current_version()
    }
}
