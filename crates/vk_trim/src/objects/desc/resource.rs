//! Buffers, images, their views, samplers, framebuffers, query pools and
//! swapchains

use ash::vk;

use super::{bool32, copy_array};

/// Owned `VkBufferCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct BufferDesc {
    pub flags: vk::BufferCreateFlags,
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
}

impl BufferDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkBufferCreateInfo` whose arrays are readable.
    pub unsafe fn from_vk(info: &vk::BufferCreateInfo) -> Self {
        Self {
            flags: info.flags,
            size: info.size,
            usage: info.usage,
            sharing_mode: info.sharing_mode,
            queue_family_indices: copy_array(
                info.p_queue_family_indices,
                info.queue_family_index_count,
            ),
        }
    }
}

/// Owned `VkImageCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct ImageDesc {
    pub flags: vk::ImageCreateFlags,
    pub image_type: vk::ImageType,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
    pub sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
    pub initial_layout: vk::ImageLayout,
}

impl ImageDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkImageCreateInfo` whose arrays are readable.
    pub unsafe fn from_vk(info: &vk::ImageCreateInfo) -> Self {
        Self {
            flags: info.flags,
            image_type: info.image_type,
            format: info.format,
            extent: info.extent,
            mip_levels: info.mip_levels,
            array_layers: info.array_layers,
            samples: info.samples,
            tiling: info.tiling,
            usage: info.usage,
            sharing_mode: info.sharing_mode,
            queue_family_indices: copy_array(
                info.p_queue_family_indices,
                info.queue_family_index_count,
            ),
            initial_layout: info.initial_layout,
        }
    }

    /// Aspect mask covering every aspect of the image's format
    pub fn aspect_mask(&self) -> vk::ImageAspectFlags {
        match self.format {
            vk::Format::D16_UNORM | vk::Format::X8_D24_UNORM_PACK32 | vk::Format::D32_SFLOAT => {
                vk::ImageAspectFlags::DEPTH
            }
            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
            vk::Format::D16_UNORM_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::COLOR,
        }
    }

    /// Subresource range covering the whole image
    pub fn full_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect_mask(),
            base_mip_level: 0,
            level_count: self.mip_levels.max(1),
            base_array_layer: 0,
            layer_count: self.array_layers.max(1),
        }
    }
}

/// Owned `VkImageViewCreateInfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageViewDesc {
    pub flags: vk::ImageViewCreateFlags,
    pub image: vk::Image,
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub components: vk::ComponentMapping,
    pub subresource_range: vk::ImageSubresourceRange,
}

impl ImageViewDesc {
    /// Copy a caller-owned create info
    pub fn from_vk(info: &vk::ImageViewCreateInfo) -> Self {
        Self {
            flags: info.flags,
            image: info.image,
            view_type: info.view_type,
            format: info.format,
            components: info.components,
            subresource_range: info.subresource_range,
        }
    }
}

/// Owned `VkBufferViewCreateInfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferViewDesc {
    pub flags: vk::BufferViewCreateFlags,
    pub buffer: vk::Buffer,
    pub format: vk::Format,
    pub offset: vk::DeviceSize,
    pub range: vk::DeviceSize,
}

impl BufferViewDesc {
    /// Copy a caller-owned create info
    pub fn from_vk(info: &vk::BufferViewCreateInfo) -> Self {
        Self {
            flags: info.flags,
            buffer: info.buffer,
            format: info.format,
            offset: info.offset,
            range: info.range,
        }
    }
}

/// Owned `VkSamplerCreateInfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerDesc {
    pub flags: vk::SamplerCreateFlags,
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
    pub address_mode_w: vk::SamplerAddressMode,
    pub mip_lod_bias: f32,
    pub anisotropy_enable: bool,
    pub max_anisotropy: f32,
    pub compare_enable: bool,
    pub compare_op: vk::CompareOp,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: vk::BorderColor,
    pub unnormalized_coordinates: bool,
}

impl SamplerDesc {
    /// Copy a caller-owned create info
    pub fn from_vk(info: &vk::SamplerCreateInfo) -> Self {
        Self {
            flags: info.flags,
            mag_filter: info.mag_filter,
            min_filter: info.min_filter,
            mipmap_mode: info.mipmap_mode,
            address_mode_u: info.address_mode_u,
            address_mode_v: info.address_mode_v,
            address_mode_w: info.address_mode_w,
            mip_lod_bias: info.mip_lod_bias,
            anisotropy_enable: bool32(info.anisotropy_enable),
            max_anisotropy: info.max_anisotropy,
            compare_enable: bool32(info.compare_enable),
            compare_op: info.compare_op,
            min_lod: info.min_lod,
            max_lod: info.max_lod,
            border_color: info.border_color,
            unnormalized_coordinates: bool32(info.unnormalized_coordinates),
        }
    }
}

/// Owned `VkFramebufferCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct FramebufferDesc {
    pub flags: vk::FramebufferCreateFlags,
    pub render_pass: vk::RenderPass,
    pub attachments: Vec<vk::ImageView>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

impl FramebufferDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkFramebufferCreateInfo` whose arrays are readable.
    pub unsafe fn from_vk(info: &vk::FramebufferCreateInfo) -> Self {
        Self {
            flags: info.flags,
            render_pass: info.render_pass,
            attachments: copy_array(info.p_attachments, info.attachment_count),
            width: info.width,
            height: info.height,
            layers: info.layers,
        }
    }
}

/// Owned `VkQueryPoolCreateInfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPoolDesc {
    pub flags: vk::QueryPoolCreateFlags,
    pub query_type: vk::QueryType,
    pub query_count: u32,
    pub pipeline_statistics: vk::QueryPipelineStatisticFlags,
}

impl QueryPoolDesc {
    /// Copy a caller-owned create info
    pub fn from_vk(info: &vk::QueryPoolCreateInfo) -> Self {
        Self {
            flags: info.flags,
            query_type: info.query_type,
            query_count: info.query_count,
            pipeline_statistics: info.pipeline_statistics,
        }
    }
}

/// Owned `VkSwapchainCreateInfoKHR`
#[derive(Debug, Clone, Default)]
pub struct SwapchainDesc {
    pub flags: vk::SwapchainCreateFlagsKHR,
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub image_format: vk::Format,
    pub image_color_space: vk::ColorSpaceKHR,
    pub image_extent: vk::Extent2D,
    pub image_array_layers: u32,
    pub image_usage: vk::ImageUsageFlags,
    pub image_sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    pub clipped: bool,
}

impl SwapchainDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// `old_swapchain` is dropped: a re-created swapchain never has a
    /// predecessor in the trimmed trace.
    ///
    /// # Safety
    /// `info` must be a valid `VkSwapchainCreateInfoKHR` whose arrays are readable.
    pub unsafe fn from_vk(info: &vk::SwapchainCreateInfoKHR) -> Self {
        Self {
            flags: info.flags,
            surface: info.surface,
            min_image_count: info.min_image_count,
            image_format: info.image_format,
            image_color_space: info.image_color_space,
            image_extent: info.image_extent,
            image_array_layers: info.image_array_layers,
            image_usage: info.image_usage,
            image_sharing_mode: info.image_sharing_mode,
            queue_family_indices: copy_array(
                info.p_queue_family_indices,
                info.queue_family_index_count,
            ),
            pre_transform: info.pre_transform,
            composite_alpha: info.composite_alpha,
            present_mode: info.present_mode,
            clipped: bool32(info.clipped),
        }
    }

    /// Creation info equivalent to the swapchain's presentable images
    pub fn image_desc(&self) -> ImageDesc {
        ImageDesc {
            flags: vk::ImageCreateFlags::empty(),
            image_type: vk::ImageType::TYPE_2D,
            format: self.image_format,
            extent: vk::Extent3D {
                width: self.image_extent.width,
                height: self.image_extent.height,
                depth: 1,
            },
            mip_levels: 1,
            array_layers: self.image_array_layers.max(1),
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: self.image_usage,
            sharing_mode: self.image_sharing_mode,
            queue_family_indices: self.queue_family_indices.clone(),
            initial_layout: vk::ImageLayout::UNDEFINED,
        }
    }
}
