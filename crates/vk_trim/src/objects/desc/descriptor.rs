//! Descriptor pools, set layouts, update templates, pipeline layouts and
//! descriptor set updates

use ash::vk;

use super::copy_array;

/// Owned `VkDescriptorPoolCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct DescriptorPoolDesc {
    pub flags: vk::DescriptorPoolCreateFlags,
    pub max_sets: u32,
    pub pool_sizes: Vec<vk::DescriptorPoolSize>,
}

impl DescriptorPoolDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkDescriptorPoolCreateInfo` whose arrays are readable.
    pub unsafe fn from_vk(info: &vk::DescriptorPoolCreateInfo) -> Self {
        Self {
            flags: info.flags,
            max_sets: info.max_sets,
            pool_sizes: copy_array(info.p_pool_sizes, info.pool_size_count),
        }
    }

    /// Whether sets may be returned to the pool individually
    pub fn can_free_sets(&self) -> bool {
        self.flags
            .contains(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
    }
}

/// Owned `VkDescriptorSetLayoutBinding`
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutBindingDesc {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub descriptor_count: u32,
    pub stage_flags: vk::ShaderStageFlags,
    /// Only populated for sampler descriptor types
    pub immutable_samplers: Vec<vk::Sampler>,
}

impl DescriptorSetLayoutBindingDesc {
    unsafe fn from_vk(binding: &vk::DescriptorSetLayoutBinding) -> Self {
        let takes_samplers = matches!(
            binding.descriptor_type,
            vk::DescriptorType::SAMPLER | vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        Self {
            binding: binding.binding,
            descriptor_type: binding.descriptor_type,
            descriptor_count: binding.descriptor_count,
            stage_flags: binding.stage_flags,
            immutable_samplers: if takes_samplers {
                copy_array(binding.p_immutable_samplers, binding.descriptor_count)
            } else {
                Vec::new()
            },
        }
    }
}

/// Owned `VkDescriptorSetLayoutCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetLayoutDesc {
    pub flags: vk::DescriptorSetLayoutCreateFlags,
    pub bindings: Vec<DescriptorSetLayoutBindingDesc>,
}

impl DescriptorSetLayoutDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkDescriptorSetLayoutCreateInfo`; the binding
    /// array and every immutable sampler array must be readable.
    pub unsafe fn from_vk(info: &vk::DescriptorSetLayoutCreateInfo) -> Self {
        Self {
            flags: info.flags,
            bindings: copy_array(info.p_bindings, info.binding_count)
                .iter()
                .map(|binding| DescriptorSetLayoutBindingDesc::from_vk(binding))
                .collect(),
        }
    }

    /// Descriptor count of `binding`, if the layout declares it
    pub fn descriptor_count(&self, binding: u32) -> Option<u32> {
        self.bindings
            .iter()
            .find(|b| b.binding == binding)
            .map(|b| b.descriptor_count)
    }

    /// Lowest declared binding above `binding` that holds descriptors
    ///
    /// Updates running past the end of a binding continue here.
    pub fn next_binding(&self, binding: u32) -> Option<u32> {
        self.bindings
            .iter()
            .filter(|b| b.binding > binding && b.descriptor_count > 0)
            .map(|b| b.binding)
            .min()
    }
}

/// Owned `VkDescriptorUpdateTemplateCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct DescriptorUpdateTemplateDesc {
    pub flags: vk::DescriptorUpdateTemplateCreateFlags,
    pub entries: Vec<vk::DescriptorUpdateTemplateEntry>,
    pub template_type: vk::DescriptorUpdateTemplateType,
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub pipeline_bind_point: vk::PipelineBindPoint,
    pub pipeline_layout: vk::PipelineLayout,
    pub set: u32,
}

impl DescriptorUpdateTemplateDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkDescriptorUpdateTemplateCreateInfo` whose
    /// entry array is readable.
    pub unsafe fn from_vk(info: &vk::DescriptorUpdateTemplateCreateInfo) -> Self {
        Self {
            flags: info.flags,
            entries: copy_array(
                info.p_descriptor_update_entries,
                info.descriptor_update_entry_count,
            ),
            template_type: info.template_type,
            descriptor_set_layout: info.descriptor_set_layout,
            pipeline_bind_point: info.pipeline_bind_point,
            pipeline_layout: info.pipeline_layout,
            set: info.set,
        }
    }
}

/// Owned `VkPipelineLayoutCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutDesc {
    pub flags: vk::PipelineLayoutCreateFlags,
    pub set_layouts: Vec<vk::DescriptorSetLayout>,
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
}

impl PipelineLayoutDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkPipelineLayoutCreateInfo` whose arrays are readable.
    pub unsafe fn from_vk(info: &vk::PipelineLayoutCreateInfo) -> Self {
        Self {
            flags: info.flags,
            set_layouts: copy_array(info.p_set_layouts, info.set_layout_count),
            push_constant_ranges: copy_array(
                info.p_push_constant_ranges,
                info.push_constant_range_count,
            ),
        }
    }
}

/// Contents of a single descriptor
#[derive(Debug, Clone, Copy)]
pub enum DescriptorValue {
    Image(vk::DescriptorImageInfo),
    Buffer(vk::DescriptorBufferInfo),
    TexelBufferView(vk::BufferView),
}

/// Descriptor contents of one write, selected by the descriptor type
#[derive(Debug, Clone, Default)]
pub enum DescriptorPayload {
    /// Sampler, image and input attachment descriptors
    Images(Vec<vk::DescriptorImageInfo>),
    /// Uniform and storage buffers, dynamic or not
    Buffers(Vec<vk::DescriptorBufferInfo>),
    /// Uniform and storage texel buffers
    TexelBufferViews(Vec<vk::BufferView>),
    /// A descriptor type whose contents are not retained
    #[default]
    Unsupported,
}

impl DescriptorPayload {
    /// Number of descriptors carried
    pub fn len(&self) -> usize {
        match self {
            Self::Images(images) => images.len(),
            Self::Buffers(buffers) => buffers.len(),
            Self::TexelBufferViews(views) => views.len(),
            Self::Unsupported => 0,
        }
    }

    /// Whether no descriptor is carried
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptor at `index`
    pub fn value(&self, index: usize) -> Option<DescriptorValue> {
        match self {
            Self::Images(images) => images.get(index).copied().map(DescriptorValue::Image),
            Self::Buffers(buffers) => buffers.get(index).copied().map(DescriptorValue::Buffer),
            Self::TexelBufferViews(views) => {
                views.get(index).copied().map(DescriptorValue::TexelBufferView)
            }
            Self::Unsupported => None,
        }
    }

    /// Payload holding only `value`
    pub fn from_value(value: DescriptorValue) -> Self {
        match value {
            DescriptorValue::Image(image) => Self::Images(vec![image]),
            DescriptorValue::Buffer(buffer) => Self::Buffers(vec![buffer]),
            DescriptorValue::TexelBufferView(view) => Self::TexelBufferViews(vec![view]),
        }
    }

    /// Append `value` if it belongs to the same family; returns whether it did
    pub fn push(&mut self, value: DescriptorValue) -> bool {
        match (self, value) {
            (Self::Images(images), DescriptorValue::Image(image)) => images.push(image),
            (Self::Buffers(buffers), DescriptorValue::Buffer(buffer)) => buffers.push(buffer),
            (Self::TexelBufferViews(views), DescriptorValue::TexelBufferView(view)) => {
                views.push(view);
            }
            _ => return false,
        }
        true
    }
}

/// Owned `VkWriteDescriptorSet`
#[derive(Debug, Clone, Default)]
pub struct DescriptorWrite {
    pub dst_set: vk::DescriptorSet,
    pub dst_binding: u32,
    pub dst_array_element: u32,
    pub descriptor_count: u32,
    pub descriptor_type: vk::DescriptorType,
    pub payload: DescriptorPayload,
}

impl DescriptorWrite {
    /// Deep-copy a caller-owned write
    ///
    /// Descriptor types outside the image, buffer and texel-buffer families
    /// are kept with an [`DescriptorPayload::Unsupported`] payload.
    ///
    /// # Safety
    /// `write` must be a valid `VkWriteDescriptorSet`; the array matching its
    /// descriptor type must hold `descriptor_count` readable entries.
    pub unsafe fn from_vk(write: &vk::WriteDescriptorSet) -> Self {
        let count = write.descriptor_count;
        let payload = match write.descriptor_type {
            vk::DescriptorType::SAMPLER
            | vk::DescriptorType::COMBINED_IMAGE_SAMPLER
            | vk::DescriptorType::SAMPLED_IMAGE
            | vk::DescriptorType::STORAGE_IMAGE
            | vk::DescriptorType::INPUT_ATTACHMENT => {
                DescriptorPayload::Images(copy_array(write.p_image_info, count))
            }
            vk::DescriptorType::UNIFORM_BUFFER
            | vk::DescriptorType::STORAGE_BUFFER
            | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
            | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC => {
                DescriptorPayload::Buffers(copy_array(write.p_buffer_info, count))
            }
            vk::DescriptorType::UNIFORM_TEXEL_BUFFER
            | vk::DescriptorType::STORAGE_TEXEL_BUFFER => {
                DescriptorPayload::TexelBufferViews(copy_array(write.p_texel_buffer_view, count))
            }
            other => {
                log::warn!("Descriptor type {other:?} not retained for replay");
                DescriptorPayload::Unsupported
            }
        };

        Self {
            dst_set: write.dst_set,
            dst_binding: write.dst_binding,
            dst_array_element: write.dst_array_element,
            descriptor_count: count,
            descriptor_type: write.descriptor_type,
            payload,
        }
    }
}

/// Owned `VkCopyDescriptorSet`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptorCopy {
    pub src_set: vk::DescriptorSet,
    pub src_binding: u32,
    pub src_array_element: u32,
    pub dst_set: vk::DescriptorSet,
    pub dst_binding: u32,
    pub dst_array_element: u32,
    pub descriptor_count: u32,
}

impl DescriptorCopy {
    /// Copy a caller-owned copy operation
    pub fn from_vk(copy: &vk::CopyDescriptorSet) -> Self {
        Self {
            src_set: copy.src_set,
            src_binding: copy.src_binding,
            src_array_element: copy.src_array_element,
            dst_set: copy.dst_set,
            dst_binding: copy.dst_binding,
            dst_array_element: copy.dst_array_element,
            descriptor_count: copy.descriptor_count,
        }
    }
}
