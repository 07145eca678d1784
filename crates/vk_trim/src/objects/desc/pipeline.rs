//! Shader modules, pipeline caches and pipelines
//!
//! A graphics pipeline's create info is the deepest structure the tracker
//! copies: an array of stages, each owning an entry-point string and an
//! optional specialization block (map entries plus data blob), and up to
//! nine fixed-function state blocks, several of which own arrays of their
//! own. The one vendor extension recognized on the way down is
//! `VkPipelineRasterizationStateRasterizationOrderAMD`.

use std::ffi::CString;

use ash::vk;

use super::{bool32, copy_array, copy_array_len, copy_cstring, for_each_extension};

/// Owned `VkShaderModuleCreateInfo` including the SPIR-V words
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderModuleDesc {
    pub flags: vk::ShaderModuleCreateFlags,
    pub code: Vec<u32>,
}

impl ShaderModuleDesc {
    /// Module description from SPIR-V words
    pub fn from_words(code: impl Into<Vec<u32>>) -> Self {
        Self {
            flags: vk::ShaderModuleCreateFlags::empty(),
            code: code.into(),
        }
    }

    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info.p_code` must point to `info.code_size` readable bytes.
    pub unsafe fn from_vk(info: &vk::ShaderModuleCreateInfo) -> Self {
        Self {
            flags: info.flags,
            code: copy_array_len(info.p_code, info.code_size / std::mem::size_of::<u32>()),
        }
    }

    /// SPIR-V as bytes, the form `code_size` is expressed in
    pub fn code_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.code)
    }
}

/// Owned `VkPipelineCacheCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct PipelineCacheDesc {
    pub flags: vk::PipelineCacheCreateFlags,
    pub initial_data: Vec<u8>,
}

impl PipelineCacheDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info.p_initial_data` must point to `info.initial_data_size` readable bytes.
    pub unsafe fn from_vk(info: &vk::PipelineCacheCreateInfo) -> Self {
        Self {
            flags: info.flags,
            initial_data: copy_array_len(info.p_initial_data.cast::<u8>(), info.initial_data_size),
        }
    }
}

/// Owned `VkSpecializationInfo`
#[derive(Debug, Clone, Default)]
pub struct SpecializationDesc {
    pub map_entries: Vec<vk::SpecializationMapEntry>,
    pub data: Vec<u8>,
}

impl SpecializationDesc {
    /// # Safety
    /// `info` arrays must be readable for their declared sizes.
    unsafe fn from_vk(info: &vk::SpecializationInfo) -> Self {
        Self {
            map_entries: copy_array(info.p_map_entries, info.map_entry_count),
            data: copy_array_len(info.p_data.cast::<u8>(), info.data_size),
        }
    }
}

/// Owned `VkPipelineShaderStageCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct ShaderStageDesc {
    pub flags: vk::PipelineShaderStageCreateFlags,
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    pub entry_point: CString,
    pub specialization: Option<SpecializationDesc>,
}

impl ShaderStageDesc {
    /// Deep-copy a caller-owned stage description
    ///
    /// # Safety
    /// `info` must be valid with a readable entry-point string and
    /// specialization block.
    pub unsafe fn from_vk(info: &vk::PipelineShaderStageCreateInfo) -> Self {
        Self {
            flags: info.flags,
            stage: info.stage,
            module: info.module,
            entry_point: copy_cstring(info.p_name),
            specialization: info
                .p_specialization_info
                .as_ref()
                .map(|spec| SpecializationDesc::from_vk(spec)),
        }
    }
}

/// Owned `VkPipelineVertexInputStateCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct VertexInputDesc {
    pub flags: vk::PipelineVertexInputStateCreateFlags,
    pub bindings: Vec<vk::VertexInputBindingDescription>,
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl VertexInputDesc {
    unsafe fn from_vk(info: &vk::PipelineVertexInputStateCreateInfo) -> Self {
        Self {
            flags: info.flags,
            bindings: copy_array(
                info.p_vertex_binding_descriptions,
                info.vertex_binding_description_count,
            ),
            attributes: copy_array(
                info.p_vertex_attribute_descriptions,
                info.vertex_attribute_description_count,
            ),
        }
    }
}

/// Owned `VkPipelineInputAssemblyStateCreateInfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct InputAssemblyDesc {
    pub flags: vk::PipelineInputAssemblyStateCreateFlags,
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart_enable: bool,
}

/// Owned `VkPipelineViewportStateCreateInfo`
///
/// Counts are kept separately from the arrays: with dynamic viewport or
/// scissor state the arrays are absent while the counts still matter.
#[derive(Debug, Clone, Default)]
pub struct ViewportDesc {
    pub flags: vk::PipelineViewportStateCreateFlags,
    pub viewport_count: u32,
    pub viewports: Vec<vk::Viewport>,
    pub scissor_count: u32,
    pub scissors: Vec<vk::Rect2D>,
}

impl ViewportDesc {
    unsafe fn from_vk(info: &vk::PipelineViewportStateCreateInfo) -> Self {
        Self {
            flags: info.flags,
            viewport_count: info.viewport_count,
            viewports: copy_array(info.p_viewports, info.viewport_count),
            scissor_count: info.scissor_count,
            scissors: copy_array(info.p_scissors, info.scissor_count),
        }
    }
}

/// Owned `VkPipelineRasterizationStateCreateInfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterizationDesc {
    pub flags: vk::PipelineRasterizationStateCreateFlags,
    pub depth_clamp_enable: bool,
    pub rasterizer_discard_enable: bool,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_bias_enable: bool,
    pub depth_bias_constant_factor: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope_factor: f32,
    pub line_width: f32,
    /// `VK_AMD_rasterization_order` chained through `p_next`
    pub rasterization_order_amd: Option<vk::RasterizationOrderAMD>,
}

impl RasterizationDesc {
    unsafe fn from_vk(info: &vk::PipelineRasterizationStateCreateInfo) -> Self {
        let mut rasterization_order_amd = None;
        for_each_extension(info.p_next, |header| {
            let s_type = (*header).s_type;
            if s_type == vk::StructureType::PIPELINE_RASTERIZATION_STATE_RASTERIZATION_ORDER_AMD {
                let order = &*header.cast::<vk::PipelineRasterizationStateRasterizationOrderAMD>();
                rasterization_order_amd = Some(order.rasterization_order);
            } else {
                log::debug!("Skipping unrecognized rasterization extension {s_type:?}");
            }
        });

        Self {
            flags: info.flags,
            depth_clamp_enable: bool32(info.depth_clamp_enable),
            rasterizer_discard_enable: bool32(info.rasterizer_discard_enable),
            polygon_mode: info.polygon_mode,
            cull_mode: info.cull_mode,
            front_face: info.front_face,
            depth_bias_enable: bool32(info.depth_bias_enable),
            depth_bias_constant_factor: info.depth_bias_constant_factor,
            depth_bias_clamp: info.depth_bias_clamp,
            depth_bias_slope_factor: info.depth_bias_slope_factor,
            line_width: info.line_width,
            rasterization_order_amd,
        }
    }
}

/// Owned `VkPipelineMultisampleStateCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct MultisampleDesc {
    pub flags: vk::PipelineMultisampleStateCreateFlags,
    pub rasterization_samples: vk::SampleCountFlags,
    pub sample_shading_enable: bool,
    pub min_sample_shading: f32,
    /// One word per 32 samples, empty when the caller passed no mask
    pub sample_mask: Vec<vk::SampleMask>,
    pub alpha_to_coverage_enable: bool,
    pub alpha_to_one_enable: bool,
}

impl MultisampleDesc {
    unsafe fn from_vk(info: &vk::PipelineMultisampleStateCreateInfo) -> Self {
        let mask_words = info.rasterization_samples.as_raw().div_ceil(32).max(1);
        Self {
            flags: info.flags,
            rasterization_samples: info.rasterization_samples,
            sample_shading_enable: bool32(info.sample_shading_enable),
            min_sample_shading: info.min_sample_shading,
            sample_mask: copy_array(info.p_sample_mask, mask_words),
            alpha_to_coverage_enable: bool32(info.alpha_to_coverage_enable),
            alpha_to_one_enable: bool32(info.alpha_to_one_enable),
        }
    }
}

/// Owned `VkPipelineDepthStencilStateCreateInfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthStencilDesc {
    pub flags: vk::PipelineDepthStencilStateCreateFlags,
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: vk::CompareOp,
    pub depth_bounds_test_enable: bool,
    pub stencil_test_enable: bool,
    pub front: vk::StencilOpState,
    pub back: vk::StencilOpState,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
}

/// Owned `VkPipelineColorBlendStateCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct ColorBlendDesc {
    pub flags: vk::PipelineColorBlendStateCreateFlags,
    pub logic_op_enable: bool,
    pub logic_op: vk::LogicOp,
    pub attachments: Vec<vk::PipelineColorBlendAttachmentState>,
    pub blend_constants: [f32; 4],
}

impl ColorBlendDesc {
    unsafe fn from_vk(info: &vk::PipelineColorBlendStateCreateInfo) -> Self {
        Self {
            flags: info.flags,
            logic_op_enable: bool32(info.logic_op_enable),
            logic_op: info.logic_op,
            attachments: copy_array(info.p_attachments, info.attachment_count),
            blend_constants: info.blend_constants,
        }
    }
}

/// Owned `VkGraphicsPipelineCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct GraphicsPipelineDesc {
    pub flags: vk::PipelineCreateFlags,
    pub stages: Vec<ShaderStageDesc>,
    pub vertex_input: Option<VertexInputDesc>,
    pub input_assembly: Option<InputAssemblyDesc>,
    pub tessellation_patch_control_points: Option<u32>,
    pub viewport: Option<ViewportDesc>,
    pub rasterization: Option<RasterizationDesc>,
    pub multisample: Option<MultisampleDesc>,
    pub depth_stencil: Option<DepthStencilDesc>,
    pub color_blend: Option<ColorBlendDesc>,
    pub dynamic_states: Vec<vk::DynamicState>,
    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
    pub base_pipeline_handle: vk::Pipeline,
    pub base_pipeline_index: i32,
}

impl GraphicsPipelineDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkGraphicsPipelineCreateInfo`; every state
    /// pointer must be null or readable, with readable arrays.
    pub unsafe fn from_vk(info: &vk::GraphicsPipelineCreateInfo) -> Self {
        let stages = copy_array(info.p_stages, info.stage_count)
            .iter()
            .map(|stage| ShaderStageDesc::from_vk(stage))
            .collect();

        Self {
            flags: info.flags,
            stages,
            vertex_input: info
                .p_vertex_input_state
                .as_ref()
                .map(|state| VertexInputDesc::from_vk(state)),
            input_assembly: info.p_input_assembly_state.as_ref().map(|state| InputAssemblyDesc {
                flags: state.flags,
                topology: state.topology,
                primitive_restart_enable: bool32(state.primitive_restart_enable),
            }),
            tessellation_patch_control_points: info
                .p_tessellation_state
                .as_ref()
                .map(|state| state.patch_control_points),
            viewport: info
                .p_viewport_state
                .as_ref()
                .map(|state| ViewportDesc::from_vk(state)),
            rasterization: info
                .p_rasterization_state
                .as_ref()
                .map(|state| RasterizationDesc::from_vk(state)),
            multisample: info
                .p_multisample_state
                .as_ref()
                .map(|state| MultisampleDesc::from_vk(state)),
            depth_stencil: info.p_depth_stencil_state.as_ref().map(|state| DepthStencilDesc {
                flags: state.flags,
                depth_test_enable: bool32(state.depth_test_enable),
                depth_write_enable: bool32(state.depth_write_enable),
                depth_compare_op: state.depth_compare_op,
                depth_bounds_test_enable: bool32(state.depth_bounds_test_enable),
                stencil_test_enable: bool32(state.stencil_test_enable),
                front: state.front,
                back: state.back,
                min_depth_bounds: state.min_depth_bounds,
                max_depth_bounds: state.max_depth_bounds,
            }),
            color_blend: info
                .p_color_blend_state
                .as_ref()
                .map(|state| ColorBlendDesc::from_vk(state)),
            dynamic_states: info
                .p_dynamic_state
                .as_ref()
                .map(|state| copy_array(state.p_dynamic_states, state.dynamic_state_count))
                .unwrap_or_default(),
            layout: info.layout,
            render_pass: info.render_pass,
            subpass: info.subpass,
            base_pipeline_handle: info.base_pipeline_handle,
            base_pipeline_index: info.base_pipeline_index,
        }
    }
}

/// Owned `VkComputePipelineCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct ComputePipelineDesc {
    pub flags: vk::PipelineCreateFlags,
    pub stage: ShaderStageDesc,
    pub layout: vk::PipelineLayout,
    pub base_pipeline_handle: vk::Pipeline,
    pub base_pipeline_index: i32,
}

impl ComputePipelineDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkComputePipelineCreateInfo`.
    pub unsafe fn from_vk(info: &vk::ComputePipelineCreateInfo) -> Self {
        Self {
            flags: info.flags,
            stage: ShaderStageDesc::from_vk(&info.stage),
            layout: info.layout,
            base_pipeline_handle: info.base_pipeline_handle,
            base_pipeline_index: info.base_pipeline_index,
        }
    }
}

/// Either kind of pipeline description
#[derive(Debug, Clone)]
pub enum PipelineDesc {
    /// Graphics pipeline
    Graphics(Box<GraphicsPipelineDesc>),
    /// Compute pipeline
    Compute(ComputePipelineDesc),
}

impl Default for PipelineDesc {
    fn default() -> Self {
        Self::Compute(ComputePipelineDesc::default())
    }
}

impl PipelineDesc {
    /// Bind point the pipeline is used with
    pub const fn bind_point(&self) -> vk::PipelineBindPoint {
        match self {
            Self::Graphics(_) => vk::PipelineBindPoint::GRAPHICS,
            Self::Compute(_) => vk::PipelineBindPoint::COMPUTE,
        }
    }

    /// Pipeline layout referenced by the pipeline
    pub fn layout(&self) -> vk::PipelineLayout {
        match self {
            Self::Graphics(desc) => desc.layout,
            Self::Compute(desc) => desc.layout,
        }
    }

    /// Render pass for graphics pipelines
    pub fn render_pass(&self) -> Option<vk::RenderPass> {
        match self {
            Self::Graphics(desc) => Some(desc.render_pass),
            Self::Compute(_) => None,
        }
    }

    /// Shader stages in declaration order
    pub fn stages(&self) -> Vec<&ShaderStageDesc> {
        match self {
            Self::Graphics(desc) => desc.stages.iter().collect(),
            Self::Compute(desc) => vec![&desc.stage],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn test_shader_module_copy_is_independent() {
        let mut words = vec![0x0723_0203u32, 1, 2, 3];
        let info = vk::ShaderModuleCreateInfo::builder().code(&words).build();

        let desc = unsafe { ShaderModuleDesc::from_vk(&info) };
        words.iter_mut().for_each(|w| *w = 0);
        drop(words);

        assert_eq!(desc.code, vec![0x0723_0203, 1, 2, 3]);
        assert_eq!(desc.code_bytes().len(), 16);
    }

    #[test]
    fn test_graphics_pipeline_deep_copy() {
        let entry = CString::new("main").unwrap();
        let map_entries = vec![vk::SpecializationMapEntry {
            constant_id: 0,
            offset: 0,
            size: 4,
        }];
        let spec_data = 42u32.to_ne_bytes().to_vec();
        let spec = vk::SpecializationInfo::builder()
            .map_entries(&map_entries)
            .data(&spec_data)
            .build();
        let stages = vec![
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vk::ShaderModule::from_raw(10))
                .name(&entry)
                .specialization_info(&spec)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(vk::ShaderModule::from_raw(11))
                .name(&entry)
                .build(),
        ];
        let bindings = vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: 32,
            input_rate: vk::VertexInputRate::VERTEX,
        }];
        let attributes = vec![vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: 0,
        }];
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes)
            .build();
        let viewports = vec![vk::Viewport {
            width: 800.0,
            height: 600.0,
            max_depth: 1.0,
            ..Default::default()
        }];
        let scissors = vec![vk::Rect2D::default()];
        let viewport = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors)
            .build();
        let mut amd_order = vk::PipelineRasterizationStateRasterizationOrderAMD::builder()
            .rasterization_order(vk::RasterizationOrderAMD::RELAXED)
            .build();
        let rasterization = vk::PipelineRasterizationStateCreateInfo::builder()
            .line_width(1.0)
            .push_next(&mut amd_order)
            .build();
        let blend_attachments = vec![vk::PipelineColorBlendAttachmentState::default(); 2];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::builder()
            .attachments(&blend_attachments)
            .build();
        let dynamic = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder()
            .dynamic_states(&dynamic)
            .build();

        let info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .viewport_state(&viewport)
            .rasterization_state(&rasterization)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(vk::PipelineLayout::from_raw(5))
            .render_pass(vk::RenderPass::from_raw(6))
            .build();

        let desc = unsafe { GraphicsPipelineDesc::from_vk(&info) };

        drop(stages);
        drop(map_entries);
        drop(spec_data);
        drop(bindings);
        drop(attributes);
        drop(viewports);
        drop(blend_attachments);
        drop(dynamic);

        assert_eq!(desc.stages.len(), 2);
        assert_eq!(desc.stages[0].entry_point.to_str().unwrap(), "main");
        let spec = desc.stages[0].specialization.as_ref().unwrap();
        assert_eq!(spec.map_entries.len(), 1);
        assert_eq!(spec.data, 42u32.to_ne_bytes().to_vec());
        assert!(desc.stages[1].specialization.is_none());

        let vertex_input = desc.vertex_input.as_ref().unwrap();
        assert_eq!(vertex_input.bindings[0].stride, 32);
        assert_eq!(vertex_input.attributes[0].format, vk::Format::R32G32B32_SFLOAT);

        let viewport = desc.viewport.as_ref().unwrap();
        assert_eq!(viewport.viewport_count, 1);
        assert!((viewport.viewports[0].width - 800.0).abs() < f32::EPSILON);

        assert_eq!(
            desc.rasterization.unwrap().rasterization_order_amd,
            Some(vk::RasterizationOrderAMD::RELAXED)
        );
        assert_eq!(desc.color_blend.as_ref().unwrap().attachments.len(), 2);
        assert_eq!(desc.dynamic_states, vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]);
        assert!(desc.multisample.is_none());
        assert_eq!(desc.layout.as_raw(), 5);
    }

    #[test]
    fn test_pipeline_clone_does_not_alias() {
        let mut desc = GraphicsPipelineDesc {
            stages: vec![ShaderStageDesc {
                entry_point: CString::new("main").unwrap(),
                specialization: Some(SpecializationDesc {
                    map_entries: Vec::new(),
                    data: vec![1, 2, 3],
                }),
                ..ShaderStageDesc::default()
            }],
            ..GraphicsPipelineDesc::default()
        };

        let copy = desc.clone();
        desc.stages[0].specialization.as_mut().unwrap().data.clear();
        desc.stages.clear();

        assert_eq!(copy.stages[0].specialization.as_ref().unwrap().data, vec![1, 2, 3]);
    }

    #[test]
    fn test_dynamic_viewport_keeps_counts() {
        let info = vk::PipelineViewportStateCreateInfo {
            viewport_count: 1,
            scissor_count: 1,
            ..Default::default()
        };
        let desc = unsafe { ViewportDesc::from_vk(&info) };
        assert_eq!(desc.viewport_count, 1);
        assert!(desc.viewports.is_empty());
    }

    #[test]
    fn test_compute_pipeline_stage() {
        let entry = CString::new("cs_main").unwrap();
        let info = vk::ComputePipelineCreateInfo::builder()
            .stage(
                vk::PipelineShaderStageCreateInfo::builder()
                    .stage(vk::ShaderStageFlags::COMPUTE)
                    .module(vk::ShaderModule::from_raw(3))
                    .name(&entry)
                    .build(),
            )
            .build();

        let desc = PipelineDesc::Compute(unsafe { ComputePipelineDesc::from_vk(&info) });
        drop(entry);

        assert_eq!(desc.bind_point(), vk::PipelineBindPoint::COMPUTE);
        assert_eq!(desc.stages()[0].entry_point.to_str().unwrap(), "cs_main");
        assert!(desc.render_pass().is_none());
    }
}
