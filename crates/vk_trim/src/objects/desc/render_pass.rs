//! Render passes
//!
//! Subpass attachment references are copied per subpass; the resolve array
//! shares the color count and the depth-stencil reference is optional.
//! `VkRenderPassMultiviewCreateInfo` is the one chained extension carried
//! over.

use ash::vk;

use super::{copy_array, copy_optional, for_each_extension};

/// Owned `VkSubpassDescription`
#[derive(Debug, Clone, Default)]
pub struct SubpassDesc {
    pub flags: vk::SubpassDescriptionFlags,
    pub pipeline_bind_point: vk::PipelineBindPoint,
    pub input_attachments: Vec<vk::AttachmentReference>,
    pub color_attachments: Vec<vk::AttachmentReference>,
    /// Empty, or one entry per color attachment
    pub resolve_attachments: Vec<vk::AttachmentReference>,
    pub depth_stencil_attachment: Option<vk::AttachmentReference>,
    pub preserve_attachments: Vec<u32>,
}

impl SubpassDesc {
    unsafe fn from_vk(info: &vk::SubpassDescription) -> Self {
        Self {
            flags: info.flags,
            pipeline_bind_point: info.pipeline_bind_point,
            input_attachments: copy_array(info.p_input_attachments, info.input_attachment_count),
            color_attachments: copy_array(info.p_color_attachments, info.color_attachment_count),
            resolve_attachments: copy_array(
                info.p_resolve_attachments,
                info.color_attachment_count,
            ),
            depth_stencil_attachment: copy_optional(info.p_depth_stencil_attachment),
            preserve_attachments: copy_array(
                info.p_preserve_attachments,
                info.preserve_attachment_count,
            ),
        }
    }
}

/// Owned `VkRenderPassMultiviewCreateInfo`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiviewDesc {
    pub view_masks: Vec<u32>,
    pub view_offsets: Vec<i32>,
    pub correlation_masks: Vec<u32>,
}

impl MultiviewDesc {
    unsafe fn from_vk(info: &vk::RenderPassMultiviewCreateInfo) -> Self {
        Self {
            view_masks: copy_array(info.p_view_masks, info.subpass_count),
            view_offsets: copy_array(info.p_view_offsets, info.dependency_count),
            correlation_masks: copy_array(
                info.p_correlation_masks,
                info.correlation_mask_count,
            ),
        }
    }
}

/// Owned `VkRenderPassCreateInfo`
#[derive(Debug, Clone, Default)]
pub struct RenderPassDesc {
    pub flags: vk::RenderPassCreateFlags,
    pub attachments: Vec<vk::AttachmentDescription>,
    pub subpasses: Vec<SubpassDesc>,
    pub dependencies: Vec<vk::SubpassDependency>,
    pub multiview: Option<MultiviewDesc>,
}

impl RenderPassDesc {
    /// Deep-copy a caller-owned create info
    ///
    /// # Safety
    /// `info` must be a valid `VkRenderPassCreateInfo`; every array and
    /// chained structure must be readable.
    pub unsafe fn from_vk(info: &vk::RenderPassCreateInfo) -> Self {
        let mut multiview = None;
        for_each_extension(info.p_next, |header| {
            let s_type = (*header).s_type;
            if s_type == vk::StructureType::RENDER_PASS_MULTIVIEW_CREATE_INFO {
                let ext = &*header.cast::<vk::RenderPassMultiviewCreateInfo>();
                multiview = Some(MultiviewDesc::from_vk(ext));
            } else {
                log::debug!("Skipping unrecognized render pass extension {s_type:?}");
            }
        });

        Self {
            flags: info.flags,
            attachments: copy_array(info.p_attachments, info.attachment_count),
            subpasses: copy_array(info.p_subpasses, info.subpass_count)
                .iter()
                .map(|subpass| SubpassDesc::from_vk(subpass))
                .collect(),
            dependencies: copy_array(info.p_dependencies, info.dependency_count),
            multiview,
        }
    }

    /// Final layout of attachment `index`, if it exists
    pub fn final_layout(&self, index: usize) -> Option<vk::ImageLayout> {
        self.attachments.get(index).map(|a| a.final_layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color_attachment(final_layout: vk::ImageLayout) -> vk::AttachmentDescription {
        vk::AttachmentDescription {
            format: vk::Format::B8G8R8A8_UNORM,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_pass_deep_copy() {
        let attachments = vec![
            color_attachment(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AttachmentDescription {
                format: vk::Format::D32_SFLOAT,
                final_layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                ..Default::default()
            },
        ];
        let color_refs = vec![vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };
        let subpasses = vec![vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)
            .build()];
        let dependencies = vec![vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            ..Default::default()
        }];
        let info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies)
            .build();

        let desc = unsafe { RenderPassDesc::from_vk(&info) };
        drop(subpasses);
        drop(color_refs);
        drop(attachments);

        assert_eq!(desc.attachments.len(), 2);
        assert_eq!(desc.final_layout(0), Some(vk::ImageLayout::PRESENT_SRC_KHR));
        assert_eq!(desc.final_layout(2), None);
        assert_eq!(desc.subpasses.len(), 1);
        let subpass = &desc.subpasses[0];
        assert_eq!(subpass.color_attachments[0].attachment, 0);
        assert!(subpass.resolve_attachments.is_empty());
        assert_eq!(subpass.depth_stencil_attachment.unwrap().attachment, 1);
        assert_eq!(desc.dependencies[0].src_subpass, vk::SUBPASS_EXTERNAL);
        assert!(desc.multiview.is_none());
    }

    #[test]
    fn test_multiview_extension_is_copied() {
        let view_masks = vec![0b11u32];
        let correlation = vec![0b11u32];
        let mut multiview = vk::RenderPassMultiviewCreateInfo::builder()
            .view_masks(&view_masks)
            .correlation_masks(&correlation)
            .build();
        let attachments = vec![color_attachment(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .push_next(&mut multiview)
            .build();

        let desc = unsafe { RenderPassDesc::from_vk(&info) };
        drop(view_masks);

        let copied = desc.multiview.as_ref().unwrap();
        assert_eq!(copied.view_masks, vec![0b11]);
        assert!(copied.view_offsets.is_empty());
        assert_eq!(copied.correlation_masks, vec![0b11]);
    }
}
