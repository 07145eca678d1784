//! Owned creation descriptors
//!
//! Every Vulkan create-info that carries pointers has an owned counterpart
//! here. `from_vk` deep-copies the caller's structure (arrays, strings, blobs
//! and the recognized `p_next` extensions) into storage owned by the
//! descriptor, so the caller may free its memory as soon as the intercepted
//! call returns. Dropping a descriptor releases exactly what `from_vk`
//! allocated, and `Clone` produces a fully independent copy.
//!
//! Pointer-free Vulkan structs (`vk::Viewport`, `vk::AttachmentDescription`,
//! ...) are stored as-is.

// Fields mirror the Vulkan structures one to one.
#[allow(missing_docs)]
mod descriptor;
#[allow(missing_docs)]
mod pipeline;
#[allow(missing_docs)]
mod render_pass;
#[allow(missing_docs)]
mod resource;

pub use descriptor::{
    DescriptorCopy, DescriptorPayload, DescriptorPoolDesc, DescriptorSetLayoutBindingDesc,
    DescriptorSetLayoutDesc, DescriptorUpdateTemplateDesc, DescriptorValue, DescriptorWrite,
    PipelineLayoutDesc,
};
pub use pipeline::{
    ColorBlendDesc, ComputePipelineDesc, DepthStencilDesc, GraphicsPipelineDesc,
    InputAssemblyDesc, MultisampleDesc, PipelineCacheDesc, PipelineDesc, RasterizationDesc,
    ShaderModuleDesc, ShaderStageDesc, SpecializationDesc, VertexInputDesc, ViewportDesc,
};
pub use render_pass::{MultiviewDesc, RenderPassDesc, SubpassDesc};
pub use resource::{
    BufferDesc, BufferViewDesc, FramebufferDesc, ImageDesc, ImageViewDesc, QueryPoolDesc,
    SamplerDesc, SwapchainDesc,
};

use std::ffi::{c_char, CStr, CString};

use ash::vk;

/// Copy a caller-owned array into a vector
///
/// # Safety
/// `ptr` must be null or point to `count` readable, initialized `T`s.
pub(crate) unsafe fn copy_array<T: Copy>(ptr: *const T, count: u32) -> Vec<T> {
    copy_array_len(ptr, count as usize)
}

/// Copy a caller-owned array with a `usize` length
///
/// # Safety
/// `ptr` must be null or point to `len` readable, initialized `T`s.
pub(crate) unsafe fn copy_array_len<T: Copy>(ptr: *const T, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(ptr, len).to_vec()
    }
}

/// Copy an optional single struct
///
/// # Safety
/// `ptr` must be null or point to a readable `T`.
pub(crate) unsafe fn copy_optional<T: Copy>(ptr: *const T) -> Option<T> {
    ptr.as_ref().copied()
}

/// Copy a caller-owned NUL-terminated string
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn copy_cstring(ptr: *const c_char) -> CString {
    if ptr.is_null() {
        CString::default()
    } else {
        CStr::from_ptr(ptr).to_owned()
    }
}

/// Walk a `p_next` chain, yielding each structure header
///
/// # Safety
/// `p_next` must be null or the head of a valid Vulkan structure chain.
pub(crate) unsafe fn for_each_extension<F>(p_next: *const std::ffi::c_void, mut visit: F)
where
    F: FnMut(*const vk::BaseInStructure),
{
    let mut next = p_next.cast::<vk::BaseInStructure>();
    while let Some(header) = next.as_ref() {
        visit(next);
        next = header.p_next;
    }
}

pub(crate) fn bool32(value: vk::Bool32) -> bool {
    value != vk::FALSE
}
