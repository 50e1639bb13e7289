/// Descriptor set layouts and writes (buffer-related descriptors only)

use crate::registry::{BufferViewKey, DescriptorSetKey};

/// Descriptor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
}

impl DescriptorType {
    /// Whether descriptors of this type are written from buffer views
    pub fn is_texel_buffer(&self) -> bool {
        matches!(self, DescriptorType::UniformTexelBuffer | DescriptorType::StorageTexelBuffer)
    }
}

/// One binding of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub descriptor_count: u32,
}

/// One descriptor write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteDescriptorSet {
    pub dst_set: DescriptorSetKey,
    pub dst_binding: u32,
    pub descriptor_type: DescriptorType,
    /// Views written for texel buffer descriptor types
    pub texel_buffer_views: Vec<BufferViewKey>,
}
