/// Typed handles for every object kind tracked by the layer.
///
/// Handles are slotmap keys: an index plus a generation. A handle whose
/// object was destroyed never matches a newer object that reuses the slot,
/// so stale and double-destroyed handles are detected structurally.

use std::fmt;
use slotmap::{new_key_type, Key};

new_key_type! {
    /// Handle of a buffer
    pub struct BufferKey;
    /// Handle of a buffer view
    pub struct BufferViewKey;
    /// Handle of a device memory allocation
    pub struct MemoryKey;
    /// Handle of a command pool
    pub struct CommandPoolKey;
    /// Handle of a command buffer
    pub struct CommandBufferKey;
    /// Handle of a graphics pipeline
    pub struct PipelineKey;
    /// Handle of a descriptor set
    pub struct DescriptorSetKey;
}

/// Kind tag of a tracked object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Buffer,
    BufferView,
    Memory,
    CommandPool,
    CommandBuffer,
    Pipeline,
    DescriptorSet,
}

impl ObjectKind {
    /// API type name used in diagnostics (e.g. "VkBuffer")
    pub fn api_name(&self) -> &'static str {
        match self {
            ObjectKind::Buffer => "VkBuffer",
            ObjectKind::BufferView => "VkBufferView",
            ObjectKind::Memory => "VkDeviceMemory",
            ObjectKind::CommandPool => "VkCommandPool",
            ObjectKind::CommandBuffer => "VkCommandBuffer",
            ObjectKind::Pipeline => "VkPipeline",
            ObjectKind::DescriptorSet => "VkDescriptorSet",
        }
    }
}

/// A handle of any kind, as passed in a call argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleRef {
    Buffer(BufferKey),
    BufferView(BufferViewKey),
    Memory(MemoryKey),
    CommandPool(CommandPoolKey),
    CommandBuffer(CommandBufferKey),
    Pipeline(PipelineKey),
    DescriptorSet(DescriptorSetKey),
}

impl HandleRef {
    pub fn kind(&self) -> ObjectKind {
        match self {
            HandleRef::Buffer(_) => ObjectKind::Buffer,
            HandleRef::BufferView(_) => ObjectKind::BufferView,
            HandleRef::Memory(_) => ObjectKind::Memory,
            HandleRef::CommandPool(_) => ObjectKind::CommandPool,
            HandleRef::CommandBuffer(_) => ObjectKind::CommandBuffer,
            HandleRef::Pipeline(_) => ObjectKind::Pipeline,
            HandleRef::DescriptorSet(_) => ObjectKind::DescriptorSet,
        }
    }

    /// Whether this is the null handle of its kind
    pub fn is_null(&self) -> bool {
        match self {
            HandleRef::Buffer(k) => k.is_null(),
            HandleRef::BufferView(k) => k.is_null(),
            HandleRef::Memory(k) => k.is_null(),
            HandleRef::CommandPool(k) => k.is_null(),
            HandleRef::CommandBuffer(k) => k.is_null(),
            HandleRef::Pipeline(k) => k.is_null(),
            HandleRef::DescriptorSet(k) => k.is_null(),
        }
    }

    /// Raw 64-bit value (index in the low half, generation in the high half)
    pub fn raw(&self) -> u64 {
        match self {
            HandleRef::Buffer(k) => k.data().as_ffi(),
            HandleRef::BufferView(k) => k.data().as_ffi(),
            HandleRef::Memory(k) => k.data().as_ffi(),
            HandleRef::CommandPool(k) => k.data().as_ffi(),
            HandleRef::CommandBuffer(k) => k.data().as_ffi(),
            HandleRef::Pipeline(k) => k.data().as_ffi(),
            HandleRef::DescriptorSet(k) => k.data().as_ffi(),
        }
    }
}

impl fmt::Display for HandleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0x{:016x}", self.kind().api_name(), self.raw())
    }
}
