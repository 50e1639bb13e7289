/// Buffer-related argument types: usage flags, create infos, view infos

use bitflags::bitflags;
use crate::device::format::Format;
use crate::registry::BufferKey;

bitflags! {
    /// Legacy 32-bit buffer usage flags
    ///
    /// Unknown bits are retained (`from_bits_retain`) so that creation
    /// rules can report them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsageFlags: u32 {
        const TRANSFER_SRC = 0x0000_0001;
        const TRANSFER_DST = 0x0000_0002;
        const UNIFORM_TEXEL_BUFFER = 0x0000_0004;
        const STORAGE_TEXEL_BUFFER = 0x0000_0008;
        const UNIFORM_BUFFER = 0x0000_0010;
        const STORAGE_BUFFER = 0x0000_0020;
        const INDEX_BUFFER = 0x0000_0040;
        const VERTEX_BUFFER = 0x0000_0080;
        const INDIRECT_BUFFER = 0x0000_0100;
        const CONDITIONAL_RENDERING = 0x0000_0200;
        const SHADER_DEVICE_ADDRESS = 0x0002_0000;
    }
}

bitflags! {
    /// Extended 64-bit buffer usage flags, supplied through the optional
    /// `usage2` sidecar of a create info
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsageFlags2: u64 {
        const TRANSFER_SRC = 0x0000_0001;
        const TRANSFER_DST = 0x0000_0002;
        const UNIFORM_TEXEL_BUFFER = 0x0000_0004;
        const STORAGE_TEXEL_BUFFER = 0x0000_0008;
        const UNIFORM_BUFFER = 0x0000_0010;
        const STORAGE_BUFFER = 0x0000_0020;
        const INDEX_BUFFER = 0x0000_0040;
        const VERTEX_BUFFER = 0x0000_0080;
        const INDIRECT_BUFFER = 0x0000_0100;
        const CONDITIONAL_RENDERING = 0x0000_0200;
        const EXECUTION_GRAPH_SCRATCH = 0x0200_0000;
        const SHADER_DEVICE_ADDRESS = 0x0002_0000;
    }
}

impl From<BufferUsageFlags> for BufferUsageFlags2 {
    fn from(usage: BufferUsageFlags) -> Self {
        BufferUsageFlags2::from_bits_retain(usage.bits() as u64)
    }
}

bitflags! {
    /// Buffer creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferCreateFlags: u32 {
        const SPARSE_BINDING = 0x1;
        const SPARSE_RESIDENCY = 0x2;
        const SPARSE_ALIASED = 0x4;
    }
}

/// Queue family sharing mode of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharingMode {
    #[default]
    Exclusive,
    Concurrent,
}

/// Dedicated allocation sidecar of a buffer create info
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedicatedAllocationInfo {
    pub dedicated_allocation: bool,
}

/// Buffer creation arguments
#[derive(Debug, Clone, PartialEq)]
pub struct BufferCreateInfo {
    /// Size in bytes
    pub size: u64,
    /// Legacy usage flags (ignored when `usage2` is present)
    pub usage: BufferUsageFlags,
    pub flags: BufferCreateFlags,
    pub sharing_mode: SharingMode,
    pub queue_family_indices: Vec<u32>,
    /// Optional 64-bit usage sidecar; supersedes `usage` when present
    pub usage2: Option<BufferUsageFlags2>,
    /// Optional dedicated allocation sidecar
    pub dedicated_allocation: Option<DedicatedAllocationInfo>,
}

impl BufferCreateInfo {
    /// Exclusive, non-sparse buffer with the given size and usage
    pub fn new(size: u64, usage: BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            flags: BufferCreateFlags::empty(),
            sharing_mode: SharingMode::Exclusive,
            queue_family_indices: Vec::new(),
            usage2: None,
            dedicated_allocation: None,
        }
    }

    pub fn with_flags(mut self, flags: BufferCreateFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_usage2(mut self, usage2: BufferUsageFlags2) -> Self {
        self.usage2 = Some(usage2);
        self
    }

    pub fn with_dedicated_allocation(mut self, dedicated_allocation: bool) -> Self {
        self.dedicated_allocation = Some(DedicatedAllocationInfo { dedicated_allocation });
        self
    }

    pub fn concurrent(mut self, queue_family_indices: &[u32]) -> Self {
        self.sharing_mode = SharingMode::Concurrent;
        self.queue_family_indices = queue_family_indices.to_vec();
        self
    }

    /// Usage the buffer actually carries: the sidecar when present,
    /// otherwise the legacy flags widened to 64 bits
    pub fn effective_usage(&self) -> BufferUsageFlags2 {
        self.usage2.unwrap_or_else(|| self.usage.into())
    }
}

/// Byte range of a view or a bind: explicit, or the rest of the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRange {
    /// Everything from the offset to the end of the buffer
    Whole,
    Bytes(u64),
}

impl BufferRange {
    /// Resolve against a buffer size; `Whole` yields `size - offset`
    /// (saturating)
    pub fn resolve(&self, buffer_size: u64, offset: u64) -> u64 {
        match self {
            BufferRange::Whole => buffer_size.saturating_sub(offset),
            BufferRange::Bytes(bytes) => *bytes,
        }
    }
}

/// Buffer view creation arguments
#[derive(Debug, Clone, PartialEq)]
pub struct BufferViewCreateInfo {
    pub buffer: BufferKey,
    pub format: Format,
    pub offset: u64,
    pub range: BufferRange,
    /// Optional 64-bit usage sidecar restricting the view's usage
    pub usage2: Option<BufferUsageFlags2>,
}

impl BufferViewCreateInfo {
    pub fn new(buffer: BufferKey, format: Format, offset: u64, range: BufferRange) -> Self {
        Self { buffer, format, offset, range, usage2: None }
    }

    pub fn with_usage2(mut self, usage2: BufferUsageFlags2) -> Self {
        self.usage2 = Some(usage2);
        self
    }
}

/// Memory allocation arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAllocateInfo {
    pub size: u64,
    pub memory_type_index: u32,
}

/// Size and alignment a buffer needs from its memory binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirements {
    pub size: u64,
    pub alignment: u64,
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    Uint8,
    Uint16,
    Uint32,
}

impl IndexType {
    /// Size in bytes of one index
    pub fn size_bytes(&self) -> u64 {
        match self {
            IndexType::Uint8 => 1,
            IndexType::Uint16 => 2,
            IndexType::Uint32 => 4,
        }
    }
}
