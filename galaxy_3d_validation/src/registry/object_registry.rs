/// Registry of live objects
///
/// One slotmap per object kind. Lookups are O(1); a key whose object was
/// destroyed fails to resolve even after its slot is reused.

use std::fmt;
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use slotmap::{Key, SlotMap};
use crate::device::buffer::{
    BufferCreateInfo, BufferUsageFlags2, BufferViewCreateInfo, MemoryAllocateInfo, MemoryRequirements,
};
use crate::device::capabilities::Capabilities;
use crate::device::command::{CommandPoolCreateInfo, GraphicsPipelineDesc, QueueFlags};
use crate::device::descriptor::DescriptorSetLayoutBinding;
use crate::registry::handles::{
    BufferKey, BufferViewKey, CommandBufferKey, CommandPoolKey, DescriptorSetKey, HandleRef,
    MemoryKey, ObjectKind, PipelineKey,
};
use crate::state::{BindingState, CommandBufferState};

/// A handle that does not reference a live object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidHandle {
    pub kind: ObjectKind,
    pub raw: u64,
    /// The null handle, as opposed to a stale or never-issued one
    pub null: bool,
}

impl fmt::Display for InvalidHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null {
            write!(f, "{} is VK_NULL_HANDLE", self.kind.api_name())
        } else {
            write!(f, "Invalid {} Object 0x{:016x}", self.kind.api_name(), self.raw)
        }
    }
}

// ===== RECORDS =====

/// Buffer record: creation attributes and binding state
#[derive(Debug, Clone)]
pub struct BufferRecord {
    pub info: BufferCreateInfo,
    pub requirements: MemoryRequirements,
    pub binding: BindingState,
}

impl BufferRecord {
    pub fn new(info: BufferCreateInfo, capabilities: &Capabilities) -> Self {
        let requirements = buffer_memory_requirements(&info, capabilities);
        Self { info, requirements, binding: BindingState::Unbound }
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }

    pub fn usage(&self) -> BufferUsageFlags2 {
        self.info.effective_usage()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryRecord {
    pub info: MemoryAllocateInfo,
}

impl MemoryRecord {
    pub fn size(&self) -> u64 {
        self.info.size
    }
}

#[derive(Debug, Clone)]
pub struct BufferViewRecord {
    pub info: BufferViewCreateInfo,
}

#[derive(Debug, Clone)]
pub struct CommandPoolRecord {
    pub info: CommandPoolCreateInfo,
    /// Empty when the pool names a queue family that does not exist
    pub queue_flags: QueueFlags,
}

/// Command buffer record; the recording state is shared with the thread
/// that records into it
#[derive(Debug, Clone)]
pub struct CommandBufferRecord {
    pub pool: CommandPoolKey,
    pub queue_flags: QueueFlags,
    pub state: Arc<Mutex<CommandBufferState>>,
}

#[derive(Debug, Clone)]
pub struct PipelineRecord {
    pub desc: GraphicsPipelineDesc,
}

#[derive(Debug, Clone, Default)]
pub struct DescriptorSetRecord {
    pub bindings: Vec<DescriptorSetLayoutBinding>,
    /// Texel buffer views last written, per binding
    pub texel_views: FxHashMap<u32, Vec<BufferViewKey>>,
}

impl DescriptorSetRecord {
    pub fn binding(&self, binding: u32) -> Option<&DescriptorSetLayoutBinding> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    pub fn references_view(&self, view: BufferViewKey) -> bool {
        self.texel_views.values().any(|views| views.contains(&view))
    }
}

// ===== RECORD TRAIT =====

/// A record type stored in the registry under its own key type
pub trait Record: Sized {
    type Key: Key;
    const KIND: ObjectKind;

    fn table(registry: &ObjectRegistry) -> &SlotMap<Self::Key, Self>;
    fn table_mut(registry: &mut ObjectRegistry) -> &mut SlotMap<Self::Key, Self>;
}

macro_rules! impl_record {
    ($record:ty, $key:ty, $kind:expr, $field:ident) => {
        impl Record for $record {
            type Key = $key;
            const KIND: ObjectKind = $kind;

            fn table(registry: &ObjectRegistry) -> &SlotMap<$key, Self> {
                &registry.$field
            }

            fn table_mut(registry: &mut ObjectRegistry) -> &mut SlotMap<$key, Self> {
                &mut registry.$field
            }
        }
    };
}

impl_record!(BufferRecord, BufferKey, ObjectKind::Buffer, buffers);
impl_record!(MemoryRecord, MemoryKey, ObjectKind::Memory, memories);
impl_record!(BufferViewRecord, BufferViewKey, ObjectKind::BufferView, buffer_views);
impl_record!(CommandPoolRecord, CommandPoolKey, ObjectKind::CommandPool, command_pools);
impl_record!(CommandBufferRecord, CommandBufferKey, ObjectKind::CommandBuffer, command_buffers);
impl_record!(PipelineRecord, PipelineKey, ObjectKind::Pipeline, pipelines);
impl_record!(DescriptorSetRecord, DescriptorSetKey, ObjectKind::DescriptorSet, descriptor_sets);

// ===== REGISTRY =====

/// Live objects of every kind
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    buffers: SlotMap<BufferKey, BufferRecord>,
    memories: SlotMap<MemoryKey, MemoryRecord>,
    buffer_views: SlotMap<BufferViewKey, BufferViewRecord>,
    command_pools: SlotMap<CommandPoolKey, CommandPoolRecord>,
    command_buffers: SlotMap<CommandBufferKey, CommandBufferRecord>,
    pipelines: SlotMap<PipelineKey, PipelineRecord>,
    descriptor_sets: SlotMap<DescriptorSetKey, DescriptorSetRecord>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new object and issue its handle
    pub fn register<R: Record>(&mut self, record: R) -> R::Key {
        R::table_mut(self).insert(record)
    }

    /// Resolve a handle
    pub fn lookup<R: Record>(&self, key: R::Key) -> std::result::Result<&R, InvalidHandle> {
        R::table(self).get(key).ok_or_else(|| invalid_handle::<R>(key))
    }

    pub fn lookup_mut<R: Record>(&mut self, key: R::Key) -> std::result::Result<&mut R, InvalidHandle> {
        R::table_mut(self).get_mut(key).ok_or_else(|| invalid_handle::<R>(key))
    }

    /// Remove an object. Destroying a stale handle (double destroy) fails.
    pub fn destroy<R: Record>(&mut self, key: R::Key) -> std::result::Result<R, InvalidHandle> {
        R::table_mut(self).remove(key).ok_or_else(|| invalid_handle::<R>(key))
    }

    /// Whether a handle of any kind references a live object
    pub fn contains(&self, handle: HandleRef) -> bool {
        match handle {
            HandleRef::Buffer(k) => self.buffers.contains_key(k),
            HandleRef::BufferView(k) => self.buffer_views.contains_key(k),
            HandleRef::Memory(k) => self.memories.contains_key(k),
            HandleRef::CommandPool(k) => self.command_pools.contains_key(k),
            HandleRef::CommandBuffer(k) => self.command_buffers.contains_key(k),
            HandleRef::Pipeline(k) => self.pipelines.contains_key(k),
            HandleRef::DescriptorSet(k) => self.descriptor_sets.contains_key(k),
        }
    }

    /// Number of live objects of a kind
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Buffer => self.buffers.len(),
            ObjectKind::BufferView => self.buffer_views.len(),
            ObjectKind::Memory => self.memories.len(),
            ObjectKind::CommandPool => self.command_pools.len(),
            ObjectKind::CommandBuffer => self.command_buffers.len(),
            ObjectKind::Pipeline => self.pipelines.len(),
            ObjectKind::DescriptorSet => self.descriptor_sets.len(),
        }
    }

    // ===== TYPED SHORTCUTS =====

    pub fn buffer(&self, key: BufferKey) -> Option<&BufferRecord> {
        self.buffers.get(key)
    }

    pub fn memory(&self, key: MemoryKey) -> Option<&MemoryRecord> {
        self.memories.get(key)
    }

    pub fn buffer_view(&self, key: BufferViewKey) -> Option<&BufferViewRecord> {
        self.buffer_views.get(key)
    }

    pub fn command_buffer(&self, key: CommandBufferKey) -> Option<&CommandBufferRecord> {
        self.command_buffers.get(key)
    }

    pub fn pipeline(&self, key: PipelineKey) -> Option<&PipelineRecord> {
        self.pipelines.get(key)
    }

    pub fn descriptor_set(&self, key: DescriptorSetKey) -> Option<&DescriptorSetRecord> {
        self.descriptor_sets.get(key)
    }

    pub fn command_buffers(&self) -> impl Iterator<Item = (CommandBufferKey, &CommandBufferRecord)> {
        self.command_buffers.iter()
    }

    pub fn descriptor_sets(&self) -> impl Iterator<Item = (DescriptorSetKey, &DescriptorSetRecord)> {
        self.descriptor_sets.iter()
    }

    /// Live memory a buffer is bound to, with the binding offset.
    /// `None` when unbound or when the memory was freed.
    pub fn bound_memory(&self, buffer: &BufferRecord) -> Option<(MemoryKey, u64, &MemoryRecord)> {
        match buffer.binding {
            BindingState::Bound { memory, offset } => {
                self.memories.get(memory).map(|record| (memory, offset, record))
            }
            BindingState::Unbound => None,
        }
    }

    /// Whether a buffer was bound to memory that has since been freed
    pub fn bound_to_freed_memory(&self, buffer: &BufferRecord) -> bool {
        match buffer.binding {
            BindingState::Bound { memory, .. } => !self.memories.contains_key(memory),
            BindingState::Unbound => false,
        }
    }
}

fn invalid_handle<R: Record>(key: R::Key) -> InvalidHandle {
    InvalidHandle {
        kind: R::KIND,
        raw: key.data().as_ffi(),
        null: key.is_null(),
    }
}

/// Memory requirements of a buffer: the strictest alignment among the
/// device base alignment and the offset alignments of its usages, and the
/// size rounded up to it
pub fn buffer_memory_requirements(info: &BufferCreateInfo, capabilities: &Capabilities) -> MemoryRequirements {
    let limits = &capabilities.limits;
    let usage = info.effective_usage();

    let mut alignment = limits.buffer_memory_alignment.max(1);
    if usage.intersects(BufferUsageFlags2::UNIFORM_TEXEL_BUFFER | BufferUsageFlags2::STORAGE_TEXEL_BUFFER) {
        alignment = alignment.max(limits.min_texel_buffer_offset_alignment);
    }
    if usage.contains(BufferUsageFlags2::UNIFORM_BUFFER) {
        alignment = alignment.max(limits.min_uniform_buffer_offset_alignment);
    }
    if usage.contains(BufferUsageFlags2::STORAGE_BUFFER) {
        alignment = alignment.max(limits.min_storage_buffer_offset_alignment);
    }

    let size = info.size.checked_next_multiple_of(alignment).unwrap_or(info.size);
    MemoryRequirements { size, alignment }
}

#[cfg(test)]
#[path = "object_registry_tests.rs"]
mod tests;
