/// Object registry with generational handles

pub mod handles;
pub mod object_registry;

pub use handles::{
    BufferKey, BufferViewKey, CommandBufferKey, CommandPoolKey, DescriptorSetKey, HandleRef,
    MemoryKey, ObjectKind, PipelineKey,
};
pub use object_registry::{
    buffer_memory_requirements, BufferRecord, BufferViewRecord, CommandBufferRecord,
    CommandPoolRecord, DescriptorSetRecord, InvalidHandle, MemoryRecord, ObjectRegistry,
    PipelineRecord, Record,
};
