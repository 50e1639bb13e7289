/// Arguments of recorded commands and of queue/pool calls

use bitflags::bitflags;
use crate::device::buffer::{BufferRange, IndexType};
use crate::registry::{BufferKey, DescriptorSetKey, MemoryKey, PipelineKey};

bitflags! {
    /// Operations a queue family supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QueueFlags: u32 {
        const GRAPHICS = 0x1;
        const COMPUTE = 0x2;
        const TRANSFER = 0x4;
        const SPARSE_BINDING = 0x8;
    }
}

/// One region of a buffer-to-buffer copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

impl BufferCopy {
    pub fn new(src_offset: u64, dst_offset: u64, size: u64) -> Self {
        Self { src_offset, dst_offset, size }
    }
}

/// Arguments of `cmd_copy_buffer` / `cmd_copy_buffer2`
#[derive(Debug, Clone, PartialEq)]
pub struct CopyBufferInfo {
    pub src_buffer: BufferKey,
    pub dst_buffer: BufferKey,
    pub regions: Vec<BufferCopy>,
}

/// Arguments of `cmd_fill_buffer`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillBufferInfo {
    pub dst_buffer: BufferKey,
    pub dst_offset: u64,
    pub size: BufferRange,
    /// 4-byte pattern repeated over the range
    pub data: u32,
}

/// Arguments of `cmd_update_buffer`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBufferInfo {
    pub dst_buffer: BufferKey,
    pub dst_offset: u64,
    /// Declared size; the device never reads past `data.len()`
    pub data_size: u64,
    pub data: Vec<u8>,
}

impl UpdateBufferInfo {
    /// Update whose declared size is the length of `data`
    pub fn new(dst_buffer: BufferKey, dst_offset: u64, data: Vec<u8>) -> Self {
        Self { dst_buffer, dst_offset, data_size: data.len() as u64, data }
    }

    /// Override the declared size
    pub fn with_data_size(mut self, data_size: u64) -> Self {
        self.data_size = data_size;
        self
    }
}

/// Arguments of `cmd_bind_index_buffer` / `cmd_bind_index_buffer2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindIndexBufferInfo {
    pub buffer: BufferKey,
    pub offset: u64,
    /// Only the sized variant carries a size
    pub size: Option<BufferRange>,
    pub index_type: IndexType,
}

/// One vertex buffer binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferBinding {
    pub buffer: BufferKey,
    pub offset: u64,
}

/// Arguments of `cmd_bind_vertex_buffers`
#[derive(Debug, Clone, PartialEq)]
pub struct BindVertexBuffersInfo {
    pub first_binding: u32,
    pub bindings: Vec<VertexBufferBinding>,
}

/// Arguments of `cmd_begin_conditional_rendering`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionalRenderingBeginInfo {
    pub buffer: BufferKey,
    pub offset: u64,
    pub inverted: bool,
}

/// Arguments of `cmd_draw`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawInfo {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Arguments of `bind_buffer_memory`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindBufferMemoryInfo {
    pub buffer: BufferKey,
    pub memory: MemoryKey,
    pub memory_offset: u64,
}

/// Arguments of `create_command_pool`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPoolCreateInfo {
    pub queue_family_index: u32,
}

/// Graphics pipeline description: only what draw validation consumes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphicsPipelineDesc {
    /// Vertex input binding slots the pipeline reads
    pub vertex_bindings: Vec<u32>,
}

/// A command as recorded into a command buffer and forwarded to the device
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    CopyBuffer(CopyBufferInfo),
    FillBuffer(FillBufferInfo),
    UpdateBuffer(UpdateBufferInfo),
    BindIndexBuffer(BindIndexBufferInfo),
    BindVertexBuffers(BindVertexBuffersInfo),
    BindDescriptorSet(DescriptorSetKey),
    BindPipeline(PipelineKey),
    Draw(DrawInfo),
    BeginRenderPass,
    EndRenderPass,
    BeginConditionalRendering(ConditionalRenderingBeginInfo),
    EndConditionalRendering,
}
