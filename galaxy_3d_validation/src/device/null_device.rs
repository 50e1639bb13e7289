/// In-memory device
///
/// Memory allocations are byte arrays. Recorded transfer commands are
/// executed on submit with clamped arithmetic: a command that would reach
/// outside its buffer or its allocation only touches the bytes that exist.

use std::ops::Range;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::{layer_bail, layer_trace};
use crate::device::buffer::{BufferCreateInfo, MemoryAllocateInfo};
use crate::device::command::{BindBufferMemoryInfo, CopyBufferInfo, FillBufferInfo, RecordedCommand, UpdateBufferInfo};
use crate::device::forwarding::Device;
use crate::registry::{BufferKey, CommandBufferKey, MemoryKey};

const SOURCE: &str = "galaxy3d::validation::NullDevice";

/// Largest single allocation the null device accepts (256 MiB)
pub const DEFAULT_MAX_ALLOCATION_SIZE: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
struct NullBuffer {
    size: u64,
    binding: Option<(MemoryKey, u64)>,
}

/// Device that simulates memory on the host
#[derive(Debug)]
pub struct NullDevice {
    memories: FxHashMap<MemoryKey, Vec<u8>>,
    buffers: FxHashMap<BufferKey, NullBuffer>,
    recordings: FxHashMap<CommandBufferKey, Vec<RecordedCommand>>,
    submitted_command_buffers: u64,
    max_allocation_size: u64,
}

impl Default for NullDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl NullDevice {
    pub fn new() -> Self {
        Self {
            memories: FxHashMap::default(),
            buffers: FxHashMap::default(),
            recordings: FxHashMap::default(),
            submitted_command_buffers: 0,
            max_allocation_size: DEFAULT_MAX_ALLOCATION_SIZE,
        }
    }

    pub fn with_max_allocation_size(mut self, max_allocation_size: u64) -> Self {
        self.max_allocation_size = max_allocation_size;
        self
    }

    /// Contents of a bound buffer (clamped to its allocation)
    pub fn read_buffer(&self, buffer: BufferKey) -> Option<Vec<u8>> {
        let size = self.buffers.get(&buffer)?.size;
        let (memory, range) = self.span(buffer, 0, size)?;
        self.memories.get(&memory).map(|bytes| bytes[range].to_vec())
    }

    /// Commands recorded since the last begin
    pub fn recorded_commands(&self, command_buffer: CommandBufferKey) -> &[RecordedCommand] {
        self.recordings.get(&command_buffer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of command buffers executed so far
    pub fn submitted_command_buffers(&self) -> u64 {
        self.submitted_command_buffers
    }

    pub fn live_allocations(&self) -> usize {
        self.memories.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Byte range of `[offset, offset + len)` of a buffer inside its memory,
    /// clamped to both the buffer and the allocation
    fn span(&self, buffer: BufferKey, offset: u64, len: u64) -> Option<(MemoryKey, Range<usize>)> {
        let record = self.buffers.get(&buffer)?;
        let (memory, base) = record.binding?;
        let bytes = self.memories.get(&memory)?;

        let len = len.min(record.size.saturating_sub(offset));
        let start = base.saturating_add(offset);
        let end = start.saturating_add(len).min(bytes.len() as u64);
        if start >= end {
            return None;
        }
        Some((memory, start as usize..end as usize))
    }

    fn write(&mut self, memory: MemoryKey, range: Range<usize>, source: &[u8]) {
        if let Some(bytes) = self.memories.get_mut(&memory) {
            let target = &mut bytes[range];
            let count = target.len().min(source.len());
            target[..count].copy_from_slice(&source[..count]);
        }
    }

    fn execute_copy(&mut self, info: &CopyBufferInfo) {
        for region in &info.regions {
            let Some((src_memory, src_range)) = self.span(info.src_buffer, region.src_offset, region.size) else {
                continue;
            };
            let Some((dst_memory, dst_range)) = self.span(info.dst_buffer, region.dst_offset, region.size) else {
                continue;
            };
            let staged = match self.memories.get(&src_memory) {
                Some(bytes) => bytes[src_range].to_vec(),
                None => continue,
            };
            self.write(dst_memory, dst_range, &staged);
        }
    }

    fn execute_fill(&mut self, info: &FillBufferInfo) {
        let Some(buffer_size) = self.buffers.get(&info.dst_buffer).map(|b| b.size) else {
            return;
        };
        // The whole-size form fills the largest multiple of 4 that fits
        let size = info.size.resolve(buffer_size, info.dst_offset) & !3;
        let Some((memory, range)) = self.span(info.dst_buffer, info.dst_offset, size) else {
            return;
        };
        let pattern = bytemuck::bytes_of(&info.data);
        let filled: Vec<u8> = pattern.iter().copied().cycle().take(range.len()).collect();
        self.write(memory, range, &filled);
    }

    fn execute_update(&mut self, info: &UpdateBufferInfo) {
        let len = info.data_size.min(info.data.len() as u64);
        if let Some((memory, range)) = self.span(info.dst_buffer, info.dst_offset, len) {
            self.write(memory, range, &info.data);
        }
    }
}

impl Device for NullDevice {
    fn create_buffer(&mut self, buffer: BufferKey, info: &BufferCreateInfo) -> Result<()> {
        self.buffers.insert(buffer, NullBuffer { size: info.size, binding: None });
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferKey) -> Result<()> {
        self.buffers.remove(&buffer);
        Ok(())
    }

    fn allocate_memory(&mut self, memory: MemoryKey, info: &MemoryAllocateInfo) -> Result<()> {
        if info.size > self.max_allocation_size {
            layer_bail!(BackendError, SOURCE,
                "Out of device memory: {} bytes requested, {} bytes max", info.size, self.max_allocation_size);
        }
        self.memories.insert(memory, vec![0u8; info.size as usize]);
        Ok(())
    }

    fn free_memory(&mut self, memory: MemoryKey) -> Result<()> {
        self.memories.remove(&memory);
        Ok(())
    }

    fn bind_buffer_memory(&mut self, info: &BindBufferMemoryInfo) -> Result<()> {
        if let Some(buffer) = self.buffers.get_mut(&info.buffer) {
            buffer.binding = Some((info.memory, info.memory_offset));
        }
        Ok(())
    }

    fn begin_command_buffer(&mut self, command_buffer: CommandBufferKey) -> Result<()> {
        self.recordings.insert(command_buffer, Vec::new());
        Ok(())
    }

    fn free_command_buffer(&mut self, command_buffer: CommandBufferKey) -> Result<()> {
        self.recordings.remove(&command_buffer);
        Ok(())
    }

    fn record(&mut self, command_buffer: CommandBufferKey, command: RecordedCommand) -> Result<()> {
        self.recordings.entry(command_buffer).or_default().push(command);
        Ok(())
    }

    fn submit(&mut self, command_buffers: &[CommandBufferKey]) -> Result<()> {
        for command_buffer in command_buffers {
            let commands = self.recordings.get(command_buffer).cloned().unwrap_or_default();
            layer_trace!(SOURCE, "Executing {} command(s) of {:?}", commands.len(), command_buffer);
            for command in &commands {
                match command {
                    RecordedCommand::CopyBuffer(info) => self.execute_copy(info),
                    RecordedCommand::FillBuffer(info) => self.execute_fill(info),
                    RecordedCommand::UpdateBuffer(info) => self.execute_update(info),
                    _ => {}
                }
            }
            self.submitted_command_buffers += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "null_device_tests.rs"]
mod tests;
