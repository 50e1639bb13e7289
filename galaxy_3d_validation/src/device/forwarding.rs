/// The implementation the layer forwards intercepted calls to
///
/// Handles are issued by the layer's registry and passed down unchanged, so
/// an implementation indexes its own objects by the same keys.

use crate::error::Result;
use crate::device::buffer::{BufferCreateInfo, BufferViewCreateInfo, MemoryAllocateInfo};
use crate::device::command::{BindBufferMemoryInfo, RecordedCommand};
use crate::registry::{BufferKey, BufferViewKey, CommandBufferKey, MemoryKey};

/// Device trait for the forwarded implementation
///
/// Methods with no observable effect on a simulated device default to no-ops.
pub trait Device: Send {
    fn create_buffer(&mut self, buffer: BufferKey, info: &BufferCreateInfo) -> Result<()>;

    fn destroy_buffer(&mut self, buffer: BufferKey) -> Result<()>;

    fn allocate_memory(&mut self, memory: MemoryKey, info: &MemoryAllocateInfo) -> Result<()>;

    fn free_memory(&mut self, memory: MemoryKey) -> Result<()>;

    fn bind_buffer_memory(&mut self, info: &BindBufferMemoryInfo) -> Result<()>;

    fn create_buffer_view(&mut self, _view: BufferViewKey, _info: &BufferViewCreateInfo) -> Result<()> {
        Ok(())
    }

    fn destroy_buffer_view(&mut self, _view: BufferViewKey) -> Result<()> {
        Ok(())
    }

    /// Start a new recording, discarding previously recorded commands
    fn begin_command_buffer(&mut self, command_buffer: CommandBufferKey) -> Result<()>;

    fn end_command_buffer(&mut self, _command_buffer: CommandBufferKey) -> Result<()> {
        Ok(())
    }

    fn free_command_buffer(&mut self, command_buffer: CommandBufferKey) -> Result<()>;

    /// Append one command to a recording
    fn record(&mut self, command_buffer: CommandBufferKey, command: RecordedCommand) -> Result<()>;

    /// Execute the recorded commands of each command buffer, in order
    fn submit(&mut self, command_buffers: &[CommandBufferKey]) -> Result<()>;
}
