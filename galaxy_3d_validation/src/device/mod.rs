/// Device-facing types: capability table, argument structures and the
/// forwarded implementation

pub mod buffer;
pub mod capabilities;
pub mod command;
pub mod descriptor;
pub mod format;
pub mod forwarding;
pub mod null_device;

pub use buffer::{
    BufferCreateFlags, BufferCreateInfo, BufferRange, BufferUsageFlags, BufferUsageFlags2,
    BufferViewCreateInfo, DedicatedAllocationInfo, IndexType, MemoryAllocateInfo,
    MemoryRequirements, SharingMode,
};
pub use capabilities::{Capabilities, DeviceFeatures, DeviceLimits, TexelBufferAlignment};
pub use command::{
    BindBufferMemoryInfo, BindIndexBufferInfo, BindVertexBuffersInfo, BufferCopy,
    CommandPoolCreateInfo, ConditionalRenderingBeginInfo, CopyBufferInfo, DrawInfo,
    FillBufferInfo, GraphicsPipelineDesc, QueueFlags, RecordedCommand, UpdateBufferInfo,
    VertexBufferBinding,
};
pub use descriptor::{DescriptorSetLayoutBinding, DescriptorType, WriteDescriptorSet};
pub use format::{Format, FormatFeatures};
pub use forwarding::Device;
pub use null_device::NullDevice;
