/// Call shapes and typed call arguments

use crate::device::buffer::{BufferCreateInfo, BufferViewCreateInfo, MemoryAllocateInfo};
use crate::device::command::{
    BindBufferMemoryInfo, BindIndexBufferInfo, BindVertexBuffersInfo, CommandPoolCreateInfo,
    ConditionalRenderingBeginInfo, CopyBufferInfo, DrawInfo, FillBufferInfo, GraphicsPipelineDesc,
    QueueFlags, UpdateBufferInfo,
};
use crate::device::descriptor::{DescriptorSetLayoutBinding, WriteDescriptorSet};
use crate::registry::{
    BufferKey, BufferViewKey, CommandBufferKey, CommandPoolKey, DescriptorSetKey, HandleRef,
    MemoryKey, PipelineKey,
};
use crate::rules::{Operand, Operands};

/// Kind of an intercepted call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    CreateBuffer,
    DestroyBuffer,
    AllocateMemory,
    FreeMemory,
    BindBufferMemory,
    GetBufferMemoryRequirements,
    CreateBufferView,
    DestroyBufferView,
    CreateDescriptorSet,
    UpdateDescriptorSets,
    CreateCommandPool,
    AllocateCommandBuffer,
    FreeCommandBuffer,
    CreateGraphicsPipeline,
    DestroyPipeline,
    BeginCommandBuffer,
    EndCommandBuffer,
    QueueSubmit,
    CmdCopyBuffer,
    CmdCopyBuffer2,
    CmdFillBuffer,
    CmdUpdateBuffer,
    CmdBindIndexBuffer,
    CmdBindIndexBuffer2,
    CmdBindVertexBuffers,
    CmdBindDescriptorSet,
    CmdBindPipeline,
    CmdDraw,
    CmdBeginRenderPass,
    CmdEndRenderPass,
    CmdBeginConditionalRendering,
    CmdEndConditionalRendering,
}

/// Rule ids shared by every recorded command of one shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandIds {
    pub parameter: &'static str,
    pub recording: &'static str,
    pub cmdpool: &'static str,
}

macro_rules! command_ids {
    ($prefix:literal) => {
        Some(CommandIds {
            parameter: concat!("VUID-", $prefix, "-commandBuffer-parameter"),
            recording: concat!("VUID-", $prefix, "-commandBuffer-recording"),
            cmdpool: concat!("VUID-", $prefix, "-commandBuffer-cmdpool"),
        })
    };
}

impl CallShape {
    pub const ALL: [CallShape; 32] = [
        CallShape::CreateBuffer,
        CallShape::DestroyBuffer,
        CallShape::AllocateMemory,
        CallShape::FreeMemory,
        CallShape::BindBufferMemory,
        CallShape::GetBufferMemoryRequirements,
        CallShape::CreateBufferView,
        CallShape::DestroyBufferView,
        CallShape::CreateDescriptorSet,
        CallShape::UpdateDescriptorSets,
        CallShape::CreateCommandPool,
        CallShape::AllocateCommandBuffer,
        CallShape::FreeCommandBuffer,
        CallShape::CreateGraphicsPipeline,
        CallShape::DestroyPipeline,
        CallShape::BeginCommandBuffer,
        CallShape::EndCommandBuffer,
        CallShape::QueueSubmit,
        CallShape::CmdCopyBuffer,
        CallShape::CmdCopyBuffer2,
        CallShape::CmdFillBuffer,
        CallShape::CmdUpdateBuffer,
        CallShape::CmdBindIndexBuffer,
        CallShape::CmdBindIndexBuffer2,
        CallShape::CmdBindVertexBuffers,
        CallShape::CmdBindDescriptorSet,
        CallShape::CmdBindPipeline,
        CallShape::CmdDraw,
        CallShape::CmdBeginRenderPass,
        CallShape::CmdEndRenderPass,
        CallShape::CmdBeginConditionalRendering,
        CallShape::CmdEndConditionalRendering,
    ];

    /// API entry point name
    pub fn name(&self) -> &'static str {
        match self {
            CallShape::CreateBuffer => "vkCreateBuffer",
            CallShape::DestroyBuffer => "vkDestroyBuffer",
            CallShape::AllocateMemory => "vkAllocateMemory",
            CallShape::FreeMemory => "vkFreeMemory",
            CallShape::BindBufferMemory => "vkBindBufferMemory",
            CallShape::GetBufferMemoryRequirements => "vkGetBufferMemoryRequirements",
            CallShape::CreateBufferView => "vkCreateBufferView",
            CallShape::DestroyBufferView => "vkDestroyBufferView",
            CallShape::CreateDescriptorSet => "vkAllocateDescriptorSets",
            CallShape::UpdateDescriptorSets => "vkUpdateDescriptorSets",
            CallShape::CreateCommandPool => "vkCreateCommandPool",
            CallShape::AllocateCommandBuffer => "vkAllocateCommandBuffers",
            CallShape::FreeCommandBuffer => "vkFreeCommandBuffers",
            CallShape::CreateGraphicsPipeline => "vkCreateGraphicsPipelines",
            CallShape::DestroyPipeline => "vkDestroyPipeline",
            CallShape::BeginCommandBuffer => "vkBeginCommandBuffer",
            CallShape::EndCommandBuffer => "vkEndCommandBuffer",
            CallShape::QueueSubmit => "vkQueueSubmit",
            CallShape::CmdCopyBuffer => "vkCmdCopyBuffer",
            CallShape::CmdCopyBuffer2 => "vkCmdCopyBuffer2",
            CallShape::CmdFillBuffer => "vkCmdFillBuffer",
            CallShape::CmdUpdateBuffer => "vkCmdUpdateBuffer",
            CallShape::CmdBindIndexBuffer => "vkCmdBindIndexBuffer",
            CallShape::CmdBindIndexBuffer2 => "vkCmdBindIndexBuffer2KHR",
            CallShape::CmdBindVertexBuffers => "vkCmdBindVertexBuffers",
            CallShape::CmdBindDescriptorSet => "vkCmdBindDescriptorSets",
            CallShape::CmdBindPipeline => "vkCmdBindPipeline",
            CallShape::CmdDraw => "vkCmdDraw",
            CallShape::CmdBeginRenderPass => "vkCmdBeginRenderPass",
            CallShape::CmdEndRenderPass => "vkCmdEndRenderPass",
            CallShape::CmdBeginConditionalRendering => "vkCmdBeginConditionalRenderingEXT",
            CallShape::CmdEndConditionalRendering => "vkCmdEndConditionalRenderingEXT",
        }
    }

    /// Common rule ids of a recorded command; `None` for every other shape
    pub fn command_ids(&self) -> Option<CommandIds> {
        match self {
            CallShape::CmdCopyBuffer => command_ids!("vkCmdCopyBuffer"),
            CallShape::CmdCopyBuffer2 => command_ids!("vkCmdCopyBuffer2"),
            CallShape::CmdFillBuffer => command_ids!("vkCmdFillBuffer"),
            CallShape::CmdUpdateBuffer => command_ids!("vkCmdUpdateBuffer"),
            CallShape::CmdBindIndexBuffer => command_ids!("vkCmdBindIndexBuffer"),
            CallShape::CmdBindIndexBuffer2 => command_ids!("vkCmdBindIndexBuffer2KHR"),
            CallShape::CmdBindVertexBuffers => command_ids!("vkCmdBindVertexBuffers"),
            CallShape::CmdBindDescriptorSet => command_ids!("vkCmdBindDescriptorSets"),
            CallShape::CmdBindPipeline => command_ids!("vkCmdBindPipeline"),
            CallShape::CmdDraw => command_ids!("vkCmdDraw"),
            CallShape::CmdBeginRenderPass => command_ids!("vkCmdBeginRenderPass"),
            CallShape::CmdEndRenderPass => command_ids!("vkCmdEndRenderPass"),
            CallShape::CmdBeginConditionalRendering => command_ids!("vkCmdBeginConditionalRenderingEXT"),
            CallShape::CmdEndConditionalRendering => command_ids!("vkCmdEndConditionalRenderingEXT"),
            _ => None,
        }
    }

    /// Whether this shape records into a command buffer
    pub fn is_recorded_command(&self) -> bool {
        self.command_ids().is_some()
    }

    /// Queue capabilities of which the command pool must support at least one
    pub fn required_queue(&self) -> QueueFlags {
        match self {
            CallShape::CmdCopyBuffer
            | CallShape::CmdCopyBuffer2
            | CallShape::CmdFillBuffer
            | CallShape::CmdUpdateBuffer => QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
            CallShape::CmdBindDescriptorSet | CallShape::CmdBindPipeline => {
                QueueFlags::GRAPHICS | QueueFlags::COMPUTE
            }
            _ => QueueFlags::GRAPHICS,
        }
    }
}

/// One intercepted call with borrowed, typed arguments
#[derive(Debug, Clone, Copy)]
pub enum Call<'a> {
    CreateBuffer(&'a BufferCreateInfo),
    DestroyBuffer(BufferKey),
    AllocateMemory(&'a MemoryAllocateInfo),
    FreeMemory(MemoryKey),
    BindBufferMemory(&'a BindBufferMemoryInfo),
    GetBufferMemoryRequirements(BufferKey),
    CreateBufferView(&'a BufferViewCreateInfo),
    DestroyBufferView(BufferViewKey),
    CreateDescriptorSet(&'a [DescriptorSetLayoutBinding]),
    UpdateDescriptorSets(&'a [WriteDescriptorSet]),
    CreateCommandPool(&'a CommandPoolCreateInfo),
    AllocateCommandBuffer(CommandPoolKey),
    FreeCommandBuffer(CommandBufferKey),
    CreateGraphicsPipeline(&'a GraphicsPipelineDesc),
    DestroyPipeline(PipelineKey),
    BeginCommandBuffer(CommandBufferKey),
    EndCommandBuffer(CommandBufferKey),
    QueueSubmit(&'a [CommandBufferKey]),
    CmdCopyBuffer(CommandBufferKey, &'a CopyBufferInfo),
    CmdCopyBuffer2(CommandBufferKey, &'a CopyBufferInfo),
    CmdFillBuffer(CommandBufferKey, &'a FillBufferInfo),
    CmdUpdateBuffer(CommandBufferKey, &'a UpdateBufferInfo),
    CmdBindIndexBuffer(CommandBufferKey, &'a BindIndexBufferInfo),
    CmdBindIndexBuffer2(CommandBufferKey, &'a BindIndexBufferInfo),
    CmdBindVertexBuffers(CommandBufferKey, &'a BindVertexBuffersInfo),
    CmdBindDescriptorSet(CommandBufferKey, DescriptorSetKey),
    CmdBindPipeline(CommandBufferKey, PipelineKey),
    CmdDraw(CommandBufferKey, &'a DrawInfo),
    CmdBeginRenderPass(CommandBufferKey),
    CmdEndRenderPass(CommandBufferKey),
    CmdBeginConditionalRendering(CommandBufferKey, &'a ConditionalRenderingBeginInfo),
    CmdEndConditionalRendering(CommandBufferKey),
}

impl<'a> Call<'a> {
    pub fn shape(&self) -> CallShape {
        match self {
            Call::CreateBuffer(_) => CallShape::CreateBuffer,
            Call::DestroyBuffer(_) => CallShape::DestroyBuffer,
            Call::AllocateMemory(_) => CallShape::AllocateMemory,
            Call::FreeMemory(_) => CallShape::FreeMemory,
            Call::BindBufferMemory(_) => CallShape::BindBufferMemory,
            Call::GetBufferMemoryRequirements(_) => CallShape::GetBufferMemoryRequirements,
            Call::CreateBufferView(_) => CallShape::CreateBufferView,
            Call::DestroyBufferView(_) => CallShape::DestroyBufferView,
            Call::CreateDescriptorSet(_) => CallShape::CreateDescriptorSet,
            Call::UpdateDescriptorSets(_) => CallShape::UpdateDescriptorSets,
            Call::CreateCommandPool(_) => CallShape::CreateCommandPool,
            Call::AllocateCommandBuffer(_) => CallShape::AllocateCommandBuffer,
            Call::FreeCommandBuffer(_) => CallShape::FreeCommandBuffer,
            Call::CreateGraphicsPipeline(_) => CallShape::CreateGraphicsPipeline,
            Call::DestroyPipeline(_) => CallShape::DestroyPipeline,
            Call::BeginCommandBuffer(_) => CallShape::BeginCommandBuffer,
            Call::EndCommandBuffer(_) => CallShape::EndCommandBuffer,
            Call::QueueSubmit(_) => CallShape::QueueSubmit,
            Call::CmdCopyBuffer(..) => CallShape::CmdCopyBuffer,
            Call::CmdCopyBuffer2(..) => CallShape::CmdCopyBuffer2,
            Call::CmdFillBuffer(..) => CallShape::CmdFillBuffer,
            Call::CmdUpdateBuffer(..) => CallShape::CmdUpdateBuffer,
            Call::CmdBindIndexBuffer(..) => CallShape::CmdBindIndexBuffer,
            Call::CmdBindIndexBuffer2(..) => CallShape::CmdBindIndexBuffer2,
            Call::CmdBindVertexBuffers(..) => CallShape::CmdBindVertexBuffers,
            Call::CmdBindDescriptorSet(..) => CallShape::CmdBindDescriptorSet,
            Call::CmdBindPipeline(..) => CallShape::CmdBindPipeline,
            Call::CmdDraw(..) => CallShape::CmdDraw,
            Call::CmdBeginRenderPass(_) => CallShape::CmdBeginRenderPass,
            Call::CmdEndRenderPass(_) => CallShape::CmdEndRenderPass,
            Call::CmdBeginConditionalRendering(..) => CallShape::CmdBeginConditionalRendering,
            Call::CmdEndConditionalRendering(_) => CallShape::CmdEndConditionalRendering,
        }
    }

    /// Command buffer the call targets, if any
    pub fn command_buffer(&self) -> Option<CommandBufferKey> {
        match self {
            Call::FreeCommandBuffer(cb)
            | Call::BeginCommandBuffer(cb)
            | Call::EndCommandBuffer(cb)
            | Call::CmdCopyBuffer(cb, _)
            | Call::CmdCopyBuffer2(cb, _)
            | Call::CmdFillBuffer(cb, _)
            | Call::CmdUpdateBuffer(cb, _)
            | Call::CmdBindIndexBuffer(cb, _)
            | Call::CmdBindIndexBuffer2(cb, _)
            | Call::CmdBindVertexBuffers(cb, _)
            | Call::CmdBindDescriptorSet(cb, _)
            | Call::CmdBindPipeline(cb, _)
            | Call::CmdDraw(cb, _)
            | Call::CmdBeginRenderPass(cb)
            | Call::CmdEndRenderPass(cb)
            | Call::CmdBeginConditionalRendering(cb, _)
            | Call::CmdEndConditionalRendering(cb) => Some(*cb),
            _ => None,
        }
    }

    /// Single-handle operands the call carries
    pub fn operands(&self) -> Operands {
        Operand::ALL
            .iter()
            .filter(|op| self.handle(**op).is_some())
            .fold(Operands::empty(), |acc, op| acc | op.flag())
    }

    /// Handle passed for one operand, if the call has that operand
    pub fn handle(&self, operand: Operand) -> Option<HandleRef> {
        if operand == Operand::CommandBuffer {
            return self.command_buffer().map(HandleRef::CommandBuffer);
        }

        match (self, operand) {
            (Call::DestroyBuffer(buffer), Operand::Buffer)
            | (Call::GetBufferMemoryRequirements(buffer), Operand::Buffer) => Some(HandleRef::Buffer(*buffer)),
            (Call::FreeMemory(memory), Operand::Memory) => Some(HandleRef::Memory(*memory)),
            (Call::BindBufferMemory(info), Operand::Buffer) => Some(HandleRef::Buffer(info.buffer)),
            (Call::BindBufferMemory(info), Operand::Memory) => Some(HandleRef::Memory(info.memory)),
            (Call::CreateBufferView(info), Operand::Buffer) => Some(HandleRef::Buffer(info.buffer)),
            (Call::DestroyBufferView(view), Operand::BufferView) => Some(HandleRef::BufferView(*view)),
            (Call::AllocateCommandBuffer(pool), Operand::CommandPool) => Some(HandleRef::CommandPool(*pool)),
            (Call::DestroyPipeline(pipeline), Operand::Pipeline)
            | (Call::CmdBindPipeline(_, pipeline), Operand::Pipeline) => Some(HandleRef::Pipeline(*pipeline)),
            (Call::CmdCopyBuffer(_, info), Operand::SrcBuffer)
            | (Call::CmdCopyBuffer2(_, info), Operand::SrcBuffer) => Some(HandleRef::Buffer(info.src_buffer)),
            (Call::CmdCopyBuffer(_, info), Operand::DstBuffer)
            | (Call::CmdCopyBuffer2(_, info), Operand::DstBuffer) => Some(HandleRef::Buffer(info.dst_buffer)),
            (Call::CmdFillBuffer(_, info), Operand::DstBuffer) => Some(HandleRef::Buffer(info.dst_buffer)),
            (Call::CmdUpdateBuffer(_, info), Operand::DstBuffer) => Some(HandleRef::Buffer(info.dst_buffer)),
            (Call::CmdBindIndexBuffer(_, info), Operand::Buffer)
            | (Call::CmdBindIndexBuffer2(_, info), Operand::Buffer) => Some(HandleRef::Buffer(info.buffer)),
            (Call::CmdBindDescriptorSet(_, set), Operand::DescriptorSet) => Some(HandleRef::DescriptorSet(*set)),
            (Call::CmdBeginConditionalRendering(_, info), Operand::Buffer) => Some(HandleRef::Buffer(info.buffer)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "call_tests.rs"]
mod tests;
