/// Rule model
///
/// A rule is data: a stable id, the call shape it examines, the handle
/// operands it needs resolved, and a check. Checks are plain functions over
/// the typed call arguments and an [`Env`] snapshot; they push one message
/// per failure and never mutate anything.

use std::thread::ThreadId;
use bitflags::bitflags;
use crate::config::LayerConfig;
use crate::device::buffer::{BufferCreateInfo, BufferViewCreateInfo, MemoryAllocateInfo};
use crate::device::capabilities::{Capabilities, DeviceFeatures};
use crate::device::command::{
    BindBufferMemoryInfo, BindIndexBufferInfo, BindVertexBuffersInfo, CommandPoolCreateInfo,
    ConditionalRenderingBeginInfo, CopyBufferInfo, FillBufferInfo, GraphicsPipelineDesc, QueueFlags,
    UpdateBufferInfo,
};
use crate::device::descriptor::{DescriptorSetLayoutBinding, WriteDescriptorSet};
use crate::dispatch::{Call, CallShape};
use crate::registry::{BufferKey, BufferRecord, CommandBufferKey, ObjectRegistry};
use crate::report::{Severity, ViolationKind};
use crate::state::CommandBufferState;

/// One handle-valued parameter of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    CommandBuffer,
    /// The single buffer of a call (view, bind, index, conditional rendering)
    Buffer,
    SrcBuffer,
    DstBuffer,
    Memory,
    BufferView,
    CommandPool,
    Pipeline,
    DescriptorSet,
}

impl Operand {
    pub const ALL: [Operand; 9] = [
        Operand::CommandBuffer,
        Operand::Buffer,
        Operand::SrcBuffer,
        Operand::DstBuffer,
        Operand::Memory,
        Operand::BufferView,
        Operand::CommandPool,
        Operand::Pipeline,
        Operand::DescriptorSet,
    ];

    pub fn flag(&self) -> Operands {
        match self {
            Operand::CommandBuffer => Operands::COMMAND_BUFFER,
            Operand::Buffer => Operands::BUFFER,
            Operand::SrcBuffer => Operands::SRC_BUFFER,
            Operand::DstBuffer => Operands::DST_BUFFER,
            Operand::Memory => Operands::MEMORY,
            Operand::BufferView => Operands::BUFFER_VIEW,
            Operand::CommandPool => Operands::COMMAND_POOL,
            Operand::Pipeline => Operands::PIPELINE,
            Operand::DescriptorSet => Operands::DESCRIPTOR_SET,
        }
    }

    /// Parameter name used in messages
    pub fn parameter_name(&self) -> &'static str {
        match self {
            Operand::CommandBuffer => "commandBuffer",
            Operand::Buffer => "buffer",
            Operand::SrcBuffer => "srcBuffer",
            Operand::DstBuffer => "dstBuffer",
            Operand::Memory => "memory",
            Operand::BufferView => "bufferView",
            Operand::CommandPool => "commandPool",
            Operand::Pipeline => "pipeline",
            Operand::DescriptorSet => "descriptorSet",
        }
    }
}

bitflags! {
    /// Set of operands
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Operands: u32 {
        const COMMAND_BUFFER = 1 << 0;
        const BUFFER = 1 << 1;
        const SRC_BUFFER = 1 << 2;
        const DST_BUFFER = 1 << 3;
        const MEMORY = 1 << 4;
        const BUFFER_VIEW = 1 << 5;
        const COMMAND_POOL = 1 << 6;
        const PIPELINE = 1 << 7;
        const DESCRIPTOR_SET = 1 << 8;
    }
}

/// A rule failure before it is attached to a call context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub kind: ViolationKind,
    pub message: String,
}

/// Read-only snapshot a check runs against
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub shape: CallShape,
    pub capabilities: &'a Capabilities,
    pub config: &'a LayerConfig,
    pub registry: &'a ObjectRegistry,
    /// State of the targeted command buffer, when it resolved
    pub command_buffer: Option<&'a CommandBufferState>,
    /// Queue capabilities of the targeted command buffer's pool
    pub queue_flags: Option<QueueFlags>,
    pub thread: ThreadId,
    /// Operands whose handles resolved to live objects
    pub resolved: Operands,
}

impl<'a> Env<'a> {
    pub fn buffer(&self, key: BufferKey) -> Option<&'a BufferRecord> {
        self.registry.buffer(key)
    }

    pub fn features(&self) -> &'a DeviceFeatures {
        &self.capabilities.features
    }

    /// Whether one operand resolved
    pub fn resolved(&self, operand: Operand) -> bool {
        self.resolved.contains(operand.flag())
    }
}

/// Typed check over one argument structure
pub type CheckFn<A> = fn(&A, &Env<'_>, &mut Vec<String>);

/// What a rule checks, tagged by the argument structure it reads
#[derive(Clone, Copy)]
pub enum Check {
    /// Listed operands must not be null
    Required(&'static [Operand]),
    /// The operand must reference a live object; null passes when allowed
    Handle { operand: Operand, allow_null: bool },
    /// Reads only the environment (command buffer state, queue, features)
    Command(fn(&Env<'_>, &mut Vec<String>)),
    CreateBuffer(CheckFn<BufferCreateInfo>),
    AllocateMemory(CheckFn<MemoryAllocateInfo>),
    BindBufferMemory(CheckFn<BindBufferMemoryInfo>),
    CreateBufferView(CheckFn<BufferViewCreateInfo>),
    CreateDescriptorSet(fn(&[DescriptorSetLayoutBinding], &Env<'_>, &mut Vec<String>)),
    UpdateDescriptorSets(fn(&[WriteDescriptorSet], &Env<'_>, &mut Vec<String>)),
    CreateCommandPool(CheckFn<CommandPoolCreateInfo>),
    CreateGraphicsPipeline(CheckFn<GraphicsPipelineDesc>),
    QueueSubmit(fn(&[CommandBufferKey], &Env<'_>, &mut Vec<String>)),
    CopyBuffer(CheckFn<CopyBufferInfo>),
    FillBuffer(CheckFn<FillBufferInfo>),
    UpdateBuffer(CheckFn<UpdateBufferInfo>),
    BindIndexBuffer(CheckFn<BindIndexBufferInfo>),
    BindVertexBuffers(CheckFn<BindVertexBuffersInfo>),
    BeginConditionalRendering(CheckFn<ConditionalRenderingBeginInfo>),
}

impl Check {
    /// Whether this check can read the arguments of a call shape
    pub fn accepts(&self, shape: CallShape) -> bool {
        match self {
            Check::Required(_) | Check::Handle { .. } | Check::Command(_) => true,
            Check::CreateBuffer(_) => shape == CallShape::CreateBuffer,
            Check::AllocateMemory(_) => shape == CallShape::AllocateMemory,
            Check::BindBufferMemory(_) => shape == CallShape::BindBufferMemory,
            Check::CreateBufferView(_) => shape == CallShape::CreateBufferView,
            Check::CreateDescriptorSet(_) => shape == CallShape::CreateDescriptorSet,
            Check::UpdateDescriptorSets(_) => shape == CallShape::UpdateDescriptorSets,
            Check::CreateCommandPool(_) => shape == CallShape::CreateCommandPool,
            Check::CreateGraphicsPipeline(_) => shape == CallShape::CreateGraphicsPipeline,
            Check::QueueSubmit(_) => shape == CallShape::QueueSubmit,
            Check::CopyBuffer(_) => matches!(shape, CallShape::CmdCopyBuffer | CallShape::CmdCopyBuffer2),
            Check::FillBuffer(_) => shape == CallShape::CmdFillBuffer,
            Check::UpdateBuffer(_) => shape == CallShape::CmdUpdateBuffer,
            Check::BindIndexBuffer(_) => {
                matches!(shape, CallShape::CmdBindIndexBuffer | CallShape::CmdBindIndexBuffer2)
            }
            Check::BindVertexBuffers(_) => shape == CallShape::CmdBindVertexBuffers,
            Check::BeginConditionalRendering(_) => shape == CallShape::CmdBeginConditionalRendering,
        }
    }

    /// Whether this is a handle-resolution check
    pub fn is_handle_check(&self) -> bool {
        matches!(self, Check::Required(_) | Check::Handle { .. })
    }

    /// Run a non-handle check against a call
    pub fn run(&self, call: &Call<'_>, env: &Env<'_>, out: &mut Vec<String>) {
        match (self, call) {
            (Check::Command(check), _) => check(env, out),
            (Check::CreateBuffer(check), Call::CreateBuffer(info)) => check(info, env, out),
            (Check::AllocateMemory(check), Call::AllocateMemory(info)) => check(info, env, out),
            (Check::BindBufferMemory(check), Call::BindBufferMemory(info)) => check(info, env, out),
            (Check::CreateBufferView(check), Call::CreateBufferView(info)) => check(info, env, out),
            (Check::CreateDescriptorSet(check), Call::CreateDescriptorSet(bindings)) => check(bindings, env, out),
            (Check::UpdateDescriptorSets(check), Call::UpdateDescriptorSets(writes)) => check(writes, env, out),
            (Check::CreateCommandPool(check), Call::CreateCommandPool(info)) => check(info, env, out),
            (Check::CreateGraphicsPipeline(check), Call::CreateGraphicsPipeline(desc)) => check(desc, env, out),
            (Check::QueueSubmit(check), Call::QueueSubmit(command_buffers)) => check(command_buffers, env, out),
            (Check::CopyBuffer(check), Call::CmdCopyBuffer(_, info) | Call::CmdCopyBuffer2(_, info)) => {
                check(info, env, out)
            }
            (Check::FillBuffer(check), Call::CmdFillBuffer(_, info)) => check(info, env, out),
            (Check::UpdateBuffer(check), Call::CmdUpdateBuffer(_, info)) => check(info, env, out),
            (Check::BindIndexBuffer(check), Call::CmdBindIndexBuffer(_, info) | Call::CmdBindIndexBuffer2(_, info)) => {
                check(info, env, out)
            }
            (Check::BindVertexBuffers(check), Call::CmdBindVertexBuffers(_, info)) => check(info, env, out),
            (Check::BeginConditionalRendering(check), Call::CmdBeginConditionalRendering(_, info)) => {
                check(info, env, out)
            }
            _ => {}
        }
    }
}

/// A named, independently testable precondition
#[derive(Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub shape: CallShape,
    pub kind: ViolationKind,
    pub severity: Severity,
    /// Operands that must resolve for the check to run
    pub needs: Operands,
    pub check: Check,
}

impl Rule {
    /// Error-severity usage rule
    pub fn usage(id: &'static str, shape: CallShape, needs: Operands, check: Check) -> Self {
        Self { id, shape, kind: ViolationKind::UsageViolation, severity: Severity::Error, needs, check }
    }

    /// Error-severity rule for a feature that was not negotiated
    pub fn capability(id: &'static str, shape: CallShape, needs: Operands, check: Check) -> Self {
        Self { id, shape, kind: ViolationKind::CapabilityUnsupported, severity: Severity::Error, needs, check }
    }

    /// Advisory rule, only reported with best practices enabled
    pub fn advisory(id: &'static str, shape: CallShape, needs: Operands, check: Check) -> Self {
        Self { id, shape, kind: ViolationKind::UsageViolation, severity: Severity::Warning, needs, check }
    }

    /// Null-parameter rule
    pub fn required(id: &'static str, shape: CallShape, operands: &'static [Operand]) -> Self {
        Self {
            id,
            shape,
            kind: ViolationKind::InvalidHandle,
            severity: Severity::Error,
            needs: Operands::empty(),
            check: Check::Required(operands),
        }
    }

    /// Stale-or-unknown handle rule; null is left to a required rule
    pub fn handle(id: &'static str, shape: CallShape, operand: Operand) -> Self {
        Self {
            id,
            shape,
            kind: ViolationKind::InvalidHandle,
            severity: Severity::Error,
            needs: Operands::empty(),
            check: Check::Handle { operand, allow_null: true },
        }
    }

    /// Handle rule for operands that have no valid null value
    pub fn valid_handle(id: &'static str, shape: CallShape, operand: Operand) -> Self {
        Self {
            check: Check::Handle { operand, allow_null: false },
            ..Self::handle(id, shape, operand)
        }
    }

    /// Error-severity rule over handle arrays, classed as an invalid handle
    pub fn handle_array(id: &'static str, shape: CallShape, check: Check) -> Self {
        Self {
            kind: ViolationKind::InvalidHandle,
            ..Self::usage(id, shape, Operands::empty(), check)
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("shape", &self.shape)
            .field("kind", &self.kind)
            .field("severity", &self.severity)
            .field("needs", &self.needs)
            .finish()
    }
}
