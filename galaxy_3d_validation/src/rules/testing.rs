//! Shared fixture for rule family unit tests
//!
//! Builds an `Env` over a registry populated by hand, without a layer or a
//! device, so checks can be exercised one at a time.

use crate::config::LayerConfig;
use crate::device::buffer::{BufferCreateInfo, BufferUsageFlags, MemoryAllocateInfo};
use crate::device::capabilities::{Capabilities, DeviceFeatures};
use crate::device::command::QueueFlags;
use crate::dispatch::CallShape;
use crate::registry::{BufferKey, BufferRecord, MemoryKey, MemoryRecord, ObjectRegistry};
use crate::rules::rule::{Env, Operands, Rule};
use crate::state::{BindingState, CommandBufferState};

pub(crate) struct RuleFixture {
    pub capabilities: Capabilities,
    pub config: LayerConfig,
    pub registry: ObjectRegistry,
    pub state: CommandBufferState,
    pub queue_flags: QueueFlags,
}

impl RuleFixture {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_features(features: DeviceFeatures) -> Self {
        Self::with_capabilities(Capabilities::default().with_features(features))
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        let mut state = CommandBufferState::new();
        state.begin(std::thread::current().id());
        Self {
            capabilities,
            config: LayerConfig::silent(),
            registry: ObjectRegistry::new(),
            state,
            queue_flags: QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
        }
    }

    pub fn memory(&mut self, size: u64) -> MemoryKey {
        self.registry.register(MemoryRecord {
            info: MemoryAllocateInfo { size, memory_type_index: 0 },
        })
    }

    pub fn unbound_buffer(&mut self, info: BufferCreateInfo) -> BufferKey {
        let record = BufferRecord::new(info, &self.capabilities);
        self.registry.register(record)
    }

    /// Buffer bound at offset 0 to its own allocation
    pub fn buffer(&mut self, size: u64, usage: BufferUsageFlags) -> BufferKey {
        self.buffer_from(BufferCreateInfo::new(size, usage))
    }

    pub fn buffer_from(&mut self, info: BufferCreateInfo) -> BufferKey {
        let buffer = self.unbound_buffer(info);
        let required = self.registry.buffer(buffer).map(|b| b.requirements.size).unwrap_or(0);
        let memory = self.memory(required.max(1));
        self.bind(buffer, memory, 0);
        buffer
    }

    pub fn bind(&mut self, buffer: BufferKey, memory: MemoryKey, offset: u64) {
        self.registry.lookup_mut::<BufferRecord>(buffer).unwrap().binding =
            BindingState::Bound { memory, offset };
    }

    /// Environment in which every operand resolved
    pub fn env(&self, shape: CallShape) -> Env<'_> {
        Env {
            shape,
            capabilities: &self.capabilities,
            config: &self.config,
            registry: &self.registry,
            command_buffer: Some(&self.state),
            queue_flags: Some(self.queue_flags),
            thread: std::thread::current().id(),
            resolved: Operands::all(),
        }
    }
}

/// Run one typed check and collect its messages
pub(crate) fn messages<A: ?Sized>(check: fn(&A, &Env<'_>, &mut Vec<String>), args: &A, env: &Env<'_>) -> Vec<String> {
    let mut out = Vec::new();
    check(args, env, &mut out);
    out
}

/// Every rule of a family reads arguments its shape provides, and no id
/// is registered twice for the same shape
pub(crate) fn assert_well_formed(rules: &[Rule]) {
    for (i, rule) in rules.iter().enumerate() {
        assert!(rule.check.accepts(rule.shape), "{} cannot read {:?}", rule.id, rule.shape);
        for other in &rules[i + 1..] {
            assert!(
                !(other.id == rule.id && other.shape == rule.shape),
                "{} registered twice for {:?}",
                rule.id,
                rule.shape
            );
        }
    }
}
