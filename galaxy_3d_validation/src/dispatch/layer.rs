/// Validation layer
///
/// Public entry points, one per intercepted call. Every call goes through
/// the same pipeline: open a call context, evaluate the catalog under the
/// registry lock, finish the report, then (unless aborted) apply the call
/// to the tracked state and forward it to the device.
///
/// Lock order: registry, then command buffer state, then device.
/// Creation, destruction, binding and submission take the registry write
/// lock; recorded commands only read the registry and lock the state of
/// their own command buffer, so distinct command buffers record in
/// parallel.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use crate::config::LayerConfig;
use crate::device::buffer::{
    BufferCreateInfo, BufferRange, BufferViewCreateInfo, IndexType, MemoryAllocateInfo, MemoryRequirements,
};
use crate::device::capabilities::Capabilities;
use crate::device::command::{
    BindBufferMemoryInfo, BindIndexBufferInfo, BindVertexBuffersInfo, BufferCopy, CommandPoolCreateInfo,
    ConditionalRenderingBeginInfo, CopyBufferInfo, DrawInfo, FillBufferInfo, GraphicsPipelineDesc, QueueFlags,
    RecordedCommand, UpdateBufferInfo, VertexBufferBinding,
};
use crate::device::descriptor::{DescriptorSetLayoutBinding, WriteDescriptorSet};
use crate::device::{Device, NullDevice};
use crate::dispatch::{Call, CallShape, Interceptor, Phase};
use crate::error::{Error, Result};
use crate::registry::{
    BufferKey, BufferRecord, BufferViewKey, BufferViewRecord, CommandBufferKey, CommandBufferRecord,
    CommandPoolKey, CommandPoolRecord, DescriptorSetKey, DescriptorSetRecord, MemoryKey, MemoryRecord,
    ObjectKind, ObjectRegistry, PipelineKey, PipelineRecord,
};
use crate::report::{CallContext, CallReport, DiagnosticReporter, Intercepted, Violation};
use crate::rules::{Env, Finding, Operands, RuleCatalog};
use crate::state::{BindingState, CommandBufferState};
use crate::{layer_debug, layer_info, layer_trace, layer_warn};

const SOURCE: &str = "galaxy3d::validation::Layer";

/// Rule-checking layer in front of a device
pub struct ValidationLayer<D: Device = NullDevice> {
    interceptor: Interceptor,
    capabilities: Arc<Capabilities>,
    config: LayerConfig,
    registry: RwLock<ObjectRegistry>,
    reporter: DiagnosticReporter,
    device: Mutex<D>,
}

impl ValidationLayer<NullDevice> {
    /// Layer over a simulated device
    pub fn with_null_device(capabilities: Capabilities, config: LayerConfig) -> Result<Self> {
        Self::new(capabilities, config, NullDevice::new())
    }
}

impl<D: Device> ValidationLayer<D> {
    /// Create a layer with the standard rule catalog
    ///
    /// # Errors
    ///
    /// `InitializationFailed` when the capability table is inconsistent.
    pub fn new(capabilities: Capabilities, config: LayerConfig, device: D) -> Result<Self> {
        Self::with_catalog(capabilities, config, device, RuleCatalog::standard()?)
    }

    /// Create a layer with a custom catalog
    pub fn with_catalog(capabilities: Capabilities, config: LayerConfig, device: D, catalog: RuleCatalog) -> Result<Self> {
        capabilities.validate()?;

        layer_info!(SOURCE, "Validation layer created ({} rules, {} queue families)",
            catalog.len(), capabilities.queue_families.len());
        layer_debug!(SOURCE, "Features: {:?}", capabilities.features);
        if config.abort_on_violation {
            layer_debug!(SOURCE, "Calls with error violations are aborted");
        }

        Ok(Self {
            interceptor: Interceptor::new(catalog),
            capabilities: Arc::new(capabilities),
            reporter: DiagnosticReporter::new(&config),
            config,
            registry: RwLock::new(ObjectRegistry::new()),
            device: Mutex::new(device),
        })
    }

    // ===== ACCESSORS =====

    pub fn capabilities(&self) -> Arc<Capabilities> {
        Arc::clone(&self.capabilities)
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &RuleCatalog {
        self.interceptor.catalog()
    }

    pub fn reporter(&self) -> &DiagnosticReporter {
        &self.reporter
    }

    /// Drain the violations of the calling thread's most recent call
    pub fn take_for_current_call(&self) -> Vec<Violation> {
        self.reporter.take_for_current_call()
    }

    /// Whether a rule fired for the calling thread's most recent call
    pub fn expect(&self, rule_id: &str) -> bool {
        self.reporter.expect(rule_id)
    }

    /// Whether the calling thread's most recent call was clean
    pub fn is_clean(&self) -> bool {
        self.reporter.is_clean()
    }

    /// Inspect the forwarded device
    pub fn with_device<R>(&self, f: impl FnOnce(&D) -> R) -> Result<R> {
        let device = self.device()?;
        Ok(f(&device))
    }

    /// Number of live objects of a kind
    pub fn live_count(&self, kind: ObjectKind) -> Result<usize> {
        Ok(self.read_registry()?.live_count(kind))
    }

    /// Snapshot of a command buffer's tracked state
    pub fn command_buffer_state(&self, command_buffer: CommandBufferKey) -> Result<Option<CommandBufferState>> {
        let registry = self.read_registry()?;
        let Some(record) = registry.command_buffer(command_buffer) else { return Ok(None) };
        let state = lock_state(record)?;
        Ok(Some(state.clone()))
    }

    // ===== BUFFERS AND MEMORY =====

    pub fn create_buffer(&self, info: &BufferCreateInfo) -> Result<Intercepted<BufferKey>> {
        self.exclusive(Call::CreateBuffer(info), |registry, device| {
            let buffer = registry.register(BufferRecord::new(info.clone(), &self.capabilities));
            if let Err(err) = device.create_buffer(buffer, info) {
                registry.destroy::<BufferRecord>(buffer).ok();
                return Err(err);
            }
            Ok(buffer)
        })
    }

    /// Destroy a buffer; command buffers that recorded it become invalid
    pub fn destroy_buffer(&self, buffer: BufferKey) -> Result<Intercepted<()>> {
        self.exclusive(Call::DestroyBuffer(buffer), |registry, device| {
            if registry.destroy::<BufferRecord>(buffer).is_err() {
                return Ok(());
            }
            let invalidated = invalidate_where(registry, ObjectKind::Buffer, |state| state.references_buffer(buffer))?;
            if invalidated > 0 {
                layer_debug!(SOURCE, "Destroying {:?} invalidated {} command buffer(s)", buffer, invalidated);
            }
            device.destroy_buffer(buffer)
        })
    }

    pub fn allocate_memory(&self, info: &MemoryAllocateInfo) -> Result<Intercepted<MemoryKey>> {
        self.exclusive(Call::AllocateMemory(info), |registry, device| {
            let memory = registry.register(MemoryRecord { info: *info });
            if let Err(err) = device.allocate_memory(memory, info) {
                registry.destroy::<MemoryRecord>(memory).ok();
                return Err(err);
            }
            Ok(memory)
        })
    }

    /// Free memory. Buffers bound to it keep their binding and are
    /// reported as bound to freed memory from then on.
    pub fn free_memory(&self, memory: MemoryKey) -> Result<Intercepted<()>> {
        self.exclusive(Call::FreeMemory(memory), |registry, device| {
            if registry.destroy::<MemoryRecord>(memory).is_err() {
                return Ok(());
            }
            device.free_memory(memory)
        })
    }

    pub fn bind_buffer_memory(&self, buffer: BufferKey, memory: MemoryKey, memory_offset: u64) -> Result<Intercepted<()>> {
        let info = BindBufferMemoryInfo { buffer, memory, memory_offset };
        self.exclusive(Call::BindBufferMemory(&info), |registry, device| {
            if registry.memory(memory).is_none() {
                return Ok(());
            }
            let Ok(record) = registry.lookup_mut::<BufferRecord>(buffer) else { return Ok(()) };
            if record.binding.is_bound() {
                return Ok(());
            }
            record.binding = BindingState::Bound { memory, offset: memory_offset };
            device.bind_buffer_memory(&info)
        })
    }

    pub fn get_buffer_memory_requirements(&self, buffer: BufferKey) -> Result<Intercepted<Option<MemoryRequirements>>> {
        let call = Call::GetBufferMemoryRequirements(buffer);
        let context = self.reporter.begin_call(call.shape(), None);
        let registry = self.read_registry()?;
        let findings = self.evaluate(&call, &registry, None, None);
        let report = self.conclude(context, findings)?;
        let requirements = registry.buffer(buffer).map(|record| record.requirements);
        Ok(Intercepted { output: requirements, report })
    }

    // ===== VIEWS AND DESCRIPTORS =====

    pub fn create_buffer_view(&self, info: &BufferViewCreateInfo) -> Result<Intercepted<BufferViewKey>> {
        self.exclusive(Call::CreateBufferView(info), |registry, device| {
            let view = registry.register(BufferViewRecord { info: info.clone() });
            if let Err(err) = device.create_buffer_view(view, info) {
                registry.destroy::<BufferViewRecord>(view).ok();
                return Err(err);
            }
            Ok(view)
        })
    }

    /// Destroy a view; command buffers that bound a set holding it become
    /// invalid
    pub fn destroy_buffer_view(&self, view: BufferViewKey) -> Result<Intercepted<()>> {
        self.exclusive(Call::DestroyBufferView(view), |registry, device| {
            if registry.destroy::<BufferViewRecord>(view).is_err() {
                return Ok(());
            }
            let sets: Vec<DescriptorSetKey> = registry
                .descriptor_sets()
                .filter(|(_, set)| set.references_view(view))
                .map(|(key, _)| key)
                .collect();
            if !sets.is_empty() {
                invalidate_where(registry, ObjectKind::BufferView, |state| {
                    state.referenced_sets().any(|set| sets.contains(&set))
                })?;
            }
            device.destroy_buffer_view(view)
        })
    }

    pub fn create_descriptor_set(&self, bindings: &[DescriptorSetLayoutBinding]) -> Result<Intercepted<DescriptorSetKey>> {
        self.exclusive(Call::CreateDescriptorSet(bindings), |registry, _| {
            Ok(registry.register(DescriptorSetRecord {
                bindings: bindings.to_vec(),
                ..DescriptorSetRecord::default()
            }))
        })
    }

    pub fn update_descriptor_sets(&self, writes: &[WriteDescriptorSet]) -> Result<Intercepted<()>> {
        self.exclusive(Call::UpdateDescriptorSets(writes), |registry, _| {
            for write in writes.iter().filter(|write| write.descriptor_type.is_texel_buffer()) {
                if let Ok(set) = registry.lookup_mut::<DescriptorSetRecord>(write.dst_set) {
                    set.texel_views.insert(write.dst_binding, write.texel_buffer_views.clone());
                }
            }
            Ok(())
        })
    }

    // ===== COMMAND POOLS AND BUFFERS =====

    pub fn create_command_pool(&self, info: &CommandPoolCreateInfo) -> Result<Intercepted<CommandPoolKey>> {
        self.exclusive(Call::CreateCommandPool(info), |registry, _| {
            let queue_flags = self.capabilities.queue_flags(info.queue_family_index).unwrap_or_else(QueueFlags::empty);
            Ok(registry.register(CommandPoolRecord { info: *info, queue_flags }))
        })
    }

    /// Allocate a command buffer; the null handle is returned when the
    /// pool does not resolve
    pub fn allocate_command_buffer(&self, pool: CommandPoolKey) -> Result<Intercepted<CommandBufferKey>> {
        self.exclusive(Call::AllocateCommandBuffer(pool), |registry, _| {
            let Some(queue_flags) = registry.lookup::<CommandPoolRecord>(pool).ok().map(|record| record.queue_flags) else {
                return Ok(CommandBufferKey::default());
            };
            Ok(registry.register(CommandBufferRecord {
                pool,
                queue_flags,
                state: Arc::new(Mutex::new(CommandBufferState::new())),
            }))
        })
    }

    pub fn free_command_buffer(&self, command_buffer: CommandBufferKey) -> Result<Intercepted<()>> {
        self.exclusive(Call::FreeCommandBuffer(command_buffer), |registry, device| {
            if registry.destroy::<CommandBufferRecord>(command_buffer).is_err() {
                return Ok(());
            }
            device.free_command_buffer(command_buffer)
        })
    }

    /// Begin recording; an executable or invalid command buffer is reset
    pub fn begin_command_buffer(&self, command_buffer: CommandBufferKey) -> Result<Intercepted<()>> {
        self.on_command_buffer(Call::BeginCommandBuffer(command_buffer), |state, device| {
            state.begin(std::thread::current().id());
            trace_phase(CallShape::BeginCommandBuffer, Phase::Forwarding);
            device.begin_command_buffer(command_buffer)
        })
    }

    pub fn end_command_buffer(&self, command_buffer: CommandBufferKey) -> Result<Intercepted<()>> {
        self.on_command_buffer(Call::EndCommandBuffer(command_buffer), |state, device| {
            state.end();
            trace_phase(CallShape::EndCommandBuffer, Phase::Forwarding);
            device.end_command_buffer(command_buffer)
        })
    }

    /// Submit command buffers. Only executable ones are forwarded.
    pub fn queue_submit(&self, command_buffers: &[CommandBufferKey]) -> Result<Intercepted<()>> {
        let call = Call::QueueSubmit(command_buffers);
        let context = self.reporter.begin_call(call.shape(), None);
        let registry = self.read_registry()?;
        let findings = self.evaluate(&call, &registry, None, None);
        let report = self.conclude(context, findings)?;

        let mut executable = Vec::with_capacity(command_buffers.len());
        for key in command_buffers {
            if let Some(record) = registry.command_buffer(*key) {
                if lock_state(record)?.is_executable() {
                    executable.push(*key);
                }
            }
        }
        if executable.len() < command_buffers.len() {
            layer_debug!(SOURCE, "Forwarding {} of {} submitted command buffer(s)",
                executable.len(), command_buffers.len());
        }
        self.device()?.submit(&executable)?;
        Ok(Intercepted { output: (), report })
    }

    // ===== PIPELINES =====

    pub fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<Intercepted<PipelineKey>> {
        self.exclusive(Call::CreateGraphicsPipeline(desc), |registry, _| {
            Ok(registry.register(PipelineRecord { desc: desc.clone() }))
        })
    }

    pub fn destroy_pipeline(&self, pipeline: PipelineKey) -> Result<Intercepted<()>> {
        self.exclusive(Call::DestroyPipeline(pipeline), |registry, _| {
            registry.destroy::<PipelineRecord>(pipeline).ok();
            Ok(())
        })
    }

    // ===== RECORDED COMMANDS =====

    pub fn cmd_copy_buffer(
        &self,
        command_buffer: CommandBufferKey,
        src_buffer: BufferKey,
        dst_buffer: BufferKey,
        regions: &[BufferCopy],
    ) -> Result<Intercepted<()>> {
        let info = CopyBufferInfo { src_buffer, dst_buffer, regions: regions.to_vec() };
        self.record(Call::CmdCopyBuffer(command_buffer, &info), || RecordedCommand::CopyBuffer(info.clone()))
    }

    pub fn cmd_copy_buffer2(&self, command_buffer: CommandBufferKey, info: &CopyBufferInfo) -> Result<Intercepted<()>> {
        self.record(Call::CmdCopyBuffer2(command_buffer, info), || RecordedCommand::CopyBuffer(info.clone()))
    }

    pub fn cmd_fill_buffer(
        &self,
        command_buffer: CommandBufferKey,
        dst_buffer: BufferKey,
        dst_offset: u64,
        size: BufferRange,
        data: u32,
    ) -> Result<Intercepted<()>> {
        let info = FillBufferInfo { dst_buffer, dst_offset, size, data };
        self.record(Call::CmdFillBuffer(command_buffer, &info), || RecordedCommand::FillBuffer(info))
    }

    pub fn cmd_update_buffer(&self, command_buffer: CommandBufferKey, info: &UpdateBufferInfo) -> Result<Intercepted<()>> {
        self.record(Call::CmdUpdateBuffer(command_buffer, info), || RecordedCommand::UpdateBuffer(info.clone()))
    }

    pub fn cmd_bind_index_buffer(
        &self,
        command_buffer: CommandBufferKey,
        buffer: BufferKey,
        offset: u64,
        index_type: IndexType,
    ) -> Result<Intercepted<()>> {
        let info = BindIndexBufferInfo { buffer, offset, size: None, index_type };
        self.record(Call::CmdBindIndexBuffer(command_buffer, &info), || RecordedCommand::BindIndexBuffer(info))
    }

    pub fn cmd_bind_index_buffer2(
        &self,
        command_buffer: CommandBufferKey,
        buffer: BufferKey,
        offset: u64,
        size: BufferRange,
        index_type: IndexType,
    ) -> Result<Intercepted<()>> {
        let info = BindIndexBufferInfo { buffer, offset, size: Some(size), index_type };
        self.record(Call::CmdBindIndexBuffer2(command_buffer, &info), || RecordedCommand::BindIndexBuffer(info))
    }

    pub fn cmd_bind_vertex_buffers(
        &self,
        command_buffer: CommandBufferKey,
        first_binding: u32,
        bindings: &[VertexBufferBinding],
    ) -> Result<Intercepted<()>> {
        let info = BindVertexBuffersInfo { first_binding, bindings: bindings.to_vec() };
        self.record(Call::CmdBindVertexBuffers(command_buffer, &info), || RecordedCommand::BindVertexBuffers(info.clone()))
    }

    pub fn cmd_bind_descriptor_set(&self, command_buffer: CommandBufferKey, set: DescriptorSetKey) -> Result<Intercepted<()>> {
        self.record(Call::CmdBindDescriptorSet(command_buffer, set), || RecordedCommand::BindDescriptorSet(set))
    }

    pub fn cmd_bind_pipeline(&self, command_buffer: CommandBufferKey, pipeline: PipelineKey) -> Result<Intercepted<()>> {
        self.record(Call::CmdBindPipeline(command_buffer, pipeline), || RecordedCommand::BindPipeline(pipeline))
    }

    pub fn cmd_draw(&self, command_buffer: CommandBufferKey, draw: &DrawInfo) -> Result<Intercepted<()>> {
        self.record(Call::CmdDraw(command_buffer, draw), || RecordedCommand::Draw(*draw))
    }

    pub fn cmd_begin_render_pass(&self, command_buffer: CommandBufferKey) -> Result<Intercepted<()>> {
        self.record(Call::CmdBeginRenderPass(command_buffer), || RecordedCommand::BeginRenderPass)
    }

    pub fn cmd_end_render_pass(&self, command_buffer: CommandBufferKey) -> Result<Intercepted<()>> {
        self.record(Call::CmdEndRenderPass(command_buffer), || RecordedCommand::EndRenderPass)
    }

    pub fn cmd_begin_conditional_rendering(
        &self,
        command_buffer: CommandBufferKey,
        info: &ConditionalRenderingBeginInfo,
    ) -> Result<Intercepted<()>> {
        self.record(Call::CmdBeginConditionalRendering(command_buffer, info), || {
            RecordedCommand::BeginConditionalRendering(*info)
        })
    }

    pub fn cmd_end_conditional_rendering(&self, command_buffer: CommandBufferKey) -> Result<Intercepted<()>> {
        self.record(Call::CmdEndConditionalRendering(command_buffer), || RecordedCommand::EndConditionalRendering)
    }

    // ===== PIPELINE =====

    fn read_registry(&self) -> Result<RwLockReadGuard<'_, ObjectRegistry>> {
        self.registry.read()
            .map_err(|_| Error::LockPoisoned("object registry".to_string()))
    }

    fn write_registry(&self) -> Result<RwLockWriteGuard<'_, ObjectRegistry>> {
        self.registry.write()
            .map_err(|_| Error::LockPoisoned("object registry".to_string()))
    }

    fn device(&self) -> Result<MutexGuard<'_, D>> {
        self.device.lock()
            .map_err(|_| Error::LockPoisoned("device".to_string()))
    }

    fn evaluate(
        &self,
        call: &Call<'_>,
        registry: &ObjectRegistry,
        command_buffer: Option<&CommandBufferState>,
        queue_flags: Option<QueueFlags>,
    ) -> Vec<Finding> {
        let env = Env {
            shape: call.shape(),
            capabilities: &*self.capabilities,
            config: &self.config,
            registry,
            command_buffer,
            queue_flags,
            thread: std::thread::current().id(),
            resolved: Operands::empty(),
        };
        self.interceptor.evaluate(call, env)
    }

    /// Finish the report; in abort mode a call with an error-severity
    /// violation stops here
    fn conclude(&self, context: CallContext, findings: Vec<Finding>) -> Result<CallReport> {
        let report = self.reporter.finish_call(context, findings);
        if self.config.abort_on_violation && report.has_errors() {
            layer_warn!(SOURCE, "{} aborted after {} violation(s)", context.shape.name(), report.len());
            return Err(Error::CallAborted(report));
        }
        Ok(report)
    }

    /// Calls that create, destroy or bind objects
    fn exclusive<T>(
        &self,
        call: Call<'_>,
        apply: impl FnOnce(&mut ObjectRegistry, &mut D) -> Result<T>,
    ) -> Result<Intercepted<T>> {
        let context = self.reporter.begin_call(call.shape(), call.command_buffer());
        let mut registry = self.write_registry()?;
        let findings = self.evaluate(&call, &registry, None, None);
        let report = self.conclude(context, findings)?;
        let mut device = self.device()?;
        // Each apply updates the registry, then forwards
        trace_phase(context.shape, Phase::UpdatingState);
        trace_phase(context.shape, Phase::Forwarding);
        let output = apply(&mut *registry, &mut *device)?;
        Ok(Intercepted { output, report })
    }

    /// Calls against one command buffer. The state is only updated, and
    /// the call only forwarded, when the command buffer resolves.
    fn on_command_buffer(
        &self,
        call: Call<'_>,
        apply: impl FnOnce(&mut CommandBufferState, &mut D) -> Result<()>,
    ) -> Result<Intercepted<()>> {
        let shape: CallShape = call.shape();
        let context = self.reporter.begin_call(shape, call.command_buffer());
        let registry = self.read_registry()?;
        let record = call.command_buffer().and_then(|key| registry.command_buffer(key));
        let mut state = match record {
            Some(record) => Some(lock_state(record)?),
            None => None,
        };

        let findings = self.evaluate(&call, &registry, state.as_deref(), record.map(|record| record.queue_flags));
        let report = self.conclude(context, findings)?;

        if let Some(state) = state.as_mut() {
            let mut device = self.device()?;
            trace_phase(shape, Phase::UpdatingState);
            apply(&mut **state, &mut *device)?;
        }
        Ok(Intercepted { output: (), report })
    }

    fn record(&self, call: Call<'_>, command: impl FnOnce() -> RecordedCommand) -> Result<Intercepted<()>> {
        let command_buffer = call.command_buffer().unwrap_or_default();
        let shape = call.shape();
        self.on_command_buffer(call, |state, device| {
            let command = command();
            state.apply(&command);
            trace_phase(shape, Phase::Forwarding);
            device.record(command_buffer, command)
        })
    }
}

fn trace_phase(shape: CallShape, phase: Phase) {
    layer_trace!(SOURCE, "{}: {:?}", shape.name(), phase);
}

fn lock_state(record: &CommandBufferRecord) -> Result<MutexGuard<'_, CommandBufferState>> {
    record.state.lock()
        .map_err(|_| Error::LockPoisoned("command buffer state".to_string()))
}

/// Invalidate every command buffer whose state matches; returns how many
fn invalidate_where(
    registry: &ObjectRegistry,
    cause: ObjectKind,
    references: impl Fn(&CommandBufferState) -> bool,
) -> Result<usize> {
    let mut invalidated = 0;
    for (_, record) in registry.command_buffers() {
        let mut state = lock_state(record)?;
        if references(&*state) {
            state.invalidate(cause);
            invalidated += 1;
        }
    }
    Ok(invalidated)
}

#[cfg(test)]
#[path = "layer_tests.rs"]
mod tests;
