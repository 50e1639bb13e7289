/// Per command buffer recording state
///
/// Updated from every intercepted command, valid or not, so later commands
/// of the same recording see what the caller attempted.

use std::thread::ThreadId;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::device::command::{BindIndexBufferInfo, RecordedCommand};
use crate::registry::{BufferKey, DescriptorSetKey, ObjectKind, PipelineKey};

/// Recording state machine of a command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// Allocated, never begun (or reset)
    #[default]
    Initial,
    Recording,
    /// Ended, ready for submission
    Executable,
    /// An object the recording references was destroyed.
    /// `recording` tells whether the caller is still between begin and end.
    Invalid { cause: ObjectKind, recording: bool },
}

/// Tracked state of one command buffer
#[derive(Debug, Clone, Default)]
pub struct CommandBufferState {
    pub recording: RecordingState,
    /// Thread that issued the current begin
    pub recording_thread: Option<ThreadId>,
    pub render_pass_active: bool,
    pub conditional_rendering_active: bool,
    pub bound_pipeline: Option<PipelineKey>,
    pub vertex_bindings: FxHashMap<u32, BufferKey>,
    pub index_buffer: Option<BindIndexBufferInfo>,
    referenced_buffers: FxHashSet<BufferKey>,
    referenced_sets: FxHashSet<DescriptorSetKey>,
    command_count: usize,
}

impl CommandBufferState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a recording; an implicit reset drops everything recorded before
    pub fn begin(&mut self, thread: ThreadId) {
        *self = Self {
            recording: RecordingState::Recording,
            recording_thread: Some(thread),
            ..Self::default()
        };
    }

    /// Finish a recording. Scopes left open are closed.
    pub fn end(&mut self) {
        self.recording = match self.recording {
            RecordingState::Recording => RecordingState::Executable,
            RecordingState::Invalid { cause, .. } => RecordingState::Invalid { cause, recording: false },
            other => other,
        };
        self.recording_thread = None;
        self.render_pass_active = false;
        self.conditional_rendering_active = false;
    }

    pub fn is_recording(&self) -> bool {
        matches!(
            self.recording,
            RecordingState::Recording | RecordingState::Invalid { recording: true, .. }
        )
    }

    pub fn is_executable(&self) -> bool {
        self.recording == RecordingState::Executable
    }

    /// Kind of the destroyed object that invalidated this command buffer
    pub fn invalid_cause(&self) -> Option<ObjectKind> {
        match self.recording {
            RecordingState::Invalid { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Mark invalid because a referenced object was destroyed.
    /// The first cause wins.
    pub fn invalidate(&mut self, cause: ObjectKind) {
        self.recording = match self.recording {
            RecordingState::Invalid { .. } => return,
            RecordingState::Recording => RecordingState::Invalid { cause, recording: true },
            RecordingState::Initial => return,
            RecordingState::Executable => RecordingState::Invalid { cause, recording: false },
        };
    }

    /// Whether another thread owns the recording in progress
    pub fn recorded_by_other_thread(&self, thread: ThreadId) -> bool {
        self.is_recording() && self.recording_thread.is_some_and(|owner| owner != thread)
    }

    pub fn references_buffer(&self, buffer: BufferKey) -> bool {
        self.referenced_buffers.contains(&buffer)
    }

    pub fn referenced_sets(&self) -> impl Iterator<Item = DescriptorSetKey> + '_ {
        self.referenced_sets.iter().copied()
    }

    /// Number of commands recorded since begin
    pub fn command_count(&self) -> usize {
        self.command_count
    }

    /// Apply the effect of a recorded command
    pub fn apply(&mut self, command: &RecordedCommand) {
        self.command_count += 1;
        match command {
            RecordedCommand::CopyBuffer(info) => {
                self.referenced_buffers.insert(info.src_buffer);
                self.referenced_buffers.insert(info.dst_buffer);
            }
            RecordedCommand::FillBuffer(info) => {
                self.referenced_buffers.insert(info.dst_buffer);
            }
            RecordedCommand::UpdateBuffer(info) => {
                self.referenced_buffers.insert(info.dst_buffer);
            }
            RecordedCommand::BindIndexBuffer(info) => {
                self.referenced_buffers.insert(info.buffer);
                self.index_buffer = Some(*info);
            }
            RecordedCommand::BindVertexBuffers(info) => {
                for (slot, binding) in (info.first_binding..).zip(&info.bindings) {
                    self.referenced_buffers.insert(binding.buffer);
                    self.vertex_bindings.insert(slot, binding.buffer);
                }
            }
            RecordedCommand::BindDescriptorSet(set) => {
                self.referenced_sets.insert(*set);
            }
            RecordedCommand::BindPipeline(pipeline) => {
                self.bound_pipeline = Some(*pipeline);
            }
            RecordedCommand::Draw(_) => {}
            RecordedCommand::BeginRenderPass => self.render_pass_active = true,
            RecordedCommand::EndRenderPass => self.render_pass_active = false,
            RecordedCommand::BeginConditionalRendering(info) => {
                self.referenced_buffers.insert(info.buffer);
                self.conditional_rendering_active = true;
            }
            RecordedCommand::EndConditionalRendering => self.conditional_rendering_active = false,
        }
    }
}

#[cfg(test)]
#[path = "command_buffer_tests.rs"]
mod tests;
