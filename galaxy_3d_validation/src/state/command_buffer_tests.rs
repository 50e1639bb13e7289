//! Unit tests for command_buffer.rs

use slotmap::SlotMap;
use crate::device::buffer::IndexType;
use crate::device::command::{BindIndexBufferInfo, BindVertexBuffersInfo, RecordedCommand, VertexBufferBinding};
use crate::registry::{BufferKey, ObjectKind};
use crate::state::command_buffer::{CommandBufferState, RecordingState};

fn buffer_keys(count: usize) -> Vec<BufferKey> {
    let mut keys: SlotMap<BufferKey, ()> = SlotMap::with_key();
    (0..count).map(|_| keys.insert(())).collect()
}

// ============================================================================
// RECORDING STATE TESTS
// ============================================================================

#[test]
fn test_new_state_is_initial() {
    let state = CommandBufferState::new();
    assert_eq!(state.recording, RecordingState::Initial);
    assert!(!state.is_recording());
    assert!(!state.is_executable());
}

#[test]
fn test_begin_end_cycle() {
    let mut state = CommandBufferState::new();
    state.begin(std::thread::current().id());
    assert!(state.is_recording());

    state.end();
    assert!(state.is_executable());
    assert!(state.recording_thread.is_none());
}

#[test]
fn test_end_without_begin_stays_initial() {
    let mut state = CommandBufferState::new();
    state.end();
    assert_eq!(state.recording, RecordingState::Initial);
}

#[test]
fn test_begin_resets_previous_recording() {
    let buffers = buffer_keys(1);
    let mut state = CommandBufferState::new();
    state.begin(std::thread::current().id());
    state.apply(&RecordedCommand::BeginRenderPass);
    state.apply(&RecordedCommand::BindIndexBuffer(BindIndexBufferInfo {
        buffer: buffers[0],
        offset: 0,
        size: None,
        index_type: IndexType::Uint16,
    }));

    state.begin(std::thread::current().id());

    assert!(!state.render_pass_active);
    assert!(state.index_buffer.is_none());
    assert!(!state.references_buffer(buffers[0]));
    assert_eq!(state.command_count(), 0);
}

// ============================================================================
// INVALIDATION TESTS
// ============================================================================

#[test]
fn test_invalidate_while_recording_keeps_recording() {
    let mut state = CommandBufferState::new();
    state.begin(std::thread::current().id());
    state.invalidate(ObjectKind::Buffer);

    assert!(state.is_recording());
    assert_eq!(state.invalid_cause(), Some(ObjectKind::Buffer));

    state.end();
    assert_eq!(state.recording, RecordingState::Invalid { cause: ObjectKind::Buffer, recording: false });
}

#[test]
fn test_first_invalidation_cause_wins() {
    let mut state = CommandBufferState::new();
    state.begin(std::thread::current().id());
    state.end();
    state.invalidate(ObjectKind::BufferView);
    state.invalidate(ObjectKind::Buffer);

    assert_eq!(state.invalid_cause(), Some(ObjectKind::BufferView));
}

#[test]
fn test_invalidate_initial_is_noop() {
    let mut state = CommandBufferState::new();
    state.invalidate(ObjectKind::Buffer);
    assert_eq!(state.recording, RecordingState::Initial);
}

// ============================================================================
// COMMAND EFFECT TESTS
// ============================================================================

#[test]
fn test_scope_flags_follow_attempts() {
    let mut state = CommandBufferState::new();
    state.begin(std::thread::current().id());

    state.apply(&RecordedCommand::BeginRenderPass);
    state.apply(&RecordedCommand::BeginRenderPass);
    assert!(state.render_pass_active);

    state.apply(&RecordedCommand::EndRenderPass);
    assert!(!state.render_pass_active);

    state.apply(&RecordedCommand::EndConditionalRendering);
    assert!(!state.conditional_rendering_active);
    assert_eq!(state.command_count(), 4);
}

#[test]
fn test_vertex_bindings_start_at_first_binding() {
    let buffers = buffer_keys(2);
    let mut state = CommandBufferState::new();
    state.begin(std::thread::current().id());

    state.apply(&RecordedCommand::BindVertexBuffers(BindVertexBuffersInfo {
        first_binding: 3,
        bindings: vec![
            VertexBufferBinding { buffer: buffers[0], offset: 0 },
            VertexBufferBinding { buffer: buffers[1], offset: 16 },
        ],
    }));

    assert_eq!(state.vertex_bindings.get(&3), Some(&buffers[0]));
    assert_eq!(state.vertex_bindings.get(&4), Some(&buffers[1]));
    assert!(state.references_buffer(buffers[1]));
}

#[test]
fn test_end_closes_open_scopes() {
    let mut state = CommandBufferState::new();
    state.begin(std::thread::current().id());
    state.apply(&RecordedCommand::BeginRenderPass);
    state.end();

    assert!(!state.render_pass_active);
}

#[test]
fn test_other_thread_detection() {
    let mut state = CommandBufferState::new();
    let owner = std::thread::spawn(|| std::thread::current().id()).join().unwrap();
    state.begin(owner);

    assert!(state.recorded_by_other_thread(std::thread::current().id()));
    assert!(!state.recorded_by_other_thread(owner));

    state.end();
    assert!(!state.recorded_by_other_thread(std::thread::current().id()));
}
