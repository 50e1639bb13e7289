//! Unit tests for object_registry.rs

use std::sync::{Arc, Mutex};
use slotmap::{Key, KeyData};
use crate::device::buffer::{BufferCreateInfo, BufferUsageFlags, MemoryAllocateInfo};
use crate::device::capabilities::{Capabilities, DeviceLimits};
use crate::device::command::{CommandPoolCreateInfo, QueueFlags};
use crate::registry::handles::{BufferKey, HandleRef, MemoryKey, ObjectKind};
use crate::registry::object_registry::{
    buffer_memory_requirements, BufferRecord, CommandBufferRecord, CommandPoolRecord,
    MemoryRecord, ObjectRegistry,
};
use crate::state::{BindingState, CommandBufferState};

fn buffer_record(size: u64, usage: BufferUsageFlags) -> BufferRecord {
    BufferRecord::new(BufferCreateInfo::new(size, usage), &Capabilities::default())
}

// ============================================================================
// REGISTER / LOOKUP / DESTROY TESTS
// ============================================================================

#[test]
fn test_register_and_lookup() {
    let mut registry = ObjectRegistry::new();
    let key = registry.register(buffer_record(256, BufferUsageFlags::TRANSFER_SRC));

    let record: &BufferRecord = registry.lookup(key).unwrap();
    assert_eq!(record.size(), 256);
    assert!(registry.contains(HandleRef::Buffer(key)));
    assert_eq!(registry.live_count(ObjectKind::Buffer), 1);
}

#[test]
fn test_destroy_then_lookup_fails() {
    let mut registry = ObjectRegistry::new();
    let key = registry.register(buffer_record(256, BufferUsageFlags::TRANSFER_SRC));

    assert!(registry.destroy::<BufferRecord>(key).is_ok());

    let err = registry.lookup::<BufferRecord>(key).unwrap_err();
    assert_eq!(err.kind, ObjectKind::Buffer);
    assert!(!err.null);
    assert_eq!(registry.live_count(ObjectKind::Buffer), 0);
}

#[test]
fn test_double_destroy_is_detected() {
    let mut registry = ObjectRegistry::new();
    let key = registry.register(buffer_record(64, BufferUsageFlags::STORAGE_BUFFER));

    assert!(registry.destroy::<BufferRecord>(key).is_ok());
    assert!(registry.destroy::<BufferRecord>(key).is_err());
}

#[test]
fn test_stale_handle_does_not_alias_reused_slot() {
    let mut registry = ObjectRegistry::new();
    let old = registry.register(buffer_record(64, BufferUsageFlags::TRANSFER_SRC));
    registry.destroy::<BufferRecord>(old).unwrap();

    let new = registry.register(buffer_record(128, BufferUsageFlags::TRANSFER_DST));

    assert_ne!(old, new);
    assert!(registry.buffer(old).is_none());
    assert_eq!(registry.buffer(new).map(|b| b.size()), Some(128));
}

#[test]
fn test_null_handle_lookup_reports_null() {
    let registry = ObjectRegistry::new();
    let err = registry.lookup::<BufferRecord>(BufferKey::null()).unwrap_err();
    assert!(err.null);
    assert_eq!(err.to_string(), "VkBuffer is VK_NULL_HANDLE");
}

#[test]
fn test_never_issued_handle_lookup_fails() {
    let registry = ObjectRegistry::new();
    let fake = BufferKey::from(KeyData::from_ffi(0x0000_0001_0000_0007));

    let err = registry.lookup::<BufferRecord>(fake).unwrap_err();
    assert!(!err.null);
    assert!(err.to_string().starts_with("Invalid VkBuffer Object 0x"));
}

#[test]
fn test_handle_kinds_are_separate() {
    let mut registry = ObjectRegistry::new();
    let memory = registry.register(MemoryRecord {
        info: MemoryAllocateInfo { size: 1024, memory_type_index: 0 },
    });

    assert!(registry.contains(HandleRef::Memory(memory)));
    assert_eq!(registry.live_count(ObjectKind::Buffer), 0);
    assert_eq!(registry.live_count(ObjectKind::Memory), 1);
}

// ============================================================================
// BINDING TESTS
// ============================================================================

#[test]
fn test_bound_memory_resolves_live_allocation() {
    let mut registry = ObjectRegistry::new();
    let memory = registry.register(MemoryRecord {
        info: MemoryAllocateInfo { size: 1024, memory_type_index: 0 },
    });
    let mut record = buffer_record(256, BufferUsageFlags::TRANSFER_SRC);
    record.binding = BindingState::Bound { memory, offset: 256 };

    let (key, offset, memory_record) = registry.bound_memory(&record).unwrap();
    assert_eq!(key, memory);
    assert_eq!(offset, 256);
    assert_eq!(memory_record.size(), 1024);
    assert!(!registry.bound_to_freed_memory(&record));
}

#[test]
fn test_binding_to_freed_memory_is_detected() {
    let mut registry = ObjectRegistry::new();
    let memory: MemoryKey = registry.register(MemoryRecord {
        info: MemoryAllocateInfo { size: 1024, memory_type_index: 0 },
    });
    let mut record = buffer_record(256, BufferUsageFlags::TRANSFER_SRC);
    record.binding = BindingState::Bound { memory, offset: 0 };

    registry.destroy::<MemoryRecord>(memory).unwrap();

    assert!(registry.bound_memory(&record).is_none());
    assert!(registry.bound_to_freed_memory(&record));
}

#[test]
fn test_command_buffers_iterate_with_shared_state() {
    let mut registry = ObjectRegistry::new();
    let pool = registry.register(CommandPoolRecord {
        info: CommandPoolCreateInfo { queue_family_index: 0 },
        queue_flags: QueueFlags::GRAPHICS,
    });
    let state = Arc::new(Mutex::new(CommandBufferState::new()));
    registry.register(CommandBufferRecord { pool, queue_flags: QueueFlags::GRAPHICS, state: state.clone() });

    let (_, record) = registry.command_buffers().next().unwrap();
    assert!(Arc::ptr_eq(&record.state, &state));
}

// ============================================================================
// MEMORY REQUIREMENT TESTS
// ============================================================================

#[test]
fn test_requirements_use_base_alignment() {
    let caps = Capabilities::default();
    let reqs = buffer_memory_requirements(&BufferCreateInfo::new(20, BufferUsageFlags::TRANSFER_DST), &caps);
    assert_eq!(reqs.alignment, 16);
    assert_eq!(reqs.size, 32);
}

#[test]
fn test_requirements_use_strictest_usage_alignment() {
    let caps = Capabilities::default().with_limits(DeviceLimits {
        min_uniform_buffer_offset_alignment: 256,
        ..DeviceLimits::default()
    });
    let info = BufferCreateInfo::new(300, BufferUsageFlags::UNIFORM_BUFFER | BufferUsageFlags::STORAGE_BUFFER);

    let reqs = buffer_memory_requirements(&info, &caps);
    assert_eq!(reqs.alignment, 256);
    assert_eq!(reqs.size, 512);
}

#[test]
fn test_requirements_of_huge_size_do_not_overflow() {
    let caps = Capabilities::default();
    let reqs = buffer_memory_requirements(&BufferCreateInfo::new(u64::MAX, BufferUsageFlags::TRANSFER_DST), &caps);
    assert_eq!(reqs.size, u64::MAX);
}
