//! Integration tests for buffer creation, memory binding and destruction
//!
//! Run with: cargo test --test buffer_integration_tests


use galaxy_3d_validation::galaxy3d::device::{
    BufferCreateFlags, BufferCreateInfo, BufferUsageFlags, BufferUsageFlags2, Capabilities, DeviceLimits,
    MemoryAllocateInfo, NullDevice,
};
use galaxy_3d_validation::galaxy3d::registry::{BufferKey, MemoryKey, ObjectKind};
use galaxy_3d_validation::galaxy3d::{Error, LayerConfig, ValidationLayer};
use layer_test_utils::*;

fn allocate(layer: &ValidationLayer, size: u64) -> MemoryKey {
    layer
        .allocate_memory(&MemoryAllocateInfo { size, memory_type_index: 0 })
        .unwrap()
        .output
}

fn create(layer: &ValidationLayer, info: &BufferCreateInfo) -> Vec<&'static str> {
    let created = layer.create_buffer(info).unwrap();
    let mut fired = created.report.rule_ids();
    fired.sort_unstable();
    fired
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
fn test_integration_create_and_destroy_buffer() {
    let layer = create_layer();

    let created = layer.create_buffer(&BufferCreateInfo::new(1024, BufferUsageFlags::VERTEX_BUFFER)).unwrap();
    assert!(created.is_clean());
    assert_eq!(layer.live_count(ObjectKind::Buffer).unwrap(), 1);
    assert_eq!(layer.with_device(|device| device.live_buffers()).unwrap(), 1);

    assert!(layer.destroy_buffer(created.output).unwrap().is_clean());
    assert_eq!(layer.live_count(ObjectKind::Buffer).unwrap(), 0);
    assert_eq!(layer.with_device(|device| device.live_buffers()).unwrap(), 0);

    let again = layer.destroy_buffer(created.output).unwrap();
    assert_fired_exactly(&again.report, &["VUID-vkDestroyBuffer-buffer-parameter"]);

    // Destroying the null handle is allowed
    assert!(layer.destroy_buffer(BufferKey::default()).unwrap().is_clean());
}

#[test]
fn test_integration_create_size_and_usage_rules() {
    let layer = create_layer();

    assert_eq!(create(&layer, &BufferCreateInfo::new(0, BufferUsageFlags::TRANSFER_SRC)), ["VUID-VkBufferCreateInfo-size-00912"]);
    assert_eq!(create(&layer, &BufferCreateInfo::new(64, BufferUsageFlags::empty())), ["VUID-VkBufferCreateInfo-None-09206"]);

    let unknown = BufferUsageFlags::from_bits_retain(0x8000_0000);
    assert_eq!(create(&layer, &BufferCreateInfo::new(64, unknown)), ["VUID-VkBufferCreateInfo-None-09205"]);
}

#[test]
fn test_integration_usage2_sidecar_replaces_legacy_usage() {
    let layer = create_layer();

    // Legacy flags are ignored once the sidecar is present
    let sidecar = BufferCreateInfo::new(64, BufferUsageFlags::empty()).with_usage2(BufferUsageFlags2::TRANSFER_DST);
    assert!(create(&layer, &sidecar).is_empty());

    let empty = BufferCreateInfo::new(64, BufferUsageFlags::TRANSFER_DST).with_usage2(BufferUsageFlags2::empty());
    assert_eq!(create(&layer, &empty), ["VUID-VkBufferUsageFlags2CreateInfoKHR-usage-requiredbitmask"]);

    let unknown = BufferCreateInfo::new(64, BufferUsageFlags::TRANSFER_DST)
        .with_usage2(BufferUsageFlags2::from_bits_retain(1 << 60));
    assert_eq!(create(&layer, &unknown), ["VUID-VkBufferUsageFlags2CreateInfoKHR-usage-parameter"]);
}

#[test]
fn test_integration_max_buffer_size() {
    let limits = DeviceLimits { max_buffer_size: Some(1024), ..DeviceLimits::default() };
    let layer = create_layer_with(Capabilities::default().with_limits(limits), LayerConfig::silent());

    assert!(create(&layer, &BufferCreateInfo::new(1024, BufferUsageFlags::TRANSFER_SRC)).is_empty());
    assert_eq!(
        create(&layer, &BufferCreateInfo::new(1025, BufferUsageFlags::TRANSFER_SRC)),
        ["VUID-VkBufferCreateInfo-size-06409"]
    );
}

#[test]
fn test_integration_sharing_mode_rules() {
    let layer = create_layer();

    let valid = BufferCreateInfo::new(64, BufferUsageFlags::TRANSFER_SRC).concurrent(&[GRAPHICS_FAMILY, TRANSFER_FAMILY]);
    assert!(create(&layer, &valid).is_empty());

    let single = BufferCreateInfo::new(64, BufferUsageFlags::TRANSFER_SRC).concurrent(&[GRAPHICS_FAMILY]);
    assert_eq!(create(&layer, &single), ["VUID-VkBufferCreateInfo-sharingMode-00914"]);

    let unknown_family = BufferCreateInfo::new(64, BufferUsageFlags::TRANSFER_SRC).concurrent(&[GRAPHICS_FAMILY, 7]);
    assert_eq!(create(&layer, &unknown_family), ["VUID-VkBufferCreateInfo-sharingMode-01419"]);
}

#[test]
fn test_integration_sparse_binding_rules() {
    let sparse = BufferCreateInfo::new(64, BufferUsageFlags::STORAGE_BUFFER).with_flags(BufferCreateFlags::SPARSE_BINDING);

    let without_features = create_layer_without_features();
    assert_eq!(create(&without_features, &sparse), ["VUID-VkBufferCreateInfo-flags-00915"]);

    let layer = create_layer();
    assert!(create(&layer, &sparse).is_empty());

    let dedicated = sparse.clone().with_dedicated_allocation(true);
    assert_eq!(create(&layer, &dedicated), ["VUID-VkBufferCreateInfo-pNext-01571"]);

    let not_dedicated = sparse.with_dedicated_allocation(false);
    assert!(create(&layer, &not_dedicated).is_empty());
}

// ============================================================================
// MEMORY REQUIREMENTS AND ALLOCATION
// ============================================================================

#[test]
fn test_integration_memory_requirements() {
    let layer = create_layer();

    let transfer = create_unbound_buffer(&layer, 100, BufferUsageFlags::TRANSFER_SRC);
    let requirements = layer.get_buffer_memory_requirements(transfer).unwrap().output.unwrap();
    assert_eq!(requirements.alignment, 16);
    assert_eq!(requirements.size, 112);

    let uniform = create_unbound_buffer(&layer, 100, BufferUsageFlags::UNIFORM_BUFFER);
    let requirements = layer.get_buffer_memory_requirements(uniform).unwrap().output.unwrap();
    assert_eq!(requirements.alignment, 64);
    assert_eq!(requirements.size, 128);

    layer.destroy_buffer(uniform).unwrap();
    let stale = layer.get_buffer_memory_requirements(uniform).unwrap();
    assert!(stale.output.is_none());
    assert_fired_exactly(&stale.report, &["VUID-vkGetBufferMemoryRequirements-buffer-parameter"]);
}

#[test]
fn test_integration_small_allocation_advisory() {
    let quiet = create_layer();
    assert!(quiet.allocate_memory(&MemoryAllocateInfo { size: 4096, memory_type_index: 0 }).unwrap().is_clean());

    let layer = create_layer_with(Capabilities::default(), LayerConfig::silent().with_best_practices(true));
    let small = layer.allocate_memory(&MemoryAllocateInfo { size: 4096, memory_type_index: 0 }).unwrap();
    assert_fired_exactly(&small.report, &["BestPractices-vkAllocateMemory-small-allocation"]);
    assert!(!small.report.has_errors());

    let large = layer.allocate_memory(&MemoryAllocateInfo { size: 256 * 1024, memory_type_index: 0 }).unwrap();
    assert!(large.is_clean());
}

#[test]
fn test_integration_device_out_of_memory() {
    let device = NullDevice::new().with_max_allocation_size(1024);
    let layer = ValidationLayer::new(Capabilities::default(), LayerConfig::silent(), device).unwrap();

    let result = layer.allocate_memory(&MemoryAllocateInfo { size: 2048, memory_type_index: 0 });
    assert!(matches!(result, Err(Error::BackendError(_))));
    assert_eq!(layer.live_count(ObjectKind::Memory).unwrap(), 0);

    assert!(layer.allocate_memory(&MemoryAllocateInfo { size: 1024, memory_type_index: 0 }).is_ok());
}

#[test]
fn test_integration_free_memory() {
    let layer = create_layer();
    let memory = allocate(&layer, 1024);

    assert!(layer.free_memory(memory).unwrap().is_clean());
    assert_eq!(layer.live_count(ObjectKind::Memory).unwrap(), 0);

    let again = layer.free_memory(memory).unwrap();
    assert_fired_exactly(&again.report, &["VUID-vkFreeMemory-memory-parameter"]);
}

// ============================================================================
// BINDING
// ============================================================================

#[test]
fn test_integration_bind_rules() {
    let layer = create_layer();
    let memory = allocate(&layer, 1024);

    let buffer = create_unbound_buffer(&layer, 64, BufferUsageFlags::TRANSFER_SRC);
    assert!(layer.bind_buffer_memory(buffer, memory, 64).unwrap().is_clean());

    let rebound = layer.bind_buffer_memory(buffer, memory, 128).unwrap();
    assert_fired_exactly(&rebound.report, &["VUID-vkBindBufferMemory-buffer-07459"]);

    let past_end = create_unbound_buffer(&layer, 64, BufferUsageFlags::TRANSFER_SRC);
    let bound = layer.bind_buffer_memory(past_end, memory, 1024).unwrap();
    assert_fired_exactly(&bound.report, &["VUID-vkBindBufferMemory-memoryOffset-01031"]);

    let unaligned = create_unbound_buffer(&layer, 64, BufferUsageFlags::TRANSFER_SRC);
    let bound = layer.bind_buffer_memory(unaligned, memory, 8).unwrap();
    assert_fired_exactly(&bound.report, &["VUID-vkBindBufferMemory-memoryOffset-01036"]);

    let too_large = create_unbound_buffer(&layer, 64, BufferUsageFlags::TRANSFER_SRC);
    let bound = layer.bind_buffer_memory(too_large, memory, 992).unwrap();
    assert_fired_exactly(&bound.report, &["VUID-vkBindBufferMemory-size-01037"]);
}

#[test]
fn test_integration_bind_handle_rules() {
    let layer = create_layer();
    let buffer = create_unbound_buffer(&layer, 64, BufferUsageFlags::TRANSFER_SRC);
    let memory = allocate(&layer, 1024);

    let null_memory = layer.bind_buffer_memory(buffer, MemoryKey::default(), 0).unwrap();
    assert_fired_exactly(&null_memory.report, &["UNASSIGNED-GeneralParameterError-RequiredParameter"]);

    layer.free_memory(memory).unwrap();
    let freed = layer.bind_buffer_memory(buffer, memory, 0).unwrap();
    assert_fired_exactly(&freed.report, &["VUID-vkBindBufferMemory-memory-parameter"]);

    // The buffer was not bound by the failed calls
    let memory = allocate(&layer, 1024);
    assert!(layer.bind_buffer_memory(buffer, memory, 0).unwrap().is_clean());

    layer.destroy_buffer(buffer).unwrap();
    let destroyed = layer.bind_buffer_memory(buffer, memory, 0).unwrap();
    assert_fired_exactly(&destroyed.report, &["VUID-vkBindBufferMemory-buffer-parameter"]);
}

#[test]
fn test_integration_freeing_memory_keeps_binding() {
    let layer = create_layer();
    let buffer = create_unbound_buffer(&layer, 64, BufferUsageFlags::TRANSFER_SRC);
    let memory = allocate(&layer, 1024);
    layer.bind_buffer_memory(buffer, memory, 0).unwrap();
    layer.free_memory(memory).unwrap();

    // Still bound: a second bind is rejected even though the memory is gone
    let rebound = layer.bind_buffer_memory(buffer, allocate(&layer, 1024), 0).unwrap();
    assert_fired_exactly(&rebound.report, &["VUID-vkBindBufferMemory-buffer-07459"]);
}
