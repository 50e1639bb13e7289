//! Unit tests for descriptor_rules.rs

use super::*;
use crate::device::buffer::{BufferRange, BufferUsageFlags, BufferViewCreateInfo};
use crate::device::descriptor::{DescriptorSetLayoutBinding, DescriptorType, WriteDescriptorSet};
use crate::device::format::Format;
use crate::dispatch::CallShape;
use crate::registry::{BufferRecord, BufferViewKey, BufferViewRecord, DescriptorSetKey, DescriptorSetRecord};
use crate::rules::testing::{assert_well_formed, messages, RuleFixture};

fn layout(binding: u32, descriptor_type: DescriptorType) -> DescriptorSetLayoutBinding {
    DescriptorSetLayoutBinding { binding, descriptor_type, descriptor_count: 1 }
}

fn write(dst_set: DescriptorSetKey, dst_binding: u32, descriptor_type: DescriptorType, views: &[BufferViewKey]) -> WriteDescriptorSet {
    WriteDescriptorSet { dst_set, dst_binding, descriptor_type, texel_buffer_views: views.to_vec() }
}

fn texel_set(fixture: &mut RuleFixture) -> DescriptorSetKey {
    fixture.registry.register(DescriptorSetRecord {
        bindings: vec![layout(0, DescriptorType::UniformTexelBuffer), layout(1, DescriptorType::StorageBuffer)],
        ..DescriptorSetRecord::default()
    })
}

fn texel_view(fixture: &mut RuleFixture) -> (crate::registry::BufferKey, BufferViewKey) {
    let buffer = fixture.buffer(256, BufferUsageFlags::UNIFORM_TEXEL_BUFFER);
    let view = fixture.registry.register(BufferViewRecord {
        info: BufferViewCreateInfo::new(buffer, Format::R32_SFLOAT, 0, BufferRange::Whole),
    });
    (buffer, view)
}

#[test]
fn test_rules_are_well_formed() {
    assert_well_formed(&rules());
}

// ============================================================================
// LAYOUT TESTS
// ============================================================================

#[test]
fn test_duplicate_layout_bindings() {
    let fixture = RuleFixture::new();
    let bindings = [
        layout(0, DescriptorType::UniformBuffer),
        layout(1, DescriptorType::StorageBuffer),
        layout(0, DescriptorType::UniformTexelBuffer),
    ];
    let out = messages(check_unique_bindings, &bindings[..], &fixture.env(CallShape::CreateDescriptorSet));
    assert_eq!(out, vec!["pBindings[2].binding (0) is used more than once.".to_string()]);
}

// ============================================================================
// WRITE TESTS
// ============================================================================

#[test]
fn test_write_to_missing_set() {
    let mut fixture = RuleFixture::new();
    let set = texel_set(&mut fixture);
    fixture.registry.destroy::<DescriptorSetRecord>(set).unwrap();

    let writes = [write(set, 0, DescriptorType::UniformTexelBuffer, &[]), write(DescriptorSetKey::default(), 0, DescriptorType::UniformBuffer, &[])];
    let out = messages(check_dst_sets, &writes[..], &fixture.env(CallShape::UpdateDescriptorSets));
    assert_eq!(out.len(), 2);
    assert!(out[0].contains("Invalid VkDescriptorSet Object"));
    assert!(out[1].contains("VK_NULL_HANDLE"));
}

#[test]
fn test_write_binding_and_type() {
    let mut fixture = RuleFixture::new();
    let set = texel_set(&mut fixture);
    let env_writes = [
        write(set, 7, DescriptorType::UniformBuffer, &[]),
        write(set, 1, DescriptorType::UniformBuffer, &[]),
        write(set, 1, DescriptorType::StorageBuffer, &[]),
    ];
    let env = fixture.env(CallShape::UpdateDescriptorSets);

    let bindings = messages(check_dst_bindings, &env_writes[..], &env);
    assert_eq!(bindings.len(), 1);
    assert!(bindings[0].starts_with("pDescriptorWrites[0]"));

    let types = messages(check_descriptor_types, &env_writes[..], &env);
    assert_eq!(types.len(), 1);
    assert!(types[0].starts_with("pDescriptorWrites[1]"));
}

#[test]
fn test_write_destroyed_view() {
    let mut fixture = RuleFixture::new();
    let set = texel_set(&mut fixture);
    let (_, view) = texel_view(&mut fixture);
    let writes = [write(set, 0, DescriptorType::UniformTexelBuffer, &[view])];

    assert!(messages(check_texel_views_alive, &writes[..], &fixture.env(CallShape::UpdateDescriptorSets)).is_empty());

    fixture.registry.destroy::<BufferViewRecord>(view).unwrap();
    let out = messages(check_texel_views_alive, &writes[..], &fixture.env(CallShape::UpdateDescriptorSets));
    assert_eq!(out.len(), 1);
    assert!(out[0].contains("has been destroyed"));
}

#[test]
fn test_write_view_of_destroyed_buffer() {
    let mut fixture = RuleFixture::new();
    let set = texel_set(&mut fixture);
    let (buffer, view) = texel_view(&mut fixture);
    fixture.registry.destroy::<BufferRecord>(buffer).unwrap();

    let writes = [write(set, 0, DescriptorType::UniformTexelBuffer, &[view])];
    let out = messages(check_texel_views_alive, &writes[..], &fixture.env(CallShape::UpdateDescriptorSets));
    assert_eq!(out.len(), 1);
    assert!(out[0].contains("was created on"));
}

#[test]
fn test_write_to_destroyed_set_with_destroyed_view() {
    let mut fixture = RuleFixture::new();
    let set = texel_set(&mut fixture);
    let (_, view) = texel_view(&mut fixture);
    fixture.registry.destroy::<DescriptorSetRecord>(set).unwrap();
    fixture.registry.destroy::<BufferViewRecord>(view).unwrap();

    let writes = [write(set, 0, DescriptorType::UniformTexelBuffer, &[view])];
    let env = fixture.env(CallShape::UpdateDescriptorSets);

    // The view is checked on its own, the layout checks need a live set
    assert_eq!(messages(check_dst_sets, &writes[..], &env).len(), 1);
    assert_eq!(messages(check_texel_views_alive, &writes[..], &env).len(), 1);
    assert!(messages(check_dst_bindings, &writes[..], &env).is_empty());
    assert!(messages(check_descriptor_types, &writes[..], &env).is_empty());
}
