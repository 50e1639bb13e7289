//! Unit tests for transfer_rules.rs

use super::*;
use crate::device::buffer::{BufferCreateInfo, BufferRange, BufferUsageFlags};
use crate::device::capabilities::DeviceFeatures;
use crate::device::command::{FillBufferInfo, QueueFlags, UpdateBufferInfo};
use crate::dispatch::CallShape;
use crate::registry::BufferKey;
use crate::rules::testing::{assert_well_formed, messages, RuleFixture};

const DST: BufferUsageFlags = BufferUsageFlags::TRANSFER_DST;

fn fill(dst_buffer: BufferKey, dst_offset: u64, size: BufferRange) -> FillBufferInfo {
    FillBufferInfo { dst_buffer, dst_offset, size, data: 0x1234_5678 }
}

/// All fill checks that fire for one call
fn fill_messages(fixture: &RuleFixture, info: &FillBufferInfo) -> Vec<&'static str> {
    let env = fixture.env(CallShape::CmdFillBuffer);
    let checks: [(&'static str, crate::rules::rule::CheckFn<FillBufferInfo>); 7] = [
        ("00024", check_fill_offset_in_buffer),
        ("00025", check_fill_offset_alignment),
        ("00026", check_fill_size_not_zero),
        ("00027", check_fill_size_fits),
        ("00028", check_fill_size_alignment),
        ("00029", check_fill_usage),
        ("00031", check_fill_memory),
    ];
    checks
        .into_iter()
        .filter(|(_, check)| !messages(*check, info, &env).is_empty())
        .map(|(id, _)| id)
        .collect()
}

fn update_messages(fixture: &RuleFixture, info: &UpdateBufferInfo) -> Vec<&'static str> {
    let env = fixture.env(CallShape::CmdUpdateBuffer);
    let checks: [(&'static str, crate::rules::rule::CheckFn<UpdateBufferInfo>); 7] = [
        ("00032", check_update_offset_in_buffer),
        ("00033", check_update_size_fits),
        ("00034", check_update_usage),
        ("00035", check_update_memory),
        ("00036", check_update_offset_alignment),
        ("00037", check_update_size_bounds),
        ("00038", check_update_size_alignment),
    ];
    checks
        .into_iter()
        .filter(|(_, check)| !messages(*check, info, &env).is_empty())
        .map(|(id, _)| id)
        .collect()
}

#[test]
fn test_rules_are_well_formed() {
    assert_well_formed(&rules());
}

// ============================================================================
// FILL TESTS
// ============================================================================

#[test]
fn test_valid_fill() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(20, DST);
    assert!(fill_messages(&fixture, &fill(buffer, 0, BufferRange::Bytes(20))).is_empty());
    assert!(fill_messages(&fixture, &fill(buffer, 4, BufferRange::Whole)).is_empty());
}

#[test]
fn test_fill_offset_and_size_cases() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(20, DST);

    assert_eq!(fill_messages(&fixture, &fill(buffer, 40, BufferRange::Bytes(4))), vec!["00024"]);
    assert_eq!(fill_messages(&fixture, &fill(buffer, 1, BufferRange::Bytes(4))), vec!["00025"]);
    assert_eq!(fill_messages(&fixture, &fill(buffer, 4, BufferRange::Bytes(0))), vec!["00026"]);
    assert_eq!(fill_messages(&fixture, &fill(buffer, 0, BufferRange::Bytes(24))), vec!["00027"]);
    assert_eq!(fill_messages(&fixture, &fill(buffer, 0, BufferRange::Bytes(2))), vec!["00028"]);
}

#[test]
fn test_fill_usage_and_memory() {
    let mut fixture = RuleFixture::new();
    let no_dst = fixture.buffer(20, BufferUsageFlags::TRANSFER_SRC);
    assert_eq!(fill_messages(&fixture, &fill(no_dst, 0, BufferRange::Whole)), vec!["00029"]);

    let unbound = fixture.unbound_buffer(BufferCreateInfo::new(20, DST));
    assert_eq!(fill_messages(&fixture, &fill(unbound, 0, BufferRange::Whole)), vec!["00031"]);
}

#[test]
fn test_fill_on_transfer_only_queue() {
    let mut fixture = RuleFixture::new();
    fixture.queue_flags = QueueFlags::TRANSFER;
    let mut out = Vec::new();
    check_fill_queue(&fixture.env(CallShape::CmdFillBuffer), &mut out);
    assert_eq!(out.len(), 1);

    let mut fixture = RuleFixture::with_features(DeviceFeatures { maintenance1: true, ..DeviceFeatures::default() });
    fixture.queue_flags = QueueFlags::TRANSFER;
    let mut out = Vec::new();
    check_fill_queue(&fixture.env(CallShape::CmdFillBuffer), &mut out);
    assert!(out.is_empty());
}

// ============================================================================
// UPDATE TESTS
// ============================================================================

#[test]
fn test_valid_update() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, DST);
    let info = UpdateBufferInfo::new(buffer, 0, vec![0u8; 64]);
    assert!(update_messages(&fixture, &info).is_empty());
}

#[test]
fn test_update_offset_and_size_cases() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, DST);

    let past_end = UpdateBufferInfo::new(buffer, 64, vec![0u8; 4]);
    assert_eq!(update_messages(&fixture, &past_end), vec!["00032"]);

    let too_long = UpdateBufferInfo::new(buffer, 32, vec![0u8; 64]);
    assert_eq!(update_messages(&fixture, &too_long), vec!["00033"]);

    let misaligned_offset = UpdateBufferInfo::new(buffer, 2, vec![0u8; 4]);
    assert_eq!(update_messages(&fixture, &misaligned_offset), vec!["00036"]);

    let misaligned_size = UpdateBufferInfo::new(buffer, 0, vec![0u8; 6]);
    assert_eq!(update_messages(&fixture, &misaligned_size), vec!["00038"]);
}

#[test]
fn test_update_size_bounds_alone() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, DST);

    for data_size in [80_000, u64::MAX - 43] {
        let info = UpdateBufferInfo::new(buffer, 0, vec![0u8; 4]).with_data_size(data_size);
        assert_eq!(update_messages(&fixture, &info), vec!["00037"], "dataSize {}", data_size);
    }

    let empty = UpdateBufferInfo::new(buffer, 0, Vec::new());
    assert_eq!(update_messages(&fixture, &empty), vec!["00037"]);
}

#[test]
fn test_update_size_bound_message() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, DST);
    let info = UpdateBufferInfo::new(buffer, 0, Vec::new()).with_data_size(80_000);
    let out = messages(check_update_size_bounds, &info, &fixture.env(CallShape::CmdUpdateBuffer));
    assert!(out[0].contains("must be greater than zero and less than or equal to 65536"));
}

#[test]
fn test_update_usage_and_memory() {
    let mut fixture = RuleFixture::new();
    let no_dst = fixture.buffer(64, BufferUsageFlags::TRANSFER_SRC);
    assert_eq!(update_messages(&fixture, &UpdateBufferInfo::new(no_dst, 0, vec![0u8; 4])), vec!["00034"]);

    let unbound = fixture.unbound_buffer(BufferCreateInfo::new(64, DST));
    assert_eq!(update_messages(&fixture, &UpdateBufferInfo::new(unbound, 0, vec![0u8; 4])), vec!["00035"]);
}

#[test]
fn test_transfer_commands_outside_render_pass() {
    let mut fixture = RuleFixture::new();
    fixture.state.render_pass_active = true;
    let mut out = Vec::new();
    crate::rules::support::check_outside_render_pass(&fixture.env(CallShape::CmdFillBuffer), &mut out);
    assert_eq!(out, vec!["vkCmdFillBuffer must only be called outside of a render pass instance.".to_string()]);
}
