//! Unit tests for conditional_rules.rs

use super::*;
use crate::device::buffer::{BufferCreateInfo, BufferUsageFlags};
use crate::device::capabilities::DeviceFeatures;
use crate::device::command::ConditionalRenderingBeginInfo;
use crate::dispatch::CallShape;
use crate::registry::BufferKey;
use crate::rules::testing::{assert_well_formed, messages, RuleFixture};

fn begin(buffer: BufferKey, offset: u64) -> ConditionalRenderingBeginInfo {
    ConditionalRenderingBeginInfo { buffer, offset, inverted: false }
}

fn run_command(fixture: &RuleFixture, shape: CallShape, check: fn(&Env<'_>, &mut Vec<String>)) -> Vec<String> {
    let mut out = Vec::new();
    check(&fixture.env(shape), &mut out);
    out
}

#[test]
fn test_rules_are_well_formed() {
    assert_well_formed(&rules());
}

// ============================================================================
// FEATURE AND SCOPE TESTS
// ============================================================================

#[test]
fn test_extension_must_be_enabled() {
    let fixture = RuleFixture::new();
    let out = run_command(&fixture, CallShape::CmdBeginConditionalRendering, check_extension_enabled);
    assert_eq!(out.len(), 1);
    assert!(out[0].starts_with("vkCmdBeginConditionalRenderingEXT"));

    let fixture = RuleFixture::with_features(DeviceFeatures { conditional_rendering: true, ..DeviceFeatures::default() });
    assert!(run_command(&fixture, CallShape::CmdEndConditionalRendering, check_extension_enabled).is_empty());
}

#[test]
fn test_nested_begin_and_unmatched_end() {
    let mut fixture = RuleFixture::new();
    assert!(run_command(&fixture, CallShape::CmdBeginConditionalRendering, check_not_active).is_empty());
    assert_eq!(run_command(&fixture, CallShape::CmdEndConditionalRendering, check_active).len(), 1);

    fixture.state.conditional_rendering_active = true;
    assert_eq!(run_command(&fixture, CallShape::CmdBeginConditionalRendering, check_not_active).len(), 1);
    assert!(run_command(&fixture, CallShape::CmdEndConditionalRendering, check_active).is_empty());
}

// ============================================================================
// PREDICATE BUFFER TESTS
// ============================================================================

#[test]
fn test_predicate_buffer_memory_and_usage() {
    let mut fixture = RuleFixture::new();
    let unbound = fixture.unbound_buffer(BufferCreateInfo::new(64, BufferUsageFlags::CONDITIONAL_RENDERING));
    let wrong_usage = fixture.buffer(64, BufferUsageFlags::UNIFORM_BUFFER);
    let env = fixture.env(CallShape::CmdBeginConditionalRendering);

    assert_eq!(messages(check_memory_bound, &begin(unbound, 0), &env).len(), 1);
    assert!(messages(check_usage, &begin(unbound, 0), &env).is_empty());
    assert_eq!(messages(check_usage, &begin(wrong_usage, 0), &env).len(), 1);
}

#[test]
fn test_predicate_must_fit() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, BufferUsageFlags::CONDITIONAL_RENDERING);
    let env = fixture.env(CallShape::CmdBeginConditionalRendering);

    assert!(messages(check_predicate_in_buffer, &begin(buffer, 60), &env).is_empty());
    assert_eq!(messages(check_predicate_in_buffer, &begin(buffer, 64), &env).len(), 1);
    assert_eq!(messages(check_predicate_in_buffer, &begin(buffer, u64::MAX), &env).len(), 1);
}

#[test]
fn test_predicate_offset_alignment() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, BufferUsageFlags::CONDITIONAL_RENDERING);
    let env = fixture.env(CallShape::CmdBeginConditionalRendering);

    assert_eq!(messages(check_offset_alignment, &begin(buffer, 2), &env).len(), 1);
    assert!(messages(check_offset_alignment, &begin(buffer, 8), &env).is_empty());
}
