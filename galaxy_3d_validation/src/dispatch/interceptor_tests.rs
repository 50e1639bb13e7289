//! Unit tests for interceptor.rs

use slotmap::Key;
use crate::device::buffer::{BufferRange, BufferUsageFlags};
use crate::device::command::FillBufferInfo;
use crate::dispatch::{Call, CallShape, Interceptor};
use crate::registry::{BufferKey, BufferRecord, CommandBufferKey};
use crate::report::{Severity, ViolationKind};
use crate::rules::rule::{Check, Env, Operand, Operands, Rule};
use crate::rules::testing::RuleFixture;
use crate::rules::RuleCatalog;

fn always(_info: &FillBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    out.push("fired".to_string());
}

fn always_on_command(_env: &Env<'_>, out: &mut Vec<String>) {
    out.push("fired".to_string());
}

fn fill(dst_buffer: BufferKey) -> FillBufferInfo {
    FillBufferInfo { dst_buffer, dst_offset: 0, size: BufferRange::Whole, data: 0 }
}

fn interceptor(rules: Vec<Rule>) -> Interceptor {
    Interceptor::new(RuleCatalog::from_rules(rules).unwrap())
}

fn stale_buffer(fixture: &mut RuleFixture) -> BufferKey {
    let buffer = fixture.buffer(64, BufferUsageFlags::TRANSFER_DST);
    fixture.registry.destroy::<BufferRecord>(buffer).unwrap();
    buffer
}

// ============================================================================
// RESOLVE TESTS
// ============================================================================

#[test]
fn test_resolve_live_operands_only() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, BufferUsageFlags::TRANSFER_DST);
    let info = fill(buffer);
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    assert_eq!(Interceptor::resolve(&call, &fixture.registry), Operands::DST_BUFFER);
}

#[test]
fn test_resolve_stale_operand() {
    let mut fixture = RuleFixture::new();
    let buffer = stale_buffer(&mut fixture);
    let info = fill(buffer);
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    assert!(Interceptor::resolve(&call, &fixture.registry).is_empty());
}

// ============================================================================
// HANDLE CHECK TESTS
// ============================================================================

#[test]
fn test_required_parameter_message() {
    let fixture = RuleFixture::new();
    let interceptor = interceptor(vec![Rule::required(
        "UNASSIGNED-GeneralParameterError-RequiredParameter",
        CallShape::CmdFillBuffer,
        &[Operand::DstBuffer],
    )]);
    let info = fill(BufferKey::null());
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    let findings = interceptor.evaluate(&call, fixture.env(CallShape::CmdFillBuffer));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].message, "dstBuffer must not be VK_NULL_HANDLE.");
    assert_eq!(findings[0].kind, ViolationKind::InvalidHandle);
}

#[test]
fn test_handle_rule_reports_stale_handle() {
    let mut fixture = RuleFixture::new();
    let buffer = stale_buffer(&mut fixture);
    let interceptor = interceptor(vec![Rule::handle(
        "VUID-vkCmdFillBuffer-dstBuffer-parameter",
        CallShape::CmdFillBuffer,
        Operand::DstBuffer,
    )]);
    let info = fill(buffer);
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    let findings = interceptor.evaluate(&call, fixture.env(CallShape::CmdFillBuffer));
    assert_eq!(findings.len(), 1);
    assert!(findings[0].message.starts_with("dstBuffer: Invalid VkBuffer Object 0x"));
    assert!(findings[0].message.ends_with('.'));
}

#[test]
fn test_handle_rule_leaves_null_to_required_rule() {
    let fixture = RuleFixture::new();
    let interceptor = interceptor(vec![Rule::handle(
        "VUID-vkCmdFillBuffer-dstBuffer-parameter",
        CallShape::CmdFillBuffer,
        Operand::DstBuffer,
    )]);
    let info = fill(BufferKey::null());
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    assert!(interceptor.evaluate(&call, fixture.env(CallShape::CmdFillBuffer)).is_empty());
}

#[test]
fn test_valid_handle_rule_reports_null() {
    let fixture = RuleFixture::new();
    let interceptor = interceptor(vec![Rule::valid_handle(
        "VUID-vkCmdFillBuffer-commandBuffer-parameter",
        CallShape::CmdFillBuffer,
        Operand::CommandBuffer,
    )]);
    let info = fill(BufferKey::null());
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    let findings = interceptor.evaluate(&call, fixture.env(CallShape::CmdFillBuffer));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].message, "commandBuffer: VkCommandBuffer is VK_NULL_HANDLE.");
}

// ============================================================================
// RULE GATING TESTS
// ============================================================================

#[test]
fn test_rule_skipped_when_operand_unresolved() {
    let mut fixture = RuleFixture::new();
    let buffer = stale_buffer(&mut fixture);
    let interceptor = interceptor(vec![Rule::usage(
        "VUID-test-needs-dst",
        CallShape::CmdFillBuffer,
        Operands::DST_BUFFER,
        Check::FillBuffer(always),
    )]);
    let info = fill(buffer);
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    // The fixture env claims everything resolved; evaluate recomputes it
    assert!(interceptor.evaluate(&call, fixture.env(CallShape::CmdFillBuffer)).is_empty());
}

#[test]
fn test_rule_runs_when_operand_resolved() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, BufferUsageFlags::TRANSFER_DST);
    let interceptor = interceptor(vec![Rule::usage(
        "VUID-test-needs-dst",
        CallShape::CmdFillBuffer,
        Operands::DST_BUFFER,
        Check::FillBuffer(always),
    )]);
    let info = fill(buffer);
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    let findings = interceptor.evaluate(&call, fixture.env(CallShape::CmdFillBuffer));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id, "VUID-test-needs-dst");
    assert_eq!(findings[0].severity, Severity::Error);
}

#[test]
fn test_advisory_rules_need_best_practices() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, BufferUsageFlags::TRANSFER_DST);
    let interceptor = interceptor(vec![Rule::advisory(
        "BestPractices-test",
        CallShape::CmdFillBuffer,
        Operands::empty(),
        Check::FillBuffer(always),
    )]);
    let info = fill(buffer);
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    assert!(interceptor.evaluate(&call, fixture.env(CallShape::CmdFillBuffer)).is_empty());

    fixture.config.best_practices = true;
    let findings = interceptor.evaluate(&call, fixture.env(CallShape::CmdFillBuffer));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Warning);
}

#[test]
fn test_findings_follow_catalog_order() {
    let mut fixture = RuleFixture::new();
    let buffer = fixture.buffer(64, BufferUsageFlags::TRANSFER_DST);
    let interceptor = interceptor(vec![
        Rule::usage("VUID-test-b", CallShape::CmdFillBuffer, Operands::empty(), Check::FillBuffer(always)),
        Rule::usage("VUID-test-other-shape", CallShape::CmdDraw, Operands::empty(), Check::Command(always_on_command)),
        Rule::usage("VUID-test-a", CallShape::CmdFillBuffer, Operands::empty(), Check::FillBuffer(always)),
    ]);
    let info = fill(buffer);
    let call = Call::CmdFillBuffer(CommandBufferKey::null(), &info);

    let ids: Vec<&str> = interceptor
        .evaluate(&call, fixture.env(CallShape::CmdFillBuffer))
        .iter()
        .map(|finding| finding.rule_id)
        .collect();
    assert_eq!(ids, vec!["VUID-test-b", "VUID-test-a"]);
}
