/// Conditional rendering rules

use crate::device::buffer::BufferUsageFlags2;
use crate::device::command::ConditionalRenderingBeginInfo;
use crate::dispatch::CallShape;
use crate::rules::rule::{Check, Env, Operand, Operands, Rule};
use crate::rules::support::{buffer_name, has_live_memory, no_memory_message};

/// Size of the predicate read at the offset
const PREDICATE_SIZE: u64 = 4;

pub(crate) fn rules() -> Vec<Rule> {
    use CallShape::*;
    let none = Operands::empty();
    let command_buffer = Operands::COMMAND_BUFFER;
    let buffer = Operands::BUFFER;

    vec![
        Rule::capability(
            "UNASSIGNED-GeneralParameterError-ExtensionNotEnabled",
            CmdBeginConditionalRendering,
            none,
            Check::Command(check_extension_enabled),
        ),
        Rule::usage(
            "VUID-vkCmdBeginConditionalRenderingEXT-None-01980",
            CmdBeginConditionalRendering,
            command_buffer,
            Check::Command(check_not_active),
        ),
        Rule::required("UNASSIGNED-GeneralParameterError-RequiredParameter", CmdBeginConditionalRendering, &[Operand::Buffer]),
        Rule::handle("VUID-VkConditionalRenderingBeginInfoEXT-buffer-parameter", CmdBeginConditionalRendering, Operand::Buffer),
        Rule::usage(
            "VUID-VkConditionalRenderingBeginInfoEXT-buffer-01981",
            CmdBeginConditionalRendering,
            buffer,
            Check::BeginConditionalRendering(check_memory_bound),
        ),
        Rule::usage(
            "VUID-VkConditionalRenderingBeginInfoEXT-buffer-01982",
            CmdBeginConditionalRendering,
            buffer,
            Check::BeginConditionalRendering(check_usage),
        ),
        Rule::usage(
            "VUID-VkConditionalRenderingBeginInfoEXT-offset-01983",
            CmdBeginConditionalRendering,
            buffer,
            Check::BeginConditionalRendering(check_predicate_in_buffer),
        ),
        Rule::usage(
            "VUID-VkConditionalRenderingBeginInfoEXT-offset-01984",
            CmdBeginConditionalRendering,
            none,
            Check::BeginConditionalRendering(check_offset_alignment),
        ),
        Rule::capability(
            "UNASSIGNED-GeneralParameterError-ExtensionNotEnabled",
            CmdEndConditionalRendering,
            none,
            Check::Command(check_extension_enabled),
        ),
        Rule::usage(
            "VUID-vkCmdEndConditionalRenderingEXT-None-01985",
            CmdEndConditionalRendering,
            command_buffer,
            Check::Command(check_active),
        ),
    ]
}

fn check_extension_enabled(env: &Env<'_>, out: &mut Vec<String>) {
    if !env.features().conditional_rendering {
        out.push(format!(
            "{} requires the conditionalRendering feature, which was not enabled.",
            env.shape.name()
        ));
    }
}

fn check_not_active(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| state.conditional_rendering_active) {
        out.push("conditional rendering is already active in this command buffer.".to_string());
    }
}

fn check_active(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| !state.conditional_rendering_active) {
        out.push("conditional rendering is not active in this command buffer.".to_string());
    }
}

fn check_memory_bound(info: &ConditionalRenderingBeginInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if !has_live_memory(env, buffer) {
            out.push(no_memory_message(info.buffer, buffer, env));
        }
    }
}

fn check_usage(info: &ConditionalRenderingBeginInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if !buffer.usage().contains(BufferUsageFlags2::CONDITIONAL_RENDERING) {
            out.push(format!(
                "{} was created with usage {:?}, which lacks VK_BUFFER_USAGE_CONDITIONAL_RENDERING_BIT_EXT.",
                buffer_name(info.buffer),
                buffer.usage()
            ));
        }
    }
}

fn check_predicate_in_buffer(info: &ConditionalRenderingBeginInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if info.offset.saturating_add(PREDICATE_SIZE) > buffer.size() {
            out.push(format!(
                "offset ({}) leaves less than {} bytes of buffer ({} bytes) for the predicate.",
                info.offset,
                PREDICATE_SIZE,
                buffer.size()
            ));
        }
    }
}

fn check_offset_alignment(info: &ConditionalRenderingBeginInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.offset % PREDICATE_SIZE != 0 {
        out.push(format!("offset ({}) is not a multiple of 4.", info.offset));
    }
}

#[cfg(test)]
#[path = "conditional_rules_tests.rs"]
mod tests;
