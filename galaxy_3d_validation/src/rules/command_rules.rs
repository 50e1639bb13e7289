/// Command buffer lifecycle rules and the rules shared by every recorded
/// command

use std::sync::PoisonError;
use slotmap::Key;
use crate::device::command::CommandPoolCreateInfo;
use crate::dispatch::CallShape;
use crate::registry::{CommandBufferKey, CommandBufferRecord, HandleRef, ObjectKind};
use crate::rules::rule::{Check, Env, Operand, Operands, Rule};

/// Id of the concurrent-recording rule
pub const MULTIPLE_THREADS_WRITE: &str = "UNASSIGNED-Threading-MultipleThreads-Write";

pub(crate) fn rules() -> Vec<Rule> {
    use CallShape::*;
    let command_buffer = Operands::COMMAND_BUFFER;

    let mut rules = vec![
        Rule::usage(
            "VUID-vkCreateCommandPool-queueFamilyIndex-01937",
            CreateCommandPool,
            Operands::empty(),
            Check::CreateCommandPool(check_queue_family_exists),
        ),
        Rule::required("UNASSIGNED-GeneralParameterError-RequiredParameter", AllocateCommandBuffer, &[Operand::CommandPool]),
        Rule::handle("VUID-VkCommandBufferAllocateInfo-commandPool-parameter", AllocateCommandBuffer, Operand::CommandPool),
        Rule::handle("VUID-vkFreeCommandBuffers-pCommandBuffers-00048", FreeCommandBuffer, Operand::CommandBuffer),
        // begin
        Rule::valid_handle("VUID-vkBeginCommandBuffer-commandBuffer-parameter", BeginCommandBuffer, Operand::CommandBuffer),
        Rule::usage("VUID-vkBeginCommandBuffer-commandBuffer-00049", BeginCommandBuffer, command_buffer, Check::Command(check_not_recording)),
        Rule::usage(MULTIPLE_THREADS_WRITE, BeginCommandBuffer, command_buffer, Check::Command(check_single_writer)),
        // end
        Rule::valid_handle("VUID-vkEndCommandBuffer-commandBuffer-parameter", EndCommandBuffer, Operand::CommandBuffer),
        Rule::usage("VUID-vkEndCommandBuffer-commandBuffer-00059", EndCommandBuffer, command_buffer, Check::Command(check_recording)),
        Rule::usage("VUID-vkEndCommandBuffer-commandBuffer-00060", EndCommandBuffer, command_buffer, Check::Command(check_render_pass_closed)),
        Rule::usage("VUID-vkEndCommandBuffer-None-01978", EndCommandBuffer, command_buffer, Check::Command(check_conditional_rendering_closed)),
        Rule::usage(
            "CoreValidation-DrawState-InvalidCommandBuffer-VkBuffer",
            EndCommandBuffer,
            command_buffer,
            Check::Command(check_not_invalidated_by_buffer),
        ),
        Rule::usage(
            "CoreValidation-DrawState-InvalidCommandBuffer-VkBufferView",
            EndCommandBuffer,
            command_buffer,
            Check::Command(check_not_invalidated_by_view),
        ),
        Rule::usage(MULTIPLE_THREADS_WRITE, EndCommandBuffer, command_buffer, Check::Command(check_single_writer)),
        // submit
        Rule::handle_array("VUID-VkSubmitInfo-pCommandBuffers-parameter", QueueSubmit, Check::QueueSubmit(check_submitted_handles)),
        Rule::usage(
            "CoreValidation-DrawState-InvalidCommandBuffer-VkBuffer",
            QueueSubmit,
            Operands::empty(),
            Check::QueueSubmit(check_submitted_not_invalidated_by_buffer),
        ),
        Rule::usage(
            "CoreValidation-DrawState-InvalidCommandBuffer-VkBufferView",
            QueueSubmit,
            Operands::empty(),
            Check::QueueSubmit(check_submitted_not_invalidated_by_view),
        ),
        Rule::usage(
            "VUID-vkQueueSubmit-pCommandBuffers-00070",
            QueueSubmit,
            Operands::empty(),
            Check::QueueSubmit(check_submitted_executable),
        ),
    ];

    rules.extend(CallShape::ALL.iter().flat_map(|shape| common_command_rules(*shape)));
    rules
}

/// Rules every recorded command carries, ahead of its own family
pub(crate) fn common_command_rules(shape: CallShape) -> Vec<Rule> {
    let Some(ids) = shape.command_ids() else { return Vec::new() };
    let command_buffer = Operands::COMMAND_BUFFER;
    vec![
        Rule::valid_handle(ids.parameter, shape, Operand::CommandBuffer),
        Rule::usage(ids.recording, shape, command_buffer, Check::Command(check_recording)),
        Rule::usage(ids.cmdpool, shape, command_buffer, Check::Command(check_queue_support)),
        Rule::usage(MULTIPLE_THREADS_WRITE, shape, command_buffer, Check::Command(check_single_writer)),
    ]
}

// ===== RECORDING =====

fn check_queue_family_exists(info: &CommandPoolCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if env.capabilities.queue_flags(info.queue_family_index).is_none() {
        out.push(format!(
            "queueFamilyIndex ({}) is not a queue family of this device ({} families).",
            info.queue_family_index,
            env.capabilities.queue_families.len()
        ));
    }
}

fn check_recording(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| !state.is_recording()) {
        out.push(format!(
            "{}: the command buffer is not in the recording state; call vkBeginCommandBuffer() first.",
            env.shape.name()
        ));
    }
}

fn check_not_recording(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| state.is_recording()) {
        out.push("the command buffer is already in the recording state; call vkEndCommandBuffer() first.".to_string());
    }
}

fn check_queue_support(env: &Env<'_>, out: &mut Vec<String>) {
    let Some(flags) = env.queue_flags else { return };
    let required = env.shape.required_queue();
    if !flags.intersects(required) {
        out.push(format!(
            "{} needs a queue family supporting one of {:?}, but the command pool's family supports {:?}.",
            env.shape.name(),
            required,
            flags
        ));
    }
}

fn check_single_writer(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| state.recorded_by_other_thread(env.thread)) {
        out.push(format!(
            "{}: the command buffer is being recorded by another thread ({:?} calls while another thread owns the recording).",
            env.shape.name(),
            env.thread
        ));
    }
}

fn check_render_pass_closed(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| state.render_pass_active) {
        out.push("a render pass instance is still active; call vkCmdEndRenderPass() first.".to_string());
    }
}

fn check_conditional_rendering_closed(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| state.conditional_rendering_active) {
        out.push("conditional rendering is still active; call vkCmdEndConditionalRenderingEXT() first.".to_string());
    }
}

fn invalidated_message(cause: ObjectKind) -> String {
    format!(
        "the command buffer is invalid because a bound {} was destroyed.",
        cause.api_name()
    )
}

fn check_not_invalidated_by(env: &Env<'_>, cause: ObjectKind, out: &mut Vec<String>) {
    if env.command_buffer.and_then(|state| state.invalid_cause()) == Some(cause) {
        out.push(invalidated_message(cause));
    }
}

fn check_not_invalidated_by_buffer(env: &Env<'_>, out: &mut Vec<String>) {
    check_not_invalidated_by(env, ObjectKind::Buffer, out);
}

fn check_not_invalidated_by_view(env: &Env<'_>, out: &mut Vec<String>) {
    check_not_invalidated_by(env, ObjectKind::BufferView, out);
}

// ===== SUBMISSION =====

/// Live submitted command buffers, with their position in the submission
fn live_submitted<'a>(command_buffers: &[CommandBufferKey], env: &Env<'a>) -> Vec<(usize, &'a CommandBufferRecord)> {
    command_buffers
        .iter()
        .enumerate()
        .filter_map(|(i, key)| env.registry.command_buffer(*key).map(|record| (i, record)))
        .collect()
}

fn check_submitted_handles(command_buffers: &[CommandBufferKey], env: &Env<'_>, out: &mut Vec<String>) {
    for (i, key) in command_buffers.iter().enumerate() {
        if key.is_null() {
            out.push(format!("pCommandBuffers[{}] is VK_NULL_HANDLE.", i));
        } else if env.registry.command_buffer(*key).is_none() {
            out.push(format!("pCommandBuffers[{}] is an invalid {}.", i, HandleRef::CommandBuffer(*key)));
        }
    }
}

fn check_submitted_invalidated_by(command_buffers: &[CommandBufferKey], env: &Env<'_>, cause: ObjectKind, out: &mut Vec<String>) {
    for (i, record) in live_submitted(command_buffers, env) {
        let state = record.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.invalid_cause() == Some(cause) {
            out.push(format!("pCommandBuffers[{}]: {}", i, invalidated_message(cause)));
        }
    }
}

fn check_submitted_not_invalidated_by_buffer(command_buffers: &[CommandBufferKey], env: &Env<'_>, out: &mut Vec<String>) {
    check_submitted_invalidated_by(command_buffers, env, ObjectKind::Buffer, out);
}

fn check_submitted_not_invalidated_by_view(command_buffers: &[CommandBufferKey], env: &Env<'_>, out: &mut Vec<String>) {
    check_submitted_invalidated_by(command_buffers, env, ObjectKind::BufferView, out);
}

/// Invalid command buffers are reported by their own rules
fn check_submitted_executable(command_buffers: &[CommandBufferKey], env: &Env<'_>, out: &mut Vec<String>) {
    for (i, record) in live_submitted(command_buffers, env) {
        let state = record.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.is_executable() && state.invalid_cause().is_none() {
            out.push(format!(
                "pCommandBuffers[{}] is in the {:?} state, not the executable state.",
                i, state.recording
            ));
        }
    }
}

#[cfg(test)]
#[path = "command_rules_tests.rs"]
mod tests;
