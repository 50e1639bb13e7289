/// Draw-path rules: index and vertex bindings, pipelines, draws, render
/// pass scope and descriptor set binding

use slotmap::Key;
use crate::device::buffer::{BufferRange, BufferUsageFlags2, IndexType};
use crate::device::command::{BindIndexBufferInfo, BindVertexBuffersInfo, GraphicsPipelineDesc};
use crate::dispatch::CallShape;
use crate::registry::{BufferKey, BufferRecord, HandleRef};
use crate::rules::rule::{Check, Env, Operand, Operands, Rule};
use crate::rules::support::{buffer_name, has_live_memory, no_memory_message};

macro_rules! index_rules {
    ($shape:expr, $cmd:literal) => {{
        let buffer = Operands::BUFFER;
        let none = Operands::empty();
        vec![
            Rule::required("UNASSIGNED-GeneralParameterError-RequiredParameter", $shape, &[Operand::Buffer]),
            Rule::handle(concat!("VUID-", $cmd, "-buffer-parameter"), $shape, Operand::Buffer),
            Rule::usage(concat!("VUID-", $cmd, "-offset-08782"), $shape, buffer, Check::BindIndexBuffer(check_index_offset_in_buffer)),
            Rule::usage(concat!("VUID-", $cmd, "-offset-08783"), $shape, none, Check::BindIndexBuffer(check_index_offset_alignment)),
            Rule::capability(concat!("VUID-", $cmd, "-indexType-08787"), $shape, none, Check::BindIndexBuffer(check_index_type_uint8)),
            Rule::usage(concat!("VUID-", $cmd, "-buffer-08784"), $shape, buffer, Check::BindIndexBuffer(check_index_usage)),
            Rule::usage(concat!("VUID-", $cmd, "-buffer-08785"), $shape, buffer, Check::BindIndexBuffer(check_index_memory)),
        ]
    }};
}

pub(crate) fn rules() -> Vec<Rule> {
    use CallShape::*;
    let none = Operands::empty();
    let command_buffer = Operands::COMMAND_BUFFER;
    let buffer = Operands::BUFFER;

    let mut rules = index_rules!(CmdBindIndexBuffer, "vkCmdBindIndexBuffer");

    rules.push(Rule::capability(
        "UNASSIGNED-GeneralParameterError-ExtensionNotEnabled",
        CmdBindIndexBuffer2,
        none,
        Check::Command(check_maintenance5_enabled),
    ));
    rules.extend(index_rules!(CmdBindIndexBuffer2, "vkCmdBindIndexBuffer2KHR"));
    rules.extend([
        Rule::usage("VUID-vkCmdBindIndexBuffer2KHR-size-08767", CmdBindIndexBuffer2, none, Check::BindIndexBuffer(check_index_size_alignment)),
        Rule::usage("VUID-vkCmdBindIndexBuffer2KHR-size-08768", CmdBindIndexBuffer2, buffer, Check::BindIndexBuffer(check_index_size_fits)),
        // vertex buffers
        Rule::usage("VUID-vkCmdBindVertexBuffers-bindingCount-arraylength", CmdBindVertexBuffers, none, Check::BindVertexBuffers(check_binding_count)),
        Rule::usage("VUID-vkCmdBindVertexBuffers-firstBinding-00624", CmdBindVertexBuffers, none, Check::BindVertexBuffers(check_first_binding)),
        Rule::usage("VUID-vkCmdBindVertexBuffers-firstBinding-00625", CmdBindVertexBuffers, none, Check::BindVertexBuffers(check_binding_range)),
        Rule::handle_array("VUID-vkCmdBindVertexBuffers-pBuffers-04001", CmdBindVertexBuffers, Check::BindVertexBuffers(check_vertex_buffers_not_null)),
        Rule::handle_array("VUID-vkCmdBindVertexBuffers-pBuffers-parameter", CmdBindVertexBuffers, Check::BindVertexBuffers(check_vertex_buffer_handles)),
        Rule::usage("VUID-vkCmdBindVertexBuffers-pOffsets-00626", CmdBindVertexBuffers, none, Check::BindVertexBuffers(check_vertex_offsets)),
        Rule::usage("VUID-vkCmdBindVertexBuffers-pBuffers-00627", CmdBindVertexBuffers, none, Check::BindVertexBuffers(check_vertex_usage)),
        Rule::usage("VUID-vkCmdBindVertexBuffers-pBuffers-00628", CmdBindVertexBuffers, none, Check::BindVertexBuffers(check_vertex_memory)),
        // pipelines
        Rule::usage("VUID-VkVertexInputBindingDescription-binding-00618", CreateGraphicsPipeline, none, Check::CreateGraphicsPipeline(check_pipeline_binding_slots)),
        Rule::handle("VUID-vkDestroyPipeline-pipeline-parameter", DestroyPipeline, Operand::Pipeline),
        Rule::required("UNASSIGNED-GeneralParameterError-RequiredParameter", CmdBindPipeline, &[Operand::Pipeline]),
        Rule::handle("VUID-vkCmdBindPipeline-pipeline-parameter", CmdBindPipeline, Operand::Pipeline),
        // descriptor sets
        Rule::required("UNASSIGNED-GeneralParameterError-RequiredParameter", CmdBindDescriptorSet, &[Operand::DescriptorSet]),
        Rule::handle("VUID-vkCmdBindDescriptorSets-pDescriptorSets-parameter", CmdBindDescriptorSet, Operand::DescriptorSet),
        // draw
        Rule::usage("VUID-vkCmdDraw-renderpass", CmdDraw, command_buffer, Check::Command(check_inside_render_pass)),
        Rule::usage("VUID-vkCmdDraw-None-02700", CmdDraw, command_buffer, Check::Command(check_pipeline_bound)),
        Rule::usage("VUID-vkCmdDraw-None-04007", CmdDraw, command_buffer, Check::Command(check_vertex_bindings_filled)),
        // render pass scope
        Rule::usage("VUID-vkCmdBeginRenderPass-renderpass", CmdBeginRenderPass, command_buffer, Check::Command(check_not_in_render_pass)),
        Rule::usage("VUID-vkCmdEndRenderPass-renderpass", CmdEndRenderPass, command_buffer, Check::Command(check_inside_render_pass)),
    ]);
    rules
}

// ===== INDEX BUFFER =====

fn check_maintenance5_enabled(env: &Env<'_>, out: &mut Vec<String>) {
    if !env.features().maintenance5 {
        out.push("vkCmdBindIndexBuffer2KHR requires the maintenance5 feature, which was not enabled.".to_string());
    }
}

fn check_index_offset_in_buffer(info: &BindIndexBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if info.offset >= buffer.size() {
            out.push(format!(
                "offset ({}) is not less than the size of buffer ({}).",
                info.offset,
                buffer.size()
            ));
        }
    }
}

fn check_index_offset_alignment(info: &BindIndexBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    let index_size = info.index_type.size_bytes();
    if info.offset % index_size != 0 {
        out.push(format!(
            "offset ({}) is not a multiple of the size of {:?} ({}).",
            info.offset, info.index_type, index_size
        ));
    }
}

fn check_index_type_uint8(info: &BindIndexBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if info.index_type == IndexType::Uint8 && !env.features().index_type_uint8 {
        out.push("indexType is VK_INDEX_TYPE_UINT8_EXT but the indexTypeUint8 feature was not enabled.".to_string());
    }
}

fn check_index_usage(info: &BindIndexBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if !buffer.usage().contains(BufferUsageFlags2::INDEX_BUFFER) {
            out.push(format!(
                "{} was created with usage {:?}, which lacks VK_BUFFER_USAGE_INDEX_BUFFER_BIT.",
                buffer_name(info.buffer),
                buffer.usage()
            ));
        }
    }
}

fn check_index_memory(info: &BindIndexBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if !has_live_memory(env, buffer) {
            out.push(no_memory_message(info.buffer, buffer, env));
        }
    }
}

fn check_index_size_alignment(info: &BindIndexBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(BufferRange::Bytes(size)) = info.size {
        let index_size = info.index_type.size_bytes();
        if size % index_size != 0 {
            out.push(format!(
                "size ({}) is not a multiple of the size of {:?} ({}).",
                size, info.index_type, index_size
            ));
        }
    }
}

fn check_index_size_fits(info: &BindIndexBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let Some(BufferRange::Bytes(size)) = info.size else { return };
    let Some(buffer) = env.buffer(info.buffer) else { return };
    // Offsets past the end are reported by the offset rule
    if info.offset >= buffer.size() {
        return;
    }
    if size > buffer.size() - info.offset {
        out.push(format!(
            "offset ({}) + size ({}) is larger than the size of buffer ({}).",
            info.offset,
            size,
            buffer.size()
        ));
    }
}

// ===== VERTEX BUFFERS =====

fn check_binding_count(info: &BindVertexBuffersInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.bindings.is_empty() {
        out.push("bindingCount must be greater than 0.".to_string());
    }
}

/// Reported only past the last slot; a first binding at the limit is
/// caught by the binding range rule
fn check_first_binding(info: &BindVertexBuffersInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let max = env.capabilities.limits.max_vertex_input_bindings;
    if info.first_binding > max {
        out.push(format!(
            "firstBinding ({}) is greater than maxVertexInputBindings ({}).",
            info.first_binding, max
        ));
    }
}

fn check_binding_range(info: &BindVertexBuffersInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let max = env.capabilities.limits.max_vertex_input_bindings;
    if info.first_binding > max {
        return;
    }
    let end = u64::from(info.first_binding) + info.bindings.len() as u64;
    if end > u64::from(max) {
        out.push(format!(
            "firstBinding ({}) + bindingCount ({}) is greater than maxVertexInputBindings ({}).",
            info.first_binding,
            info.bindings.len(),
            max
        ));
    }
}

fn check_vertex_buffers_not_null(info: &BindVertexBuffersInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    for (i, binding) in info.bindings.iter().enumerate() {
        if binding.buffer.is_null() {
            out.push(format!("pBuffers[{}] is VK_NULL_HANDLE.", i));
        }
    }
}

fn check_vertex_buffer_handles(info: &BindVertexBuffersInfo, env: &Env<'_>, out: &mut Vec<String>) {
    for (i, binding) in info.bindings.iter().enumerate() {
        if !binding.buffer.is_null() && env.buffer(binding.buffer).is_none() {
            out.push(format!("pBuffers[{}] is an invalid {}.", i, HandleRef::Buffer(binding.buffer)));
        }
    }
}

/// Live buffers of a vertex bind: (binding index, offset, key, record)
fn live_vertex_buffers<'a>(
    info: &BindVertexBuffersInfo,
    env: &Env<'a>,
) -> Vec<(usize, u64, BufferKey, &'a BufferRecord)> {
    info.bindings
        .iter()
        .enumerate()
        .filter_map(|(i, binding)| env.buffer(binding.buffer).map(|record| (i, binding.offset, binding.buffer, record)))
        .collect()
}

fn check_vertex_offsets(info: &BindVertexBuffersInfo, env: &Env<'_>, out: &mut Vec<String>) {
    for (i, offset, _, buffer) in live_vertex_buffers(info, env) {
        if offset >= buffer.size() {
            out.push(format!(
                "pOffsets[{}] ({}) is not less than the size of pBuffers[{}] ({}).",
                i,
                offset,
                i,
                buffer.size()
            ));
        }
    }
}

fn check_vertex_usage(info: &BindVertexBuffersInfo, env: &Env<'_>, out: &mut Vec<String>) {
    for (i, _, key, buffer) in live_vertex_buffers(info, env) {
        if !buffer.usage().contains(BufferUsageFlags2::VERTEX_BUFFER) {
            out.push(format!(
                "pBuffers[{}] ({}) was created with usage {:?}, which lacks VK_BUFFER_USAGE_VERTEX_BUFFER_BIT.",
                i,
                buffer_name(key),
                buffer.usage()
            ));
        }
    }
}

fn check_vertex_memory(info: &BindVertexBuffersInfo, env: &Env<'_>, out: &mut Vec<String>) {
    for (_, _, key, buffer) in live_vertex_buffers(info, env) {
        if !has_live_memory(env, buffer) {
            out.push(no_memory_message(key, buffer, env));
        }
    }
}

// ===== PIPELINES AND DRAWS =====

fn check_pipeline_binding_slots(desc: &GraphicsPipelineDesc, env: &Env<'_>, out: &mut Vec<String>) {
    let max = env.capabilities.limits.max_vertex_input_bindings;
    for slot in desc.vertex_bindings.iter().filter(|slot| **slot >= max) {
        out.push(format!(
            "vertex input binding {} must be less than maxVertexInputBindings ({}).",
            slot, max
        ));
    }
}

fn check_inside_render_pass(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| !state.render_pass_active) {
        out.push(format!("{} must only be called inside of a render pass instance.", env.shape.name()));
    }
}

fn check_not_in_render_pass(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| state.render_pass_active) {
        out.push("a render pass instance is already active in this command buffer.".to_string());
    }
}

fn check_pipeline_bound(env: &Env<'_>, out: &mut Vec<String>) {
    let Some(state) = env.command_buffer else { return };
    match state.bound_pipeline {
        None => out.push("A valid graphics pipeline must be bound before drawing.".to_string()),
        Some(pipeline) if env.registry.pipeline(pipeline).is_none() => out.push(format!(
            "the bound {} has been destroyed.",
            HandleRef::Pipeline(pipeline)
        )),
        Some(_) => {}
    }
}

fn check_vertex_bindings_filled(env: &Env<'_>, out: &mut Vec<String>) {
    let Some(state) = env.command_buffer else { return };
    let Some(pipeline) = state.bound_pipeline.and_then(|key| env.registry.pipeline(key)) else { return };
    for slot in &pipeline.desc.vertex_bindings {
        if !state.vertex_bindings.contains_key(slot) {
            out.push(format!(
                "the bound pipeline reads vertex binding {} but no vertex buffer is bound to it.",
                slot
            ));
        }
    }
}

#[cfg(test)]
#[path = "draw_rules_tests.rs"]
mod tests;
