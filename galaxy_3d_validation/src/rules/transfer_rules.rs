/// Fill and inline update rules

use crate::device::buffer::{BufferRange, BufferUsageFlags2};
use crate::device::command::{FillBufferInfo, QueueFlags, UpdateBufferInfo};
use crate::dispatch::CallShape;
use crate::registry::BufferKey;
use crate::rules::rule::{Check, Env, Operand, Operands, Rule};
use crate::rules::support::{buffer_name, check_outside_render_pass, has_live_memory, no_memory_message};

/// Largest inline update, in bytes
pub const MAX_UPDATE_DATA_SIZE: u64 = 65536;

pub(crate) fn rules() -> Vec<Rule> {
    use CallShape::*;
    let none = Operands::empty();
    let dst = Operands::DST_BUFFER;

    vec![
        // fill
        Rule::required("UNASSIGNED-GeneralParameterError-RequiredParameter", CmdFillBuffer, &[Operand::DstBuffer]),
        Rule::handle("VUID-vkCmdFillBuffer-dstBuffer-parameter", CmdFillBuffer, Operand::DstBuffer),
        Rule::usage("VUID-vkCmdFillBuffer-dstOffset-00024", CmdFillBuffer, dst, Check::FillBuffer(check_fill_offset_in_buffer)),
        Rule::usage("VUID-vkCmdFillBuffer-dstOffset-00025", CmdFillBuffer, none, Check::FillBuffer(check_fill_offset_alignment)),
        Rule::usage("VUID-vkCmdFillBuffer-size-00026", CmdFillBuffer, none, Check::FillBuffer(check_fill_size_not_zero)),
        Rule::usage("VUID-vkCmdFillBuffer-size-00027", CmdFillBuffer, dst, Check::FillBuffer(check_fill_size_fits)),
        Rule::usage("VUID-vkCmdFillBuffer-size-00028", CmdFillBuffer, none, Check::FillBuffer(check_fill_size_alignment)),
        Rule::usage("VUID-vkCmdFillBuffer-dstBuffer-00029", CmdFillBuffer, dst, Check::FillBuffer(check_fill_usage)),
        Rule::usage("VUID-vkCmdFillBuffer-dstBuffer-00031", CmdFillBuffer, dst, Check::FillBuffer(check_fill_memory)),
        Rule::usage("VUID-vkCmdFillBuffer-renderpass", CmdFillBuffer, none, Check::Command(check_outside_render_pass)),
        Rule::usage("VUID-vkCmdFillBuffer-apiVersion-07894", CmdFillBuffer, Operands::COMMAND_BUFFER, Check::Command(check_fill_queue)),
        // update
        Rule::required("UNASSIGNED-GeneralParameterError-RequiredParameter", CmdUpdateBuffer, &[Operand::DstBuffer]),
        Rule::handle("VUID-vkCmdUpdateBuffer-dstBuffer-parameter", CmdUpdateBuffer, Operand::DstBuffer),
        Rule::usage("VUID-vkCmdUpdateBuffer-dstOffset-00032", CmdUpdateBuffer, dst, Check::UpdateBuffer(check_update_offset_in_buffer)),
        Rule::usage("VUID-vkCmdUpdateBuffer-dataSize-00033", CmdUpdateBuffer, dst, Check::UpdateBuffer(check_update_size_fits)),
        Rule::usage("VUID-vkCmdUpdateBuffer-dstBuffer-00034", CmdUpdateBuffer, dst, Check::UpdateBuffer(check_update_usage)),
        Rule::usage("VUID-vkCmdUpdateBuffer-dstBuffer-00035", CmdUpdateBuffer, dst, Check::UpdateBuffer(check_update_memory)),
        Rule::usage("VUID-vkCmdUpdateBuffer-dstOffset-00036", CmdUpdateBuffer, none, Check::UpdateBuffer(check_update_offset_alignment)),
        Rule::usage("VUID-vkCmdUpdateBuffer-dataSize-00037", CmdUpdateBuffer, none, Check::UpdateBuffer(check_update_size_bounds)),
        Rule::usage("VUID-vkCmdUpdateBuffer-dataSize-00038", CmdUpdateBuffer, none, Check::UpdateBuffer(check_update_size_alignment)),
        Rule::usage("VUID-vkCmdUpdateBuffer-renderpass", CmdUpdateBuffer, none, Check::Command(check_outside_render_pass)),
    ]
}

fn check_transfer_dst_usage(env: &Env<'_>, key: BufferKey, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(key) {
        if !buffer.usage().contains(BufferUsageFlags2::TRANSFER_DST) {
            out.push(format!(
                "dstBuffer ({}) was created with usage {:?}, which lacks VK_BUFFER_USAGE_TRANSFER_DST_BIT.",
                buffer_name(key),
                buffer.usage()
            ));
        }
    }
}

fn check_bound(env: &Env<'_>, key: BufferKey, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(key) {
        if !has_live_memory(env, buffer) {
            out.push(no_memory_message(key, buffer, env));
        }
    }
}

// ===== FILL =====

fn check_fill_offset_in_buffer(info: &FillBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.dst_buffer) {
        if info.dst_offset >= buffer.size() {
            out.push(format!(
                "dstOffset ({}) is not less than the size of dstBuffer ({}).",
                info.dst_offset,
                buffer.size()
            ));
        }
    }
}

fn check_fill_offset_alignment(info: &FillBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.dst_offset % 4 != 0 {
        out.push(format!("dstOffset ({}) is not a multiple of 4.", info.dst_offset));
    }
}

fn check_fill_size_not_zero(info: &FillBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.size == BufferRange::Bytes(0) {
        out.push("size must be greater than 0.".to_string());
    }
}

fn check_fill_size_fits(info: &FillBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let BufferRange::Bytes(size) = info.size else { return };
    let Some(buffer) = env.buffer(info.dst_buffer) else { return };
    if info.dst_offset < buffer.size() && size > buffer.size() - info.dst_offset {
        out.push(format!(
            "size ({}) is greater than the size of dstBuffer ({}) minus dstOffset ({}).",
            size,
            buffer.size(),
            info.dst_offset
        ));
    }
}

fn check_fill_size_alignment(info: &FillBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if let BufferRange::Bytes(size) = info.size {
        if size % 4 != 0 {
            out.push(format!("size ({}) is not a multiple of 4.", size));
        }
    }
}

fn check_fill_usage(info: &FillBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    check_transfer_dst_usage(env, info.dst_buffer, out);
}

fn check_fill_memory(info: &FillBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    check_bound(env, info.dst_buffer, out);
}

/// Before maintenance1, fills need a graphics or compute queue
fn check_fill_queue(env: &Env<'_>, out: &mut Vec<String>) {
    if env.features().maintenance1 {
        return;
    }
    if let Some(flags) = env.queue_flags {
        if !flags.intersects(QueueFlags::GRAPHICS | QueueFlags::COMPUTE) {
            out.push(format!(
                "the command pool's queue family supports {:?}; without maintenance1, vkCmdFillBuffer needs graphics or compute operations.",
                flags
            ));
        }
    }
}

// ===== UPDATE =====

fn check_update_offset_in_buffer(info: &UpdateBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.dst_buffer) {
        if info.dst_offset >= buffer.size() {
            out.push(format!(
                "dstOffset ({}) is not less than the size of dstBuffer ({}).",
                info.dst_offset,
                buffer.size()
            ));
        }
    }
}

fn update_size_in_bounds(data_size: u64) -> bool {
    data_size > 0 && data_size <= MAX_UPDATE_DATA_SIZE
}

fn check_update_size_fits(info: &UpdateBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    // Sizes outside (0, 65536] are reported by the size bound rule
    if !update_size_in_bounds(info.data_size) {
        return;
    }
    let Some(buffer) = env.buffer(info.dst_buffer) else { return };
    if info.dst_offset < buffer.size() && info.data_size > buffer.size() - info.dst_offset {
        out.push(format!(
            "dataSize ({}) is greater than the size of dstBuffer ({}) minus dstOffset ({}).",
            info.data_size,
            buffer.size(),
            info.dst_offset
        ));
    }
}

fn check_update_usage(info: &UpdateBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    check_transfer_dst_usage(env, info.dst_buffer, out);
}

fn check_update_memory(info: &UpdateBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    check_bound(env, info.dst_buffer, out);
}

fn check_update_offset_alignment(info: &UpdateBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.dst_offset % 4 != 0 {
        out.push(format!("dstOffset ({}) is not a multiple of 4.", info.dst_offset));
    }
}

fn check_update_size_bounds(info: &UpdateBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if !update_size_in_bounds(info.data_size) {
        out.push(format!(
            "dataSize ({}) must be greater than zero and less than or equal to {}.",
            info.data_size, MAX_UPDATE_DATA_SIZE
        ));
    }
}

fn check_update_size_alignment(info: &UpdateBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.data_size % 4 != 0 {
        out.push(format!("dataSize ({}) is not a multiple of 4.", info.data_size));
    }
}

#[cfg(test)]
#[path = "transfer_rules_tests.rs"]
mod tests;
