/// Buffer-to-buffer copy rules
///
/// `vkCmdCopyBuffer` and `vkCmdCopyBuffer2` share every check; only the
/// ids differ (`VkCopyBufferInfo2` / `VkBufferCopy2` for the second).

use crate::device::buffer::BufferUsageFlags2;
use crate::device::command::{BufferCopy, CopyBufferInfo};
use crate::dispatch::CallShape;
use crate::registry::{BufferKey, BufferRecord};
use crate::rules::rule::{Check, Env, Operand, Operands, Rule};
use crate::rules::support::{buffer_name, check_outside_render_pass, has_live_memory, no_memory_message};

macro_rules! copy_rules {
    ($shape:expr, $info:literal, $region:literal, $renderpass:literal) => {{
        let src = Operands::SRC_BUFFER;
        let dst = Operands::DST_BUFFER;
        let both = Operands::SRC_BUFFER | Operands::DST_BUFFER;
        let none = Operands::empty();
        vec![
            Rule::required(
                "UNASSIGNED-GeneralParameterError-RequiredParameter",
                $shape,
                &[Operand::SrcBuffer, Operand::DstBuffer],
            ),
            Rule::handle(concat!("VUID-", $info, "-srcBuffer-parameter"), $shape, Operand::SrcBuffer),
            Rule::handle(concat!("VUID-", $info, "-dstBuffer-parameter"), $shape, Operand::DstBuffer),
            Rule::usage(concat!("VUID-", $info, "-regionCount-arraylength"), $shape, none, Check::CopyBuffer(check_region_count)),
            Rule::usage(concat!("VUID-", $region, "-size-01988"), $shape, none, Check::CopyBuffer(check_region_size_not_zero)),
            Rule::usage(concat!("VUID-", $info, "-srcOffset-00113"), $shape, src, Check::CopyBuffer(check_src_offset)),
            Rule::usage(concat!("VUID-", $info, "-dstOffset-00114"), $shape, dst, Check::CopyBuffer(check_dst_offset)),
            Rule::usage(concat!("VUID-", $info, "-size-00115"), $shape, src, Check::CopyBuffer(check_src_size)),
            Rule::usage(concat!("VUID-", $info, "-size-00116"), $shape, dst, Check::CopyBuffer(check_dst_size)),
            Rule::usage(concat!("VUID-", $info, "-srcBuffer-00118"), $shape, src, Check::CopyBuffer(check_src_usage)),
            Rule::usage(concat!("VUID-", $info, "-srcBuffer-00119"), $shape, src, Check::CopyBuffer(check_src_memory)),
            Rule::usage(concat!("VUID-", $info, "-dstBuffer-00120"), $shape, dst, Check::CopyBuffer(check_dst_usage)),
            Rule::usage(concat!("VUID-", $info, "-dstBuffer-00121"), $shape, dst, Check::CopyBuffer(check_dst_memory)),
            Rule::usage(concat!("VUID-", $info, "-pRegions-00117"), $shape, both, Check::CopyBuffer(check_overlap)),
            Rule::usage($renderpass, $shape, none, Check::Command(check_outside_render_pass)),
        ]
    }};
}

pub(crate) fn rules() -> Vec<Rule> {
    let mut rules = copy_rules!(CallShape::CmdCopyBuffer, "vkCmdCopyBuffer", "VkBufferCopy", "VUID-vkCmdCopyBuffer-renderpass");
    rules.push(Rule::capability(
        "UNASSIGNED-GeneralParameterError-ExtensionNotEnabled",
        CallShape::CmdCopyBuffer2,
        Operands::empty(),
        Check::Command(check_copy_commands2_enabled),
    ));
    rules.extend(copy_rules!(
        CallShape::CmdCopyBuffer2,
        "VkCopyBufferInfo2",
        "VkBufferCopy2",
        "VUID-vkCmdCopyBuffer2-renderpass"
    ));
    rules
}

fn check_copy_commands2_enabled(env: &Env<'_>, out: &mut Vec<String>) {
    if !env.features().copy_commands2 {
        out.push("vkCmdCopyBuffer2 requires the copyCommands2 feature, which was not enabled.".to_string());
    }
}

fn check_region_count(info: &CopyBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.regions.is_empty() {
        out.push("regionCount must be greater than 0.".to_string());
    }
}

fn check_region_size_not_zero(info: &CopyBufferInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    for (i, region) in info.regions.iter().enumerate() {
        if region.size == 0 {
            out.push(format!("pRegions[{}].size must be greater than 0.", i));
        }
    }
}

// ===== RANGES =====

fn check_src_offset(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let Some(buffer) = env.buffer(info.src_buffer) else { return };
    for (i, region) in info.regions.iter().enumerate() {
        if region.src_offset >= buffer.size() {
            out.push(format!(
                "pRegions[{}].srcOffset ({}) is greater than or equal to the size of srcBuffer ({}).",
                i,
                region.src_offset,
                buffer.size()
            ));
        }
    }
}

fn check_dst_offset(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let Some(buffer) = env.buffer(info.dst_buffer) else { return };
    for (i, region) in info.regions.iter().enumerate() {
        if region.dst_offset >= buffer.size() {
            out.push(format!(
                "pRegions[{}].dstOffset ({}) is greater than or equal to the size of dstBuffer ({}).",
                i,
                region.dst_offset,
                buffer.size()
            ));
        }
    }
}

/// Regions whose offset lies inside the buffer but whose size runs past its end
fn oversized_regions(buffer: &BufferRecord, regions: &[BufferCopy], offset: fn(&BufferCopy) -> u64) -> Vec<usize> {
    regions
        .iter()
        .enumerate()
        .filter(|(_, region)| {
            let start = offset(region);
            start < buffer.size() && region.size > buffer.size() - start
        })
        .map(|(i, _)| i)
        .collect()
}

fn check_src_size(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let Some(buffer) = env.buffer(info.src_buffer) else { return };
    for i in oversized_regions(buffer, &info.regions, |region| region.src_offset) {
        let region = &info.regions[i];
        out.push(format!(
            "pRegions[{}].size ({}) is greater than the size of srcBuffer ({}) minus pRegions[{}].srcOffset ({}).",
            i,
            region.size,
            buffer.size(),
            i,
            region.src_offset
        ));
    }
}

fn check_dst_size(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let Some(buffer) = env.buffer(info.dst_buffer) else { return };
    for i in oversized_regions(buffer, &info.regions, |region| region.dst_offset) {
        let region = &info.regions[i];
        out.push(format!(
            "pRegions[{}].size ({}) is greater than the size of dstBuffer ({}) minus pRegions[{}].dstOffset ({}).",
            i,
            region.size,
            buffer.size(),
            i,
            region.dst_offset
        ));
    }
}

// ===== USAGE AND MEMORY =====

fn check_usage(env: &Env<'_>, key: BufferKey, required: BufferUsageFlags2, parameter: &str, flag: &str, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(key) {
        if !buffer.usage().contains(required) {
            out.push(format!(
                "{} ({}) was created with usage {:?}, which lacks {}.",
                parameter,
                buffer_name(key),
                buffer.usage(),
                flag
            ));
        }
    }
}

fn check_src_usage(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    check_usage(env, info.src_buffer, BufferUsageFlags2::TRANSFER_SRC, "srcBuffer", "VK_BUFFER_USAGE_TRANSFER_SRC_BIT", out);
}

fn check_dst_usage(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    check_usage(env, info.dst_buffer, BufferUsageFlags2::TRANSFER_DST, "dstBuffer", "VK_BUFFER_USAGE_TRANSFER_DST_BIT", out);
}

fn check_memory(env: &Env<'_>, key: BufferKey, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(key) {
        if !has_live_memory(env, buffer) {
            out.push(no_memory_message(key, buffer, env));
        }
    }
}

fn check_src_memory(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    check_memory(env, info.src_buffer, out);
}

fn check_dst_memory(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    check_memory(env, info.dst_buffer, out);
}

// ===== OVERLAP =====

/// Base addresses of source and destination in a shared address space:
/// the same buffer, or two buffers bound to the same live allocation
fn shared_bases(info: &CopyBufferInfo, env: &Env<'_>) -> Option<(u64, u64)> {
    if info.src_buffer == info.dst_buffer {
        return Some((0, 0));
    }
    let src = env.buffer(info.src_buffer)?;
    let dst = env.buffer(info.dst_buffer)?;
    let (src_memory, src_offset, _) = env.registry.bound_memory(src)?;
    let (dst_memory, dst_offset, _) = env.registry.bound_memory(dst)?;
    (src_memory == dst_memory).then_some((src_offset, dst_offset))
}

fn ranges_overlap(a_start: u64, b_start: u64, size_a: u64, size_b: u64) -> bool {
    let a_end = a_start.saturating_add(size_a);
    let b_end = b_start.saturating_add(size_b);
    a_start < b_end && b_start < a_end
}

/// The source range of any region intersecting the destination range of
/// any region (itself included) is reported once for the call
fn check_overlap(info: &CopyBufferInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let Some((src_base, dst_base)) = shared_bases(info, env) else { return };

    for (i, src_region) in info.regions.iter().enumerate() {
        let src_start = src_base.saturating_add(src_region.src_offset);
        for (j, dst_region) in info.regions.iter().enumerate() {
            let dst_start = dst_base.saturating_add(dst_region.dst_offset);
            if ranges_overlap(src_start, dst_start, src_region.size, dst_region.size) {
                out.push(format!(
                    "Detected overlap between source and destination regions in memory: pRegions[{}] source range \
                     [{}, {}) and pRegions[{}] destination range [{}, {}).",
                    i,
                    src_region.src_offset,
                    src_region.src_offset.saturating_add(src_region.size),
                    j,
                    dst_region.dst_offset,
                    dst_region.dst_offset.saturating_add(dst_region.size)
                ));
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "copy_rules_tests.rs"]
mod tests;
