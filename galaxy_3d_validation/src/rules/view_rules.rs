/// Texel buffer view rules

use crate::device::buffer::{BufferRange, BufferUsageFlags2, BufferViewCreateInfo};
use crate::device::format::FormatFeatures;
use crate::dispatch::CallShape;
use crate::registry::BufferRecord;
use crate::rules::rule::{Check, Env, Operand, Operands, Rule};
use crate::rules::support::{buffer_name, has_live_memory, no_memory_message};

const TEXEL_USAGE: BufferUsageFlags2 =
    BufferUsageFlags2::UNIFORM_TEXEL_BUFFER.union(BufferUsageFlags2::STORAGE_TEXEL_BUFFER);

pub(crate) fn rules() -> Vec<Rule> {
    use CallShape::*;
    let none = Operands::empty();
    let buffer = Operands::BUFFER;

    vec![
        Rule::required("UNASSIGNED-GeneralParameterError-RequiredParameter", CreateBufferView, &[Operand::Buffer]),
        Rule::handle("VUID-VkBufferViewCreateInfo-buffer-parameter", CreateBufferView, Operand::Buffer),
        Rule::usage("VUID-VkBufferViewCreateInfo-buffer-00935", CreateBufferView, buffer, Check::CreateBufferView(check_memory_bound)),
        Rule::usage("VUID-VkBufferViewCreateInfo-buffer-00932", CreateBufferView, buffer, Check::CreateBufferView(check_texel_usage)),
        Rule::usage("VUID-VkBufferViewCreateInfo-offset-00925", CreateBufferView, buffer, Check::CreateBufferView(check_offset_in_buffer)),
        Rule::usage("VUID-VkBufferViewCreateInfo-offset-02749", CreateBufferView, none, Check::CreateBufferView(check_offset_alignment)),
        Rule::usage("VUID-VkBufferViewCreateInfo-buffer-02750", CreateBufferView, buffer, Check::CreateBufferView(check_storage_offset_alignment)),
        Rule::usage("VUID-VkBufferViewCreateInfo-buffer-02751", CreateBufferView, buffer, Check::CreateBufferView(check_uniform_offset_alignment)),
        Rule::usage("VUID-VkBufferViewCreateInfo-range-00928", CreateBufferView, none, Check::CreateBufferView(check_range_not_zero)),
        Rule::usage("VUID-VkBufferViewCreateInfo-range-00929", CreateBufferView, none, Check::CreateBufferView(check_range_multiple_of_element)),
        Rule::usage("VUID-VkBufferViewCreateInfo-range-00930", CreateBufferView, none, Check::CreateBufferView(check_range_element_count)),
        Rule::usage("VUID-VkBufferViewCreateInfo-offset-00931", CreateBufferView, buffer, Check::CreateBufferView(check_range_fits_buffer)),
        Rule::usage("VUID-VkBufferViewCreateInfo-range-04059", CreateBufferView, buffer, Check::CreateBufferView(check_whole_range_element_count)),
        Rule::usage("VUID-VkBufferViewCreateInfo-buffer-00933", CreateBufferView, buffer, Check::CreateBufferView(check_uniform_format_support)),
        Rule::usage("VUID-VkBufferViewCreateInfo-buffer-00934", CreateBufferView, buffer, Check::CreateBufferView(check_storage_format_support)),
        Rule::usage("VUID-VkBufferViewCreateInfo-pNext-08780", CreateBufferView, none, Check::CreateBufferView(check_usage2_texel_only)),
        Rule::usage("VUID-VkBufferViewCreateInfo-pNext-08781", CreateBufferView, buffer, Check::CreateBufferView(check_usage2_subset)),
        Rule::handle("VUID-vkDestroyBufferView-bufferView-parameter", DestroyBufferView, Operand::BufferView),
    ]
}

/// Usage a view is created with: its sidecar, or the usage of its buffer
fn view_usage(info: &BufferViewCreateInfo, buffer: &BufferRecord) -> BufferUsageFlags2 {
    info.usage2.unwrap_or_else(|| buffer.usage())
}

fn check_memory_bound(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if !has_live_memory(env, buffer) {
            out.push(no_memory_message(info.buffer, buffer, env));
        }
    }
}

fn check_texel_usage(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if !buffer.usage().intersects(TEXEL_USAGE) {
            out.push(format!(
                "{} was created with usage {:?}, which contains neither UNIFORM_TEXEL_BUFFER nor STORAGE_TEXEL_BUFFER.",
                buffer_name(info.buffer),
                buffer.usage()
            ));
        }
    }
}

fn check_offset_in_buffer(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if info.offset >= buffer.size() {
            out.push(format!(
                "offset ({}) must be less than the size of buffer ({}).",
                info.offset,
                buffer.size()
            ));
        }
    }
}

fn check_offset_alignment(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if env.features().texel_buffer_alignment {
        return;
    }
    let alignment = env.capabilities.limits.min_texel_buffer_offset_alignment;
    if info.offset % alignment != 0 {
        out.push(format!(
            "offset ({}) must be a multiple of minTexelBufferOffsetAlignment ({}).",
            info.offset, alignment
        ));
    }
}

fn texel_offset_alignment(alignment_bytes: u64, single_texel: bool, info: &BufferViewCreateInfo) -> u64 {
    if single_texel {
        alignment_bytes.min(info.format.single_texel_alignment())
    } else {
        alignment_bytes
    }
}

fn check_storage_offset_alignment(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if !env.features().texel_buffer_alignment {
        return;
    }
    let Some(buffer) = env.buffer(info.buffer) else { return };
    if !view_usage(info, buffer).contains(BufferUsageFlags2::STORAGE_TEXEL_BUFFER) {
        return;
    }
    let properties = &env.capabilities.texel_alignment;
    let alignment = texel_offset_alignment(
        properties.storage_offset_alignment_bytes,
        properties.storage_offset_single_texel_alignment,
        info,
    );
    if info.offset % alignment != 0 {
        out.push(format!(
            "offset ({}) must be a multiple of {} for a storage texel buffer view of format {:?}.",
            info.offset, alignment, info.format
        ));
    }
}

fn check_uniform_offset_alignment(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if !env.features().texel_buffer_alignment {
        return;
    }
    let Some(buffer) = env.buffer(info.buffer) else { return };
    if !view_usage(info, buffer).contains(BufferUsageFlags2::UNIFORM_TEXEL_BUFFER) {
        return;
    }
    let properties = &env.capabilities.texel_alignment;
    let alignment = texel_offset_alignment(
        properties.uniform_offset_alignment_bytes,
        properties.uniform_offset_single_texel_alignment,
        info,
    );
    if info.offset % alignment != 0 {
        out.push(format!(
            "offset ({}) must be a multiple of {} for a uniform texel buffer view of format {:?}.",
            info.offset, alignment, info.format
        ));
    }
}

fn check_range_not_zero(info: &BufferViewCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.range == BufferRange::Bytes(0) {
        out.push("range must be greater than 0.".to_string());
    }
}

fn check_range_multiple_of_element(info: &BufferViewCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if let BufferRange::Bytes(range) = info.range {
        let element = info.format.element_size();
        if range % element != 0 {
            out.push(format!(
                "range ({}) must be a multiple of the element size of {:?} ({}).",
                range, info.format, element
            ));
        }
    }
}

fn check_range_element_count(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let BufferRange::Bytes(range) = info.range {
        let elements = range / info.format.element_size();
        let max = env.capabilities.limits.max_texel_buffer_elements;
        if elements > max {
            out.push(format!(
                "range ({}) divided by the element size of {:?} is {} texels, more than maxTexelBufferElements ({}).",
                range, info.format, elements, max
            ));
        }
    }
}

fn check_range_fits_buffer(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let BufferRange::Bytes(range) = info.range else { return };
    let Some(buffer) = env.buffer(info.buffer) else { return };
    // Offsets past the end are reported by the offset rule
    if info.offset >= buffer.size() {
        return;
    }
    if range > buffer.size() - info.offset {
        out.push(format!(
            "offset ({}) + range ({}) is larger than the size of buffer ({}).",
            info.offset,
            range,
            buffer.size()
        ));
    }
}

fn check_whole_range_element_count(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if info.range != BufferRange::Whole {
        return;
    }
    let Some(buffer) = env.buffer(info.buffer) else { return };
    if info.offset >= buffer.size() {
        return;
    }
    let elements = (buffer.size() - info.offset) / info.format.element_size();
    let max = env.capabilities.limits.max_texel_buffer_elements;
    if elements > max {
        out.push(format!(
            "range is VK_WHOLE_SIZE and the remaining {} bytes of buffer hold {} texels of {:?}, more than maxTexelBufferElements ({}).",
            buffer.size() - info.offset,
            elements,
            info.format,
            max
        ));
    }
}

fn check_uniform_format_support(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let Some(buffer) = env.buffer(info.buffer) else { return };
    if view_usage(info, buffer).contains(BufferUsageFlags2::UNIFORM_TEXEL_BUFFER)
        && !env.capabilities.format_features(info.format).contains(FormatFeatures::UNIFORM_TEXEL_BUFFER)
    {
        out.push(format!(
            "format {:?} does not support VK_FORMAT_FEATURE_UNIFORM_TEXEL_BUFFER_BIT.",
            info.format
        ));
    }
}

fn check_storage_format_support(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let Some(buffer) = env.buffer(info.buffer) else { return };
    if view_usage(info, buffer).contains(BufferUsageFlags2::STORAGE_TEXEL_BUFFER)
        && !env.capabilities.format_features(info.format).contains(FormatFeatures::STORAGE_TEXEL_BUFFER)
    {
        out.push(format!(
            "format {:?} does not support VK_FORMAT_FEATURE_STORAGE_TEXEL_BUFFER_BIT.",
            info.format
        ));
    }
}

fn check_usage2_texel_only(info: &BufferViewCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(usage) = info.usage2 {
        let extra = usage.difference(TEXEL_USAGE);
        if !extra.is_empty() {
            out.push(format!(
                "VkBufferUsageFlags2CreateInfoKHR::usage ({:?}) contains bits other than the texel buffer usages.",
                extra
            ));
        }
    }
}

fn check_usage2_subset(info: &BufferViewCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let (Some(usage), Some(buffer)) = (info.usage2, env.buffer(info.buffer)) else { return };
    if !buffer.usage().contains(usage) {
        out.push(format!(
            "VkBufferUsageFlags2CreateInfoKHR::usage ({:?}) is not a subset of the usage {} was created with ({:?}).",
            usage,
            buffer_name(info.buffer),
            buffer.usage()
        ));
    }
}

#[cfg(test)]
#[path = "view_rules_tests.rs"]
mod tests;
