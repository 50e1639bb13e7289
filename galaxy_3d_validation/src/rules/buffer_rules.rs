/// Buffer and memory object rules: creation, binding, destruction

use crate::device::buffer::{
    BufferCreateFlags, BufferCreateInfo, BufferUsageFlags, BufferUsageFlags2, MemoryAllocateInfo, SharingMode,
};
use crate::device::command::BindBufferMemoryInfo;
use crate::dispatch::CallShape;
use crate::rules::rule::{Check, Env, Operand, Operands, Rule};
use crate::rules::support::buffer_name;

/// Allocations below this size draw a best-practices warning
const SMALL_ALLOCATION_SIZE: u64 = 256 * 1024;

pub(crate) fn rules() -> Vec<Rule> {
    use CallShape::*;
    let none = Operands::empty();
    let buffer = Operands::BUFFER;
    let buffer_and_memory = Operands::BUFFER | Operands::MEMORY;

    vec![
        // create
        Rule::usage("VUID-VkBufferCreateInfo-size-00912", CreateBuffer, none, Check::CreateBuffer(check_size_not_zero)),
        Rule::usage("VUID-VkBufferCreateInfo-None-09206", CreateBuffer, none, Check::CreateBuffer(check_usage_not_zero)),
        Rule::usage("VUID-VkBufferCreateInfo-None-09205", CreateBuffer, none, Check::CreateBuffer(check_usage_known_bits)),
        Rule::usage(
            "VUID-VkBufferUsageFlags2CreateInfoKHR-usage-requiredbitmask",
            CreateBuffer,
            none,
            Check::CreateBuffer(check_usage2_not_zero),
        ),
        Rule::usage(
            "VUID-VkBufferUsageFlags2CreateInfoKHR-usage-parameter",
            CreateBuffer,
            none,
            Check::CreateBuffer(check_usage2_known_bits),
        ),
        Rule::usage("VUID-VkBufferCreateInfo-size-06409", CreateBuffer, none, Check::CreateBuffer(check_max_buffer_size)),
        Rule::usage("VUID-VkBufferCreateInfo-pNext-01571", CreateBuffer, none, Check::CreateBuffer(check_dedicated_and_sparse)),
        Rule::usage("VUID-VkBufferCreateInfo-sharingMode-00914", CreateBuffer, none, Check::CreateBuffer(check_concurrent_family_count)),
        Rule::usage("VUID-VkBufferCreateInfo-sharingMode-01419", CreateBuffer, none, Check::CreateBuffer(check_concurrent_family_indices)),
        Rule::capability("VUID-VkBufferCreateInfo-flags-00915", CreateBuffer, none, Check::CreateBuffer(check_sparse_binding_feature)),
        // destroy
        Rule::handle("VUID-vkDestroyBuffer-buffer-parameter", DestroyBuffer, Operand::Buffer),
        // memory
        Rule::advisory(
            "BestPractices-vkAllocateMemory-small-allocation",
            AllocateMemory,
            none,
            Check::AllocateMemory(check_small_allocation),
        ),
        Rule::handle("VUID-vkFreeMemory-memory-parameter", FreeMemory, Operand::Memory),
        // bind
        Rule::required(
            "UNASSIGNED-GeneralParameterError-RequiredParameter",
            BindBufferMemory,
            &[Operand::Buffer, Operand::Memory],
        ),
        Rule::handle("VUID-vkBindBufferMemory-buffer-parameter", BindBufferMemory, Operand::Buffer),
        Rule::handle("VUID-vkBindBufferMemory-memory-parameter", BindBufferMemory, Operand::Memory),
        Rule::usage("VUID-vkBindBufferMemory-buffer-07459", BindBufferMemory, buffer, Check::BindBufferMemory(check_not_already_bound)),
        Rule::usage(
            "VUID-vkBindBufferMemory-memoryOffset-01031",
            BindBufferMemory,
            buffer_and_memory,
            Check::BindBufferMemory(check_memory_offset_in_range),
        ),
        Rule::usage(
            "VUID-vkBindBufferMemory-memoryOffset-01036",
            BindBufferMemory,
            buffer,
            Check::BindBufferMemory(check_memory_offset_alignment),
        ),
        Rule::usage(
            "VUID-vkBindBufferMemory-size-01037",
            BindBufferMemory,
            buffer_and_memory,
            Check::BindBufferMemory(check_memory_large_enough),
        ),
        // query
        Rule::handle(
            "VUID-vkGetBufferMemoryRequirements-buffer-parameter",
            GetBufferMemoryRequirements,
            Operand::Buffer,
        ),
    ]
}

// ===== CREATE =====

fn check_size_not_zero(info: &BufferCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.size == 0 {
        out.push("vkCreateBuffer(): pCreateInfo->size must be greater than 0.".to_string());
    }
}

fn check_usage_not_zero(info: &BufferCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.usage2.is_none() && info.usage.is_empty() {
        out.push("vkCreateBuffer(): value of pCreateInfo->usage must not be 0.".to_string());
    }
}

fn check_usage_known_bits(info: &BufferCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    let unknown = info.usage.bits() & !BufferUsageFlags::all().bits();
    if info.usage2.is_none() && unknown != 0 {
        out.push(format!(
            "vkCreateBuffer(): pCreateInfo->usage (0x{:08x}) contains unknown flag bits 0x{:08x}.",
            info.usage.bits(),
            unknown
        ));
    }
}

fn check_usage2_not_zero(info: &BufferCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.usage2.is_some_and(|usage| usage.is_empty()) {
        out.push("vkCreateBuffer(): VkBufferUsageFlags2CreateInfoKHR::usage must not be 0.".to_string());
    }
}

fn check_usage2_known_bits(info: &BufferCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(usage) = info.usage2 {
        let unknown = usage.bits() & !BufferUsageFlags2::all().bits();
        if unknown != 0 {
            out.push(format!(
                "vkCreateBuffer(): VkBufferUsageFlags2CreateInfoKHR::usage contains unknown flag bits 0x{:016x}.",
                unknown
            ));
        }
    }
}

fn check_max_buffer_size(info: &BufferCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(max) = env.capabilities.limits.max_buffer_size {
        if info.size > max {
            out.push(format!(
                "vkCreateBuffer(): pCreateInfo->size ({}) is larger than the maximum allowed buffer size ({}).",
                info.size, max
            ));
        }
    }
}

fn check_dedicated_and_sparse(info: &BufferCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    let sparse = BufferCreateFlags::SPARSE_BINDING | BufferCreateFlags::SPARSE_RESIDENCY | BufferCreateFlags::SPARSE_ALIASED;
    let dedicated = info.dedicated_allocation.is_some_and(|d| d.dedicated_allocation);
    if dedicated && info.flags.intersects(sparse) {
        out.push(format!(
            "vkCreateBuffer(): dedicatedAllocation is VK_TRUE but pCreateInfo->flags ({:?}) contains sparse flags.",
            info.flags
        ));
    }
}

fn check_concurrent_family_count(info: &BufferCreateInfo, _env: &Env<'_>, out: &mut Vec<String>) {
    if info.sharing_mode == SharingMode::Concurrent && info.queue_family_indices.len() < 2 {
        out.push(format!(
            "vkCreateBuffer(): sharingMode is VK_SHARING_MODE_CONCURRENT but queueFamilyIndexCount is {}.",
            info.queue_family_indices.len()
        ));
    }
}

fn check_concurrent_family_indices(info: &BufferCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if info.sharing_mode != SharingMode::Concurrent {
        return;
    }
    let family_count = env.capabilities.queue_families.len();
    for (i, index) in info.queue_family_indices.iter().enumerate() {
        if *index as usize >= family_count {
            out.push(format!(
                "vkCreateBuffer(): pQueueFamilyIndices[{}] ({}) is not a queue family of this device ({} families).",
                i, index, family_count
            ));
        }
    }
}

fn check_sparse_binding_feature(info: &BufferCreateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if info.flags.contains(BufferCreateFlags::SPARSE_BINDING) && !env.features().sparse_binding {
        out.push("vkCreateBuffer(): VK_BUFFER_CREATE_SPARSE_BINDING_BIT requires the sparseBinding feature.".to_string());
    }
}

// ===== MEMORY =====

fn check_small_allocation(info: &MemoryAllocateInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if env.config.best_practices && info.size < SMALL_ALLOCATION_SIZE {
        out.push(format!(
            "vkAllocateMemory(): allocating {} bytes; prefer sub-allocating small buffers from allocations of at least {} bytes.",
            info.size, SMALL_ALLOCATION_SIZE
        ));
    }
}

// ===== BIND =====

fn check_not_already_bound(info: &BindBufferMemoryInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        if buffer.binding.is_bound() {
            out.push(format!("{} is already bound to a memory object.", buffer_name(info.buffer)));
        }
    }
}

fn check_memory_offset_in_range(info: &BindBufferMemoryInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(memory) = env.registry.memory(info.memory) {
        if info.memory_offset >= memory.size() {
            out.push(format!(
                "memoryOffset ({}) must be less than the size of memory ({}).",
                info.memory_offset,
                memory.size()
            ));
        }
    }
}

fn check_memory_offset_alignment(info: &BindBufferMemoryInfo, env: &Env<'_>, out: &mut Vec<String>) {
    if let Some(buffer) = env.buffer(info.buffer) {
        let alignment = buffer.requirements.alignment;
        if info.memory_offset % alignment != 0 {
            out.push(format!(
                "memoryOffset ({}) must be a multiple of the alignment member of the VkMemoryRequirements structure ({}).",
                info.memory_offset, alignment
            ));
        }
    }
}

fn check_memory_large_enough(info: &BindBufferMemoryInfo, env: &Env<'_>, out: &mut Vec<String>) {
    let (Some(buffer), Some(memory)) = (env.buffer(info.buffer), env.registry.memory(info.memory)) else {
        return;
    };
    // An offset past the end is reported by the offset range rule
    if info.memory_offset >= memory.size() {
        return;
    }
    let available = memory.size() - info.memory_offset;
    if buffer.requirements.size > available {
        out.push(format!(
            "memory size minus memoryOffset is {} but the VkMemoryRequirements::size of {} is {}.",
            available,
            buffer_name(info.buffer),
            buffer.requirements.size
        ));
    }
}

#[cfg(test)]
#[path = "buffer_rules_tests.rs"]
mod tests;
