/// Descriptor set layout and write rules

use rustc_hash::FxHashSet;
use crate::device::descriptor::{DescriptorSetLayoutBinding, WriteDescriptorSet};
use crate::dispatch::CallShape;
use crate::registry::{DescriptorSetRecord, HandleRef};
use crate::rules::rule::{Check, Env, Operands, Rule};

pub(crate) fn rules() -> Vec<Rule> {
    use CallShape::*;
    let none = Operands::empty();

    vec![
        Rule::usage(
            "VUID-VkDescriptorSetLayoutCreateInfo-binding-00279",
            CreateDescriptorSet,
            none,
            Check::CreateDescriptorSet(check_unique_bindings),
        ),
        Rule::handle_array("VUID-VkWriteDescriptorSet-dstSet-00320", UpdateDescriptorSets, Check::UpdateDescriptorSets(check_dst_sets)),
        Rule::usage("VUID-VkWriteDescriptorSet-dstBinding-00315", UpdateDescriptorSets, none, Check::UpdateDescriptorSets(check_dst_bindings)),
        Rule::usage(
            "VUID-VkWriteDescriptorSet-descriptorType-00319",
            UpdateDescriptorSets,
            none,
            Check::UpdateDescriptorSets(check_descriptor_types),
        ),
        Rule::usage(
            "VUID-VkWriteDescriptorSet-descriptorType-02994",
            UpdateDescriptorSets,
            none,
            Check::UpdateDescriptorSets(check_texel_views_alive),
        ),
    ]
}

fn check_unique_bindings(bindings: &[DescriptorSetLayoutBinding], _env: &Env<'_>, out: &mut Vec<String>) {
    let mut seen = FxHashSet::default();
    for (i, binding) in bindings.iter().enumerate() {
        if !seen.insert(binding.binding) {
            out.push(format!("pBindings[{}].binding ({}) is used more than once.", i, binding.binding));
        }
    }
}

fn check_dst_sets(writes: &[WriteDescriptorSet], env: &Env<'_>, out: &mut Vec<String>) {
    for (i, write) in writes.iter().enumerate() {
        if let Err(invalid) = env.registry.lookup::<DescriptorSetRecord>(write.dst_set) {
            out.push(format!("pDescriptorWrites[{}].dstSet: {}.", i, invalid));
        }
    }
}

/// Writes whose destination set is alive
fn live_writes<'a, 'w>(
    writes: &'w [WriteDescriptorSet],
    env: &Env<'a>,
) -> Vec<(usize, &'w WriteDescriptorSet, &'a DescriptorSetRecord)> {
    writes
        .iter()
        .enumerate()
        .filter_map(|(i, write)| env.registry.descriptor_set(write.dst_set).map(|set| (i, write, set)))
        .collect()
}

fn check_dst_bindings(writes: &[WriteDescriptorSet], env: &Env<'_>, out: &mut Vec<String>) {
    for (i, write, set) in live_writes(writes, env) {
        if set.binding(write.dst_binding).is_none() {
            out.push(format!(
                "pDescriptorWrites[{}].dstBinding ({}) is not a binding of the layout of {}.",
                i,
                write.dst_binding,
                HandleRef::DescriptorSet(write.dst_set)
            ));
        }
    }
}

fn check_descriptor_types(writes: &[WriteDescriptorSet], env: &Env<'_>, out: &mut Vec<String>) {
    for (i, write, set) in live_writes(writes, env) {
        if let Some(binding) = set.binding(write.dst_binding) {
            if binding.descriptor_type != write.descriptor_type {
                out.push(format!(
                    "pDescriptorWrites[{}].descriptorType is {:?} but binding {} was declared as {:?}.",
                    i, write.descriptor_type, write.dst_binding, binding.descriptor_type
                ));
            }
        }
    }
}

fn check_texel_views_alive(writes: &[WriteDescriptorSet], env: &Env<'_>, out: &mut Vec<String>) {
    for (i, write) in writes.iter().enumerate() {
        if !write.descriptor_type.is_texel_buffer() {
            continue;
        }
        for (j, view_key) in write.texel_buffer_views.iter().enumerate() {
            match env.registry.buffer_view(*view_key) {
                None => out.push(format!(
                    "pDescriptorWrites[{}].pTexelBufferView[{}] ({}) has been destroyed.",
                    i,
                    j,
                    HandleRef::BufferView(*view_key)
                )),
                Some(view) if env.buffer(view.info.buffer).is_none() => out.push(format!(
                    "pDescriptorWrites[{}].pTexelBufferView[{}] was created on {}, which has been destroyed.",
                    i,
                    j,
                    HandleRef::Buffer(view.info.buffer)
                )),
                Some(_) => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "descriptor_rules_tests.rs"]
mod tests;
