/// Rule Catalog
///
/// Immutable set of rules indexed by call shape. Built once per layer and
/// shared read-only by every calling thread.

use rustc_hash::FxHashMap;
use crate::dispatch::CallShape;
use crate::error::Result;
use crate::layer_bail;
use crate::rules::rule::Rule;
use crate::rules::{
    buffer_rules, command_rules, conditional_rules, copy_rules, descriptor_rules, draw_rules,
    transfer_rules, view_rules,
};

const SOURCE: &str = "galaxy3d::validation::RuleCatalog";

/// Rules by call shape, in registration order
#[derive(Debug)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
    by_shape: FxHashMap<CallShape, Vec<usize>>,
}

impl RuleCatalog {
    /// Every rule family shipped with the layer
    pub fn standard() -> Result<Self> {
        let mut rules = command_rules::rules();
        rules.extend(buffer_rules::rules());
        rules.extend(view_rules::rules());
        rules.extend(descriptor_rules::rules());
        rules.extend(copy_rules::rules());
        rules.extend(transfer_rules::rules());
        rules.extend(draw_rules::rules());
        rules.extend(conditional_rules::rules());
        Self::from_rules(rules)
    }

    /// Build a catalog, rejecting rules whose check cannot read the
    /// arguments of their shape
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self> {
        let mut by_shape: FxHashMap<CallShape, Vec<usize>> = FxHashMap::default();

        for (index, rule) in rules.iter().enumerate() {
            if rule.id.is_empty() {
                layer_bail!(InitializationFailed, SOURCE,
                    "rule #{} for {} has an empty id", index, rule.shape.name());
            }
            if !rule.check.accepts(rule.shape) {
                layer_bail!(InitializationFailed, SOURCE,
                    "rule {} checks arguments that {} does not carry", rule.id, rule.shape.name());
            }
            by_shape.entry(rule.shape).or_default().push(index);
        }

        Ok(Self { rules, by_shape })
    }

    /// Rules examining a call shape, in registration order
    pub fn rules_for(&self, shape: CallShape) -> impl Iterator<Item = &Rule> + '_ {
        self.by_shape
            .get(&shape)
            .into_iter()
            .flatten()
            .map(move |index| &self.rules[*index])
    }

    /// Every rule registered under an id, across shapes
    pub fn find(&self, rule_id: &str) -> Vec<&Rule> {
        self.rules.iter().filter(|rule| rule.id == rule_id).collect()
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.rules.iter().any(|rule| rule.id == rule_id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
