/// Dispatch Interceptor
///
/// Runs the catalog against one call in two phases: handles are resolved
/// against the registry first, then every rule whose operands resolved is
/// evaluated. Nothing here mutates state; the layer applies and forwards
/// the call once the findings are known.

use crate::dispatch::Call;
use crate::registry::{HandleRef, InvalidHandle, ObjectRegistry};
use crate::report::Severity;
use crate::rules::{Check, Env, Finding, Operand, Operands, Rule, RuleCatalog};
use crate::layer_trace;

const SOURCE: &str = "galaxy3d::validation::Interceptor";

/// Per-call phase, reported in trace logs. The first two run here, the
/// last two in the layer once the report is concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolvingHandles,
    RunningRules,
    UpdatingState,
    Forwarding,
}

/// Stateless rule evaluator over an immutable catalog
#[derive(Debug)]
pub struct Interceptor {
    catalog: RuleCatalog,
}

impl Interceptor {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Operands of a call whose handles reference live objects
    pub fn resolve(call: &Call<'_>, registry: &ObjectRegistry) -> Operands {
        Operand::ALL
            .iter()
            .filter(|operand| call.handle(**operand).is_some_and(|handle| registry.contains(handle)))
            .fold(Operands::empty(), |resolved, operand| resolved | operand.flag())
    }

    /// Evaluate every applicable rule. `env.resolved` is recomputed from
    /// the call; findings come back in catalog order.
    pub fn evaluate(&self, call: &Call<'_>, env: Env<'_>) -> Vec<Finding> {
        let shape = call.shape();
        layer_trace!(SOURCE, "{}: {:?}", shape.name(), Phase::ResolvingHandles);
        let env = Env { resolved: Self::resolve(call, env.registry), ..env };

        layer_trace!(SOURCE, "{}: {:?} (resolved {:?})", shape.name(), Phase::RunningRules, env.resolved);
        let mut findings = Vec::new();
        for rule in self.catalog.rules_for(shape) {
            if rule.severity == Severity::Warning && !env.config.best_practices {
                continue;
            }

            let mut messages = Vec::new();
            match rule.check {
                Check::Required(operands) => check_required(call, operands, &mut messages),
                Check::Handle { operand, allow_null } => {
                    check_handle(call, env.registry, operand, allow_null, &mut messages)
                }
                check => {
                    if !env.resolved.contains(rule.needs) {
                        layer_trace!(SOURCE, "{}: skipping {} (unresolved {:?})",
                            shape.name(), rule.id, rule.needs.difference(env.resolved));
                        continue;
                    }
                    check.run(call, &env, &mut messages);
                }
            }

            findings.extend(messages.into_iter().map(|message| finding(rule, message)));
        }
        findings
    }
}

fn finding(rule: &Rule, message: String) -> Finding {
    Finding {
        rule_id: rule.id,
        severity: rule.severity,
        kind: rule.kind,
        message,
    }
}

fn check_required(call: &Call<'_>, operands: &[Operand], out: &mut Vec<String>) {
    for operand in operands {
        if call.handle(*operand).is_some_and(|handle| handle.is_null()) {
            out.push(format!("{} must not be VK_NULL_HANDLE.", operand.parameter_name()));
        }
    }
}

fn check_handle(call: &Call<'_>, registry: &ObjectRegistry, operand: Operand, allow_null: bool, out: &mut Vec<String>) {
    let Some(handle) = call.handle(operand) else { return };
    let reportable = if handle.is_null() { !allow_null } else { !registry.contains(handle) };
    if reportable {
        out.push(format!("{}: {}.", operand.parameter_name(), invalid(handle)));
    }
}

fn invalid(handle: HandleRef) -> InvalidHandle {
    InvalidHandle {
        kind: handle.kind(),
        raw: handle.raw(),
        null: handle.is_null(),
    }
}

#[cfg(test)]
#[path = "interceptor_tests.rs"]
mod tests;
