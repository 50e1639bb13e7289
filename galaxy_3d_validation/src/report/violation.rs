/// Violation records and per-call reports

use std::fmt;
use std::thread::ThreadId;
use crate::dispatch::CallShape;
use crate::registry::CommandBufferKey;

/// Severity of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Advisory (best practices)
    Warning,
    /// The call breaks a documented constraint
    Error,
}

/// Class of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// The call misuses the API
    UsageViolation,
    /// A handle argument does not reference a live object
    InvalidHandle,
    /// The call needs a feature that was not negotiated
    CapabilityUnsupported,
}

/// Where a call came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub shape: CallShape,
    /// Monotonic index of the call on its layer
    pub call_index: u64,
    pub command_buffer: Option<CommandBufferKey>,
    pub thread: ThreadId,
}

/// One reported failure of one rule for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub kind: ViolationKind,
    pub message: String,
    pub context: CallContext,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {} ] {}: {}", self.rule_id, self.context.shape.name(), self.message)
    }
}

/// Every violation reported for one call, in catalog order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReport {
    context: CallContext,
    violations: Vec<Violation>,
}

impl CallReport {
    pub fn new(context: CallContext) -> Self {
        Self { context, violations: Vec::new() }
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// No rule fired
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether a rule fired
    pub fn fired(&self, rule_id: &str) -> bool {
        self.violations.iter().any(|v| v.rule_id == rule_id)
    }

    /// How many times a rule fired
    pub fn count(&self, rule_id: &str) -> usize {
        self.violations.iter().filter(|v| v.rule_id == rule_id).count()
    }

    /// Fired rule ids in report order
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.rule_id).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == Severity::Error)
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

impl<'a> IntoIterator for &'a CallReport {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

/// Output of an intercepted call together with its report
#[derive(Debug, Clone)]
pub struct Intercepted<T> {
    pub output: T,
    pub report: CallReport,
}

impl<T> Intercepted<T> {
    pub fn is_clean(&self) -> bool {
        self.report.is_clean()
    }

    pub fn fired(&self, rule_id: &str) -> bool {
        self.report.fired(rule_id)
    }

    pub fn into_output(self) -> T {
        self.output
    }
}
