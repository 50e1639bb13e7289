/// Diagnostic reporting: violations, call reports and the reporter

pub mod reporter;
pub mod violation;

pub use reporter::{DiagnosticReporter, ValidationStats};
pub use violation::{CallContext, CallReport, Intercepted, Severity, Violation, ViolationKind};
