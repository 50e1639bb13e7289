/// Layer configuration

/// Behaviour switches of a validation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    /// Return `Error::CallAborted` instead of applying and forwarding a call
    /// that violated at least one error-severity rule
    pub abort_on_violation: bool,

    /// Log every reported violation through the layer logger
    pub log_violations: bool,

    /// Maintain per-severity counters and per-rule occurrence counts
    pub enable_stats: bool,

    /// Enable advisory rules reported at `Severity::Warning`
    pub best_practices: bool,

    /// Rule ids that are neither reported nor counted
    pub message_filter: Vec<String>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            abort_on_violation: false,
            log_violations: true,
            enable_stats: true,
            best_practices: false,
            message_filter: Vec::new(),
        }
    }
}

impl LayerConfig {
    /// Quiet configuration for tests: nothing is logged
    pub fn silent() -> Self {
        Self { log_violations: false, ..Self::default() }
    }

    pub fn with_abort_on_violation(mut self, abort: bool) -> Self {
        self.abort_on_violation = abort;
        self
    }

    pub fn with_best_practices(mut self, enabled: bool) -> Self {
        self.best_practices = enabled;
        self
    }

    /// Mute a rule id
    pub fn mute(mut self, rule_id: &str) -> Self {
        self.message_filter.push(rule_id.to_string());
        self
    }
}
