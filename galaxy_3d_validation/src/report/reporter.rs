/// Diagnostic Reporter
///
/// Turns rule findings into per-call reports, keeps the last report of
/// every calling thread for `take_for_current_call()` / `expect()`, logs
/// violations and maintains statistics.
///
/// A thread's last report lives until the thread takes it, starts another
/// call, or exits.

use colored::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::ThreadId;
use crate::config::LayerConfig;
use crate::dispatch::CallShape;
use crate::registry::CommandBufferKey;
use crate::report::violation::{CallContext, CallReport, Severity, Violation};
use crate::rules::Finding;
use crate::{layer_error, layer_warn};

const SOURCE: &str = "galaxy3d::validation::Reporter";

/// Validation statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    /// Findings dropped by the message filter
    pub muted: u32,
}

impl ValidationStats {
    /// Reported violations (muted findings excluded)
    pub fn total(&self) -> u32 {
        self.errors + self.warnings
    }
}

/// Thread-safe statistics counters
struct StatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    muted: AtomicU32,
}

impl StatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            muted: AtomicU32::new(0),
        }
    }

    fn increment(&self, severity: Severity) {
        match severity {
            Severity::Error => self.errors.fetch_add(1, Ordering::Relaxed),
            Severity::Warning => self.warnings.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn increment_muted(&self) {
        self.muted.fetch_add(1, Ordering::Relaxed);
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            muted: self.muted.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.muted.store(0, Ordering::Relaxed);
    }
}

type ReportMap = Mutex<FxHashMap<ThreadId, CallReport>>;

/// Report maps holding an entry for the owning thread
struct ThreadReports {
    thread: ThreadId,
    maps: RefCell<Vec<Weak<ReportMap>>>,
}

impl ThreadReports {
    fn register(&self, map: &Arc<ReportMap>) {
        let mut maps = self.maps.borrow_mut();
        maps.retain(|weak| weak.strong_count() > 0);
        if !maps.iter().any(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(map))) {
            maps.push(Arc::downgrade(map));
        }
    }
}

impl Drop for ThreadReports {
    fn drop(&mut self) {
        for map in self.maps.get_mut().drain(..) {
            if let Some(map) = map.upgrade() {
                lock(&map).remove(&self.thread);
            }
        }
    }
}

thread_local! {
    static THREAD_REPORTS: ThreadReports = ThreadReports {
        thread: std::thread::current().id(),
        maps: RefCell::new(Vec::new()),
    };
}

/// Per-call violation aggregation
pub struct DiagnosticReporter {
    log_violations: bool,
    enable_stats: bool,
    muted_rules: FxHashSet<String>,
    call_counter: AtomicU64,
    last_reports: Arc<ReportMap>,
    stats: StatsTracker,
    occurrences: Mutex<FxHashMap<&'static str, u32>>,
}

/// Reporter state stays usable after a panic elsewhere: every critical
/// section leaves the maps consistent
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DiagnosticReporter {
    pub fn new(config: &LayerConfig) -> Self {
        Self {
            log_violations: config.log_violations,
            enable_stats: config.enable_stats,
            muted_rules: config.message_filter.iter().cloned().collect(),
            call_counter: AtomicU64::new(0),
            last_reports: Arc::new(Mutex::new(FxHashMap::default())),
            stats: StatsTracker::new(),
            occurrences: Mutex::new(FxHashMap::default()),
        }
    }

    /// Start a call: clear the calling thread's previous report and issue
    /// the call context
    pub fn begin_call(&self, shape: CallShape, command_buffer: Option<CommandBufferKey>) -> CallContext {
        let thread = std::thread::current().id();
        lock(&self.last_reports).remove(&thread);
        CallContext {
            shape,
            call_index: self.call_counter.fetch_add(1, Ordering::Relaxed),
            command_buffer,
            thread,
        }
    }

    /// Finish a call: build its report, log, count, and remember it for the
    /// calling thread
    pub fn finish_call(&self, context: CallContext, findings: Vec<Finding>) -> CallReport {
        let mut report = CallReport::new(context);

        for finding in findings {
            if self.is_muted(finding.rule_id) {
                if self.enable_stats {
                    self.stats.increment_muted();
                }
                continue;
            }

            let occurrence = if self.enable_stats {
                self.stats.increment(finding.severity);
                let mut occurrences = lock(&self.occurrences);
                let count = occurrences.entry(finding.rule_id).or_insert(0);
                *count += 1;
                *count
            } else {
                1
            };

            if self.log_violations {
                let repeat = if occurrence > 1 {
                    format!(" [×{}]", occurrence)
                } else {
                    String::new()
                };
                match finding.severity {
                    Severity::Error => layer_error!(SOURCE, "[ {} ] {}: {}{}",
                        finding.rule_id, context.shape.name(), finding.message, repeat),
                    Severity::Warning => layer_warn!(SOURCE, "[ {} ] {}: {}{}",
                        finding.rule_id, context.shape.name(), finding.message, repeat),
                }
            }

            report.push(Violation {
                rule_id: finding.rule_id,
                severity: finding.severity,
                kind: finding.kind,
                message: finding.message,
                context,
            });
        }

        let previous = lock(&self.last_reports).insert(context.thread, report.clone());
        if previous.is_none() && context.thread == std::thread::current().id() {
            // Drop the entry with the thread
            let _ = THREAD_REPORTS.try_with(|reports| reports.register(&self.last_reports));
        }
        report
    }

    /// Drain the violations of the calling thread's most recent call
    pub fn take_for_current_call(&self) -> Vec<Violation> {
        lock(&self.last_reports)
            .remove(&std::thread::current().id())
            .map(CallReport::into_violations)
            .unwrap_or_default()
    }

    /// Report of the calling thread's most recent call, if not taken yet
    pub fn last_report(&self) -> Option<CallReport> {
        lock(&self.last_reports).get(&std::thread::current().id()).cloned()
    }

    /// Whether a rule fired for the calling thread's most recent call
    pub fn expect(&self, rule_id: &str) -> bool {
        lock(&self.last_reports)
            .get(&std::thread::current().id())
            .is_some_and(|report| report.fired(rule_id))
    }

    /// Whether no rule fired for the calling thread's most recent call
    pub fn is_clean(&self) -> bool {
        lock(&self.last_reports)
            .get(&std::thread::current().id())
            .map_or(true, CallReport::is_clean)
    }

    /// Threads whose last report is still held
    #[cfg(test)]
    pub(crate) fn retained_reports(&self) -> usize {
        lock(&self.last_reports).len()
    }

    pub fn is_muted(&self, rule_id: &str) -> bool {
        self.muted_rules.contains(rule_id)
    }

    pub fn stats(&self) -> ValidationStats {
        self.stats.get_stats()
    }

    /// How many times a rule fired since creation or the last reset
    pub fn rule_occurrences(&self, rule_id: &str) -> u32 {
        lock(&self.occurrences).get(rule_id).copied().unwrap_or(0)
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
        lock(&self.occurrences).clear();
    }

    /// Print the statistics report to stdout
    pub fn print_stats_report(&self) {
        let stats = self.stats();

        if stats.total() == 0 {
            println!("\n{}", "✓ No validation messages".green().bold());
            return;
        }

        println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());

        if stats.errors > 0 {
            println!("  {} {}", "Errors:".red().bold(), stats.errors);
        }
        if stats.warnings > 0 {
            println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
        }
        if stats.muted > 0 {
            println!("  {} {}", "Muted:".bright_black(), stats.muted);
        }

        println!("  {} {}", "Total:".white().bold(), stats.total());

        let occurrences = lock(&self.occurrences);
        let mut by_count: Vec<(&&'static str, &u32)> = occurrences.iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (rule_id, count) in by_count.into_iter().take(10) {
            println!("  {} {}", format!("{:>5}×", count).cyan(), rule_id.white());
        }

        println!("{}\n", "====================================".bright_blue().bold());
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
