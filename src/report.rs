use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Network,
    Parse,
    Materialize,
    /// The pipeline task itself panicked or was aborted.
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Network => "network",
            FailureKind::Parse => "parse",
            FailureKind::Materialize => "materialize",
            FailureKind::Panic => "panic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub id: u64,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    total: u64,
    succeeded: u64,
    skipped: u64,
    by_kind: BTreeMap<FailureKind, u64>,
    failures: Vec<Failure>,
}

impl RunReport {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, id: u64, err: &PipelineError) {
        self.push(id, err.kind(), err.to_string());
    }

    pub fn record_panic(&mut self, id: u64, message: String) {
        self.push(id, FailureKind::Panic, message);
    }

    /// Identifiers never dispatched because the run was cancelled.
    pub fn record_skipped(&mut self, n: u64) {
        self.skipped += n;
    }

    fn push(&mut self, id: u64, kind: FailureKind, message: String) {
        *self.by_kind.entry(kind).or_default() += 1;
        self.failures.push(Failure { id, kind, message });
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    pub fn count(&self, kind: FailureKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Failures ordered by identifier.
    pub fn failures(&self) -> Vec<&Failure> {
        let mut failures = self.failures.iter().collect::<Vec<_>>();
        failures.sort_by_key(|f| f.id);
        failures
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }

    /// Process exit status for this run. Failures only count when
    /// `fail_on_error` is set.
    pub fn exit_code(&self, fail_on_error: bool) -> i32 {
        if fail_on_error && !self.is_clean() { 1 } else { 0 }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} succeeded, {} failed, {} skipped",
            self.succeeded,
            self.total,
            self.failed(),
            self.skipped
        )?;
        if !self.by_kind.is_empty() {
            write!(f, " (")?;
            for (i, (kind, n)) in self.by_kind.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", kind, n)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
