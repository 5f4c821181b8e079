use openerp_ir::{Diagnostic, DiagnosticKind, Severity};
use thiserror::Error;

use crate::config::ConfigError;

// ── Exit codes ──────────────────────────────────────────────────────
//
// Stable process exit codes for the CLI. Scripts match on these,
// never on the printed diagnostics.

/// Stable exit code constants.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const OTHER: i32 = 1;
    pub const MISSING_DEPENDENCY: i32 = 2;
    pub const CYCLE: i32 = 3;
    pub const INVARIANT_VIOLATION: i32 = 4;
    pub const BAD_MANIFEST: i32 = 5;
}

/// Exit code a failed load reports for a diagnostic of `kind`.
pub fn exit_code_for(kind: DiagnosticKind) -> i32 {
    match kind {
        DiagnosticKind::MissingDependency => exit_code::MISSING_DEPENDENCY,
        DiagnosticKind::CycleDetected => exit_code::CYCLE,
        DiagnosticKind::BadManifest => exit_code::BAD_MANIFEST,
        k if k.is_invariant() => exit_code::INVARIANT_VIOLATION,
        _ => exit_code::OTHER,
    }
}

// ── LoadError ───────────────────────────────────────────────────────

/// Aggregate error returned by a failed load.
///
/// A load never returns a partial registry. `Aborted` carries every
/// diagnostic raised up to the abort, in the order they were raised.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{}", summarize(.diagnostics))]
    Aborted { diagnostics: Vec<Diagnostic> },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    let failures: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.is_failure()).collect();
    match failures.first() {
        Some(first) if failures.len() == 1 => format!("load aborted: {}", first),
        Some(first) => format!(
            "load aborted with {} errors, first: {}",
            failures.len(),
            first
        ),
        None => "load aborted".to_string(),
    }
}

impl LoadError {
    /// All diagnostics, in the order they were raised.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            LoadError::Aborted { diagnostics } => diagnostics,
            LoadError::Config(_) => &[],
        }
    }

    /// The first `error` or `fatal` diagnostic.
    pub fn first_failure(&self) -> Option<&Diagnostic> {
        self.diagnostics().iter().find(|d| d.is_failure())
    }

    /// Diagnostics of at least `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics().iter().filter(move |d| d.severity >= severity)
    }

    /// True when some diagnostic has `kind`.
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics().iter().any(|d| d.kind == kind)
    }

    /// Stable, machine-readable code of the first failure.
    pub fn error_code(&self) -> &'static str {
        match self {
            LoadError::Config(_) => "CONFIG",
            LoadError::Aborted { .. } => self
                .first_failure()
                .map(|d| d.kind.code())
                .unwrap_or("UNKNOWN"),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        self.first_failure()
            .map(|d| exit_code_for(d.kind))
            .unwrap_or(exit_code::OTHER)
    }
}
