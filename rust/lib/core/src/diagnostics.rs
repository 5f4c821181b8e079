//! Diagnostics sink shared by every load stage.
//!
//! Severity policy:
//! - `fatal`: the stage stops at once ([`DiagnosticSink::push`] returns [`Abort`])
//! - `error`: accumulates; [`DiagnosticSink::end_phase`] aborts if any were raised
//! - `warning` / `info`: kept and handed to the registry

use openerp_ir::{Diagnostic, Severity};
use tracing::{debug, error, info, warn};

use crate::error::LoadError;

/// Marker returned when the load must stop. The diagnostics explaining
/// why are in the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abort;

#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Vec<Diagnostic>,
    warnings_as_errors: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that promotes warnings to errors.
    pub fn strict(warnings_as_errors: bool) -> Self {
        Self {
            entries: Vec::new(),
            warnings_as_errors,
        }
    }

    /// Record a diagnostic. Returns `Err(Abort)` when it is fatal.
    pub fn push(&mut self, mut diag: Diagnostic) -> Result<(), Abort> {
        if self.warnings_as_errors && diag.severity == Severity::Warning {
            diag.severity = Severity::Error;
        }
        match diag.severity {
            Severity::Info => debug!("{}", diag),
            Severity::Warning => warn!("{}", diag),
            Severity::Error | Severity::Fatal => error!("{}", diag),
        }
        let fatal = diag.severity == Severity::Fatal;
        self.entries.push(diag);
        if fatal {
            Err(Abort)
        } else {
            Ok(())
        }
    }

    /// Record many diagnostics, stopping at the first fatal one.
    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) -> Result<(), Abort> {
        for diag in diags {
            self.push(diag)?;
        }
        Ok(())
    }

    /// Phase boundary: abort when any error has accumulated.
    pub fn end_phase(&mut self, phase: &str) -> Result<(), Abort> {
        let failures = self.failure_count();
        if failures > 0 {
            info!("phase {}: aborting with {} error(s)", phase, failures);
            Err(Abort)
        } else {
            debug!("phase {}: ok", phase);
            Ok(())
        }
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_failure)
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_failure()).count()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Everything recorded, for a registry that froze successfully.
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// The aggregate error for an aborted load.
    pub fn into_error(self) -> LoadError {
        LoadError::Aborted {
            diagnostics: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openerp_ir::DiagnosticKind;

    #[test]
    fn fatal_aborts_immediately() {
        let mut sink = DiagnosticSink::new();
        assert!(sink.push(Diagnostic::new(DiagnosticKind::ModuleSkipped, "w")).is_ok());
        assert!(sink.push(Diagnostic::new(DiagnosticKind::BadManifest, "e")).is_ok());
        assert_eq!(
            sink.push(Diagnostic::new(DiagnosticKind::CycleDetected, "f")),
            Err(Abort)
        );
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn errors_abort_at_phase_end() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::new(DiagnosticKind::UnknownManifestKey, "i")).unwrap();
        assert!(sink.end_phase("manifests").is_ok());

        sink.extend(vec![
            Diagnostic::new(DiagnosticKind::BadManifest, "a"),
            Diagnostic::new(DiagnosticKind::BadManifest, "b"),
        ])
        .unwrap();
        assert_eq!(sink.end_phase("manifests"), Err(Abort));
        assert_eq!(sink.failure_count(), 2);

        let err = sink.into_error();
        assert_eq!(err.diagnostics().len(), 3);
        assert_eq!(err.diagnostics()[1].message, "a");
    }

    #[test]
    fn strict_promotes_warnings() {
        let mut sink = DiagnosticSink::strict(true);
        sink.push(Diagnostic::new(DiagnosticKind::ModuleShadowed, "w")).unwrap();
        sink.push(Diagnostic::new(DiagnosticKind::UnknownManifestKey, "i")).unwrap();
        assert_eq!(sink.entries()[0].severity, Severity::Error);
        assert_eq!(sink.entries()[1].severity, Severity::Info);
        assert!(sink.end_phase("discovery").is_err());
    }
}
