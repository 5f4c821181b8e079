//! Diagnostic IR: warnings and errors produced while loading.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fragment::FragmentRef;

/// How bad a diagnostic is. Ordered: `Info < Warning < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Kept on the registry.
    Info,
    /// Kept on the registry.
    Warning,
    /// Accumulates; the load aborts at the end of the current phase.
    Error,
    /// Aborts the load immediately.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        })
    }
}

/// Stable diagnostic kinds. Clients match on [`DiagnosticKind::code`],
/// never on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    BadManifest,
    ModuleSkipped,
    ModuleShadowed,
    UnknownManifestKey,
    ModuleNotInstallable,
    MissingDependency,
    CycleDetected,
    ModuleConflict,
    BadFragment,
    LoadOrderViolation,
    ModelAlreadyDeclared,
    UnknownModel,
    UnknownField,
    ModelNotVisible,
    FieldRedefinedWithoutOverride,
    IncompatibleFieldOverride,
    DuplicateSelectionOption,
    DelegateAmbiguous,
    UnknownRelationTarget,
    InvalidRelatedPath,
    MissingInverse,
    RegistryInvariantViolation,
    Cancelled,
    Io,
}

impl DiagnosticKind {
    /// Stable, machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::BadManifest => "BAD_MANIFEST",
            DiagnosticKind::ModuleSkipped => "MODULE_SKIPPED",
            DiagnosticKind::ModuleShadowed => "MODULE_SHADOWED",
            DiagnosticKind::UnknownManifestKey => "UNKNOWN_MANIFEST_KEY",
            DiagnosticKind::ModuleNotInstallable => "MODULE_NOT_INSTALLABLE",
            DiagnosticKind::MissingDependency => "MISSING_DEPENDENCY",
            DiagnosticKind::CycleDetected => "CYCLE_DETECTED",
            DiagnosticKind::ModuleConflict => "MODULE_CONFLICT",
            DiagnosticKind::BadFragment => "BAD_FRAGMENT",
            DiagnosticKind::LoadOrderViolation => "LOAD_ORDER_VIOLATION",
            DiagnosticKind::ModelAlreadyDeclared => "MODEL_ALREADY_DECLARED",
            DiagnosticKind::UnknownModel => "UNKNOWN_MODEL",
            DiagnosticKind::UnknownField => "UNKNOWN_FIELD",
            DiagnosticKind::ModelNotVisible => "MODEL_NOT_VISIBLE",
            DiagnosticKind::FieldRedefinedWithoutOverride => "FIELD_REDEFINED_WITHOUT_OVERRIDE",
            DiagnosticKind::IncompatibleFieldOverride => "INCOMPATIBLE_FIELD_OVERRIDE",
            DiagnosticKind::DuplicateSelectionOption => "DUPLICATE_SELECTION_OPTION",
            DiagnosticKind::DelegateAmbiguous => "DELEGATE_AMBIGUOUS",
            DiagnosticKind::UnknownRelationTarget => "UNKNOWN_RELATION_TARGET",
            DiagnosticKind::InvalidRelatedPath => "INVALID_RELATED_PATH",
            DiagnosticKind::MissingInverse => "MISSING_INVERSE",
            DiagnosticKind::RegistryInvariantViolation => "REGISTRY_INVARIANT_VIOLATION",
            DiagnosticKind::Cancelled => "CANCELLED",
            DiagnosticKind::Io => "IO",
        }
    }

    /// Severity the kind is raised with unless the raising stage says otherwise.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticKind::ModuleSkipped | DiagnosticKind::ModuleShadowed => Severity::Warning,
            DiagnosticKind::UnknownManifestKey => Severity::Info,
            DiagnosticKind::CycleDetected
            | DiagnosticKind::RegistryInvariantViolation
            | DiagnosticKind::LoadOrderViolation
            | DiagnosticKind::Cancelled => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Kinds that report a broken registry invariant.
    pub fn is_invariant(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::RegistryInvariantViolation
                | DiagnosticKind::UnknownRelationTarget
                | DiagnosticKind::InvalidRelatedPath
                | DiagnosticKind::MissingInverse
                | DiagnosticKind::UnknownModel
                | DiagnosticKind::DuplicateSelectionOption
                | DiagnosticKind::ModelNotVisible
                | DiagnosticKind::FieldRedefinedWithoutOverride
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One finding, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Module the finding is attributed to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<FragmentRef>,
    pub message: String,
}

impl Diagnostic {
    /// A diagnostic at the kind's default severity.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: kind.default_severity(),
            kind,
            module: None,
            fragment: None,
            message: message.into(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn at(mut self, fragment: FragmentRef) -> Self {
        self.fragment = Some(fragment);
        self
    }

    /// True for `error` and `fatal`.
    pub fn is_failure(&self) -> bool {
        self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.kind.code())?;
        if let Some(module) = &self.module {
            write!(f, " {}", module)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, " {}", fragment)?;
        }
        write!(f, ": {}", self.message)
    }
}
