//! Manifest reader: one module directory → one validated [`Manifest`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use openerp_core::{Abort, DiagnosticSink};
use openerp_ir::{AutoInstall, Diagnostic, DiagnosticKind, Manifest, Version};
use serde::Deserialize;
use tracing::debug;

/// Keys the loader accepts but does not interpret.
const IGNORED_KEYS: &[&str] = &[
    "application",
    "description",
    "summary",
    "assets",
    "sequence",
    "external_dependencies",
    "author",
    "website",
];

/// The manifest as written on disk, before validation.
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    depends: Option<toml::Value>,
    #[serde(default)]
    auto_install: AutoInstall,
    #[serde(default = "default_true")]
    installable: bool,
    category: Option<String>,
    #[serde(default)]
    data: Vec<String>,
    #[serde(default)]
    demo: Vec<String>,
    license: Option<String>,
    excludes: Option<toml::Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, toml::Value>,
}

fn default_true() -> bool {
    true
}

/// An optional array of non-empty strings. `None` when the value has any
/// other shape.
fn module_names(value: Option<&toml::Value>) -> Option<BTreeSet<String>> {
    let Some(value) = value else {
        return Some(BTreeSet::new());
    };
    value
        .as_array()?
        .iter()
        .map(|item| match item.as_str().map(str::trim) {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => None,
        })
        .collect()
}

/// Reads `manifest.toml` (or the configured file name) at a module root.
#[derive(Debug, Clone)]
pub struct ManifestReader {
    manifest_file: String,
    with_demo: bool,
}

impl Default for ManifestReader {
    fn default() -> Self {
        Self::new("manifest.toml", true)
    }
}

impl ManifestReader {
    pub fn new(manifest_file: impl Into<String>, with_demo: bool) -> Self {
        Self {
            manifest_file: manifest_file.into(),
            with_demo,
        }
    }

    pub fn manifest_file(&self) -> &str {
        &self.manifest_file
    }

    /// True when `dir` holds a manifest file.
    pub fn is_module(&self, dir: &Path) -> bool {
        dir.join(&self.manifest_file).is_file()
    }

    /// Read and validate the manifest of the module at `dir`.
    ///
    /// Returns `Ok(None)` when the directory has no manifest (skipped with a
    /// warning) or the manifest is invalid (`BadManifest` recorded).
    pub fn read(&self, dir: &Path, sink: &mut DiagnosticSink) -> Result<Option<Manifest>, Abort> {
        let Some(module) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            sink.push(Diagnostic::new(
                DiagnosticKind::ModuleSkipped,
                format!("{:?} has no usable directory name", dir),
            ))?;
            return Ok(None);
        };

        let path = dir.join(&self.manifest_file);
        if !path.is_file() {
            sink.push(
                Diagnostic::new(
                    DiagnosticKind::ModuleSkipped,
                    format!("no {} in {:?}", self.manifest_file, dir),
                )
                .in_module(&module),
            )?;
            return Ok(None);
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                sink.push(
                    Diagnostic::new(DiagnosticKind::Io, format!("cannot read {:?}: {}", path, e))
                        .in_module(&module),
                )?;
                return Ok(None);
            }
        };

        let mut errors = Vec::new();
        let bad = |message: String| {
            Diagnostic::new(DiagnosticKind::BadManifest, message).in_module(module.as_str())
        };

        let raw: RawManifest = match toml::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                sink.push(bad(format!("{}: {}", self.manifest_file, e.message())))?;
                return Ok(None);
            }
        };

        for key in raw.extra.keys() {
            if !IGNORED_KEYS.contains(&key.as_str()) {
                sink.push(
                    Diagnostic::new(
                        DiagnosticKind::UnknownManifestKey,
                        format!("unknown manifest key '{}' ignored", key),
                    )
                    .in_module(&module),
                )?;
            }
        }

        let label = match raw.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                errors.push(bad("missing required field `name`".into()));
                String::new()
            }
        };

        let version = match raw.version.as_deref() {
            None => Version::default(),
            Some(v) => Version::parse(v).unwrap_or_else(|| {
                errors.push(bad(format!("version '{}' is not dotted numeric", v)));
                Version::default()
            }),
        };

        let depends = match module_names(raw.depends.as_ref()) {
            Some(names) => names,
            None => {
                errors.push(bad("`depends` must be an array of module names".into()));
                BTreeSet::new()
            }
        };
        let excludes = match module_names(raw.excludes.as_ref()) {
            Some(names) => names,
            None => {
                errors.push(bad("`excludes` must be an array of module names".into()));
                BTreeSet::new()
            }
        };
        if depends.contains(&module) {
            errors.push(bad("module depends on itself".into()));
        }

        let mut files: Vec<&String> = raw.data.iter().collect();
        if self.with_demo {
            files.extend(raw.demo.iter());
        }
        for file in files {
            if !dir.join(file).is_file() {
                errors.push(bad(format!("declared file '{}' does not exist", file)));
            }
        }

        if !errors.is_empty() {
            sink.extend(errors)?;
            return Ok(None);
        }

        debug!("ManifestReader: {} {} ({} deps)", module, version, depends.len());
        Ok(Some(Manifest {
            module,
            label,
            version,
            depends,
            auto_install: raw.auto_install,
            installable: raw.installable,
            category: raw.category,
            data: raw.data,
            demo: raw.demo,
            license: raw.license,
            excludes,
            path: dir.to_path_buf(),
        }))
    }
}
