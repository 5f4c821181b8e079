//! Module discovery across addon roots.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use openerp_core::{Abort, DiagnosticSink};
use openerp_ir::{Diagnostic, DiagnosticKind, Manifest};
use tracing::{debug, info};

use crate::manifest::ManifestReader;

/// Scan every root (non-recursively) for module directories.
///
/// ```text
/// addons/                  ← root 1
/// ├── base/manifest.toml   → base
/// └── sale/manifest.toml   → sale
/// enterprise/              ← root 2
/// └── sale/manifest.toml   → shadowed by addons/sale (warning)
/// ```
///
/// Roots are visited in the given order, directories within a root by
/// name. Returns the valid manifests keyed by module identifier, sorted
/// by identifier.
pub fn discover(
    roots: &[PathBuf],
    reader: &ManifestReader,
    sink: &mut DiagnosticSink,
) -> Result<IndexMap<String, Manifest>, Abort> {
    let mut found: IndexMap<String, Manifest> = IndexMap::new();
    let mut origin: IndexMap<String, PathBuf> = IndexMap::new();

    for root in roots {
        let dirs = match module_dirs(root) {
            Ok(dirs) => dirs,
            Err(e) => {
                sink.push(Diagnostic::new(
                    DiagnosticKind::Io,
                    format!("cannot read addon root {:?}: {}", root, e),
                ))?;
                continue;
            }
        };

        for dir in dirs {
            let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(first) = origin.get(name) {
                if reader.is_module(&dir) {
                    sink.push(
                        Diagnostic::new(
                            DiagnosticKind::ModuleShadowed,
                            format!("{:?} is shadowed by {:?}", dir, first),
                        )
                        .in_module(name),
                    )?;
                }
                continue;
            }
            if let Some(manifest) = reader.read(&dir, sink)? {
                debug!("discover: {} at {:?}", manifest.module, dir);
                origin.insert(manifest.module.clone(), dir.clone());
                found.insert(manifest.module.clone(), manifest);
            } else if reader.is_module(&dir) {
                // invalid manifest: still claims the name
                origin.insert(name.to_string(), dir.clone());
            }
        }
    }

    found.sort_keys();
    info!("discovered {} modules in {} roots", found.len(), roots.len());
    Ok(found)
}

/// Subdirectories of `root`, sorted by name. Hidden entries are skipped.
fn module_dirs(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.') || n.starts_with("__"));
        if path.is_dir() && !hidden {
            dirs.push(path);
        }
    }
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(dirs)
}
