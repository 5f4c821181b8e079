//! Addon trees on disk for loader integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use openerp_core::LoadError;
use openerp_ir::Registry;
use tempfile::TempDir;

/// One addon root in a temporary directory.
pub struct Addons {
    dir: TempDir,
}

impl Addons {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create `name/manifest.toml`. `extra` is appended after the `name` key.
    pub fn module(&self, name: &str, extra: &str) -> &Self {
        let dir = self.dir.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("manifest.toml"),
            format!("name = \"{}\"\n{}\n", name, extra),
        )
        .unwrap();
        self
    }

    /// Write `name/models/<file>`.
    pub fn models(&self, module: &str, file: &str, source: &str) -> &Self {
        let path = self.dir.path().join(module).join("models").join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
        self
    }

    pub fn load(&self, requested: &[&str]) -> Result<Registry, LoadError> {
        let requested: BTreeSet<String> = requested.iter().map(|m| m.to_string()).collect();
        openerp_loader::load(&requested, &[self.root()])
    }
}
