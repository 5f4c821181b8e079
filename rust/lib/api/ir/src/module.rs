//! Module IR: the validated manifest of one module directory.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Dotted numeric module version (e.g. `17.0.1.2`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub Vec<u32>);

impl Version {
    /// Parse a dotted version. Empty segments and non-digits are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        s.split('.')
            .map(|part| {
                if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                    None
                } else {
                    part.parse::<u32>().ok()
                }
            })
            .collect::<Option<Vec<u32>>>()
            .map(Version)
    }
}

impl Default for Version {
    fn default() -> Self {
        Version(vec![1, 0])
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

/// Auto-install trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AutoInstall {
    /// `true`: install once every dependency is selected.
    Flag(bool),
    /// Install once every named module is selected.
    When(BTreeSet<String>),
}

impl Default for AutoInstall {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl AutoInstall {
    pub fn is_enabled(&self) -> bool {
        match self {
            AutoInstall::Flag(b) => *b,
            AutoInstall::When(_) => true,
        }
    }
}

/// A validated module manifest. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Module identifier: the directory name (e.g. `sale`).
    pub module: String,

    /// Display label (`name` key).
    pub label: String,

    pub version: Version,

    /// Direct dependencies.
    pub depends: BTreeSet<String>,

    #[serde(default)]
    pub auto_install: AutoInstall,

    pub installable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Declared data files, relative to the module directory, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<String>,

    /// Declared demo files, relative to the module directory, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub demo: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Modules that may not be installed together with this one.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excludes: BTreeSet<String>,

    /// Module directory on disk.
    pub path: PathBuf,
}

impl Manifest {
    /// Modules that must be loaded before this one: `depends` plus
    /// the auto-install trigger set.
    pub fn load_after(&self) -> BTreeSet<&str> {
        let mut deps: BTreeSet<&str> = self.depends.iter().map(String::as_str).collect();
        if let AutoInstall::When(trigger) = &self.auto_install {
            deps.extend(trigger.iter().map(String::as_str));
        }
        deps
    }

    /// The set that must be selected for auto-install to fire.
    pub fn auto_install_trigger(&self) -> Option<BTreeSet<&str>> {
        match &self.auto_install {
            AutoInstall::Flag(true) => Some(self.depends.iter().map(String::as_str).collect()),
            AutoInstall::Flag(false) => None,
            AutoInstall::When(set) => Some(set.iter().map(String::as_str).collect()),
        }
    }
}
