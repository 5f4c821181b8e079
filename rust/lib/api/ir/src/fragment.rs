//! Fragment IR: one module's typed contribution to one model.
//!
//! Corresponds to one `#[model(...)]` struct (or one marker field inside
//! it) in a module's `models/*.rs` files.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::FieldSpec;
use crate::types::{Constraint, OnDeletePolicy, SelectionOption};

/// Where a fragment was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRef {
    /// Path relative to the module directory (e.g. `models/sale_order.rs`).
    pub file: String,
    /// 1-based line of the declaration.
    pub line: usize,
    /// Rust item name (e.g. `SaleOrder`).
    pub item: String,
}

impl fmt::Display for FragmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.file, self.line, self.item)
    }
}

/// A new model identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelNew {
    pub model: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default)]
    pub is_abstract: bool,
}

/// In-place extension of an existing model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelExtend {
    pub model: String,
    /// Added fields and explicit overrides (`FieldSpec::is_override`), in order.
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// A new model copied from `base` at declaration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPrototype {
    pub model: String,
    pub base: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A new model exposing other models' fields through foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDelegate {
    pub model: String,
    /// Target model → foreign key field name, in declaration order.
    pub delegated_to: IndexMap<String, String>,
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Options appended to an existing selection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionExtend {
    pub model: String,
    pub field: String,
    pub added_options: Vec<SelectionOption>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub on_delete: IndexMap<String, OnDeletePolicy>,
}

/// A field whose value is read along a chain of relational fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedOverride {
    pub model: String,
    pub field: String,
    pub path: Vec<String>,
    #[serde(default)]
    pub writable: bool,
    /// Extra attributes declared on the field (label, help, groups...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// The typed contribution variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fragment", rename_all = "snake_case")]
pub enum FragmentKind {
    New(ModelNew),
    Extend(ModelExtend),
    Prototype(ModelPrototype),
    Delegate(ModelDelegate),
    SelectionExtend(SelectionExtend),
    RelatedOverride(RelatedOverride),
}

/// A fragment tagged with its declaring module and source coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub module: String,
    pub source: FragmentRef,
    pub kind: FragmentKind,
}

impl Fragment {
    /// The model this fragment creates or modifies.
    pub fn model(&self) -> &str {
        match &self.kind {
            FragmentKind::New(f) => &f.model,
            FragmentKind::Extend(f) => &f.model,
            FragmentKind::Prototype(f) => &f.model,
            FragmentKind::Delegate(f) => &f.model,
            FragmentKind::SelectionExtend(f) => &f.model,
            FragmentKind::RelatedOverride(f) => &f.model,
        }
    }

    /// Variant name, used in logs.
    pub fn variant(&self) -> &'static str {
        match &self.kind {
            FragmentKind::New(_) => "new",
            FragmentKind::Extend(_) => "extend",
            FragmentKind::Prototype(_) => "prototype",
            FragmentKind::Delegate(_) => "delegate",
            FragmentKind::SelectionExtend(_) => "selection_extend",
            FragmentKind::RelatedOverride(_) => "related_override",
        }
    }

    /// True if this fragment declares a new model identity.
    pub fn declares_model(&self) -> bool {
        matches!(
            self.kind,
            FragmentKind::New(_) | FragmentKind::Prototype(_) | FragmentKind::Delegate(_)
        )
    }
}
