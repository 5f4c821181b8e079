//! Model IR: field specs and composite model definitions.
//!
//! A `FieldSpec` is what one fragment says about one field. A
//! `CompositeModel` is the merge of every fragment for one model name,
//! across all loaded modules in load order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{Constraint, FieldKind};

/// A field as declared by a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name (e.g. `partner_id`).
    pub name: String,

    pub kind: FieldKind,

    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub readonly: bool,

    #[serde(default)]
    pub index: bool,

    #[serde(default)]
    pub translate: bool,

    /// Default value expression, opaque to the loader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Access groups (e.g. `base.group_user`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    /// Explicit override marker. Only an override may re-introduce an existing name.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_override: bool,

    /// Set once a related field has been resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedSpec>,
}

impl FieldSpec {
    /// A plain field with every attribute at its default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            string: None,
            required: false,
            readonly: false,
            index: false,
            translate: false,
            default: None,
            groups: Vec::new(),
            help: None,
            is_override: false,
            related: None,
        }
    }

    pub fn is_relational(&self) -> bool {
        !self.kind.relation_targets().is_empty()
    }
}

/// Path of a related field, starting at the declaring model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedSpec {
    pub path: Vec<String>,
    pub writable: bool,
}

/// One module's contribution to a field, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOrigin {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// The merged definition of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeModel {
    /// Model name (e.g. `sale.order`).
    pub name: String,

    /// Module holding the authoritative declaration.
    pub declared_in: String,

    /// Storage table name.
    pub table: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    /// Effective fields, in first-declaration order.
    pub fields: IndexMap<String, FieldSpec>,

    /// Contributors per field, for diagnostics.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub field_origins: IndexMap<String, Vec<FieldOrigin>>,

    /// Every module that contributed, in load order, without repeats.
    pub origin_chain: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,

    #[serde(default)]
    pub is_abstract: bool,

    /// Base model this one was copied from, if created by prototype.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype_of: Option<String>,

    /// Delegated targets: target model → foreign key field on this model.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub delegates: IndexMap<String, String>,

    /// Delegation view: field not defined here → foreign key it resolves through.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub delegated_fields: IndexMap<String, String>,
}

impl CompositeModel {
    /// An empty composite declared by `module`.
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        let name = name.into();
        let module = module.into();
        Self {
            table: crate::types::default_table(&name),
            name,
            declared_in: module.clone(),
            description: None,
            order: None,
            fields: IndexMap::new(),
            field_origins: IndexMap::new(),
            origin_chain: vec![module],
            constraints: Vec::new(),
            is_abstract: false,
            prototype_of: None,
            delegates: IndexMap::new(),
            delegated_fields: IndexMap::new(),
        }
    }

    /// Get a field defined directly on this model.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Record a contributing module on the origin chain.
    pub fn touch(&mut self, module: &str) {
        if !self.origin_chain.iter().any(|m| m == module) {
            self.origin_chain.push(module.to_string());
        }
    }

    /// Fields whose kind points at other models.
    pub fn relational_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values().filter(|f| f.is_relational())
    }
}
