//! Shared types used across all IR layers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field kind, as declared by a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Char {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u32>,
    },
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Binary,
    /// Foreign key to a single record of `target`.
    Many2one { target: String },
    /// Reverse side of a `many2one` named `inverse` on `target`.
    One2many { target: String, inverse: String },
    /// Join table relation; `relation` is the optional table hint.
    Many2many {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relation: Option<String>,
    },
    /// Enumerated selection, options kept in insertion order.
    Selection {
        options: Vec<SelectionOption>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        on_delete: BTreeMap<String, OnDeletePolicy>,
    },
    /// Polymorphic reference to a record of one of `models`.
    Reference { models: Vec<String> },
    /// Value computed from `sources` (dotted field paths).
    Computed {
        value: Box<FieldKind>,
        sources: BTreeSet<String>,
    },
}

impl FieldKind {
    /// Short kind name (e.g. `many2one`), used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Char { .. } => "char",
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Datetime => "datetime",
            FieldKind::Binary => "binary",
            FieldKind::Many2one { .. } => "many2one",
            FieldKind::One2many { .. } => "one2many",
            FieldKind::Many2many { .. } => "many2many",
            FieldKind::Selection { .. } => "selection",
            FieldKind::Reference { .. } => "reference",
            FieldKind::Computed { .. } => "computed",
        }
    }

    /// The stored value kind: the wrapped kind for computed fields, `self` otherwise.
    pub fn value_kind(&self) -> &FieldKind {
        match self {
            FieldKind::Computed { value, .. } => value.value_kind(),
            other => other,
        }
    }

    /// True when both kinds have the same shape and point at the same models.
    ///
    /// Char size, selection options and computed sources are attributes,
    /// not part of the kind.
    pub fn same_kind(&self, other: &FieldKind) -> bool {
        match (self, other) {
            (FieldKind::Char { .. }, FieldKind::Char { .. }) => true,
            (FieldKind::Many2one { target: a }, FieldKind::Many2one { target: b }) => a == b,
            (
                FieldKind::One2many { target: a, inverse: ia },
                FieldKind::One2many { target: b, inverse: ib },
            ) => a == b && ia == ib,
            (FieldKind::Many2many { target: a, .. }, FieldKind::Many2many { target: b, .. }) => {
                a == b
            }
            (FieldKind::Selection { .. }, FieldKind::Selection { .. }) => true,
            (FieldKind::Reference { models: a }, FieldKind::Reference { models: b }) => a == b,
            (FieldKind::Computed { value: a, .. }, FieldKind::Computed { value: b, .. }) => {
                a.same_kind(b)
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }

    /// Models this field points at, in declaration order.
    pub fn relation_targets(&self) -> Vec<&str> {
        match self.value_kind() {
            FieldKind::Many2one { target }
            | FieldKind::One2many { target, .. }
            | FieldKind::Many2many { target, .. } => vec![target.as_str()],
            FieldKind::Reference { models } => models.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Single-record-or-set relational kinds a related path may traverse.
    pub fn traversable_target(&self) -> Option<&str> {
        match self.value_kind() {
            FieldKind::Many2one { target }
            | FieldKind::One2many { target, .. }
            | FieldKind::Many2many { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_selection(&self) -> bool {
        matches!(self.value_kind(), FieldKind::Selection { .. })
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Char { size: Some(n) } => write!(f, "char({})", n),
            FieldKind::Many2one { target } => write!(f, "many2one({})", target),
            FieldKind::One2many { target, inverse } => {
                write!(f, "one2many({}, {})", target, inverse)
            }
            FieldKind::Many2many { target, .. } => write!(f, "many2many({})", target),
            FieldKind::Reference { models } => write!(f, "reference({})", models.join(", ")),
            FieldKind::Computed { value, .. } => write!(f, "computed({})", value),
            other => f.write_str(other.name()),
        }
    }
}

/// One option of a selection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOption {
    pub key: String,
    pub label: String,
}

impl SelectionOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// What happens to records holding an option when the option is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDeletePolicy {
    SetNull,
    Cascade,
    SetDefault,
    Restrict,
    /// Reassign to another option key.
    SetValue(String),
}

impl OnDeletePolicy {
    /// Parse `set null`, `cascade`, `set default`, `restrict` or `set <key>`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s {
            "set null" | "set_null" => Some(Self::SetNull),
            "cascade" => Some(Self::Cascade),
            "set default" | "set_default" => Some(Self::SetDefault),
            "restrict" => Some(Self::Restrict),
            _ => s
                .strip_prefix("set ")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| Self::SetValue(v.to_string())),
        }
    }
}

/// A named check constraint carried by a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub check: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Derive the default storage table name from a model name.
pub fn default_table(model: &str) -> String {
    model.replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_kind_ignores_attributes() {
        assert!(FieldKind::Char { size: Some(8) }.same_kind(&FieldKind::Char { size: None }));
        assert!(FieldKind::Integer.same_kind(&FieldKind::Integer));
        assert!(!FieldKind::Integer.same_kind(&FieldKind::Float));

        let a = FieldKind::Many2one { target: "res.partner".into() };
        let b = FieldKind::Many2one { target: "res.users".into() };
        assert!(!a.same_kind(&b));
    }

    #[test]
    fn computed_wraps_value_kind() {
        let kind = FieldKind::Computed {
            value: Box::new(FieldKind::Many2one { target: "res.country".into() }),
            sources: BTreeSet::from(["partner_id.country_id".to_string()]),
        };
        assert_eq!(kind.value_kind().name(), "many2one");
        assert_eq!(kind.relation_targets(), vec!["res.country"]);
        assert!(!kind.same_kind(&FieldKind::Many2one { target: "res.country".into() }));
    }

    #[test]
    fn on_delete_parse() {
        assert_eq!(OnDeletePolicy::parse("set null"), Some(OnDeletePolicy::SetNull));
        assert_eq!(OnDeletePolicy::parse("cascade"), Some(OnDeletePolicy::Cascade));
        assert_eq!(
            OnDeletePolicy::parse("set draft"),
            Some(OnDeletePolicy::SetValue("draft".into()))
        );
        assert_eq!(OnDeletePolicy::parse("explode"), None);
    }

    #[test]
    fn display() {
        let kind = FieldKind::One2many {
            target: "sale.order.line".into(),
            inverse: "order_id".into(),
        };
        assert_eq!(kind.to_string(), "one2many(sale.order.line, order_id)");
        assert_eq!(default_table("sale.order.line"), "sale_order_line");
    }
}
