//! Registry IR: the frozen output of a successful load.
//!
//! This is what gets handed to the rest of the system and what the CLI
//! dumps as JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::model::{CompositeModel, FieldSpec};

/// Relation kind of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Many2one,
    One2many,
    Many2many,
    Reference,
}

/// Directed edge `(source_model, field) → target_model`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub source_model: String,
    pub field: String,
    pub target_model: String,
    pub kind: EdgeKind,
    /// For one2many: the many2one field on the target pointing back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
    /// For many2many: the join table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

/// A field reached from some model, possibly through delegation.
#[derive(Debug, Clone)]
pub struct FieldAccess<'a> {
    /// Model that actually defines the field.
    pub model: &'a CompositeModel,
    pub field: &'a FieldSpec,
    /// Foreign keys traversed, outermost first. Empty for a direct field.
    pub via: Vec<String>,
}

/// Immutable registry of composite models. Readers need no locks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    models: IndexMap<String, CompositeModel>,
    edges: Vec<RelationEdge>,
    load_order: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Registry {
    /// Assemble a registry. Only the registry builder should call this.
    pub fn new(
        models: IndexMap<String, CompositeModel>,
        edges: Vec<RelationEdge>,
        load_order: Vec<String>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            models,
            edges,
            load_order,
            diagnostics,
        }
    }

    /// Replace the relation edges.
    pub fn with_edges(mut self, edges: Vec<RelationEdge>) -> Self {
        self.edges = edges;
        self
    }

    /// Replace the diagnostics carried by the registry.
    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Find a composite model by name.
    pub fn model(&self, name: &str) -> Option<&CompositeModel> {
        self.models.get(name)
    }

    /// All composite models, in declaration order.
    pub fn models(&self) -> impl Iterator<Item = &CompositeModel> {
        self.models.values()
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = &RelationEdge> {
        self.edges.iter()
    }

    /// Edges leaving `model`.
    pub fn edges_from<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a RelationEdge> {
        self.edges.iter().filter(move |e| e.source_model == model)
    }

    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Composite models keyed by name.
    pub fn model_map(&self) -> &IndexMap<String, CompositeModel> {
        &self.models
    }

    /// Look up `field` on `model`, following delegation when the model does
    /// not define it itself.
    pub fn resolve_field(&self, model: &str, field: &str) -> Option<FieldAccess<'_>> {
        resolve_field_in(&self.models, model, field)
    }
}

/// Look up `field` on `model` within `models`, following delegation keys
/// in declaration order. Works on composites that are not frozen yet.
pub fn resolve_field_in<'a>(
    models: &'a IndexMap<String, CompositeModel>,
    model: &str,
    field: &str,
) -> Option<FieldAccess<'a>> {
    fn visit<'a>(
        models: &'a IndexMap<String, CompositeModel>,
        name: &str,
        field: &str,
        via: &mut Vec<String>,
    ) -> Option<FieldAccess<'a>> {
        // deeper than the model count means a delegation loop
        if via.len() > models.len() {
            return None;
        }
        let current = models.get(name)?;
        if let Some(spec) = current.fields.get(field) {
            return Some(FieldAccess {
                model: current,
                field: spec,
                via: via.clone(),
            });
        }
        for (target, fk) in &current.delegates {
            via.push(fk.clone());
            if let Some(found) = visit(models, target, field, via) {
                return Some(found);
            }
            via.pop();
        }
        None
    }

    visit(models, model, field, &mut Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldKind;

    fn char_field(name: &str) -> FieldSpec {
        FieldSpec::new(name, FieldKind::Char { size: None })
    }

    fn sample() -> Registry {
        let mut partner = CompositeModel::new("res.partner", "base");
        partner.fields.insert("name".into(), char_field("name"));
        partner.fields.insert("email".into(), char_field("email"));

        let mut users = CompositeModel::new("res.users", "base");
        users.fields.insert(
            "partner_id".into(),
            FieldSpec::new(
                "partner_id",
                FieldKind::Many2one {
                    target: "res.partner".into(),
                },
            ),
        );
        users.fields.insert("login".into(), char_field("login"));
        users.delegates.insert("res.partner".into(), "partner_id".into());
        users.delegated_fields.insert("name".into(), "partner_id".into());
        users.delegated_fields.insert("email".into(), "partner_id".into());

        let mut models = IndexMap::new();
        models.insert(partner.name.clone(), partner);
        models.insert(users.name.clone(), users);
        Registry::new(
            models,
            vec![RelationEdge {
                source_model: "res.users".into(),
                field: "partner_id".into(),
                target_model: "res.partner".into(),
                kind: EdgeKind::Many2one,
                inverse: None,
                relation: None,
            }],
            vec!["base".into()],
            vec![],
        )
    }

    #[test]
    fn direct_and_delegated_lookup() {
        let registry = sample();

        let login = registry.resolve_field("res.users", "login").unwrap();
        assert_eq!(login.model.name, "res.users");
        assert!(login.via.is_empty());

        let email = registry.resolve_field("res.users", "email").unwrap();
        assert_eq!(email.model.name, "res.partner");
        assert_eq!(email.via, vec!["partner_id".to_string()]);

        assert!(registry.resolve_field("res.users", "missing").is_none());
        assert!(registry.resolve_field("res.partner", "login").is_none());
    }

    #[test]
    fn delegation_loop_terminates() {
        let mut a = CompositeModel::new("a", "m");
        a.delegates.insert("b".into(), "b_id".into());
        let mut b = CompositeModel::new("b", "m");
        b.delegates.insert("a".into(), "a_id".into());
        let mut models = IndexMap::new();
        models.insert(a.name.clone(), a);
        models.insert(b.name.clone(), b);
        assert!(resolve_field_in(&models, "a", "name").is_none());
    }

    #[test]
    fn accessors() {
        let registry = sample();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.load_order(), ["base".to_string()]);
        assert_eq!(registry.edges_from("res.users").count(), 1);
        assert_eq!(registry.edges_from("res.partner").count(), 0);
        assert!(registry.model("res.partner").is_some());
        assert!(registry.model("res.company").is_none());
    }
}
