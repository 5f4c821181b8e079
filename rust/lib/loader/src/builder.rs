//! Registry builder: composite models → frozen [`Registry`].

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use openerp_core::{Abort, DiagnosticSink};
use openerp_ir::{
    CompositeModel, Diagnostic, DiagnosticKind, EdgeKind, FieldKind, Registry, RelationEdge,
    Severity,
};
use openerp_validate::{points_back, validate_load_order, validate_registry};
use tracing::info;

/// Derive relation edges, check every invariant, and freeze.
///
/// `depends` maps each loaded module to its load-after set and is used to
/// re-check `load_order`. Any violation aborts the freeze.
pub fn build(
    models: IndexMap<String, CompositeModel>,
    load_order: Vec<String>,
    depends: &BTreeMap<String, BTreeSet<String>>,
    sink: &mut DiagnosticSink,
) -> Result<Registry, Abort> {
    let registry = Registry::new(models, Vec::new(), load_order, Vec::new());

    let edges = relation_edges(&registry, sink)?;
    sink.end_phase("edges")?;
    let registry = registry.with_edges(edges);

    let mut violations = validate_registry(&registry);
    violations.extend(validate_load_order(registry.load_order(), depends));
    for violation in violations {
        sink.push(violation.to_diagnostic().with_severity(Severity::Error))?;
    }
    sink.end_phase("freeze")?;

    info!(
        "registry frozen: {} models, {} edges, {} modules",
        registry.len(),
        registry.edges().count(),
        registry.load_order().len()
    );
    Ok(registry)
}

fn relation_edges(registry: &Registry, sink: &mut DiagnosticSink) -> Result<Vec<RelationEdge>, Abort> {
    let mut edges = Vec::new();
    for model in registry.models() {
        for field in model.fields.values() {
            let edge = |target: &str, kind: EdgeKind| RelationEdge {
                source_model: model.name.clone(),
                field: field.name.clone(),
                target_model: target.to_string(),
                kind,
                inverse: None,
                relation: None,
            };
            match field.kind.value_kind() {
                FieldKind::Many2one { target } => edges.push(edge(target, EdgeKind::Many2one)),
                FieldKind::One2many { target, inverse } => {
                    if !has_inverse(registry, model, target, inverse) {
                        let introduced_by = model
                            .field_origins
                            .get(&field.name)
                            .and_then(|o| o.first())
                            .map(|o| o.module.as_str())
                            .unwrap_or(model.declared_in.as_str());
                        sink.push(
                            Diagnostic::new(
                                DiagnosticKind::MissingInverse,
                                format!(
                                    "{}.{}: no many2one '{}.{}' pointing back",
                                    model.name, field.name, target, inverse
                                ),
                            )
                            .in_module(introduced_by),
                        )?;
                        continue;
                    }
                    edges.push(RelationEdge {
                        inverse: Some(inverse.clone()),
                        ..edge(target, EdgeKind::One2many)
                    });
                }
                FieldKind::Many2many { target, relation } => {
                    let relation = relation
                        .clone()
                        .unwrap_or_else(|| join_table(registry, model, target));
                    edges.push(RelationEdge {
                        relation: Some(relation),
                        ..edge(target, EdgeKind::Many2many)
                    });
                }
                FieldKind::Reference { models } => {
                    edges.extend(models.iter().map(|m| edge(m, EdgeKind::Reference)));
                }
                _ => {}
            }
        }
    }
    Ok(edges)
}

/// The one2many's inverse exists on `target` (directly or delegated) and is
/// a many2one back to `model` itself.
fn has_inverse(registry: &Registry, model: &CompositeModel, target: &str, inverse: &str) -> bool {
    registry
        .resolve_field(target, inverse)
        .is_some_and(|access| points_back(access.field, &model.name))
}

/// Default many2many join table: both tables sorted, then `_rel`.
fn join_table(registry: &Registry, model: &CompositeModel, target: &str) -> String {
    let other = registry
        .model(target)
        .map(|m| m.table.clone())
        .unwrap_or_else(|| openerp_ir::default_table(target));
    let mut tables = [model.table.clone(), other];
    tables.sort();
    format!("{}_{}_rel", tables[0], tables[1])
}
