//! OpenERP Registry Validator
//!
//! Consistency checks run on a registry right before it is frozen:
//! - Relational fields and edges must target models in the registry
//! - Selection option keys must be unique per field
//! - Related paths must traverse relational fields and end on a field
//! - One2many inverses must be many2one fields pointing back
//! - Delegation foreign keys must be many2one fields to their target
//! - The load order must respect every module's dependencies

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use openerp_ir::*;

/// A validation error with a descriptive message.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    /// Which check produced the error (relation, selection, related, ...).
    pub layer: String,
    /// Which model (or module, for load order) the error is about.
    pub context: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.layer, self.context, self.message)
    }
}

impl ValidationError {
    fn new(layer: &str, context: &str, message: String) -> Self {
        Self {
            message,
            layer: layer.into(),
            context: context.into(),
        }
    }

    /// A failed re-verification aborts the load.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::RegistryInvariantViolation, self.to_string())
    }
}

/// Validate an entire registry.
/// Returns all errors found (does not stop at first error).
pub fn validate_registry(registry: &Registry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for model in registry.models() {
        errors.extend(validate_field_names(model));
        errors.extend(validate_relation_targets(model, registry));
        errors.extend(validate_selections(model));
        errors.extend(validate_related_paths(model, registry));
        errors.extend(validate_inverses(model, registry));
        errors.extend(validate_delegation(model, registry));
    }

    for edge in registry.edges() {
        if registry.model(&edge.target_model).is_none() {
            errors.push(ValidationError::new(
                "edge",
                &edge.source_model,
                format!(
                    "edge {}.{} targets unknown model '{}'",
                    edge.source_model, edge.field, edge.target_model
                ),
            ));
        }
    }

    errors
}

/// Check that `order` is a topological order of the listed modules:
/// every dependency present in the order appears before its dependant,
/// and no module appears twice.
pub fn validate_load_order(
    order: &[String],
    depends: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let position: BTreeMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, m)| (m.as_str(), i))
        .collect();

    if position.len() != order.len() {
        errors.push(ValidationError::new(
            "load_order",
            "*",
            "a module appears more than once in the load order".into(),
        ));
    }

    for (i, module) in order.iter().enumerate() {
        let Some(deps) = depends.get(module) else {
            continue;
        };
        for dep in deps {
            match position.get(dep.as_str()) {
                Some(&j) if j < i => {}
                Some(_) => errors.push(ValidationError::new(
                    "load_order",
                    module,
                    format!("loaded before its dependency '{}'", dep),
                )),
                None => errors.push(ValidationError::new(
                    "load_order",
                    module,
                    format!("dependency '{}' is not in the load order", dep),
                )),
            }
        }
    }

    errors
}

/// Map keys and field names must agree, so names stay unique.
fn validate_field_names(model: &CompositeModel) -> Vec<ValidationError> {
    model
        .fields
        .iter()
        .filter(|(key, spec)| *key != &spec.name)
        .map(|(key, spec)| {
            ValidationError::new(
                "fields",
                &model.name,
                format!("field stored as '{}' is named '{}'", key, spec.name),
            )
        })
        .collect()
}

fn validate_relation_targets(model: &CompositeModel, registry: &Registry) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for field in model.fields.values() {
        for target in field.kind.relation_targets() {
            if registry.model(target).is_none() {
                errors.push(ValidationError::new(
                    "relation",
                    &model.name,
                    format!("field '{}' targets unknown model '{}'", field.name, target),
                ));
            }
        }
    }
    errors
}

fn validate_selections(model: &CompositeModel) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for field in model.fields.values() {
        if let FieldKind::Selection { options, .. } = field.kind.value_kind() {
            let mut seen = BTreeSet::new();
            for option in options {
                if !seen.insert(option.key.as_str()) {
                    errors.push(ValidationError::new(
                        "selection",
                        &model.name,
                        format!("field '{}' repeats option key '{}'", field.name, option.key),
                    ));
                }
            }
        }
    }
    errors
}

fn validate_related_paths(model: &CompositeModel, registry: &Registry) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for field in model.fields.values() {
        let Some(related) = &field.related else {
            continue;
        };
        let terminal = walk_path(registry.model_map(), &model.name, &related.path)
            .map(|steps| steps.last().map(|step| step.field));
        match terminal {
            Ok(Some(terminal)) if terminal.kind.same_kind(&field.kind) => {}
            Ok(Some(terminal)) => errors.push(ValidationError::new(
                "related",
                &model.name,
                format!(
                    "field '{}' is {} but '{}' ends on {}",
                    field.name,
                    field.kind,
                    related.path.join("."),
                    terminal.kind
                ),
            )),
            Ok(None) => {}
            Err(message) => errors.push(ValidationError::new(
                "related",
                &model.name,
                format!("field '{}': {}", field.name, message),
            )),
        }
    }
    errors
}

/// Follow `path` from `start` through `models`; every step but the last
/// must be relational. Returns the field reached at each step, the
/// terminal one last.
pub fn walk_path<'a>(
    models: &'a IndexMap<String, CompositeModel>,
    start: &str,
    path: &[String],
) -> Result<Vec<FieldAccess<'a>>, String> {
    if path.is_empty() {
        return Err("empty related path".into());
    }
    let mut steps = Vec::with_capacity(path.len());
    let mut current = start.to_string();
    for (i, step) in path.iter().enumerate() {
        let access = resolve_field_in(models, &current, step)
            .ok_or_else(|| format!("'{}' has no field '{}'", current, step))?;
        if i + 1 < path.len() {
            let target = access.field.kind.traversable_target().ok_or_else(|| {
                format!(
                    "'{}.{}' is {}, not a relational field",
                    current, step, access.field.kind
                )
            })?;
            current = target.to_string();
        }
        steps.push(access);
    }
    Ok(steps)
}

fn validate_inverses(model: &CompositeModel, registry: &Registry) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for field in model.fields.values() {
        let FieldKind::One2many { target, inverse } = field.kind.value_kind() else {
            continue;
        };
        if registry.model(target).is_none() {
            // reported by the relation check
            continue;
        }
        let paired = registry
            .resolve_field(target, inverse)
            .is_some_and(|access| points_back(access.field, &model.name));
        if !paired {
            errors.push(ValidationError::new(
                "inverse",
                &model.name,
                format!(
                    "one2many '{}' has no many2one '{}.{}' pointing back",
                    field.name, target, inverse
                ),
            ));
        }
    }
    errors
}

/// `field` is a many2one to exactly `model`.
pub fn points_back(field: &FieldSpec, model: &str) -> bool {
    matches!(field.kind.value_kind(), FieldKind::Many2one { target } if target == model)
}

fn validate_delegation(model: &CompositeModel, registry: &Registry) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (target, fk) in &model.delegates {
        let ok = matches!(
            model.field(fk).map(|f| &f.kind),
            Some(FieldKind::Many2one { target: t }) if t == target
        );
        if !ok {
            errors.push(ValidationError::new(
                "delegate",
                &model.name,
                format!("delegation to '{}' needs many2one field '{}'", target, fk),
            ));
        }
        if registry.model(target).is_none() {
            errors.push(ValidationError::new(
                "delegate",
                &model.name,
                format!("delegates to unknown model '{}'", target),
            ));
        }
    }
    errors
}
