//! Model composer: folds every module's fragments, in load order, into one
//! composite model per model name.
//!
//! Modules are composed one at a time; each module is its own error phase.
//! [`Composer::finish`] runs the final passes once every module is in:
//! relation targets, related paths, computed sources and delegation views.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use openerp_core::{Abort, DiagnosticSink};
use openerp_ir::{
    default_table, CompositeModel, Constraint, Diagnostic, DiagnosticKind, FieldKind, FieldOrigin,
    FieldSpec, Fragment, FragmentKind, FragmentRef, Manifest, ModelDelegate, ModelExtend,
    ModelNew, ModelPrototype, OnDeletePolicy, RelatedOverride, RelatedSpec, SelectionExtend,
    SelectionOption, Severity,
};
use openerp_validate::walk_path;
use tracing::debug;

/// A related field waiting for the final pass.
#[derive(Debug, Clone)]
struct PendingRelated {
    module: String,
    source: FragmentRef,
    spec: RelatedOverride,
}

pub struct Composer<'m> {
    manifests: &'m IndexMap<String, Manifest>,
    models: IndexMap<String, CompositeModel>,
    /// Module → itself plus everything it transitively loads after.
    visible: BTreeMap<String, BTreeSet<String>>,
    pending_related: Vec<PendingRelated>,
}

impl<'m> Composer<'m> {
    pub fn new(manifests: &'m IndexMap<String, Manifest>) -> Self {
        Self {
            manifests,
            models: IndexMap::new(),
            visible: BTreeMap::new(),
            pending_related: Vec::new(),
        }
    }

    /// Composite models so far.
    pub fn models(&self) -> &IndexMap<String, CompositeModel> {
        &self.models
    }

    /// Fold one module's fragments, in scan order.
    ///
    /// Every dependency of `module` must already be composed; anything else
    /// is a fatal `LoadOrderViolation`. Errors accumulate and abort at the
    /// end of the module.
    pub fn compose_module(
        &mut self,
        module: &str,
        fragments: &[Fragment],
        sink: &mut DiagnosticSink,
    ) -> Result<(), Abort> {
        self.enter(module, sink)?;

        let mut prototyped: BTreeSet<&str> = BTreeSet::new();
        for frag in fragments {
            if frag.module != module {
                emit(
                    sink,
                    frag,
                    Diagnostic::new(
                        DiagnosticKind::BadFragment,
                        format!(
                            "fragment of module '{}' fed while composing '{}'",
                            frag.module, module
                        ),
                    ),
                )?;
                continue;
            }
            debug!("compose: {} {} {}", module, frag.variant(), frag.model());
            let outcome = match &frag.kind {
                FragmentKind::New(f) => self.apply_new(module, f),
                FragmentKind::Extend(f) => {
                    if prototyped.contains(f.model.as_str()) {
                        Err(Diagnostic::new(
                            DiagnosticKind::BadFragment,
                            format!(
                                "module both prototypes and extends '{}'; declare the fields on the prototype",
                                f.model
                            ),
                        ))
                    } else {
                        self.apply_extend(module, f)
                    }
                }
                FragmentKind::Prototype(f) => {
                    prototyped.insert(f.model.as_str());
                    self.apply_prototype(module, f)
                }
                FragmentKind::Delegate(f) => self.apply_delegate(module, f),
                FragmentKind::SelectionExtend(f) => self.apply_selection(module, f),
                FragmentKind::RelatedOverride(f) => self.defer_related(module, &frag.source, f),
            };
            match outcome {
                Ok(notes) => {
                    for note in notes {
                        emit(sink, frag, note)?;
                    }
                }
                Err(diag) => emit(sink, frag, diag)?,
            }
        }

        sink.end_phase(module)
    }

    /// Record `module` as composed, after checking its dependencies were.
    fn enter(&mut self, module: &str, sink: &mut DiagnosticSink) -> Result<(), Abort> {
        let violation = |message: String| {
            Diagnostic::new(DiagnosticKind::LoadOrderViolation, message).in_module(module)
        };
        if self.visible.contains_key(module) {
            return sink.push(violation(format!("module '{}' composed twice", module)));
        }
        let Some(manifest) = self.manifests.get(module) else {
            return sink.push(violation(format!("module '{}' has no manifest", module)));
        };

        let mut closure = BTreeSet::from([module.to_string()]);
        for dep in manifest.load_after() {
            match self.visible.get(dep) {
                Some(seen) => closure.extend(seen.iter().cloned()),
                None => {
                    return sink.push(violation(format!(
                        "module '{}' composed before its dependency '{}'",
                        module, dep
                    )))
                }
            }
        }
        self.visible.insert(module.to_string(), closure);
        Ok(())
    }

    /// `model` must exist and be declared by `module` or one of its dependencies.
    fn check_visible(&self, module: &str, model: &str) -> Result<(), Diagnostic> {
        let Some(composite) = self.models.get(model) else {
            return Err(Diagnostic::new(
                DiagnosticKind::UnknownModel,
                format!("model '{}' is not declared", model),
            ));
        };
        if self.is_visible(module, &composite.declared_in) {
            Ok(())
        } else {
            Err(Diagnostic::new(
                DiagnosticKind::ModelNotVisible,
                format!(
                    "model '{}' is declared by '{}', which '{}' does not depend on",
                    model, composite.declared_in, module
                ),
            ))
        }
    }

    fn is_visible(&self, module: &str, declaring: &str) -> bool {
        self.visible
            .get(module)
            .is_some_and(|seen| seen.contains(declaring))
    }

    /// Modules whose models and fields `module` may touch.
    fn seen(&self, module: &str) -> BTreeSet<String> {
        self.visible.get(module).cloned().unwrap_or_default()
    }

    fn apply_new(&mut self, module: &str, f: &ModelNew) -> Result<Vec<Diagnostic>, Diagnostic> {
        if let Some(existing) = self.models.get(&f.model) {
            return Err(Diagnostic::new(
                DiagnosticKind::ModelAlreadyDeclared,
                format!("model '{}' is already declared by '{}'", f.model, existing.declared_in),
            ));
        }
        let mut model = CompositeModel::new(&f.model, module);
        if let Some(table) = &f.table {
            model.table = table.clone();
        }
        model.description = f.description.clone();
        model.order = f.order.clone();
        model.is_abstract = f.is_abstract;

        let notes = add_fields(&mut model, &f.fields, module, &self.seen(module))?;
        merge_constraints(&mut model, &f.constraints);
        self.models.insert(f.model.clone(), model);
        Ok(notes)
    }

    fn apply_extend(&mut self, module: &str, f: &ModelExtend) -> Result<Vec<Diagnostic>, Diagnostic> {
        self.check_visible(module, &f.model)?;
        let seen = self.seen(module);
        let Some(model) = self.models.get_mut(&f.model) else {
            return Ok(Vec::new());
        };
        model.touch(module);
        if f.description.is_some() {
            model.description = f.description.clone();
        }
        if f.order.is_some() {
            model.order = f.order.clone();
        }
        let notes = add_fields(model, &f.fields, module, &seen)?;
        merge_constraints(model, &f.constraints);
        Ok(notes)
    }

    fn apply_prototype(
        &mut self,
        module: &str,
        f: &ModelPrototype,
    ) -> Result<Vec<Diagnostic>, Diagnostic> {
        self.check_visible(module, &f.base)?;
        if let Some(existing) = self.models.get(&f.model) {
            return Err(Diagnostic::new(
                DiagnosticKind::ModelAlreadyDeclared,
                format!(
                    "prototype '{}' collides with the model declared by '{}'",
                    f.model, existing.declared_in
                ),
            ));
        }
        let Some(base) = self.models.get(&f.base) else {
            return Ok(Vec::new());
        };

        let seen = self.seen(module);
        let mut model = base.clone();
        let hidden: Vec<String> = model
            .fields
            .keys()
            .filter(|name| !seen.contains(introduced_by(base, name)))
            .cloned()
            .collect();
        for name in &hidden {
            model.fields.shift_remove(name);
            model.field_origins.shift_remove(name);
        }
        model.name = f.model.clone();
        model.declared_in = module.to_string();
        model.table = f.table.clone().unwrap_or_else(|| default_table(&f.model));
        if f.description.is_some() {
            model.description = f.description.clone();
        }
        model.is_abstract = false;
        model.prototype_of = Some(f.base.clone());
        model.delegated_fields.clear();
        model.touch(module);

        let notes = add_fields(&mut model, &f.fields, module, &seen)?;
        merge_constraints(&mut model, &f.constraints);
        self.models.insert(f.model.clone(), model);
        Ok(notes)
    }

    fn apply_delegate(
        &mut self,
        module: &str,
        f: &ModelDelegate,
    ) -> Result<Vec<Diagnostic>, Diagnostic> {
        if let Some(existing) = self.models.get(&f.model) {
            return Err(Diagnostic::new(
                DiagnosticKind::ModelAlreadyDeclared,
                format!("model '{}' is already declared by '{}'", f.model, existing.declared_in),
            ));
        }
        for target in f.delegated_to.keys() {
            if let Err(diag) = self.check_visible(module, target) {
                return Err(match diag.kind {
                    DiagnosticKind::UnknownModel => Diagnostic::new(
                        DiagnosticKind::UnknownRelationTarget,
                        format!("'{}' delegates to unknown model '{}'", f.model, target),
                    ),
                    _ => diag,
                });
            }
        }

        let mut model = CompositeModel::new(&f.model, module);
        if let Some(table) = &f.table {
            model.table = table.clone();
        }
        model.description = f.description.clone();

        let mut fields = Vec::with_capacity(f.delegated_to.len() + f.fields.len());
        for (target, fk) in &f.delegated_to {
            let declared = f.fields.iter().find(|s| &s.name == fk);
            let mut spec = match declared {
                Some(spec) => match &spec.kind {
                    FieldKind::Many2one { target: t } if t == target => spec.clone(),
                    other => {
                        return Err(Diagnostic::new(
                            DiagnosticKind::IncompatibleFieldOverride,
                            format!(
                                "delegation key '{}' must be many2one({}), declared as {}",
                                fk, target, other
                            ),
                        )
                        .with_severity(Severity::Fatal))
                    }
                },
                None => FieldSpec::new(
                    fk.clone(),
                    FieldKind::Many2one {
                        target: target.clone(),
                    },
                ),
            };
            spec.required = true;
            spec.index = true;
            fields.push(spec);
            model.delegates.insert(target.clone(), fk.clone());
        }
        fields.extend(
            f.fields
                .iter()
                .filter(|s| !f.delegated_to.values().any(|fk| fk == &s.name))
                .cloned(),
        );

        let notes = add_fields(&mut model, &fields, module, &self.seen(module))?;
        merge_constraints(&mut model, &f.constraints);
        self.models.insert(f.model.clone(), model);
        Ok(notes)
    }

    fn apply_selection(
        &mut self,
        module: &str,
        f: &SelectionExtend,
    ) -> Result<Vec<Diagnostic>, Diagnostic> {
        self.check_visible(module, &f.model)?;
        let seen = self.seen(module);
        let Some(model) = self.models.get_mut(&f.model) else {
            return Ok(Vec::new());
        };
        if model.fields.contains_key(&f.field) {
            if let Some(diag) = hidden_field(&seen, model, &f.field, module) {
                return Err(diag);
            }
        }
        let Some(field) = model.fields.get_mut(&f.field) else {
            return Err(Diagnostic::new(
                DiagnosticKind::UnknownField,
                format!("'{}' has no field '{}' to extend", f.model, f.field),
            ));
        };
        if !field.kind.is_selection() {
            return Err(Diagnostic::new(
                DiagnosticKind::IncompatibleFieldOverride,
                format!("'{}.{}' is {}, not a selection", f.model, f.field, field.kind),
            ));
        }
        let Some((options, on_delete)) = selection_parts(&mut field.kind) else {
            return Ok(Vec::new());
        };

        let mut notes = Vec::new();
        let mut added: BTreeSet<&str> = BTreeSet::new();
        for option in &f.added_options {
            if options.iter().any(|o| o.key == option.key) {
                notes.push(Diagnostic::new(
                    DiagnosticKind::DuplicateSelectionOption,
                    format!(
                        "option '{}' already exists on '{}.{}'",
                        option.key, f.model, f.field
                    ),
                ));
                continue;
            }
            options.push(option.clone());
            added.insert(option.key.as_str());
        }
        for (key, policy) in &f.on_delete {
            if added.contains(key.as_str()) {
                on_delete.insert(key.clone(), policy.clone());
            } else {
                notes.push(
                    Diagnostic::new(
                        DiagnosticKind::UnknownField,
                        format!("on_delete for option '{}' not added here; ignored", key),
                    )
                    .with_severity(Severity::Warning),
                );
            }
        }

        model
            .field_origins
            .entry(f.field.clone())
            .or_default()
            .push(FieldOrigin {
                module: module.to_string(),
                default: None,
            });
        model.touch(module);
        Ok(notes)
    }

    fn defer_related(
        &mut self,
        module: &str,
        source: &FragmentRef,
        f: &RelatedOverride,
    ) -> Result<Vec<Diagnostic>, Diagnostic> {
        self.check_visible(module, &f.model)?;
        if let Some(model) = self.models.get_mut(&f.model) {
            model.touch(module);
        }
        self.pending_related.push(PendingRelated {
            module: module.to_string(),
            source: source.clone(),
            spec: f.clone(),
        });
        Ok(Vec::new())
    }

    /// Final passes. Returns the composites ready to be frozen.
    pub fn finish(
        mut self,
        sink: &mut DiagnosticSink,
    ) -> Result<IndexMap<String, CompositeModel>, Abort> {
        self.check_relation_targets(sink)?;
        sink.end_phase("relations")?;

        self.resolve_related(sink)?;
        sink.end_phase("related")?;

        self.check_computed_sources(sink)?;

        let views = match self.delegation_views() {
            Ok(views) => views,
            Err(diag) => {
                sink.push(diag.with_severity(Severity::Fatal))?;
                return Err(Abort);
            }
        };
        for (name, view) in views {
            if let Some(model) = self.models.get_mut(&name) {
                model.delegated_fields = view;
            }
        }
        sink.end_phase("compose")?;

        Ok(self.models)
    }

    fn check_relation_targets(&self, sink: &mut DiagnosticSink) -> Result<(), Abort> {
        for model in self.models.values() {
            for field in model.fields.values() {
                let origin = introduced_by(model, &field.name);
                for target in field.kind.relation_targets() {
                    let diag = match self.models.get(target) {
                        None => Diagnostic::new(
                            DiagnosticKind::UnknownRelationTarget,
                            format!("{}.{} → {}", model.name, field.name, target),
                        ),
                        Some(t) if !self.is_visible(origin, &t.declared_in) => {
                            Diagnostic::new(
                                DiagnosticKind::ModelNotVisible,
                                format!(
                                    "{}.{} → {}: declared by '{}', which '{}' does not depend on",
                                    model.name, field.name, target, t.declared_in, origin
                                ),
                            )
                        }
                        Some(_) => continue,
                    };
                    sink.push(diag.in_module(origin))?;
                }
            }
        }
        Ok(())
    }

    /// Resolve pending related fields to fixpoint, so a path may run
    /// through another related field.
    fn resolve_related(&mut self, sink: &mut DiagnosticSink) -> Result<(), Abort> {
        let mut pending = std::mem::take(&mut self.pending_related);
        loop {
            let mut failed = Vec::new();
            let mut reasons = Vec::new();
            let before = pending.len();
            for item in pending {
                let (hidden, terminal) =
                    match walk_path(&self.models, &item.spec.model, &item.spec.path) {
                        Ok(steps) => {
                            let seen = self.seen(&item.module);
                            let hidden = steps.iter().find_map(|step| {
                                hidden_field(&seen, step.model, &step.field.name, &item.module)
                            });
                            (hidden, steps.last().map(|step| step.field.clone()))
                        }
                        Err(reason) => {
                            failed.push(item);
                            reasons.push(reason);
                            continue;
                        }
                    };
                let outcome = match (hidden, terminal) {
                    (Some(diag), _) => Err(diag),
                    (None, Some(terminal)) => self.install_related(&item, terminal),
                    (None, None) => Ok(()),
                };
                if let Err(diag) = outcome {
                    sink.push(diag.in_module(&item.module).at(item.source.clone()))?;
                }
            }
            if failed.is_empty() {
                return Ok(());
            }
            if failed.len() == before {
                for (item, reason) in failed.into_iter().zip(reasons) {
                    sink.push(
                        Diagnostic::new(
                            DiagnosticKind::InvalidRelatedPath,
                            format!(
                                "{}.{} = {}: {}",
                                item.spec.model,
                                item.spec.field,
                                item.spec.path.join("."),
                                reason
                            ),
                        )
                        .in_module(&item.module)
                        .at(item.source),
                    )?;
                }
                return Ok(());
            }
            pending = failed;
        }
    }

    fn install_related(&mut self, item: &PendingRelated, terminal: FieldSpec) -> Result<(), Diagnostic> {
        let spec = &item.spec;
        let seen = self.seen(&item.module);
        let Some(model) = self.models.get_mut(&spec.model) else {
            return Ok(());
        };
        if model.fields.contains_key(&spec.field) {
            if let Some(diag) = hidden_field(&seen, model, &spec.field, &item.module) {
                return Err(diag);
            }
        }
        let related = RelatedSpec {
            path: spec.path.clone(),
            writable: spec.writable,
        };
        match model.fields.get_mut(&spec.field) {
            Some(existing) => {
                if !existing.kind.same_kind(&terminal.kind) {
                    return Err(Diagnostic::new(
                        DiagnosticKind::InvalidRelatedPath,
                        format!(
                            "{}.{} is {} but {} ends on {}",
                            spec.model,
                            spec.field,
                            existing.kind,
                            spec.path.join("."),
                            terminal.kind
                        ),
                    ));
                }
                existing.related = Some(related);
                existing.readonly = !spec.writable;
                if spec.string.is_some() {
                    existing.string = spec.string.clone();
                }
                if spec.help.is_some() {
                    existing.help = spec.help.clone();
                }
            }
            None => {
                let mut field = FieldSpec::new(spec.field.clone(), terminal.kind);
                field.string = spec.string.clone().or(terminal.string);
                field.help = spec.help.clone().or(terminal.help);
                field.groups = terminal.groups;
                field.readonly = !spec.writable;
                field.related = Some(related);
                model.fields.insert(spec.field.clone(), field);
            }
        }
        model
            .field_origins
            .entry(spec.field.clone())
            .or_default()
            .push(FieldOrigin {
                module: item.module.clone(),
                default: None,
            });
        Ok(())
    }

    /// Computed sources that do not resolve are reported, never fatal.
    fn check_computed_sources(&self, sink: &mut DiagnosticSink) -> Result<(), Abort> {
        for model in self.models.values() {
            for field in model.fields.values() {
                let FieldKind::Computed { sources, .. } = &field.kind else {
                    continue;
                };
                for source in sources {
                    let path: Vec<String> = source.split('.').map(str::to_string).collect();
                    if let Err(reason) = walk_path(&self.models, &model.name, &path) {
                        sink.push(
                            Diagnostic::new(
                                DiagnosticKind::UnknownField,
                                format!(
                                    "{}.{} computes from '{}': {}",
                                    model.name, field.name, source, reason
                                ),
                            )
                            .with_severity(Severity::Warning)
                            .in_module(model.declared_in.as_str()),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// For every model, which field names it exposes through which
    /// delegation key, nested delegation included.
    fn delegation_views(&self) -> Result<BTreeMap<String, IndexMap<String, String>>, Diagnostic> {
        let mut views = BTreeMap::new();
        for name in self.models.keys() {
            let mut visiting = Vec::new();
            self.view_of(name, &mut views, &mut visiting)?;
        }
        Ok(views)
    }

    fn view_of(
        &self,
        name: &str,
        views: &mut BTreeMap<String, IndexMap<String, String>>,
        visiting: &mut Vec<String>,
    ) -> Result<(), Diagnostic> {
        if views.contains_key(name) {
            return Ok(());
        }
        if visiting.iter().any(|v| v == name) {
            visiting.push(name.to_string());
            return Err(Diagnostic::new(
                DiagnosticKind::RegistryInvariantViolation,
                format!("delegation loop: {}", visiting.join(" → ")),
            ));
        }
        let Some(model) = self.models.get(name) else {
            return Ok(());
        };
        visiting.push(name.to_string());

        let mut view: IndexMap<String, String> = IndexMap::new();
        let mut exposed_by: BTreeMap<String, &str> = BTreeMap::new();
        for (target, fk) in &model.delegates {
            let Some(target_model) = self.models.get(target) else {
                continue;
            };
            self.view_of(target, views, visiting)?;
            let nested = views.get(target).map(|v| v.keys().cloned().collect::<Vec<_>>());
            let names = target_model
                .fields
                .keys()
                .cloned()
                .chain(nested.unwrap_or_default());
            for field in names {
                if model.fields.contains_key(&field) {
                    continue;
                }
                if let Some(previous) = exposed_by.get(&field) {
                    return Err(Diagnostic::new(
                        DiagnosticKind::DelegateAmbiguous,
                        format!(
                            "'{}' exposes field '{}' through both '{}' and '{}'",
                            name, field, previous, target
                        ),
                    )
                    .with_severity(Severity::Fatal)
                    .in_module(model.declared_in.as_str()));
                }
                exposed_by.insert(field.clone(), target.as_str());
                view.insert(field, fk.clone());
            }
        }

        visiting.pop();
        views.insert(name.to_string(), view);
        Ok(())
    }
}

fn emit(sink: &mut DiagnosticSink, frag: &Fragment, diag: Diagnostic) -> Result<(), Abort> {
    sink.push(diag.in_module(frag.module.as_str()).at(frag.source.clone()))
}

/// Add or override fields on `model`. Returns non-blocking notes; the
/// first blocking problem is returned as the error.
fn add_fields(
    model: &mut CompositeModel,
    fields: &[FieldSpec],
    module: &str,
    seen: &BTreeSet<String>,
) -> Result<Vec<Diagnostic>, Diagnostic> {
    for spec in fields {
        if model.fields.contains_key(&spec.name) {
            if let Some(diag) = hidden_field(seen, model, &spec.name, module) {
                return Err(diag);
            }
        }
        match model.fields.get_mut(&spec.name) {
            None => {
                let mut spec = spec.clone();
                spec.is_override = false;
                model.fields.insert(spec.name.clone(), spec);
            }
            Some(_) if !spec.is_override => {
                return Err(Diagnostic::new(
                    DiagnosticKind::FieldRedefinedWithoutOverride,
                    format!(
                        "field '{}.{}' already exists; mark it #[field(override)]",
                        model.name, spec.name
                    ),
                ));
            }
            Some(existing) => {
                merge_override(existing, spec).map_err(|reason| {
                    Diagnostic::new(
                        DiagnosticKind::IncompatibleFieldOverride,
                        format!("override of '{}.{}': {}", model.name, spec.name, reason),
                    )
                    .with_severity(Severity::Fatal)
                })?;
            }
        }
        model
            .field_origins
            .entry(spec.name.clone())
            .or_default()
            .push(FieldOrigin {
                module: module.to_string(),
                default: spec.default.clone(),
            });
    }
    Ok(Vec::new())
}

/// Merge an override into an existing field.
///
/// The kind never changes. Char size may only grow. `translate` and the
/// other flags only switch on. The last default wins. Computed sources
/// and selection options accumulate.
fn merge_override(existing: &mut FieldSpec, new: &FieldSpec) -> Result<(), String> {
    if !existing.kind.same_kind(&new.kind) {
        return Err(format!("kind {} cannot become {}", existing.kind, new.kind));
    }
    merge_kind(&mut existing.kind, &new.kind)?;

    existing.translate |= new.translate;
    existing.required |= new.required;
    existing.readonly |= new.readonly;
    existing.index |= new.index;
    if new.default.is_some() {
        existing.default = new.default.clone();
    }
    if new.string.is_some() {
        existing.string = new.string.clone();
    }
    if new.help.is_some() {
        existing.help = new.help.clone();
    }
    if !new.groups.is_empty() {
        existing.groups = new.groups.clone();
    }
    Ok(())
}

fn merge_kind(existing: &mut FieldKind, new: &FieldKind) -> Result<(), String> {
    match (existing, new) {
        (FieldKind::Char { size }, FieldKind::Char { size: Some(wider) }) => match size {
            None => Err(format!("char size cannot shrink from unlimited to {}", wider)),
            Some(current) if *wider < *current => {
                Err(format!("char size cannot shrink from {} to {}", current, wider))
            }
            Some(current) => {
                *current = *wider;
                Ok(())
            }
        },
        (FieldKind::Many2many { relation, .. }, FieldKind::Many2many { relation: Some(r), .. }) => {
            *relation = Some(r.clone());
            Ok(())
        }
        (
            FieldKind::Selection { options, on_delete },
            FieldKind::Selection {
                options: added,
                on_delete: policies,
            },
        ) => {
            merge_options(options, on_delete, added, policies);
            Ok(())
        }
        (
            FieldKind::Computed { value, sources },
            FieldKind::Computed {
                value: new_value,
                sources: new_sources,
            },
        ) => {
            sources.extend(new_sources.iter().cloned());
            merge_kind(value, new_value)
        }
        _ => Ok(()),
    }
}

fn merge_options(
    options: &mut Vec<SelectionOption>,
    on_delete: &mut BTreeMap<String, OnDeletePolicy>,
    added: &[SelectionOption],
    policies: &BTreeMap<String, OnDeletePolicy>,
) {
    for option in added {
        match options.iter_mut().find(|o| o.key == option.key) {
            Some(existing) => existing.label = option.label.clone(),
            None => options.push(option.clone()),
        }
    }
    for (key, policy) in policies {
        on_delete.insert(key.clone(), policy.clone());
    }
}

/// Constraints replace same-named ones, otherwise append.
fn merge_constraints(model: &mut CompositeModel, constraints: &[Constraint]) {
    for constraint in constraints {
        match model.constraints.iter_mut().find(|c| c.name == constraint.name) {
            Some(existing) => *existing = constraint.clone(),
            None => model.constraints.push(constraint.clone()),
        }
    }
}

fn selection_parts(
    kind: &mut FieldKind,
) -> Option<(&mut Vec<SelectionOption>, &mut BTreeMap<String, OnDeletePolicy>)> {
    match kind {
        FieldKind::Selection { options, on_delete } => Some((options, on_delete)),
        FieldKind::Computed { value, .. } => selection_parts(value),
        _ => None,
    }
}

/// Module that first contributed `field` to `model`.
fn introduced_by<'a>(model: &'a CompositeModel, field: &str) -> &'a str {
    model
        .field_origins
        .get(field)
        .and_then(|o| o.first())
        .map(|o| o.module.as_str())
        .unwrap_or(model.declared_in.as_str())
}

/// `ModelNotVisible` when `field` was contributed by a module outside `seen`.
fn hidden_field(
    seen: &BTreeSet<String>,
    model: &CompositeModel,
    field: &str,
    module: &str,
) -> Option<Diagnostic> {
    let origin = introduced_by(model, field);
    if seen.contains(origin) {
        return None;
    }
    Some(Diagnostic::new(
        DiagnosticKind::ModelNotVisible,
        format!(
            "field '{}.{}' is added by '{}', which '{}' does not depend on",
            model.name, field, origin, module
        ),
    ))
}
