//! Parser for fields of a `#[model]` struct.
//!
//! The field type names the kind (`Char`, `Many2one`, ...); `#[field(...)]`
//! carries attributes and relation targets; `#[option(...)]` lists
//! selection options in declaration order.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use openerp_ir::{FieldKind, FieldSpec, OnDeletePolicy, SelectionOption};
use syn::ext::IdentExt;
use syn::{Attribute, Field};

use crate::util;

/// A parsed struct field: either a regular field spec or one of the two
/// fragment markers.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedField {
    Spec(FieldSpec),
    /// `SelectionAdd`: options appended to an existing selection.
    SelectionAdd {
        name: String,
        options: Vec<SelectionOption>,
        on_delete: IndexMap<String, OnDeletePolicy>,
        line: usize,
    },
    /// `Related`: value read along a relation path.
    Related {
        name: String,
        path: Vec<String>,
        writable: bool,
        string: Option<String>,
        help: Option<String>,
        line: usize,
    },
}

/// Everything `#[field(...)]` may say.
#[derive(Debug, Default)]
struct FieldAttrs {
    required: bool,
    readonly: bool,
    index: bool,
    translate: bool,
    is_override: bool,
    writable: bool,
    string: Option<String>,
    help: Option<String>,
    default: Option<String>,
    groups: Option<String>,
    comodel: Option<String>,
    inverse: Option<String>,
    relation: Option<String>,
    models: Option<String>,
    compute: Option<String>,
    related: Option<String>,
    size: Option<u32>,
}

/// Parse one named struct field.
pub fn parse_field(field: &Field) -> syn::Result<ParsedField> {
    let name = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "field must have a name"))?
        .unraw()
        .to_string();
    let line = util::line_of(&field.ty);

    let type_name = type_ident(&field.ty)
        .ok_or_else(|| syn::Error::new_spanned(&field.ty, "field type must be a plain kind name"))?;
    let attrs = parse_field_attrs(&field.attrs)?;
    let (options, on_delete) = parse_options(&field.attrs)?;
    let doc = util::extract_doc_comment(&field.attrs);

    let reject = |key: &str, present: bool| -> syn::Result<()> {
        if present {
            Err(syn::Error::new_spanned(
                &field.ty,
                format!("`{}` is not valid on a {} field", key, type_name),
            ))
        } else {
            Ok(())
        }
    };

    if type_name != "Selection" && type_name != "SelectionAdd" {
        reject("#[option]", !options.is_empty())?;
    }
    if type_name != "Related" {
        reject("related", attrs.related.is_some())?;
        reject("writable", attrs.writable)?;
    }
    if !matches!(type_name.as_str(), "Many2one" | "One2many" | "Many2many") {
        reject("comodel", attrs.comodel.is_some())?;
    }
    if type_name != "One2many" {
        reject("inverse", attrs.inverse.is_some())?;
    }
    if type_name != "Many2many" {
        reject("relation", attrs.relation.is_some())?;
    }
    if type_name != "Reference" {
        reject("models", attrs.models.is_some())?;
    }
    if type_name != "Char" {
        reject("size", attrs.size.is_some())?;
    }

    match type_name.as_str() {
        "SelectionAdd" => {
            if options.is_empty() {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "SelectionAdd requires at least one #[option(key = \"Label\")]",
                ));
            }
            let has_other = attrs.required
                || attrs.readonly
                || attrs.index
                || attrs.translate
                || attrs.is_override
                || attrs.string.is_some()
                || attrs.default.is_some()
                || attrs.compute.is_some()
                || attrs.groups.is_some();
            reject("#[field]", has_other)?;
            return Ok(ParsedField::SelectionAdd {
                name,
                options,
                on_delete,
                line,
            });
        }
        "Related" => {
            let related = attrs.related.as_deref().ok_or_else(|| {
                syn::Error::new_spanned(&field.ty, "Related requires #[field(related = \"a.b\")]")
            })?;
            let path = util::split_path(related).ok_or_else(|| {
                syn::Error::new_spanned(&field.ty, format!("malformed related path '{}'", related))
            })?;
            reject("compute", attrs.compute.is_some())?;
            return Ok(ParsedField::Related {
                name,
                path,
                writable: attrs.writable,
                string: attrs.string,
                help: attrs.help.or(doc),
                line,
            });
        }
        _ => {}
    }

    let relation_target = |kind: &str| -> syn::Result<String> {
        attrs.comodel.clone().ok_or_else(|| {
            syn::Error::new_spanned(
                &field.ty,
                format!("{} requires #[field(comodel = \"...\")]", kind),
            )
        })
    };

    let kind = match type_name.as_str() {
        "Char" => FieldKind::Char { size: attrs.size },
        "Text" => FieldKind::Text,
        "Integer" => FieldKind::Integer,
        "Float" => FieldKind::Float,
        "Boolean" => FieldKind::Boolean,
        "Date" => FieldKind::Date,
        "Datetime" => FieldKind::Datetime,
        "Binary" => FieldKind::Binary,
        "Many2one" => FieldKind::Many2one {
            target: relation_target("Many2one")?,
        },
        "One2many" => FieldKind::One2many {
            target: relation_target("One2many")?,
            inverse: attrs.inverse.clone().ok_or_else(|| {
                syn::Error::new_spanned(&field.ty, "One2many requires #[field(inverse = \"...\")]")
            })?,
        },
        "Many2many" => FieldKind::Many2many {
            target: relation_target("Many2many")?,
            relation: attrs.relation.clone(),
        },
        "Selection" => FieldKind::Selection {
            options,
            on_delete: on_delete.into_iter().collect::<BTreeMap<_, _>>(),
        },
        "Reference" => {
            let models = attrs.models.as_deref().map(util::split_list).unwrap_or_default();
            if models.is_empty() {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "Reference requires #[field(models = \"a.model, b.model\")]",
                ));
            }
            FieldKind::Reference { models }
        }
        other => {
            return Err(syn::Error::new_spanned(
                &field.ty,
                format!("unknown field kind '{}'", other),
            ))
        }
    };

    let kind = match attrs.compute.as_deref() {
        Some(sources) => FieldKind::Computed {
            value: Box::new(kind),
            sources: util::split_list(sources).into_iter().collect::<BTreeSet<_>>(),
        },
        None => kind,
    };

    Ok(ParsedField::Spec(FieldSpec {
        name,
        kind,
        string: attrs.string,
        required: attrs.required,
        readonly: attrs.readonly,
        index: attrs.index,
        translate: attrs.translate,
        default: attrs.default,
        groups: attrs.groups.as_deref().map(util::split_list).unwrap_or_default(),
        help: attrs.help.or(doc),
        is_override: attrs.is_override,
        related: None,
    }))
}

/// The last path segment of a field type (`Char`, `openerp::Many2one` → `Many2one`).
fn type_ident(ty: &syn::Type) -> Option<String> {
    match ty {
        syn::Type::Path(tp) if tp.qself.is_none() => {
            let seg = tp.path.segments.last()?;
            if seg.arguments.is_empty() {
                Some(seg.ident.to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Merge every `#[field(...)]` on the field.
fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| util::attr_is(a, "field")) {
        attr.parse_nested_meta(|meta| {
            let key = util::meta_key(&meta)?;
            match key.as_str() {
                "required" => out.required = util::flag_value(&meta)?,
                "readonly" => out.readonly = util::flag_value(&meta)?,
                "index" => out.index = util::flag_value(&meta)?,
                "translate" => out.translate = util::flag_value(&meta)?,
                "override" => out.is_override = util::flag_value(&meta)?,
                "writable" => out.writable = util::flag_value(&meta)?,
                "string" => out.string = Some(util::string_value(&meta)?),
                "help" => out.help = Some(util::string_value(&meta)?),
                "default" => out.default = Some(util::string_value(&meta)?),
                "groups" => out.groups = Some(util::string_value(&meta)?),
                "comodel" => out.comodel = Some(util::string_value(&meta)?),
                "inverse" => out.inverse = Some(util::string_value(&meta)?),
                "relation" => out.relation = Some(util::string_value(&meta)?),
                "models" => out.models = Some(util::string_value(&meta)?),
                "compute" => out.compute = Some(util::string_value(&meta)?),
                "related" => out.related = Some(util::string_value(&meta)?),
                "size" => out.size = Some(util::u32_value(&meta)?),
                other => return Err(meta.error(format!("unknown field key `{}`", other))),
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// Collect `#[option(key = "Label")]` / `#[option(key = "Label", on_delete = "...")]`
/// attributes in declaration order.
fn parse_options(
    attrs: &[Attribute],
) -> syn::Result<(Vec<SelectionOption>, IndexMap<String, OnDeletePolicy>)> {
    let mut options: Vec<SelectionOption> = Vec::new();
    let mut on_delete = IndexMap::new();

    for attr in attrs.iter().filter(|a| util::attr_is(a, "option")) {
        let mut option: Option<SelectionOption> = None;
        let mut policy: Option<String> = None;
        attr.parse_nested_meta(|meta| {
            let key = util::meta_key(&meta)?;
            let value = util::string_value(&meta)?;
            if key == "on_delete" {
                policy = Some(value);
            } else if option.is_some() {
                return Err(meta.error("one option per #[option(...)] attribute"));
            } else {
                option = Some(SelectionOption::new(key, value));
            }
            Ok(())
        })?;

        let option = option
            .ok_or_else(|| syn::Error::new_spanned(attr, "#[option] needs `key = \"Label\"`"))?;
        if options.iter().any(|o| o.key == option.key) {
            return Err(syn::Error::new_spanned(
                attr,
                format!("duplicate option key '{}'", option.key),
            ));
        }
        if let Some(policy) = policy {
            let parsed = OnDeletePolicy::parse(&policy).ok_or_else(|| {
                syn::Error::new_spanned(attr, format!("unknown on_delete policy '{}'", policy))
            })?;
            on_delete.insert(option.key.clone(), parsed);
        }
        options.push(option);
    }

    Ok((options, on_delete))
}
