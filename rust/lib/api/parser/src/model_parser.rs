//! Parser for `#[model(...)]` declarations.
//!
//! Reads a struct annotated with `#[model(name = "...")]` or
//! `#[model(inherit = "...")]` and produces the fragments it contributes.

use indexmap::IndexMap;
use openerp_ir::{
    Constraint, FieldSpec, Fragment, FragmentKind, FragmentRef, ModelDelegate, ModelExtend,
    ModelNew, ModelPrototype, RelatedOverride, SelectionExtend,
};
use syn::{Fields, ItemStruct};

use crate::field_parser::{parse_field, ParsedField};
use crate::util;

/// Struct-level attributes.
#[derive(Debug, Default)]
struct ModelAttrs {
    name: Option<String>,
    inherit: Option<String>,
    description: Option<String>,
    order: Option<String>,
    table: Option<String>,
    is_abstract: bool,
    delegates: IndexMap<String, String>,
    constraints: Vec<Constraint>,
}

/// Parse a `#[model(...)]` annotated struct into its fragments.
///
/// Returns an empty list for structs without `#[model]`. Fragment order:
/// the primary fragment, then one `SelectionExtend` per `SelectionAdd`
/// field, then one `RelatedOverride` per `Related` field.
///
/// Expected attributes on the struct:
///   `#[model(name = "sale.order", order = "...", table = "...", description = "...", abstract)]`
///   `#[model(inherit = "sale.order")]`: extension
///   `#[model(name = "new.model", inherit = "base.model")]`: prototype copy
///   `#[delegate(model = "res.partner", field = "partner_id")]`: delegation
///   `#[constraint(name = "...", check = "...", message = "...")]`
pub fn parse_model(item: &ItemStruct, module: &str, file: &str) -> syn::Result<Vec<Fragment>> {
    let model_attrs: Vec<_> = item.attrs.iter().filter(|a| util::attr_is(a, "model")).collect();
    match model_attrs.len() {
        0 => return Ok(Vec::new()),
        1 => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &item.ident,
                "a struct may carry only one #[model(...)] attribute",
            ))
        }
    }

    let attrs = parse_model_attrs(item)?;
    let source = FragmentRef {
        file: file.to_string(),
        line: util::line_of(&item.ident),
        item: item.ident.to_string(),
    };

    let named = match &item.fields {
        Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                &item.ident,
                "model struct must have named fields",
            ))
        }
    };

    let mut specs: Vec<FieldSpec> = Vec::new();
    let mut markers: Vec<ParsedField> = Vec::new();
    for field in named {
        match parse_field(field)? {
            ParsedField::Spec(spec) => {
                if specs.iter().any(|s| s.name == spec.name) {
                    return Err(syn::Error::new_spanned(
                        field,
                        format!("field '{}' declared twice", spec.name),
                    ));
                }
                specs.push(spec);
            }
            marker => markers.push(marker),
        }
    }

    let description = attrs
        .description
        .clone()
        .or_else(|| util::extract_doc_comment(&item.attrs));

    let (model, primary) = classify(item, attrs, description, specs, !markers.is_empty())?;

    let allows_selection_add = matches!(
        primary,
        Some(FragmentKind::Extend(_)) | Some(FragmentKind::Prototype(_)) | None
    );

    let mut fragments = Vec::new();
    if let Some(kind) = primary {
        fragments.push(Fragment {
            module: module.to_string(),
            source: source.clone(),
            kind,
        });
    }

    let mut related = Vec::new();
    for marker in markers {
        match marker {
            ParsedField::SelectionAdd {
                name,
                options,
                on_delete,
                line,
            } => {
                if !allows_selection_add {
                    return Err(syn::Error::new_spanned(
                        &item.ident,
                        format!(
                            "SelectionAdd '{}' only extends an inherited selection; declare a Selection instead",
                            name
                        ),
                    ));
                }
                fragments.push(Fragment {
                    module: module.to_string(),
                    source: FragmentRef {
                        line,
                        ..source.clone()
                    },
                    kind: FragmentKind::SelectionExtend(SelectionExtend {
                        model: model.clone(),
                        field: name,
                        added_options: options,
                        on_delete,
                    }),
                });
            }
            ParsedField::Related {
                name,
                path,
                writable,
                string,
                help,
                line,
            } => related.push(Fragment {
                module: module.to_string(),
                source: FragmentRef {
                    line,
                    ..source.clone()
                },
                kind: FragmentKind::RelatedOverride(RelatedOverride {
                    model: model.clone(),
                    field: name,
                    path,
                    writable,
                    string,
                    help,
                }),
            }),
            ParsedField::Spec(_) => {}
        }
    }
    fragments.extend(related);

    Ok(fragments)
}

/// Decide which variant a declaration is. Returns the target model name
/// and the primary fragment (absent for extensions carrying only markers).
fn classify(
    item: &ItemStruct,
    attrs: ModelAttrs,
    description: Option<String>,
    fields: Vec<FieldSpec>,
    has_markers: bool,
) -> syn::Result<(String, Option<FragmentKind>)> {
    let ambiguous = |msg: &str| syn::Error::new_spanned(&item.ident, msg.to_string());

    match (attrs.name, attrs.inherit) {
        (None, None) => Err(ambiguous(
            "#[model] needs `name` (new model) or `inherit` (extension)",
        )),
        (_, Some(_)) if !attrs.delegates.is_empty() => Err(ambiguous(
            "ambiguous declaration: `inherit` and #[delegate] cannot be combined",
        )),
        (Some(name), None) if !attrs.delegates.is_empty() => {
            if attrs.is_abstract {
                return Err(ambiguous("a delegating model cannot be abstract"));
            }
            Ok((
                name.clone(),
                Some(FragmentKind::Delegate(ModelDelegate {
                    model: name,
                    delegated_to: attrs.delegates,
                    fields,
                    constraints: attrs.constraints,
                    table: attrs.table,
                    description,
                })),
            ))
        }
        (Some(name), None) => Ok((
            name.clone(),
            Some(FragmentKind::New(ModelNew {
                model: name,
                fields,
                constraints: attrs.constraints,
                table: attrs.table,
                description,
                order: attrs.order,
                is_abstract: attrs.is_abstract,
            })),
        )),
        (Some(name), Some(base)) if name != base => {
            if attrs.is_abstract {
                return Err(ambiguous("a prototype copy cannot be abstract"));
            }
            Ok((
                name.clone(),
                Some(FragmentKind::Prototype(ModelPrototype {
                    model: name,
                    base,
                    fields,
                    constraints: attrs.constraints,
                    table: attrs.table,
                    description,
                })),
            ))
        }
        (_, Some(base)) => {
            if attrs.table.is_some() || attrs.is_abstract {
                return Err(ambiguous(
                    "ambiguous declaration: an extension cannot redefine `table` or `abstract`",
                ));
            }
            let empty = fields.is_empty()
                && attrs.constraints.is_empty()
                && attrs.description.is_none()
                && attrs.order.is_none();
            if empty && has_markers {
                return Ok((base, None));
            }
            Ok((
                base.clone(),
                Some(FragmentKind::Extend(ModelExtend {
                    model: base,
                    fields,
                    constraints: attrs.constraints,
                    description: attrs.description,
                    order: attrs.order,
                })),
            ))
        }
    }
}

fn parse_model_attrs(item: &ItemStruct) -> syn::Result<ModelAttrs> {
    let mut out = ModelAttrs::default();

    for attr in &item.attrs {
        if util::attr_is(attr, "model") {
            attr.parse_nested_meta(|meta| {
                let key = util::meta_key(&meta)?;
                match key.as_str() {
                    "name" => out.name = Some(util::string_value(&meta)?),
                    "inherit" => out.inherit = Some(util::string_value(&meta)?),
                    "description" => out.description = Some(util::string_value(&meta)?),
                    "order" => out.order = Some(util::string_value(&meta)?),
                    "table" => out.table = Some(util::string_value(&meta)?),
                    "abstract" => out.is_abstract = util::flag_value(&meta)?,
                    other => return Err(meta.error(format!("unknown model key `{}`", other))),
                }
                Ok(())
            })?;
        } else if util::attr_is(attr, "delegate") {
            let kvs = util::parse_kv_attrs(attr)?;
            let get = |k: &str| kvs.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());
            let (Some(model), Some(field)) = (get("model"), get("field")) else {
                return Err(syn::Error::new_spanned(
                    attr,
                    "#[delegate] needs `model = \"...\"` and `field = \"...\"`",
                ));
            };
            if out.delegates.insert(model.clone(), field).is_some() {
                return Err(syn::Error::new_spanned(
                    attr,
                    format!("model '{}' delegated twice", model),
                ));
            }
        } else if util::attr_is(attr, "constraint") {
            let kvs = util::parse_kv_attrs(attr)?;
            let get = |k: &str| kvs.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());
            let (Some(name), Some(check)) = (get("name"), get("check")) else {
                return Err(syn::Error::new_spanned(
                    attr,
                    "#[constraint] needs `name = \"...\"` and `check = \"...\"`",
                ));
            };
            out.constraints.push(Constraint {
                name,
                check,
                message: get("message"),
            });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openerp_ir::FieldKind;

    fn parse(item: ItemStruct) -> syn::Result<Vec<Fragment>> {
        parse_model(&item, "sale", "models/sale_order.rs")
    }

    #[test]
    fn model_new() {
        let frags = parse(syn::parse_quote! {
            /// Sales Order
            #[model(name = "sale.order", order = "id desc")]
            #[constraint(name = "amount_positive", check = "amount >= 0")]
            pub struct SaleOrder {
                pub name: Char,
                #[field(comodel = "res.partner")]
                pub partner_id: Many2one,
            }
        })
        .unwrap();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].module, "sale");
        assert_eq!(frags[0].source.item, "SaleOrder");
        match &frags[0].kind {
            FragmentKind::New(m) => {
                assert_eq!(m.model, "sale.order");
                assert_eq!(m.description.as_deref(), Some("Sales Order"));
                assert_eq!(m.order.as_deref(), Some("id desc"));
                assert_eq!(m.fields.len(), 2);
                assert_eq!(m.constraints[0].name, "amount_positive");
            }
            other => panic!("expected new, got {:?}", other),
        }
    }

    #[test]
    fn extend_with_markers() {
        let frags = parse(syn::parse_quote! {
            #[model(inherit = "sale.order")]
            pub struct SaleOrderExt {
                pub note: Text,
                #[option(in_progress = "In Progress")]
                pub state: SelectionAdd,
                #[field(related = "partner_id.country_id")]
                pub country_id: Related,
            }
        })
        .unwrap();
        let variants: Vec<&str> = frags.iter().map(|f| f.variant()).collect();
        assert_eq!(variants, vec!["extend", "selection_extend", "related_override"]);
        assert!(frags.iter().all(|f| f.model() == "sale.order"));
    }

    #[test]
    fn markers_only_extension_has_no_primary() {
        let frags = parse(syn::parse_quote! {
            #[model(inherit = "sale.order")]
            pub struct StateExt {
                #[option(in_progress = "In Progress")]
                pub state: SelectionAdd,
            }
        })
        .unwrap();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].variant(), "selection_extend");
    }

    #[test]
    fn same_name_and_inherit_is_extension() {
        let frags = parse(syn::parse_quote! {
            #[model(name = "sale.order", inherit = "sale.order")]
            pub struct SaleOrder { pub note: Text }
        })
        .unwrap();
        assert_eq!(frags[0].variant(), "extend");
    }

    #[test]
    fn prototype_and_delegate() {
        let proto = parse(syn::parse_quote! {
            #[model(name = "sale.order.template", inherit = "sale.order")]
            pub struct Template { pub active: Boolean }
        })
        .unwrap();
        match &proto[0].kind {
            FragmentKind::Prototype(p) => {
                assert_eq!(p.model, "sale.order.template");
                assert_eq!(p.base, "sale.order");
            }
            other => panic!("expected prototype, got {:?}", other),
        }

        let delegate = parse(syn::parse_quote! {
            #[model(name = "res.users")]
            #[delegate(model = "res.partner", field = "partner_id")]
            pub struct Users { pub login: Char }
        })
        .unwrap();
        match &delegate[0].kind {
            FragmentKind::Delegate(d) => {
                assert_eq!(d.delegated_to.get("res.partner").map(String::as_str), Some("partner_id"));
                assert_eq!(d.fields[0].kind, FieldKind::Char { size: None });
            }
            other => panic!("expected delegate, got {:?}", other),
        }
    }

    #[test]
    fn ambiguous_declarations() {
        let err = parse(syn::parse_quote! {
            #[model(name = "res.users", inherit = "res.partner")]
            #[delegate(model = "res.partner", field = "partner_id")]
            pub struct Users {}
        })
        .unwrap_err();
        assert!(err.to_string().contains("ambiguous"));

        let err = parse(syn::parse_quote! {
            #[model(inherit = "sale.order", table = "orders")]
            pub struct SaleOrder {}
        })
        .unwrap_err();
        assert!(err.to_string().contains("ambiguous"));

        let err = parse(syn::parse_quote! {
            #[model(order = "id")]
            pub struct Nameless {}
        })
        .unwrap_err();
        assert!(err.to_string().contains("needs `name`"));

        let err = parse(syn::parse_quote! {
            #[model(name = "x.y")]
            pub struct X { #[option(a = "A")] pub state: SelectionAdd }
        })
        .unwrap_err();
        assert!(err.to_string().contains("SelectionAdd"));
    }

    #[test]
    fn plain_struct_is_ignored() {
        let frags = parse(syn::parse_quote! { pub struct Helper { pub x: u32 } }).unwrap();
        assert!(frags.is_empty());
    }
}
