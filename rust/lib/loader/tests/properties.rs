//! Properties every successful (or rejected) load must satisfy.

mod common;

use std::collections::BTreeSet;

use common::Addons;
use openerp_core::{Abort, DiagnosticSink};
use openerp_ir::{DiagnosticKind, FieldKind};
use openerp_loader::{discover, Composer, ManifestReader};
use openerp_parser::FragmentScanner;

/// A small sales stack used by several properties.
fn sales_stack() -> Addons {
    let addons = Addons::new();
    addons
        .module("base", "")
        .models(
            "base",
            "partner.rs",
            r#"
            #[model(name = "res.partner", order = "name")]
            pub struct Partner {
                #[field(required, translate)]
                pub name: Char,
                #[field(comodel = "res.partner")]
                pub parent_id: Many2one,
                #[field(comodel = "res.partner", inverse = "parent_id")]
                pub child_ids: One2many,
            }
            "#,
        )
        .module("product", r#"depends = ["base"]"#)
        .models(
            "product",
            "product.rs",
            r#"
            #[model(name = "product.product")]
            pub struct Product {
                pub name: Char,
                #[field(comodel = "res.partner")]
                pub seller_ids: Many2many,
            }
            "#,
        )
        .module("sale", r#"depends = ["product", "base"]"#)
        .models(
            "sale",
            "order.rs",
            r#"
            #[model(name = "sale.order")]
            pub struct Order {
                #[field(comodel = "res.partner", required)]
                pub partner_id: Many2one,
                #[field(comodel = "sale.order.line", inverse = "order_id")]
                pub order_line: One2many,
                #[option(draft = "Quotation")]
                #[option(sale = "Sales Order")]
                pub state: Selection,
                #[field(compute = "order_line.price")]
                pub amount_total: Float,
            }

            #[model(name = "sale.order.line")]
            pub struct Line {
                #[field(comodel = "sale.order", required)]
                pub order_id: Many2one,
                #[field(comodel = "product.product")]
                pub product_id: Many2one,
                pub price: Float,
            }
            "#,
        )
        .models(
            "sale",
            "partner.rs",
            r#"
            #[model(inherit = "res.partner")]
            pub struct Partner {
                #[field(comodel = "sale.order", inverse = "partner_id")]
                pub sale_order_ids: One2many,
            }
            "#,
        )
        .module("sale_stock", "depends = [\"sale\"]\nauto_install = [\"stock\"]")
        .module("stock", r#"depends = ["product"]"#)
        .module("sale_margin", r#"depends = ["sale"]"#)
        .models(
            "sale_margin",
            "order.rs",
            r#"
            #[model(inherit = "sale.order")]
            pub struct Order {
                #[option(margin_review = "Margin Review")]
                pub state: SelectionAdd,
                pub margin: Float,
            }
            "#,
        );
    addons
}

#[test]
fn determinism() {
    let addons = sales_stack();
    let first = addons.load(&["sale_margin", "stock"]).unwrap();
    let second = addons.load(&["stock", "sale_margin"]).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn dependency_order() {
    let addons = sales_stack();
    let registry = addons.load(&["sale_margin", "stock"]).unwrap();
    let order = registry.load_order();
    let index = |m: &str| order.iter().position(|x| x == m).unwrap();

    let depends = [
        ("product", "base"),
        ("sale", "product base"),
        ("stock", "product"),
        ("sale_stock", "sale stock"),
        ("sale_margin", "sale"),
    ];
    for (module, deps) in depends {
        for dep in deps.split_whitespace() {
            assert!(index(dep) < index(module), "{} must precede {}", dep, module);
        }
    }
    // ties broken lexicographically
    assert_eq!(
        order,
        ["base", "product", "sale", "sale_margin", "stock", "sale_stock"].map(String::from)
    );
}

#[test]
fn auto_install_closure() {
    let addons = sales_stack();

    let with_stock = addons.load(&["sale", "stock"]).unwrap();
    assert!(with_stock.load_order().contains(&"sale_stock".to_string()));

    let without = addons.load(&["sale"]).unwrap();
    let loaded: BTreeSet<&str> = without.load_order().iter().map(String::as_str).collect();
    assert!(!loaded.contains("stock"));
    assert!(!loaded.contains("sale_stock"));
}

#[test]
fn composition_order_is_enforced() {
    let addons = sales_stack();
    let mut sink = DiagnosticSink::new();
    let manifests = discover(&[addons.root()], &ManifestReader::default(), &mut sink).unwrap();
    let scanner = FragmentScanner::default();
    let scan = |module: &str| scanner.scan(module, &manifests[module].path).unwrap().fragments;

    // in order: same composite as the pipeline builds
    let mut composer = Composer::new(&manifests);
    for module in ["base", "product", "sale"] {
        composer.compose_module(module, &scan(module), &mut sink).unwrap();
    }
    let models = composer.finish(&mut sink).unwrap();
    let registry = addons.load(&["sale"]).unwrap();
    assert_eq!(&models["res.partner"], registry.model("res.partner").unwrap());

    // reordered: rejected before anything is composed
    let mut sink = DiagnosticSink::new();
    let mut composer = Composer::new(&manifests);
    composer.compose_module("base", &scan("base"), &mut sink).unwrap();
    assert_eq!(
        composer.compose_module("sale", &scan("sale"), &mut sink),
        Err(Abort)
    );
    assert_eq!(sink.entries()[0].kind, DiagnosticKind::LoadOrderViolation);
    assert!(!composer.models().contains_key("sale.order"));
}

#[test]
fn translate_never_switches_off() {
    let addons = sales_stack();
    addons.module("partner_plain", r#"depends = ["base"]"#).models(
        "partner_plain",
        "partner.rs",
        r#"
        #[model(inherit = "res.partner")]
        pub struct Partner {
            #[field(override, translate = false, help = "Display name")]
            pub name: Char,
        }
        "#,
    );
    let registry = addons.load(&["partner_plain"]).unwrap();
    let name = &registry.model("res.partner").unwrap().fields["name"];
    assert!(name.translate);
    assert_eq!(name.help.as_deref(), Some("Display name"));
}

#[test]
fn selection_keys_stay_unique() {
    let addons = sales_stack();
    let registry = addons.load(&["sale_margin"]).unwrap();
    for model in registry.models() {
        for field in model.fields.values() {
            if let FieldKind::Selection { options, .. } = field.kind.value_kind() {
                let keys: BTreeSet<&str> = options.iter().map(|o| o.key.as_str()).collect();
                assert_eq!(keys.len(), options.len(), "{}.{}", model.name, field.name);
            }
        }
    }

    addons.module("sale_dup", r#"depends = ["sale"]"#).models(
        "sale_dup",
        "order.rs",
        r#"
        #[model(inherit = "sale.order")]
        pub struct Order {
            #[option(draft = "Draft again")]
            pub state: SelectionAdd,
        }
        "#,
    );
    let err = addons.load(&["sale_dup"]).unwrap_err();
    assert_eq!(
        err.first_failure().unwrap().kind,
        DiagnosticKind::DuplicateSelectionOption
    );
}

#[test]
fn relation_closure() {
    let addons = sales_stack();
    let registry = addons.load(&["sale_margin", "stock"]).unwrap();
    assert!(registry.edges().count() > 0);
    for edge in registry.edges() {
        assert!(
            registry.model(&edge.target_model).is_some(),
            "{}.{} → {}",
            edge.source_model,
            edge.field,
            edge.target_model
        );
    }
}

#[test]
fn inverse_pairing() {
    let addons = sales_stack();
    addons.module("product_variant", r#"depends = ["product"]"#).models(
        "product_variant",
        "variant.rs",
        r#"
        #[model(name = "product.variant", inherit = "product.product")]
        pub struct Variant {
            pub code: Char,
        }
        "#,
    );
    let registry = addons.load(&["sale", "product_variant"]).unwrap();
    assert!(registry.model("product.variant").is_some());
    for model in registry.models() {
        for field in model.fields.values() {
            let FieldKind::One2many { target, inverse } = &field.kind else {
                continue;
            };
            let back = &registry.model(target).unwrap().fields[inverse.as_str()];
            assert_eq!(
                back.kind,
                FieldKind::Many2one {
                    target: model.name.clone()
                }
            );
        }
    }

    // a copy of sale.order inherits order_line, whose inverse points at the original
    addons.module("sale_quote", r#"depends = ["sale"]"#).models(
        "sale_quote",
        "quote.rs",
        r#"#[model(name = "sale.quote", inherit = "sale.order")] pub struct Quote { pub note: Char }"#,
    );
    let err = addons.load(&["sale_quote"]).unwrap_err();
    let failure = err.first_failure().unwrap();
    assert_eq!(failure.kind, DiagnosticKind::MissingInverse);
    assert!(failure.message.starts_with("sale.quote.order_line"));

    let broken = Addons::new();
    broken.module("a", "").models(
        "a",
        "m.rs",
        r#"
        #[model(name = "a.parent")]
        pub struct Parent {
            #[field(comodel = "a.child", inverse = "parent_id")]
            pub child_ids: One2many,
        }

        #[model(name = "a.child")]
        pub struct Child {
            pub name: Char,
        }
        "#,
    );
    let err = broken.load(&["a"]).unwrap_err();
    assert_eq!(err.first_failure().unwrap().kind, DiagnosticKind::MissingInverse);
}
