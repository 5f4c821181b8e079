//! Shared parser utilities.

use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, Lit, LitBool, LitInt, LitStr, Meta, Token};

/// Check if an attribute has a given path identifier.
pub fn attr_is(attr: &Attribute, name: &str) -> bool {
    attr.path().is_ident(name)
}

/// Key of a nested meta item, keywords included (`override`, `abstract`).
pub fn meta_key(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    meta.path
        .get_ident()
        .map(|i| i.to_string())
        .ok_or_else(|| meta.error("expected a plain identifier"))
}

/// A flag: `readonly` or `readonly = false`.
pub fn flag_value(meta: &ParseNestedMeta<'_>) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        let lit: LitBool = meta.value()?.parse()?;
        Ok(lit.value)
    } else {
        Ok(true)
    }
}

/// A string: `key = "value"`.
pub fn string_value(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

/// An integer: `size = 64`.
pub fn u32_value(meta: &ParseNestedMeta<'_>) -> syn::Result<u32> {
    let lit: LitInt = meta.value()?.parse()?;
    lit.base10_parse::<u32>()
}

/// Parse key-value string pairs from a parenthesized attribute.
/// e.g. `#[delegate(model = "res.partner", field = "partner_id")]`
/// → `[("model", "res.partner"), ("field", "partner_id")]`
pub fn parse_kv_attrs(attr: &Attribute) -> syn::Result<Vec<(String, String)>> {
    let mut result = Vec::new();
    attr.parse_nested_meta(|meta| {
        let key = meta_key(&meta)?;
        let value = string_value(&meta)?;
        result.push((key, value));
        Ok(())
    })?;
    Ok(result)
}

/// Split a comma-separated list, dropping empty entries.
/// e.g. `"order_line.price_total, currency_id"` → `["order_line.price_total", "currency_id"]`
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a dotted related path. Empty segments make the path invalid.
pub fn split_path(s: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = s.split('.').map(|p| p.trim().to_string()).collect();
    if parts.iter().any(|p| p.is_empty()) {
        None
    } else {
        Some(parts)
    }
}

/// 1-based source line of anything with a span.
pub fn line_of<T: Spanned>(node: &T) -> usize {
    node.span().start().line
}

/// Extract the doc comment (`/// ...`) from attributes, lines joined by spaces.
pub fn extract_doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}
