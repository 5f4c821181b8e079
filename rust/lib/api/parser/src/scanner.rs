use std::fs;
use std::path::{Path, PathBuf};

use openerp_ir::Fragment;
use syn::Item;
use tracing::debug;

use crate::error::ParseError;
use crate::model_parser::parse_model;
use crate::util;

/// Everything one module's source tree contributed.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Fragments in traversal order.
    pub fragments: Vec<Fragment>,
    /// Declarations that could not be turned into fragments.
    pub errors: Vec<ParseError>,
}

/// FragmentScanner walks a module's models directory and parses every
/// `*.rs` file it finds:
///
/// ```text
/// sale/
/// ├── manifest.toml
/// └── models/
///     ├── sale_order.rs        → 1st
///     ├── sale_order_line.rs   → 2nd
///     └── wizard/
///         └── confirm.rs       → 3rd
/// ```
///
/// Entries are visited sorted by file name, directories descended
/// depth-first at their sorted position. The result is the same for the
/// same tree.
#[derive(Debug, Clone)]
pub struct FragmentScanner {
    models_dir: String,
}

impl Default for FragmentScanner {
    fn default() -> Self {
        Self::new("models")
    }
}

impl FragmentScanner {
    pub fn new(models_dir: impl Into<String>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Scan the module rooted at `module_dir`. Only an unreadable directory
    /// fails the whole scan; per-declaration problems land in `errors`.
    pub fn scan(&self, module: &str, module_dir: &Path) -> Result<ScanResult, ParseError> {
        let mut result = ScanResult::default();
        let root = module_dir.join(&self.models_dir);
        if !root.is_dir() {
            debug!("FragmentScanner: {} has no {} directory", module, self.models_dir);
            return Ok(result);
        }

        let mut files = Vec::new();
        Self::collect(&root, &mut files)?;

        for path in files {
            let rel = path
                .strip_prefix(module_dir)
                .unwrap_or(path.as_path())
                .to_string_lossy()
                .replace('\\', "/");
            let source = match fs::read_to_string(&path) {
                Ok(s) => s,
                Err(source) => {
                    result.errors.push(ParseError::Io { path, source });
                    continue;
                }
            };
            let before = result.fragments.len();
            scan_source(module, &rel, &source, &mut result);
            debug!(
                "FragmentScanner: {} {} -> {} fragments",
                module,
                rel,
                result.fragments.len() - before
            );
        }

        Ok(result)
    }

    fn collect(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ParseError> {
        let io_err = |source| ParseError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            entries.push(entry.map_err(io_err)?.path());
        }
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in entries {
            if path.is_dir() {
                Self::collect(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                out.push(path);
            }
        }
        Ok(())
    }
}

/// Parse one source file's text, appending to `result`.
pub fn scan_source(module: &str, file: &str, source: &str, result: &mut ScanResult) {
    match syn::parse_file(source) {
        Ok(parsed) => scan_items(module, file, &parsed.items, result),
        Err(err) => result.errors.push(ParseError::Syntax {
            file: file.to_string(),
            line: err.span().start().line,
            message: err.to_string(),
        }),
    }
}

fn scan_items(module: &str, file: &str, items: &[Item], result: &mut ScanResult) {
    for item in items {
        match item {
            Item::Struct(s) => match parse_model(s, module, file) {
                Ok(frags) => result.fragments.extend(frags),
                Err(err) => result.errors.push(ParseError::BadFragment {
                    file: file.to_string(),
                    line: util::line_of(&s.ident),
                    item: s.ident.to_string(),
                    message: err.to_string(),
                }),
            },
            Item::Mod(m) => {
                if let Some((_, inner)) = &m.content {
                    scan_items(module, file, inner, result);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, body: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn stable_depth_first_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "models/b_line.rs",
            r#"#[model(name = "sale.order.line")] pub struct Line { pub qty: Float }"#,
        );
        write(
            dir.path(),
            "models/a_order.rs",
            r#"
            #[model(name = "sale.order")]
            pub struct Order { pub name: Char }

            #[model(inherit = "sale.order")]
            pub struct OrderNote { pub note: Text }
            "#,
        );
        write(
            dir.path(),
            "models/a_wizard/confirm.rs",
            r#"#[model(name = "sale.confirm")] pub struct Confirm {}"#,
        );
        write(dir.path(), "models/README.md", "not rust");

        let result = FragmentScanner::default().scan("sale", dir.path()).unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let seen: Vec<(&str, &str)> = result
            .fragments
            .iter()
            .map(|f| (f.model(), f.variant()))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("sale.order", "new"),
                ("sale.order", "extend"),
                ("sale.confirm", "new"),
                ("sale.order.line", "new"),
            ]
        );
        assert_eq!(result.fragments[0].source.file, "models/a_order.rs");
        assert_eq!(result.fragments[1].source.line, 6);
    }

    #[test]
    fn errors_carry_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "models/bad.rs",
            "\n#[model(inherit = \"x.y\", table = \"t\")]\npub struct Bad {}\n",
        );
        write(dir.path(), "models/broken.rs", "pub struct {");

        let result = FragmentScanner::default().scan("m", dir.path()).unwrap();
        assert!(result.fragments.is_empty());
        assert_eq!(result.errors.len(), 2);
        match &result.errors[0] {
            ParseError::BadFragment { file, line, item, .. } => {
                assert_eq!(file, "models/bad.rs");
                assert_eq!(*line, 3);
                assert_eq!(item, "Bad");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(result.errors[1], ParseError::Syntax { .. }));

        let diag = result.errors[0].to_diagnostic("m");
        assert_eq!(diag.kind.code(), "BAD_FRAGMENT");
        assert_eq!(diag.module.as_deref(), Some("m"));
    }

    #[test]
    fn inline_modules_are_scanned() {
        let mut result = ScanResult::default();
        scan_source(
            "m",
            "models/x.rs",
            r#"mod inner { #[model(name = "x.inner")] pub struct Inner {} }"#,
            &mut result,
        );
        assert_eq!(result.fragments.len(), 1);
        assert_eq!(result.fragments[0].model(), "x.inner");
    }

    #[test]
    fn missing_models_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let result = FragmentScanner::default().scan("m", dir.path()).unwrap();
        assert!(result.fragments.is_empty());
        assert!(result.errors.is_empty());
    }
}
