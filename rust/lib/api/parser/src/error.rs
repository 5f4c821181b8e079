use std::path::PathBuf;

use openerp_ir::{Diagnostic, DiagnosticKind, FragmentRef};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    /// A declaration that is malformed or fits more than one fragment variant.
    #[error("{file}:{line} ({item}): {message}")]
    BadFragment {
        file: String,
        line: usize,
        item: String,
        message: String,
    },

    /// The file is not valid Rust.
    #[error("{file}:{line}: syntax error: {message}")]
    Syntax {
        file: String,
        line: usize,
        message: String,
    },

    #[error("io error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// Source coordinates, when the error points into a file.
    pub fn fragment_ref(&self) -> Option<FragmentRef> {
        match self {
            ParseError::BadFragment {
                file, line, item, ..
            } => Some(FragmentRef {
                file: file.clone(),
                line: *line,
                item: item.clone(),
            }),
            ParseError::Syntax { file, line, .. } => Some(FragmentRef {
                file: file.clone(),
                line: *line,
                item: String::new(),
            }),
            ParseError::Io { .. } => None,
        }
    }

    /// Convert into a diagnostic attributed to `module`.
    pub fn to_diagnostic(&self, module: &str) -> Diagnostic {
        let (kind, message) = match self {
            ParseError::BadFragment { message, .. } => (DiagnosticKind::BadFragment, message.clone()),
            ParseError::Syntax { message, .. } => {
                (DiagnosticKind::BadFragment, format!("syntax error: {}", message))
            }
            ParseError::Io { .. } => (DiagnosticKind::Io, self.to_string()),
        };
        let diag = Diagnostic::new(kind, message).in_module(module);
        match self.fragment_ref() {
            Some(at) => diag.at(at),
            None => diag,
        }
    }
}
