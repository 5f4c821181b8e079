//! OpenERP DSL Parser
//!
//! Parses the `#[model]` declarations in a module's `models/` tree into
//! fragment IR. Files are read with `syn`, never compiled.
//!
//! - `field_parser`: one struct field → field spec or fragment marker
//! - `model_parser`: one `#[model]` struct → its fragments
//! - `scanner`: stable walk of a module's source tree

pub mod error;
pub mod field_parser;
pub mod model_parser;
pub mod scanner;
pub mod util;

pub use error::ParseError;
pub use field_parser::{parse_field, ParsedField};
pub use model_parser::parse_model;
pub use scanner::{scan_source, FragmentScanner, ScanResult};
