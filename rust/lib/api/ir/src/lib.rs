//! OpenERP module/model Intermediate Representation (IR)
//!
//! Plain data structures shared between:
//! - parser (fragments scanned from `models/*.rs`)
//! - loader (manifests, composition, the frozen registry)
//! - validator (registry invariant checks)
//!
//! Layers:
//! 1. Types: field kinds, selection options, constraints
//! 2. Module: validated manifest of one module directory
//! 3. Fragment: one module's typed contribution to one model
//! 4. Model: field specs and composite models
//! 5. Registry: frozen composite models + relation edges
//! 6. Diagnostic: findings tagged with module and fragment coordinates

pub mod types;
pub mod module;
pub mod fragment;
pub mod model;
pub mod registry;
pub mod diagnostic;

pub use types::*;
pub use module::*;
pub use fragment::*;
pub use model::*;
pub use registry::*;
pub use diagnostic::*;
