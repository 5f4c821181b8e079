//! OpenERP module loader.
//!
//! Turns addon directories into a frozen [`Registry`]:
//!
//! ```text
//! roots ─► discover ─► resolve ─► for each module in order:
//!                                   scan models/ ─► compose
//!                                 finish ─► build ─► Registry
//! ```
//!
//! Every stage reports into one [`DiagnosticSink`]; a failed load returns
//! [`LoadError`] and never a partial registry.
//!
//! [`Registry`]: openerp_ir::Registry
//! [`DiagnosticSink`]: openerp_core::DiagnosticSink
//! [`LoadError`]: openerp_core::LoadError

pub mod builder;
pub mod composer;
pub mod discovery;
pub mod manifest;
pub mod pipeline;
pub mod resolver;
pub mod shared;

pub use builder::build;
pub use composer::Composer;
pub use discovery::discover;
pub use manifest::ManifestReader;
pub use pipeline::{load, LoadPipeline};
pub use resolver::resolve;
pub use shared::SharedRegistry;
