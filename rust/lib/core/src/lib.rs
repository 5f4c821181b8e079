pub mod config;
pub mod diagnostics;
pub mod error;
pub mod observer;

pub use config::{ConfigError, LoaderConfig};
pub use diagnostics::{Abort, DiagnosticSink};
pub use error::{exit_code, exit_code_for, LoadError};
pub use observer::{LoadEvent, LoadObserver, TracingObserver};
