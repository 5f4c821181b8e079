use tracing::{debug, info};

/// Progress of a load, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// A module's fragments are about to be scanned and composed.
    ModuleStarted {
        module: String,
        index: usize,
        total: usize,
    },
    ModuleFinished {
        module: String,
        fragments: usize,
    },
    /// The registry was frozen.
    Frozen { models: usize, modules: usize },
}

/// Receives load progress events.
///
/// Embedding services implement this to surface progress; the default
/// observer logs through tracing.
pub trait LoadObserver: Send + Sync {
    fn on_event(&self, event: &LoadEvent);
}

/// Logs every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn on_event(&self, event: &LoadEvent) {
        match event {
            LoadEvent::ModuleStarted {
                module,
                index,
                total,
            } => debug!("loading module {} ({}/{})", module, index + 1, total),
            LoadEvent::ModuleFinished { module, fragments } => {
                debug!("module {} done: {} fragments", module, fragments)
            }
            LoadEvent::Frozen { models, modules } => {
                info!("registry frozen: {} models from {} modules", models, modules)
            }
        }
    }
}
