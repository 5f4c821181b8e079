//! Process-wide access to the current registry.

use std::sync::{Arc, PoisonError, RwLock};

use openerp_core::LoadError;
use openerp_ir::Registry;

use crate::pipeline::LoadPipeline;

/// Holds the published registry. Readers clone the `Arc` and keep a
/// consistent snapshot for as long as they like; a reload swaps the
/// pointer and never touches a published registry.
#[derive(Debug)]
pub struct SharedRegistry {
    current: RwLock<Arc<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The current registry (Arc clone).
    pub fn get(&self) -> Arc<Registry> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish `registry`, returning the one it replaces.
    pub fn replace(&self, registry: Registry) -> Arc<Registry> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, Arc::new(registry))
    }

    /// Run a full load and publish the result. On failure the current
    /// registry stays in place.
    pub fn reload(&self, pipeline: &LoadPipeline) -> Result<Arc<Registry>, LoadError> {
        let registry = Arc::new(pipeline.run()?);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = registry.clone();
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use openerp_core::LoaderConfig;

    fn empty(order: &[&str]) -> Registry {
        Registry::new(
            IndexMap::new(),
            vec![],
            order.iter().map(|m| m.to_string()).collect(),
            vec![],
        )
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let shared = SharedRegistry::new(empty(&["base"]));
        let before = shared.get();
        let old = shared.replace(empty(&["base", "sale"]));
        assert!(Arc::ptr_eq(&before, &old));
        assert_eq!(before.load_order().len(), 1);
        assert_eq!(shared.get().load_order().len(), 2);
    }

    #[test]
    fn failed_reload_keeps_current() {
        let shared = SharedRegistry::new(empty(&["base"]));
        let pipeline = LoadPipeline::new(LoaderConfig {
            roots: vec!["/definitely/not/here".into()],
            modules: vec!["base".into()],
            ..LoaderConfig::default()
        });
        assert!(shared.reload(&pipeline).is_err());
        assert_eq!(shared.get().load_order(), ["base".to_string()]);
    }
}
