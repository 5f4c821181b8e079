//! Load pipeline: manifests → load order → per-module scan + compose →
//! final passes → frozen registry.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use openerp_core::{
    Abort, DiagnosticSink, LoadError, LoadEvent, LoadObserver, LoaderConfig, TracingObserver,
};
use openerp_ir::{Diagnostic, DiagnosticKind, Manifest, Registry};
use openerp_parser::{FragmentScanner, ParseError, ScanResult};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::builder::build;
use crate::composer::Composer;
use crate::discovery::discover;
use crate::manifest::ManifestReader;
use crate::resolver::resolve;

/// One configured load. Running it twice on the same tree gives the same
/// registry.
pub struct LoadPipeline {
    config: LoaderConfig,
    observer: Arc<dyn LoadObserver>,
    cancel: CancellationToken,
}

impl LoadPipeline {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            observer: Arc::new(TracingObserver),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Use a token owned by the caller. Cancelling it stops the load at the
    /// next module boundary or before freeze.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Run the whole load. On failure nothing is returned but the
    /// diagnostics.
    pub fn run(&self) -> Result<Registry, LoadError> {
        self.config.validate()?;
        let mut sink = DiagnosticSink::strict(self.config.warnings_as_errors);
        match self.stages(&mut sink) {
            Ok(registry) => Ok(registry.with_diagnostics(sink.into_entries())),
            Err(Abort) => Err(sink.into_error()),
        }
    }

    /// Discovery and resolution only.
    pub fn resolve_order(&self) -> Result<Vec<String>, LoadError> {
        self.config.validate()?;
        let mut sink = DiagnosticSink::strict(self.config.warnings_as_errors);
        match self.plan(&mut sink) {
            Ok((_, order)) => Ok(order),
            Err(Abort) => Err(sink.into_error()),
        }
    }

    fn plan(
        &self,
        sink: &mut DiagnosticSink,
    ) -> Result<(IndexMap<String, Manifest>, Vec<String>), Abort> {
        let reader = ManifestReader::new(&self.config.manifest_file, self.config.with_demo);
        let manifests = discover(&self.config.roots, &reader, sink)?;
        sink.end_phase("discover")?;

        let requested: BTreeSet<String> = self.config.modules.iter().cloned().collect();
        let order = resolve(&manifests, &requested, sink)?;
        info!("load order: {}", order.join(", "));
        Ok((manifests, order))
    }

    fn stages(&self, sink: &mut DiagnosticSink) -> Result<Registry, Abort> {
        let (manifests, order) = self.plan(sink)?;

        let scanner = FragmentScanner::new(&self.config.models_dir);
        let mut composer = Composer::new(&manifests);
        let total = order.len();
        for (index, module) in order.iter().enumerate() {
            self.check_cancelled(sink, module)?;
            self.observer.on_event(&LoadEvent::ModuleStarted {
                module: module.clone(),
                index,
                total,
            });

            let Some(manifest) = manifests.get(module) else {
                continue;
            };
            let scanned = scanner.scan(module, &manifest.path);
            let fragments = compose_scanned(&mut composer, module, scanned, sink)?;

            self.observer.on_event(&LoadEvent::ModuleFinished {
                module: module.clone(),
                fragments,
            });
        }

        let models = composer.finish(sink)?;
        self.check_cancelled(sink, "freeze")?;

        let depends: BTreeMap<String, BTreeSet<String>> = order
            .iter()
            .filter_map(|m| {
                let deps = manifests.get(m)?.load_after();
                Some((m.clone(), deps.into_iter().map(str::to_string).collect()))
            })
            .collect();
        let registry = build(models, order, &depends, sink)?;

        self.observer.on_event(&LoadEvent::Frozen {
            models: registry.len(),
            modules: registry.load_order().len(),
        });
        Ok(registry)
    }

    fn check_cancelled(&self, sink: &mut DiagnosticSink, next: &str) -> Result<(), Abort> {
        if self.cancel.is_cancelled() {
            sink.push(Diagnostic::new(
                DiagnosticKind::Cancelled,
                format!("load cancelled before {}", next),
            ))?;
        }
        Ok(())
    }
}

/// Feed one module's scan into the composer and return how many fragments
/// it held. A scan that failed outright still enters the module with no
/// fragments, so the failure ends that module's phase.
fn compose_scanned(
    composer: &mut Composer<'_>,
    module: &str,
    scanned: Result<ScanResult, ParseError>,
    sink: &mut DiagnosticSink,
) -> Result<usize, Abort> {
    let fragments = match scanned {
        Ok(scanned) => {
            for error in &scanned.errors {
                sink.push(error.to_diagnostic(module))?;
            }
            scanned.fragments
        }
        Err(e) => {
            sink.push(e.to_diagnostic(module))?;
            Vec::new()
        }
    };
    composer.compose_module(module, &fragments, sink)?;
    Ok(fragments.len())
}

/// Load `requested` (plus dependencies and auto-installed modules) from
/// `roots` with default settings.
pub fn load(requested: &BTreeSet<String>, roots: &[PathBuf]) -> Result<Registry, LoadError> {
    let config = LoaderConfig {
        roots: roots.to_vec(),
        modules: requested.iter().cloned().collect(),
        ..LoaderConfig::default()
    };
    LoadPipeline::new(config).run()
}
