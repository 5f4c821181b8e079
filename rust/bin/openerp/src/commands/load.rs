//! `openerp load`: run the pipeline and summarize the registry.

use anyhow::Result;
use openerp_core::{exit_code, LoaderConfig};
use openerp_loader::LoadPipeline;
use serde_json::json;

use super::{report_failure, Output};

pub fn run(config: LoaderConfig, output: Output) -> Result<i32> {
    let registry = match LoadPipeline::new(config).run() {
        Ok(registry) => registry,
        Err(err) => return report_failure(&err, output),
    };

    match output {
        Output::Text => {
            println!(
                "loaded {} modules, {} models, {} relations",
                registry.load_order().len(),
                registry.len(),
                registry.edges().count()
            );
            println!("order: {}", registry.load_order().join(", "));
            for diag in registry.diagnostics() {
                println!("  {}", diag);
            }
        }
        Output::Json => {
            let body = json!({
                "status": "ok",
                "load_order": registry.load_order(),
                "models": registry.model_names().collect::<Vec<_>>(),
                "edges": registry.edges().count(),
                "diagnostics": registry.diagnostics(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(exit_code::SUCCESS)
}
