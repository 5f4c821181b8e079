//! `openerp schema`: dump the frozen registry as JSON.

use std::path::Path;

use anyhow::{Context, Result};
use openerp_core::{exit_code, LoaderConfig};
use openerp_loader::LoadPipeline;
use tracing::info;

use super::{report_failure, Output};

pub fn run(config: LoaderConfig, output: Output, out: Option<&Path>) -> Result<i32> {
    let registry = match LoadPipeline::new(config).run() {
        Ok(registry) => registry,
        Err(err) => return report_failure(&err, output),
    };

    let json = serde_json::to_string_pretty(&registry)?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("schema written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(exit_code::SUCCESS)
}
