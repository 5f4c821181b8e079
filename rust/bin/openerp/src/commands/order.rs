//! `openerp order`: print the resolved load order without composing.

use anyhow::Result;
use openerp_core::{exit_code, LoaderConfig};
use openerp_loader::LoadPipeline;

use super::{report_failure, Output};

pub fn run(config: LoaderConfig, output: Output) -> Result<i32> {
    let order = match LoadPipeline::new(config).resolve_order() {
        Ok(order) => order,
        Err(err) => return report_failure(&err, output),
    };
    match output {
        Output::Text => {
            for module in &order {
                println!("{}", module);
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(&order)?),
    }
    Ok(exit_code::SUCCESS)
}
