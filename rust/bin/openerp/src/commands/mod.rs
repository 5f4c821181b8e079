//! Subcommands. Each returns the process exit code.

pub mod load;
pub mod order;
pub mod schema;

use clap::ValueEnum;
use openerp_core::LoadError;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Output {
    Text,
    Json,
}

/// Print why a load failed and return its exit code.
pub fn report_failure(err: &LoadError, output: Output) -> anyhow::Result<i32> {
    match output {
        Output::Text => {
            eprintln!("{}", err);
            for diag in err.diagnostics() {
                eprintln!("  {}", diag);
            }
        }
        Output::Json => {
            let body = json!({
                "status": "error",
                "code": err.error_code(),
                "exit_code": err.exit_code(),
                "message": err.to_string(),
                "diagnostics": err.diagnostics(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(err.exit_code())
}
