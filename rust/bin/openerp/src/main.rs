//! `openerp`: module loader command line.
//!
//! Loads addon modules into a registry and reports the outcome:
//!   openerp load --addons-path addons,enterprise -i sale
//!   openerp order --addons-path addons -i sale
//!   openerp schema --addons-path addons -i sale --out schema.json
//!
//! Exit codes: 0 success, 2 missing dependency, 3 cycle, 4 invariant
//! violation, 5 bad manifest, 1 anything else.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use openerp_core::exit_code;

use commands::Output;
use config::LoadArgs;

/// OpenERP module loader.
#[derive(Parser, Debug)]
#[command(name = "openerp", about = "OpenERP module loader")]
struct Cli {
    /// Loader config file (TOML). Flags override its values.
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json.
    #[arg(long = "output", short = 'o', global = true, value_enum, default_value = "text")]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the requested modules and summarize the registry.
    Load {
        #[command(flatten)]
        args: LoadArgs,
    },

    /// Print the resolved load order.
    Order {
        #[command(flatten)]
        args: LoadArgs,
    },

    /// Write the registry as JSON.
    Schema {
        #[command(flatten)]
        args: LoadArgs,
        /// Output file (default: stdout).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show version.
    Version,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            exit_code::OTHER
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config_path = cli.config.as_deref();
    let resolve = |args: &LoadArgs| config::resolve(config_path, args);
    match cli.command {
        Commands::Load { args } => commands::load::run(resolve(&args)?, cli.output),
        Commands::Order { args } => commands::order::run(resolve(&args)?, cli.output),
        Commands::Schema { args, out } => {
            commands::schema::run(resolve(&args)?, cli.output, out.as_deref())
        }
        Commands::Version => {
            println!("openerp v{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_code::SUCCESS)
        }
    }
}
