//! Sales Forecast - Main Entry Point
//!
//! Walk-forward cross-validation of weekly sales models from the command line.

use clap::Parser;
use sales_forecast::cli::{cmd_cross_validate, cmd_info, cmd_splits, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sales_forecast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CrossValidate { args, summary_out, eval_out, parallel } => {
            cmd_cross_validate(&args, summary_out.as_deref(), eval_out.as_deref(), parallel)?;
        }
        Commands::Splits { args } => {
            cmd_splits(&args)?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
