//! boosteval - command-line entry point

use clap::Parser;
use boosteval::cli::{cmd_info, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boosteval=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(&args)?,
        Commands::Info { data, features, target } => {
            cmd_info(&data, features.as_deref(), target.as_deref())?;
        }
    }

    Ok(())
}
