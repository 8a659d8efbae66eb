//! Kiwi CLI - Main entry point

use clap::Parser;
use kiwi_cli::{commands, Cli, Commands};
use kiwi_common::logging::{init_logging, LogConfig};
use kiwi_ingest::config::Config;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // LOG_* variables take precedence over --verbose
    let log_config = LogConfig::for_cli(cli.verbose);
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // Keeps the file writer flushing until exit
    let guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        },
    };

    if let Err(e) = execute_command(&cli).await {
        error!(error = %format!("{:#}", e), "Command failed");
        eprintln!("Error: {:#}", e);
        drop(guard);
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    cli.overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn execute_command(cli: &Cli) -> anyhow::Result<()> {
    // isolate works on files alone and must run without a usable store config
    let config = || load_config(cli);

    match &cli.command {
        Commands::Upload { input, all, log_dir } => {
            commands::upload::run(&config()?, input, *all, log_dir, cli.json).await
        },

        Commands::Isolate { input, ids, output } => commands::isolate::run(input, ids, output),

        Commands::Search {
            query,
            dbdir,
            outdir,
            tool,
            reconcile,
        } => commands::search::run(&config()?, query, dbdir, outdir, *tool, *reconcile, cli.json).await,

        Commands::Makedb { dbdir, tool } => commands::makedb::run(&config()?, dbdir, *tool).await,

        Commands::Reconcile {
            protein_hits,
            nucleotide_hits,
            outdir,
        } => commands::reconcile::run(&config()?, protein_hits, nucleotide_hits, outdir, cli.json).await,

        Commands::Extract { what, outdir, table } => {
            commands::extract::run(&config()?, *what, outdir, table.as_deref()).await
        },

        Commands::Backup { dir } => commands::backup::run(&config()?, dir).await,

        Commands::Update {
            refseq,
            dbdir,
            workdir,
            from,
        } => commands::update::run(&config()?, refseq, dbdir, workdir, *from, cli.json).await,
    }
}
