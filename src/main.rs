//! irsync - reconcile configuration between IriusRisk tenants

use clap::Parser;
use log::LevelFilter;

mod cli;
mod client;
mod config;
mod error;
mod models;
mod output;
mod sync;

use cli::args::GlobalOptions;
use cli::sync::SyncArgs;
use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `--debug` forces debug output for this crate; otherwise `RUST_LOG` applies.
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("irsync=info"));
    if debug {
        builder.filter_module("irsync", LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Init => cli::init::run(&opts),
        Commands::Status => cli::status::run(&opts),
        Commands::Sync {
            resource,
            dry_run,
            yes,
            allow_duplicate_keys,
        } => {
            let args = SyncArgs {
                resource,
                dry_run,
                yes,
                allow_duplicate_keys,
            };
            cli::sync::run(&opts, args).await
        }
        Commands::Diff { resource, all_rows } => cli::diff::run(&opts, resource, all_rows).await,
        Commands::Export {
            collection,
            tenant,
            file_format,
            output,
        } => {
            cli::export::run(&opts, &collection, tenant.into(), file_format, output.as_deref())
                .await
        }
        Commands::Audit {
            days,
            event_type,
            file_format,
            output,
        } => cli::audit::run(&opts, days, &event_type, file_format, &output).await,
        Commands::Completion { shell } => cli::completions::run(shell),
    }
}
