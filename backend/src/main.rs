// shardsql-plan entrypoint
//!
//! Loads a sharding config and prints the physical tables a schema migration
//! has to create, plus the sequence bootstrap statements it would run.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use shardsql::logging;
use shardsql::plan::plan_from_settings;
use shardsql::ShardingSettings;

/// Print the shard tables a ShardSQL configuration needs
#[derive(Parser, Debug)]
#[command(name = "shardsql-plan")]
#[command(author = "ShardSQL Team")]
#[command(version)]
#[command(about = "Print the shard tables a ShardSQL configuration needs", long_about = None)]
struct Args {
    /// Sharding config file
    #[arg(short = 'c', long = "config", default_value = "sharding.toml")]
    config: PathBuf,

    /// Plan only these tables (repeatable); every configured table when omitted
    #[arg(short = 't', long = "table")]
    tables: Vec<String>,

    /// Override `[logging].level`
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = match ShardingSettings::from_file(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("FATAL: failed to load {}: {}", args.config.display(), e);
            std::process::exit(1);
        },
    };
    if let Some(level) = args.log_level {
        settings.logging.level = level;
        settings.validate()?;
    }

    logging::init_logging(&settings.logging)?;
    info!(
        "Planning {} table group(s) from {}",
        settings.tables.len(),
        args.config.display()
    );

    let report = plan_from_settings(&settings, &args.tables).await?;
    print!("{}", report.render());
    Ok(())
}
