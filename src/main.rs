//! # tabsync CLI
//!
//! Loads the configured CSV and XLSX files into MongoDB and builds the
//! joined views and merged collections described in the config file.
//!
//! ## Usage
//!
//! ```bash
//! tabsync --config ./config/tabsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tabsync check` | Validate the config and print the plan (no database) |
//! | `tabsync load` | Fully replace one collection per source file |
//! | `tabsync views` | (Re)define every `$lookup` view |
//! | `tabsync diagnose` | Print link coverage counts |
//! | `tabsync merge` | Diagnose, then materialize every merge |
//! | `tabsync run` | Load, views, diagnose and merge, in that order |
//! | `tabsync stats` | List collections and views with document counts |
//!
//! Database credentials come from the environment variables named in
//! `[database]` (a `.env` file in the working directory is read first).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tabsync::config::{self, Config, Credentials};
use tabsync::mongo_store::MongoStore;
use tabsync::{connector_fs, db, diagnose, ingest, materialize, stats, views};
use tabsync_core::store::DocumentStore;
use tracing::{error, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// tabsync: tabular files into MongoDB collections, views and merges.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/tabsync.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tabsync",
    about = "Load CSV/XLSX files into MongoDB and derive joined views and collections",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/tabsync.toml`. The file must exist; sections
    /// it leaves out fall back to the built-in Marvel dataset plan, so an
    /// empty file runs that plan unchanged.
    #[arg(long, global = true, default_value = "./config/tabsync.toml")]
    config: PathBuf,

    /// Enable verbose logging (sets log level to DEBUG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print what a run would do.
    ///
    /// Resolves the source file list and shows every load, view and merge.
    /// Needs neither credentials nor a database.
    Check,

    /// Load every source file into its collection.
    ///
    /// Each destination is fully replaced. Files with an unrecognized
    /// extension are handled by `source.unknown_format`.
    Load,

    /// Define every `$lookup` view, replacing earlier definitions.
    Views,

    /// Report how well each link table covers the entities it joins.
    Diagnose,

    /// Run the diagnostics, then materialize every merge.
    Merge,

    /// Load, define views, diagnose and merge.
    Run,

    /// Show collections and views with their document counts.
    Stats,
}

fn init_tracing(verbose: bool) {
    // RUST_LOG wins when set; otherwise INFO, or DEBUG with --verbose.
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    if let Commands::Check = cli.command {
        return print_plan(&cfg);
    }

    // Fail before touching the network or any file.
    let credentials = Credentials::from_env(&cfg.database)?;
    let store = db::connect(&cfg, &credentials).await?;

    let result = dispatch(&cli.command, &cfg, &store).await;
    if let Err(e) = store.close().await {
        error!(error = %e, "failed to close database client");
    }
    result
}

async fn dispatch(command: &Commands, cfg: &Config, store: &MongoStore) -> Result<()> {
    match command {
        Commands::Check => print_plan(cfg)?,
        Commands::Load => ingest::run_load(cfg, store).await?.print(),
        Commands::Views => views::run_views(cfg, store).await?.print(),
        Commands::Diagnose => diagnose::run_diagnostics(cfg, store).await?.print(),
        Commands::Merge => {
            diagnose::run_diagnostics(cfg, store).await?.print();
            materialize::run_merges(cfg, store).await?.print();
        }
        Commands::Run => {
            ingest::run_load(cfg, store).await?.print();
            views::run_views(cfg, store).await?.print();
            diagnose::run_diagnostics(cfg, store).await?.print();
            materialize::run_merges(cfg, store).await?.print();
        }
        Commands::Stats => stats::run_stats(&cfg.database.name, store).await?,
    }
    Ok(())
}

fn print_plan(cfg: &Config) -> Result<()> {
    let sources = connector_fs::discover_sources(&cfg.source)?;

    println!("check");
    println!("  database: {} (port {})", cfg.database.name, cfg.database.port);
    println!(
        "  credentials from: {}, {}, {}",
        cfg.database.username_env, cfg.database.password_env, cfg.database.host_env
    );
    println!("  sources: {}", sources.len());
    for s in &sources {
        let format = s.format.map(|f| f.as_str()).unwrap_or("unknown");
        println!("    {} <- {} [{}]", s.collection, s.path.display(), format);
    }
    println!("  views: {}", cfg.views.len());
    for v in &cfg.views {
        let chain: Vec<&str> = v.spec.lookups.iter().map(|l| l.from.as_str()).collect();
        println!("    {} = {} <- {}", v.name, v.spec.base, chain.join(" <- "));
    }
    println!("  merges: {}", cfg.merges.len());
    for m in &cfg.merges {
        println!(
            "    {} = {} join of {} on {}",
            m.output,
            m.how,
            m.tables.join(", "),
            m.on.join(", ")
        );
    }
    println!("  linkages: {}", cfg.linkages.len());
    for l in &cfg.linkages {
        println!("    {} = {} <- {} -> {}", l.name, l.left, l.link, l.right);
    }
    println!("ok");
    Ok(())
}
