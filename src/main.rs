//! ferrite-load - Bulk-load data from Redis or MongoDB into Ferrite
//!
//! Two subcommands, one per source kind. Each runs exactly one migration
//! pass and reports what happened.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;

use ferrite_load::migrate::{
    MigrationRun, MongoSourceConfig, RedisSourceConfig, RunOptions, RunOutcome, TargetConfig,
};

/// ferrite-load - bulk migration into a Ferrite store
#[derive(Parser, Debug)]
#[command(name = "ferrite-load")]
#[command(author, version, about = "Bulk-load data from Redis or MongoDB into a Ferrite store")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        env = "FERRITE_LOAD_LOG",
        default_value = "info",
        global = true
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate all keys from a Redis instance
    Redis {
        /// Source Redis host
        #[arg(long, default_value = "localhost")]
        source_host: String,

        /// Source Redis port
        #[arg(long, default_value_t = 6379)]
        source_port: u16,

        /// Target host
        #[arg(long, default_value = "localhost")]
        target_host: String,

        /// Target port
        #[arg(long, default_value_t = 6379)]
        target_port: u16,

        /// Target password
        #[arg(long, short = 'a')]
        password: Option<String>,

        /// Key pattern filter (e.g., "user:*")
        #[arg(long, default_value = "*")]
        pattern: String,
    },

    /// Migrate all collections from a MongoDB database
    Mongodb {
        /// MongoDB connection URI
        #[arg(long, default_value = "mongodb://localhost:27017")]
        source_uri: String,

        /// MongoDB database name
        #[arg(long)]
        db: String,

        /// Target host
        #[arg(long, default_value = "localhost")]
        target_host: String,

        /// Target port
        #[arg(long, default_value_t = 6379)]
        target_port: u16,

        /// Target password
        #[arg(long, short = 'a')]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    };

    match run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Redis {
            source_host,
            source_port,
            target_host,
            target_port,
            password,
            pattern,
        } => {
            let source = RedisSourceConfig {
                host: source_host,
                port: source_port,
                pattern,
            };
            let target = TargetConfig {
                host: target_host,
                port: target_port,
                password,
            };
            cmd_redis(&source, &target).await
        }
        Commands::Mongodb {
            source_uri,
            db,
            target_host,
            target_port,
            password,
        } => {
            let source = MongoSourceConfig {
                uri: source_uri,
                database: db,
            };
            let target = TargetConfig {
                host: target_host,
                port: target_port,
                password,
            };
            cmd_mongodb(&source, &target).await
        }
    }
}

// ── Redis ────────────────────────────────────────────────────────────

async fn cmd_redis(source: &RedisSourceConfig, target: &TargetConfig) -> anyhow::Result<()> {
    println!(
        "{} Migrating from Redis ({}) to target ({})...",
        "→".cyan().bold(),
        format!("{}:{}", source.host, source.port).yellow(),
        format!("{}:{}", target.host, target.port).yellow(),
    );
    println!();

    let mut run = MigrationRun::new(progress_options());
    let outcome = run
        .run_redis(source, target)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    print_report(&outcome, "keys");

    if !outcome.stats.keys_by_shape.is_empty() {
        println!("{}", "Keys by Type".bold().underline());
        let mut shapes: Vec<_> = outcome.stats.keys_by_shape.iter().collect();
        shapes.sort_by(|a, b| b.1.cmp(a.1));
        for (shape, count) in shapes {
            println!("  {:8} {}", shape.to_string(), count);
        }
        println!();
    }

    Ok(())
}

// ── MongoDB ──────────────────────────────────────────────────────────

async fn cmd_mongodb(source: &MongoSourceConfig, target: &TargetConfig) -> anyhow::Result<()> {
    println!(
        "{} Migrating from MongoDB ({}) to target ({})...",
        "→".cyan().bold(),
        source.database.yellow(),
        format!("{}:{}", target.host, target.port).yellow(),
    );
    println!();

    let mut run = MigrationRun::new(progress_options());
    let outcome = run
        .run_mongo(source, target)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    print_report(&outcome, "documents");

    if !outcome.collections.is_empty() {
        println!("{}", "Collections".bold().underline());
        for collection in &outcome.collections {
            println!(
                "  {} {} ({} documents)",
                "·".dimmed(),
                collection.name,
                collection.documents
            );
        }
        println!();
    }

    if let Some(first) = outcome.collections.first() {
        println!("{}", "Query Examples".bold().underline());
        println!("  {}", format!("HGETALL {}:<id>", first.name).cyan());
        println!("  {}", format!("SMEMBERS _index:{}", first.name).cyan());
        println!();
    }

    Ok(())
}

// ── Shared output ────────────────────────────────────────────────────

fn progress_options() -> RunOptions {
    RunOptions {
        progress: Some(Box::new(|attempted, total, pct| {
            println!("  Progress: {}/{} ({:.1}%)", attempted, total, pct);
        })),
    }
}

fn print_report(outcome: &RunOutcome, unit_noun: &str) {
    println!();
    if outcome.stats.errors.is_empty() {
        println!("{}", "✓ Migration complete!".green().bold());
    } else {
        println!("{}", "✓ Migration complete, with errors.".yellow().bold());
    }
    println!();

    println!("{}", "Result Summary".bold().underline());
    println!("  Listed:    {} {}", outcome.total_listed, unit_noun);
    println!(
        "  Migrated:  {}/{} {}",
        outcome.stats.succeeded.to_string().bold(),
        outcome.stats.attempted,
        unit_noun
    );
    println!();

    if !outcome.stats.errors.is_empty() {
        println!("{}", "Errors".bold().underline());
        for err in &outcome.stats.errors {
            println!("  {} {}: {}", "✗".red(), err.unit.bold(), err.message);
        }
        println!();
    }
}
