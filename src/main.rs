//! peerdiff: compare two builds of a package set and report what changed.

#![allow(clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use peerdiff::{
    cli::{self, exit_codes, InspectOptions},
    config::{self, CONFIG_FILE_NAMES},
    peers::FavorRelease,
    results::ReportFormat,
    Severity,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "peerdiff")]
#[command(version)]
#[command(
    about = "Correlate two builds of a package set and inspect what changed",
    long_about = None
)]
#[command(after_help = "EXIT CODES:
    0  No finding reached the threshold
    1  A finding reached the threshold
    3  Error occurred

EXAMPLES:
    # Compare two builds
    peerdiff inspect --before old.yaml --after new.yaml

    # Fail only on BAD findings, JSON report
    peerdiff inspect --before old.yaml --after new.yaml --threshold bad --format json

    # Single build checks only
    peerdiff inspect --after new.yaml")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output (also respects `NO_COLOR` env)
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `inspect` subcommand
#[derive(Parser)]
struct InspectArgs {
    /// Manifest of the build under inspection
    #[arg(long)]
    after: PathBuf,

    /// Manifest of the build to compare against
    #[arg(long)]
    before: Option<PathBuf>,

    /// Security rule file
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Lowest severity that fails the run
    #[arg(long, value_enum)]
    threshold: Option<Severity>,

    /// Which of several same-named packages is compared
    #[arg(long, value_enum)]
    favor_release: Option<FavorRelease>,

    /// Report format
    #[arg(short = 'f', long, value_enum)]
    format: Option<ReportFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Correlate two builds and run the enabled inspections
    Inspect(InspectArgs),

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print config file search paths and discovered config file
    Path,
    /// Generate an example .peerdiff.yaml in the current directory
    Init,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match dispatch(cli) {
        Ok(exit_codes::SUCCESS) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(exit_codes::ERROR);
        }
    }
}

fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Inspect(args) => cli::run_inspect(InspectOptions {
            after: args.after,
            before: args.before,
            config_file: cli.config,
            rules: args.rules,
            threshold: args.threshold,
            favor_release: args.favor_release,
            format: args.format,
            output_file: args.output,
            no_color: cli.no_color,
            quiet: cli.quiet,
        }),

        Commands::ConfigSchema { output } => {
            let schema = config::generate_json_schema();
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => println!("{schema}"),
            }
            Ok(exit_codes::SUCCESS)
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let (config, loaded_from) = config::load_or_default(cli.config.as_deref())
                    .context("failed to load configuration")?;
                if let Some(path) = &loaded_from {
                    eprintln!("# Loaded from: {}", path.display());
                } else {
                    eprintln!("# No config file found; showing defaults");
                }
                let yaml = serde_yaml::to_string(&config).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(exit_codes::SUCCESS)
            }
            ConfigAction::Path => {
                let search_paths = [
                    std::env::current_dir().ok(),
                    ::dirs::config_dir().map(|p| p.join("peerdiff")),
                ];
                eprintln!("Config file search paths (in order):");
                for path in search_paths.into_iter().flatten() {
                    eprintln!("  {}", path.display());
                }
                eprintln!();
                eprintln!("Recognized file names:");
                for name in CONFIG_FILE_NAMES {
                    eprintln!("  {name}");
                }
                eprintln!();
                match config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("Active config file: {}", path.display()),
                    None => eprintln!("No config file found."),
                }
                Ok(exit_codes::SUCCESS)
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(".peerdiff.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                std::fs::write(&target, config::generate_example_config())
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(exit_codes::SUCCESS)
            }
        },
    }
}
