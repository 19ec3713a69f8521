//! # doclabel CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `doclabel init` | Create the SQLite database and schema |
//! | `doclabel add --filename <path> --label <text>` | Track a file under a label |
//! | `doclabel remove --filename <path> [--label <text>]` | Not implemented yet |
//! | `doclabel train` | Fit the vectoriser and one model per label |
//! | `doclabel predict --filename <path>` | Suggest labels for a file |
//! | `doclabel explain --label <text>` | Show the phrases that predict a label |
//! | `doclabel stats` | Summarise the corpus and trained models |

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use doclabel::progress::ProgressMode;
use doclabel::{add, config, db, explain, predict, stats, train};

/// doclabel — tag files with labels, train per-label classifiers, and
/// predict labels for new files.
#[derive(Parser)]
#[command(
    name = "doclabel",
    about = "Tag files with labels, train per-label classifiers, and predict labels for new files",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `~/.config/doclabel/doclabel.toml`; built-in defaults are
    /// used when that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file. Overrides `[db].path` from the config file.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema. Safe to run more than once.
    Init,

    /// Add a file to the corpus under a label.
    Add {
        /// What file to add.
        #[arg(long)]
        filename: PathBuf,
        /// What label to give the file.
        #[arg(long)]
        label: String,
    },

    /// Remove a file / label from the corpus (not implemented yet).
    Remove {
        #[arg(long)]
        filename: PathBuf,
        #[arg(long)]
        label: Option<String>,
    },

    /// Retrain the vectoriser and every label's model.
    Train {
        /// Progress output on stderr. Defaults to `human` on a terminal, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Explain which phrases predict a label.
    Explain {
        /// Which label to explain.
        #[arg(long)]
        label: String,
        /// How many phrases to show, strongest first.
        #[arg(long)]
        display_count: Option<usize>,
    },

    /// Suggest the best label(s) for a file.
    Predict {
        /// The file to label.
        #[arg(long)]
        filename: PathBuf,
        /// Percentage confidence a label needs to be shown.
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Show corpus and model statistics.
    Stats,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Remove touches nothing, not even the database.
    if let Commands::Remove { filename, label } = &cli.command {
        return add::run_remove(filename, label.as_deref());
    }

    let cfg = config::resolve_config(cli.config.as_deref(), cli.database.as_deref())?;

    match cli.command {
        Commands::Init => {
            db::Session::open(&cfg).await?.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Add { filename, label } => {
            add::run_add(&cfg, &filename, &label).await?;
        }
        Commands::Remove { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
        Commands::Train { progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            train::run_train(&cfg, mode).await?;
        }
        Commands::Explain {
            label,
            display_count,
        } => {
            explain::run_explain(&cfg, &label, display_count).await?;
        }
        Commands::Predict {
            filename,
            threshold,
        } => {
            predict::run_predict(&cfg, &filename, threshold).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
