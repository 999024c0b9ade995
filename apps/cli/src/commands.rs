//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use bookshelf_core::{DirectorySink, ProgressReporter, SyncConfig, SyncResult, sync_shelf};
use bookshelf_feed::{FeedClient, FeedClientOptions};
use bookshelf_shared::{
    AppConfig, FingerprintMode, NodeKind, SyncSettings, config_file_path, init_config, load_config,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Bookshelf: mirror a Goodreads shelf into local content records.
#[derive(Parser)]
#[command(
    name = "bookshelf",
    version,
    about = "Pull a Goodreads user's shelf through the paginated review feed and store one record per review.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch every page of a shelf and write one record per review.
    Sync {
        /// Goodreads user id (overrides `goodreads.user_id`).
        #[arg(short, long, env = "GOODREADS_USER_ID")]
        user: Option<String>,

        /// Shelf to pull, e.g. `read` or `all`.
        #[arg(short, long)]
        shelf: Option<String>,

        /// Output directory for records.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Record type to emit: shelf or book.
        #[arg(short, long)]
        kind: Option<NodeKind>,

        /// Fingerprint strategy: run-constant or content.
        #[arg(long)]
        fingerprint: Option<FingerprintMode>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bookshelf=info",
        1 => "bookshelf=debug",
        _ => "bookshelf=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so the sync summary on stdout stays clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sync {
            user,
            shelf,
            out,
            kind,
            fingerprint,
        } => {
            let overrides = SyncOverrides {
                user,
                shelf,
                out,
                kind,
                fingerprint,
            };
            cmd_sync(overrides).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
struct SyncOverrides {
    user: Option<String>,
    shelf: Option<String>,
    out: Option<PathBuf>,
    kind: Option<NodeKind>,
    fingerprint: Option<FingerprintMode>,
}

impl SyncOverrides {
    fn apply(self, mut settings: SyncSettings) -> SyncSettings {
        if let Some(user) = self.user {
            settings.user_id = Some(user).filter(|id| !id.trim().is_empty());
        }
        if let Some(shelf) = self.shelf {
            settings.shelf = shelf;
        }
        if let Some(out) = self.out {
            settings.output_dir = out;
        }
        if let Some(kind) = self.kind {
            settings.kind = kind;
        }
        if let Some(fingerprint) = self.fingerprint {
            settings.fingerprint = fingerprint;
        }
        settings
    }
}

async fn cmd_sync(overrides: SyncOverrides) -> Result<()> {
    let config = load_config()?;
    let settings = overrides.apply(SyncSettings::from(&config));

    if settings.user_id.is_none() {
        println!("No Goodreads user id configured; nothing to sync.");
        println!("Set `goodreads.user_id` in {} or pass --user.", config_file_path()?.display());
        return Ok(());
    }

    let client = FeedClient::new(&FeedClientOptions::from(&settings))?;
    let mut sink = DirectorySink::create(&settings.output_dir)?;
    let sync_config = SyncConfig::from(&settings);

    info!(
        shelf = %settings.shelf,
        kind = %settings.kind,
        out = %settings.output_dir.display(),
        "syncing Goodreads shelf"
    );

    let reporter = CliProgress::new();
    let result = match sync_shelf(&sync_config, &client, &mut sink, &reporter).await {
        Ok(result) => result,
        Err(e) => {
            reporter.spinner.abandon();
            return Err(e.into());
        }
    };

    // Print summary
    println!();
    println!("  Shelf synced successfully!");
    println!("  Shelf:   {}", settings.shelf);
    println!("  Kind:    {}", settings.kind);
    println!("  Pages:   {}", result.pages_fetched);
    println!("  Records: {}", result.nodes_committed);
    println!("  Path:    {}", sink.root().display());
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, page: u32, reported_end: u64, reported_total: u64) {
        self.spinner.set_message(format!(
            "Page {page}: {reported_end}/{reported_total} reviews"
        ));
    }

    fn node_committed(&self, id: &str, committed: usize) {
        self.spinner
            .set_message(format!("Stored [{committed}] review {id}"));
    }

    fn done(&self, _result: &SyncResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
