//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use insightmatch_core::{Aggregator, ProgressReporter, resolve_identity};
use insightmatch_registry::RegistryClient;
use insightmatch_shared::{
    AggregationConfig, AggregationResult, AppConfig, MatchStrategy, RegistryConfig, SourceKind,
    SourceState, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// InsightMatch: public data about a company, from its homepage URL.
#[derive(Parser)]
#[command(
    name = "insightmatch",
    version,
    about = "Aggregate registry filings, news, homepage and social data for a company.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.insightmatch/insightmatch.toml.
    #[arg(long, global = true, env = "INSIGHTMATCH_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Aggregate public data for a company homepage and print it as JSON.
    Aggregate {
        /// Company homepage URL.
        url: String,

        /// Company name (defaults to one derived from the URL).
        #[arg(short, long)]
        name: Option<String>,

        /// Print single-line JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Print the company name derived from a homepage URL.
    Identify {
        /// Company homepage URL.
        url: String,
    },

    /// Registry index operations.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Registry subcommands.
#[derive(Subcommand)]
pub(crate) enum RegistryAction {
    /// Resolve a company name against the registry index.
    Lookup {
        /// Company name to resolve.
        name: String,

        /// Candidate selection: first-match or best-score.
        #[arg(long)]
        strategy: Option<MatchStrategy>,
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
///
/// Logs go to stderr so stdout stays clean JSON.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "insightmatch=info",
        1 => "insightmatch=debug",
        _ => "insightmatch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let config_path = cli.config;
    match cli.command {
        Command::Aggregate { url, name, compact } => {
            let config = app_config(config_path.as_ref())?;
            cmd_aggregate(&config, &url, name.as_deref(), compact).await
        }
        Command::Identify { url } => cmd_identify(&url),
        Command::Registry { action } => match action {
            RegistryAction::Lookup { name, strategy } => {
                let config = app_config(config_path.as_ref())?;
                cmd_registry_lookup(&config, &name, strategy).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_ref()),
        },
    }
}

/// Load config from `--config` if given, else the default location.
fn app_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_aggregate(
    config: &AppConfig,
    url: &str,
    name: Option<&str>,
    compact: bool,
) -> Result<()> {
    let aggregation = AggregationConfig::from(config);
    if aggregation.registry.api_key.is_none() {
        info!(
            env = %config.registry.api_key_env,
            "registry API key not set, filings will be sample data"
        );
    }

    let aggregator = Aggregator::new(&aggregation)?;
    info!(url, name = name.unwrap_or("-"), "aggregating public data");

    let reporter = CliProgress::new();
    let result = aggregator.aggregate_with_progress(url, name, &reporter).await;

    let json = if compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{json}");

    match result.error_detail {
        Some(detail) => Err(eyre!("aggregation failed: {detail}")),
        None => Ok(()),
    }
}

fn cmd_identify(url: &str) -> Result<()> {
    println!("{}", resolve_identity(url));
    Ok(())
}

async fn cmd_registry_lookup(
    config: &AppConfig,
    name: &str,
    strategy: Option<MatchStrategy>,
) -> Result<()> {
    let mut registry = RegistryConfig::from(config);
    if registry.api_key.is_none() {
        return Err(eyre!(
            "registry lookup needs an API key: set {}",
            config.registry.api_key_env
        ));
    }
    if let Some(strategy) = strategy {
        registry.match_strategy = strategy;
    }

    let client = RegistryClient::new(registry)?;
    let spinner = spinner("Loading registry index");
    let entry = client.try_resolve(name).await;
    spinner.finish_and_clear();

    let entry = entry?;
    println!("  Name:  {}", entry.legal_name);
    println!("  ID:    {}", entry.registry_id);
    if let Some(stock_code) = &entry.stock_code {
        println!("  Stock: {stock_code}");
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&PathBuf>) -> Result<()> {
    let config = app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: spinner("Starting"),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_finished(&self, source: SourceKind, state: SourceState) {
        let marker = match state {
            SourceState::Fresh => "live",
            SourceState::Degraded => "sample",
        };
        self.spinner
            .println(format!("  {:<8} {marker}", source.as_str()));
    }

    fn done(&self, _result: &AggregationResult) {
        self.spinner.finish_and_clear();
    }
}
