use anyhow::{Context, Result};
use blastshield_provider::config::{Config, ProviderConfig};
use blastshield_provider::dispatch::{self, DispatchPath, FallbackReason};
use blastshield_provider::resource::State;
use blastshield_provider::versions::{self, Registry};
use blastshield_provider::{Provider, VERSION};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Terraform provider for Blastshield
#[derive(Parser, Debug)]
#[command(name = "terraform-provider-blastshield", version = VERSION, about, long_about = None)]
struct Args {
    /// Run with debug logging enabled
    #[arg(long)]
    debug: bool,

    /// Log level (defaults to TF_LOG, then off)
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Write logs to this file instead of stderr (defaults to TF_LOG_PATH)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// API host URL (overrides BLASTSHIELD_HOST)
    #[arg(long)]
    host: Option<String>,

    /// API token (overrides BLASTSHIELD_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Persist --host/--token to the config file for later runs
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print provider, resource and data source schemas as JSON
    Schema,
    /// Print the compiled API versions and the one selected for this server
    Versions,
    /// Import an existing object and print its state
    Import {
        /// Resource type, e.g. blastshield_group
        type_name: String,
        id: String,
    },
    /// Read a data source and print its state
    Data {
        /// Data source type, e.g. blastshield_nodes
        type_name: String,
        /// Data source configuration as a JSON object
        #[arg(long, default_value = "{}")]
        config: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }

    /// Terraform's TF_LOG values (JSON is treated as TRACE)
    fn from_tf_log(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRACE" | "JSON" => Some(LogLevel::Trace),
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            "OFF" | "" => Some(LogLevel::Off),
            _ => None,
        }
    }
}

fn effective_log_level(args: &Args) -> LogLevel {
    if let Some(level) = args.log_level {
        return level;
    }
    if args.debug {
        return LogLevel::Debug;
    }
    std::env::var("TF_LOG")
        .ok()
        .and_then(|v| LogLevel::from_tf_log(&v))
        .unwrap_or(LogLevel::Off)
}

fn setup_logging(args: &Args) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(level) = effective_log_level(args).as_filter() else {
        return Ok(None);
    };

    let log_path = args
        .log_file
        .clone()
        .or_else(|| std::env::var_os("TF_LOG_PATH").map(PathBuf::from));

    let (non_blocking, guard) = match &log_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory {}", parent.display())
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let filter = EnvFilter::new(format!(
        "blastshield_provider={level},terraform_provider_blastshield={level}"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        "terraform-provider-blastshield {} started with log level: {}",
        VERSION,
        level
    );
    if let Some(path) = &log_path {
        tracing::info!("Log file: {:?}", path);
    }

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(&args)?;

    let explicit = Config::load().merge(Config {
        host: args.host.clone(),
        token: args.token.clone(),
    });
    if args.save_config {
        let path = explicit.save()?;
        tracing::info!("Saved configuration to {}", path.display());
    }
    let provider_config = ProviderConfig::resolve(&explicit);

    // Resources and data sources are enumerated before configure, so the
    // implementation has to be chosen up front
    let registry = Registry::new();
    versions::register_all(&registry)?;

    let credentials = provider_config.credentials();
    let selection = dispatch::detect_version(&registry, credentials.as_ref()).await?;

    let mut provider = Provider::new(VERSION, selection.implementation.clone());

    match args.command {
        Command::Schema => {
            print_json(&provider.schemas_json()?)?;
        }
        Command::Versions => {
            let (server_version, fallback) = match &selection.path {
                DispatchPath::Matched { server_version } => (Some(server_version.clone()), None),
                DispatchPath::Fallback(FallbackReason::NoCredentials) => {
                    (None, Some("no credentials".to_string()))
                }
                DispatchPath::Fallback(FallbackReason::DiscoveryFailed(reason)) => {
                    (None, Some(reason.clone()))
                }
            };
            print_json(&json!({
                "supported": registry.registered_versions(),
                "selected": selection.api_version,
                "server": server_version,
                "fallback": fallback,
            }))?;
        }
        Command::Import { type_name, id } => {
            provider.configure(&provider_config)?;
            let state = provider.import_state(&type_name, &id).await?;
            print_json(&Value::Object(state))?;
        }
        Command::Data { type_name, config } => {
            provider.configure(&provider_config)?;
            let config: State = serde_json::from_str(&config)
                .context("--config must be a JSON object")?;
            let state = provider.read_data_source(&type_name, &config).await?;
            print_json(&Value::Object(state))?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
