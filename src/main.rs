use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use zfs_report::collectors::PoolStatusCollector;
use zfs_report::config::{Config, OutputFormat};
use zfs_report::error::ConfigError;
use zfs_report::reporting::{
    publish, JsonDump, NoSmartData, ReportFormatter, StdoutSender, TextDump,
};

/// Command-line arguments for the ZFS pool reporter
#[derive(Parser)]
#[command(
    name = "zfs-report",
    about = "Collect ZFS pool health, usage and scrub status",
    long_about = "Runs `zpool list` and `zpool status` for every pool, extracts usage, \
                  health, error counters and the last scrub result, and prints the \
                  collected records."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Print records as JSON
    #[arg(long, help = "Print the collected records as JSON")]
    json: bool,

    /// Override the zpool binary
    #[arg(long, value_name = "PATH", help = "Path to the zpool executable")]
    zpool: Option<String>,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Some(ref zpool) = self.zpool {
            if zpool.trim().is_empty() {
                return Err("--zpool must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Convert config path to string safely, handling non-UTF-8 paths
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        match &self.config {
            Some(path) => match path.to_str() {
                Some(path_str) => Ok(Some(path_str)),
                None => Err(format!(
                    "Configuration file path contains invalid UTF-8 characters: {}",
                    path.display()
                )),
            },
            None => Ok(None),
        }
    }

    /// Apply command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref zpool) = self.zpool {
            config.zpool.program = zpool.clone();
        }
        if self.json {
            config.output.format = OutputFormat::Json;
        }
    }
}

/// Load configuration from file or use defaults
///
/// A missing or unreadable file falls back to defaults with a warning. A file
/// that exists but is invalid is an error.
fn load_config(config_path: Option<&str>) -> Result<Config, ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            match Config::from_file(std::path::Path::new(path)) {
                Ok(config) => Ok(config),
                Err(ConfigError::ReadError(reason)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable ({}), using defaults",
                        path, reason
                    );
                    Ok(Config::default())
                }
                Err(e) => Err(e),
            }
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    cli.validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid arguments")?;

    let config_path = cli.config_path_str().map_err(anyhow::Error::msg)?;
    let mut config = load_config(config_path).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    let collector = PoolStatusCollector::new(config.zpool.clone());
    let pools = collector.run().context("Failed to collect pool status")?;

    let text = TextDump::new();
    let formatter: &dyn ReportFormatter = match config.output.format {
        OutputFormat::Text => &text,
        OutputFormat::Json => &JsonDump,
    };
    publish(&pools, &NoSmartData, formatter, &StdoutSender).context("Failed to publish report")?;

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting ZFS pool report");

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("ZFS pool report complete");
}
