//! Flags shared by every binary, and tracing setup.

use std::path::PathBuf;

use fsexport_shared::{AppConfig, resolve_config};

/// Options accepted by all three tools.
#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file (defaults to ~/.fsexport/fsexport.toml).
    #[arg(long, env = "FSEXPORT_CONFIG")]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    /// Load the config named by `--config`, or the default one.
    pub fn load_config(&self) -> fsexport_shared::Result<AppConfig> {
        resolve_config(self.config.as_deref())
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Default filter directive for a `-v` count.
pub fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "fsexport=info",
        1 => "fsexport=debug",
        _ => "fsexport=trace",
    }
}

/// Initialize tracing based on CLI flags. `RUST_LOG` takes precedence.
///
/// Logs go to stderr so stdout stays reserved for command output.
pub fn init_tracing(args: &CommonArgs) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(args.verbose)));

    match args.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
