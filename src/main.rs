//! authgate
//!
//! Access-control decision service for reverse-proxy authentication gateways.

use authgate::{
    access_control::{Level, Resource, Subject},
    config::{AppConfig, LogFormat, load_config},
    gate::{AccessGate, AccessRequest},
    server::{ApiState, HttpConfig, run_server},
};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// authgate - decide who may reach what behind your reverse proxy
#[derive(Parser, Debug)]
#[command(name = "authgate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "AUTHGATE_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error), overrides logging.level
    #[arg(long, env = "AUTHGATE_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP decision API (default)
    Serve {
        /// HTTP server host, overrides server.host
        #[arg(long, env = "AUTHGATE_HTTP_HOST")]
        host: Option<String>,

        /// HTTP server port, overrides server.port
        #[arg(long, env = "AUTHGATE_HTTP_PORT")]
        port: Option<u16>,
    },

    /// Decide a single request and exit with 0 (allowed) or 1 (denied)
    Check {
        /// Original URL of the request
        #[arg(long, conflicts_with = "domain")]
        url: Option<String>,

        /// Requested domain
        #[arg(long, required_unless_present = "url")]
        domain: Option<String>,

        /// Requested path
        #[arg(long, default_value = "/")]
        path: String,

        /// User name
        #[arg(long, default_value = "")]
        user: String,

        /// Group of the user, may be repeated
        #[arg(long = "group")]
        groups: Vec<String>,

        /// Authentication level (not_authenticated, first_factor, second_factor)
        #[arg(long, default_value = "not_authenticated", value_parser = parse_level)]
        level: Level,

        /// Source address of the request
        #[arg(long)]
        ip: Option<IpAddr>,
    },

    /// Load and compile the configuration, then exit
    Validate,
}

fn parse_level(s: &str) -> Result<Level, String> {
    Level::try_parse(s).ok_or_else(|| {
        format!(
            "unknown level '{}', expected not_authenticated, first_factor or second_factor",
            s
        )
    })
}

fn init_logging(config: &AppConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Reload the configuration on SIGHUP
#[cfg(unix)]
fn spawn_reload_on_hangup(state: ApiState) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGHUP");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            info!("Received SIGHUP, reloading configuration");
            match load_config(state.config_path.as_deref())
                .and_then(|config| state.gate.reload(&config))
            {
                Ok(()) => state.metrics.record_reload(),
                Err(e) => error!(error = %e, "Configuration reload failed"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_state: ApiState) {}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration before logging so its format applies
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(&AppConfig::default(), args.log_level.as_deref());
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    init_logging(&config, args.log_level.as_deref());

    // Compile policies
    let gate = Arc::new(
        AccessGate::from_config(&config)
            .inspect_err(|e| error!(error = %e, "Failed to compile access control"))?,
    );

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            info!(
                version = env!("CARGO_PKG_VERSION"),
                "Starting authgate decision API"
            );

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let http_config = HttpConfig::from_host_port(&host, port)?;

            let state = ApiState::new(gate, args.config.clone());
            spawn_reload_on_hangup(state.clone());
            run_server(http_config, state).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            url,
            domain,
            path,
            user,
            groups,
            level,
            ip,
        } => {
            let resource = match (url, domain) {
                (Some(url), _) => Resource::from_url(&url)
                    .ok_or_else(|| anyhow::anyhow!("cannot extract a domain from '{}'", url))?,
                (None, Some(domain)) => Resource::new(domain, path),
                (None, None) => anyhow::bail!("either --url or --domain is required"),
            };

            let mut request = AccessRequest::new(resource, Subject::new(user, groups, level));
            request.client_ip = ip;

            let outcome = gate.evaluate(&request);
            println!("{}", serde_json::to_string(&outcome)?);

            Ok(if outcome.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Command::Validate => {
            let state = gate.snapshot();
            info!(
                access_control_rules = state.access_control().map_or(0, |p| p.rule_count()),
                network_access_control_rules =
                    state.network_access_control().map_or(0, |p| p.rule_count()),
                recognized_rules = state.recognized_policy().map_or(0, |p| p.rule_count()),
                network_bindings = state.recognizer().len(),
                "Configuration is valid"
            );
            println!("configuration is valid");
            Ok(ExitCode::SUCCESS)
        }
    }
}
