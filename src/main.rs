//! OCHP service binary
//!
//! ```sh
//! # Run with default config (~/.config/ochp-service/config.toml)
//! ochp-service
//!
//! # Custom config path and port
//! ochp-service --config /etc/ochp-service/config.toml --port 8443
//!
//! # Validate config without starting
//! ochp-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use ochp::config::{default_config_path, AppConfig};
use ochp::server::{init_tracing, ServerHandle};

/// OCHP 1.4 clearing-house node with OCHPdirect session handling.
#[derive(Parser, Debug)]
#[command(
    name = "ochp-service",
    version,
    about = "OCHP 1.4 / OCHPdirect service for EV roaming",
    long_about = "SOAP endpoints for OCHP status, roaming authorisation and \
                  service endpoint exchange, plus OCHPdirect session control.\n\n\
                  Default config: ~/.config/ochp-service/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "OCHP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the HTTP listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(default_config_path);

    let loaded = AppConfig::load(&config_path);
    if cli.check {
        return match loaded {
            Ok(config) => {
                println!("✅ Configuration is valid");
                println!("   Config file : {}", config_path.display());
                println!("   Address     : {}", config.address());
                println!("   Endpoints   : {}", config.endpoints.len());
                println!("   Log level   : {}", config.logging.level);
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                Err(e.into())
            }
        };
    }

    let mut config = match loaded {
        Ok(mut cfg) => {
            if let Some(ref level) = cli.log_level {
                cfg.logging.level = level.clone();
            }
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let mut cfg = AppConfig::default();
            if let Some(ref level) = cli.log_level {
                cfg.logging.level = level.clone();
            }
            init_tracing(&cfg);
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
            cfg
        }
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.port {
        info!("CLI override: port = {}", port);
        config.server.port = port;
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(config).await?;
    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");
    handle.wait().await;

    Ok(())
}
