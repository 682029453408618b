//! Veil Tunnel Server
//!
//! Accepts tunnel connections, reads the requested target from each one and
//! relays it to that target over plain TCP.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::info;
use veil_tunnel::{
    config::{generate_example_config, Config},
    crypto::generate_psk,
    stats::{spawn_stats_logger, Stats},
    tunnel::TunnelServer,
};

/// Veil Tunnel Server - encrypted, obfuscated tunnel endpoint
#[derive(Parser, Debug)]
#[command(name = "veil-server")]
#[command(about = "Veil Tunnel Server - encrypted, obfuscated tunnel endpoint")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Print a new random pre-shared key and exit
    #[arg(long)]
    generate_psk: bool,

    /// Write an example configuration to this path and exit
    #[arg(long)]
    init_config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Performance profile (overrides config)
    #[arg(short, long)]
    profile: Option<String>,

    /// Log level (trace, debug, info, warn, error; overrides config)
    #[arg(short = 'v', long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.generate_psk {
        let psk = generate_psk()?;
        println!("psk = \"{}\"", psk);
        return Ok(());
    }

    if let Some(path) = &args.init_config {
        let mut config = generate_example_config();
        config.psk = generate_psk()?;
        config.save(path).context("Failed to write example config")?;
        println!("Example configuration written to {}", path);
        return Ok(());
    }

    let mut config = Config::load(&args.config).context("Failed to load configuration")?;
    if let Some(profile) = args.profile {
        config.profile = profile;
    }

    // Initialize logging
    let level = args.log_level.unwrap_or_else(|| config.logging.level.clone());
    let builder = tracing_subscriber::fmt().with_env_filter(&level);
    if config.logging.format == "compact" {
        builder.compact().init();
    } else {
        builder.init();
    }

    config.validate().context("Invalid configuration")?;

    let server_config = config
        .server
        .clone()
        .ok_or_else(|| anyhow!("No [server] section in config file"))?;

    let listen_addr = args.listen.unwrap_or(server_config.listen);

    let tunables = config.resolved_tunables();
    let settings = config
        .tunnel_settings(&tunables)
        .context("Failed to set up tunnel encryption")?;

    info!("Veil Tunnel Server v{}", veil_tunnel::VERSION);
    info!(
        "Profile {}: frame {} bytes, keepalive {}s, obfuscation {}, compression {:?}",
        config.profile,
        tunables.frame_size,
        tunables.tcp_keepalive_secs,
        if settings.obfuscation.enabled { "on" } else { "off" },
        settings.compression
    );

    let transport = Config::transport(&tunables, server_config.connect_timeout);
    let server = TunnelServer::bind(
        &listen_addr,
        transport,
        settings,
        server_config.max_connections,
    )
    .await
    .context("Failed to bind to address")?;

    if config.logging.stats_interval > 0 {
        spawn_stats_logger(Duration::from_secs(config.logging.stats_interval));
    }

    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Tunnel server failed")?;

    Stats::global().log();
    Ok(())
}
