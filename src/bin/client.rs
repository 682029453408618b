//! Veil Tunnel Client
//!
//! Runs a local SOCKS5 proxy and carries every CONNECT through its own
//! encrypted, obfuscated connection to the tunnel server.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use veil_tunnel::{
    config::{generate_example_config, Config},
    crypto::generate_psk,
    proxy::Socks5Server,
    stats::{spawn_stats_logger, Stats},
    tunnel::{StreamOpener, TunnelDialer},
};

/// Veil Tunnel Client - SOCKS5 ingress for an encrypted tunnel
#[derive(Parser, Debug)]
#[command(name = "veil-client")]
#[command(about = "Veil Tunnel Client - SOCKS5 ingress for an encrypted, obfuscated tunnel")]
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

    /// Tunnel server address (overrides config)
    #[arg(short, long)]
    server: Option<String>,

    /// Local SOCKS5 proxy address (overrides config)
    #[arg(long)]
    socks5: Option<String>,

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
        return print_psk();
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
    init_logging(&level, &config.logging.format);

    config.validate().context("Invalid configuration")?;

    let client_config = config
        .client
        .clone()
        .ok_or_else(|| anyhow!("No [client] section in config file"))?;

    let server_addr = args.server.unwrap_or(client_config.server);
    let socks_addr = args.socks5.unwrap_or(client_config.socks5_listen);

    let tunables = config.resolved_tunables();
    let settings = config
        .tunnel_settings(&tunables)
        .context("Failed to set up tunnel encryption")?;

    info!("Veil Tunnel Client v{}", veil_tunnel::VERSION);
    info!(
        "Profile {}: frame {} bytes, keepalive {}s, obfuscation {}, compression {:?}",
        config.profile,
        tunables.frame_size,
        tunables.tcp_keepalive_secs,
        if settings.obfuscation.enabled { "on" } else { "off" },
        settings.compression
    );

    let transport = Config::transport(&tunables, client_config.connect_timeout);
    let dialer = TunnelDialer::new(server_addr, transport, settings);
    info!("Tunnel server: {}", dialer.server_addr());
    let dialer: Arc<dyn StreamOpener> = Arc::new(dialer);

    let socks = Socks5Server::bind(&socks_addr)
        .await
        .context("Failed to bind SOCKS5 listener")?
        .with_handshake_timeout(Duration::from_secs(client_config.handshake_timeout));

    if config.logging.stats_interval > 0 {
        spawn_stats_logger(Duration::from_secs(config.logging.stats_interval));
    }

    socks
        .serve(dialer, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("SOCKS5 server failed")?;

    Stats::global().log();
    Ok(())
}

fn init_logging(level: &str, format: &str) {
    let builder = tracing_subscriber::fmt().with_env_filter(level);
    if format == "compact" {
        builder.compact().init();
    } else {
        builder.init();
    }
}

/// Generate and print a new pre-shared key
fn print_psk() -> Result<()> {
    let psk = generate_psk()?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Veil Tunnel Pre-Shared Key Generated            ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║ {}  ║", psk);
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Add the same key to both client and server config.toml:");
    println!("  psk = \"{}\"", psk);

    Ok(())
}
