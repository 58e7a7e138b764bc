//! Segmentd CLI - motion-rig segment control daemon.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use segmentd::config::{init_logging, Config};
use segmentd::error::Result;
use segmentd::protocol::dispatch::Dispatcher;
use segmentd::state::SharedState;
use segmentd::telemetry::Telemetry;
use segmentd::transport::{PeerRegistry, SocketConfig, TcpCommandServer, UdpCommandServer};
use segmentd::{util, VERSION};

#[derive(Parser)]
#[command(name = "segmentd", version, about = "Motion-rig segment control daemon")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured segment id (0-8).
    #[arg(long)]
    segment_id: Option<u8>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Disable colored log output.
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (default).
    Run,
    /// Print an example configuration.
    Config {
        /// Write to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config if specified
    let mut config = if let Some(ref path) = cli.config {
        Config::load(path)?
    } else if Config::default_path().exists() {
        Config::load(Config::default_path())?
    } else {
        Config::default()
    };

    config.logging.level = cli.log_level.clone();
    config.logging.color = !cli.no_color;

    if let Some(id) = cli.segment_id {
        config.segment.id = id;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_logging(&config.logging)?;
            config.validate()?;
            run(config).await
        }
        Commands::Config { output } => print_example_config(output.as_deref()),
    }
}

/// Run the daemon until Ctrl+C.
async fn run(config: Config) -> Result<()> {
    info!(version = VERSION, segment_id = config.segment.id, "segmentd starting");

    if config.segment.id == 0 {
        warn!("segment id is 0 (unconfigured); targeted commands will only match broadcast");
    }

    match util::local_ip_address() {
        Ok(addr) => info!(%addr, "network ready"),
        Err(e) => warn!("network not ready yet: {e}"),
    }

    let state = SharedState::new(config.segment.id);
    let dispatcher = Dispatcher::new(state.clone());
    let peers = PeerRegistry::new();

    let socket_config = SocketConfig {
        send_buffer_size: config.network.send_buffer_size,
        recv_buffer_size: config.network.recv_buffer_size,
        ..SocketConfig::default()
    };

    let tcp_addr = SocketAddr::new(config.network.bind_addr, config.network.tcp_port);
    let udp_addr = SocketAddr::new(config.network.bind_addr, config.network.udp_port);

    let tcp = Arc::new(TcpCommandServer::bind(
        tcp_addr,
        &socket_config,
        dispatcher.clone(),
        peers.clone(),
    )?);
    let udp = Arc::new(UdpCommandServer::bind(
        udp_addr,
        &socket_config,
        dispatcher,
        peers,
    )?);

    // Server loops run for the process lifetime; no join on shutdown.
    tokio::spawn(Arc::clone(&tcp).run());
    tokio::spawn(Arc::clone(&udp).run());

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    let telemetry = Telemetry::with_stubs(state.clone());
    let telemetry_config = config.telemetry.clone();
    let telemetry_shutdown = shutdown_tx.subscribe();
    let udp_link = Arc::clone(&udp);
    let tcp_link = Arc::clone(&tcp);
    let telemetry_task = tokio::spawn(async move {
        telemetry
            .run(udp_link, tcp_link, &telemetry_config, telemetry_shutdown)
            .await;
    });

    tokio::spawn(async move {
        let _ = signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    info!("segment controller running; Ctrl+C to stop");

    let mut heartbeat = tokio::time::interval(Duration::from_secs(30));
    heartbeat.tick().await; // First tick fires immediately; skip it.

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                info!(
                    uptime = %util::format_uptime(state.uptime_ms()),
                    mode = %state.mode(),
                    errors = state.error_count(),
                    "heartbeat"
                );
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    info!("shutting down");
    let _ = telemetry_task.await;
    info!("segmentd stopped");

    Ok(())
}

/// Print or write the example configuration.
fn print_example_config(output: Option<&std::path::Path>) -> Result<()> {
    let config = Config::example();

    if let Some(path) = output {
        config.save(path)?;
        println!("Configuration written to {}", path.display());
    } else {
        let rendered = toml::to_string_pretty(&config)
            .map_err(|e| segmentd::Error::Config(format!("Failed to serialize config: {e}")))?;
        println!("{rendered}");
    }

    Ok(())
}
