use anyhow::Result;
use clap::Parser;
use gold_api::{server::ApiServer, state::AppState};
use gold_config::ConfigManager;
use gold_core::ServerConfig;
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Gold price and market chat proxy", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory holding the dashboard page
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Plain HTTP port (overrides PORT)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(args.debug);

    info!("Starting Gold Monitor");

    let mut manager = ConfigManager::from_env()?;
    {
        let config = manager.get_config_mut();
        if let Some(static_dir) = args.static_dir {
            config.server.static_dir = static_dir;
        }
        if let Some(port) = args.port {
            config.server.http_port = Some(port);
        }
    }
    manager.validate()?;
    let config = manager.into_config();

    if let Some(tls) = &config.tls {
        warn!(
            key = %tls.key_file.display(),
            cert = %tls.cert_file.display(),
            "TLS files are configured but HTTPS is not served here; terminate TLS in front of this process"
        );
    }

    let addr = listen_addr(&config.server);
    info!(
        static_dir = %config.server.static_dir.display(),
        instrument = %config.exchange.instrument,
        model = %config.chat.model,
        "Configuration resolved"
    );

    let state = AppState::from_config(config)?;
    let server = ApiServer::new(state, addr);
    server.run_until(shutdown_signal()).await?;

    info!("Gold Monitor stopped");
    Ok(())
}

/// PORT wins when set. Otherwise the HTTPS port is reused for a plain HTTP
/// listener.
fn listen_addr(server: &ServerConfig) -> SocketAddr {
    let port = match server.http_port {
        Some(port) => port,
        None => {
            warn!(
                port = server.https_port,
                "PORT is not set; serving plain HTTP on the HTTPS port"
            );
            server.https_port
        }
    };
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        }
    }
}

fn init_logging(debug: bool) {
    let env_filter = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
