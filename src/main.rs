//! Telemetry relay server
//!
//! Run with: telemetry-relay [--config FILE] [--bind ADDR] [--source IP]
//!
//! Examples:
//!   telemetry-relay                                  # binds to 0.0.0.0:8080, waits for /configure
//!   telemetry-relay --source 192.168.1.20            # streams from the console right away
//!   telemetry-relay --config relay.toml --bind 127.0.0.1:9000
//!
//! Then point a dashboard at ws://HOST:8080/ws, or set the console address with:
//!   curl -X POST http://HOST:8080/configure -d '{"ps5_ip": "192.168.1.20"}'

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use telemetry_relay::{ConfigFile, RelayServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(
    name = "telemetry-relay",
    version,
    about = "Relay console telemetry to WebSocket dashboards"
)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to (overrides the config file)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Console address to stream from at startup (overrides the config file)
    #[arg(short, long)]
    source: Option<String>,
}

fn load_config(args: &Args) -> telemetry_relay::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigFile::load(path)?.into_server_config()?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = args.bind {
        config = config.bind(bind);
    }
    if let Some(source) = &args.source {
        config = config.initial_source(source.as_str());
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let server = RelayServer::new(config);

    tracing::info!(
        bind = %server.bind_addr(),
        "Dashboards connect to ws://<host>:{}/ws",
        server.bind_addr().port()
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
