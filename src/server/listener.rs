//! Relay server listener
//!
//! Binds the HTTP listener, applies the startup source, and serves the router
//! until shut down.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::registry::TelemetryHub;
use crate::server::config::ServerConfig;
use crate::server::handler::build_router;
use crate::session::{SessionFactory, UdpSessionFactory};

/// Telemetry relay server
pub struct RelayServer {
    config: ServerConfig,
    hub: Arc<TelemetryHub>,
}

impl RelayServer {
    /// Create a server whose sessions use the UDP heartbeat protocol
    pub fn new(config: ServerConfig) -> Self {
        let factory = UdpSessionFactory::new(config.source.clone());
        Self::with_factory(config, factory)
    }

    /// Create a server with a custom session factory
    pub fn with_factory(config: ServerConfig, factory: impl SessionFactory) -> Self {
        let hub = TelemetryHub::with_config(factory, config.hub.clone());

        Self {
            config,
            hub: Arc::new(hub),
        }
    }

    /// Get a reference to the hub
    pub fn hub(&self) -> &Arc<TelemetryHub> {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        self.apply_initial_source().await;

        tracing::info!(addr = %local_addr, "Telemetry relay listening");

        let app = build_router(Arc::clone(&self.hub));
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
        })
        .await;

        // Stop the session and release subscribers on every exit path
        self.hub.shutdown().await;

        result.map_err(Into::into)
    }

    async fn apply_initial_source(&self) {
        let Some(source) = self.config.initial_source.clone() else {
            return;
        };

        if let Err(e) = self.hub.configure(source.as_str()).await {
            tracing::warn!(source = %source, error = %e, "Startup source rejected");
        }
    }
}
