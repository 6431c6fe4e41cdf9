use crate::{handlers, state::AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use gold_core::Result;
use std::{future::Future, net::SocketAddr};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Largest accepted request body. Chat requests carry up to 120 candles of
/// context, which stays well under this.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/price", get(handlers::get_price))
        .route("/api/history", get(handlers::get_history))
        .route("/api/chat", post(handlers::post_chat))
        // Static dashboard, SPA fallback and JSON 404s for unknown API paths
        .fallback(handlers::static_fallback)
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

pub struct ApiServer {
    app: Router,
    addr: SocketAddr,
}

impl ApiServer {
    pub fn new(state: AppState, addr: SocketAddr) -> Self {
        Self {
            app: router(state),
            addr,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then let in-flight requests finish.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("API server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server stopped");
        Ok(())
    }
}
