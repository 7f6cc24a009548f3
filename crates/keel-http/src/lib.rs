//! HTTP front end for the keel routing service.
//!
//! Provides an [`HttpServer`] exposing a small JSON API over a shared
//! [`Balancer`]:
//!
//! - `GET /rep` — list the current replicas
//! - `POST /add` — spawn `n` servers (`{"n": 2, "hostnames": ["server-7"]}`)
//! - `DELETE /rm` — retire `n` servers, named hostnames first, then the highest-numbered
//! - `GET /route`, `GET /{*path}` — route a request and report the chosen server
//!
//! Successful responses are `{"message": ..., "status": "successful"}`;
//! failures are `{"message": "<error>", "status": "failure"}`.

mod error;
mod handlers;


use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use keel_router::Balancer;

pub use error::HttpError;

/// Shared application state for all handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    /// The routing service.
    pub balancer: Arc<Balancer>,
}

/// HTTP server backed by a [`Balancer`].
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server for the given balancer.
    pub fn new(balancer: Arc<Balancer>) -> Self {
        let router = Self::build_router(AppState { balancer });
        Self { router }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/rep", get(handlers::replicas))
            .route("/add", post(handlers::add))
            .route("/rm", delete(handlers::remove))
            .route("/route", get(handlers::route))
            .route("/{*path}", get(handlers::route))
            .with_state(state)
    }

    /// Return the inner [`Router`] (useful for testing with `tower::ServiceExt`).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API on the given TCP address.
    pub async fn serve(self, addr: &str) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, "http server listening");
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Serve the API with graceful shutdown triggered by the given future.
    pub async fn serve_with_shutdown(
        self,
        addr: &str,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, "http server listening");
        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
    }
}
