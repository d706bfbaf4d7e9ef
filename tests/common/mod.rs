//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::get;
use service_mount::config::ListenerConfig;
use service_mount::lifecycle::Shutdown;
use service_mount::{Application, HttpServer, Router};

/// Serve `app` on `addr` until the returned coordinator is triggered.
pub async fn start_app(addr: SocketAddr, app: Application) -> Shutdown {
    let shutdown = Shutdown::new();
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    let config = ListenerConfig {
        bind_address: addr.to_string(),
        request_timeout_secs: 5,
    };
    let server = HttpServer::new(app, config);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

/// A router answering `/` and `/hi` with `body`.
pub fn echo_router(body: &'static str) -> Router {
    let router = Router::new();
    router
        .route("/", get(move || async move { body }))
        .route("/hi", get(move || async move { body }));
    router
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
