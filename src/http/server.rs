//! HTTP server setup and the root application.
//!
//! # Responsibilities
//! - Own the root routing stack (`Application`) that services mount into
//! - Dispatch every request through that stack, 404 when nothing matches
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener, stop on the shutdown broadcast

use std::time::Duration;

use axum::{
    body::Body,
    extract::OriginalUri,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::routing::{Dispatch, Router};
use crate::service::host::{Host, HostKind};

/// The root host: an application-level routing stack.
#[derive(Debug, Clone, Default)]
pub struct Application {
    router: Router,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run a request through the application stack.
    pub async fn handle(&self, mut request: Request<Body>) -> Response {
        if request.extensions().get::<OriginalUri>().is_none() {
            let uri = request.uri().clone();
            request.extensions_mut().insert(OriginalUri(uri));
        }

        match self.router.dispatch(request).await {
            Dispatch::Handled(response) => response,
            Dispatch::Unmatched(request) => not_found(&request),
        }
    }

    /// Wrap the application as an axum router with the standard middleware.
    #[allow(deprecated)]
    pub fn into_axum_router(self, request_timeout: Duration) -> axum::Router {
        let app = self;
        axum::Router::new()
            .fallback(move |request: Request<Body>| {
                let app = app.clone();
                async move { app.handle(request).await }
            })
            .layer(TimeoutLayer::new(request_timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }
}

impl Host for Application {
    fn surface(&self) -> &Router {
        &self.router
    }

    fn kind(&self) -> HostKind {
        HostKind::Application
    }
}

fn not_found(request: &Request<Body>) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path())
        .unwrap_or_else(|| request.uri().path());

    tracing::debug!(
        request_id = %request.request_id(),
        method = %request.method(),
        path = %path,
        "No route matched"
    );

    (
        StatusCode::NOT_FOUND,
        format!("Cannot {} {}", request.method(), path),
    )
        .into_response()
}

/// HTTP server hosting an [`Application`].
pub struct HttpServer {
    app: Application,
    config: ListenerConfig,
}

impl HttpServer {
    pub fn new(app: Application, config: ListenerConfig) -> Self {
        Self { app, config }
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let router = self
            .app
            .into_axum_router(Duration::from_secs(self.config.request_timeout_secs));

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the listener config.
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn application(&self) -> &Application {
        &self.app
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MountType, ServiceConfig};
    use crate::service::MountableService;
    use axum::routing::get;
    use tower::ServiceExt;

    async fn read(response: Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_unmatched_is_404() {
        let app = Application::new();
        let (status, body) = read(app.handle(get_request("/test")).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Cannot GET /test");
    }

    #[tokio::test]
    async fn test_handlers_see_original_uri() {
        let router = Router::new();
        router.route(
            "/where",
            get(|OriginalUri(original): OriginalUri, uri: axum::http::Uri| async move {
                format!("{} {}", original.path(), uri.path())
            }),
        );
        let mut svc = MountableService::new(
            ServiceConfig::new("a.b", "localhost").with_mount_type(MountType::PathComponent),
            router,
        )
        .unwrap();

        let app = Application::new();
        svc.mount(&app).unwrap();
        assert!(svc.mount_location().unwrap().is(&app));
        assert_eq!(svc.mount_location().unwrap().kind(), &HostKind::Application);

        let (status, body) = read(app.handle(get_request("/a/b/where")).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "/a/b/where /where");
    }

    #[tokio::test]
    async fn test_axum_router_sets_request_id() {
        let app = Application::new();
        app.router().route("/", get(|| async { "root" }));

        let response = app
            .into_axum_router(Duration::from_secs(5))
            .oneshot(get_request("/"))
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "root");
    }
}
