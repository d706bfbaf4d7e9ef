//! Startup orchestration.
//!
//! # Responsibilities
//! - Build one service per configured entry
//! - Mount each service onto the application or onto its parent service
//! - Hand the assembled application back to the caller
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Services are constructed first, then mounted in config order, so a
//!   child may appear before its parent
//! - Listeners start last (traffic only when ready)

use std::collections::HashMap;

use axum::routing::get;
use thiserror::Error;

use crate::config::{AppConfig, ConfigError};
use crate::http::Application;
use crate::routing::Router;
use crate::service::{MountableService, ServiceError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("service `{namespace}`: {source}")]
    Service {
        namespace: String,
        #[source]
        source: ServiceError,
    },

    #[error("service `{namespace}` references unknown parent `{parent}`")]
    UnknownParent { namespace: String, parent: String },
}

/// The assembled application and the services mounted into it.
#[derive(Debug)]
pub struct Bootstrap {
    pub app: Application,
    pub services: Vec<MountableService>,
}

/// Router answering `/` and `/hi` with a fixed line naming the service.
pub fn demo_router(namespace: &str) -> Router {
    let body = format!("This is a {} service route.", namespace);
    let router = Router::new();
    let root_body = body.clone();
    router
        .route("/", get(move || async move { root_body }))
        .route("/hi", get(move || async move { body }));
    router
}

/// Build and mount every configured service.
pub fn bootstrap(config: &AppConfig) -> Result<Bootstrap, StartupError> {
    bootstrap_with(config, demo_router)
}

/// Like [`bootstrap`], with a caller-supplied router per service namespace.
pub fn bootstrap_with<F>(config: &AppConfig, mut make_router: F) -> Result<Bootstrap, StartupError>
where
    F: FnMut(&str) -> Router,
{
    let app = Application::new();

    let mut services = Vec::with_capacity(config.services.len());
    for service_config in &config.services {
        let router = make_router(&service_config.namespace);
        let service = MountableService::new(service_config.clone(), router).map_err(|source| {
            StartupError::Service {
                namespace: service_config.namespace.clone(),
                source,
            }
        })?;
        services.push(service);
    }

    let index: HashMap<String, usize> = services
        .iter()
        .enumerate()
        .map(|(i, service)| (service.namespace().to_string(), i))
        .collect();

    for (i, service_config) in config.services.iter().enumerate() {
        let result = match &service_config.parent {
            None => services[i].mount(&app),
            Some(parent) => {
                let parent_index = index.get(parent).copied().ok_or_else(|| {
                    StartupError::UnknownParent {
                        namespace: service_config.namespace.clone(),
                        parent: parent.clone(),
                    }
                })?;
                let host = services[parent_index].host_handle();
                services[i].mount(&host)
            }
        };

        result.map_err(|source| StartupError::Service {
            namespace: service_config.namespace.clone(),
            source,
        })?;

        tracing::info!(
            namespace = %service_config.namespace,
            mount_point = %services[i].mount_point(),
            parent = service_config.parent.as_deref().unwrap_or("<application>"),
            "Service ready"
        );
    }

    Ok(Bootstrap { app, services })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MountType, ServiceConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    async fn get_body(app: &Application, uri: &str, host: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .uri(uri)
            .header("Host", host)
            .body(Body::empty())
            .unwrap();
        let response = app.handle(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_default_bootstrap() {
        let boot = bootstrap(&AppConfig::default()).unwrap();
        assert_eq!(boot.services.len(), 1);
        assert!(boot.services[0].mounted());

        let (status, body) = get_body(&boot.app, "/test", "localhost").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "This is a test service route.");
    }

    #[tokio::test]
    async fn test_child_listed_before_parent() {
        let mut config = AppConfig::default();
        config.services = vec![
            ServiceConfig::new("v1", "localhost")
                .with_mount_type(MountType::PathComponent)
                .with_parent("users.api"),
            ServiceConfig::new("users.api", "localhost"),
        ];

        let boot = bootstrap(&config).unwrap();
        let (status, body) = get_body(&boot.app, "/v1/hi", "api.users.localhost").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "This is a v1 service route.");

        let (status, _) = get_body(&boot.app, "/v1/hi", "localhost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parent_cycle_fails() {
        let mut config = AppConfig::default();
        config.services = vec![
            ServiceConfig::new("a", "localhost").with_parent("b"),
            ServiceConfig::new("b", "localhost").with_parent("a"),
        ];

        let err = bootstrap(&config).unwrap_err();
        assert!(matches!(
            err,
            StartupError::Service { source: ServiceError::MountCycle { .. }, .. }
        ));
    }

    #[test]
    fn test_unknown_parent_fails() {
        let mut config = AppConfig::default();
        config.services = vec![ServiceConfig::new("a", "localhost").with_parent("nope")];
        assert!(matches!(
            bootstrap(&config),
            Err(StartupError::UnknownParent { .. })
        ));
    }
}
