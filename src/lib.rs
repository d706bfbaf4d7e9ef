//! Service composition for axum applications.
//!
//! A [`MountableService`] bundles a namespace, a hostname and a routing
//! stack. It can be mounted into an [`Application`] (or into another
//! service) either behind a virtual host derived from its namespace or under
//! a path prefix, and unmounted again later without disturbing the rest of
//! the host's stack.
//!
//! ```text
//! namespace "users.api", hostname "example.com"
//!     Subdomain      → Host: api.users.example.com
//!     PathComponent  → /users/api/...
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod service;

pub use config::schema::{AppConfig, MountType, ServiceConfig};
pub use http::{Application, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{normalize_namespace, LayerId, Router};
pub use service::{Host, HostKind, MountLocation, MountableService, ServiceError};
