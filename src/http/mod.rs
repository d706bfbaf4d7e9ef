//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum::serve, middleware)
//!     → request.rs (request ID)
//!     → Application stack (routing::Router)
//!     → mounted service routers
//!     → response, or 404 "Cannot <METHOD> <path>"
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{Application, HttpServer};
