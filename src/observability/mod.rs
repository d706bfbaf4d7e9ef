//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! service mount/unmount, startup, server
//!     → tracing events with structured fields (namespace, layer_id, ...)
//!     → logging.rs subscriber (stdout)
//! tower-http TraceLayer
//!     → one span per request, tagged with x-request-id
//! ```

pub mod logging;

pub use logging::init_logging;
