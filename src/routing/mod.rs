//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → router.rs (walk the layer stack in order)
//!     → matcher.rs (host / path prefix / exact route)
//!     → handler, or nested Router with the prefix stripped
//!     → Return: Handled(response) or Unmatched(request)
//!
//! Service mount:
//!     namespace.rs normalizes the namespace
//!     → Router::mount_at_host / mount_at_path appends one layer
//!     → LayerId identifies that layer until it is removed
//! ```
//!
//! # Design Decisions
//! - Stacks are mutable at runtime (mount/unmount) but copy-on-write
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same layer
//! - First match wins (ordered by insertion)

pub mod matcher;
pub mod namespace;
pub mod router;

pub use namespace::{normalize_namespace, normalize_named, UNKNOWN_NAMESPACE};
pub use router::{Dispatch, Endpoint, Layer, LayerId, Router};
