//! Service composition subsystem.
//!
//! # Data Flow
//! ```text
//! ServiceConfig + Router
//!     → mountable.rs (validate hostname, Unmounted)
//!     → mount(host): host.rs attaches the router at
//!         "<reversed namespace>.<hostname>"  (Subdomain)
//!         "/<namespace/as/path>"            (PathComponent)
//!     → unmount(): the recorded layer is filtered out of the host stack
//! ```

pub mod error;
pub mod events;
pub mod host;
pub mod mountable;

pub use error::ServiceError;
pub use events::{EventEmitter, ListenerId};
pub use host::{Host, HostKind, MountLocation, ServiceHost};
pub use mountable::MountableService;
