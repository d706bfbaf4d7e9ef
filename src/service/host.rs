//! Host capability.
//!
//! Anything with a routing surface can receive mounted services: the root
//! [`Application`](crate::http::Application) and every
//! [`MountableService`](crate::service::MountableService).

use std::fmt;
use std::sync::Arc;

use crate::routing::{Layer, LayerId, Router};

/// What kind of host a service is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKind {
    Application,
    Service { namespace: String },
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKind::Application => f.write_str("application"),
            HostKind::Service { namespace } => write!(f, "service `{}`", namespace),
        }
    }
}

/// A routing surface services can be attached to.
pub trait Host {
    /// The router that receives attached services.
    fn surface(&self) -> &Router;

    fn kind(&self) -> HostKind;

    /// Attach `router` behind the virtual host `host_match`.
    fn attach_at_subdomain(&self, host_match: &str, router: &Router) -> LayerId {
        self.surface().mount_at_host(host_match, router)
    }

    /// Attach `router` under the path `prefix`.
    fn attach_at_path(&self, prefix: &str, router: &Router) -> LayerId {
        self.surface().mount_at_path(prefix, router)
    }

    /// Remove a previously attached layer.
    fn remove_attached(&self, id: LayerId) -> Option<Arc<Layer>> {
        self.surface().remove(id)
    }
}

/// Where a mounted service lives.
#[derive(Debug, Clone)]
pub struct MountLocation {
    kind: HostKind,
    surface: Router,
}

impl MountLocation {
    pub(crate) fn of(host: &dyn Host) -> Self {
        Self {
            kind: host.kind(),
            surface: host.surface().clone(),
        }
    }

    pub fn kind(&self) -> &HostKind {
        &self.kind
    }

    /// The host's routing surface.
    pub fn surface(&self) -> &Router {
        &self.surface
    }

    /// True if this location is `host`'s routing surface.
    pub fn is(&self, host: &dyn Host) -> bool {
        self.surface.ptr_eq(host.surface())
    }
}

impl Host for MountLocation {
    fn surface(&self) -> &Router {
        &self.surface
    }

    fn kind(&self) -> HostKind {
        self.kind.clone()
    }
}

/// A detached host view of a service: its namespace and router handle.
///
/// Lets one service host another while the host service itself is borrowed
/// elsewhere (e.g. stored in a collection being mutated).
#[derive(Debug, Clone)]
pub struct ServiceHost {
    namespace: String,
    router: Router,
}

impl ServiceHost {
    pub(crate) fn new(namespace: String, router: Router) -> Self {
        Self { namespace, router }
    }
}

impl Host for ServiceHost {
    fn surface(&self) -> &Router {
        &self.router
    }

    fn kind(&self) -> HostKind {
        HostKind::Service {
            namespace: self.namespace.clone(),
        }
    }
}
