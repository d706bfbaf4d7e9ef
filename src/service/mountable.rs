//! Mountable services.
//!
//! # Lifecycle
//! ```text
//! new(config, router) ──▶ Unmounted ──mount(host)──▶ Mounted
//!                              ▲                        │
//!                              └────────unmount()───────┘
//! ```
//!
//! # Design Decisions
//! - Mounted state and mount location live in one `Option`, so they cannot
//!   disagree
//! - Both mount modes record the id of the layer they appended; unmount
//!   removes exactly that layer from the host's stack
//! - A service can host other services, which gives nested composition

use serde_json::Value;

use crate::config::schema::{MountType, ServiceConfig};
use crate::config::validation::validate_hostname;
use crate::routing::namespace::normalize_namespace;
use crate::routing::{LayerId, Router};
use crate::service::error::ServiceError;
use crate::service::events::{EventEmitter, ListenerId};
use crate::service::host::{Host, HostKind, MountLocation, ServiceHost};

#[derive(Debug, Clone)]
struct MountRecord {
    location: MountLocation,
    layer: LayerId,
}

/// A self-contained route group that can be mounted into a host.
#[derive(Debug)]
pub struct MountableService {
    namespace: String,
    hostname: String,
    router: Router,
    mount_type: MountType,
    mount: Option<MountRecord>,
    events: EventEmitter,
}

impl MountableService {
    /// Create an unmounted service. Fails if the hostname is not valid.
    pub fn new(config: ServiceConfig, router: Router) -> Result<Self, ServiceError> {
        validate_hostname(&config.hostname)?;

        Ok(Self {
            namespace: config.namespace,
            hostname: config.hostname,
            router,
            mount_type: config.mount_type,
            mount: None,
            events: EventEmitter::new(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn mount_type(&self) -> MountType {
        self.mount_type
    }

    pub fn mounted(&self) -> bool {
        self.mount.is_some()
    }

    pub fn mount_location(&self) -> Option<&MountLocation> {
        self.mount.as_ref().map(|record| &record.location)
    }

    /// Id of the layer this service occupies in its host's stack.
    pub fn mount_layer(&self) -> Option<LayerId> {
        self.mount.as_ref().map(|record| record.layer)
    }

    /// The virtual host or path prefix this service mounts at.
    pub fn mount_point(&self) -> String {
        let normalized = normalize_namespace(&self.namespace, self.mount_type);
        match self.mount_type {
            MountType::Subdomain if normalized.is_empty() => self.hostname.clone(),
            MountType::Subdomain => format!("{}.{}", normalized, self.hostname),
            MountType::PathComponent => format!("/{}", normalized),
        }
    }

    /// Attach this service's router to `host`.
    pub fn mount(&mut self, host: &dyn Host) -> Result<(), ServiceError> {
        if self.mounted() {
            return Err(ServiceError::AlreadyMounted {
                namespace: self.namespace.clone(),
            });
        }
        if self.router.reaches(host.surface()) {
            return Err(ServiceError::MountCycle {
                namespace: self.namespace.clone(),
            });
        }

        let mount_point = self.mount_point();
        let layer = match self.mount_type {
            MountType::Subdomain => host.attach_at_subdomain(&mount_point, &self.router),
            MountType::PathComponent => host.attach_at_path(&mount_point, &self.router),
        };

        let location = MountLocation::of(host);
        tracing::debug!(
            namespace = %self.namespace,
            mount_type = %self.mount_type,
            mount_point = %mount_point,
            host = %location.kind(),
            layer_id = %layer,
            "Service mounted"
        );

        self.mount = Some(MountRecord { location, layer });
        Ok(())
    }

    /// Detach this service from its host.
    pub fn unmount(&mut self) -> Result<(), ServiceError> {
        let record = self.mount.take().ok_or_else(|| ServiceError::NotMounted {
            namespace: self.namespace.clone(),
        })?;

        match record.location.remove_attached(record.layer) {
            Some(_) => tracing::debug!(
                namespace = %self.namespace,
                host = %record.location.kind(),
                layer_id = %record.layer,
                "Service unmounted"
            ),
            None => tracing::warn!(
                namespace = %self.namespace,
                host = %record.location.kind(),
                layer_id = %record.layer,
                "Mount layer already gone from host stack; marking service unmounted"
            ),
        }
        Ok(())
    }

    /// A host view of this service for mounting other services onto it.
    pub fn host_handle(&self) -> ServiceHost {
        ServiceHost::new(self.namespace.clone(), self.router.clone())
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventEmitter {
        &mut self.events
    }

    /// Shorthand for `events_mut().on(..)`.
    pub fn on<F>(&mut self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.events.on(event, listener)
    }

    /// Shorthand for `events().emit(..)`.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        self.events.emit(event, payload)
    }
}

impl Host for MountableService {
    fn surface(&self) -> &Router {
        &self.router
    }

    fn kind(&self) -> HostKind {
        HostKind::Service {
            namespace: self.namespace.clone(),
        }
    }
}
