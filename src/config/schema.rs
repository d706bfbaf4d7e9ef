//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the host application
//! and the services mounted into it.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root configuration for the host application.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, timeouts).
    pub listener: ListenerConfig,

    /// Services to mount at startup, in mount order.
    pub services: Vec<ServiceConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            services: vec![
                ServiceConfig::new("test", "localhost").with_mount_type(MountType::PathComponent),
            ],
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:1337").
    pub bind_address: String,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:1337".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "service_mount=debug,tower_http=debug".to_string(),
        }
    }
}

/// How a service attaches to its host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MountType {
    /// Virtual host dispatch: `<reversed namespace>.<hostname>`.
    #[default]
    Subdomain,
    /// Path prefix: `/<namespace/as/path>`.
    PathComponent,
}

impl MountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MountType::Subdomain => "Subdomain",
            MountType::PathComponent => "PathComponent",
        }
    }
}

impl fmt::Display for MountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a mount type name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMountType(pub String);

impl fmt::Display for UnknownMountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mount type `{}`", self.0)
    }
}

impl std::error::Error for UnknownMountType {}

impl FromStr for MountType {
    type Err = UnknownMountType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("subdomain") {
            Ok(MountType::Subdomain)
        } else if s.eq_ignore_ascii_case("pathcomponent") {
            Ok(MountType::PathComponent)
        } else {
            Err(UnknownMountType(s.to_string()))
        }
    }
}

/// Construction options for a mountable service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Dotted logical name, e.g. `"users.api"`.
    pub namespace: String,

    /// Hostname the subdomain is prepended to. Must be a valid hostname.
    pub hostname: String,

    /// Mount mode (default: Subdomain).
    #[serde(default)]
    pub mount_type: MountType,

    /// Namespace of another configured service to mount onto.
    /// `None` mounts onto the application.
    #[serde(default)]
    pub parent: Option<String>,
}

impl ServiceConfig {
    pub fn new(namespace: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            hostname: hostname.into(),
            mount_type: MountType::default(),
            parent: None,
        }
    }

    pub fn with_mount_type(mut self, mount_type: MountType) -> Self {
        self.mount_type = mount_type;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}
