//! Namespace normalization.
//!
//! A namespace is a dotted logical name such as `"users.api"`. Depending on
//! how a service is mounted it becomes either a subdomain label sequence
//! (most specific component first) or a path prefix.
//!
//! # Rules
//! - Split on `.`
//! - Remove spaces from each component, drop components left empty
//! - Lower-case every component
//! - Subdomain: reverse, join with `.`
//! - Path component: keep order, join with `/`

use crate::config::schema::MountType;

/// Returned by [`normalize_named`] for a mode name it does not recognise.
pub const UNKNOWN_NAMESPACE: &str = "unknown";

/// Normalize `namespace` for the given mount mode.
pub fn normalize_namespace(namespace: &str, mode: MountType) -> String {
    let components = namespace
        .split('.')
        .map(|component| component.replace(' ', "").to_lowercase())
        .filter(|component| !component.is_empty());

    match mode {
        MountType::Subdomain => {
            let mut labels: Vec<String> = components.collect();
            labels.reverse();
            labels.join(".")
        }
        MountType::PathComponent => components.collect::<Vec<_>>().join("/"),
    }
}

/// Normalize with the mode given by name (`"Subdomain"`, `"PathComponent"`).
///
/// Unrecognised names produce [`UNKNOWN_NAMESPACE`].
pub fn normalize_named(namespace: &str, mode: &str) -> String {
    match mode.parse::<MountType>() {
        Ok(mode) => normalize_namespace(namespace, mode),
        Err(_) => UNKNOWN_NAMESPACE.to_string(),
    }
}
