//! Configuration validation.
//!
//! # Responsibilities
//! - Hostname syntax checks (shared with service construction)
//! - Referential integrity (parents reference configured services)
//! - Detect duplicate namespaces
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::AppConfig;

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid hostname `{hostname}`: {reason}")]
    InvalidHostname { hostname: String, reason: &'static str },

    #[error("service `{namespace}` references unknown parent `{parent}`")]
    UnknownParent { namespace: String, parent: String },

    #[error("service `{namespace}` cannot be its own parent")]
    SelfParent { namespace: String },

    #[error("namespace `{namespace}` is configured more than once")]
    DuplicateNamespace { namespace: String },
}

/// Check that `hostname` is a syntactically valid hostname.
///
/// Letters, digits, `-` and `.` only; at most 253 characters plus one optional
/// trailing dot; each label 1 to 63 characters and not starting or ending
/// with `-`.
pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    let invalid = |reason| ValidationError::InvalidHostname {
        hostname: hostname.to_string(),
        reason,
    };

    if hostname.is_empty() {
        return Err(invalid("empty"));
    }
    if !hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(invalid("contains characters other than letters, digits, '-' and '.'"));
    }

    let name = hostname.strip_suffix('.').unwrap_or(hostname);
    if name.len() > MAX_HOSTNAME_LEN {
        return Err(invalid("longer than 253 characters"));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(invalid("empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid("label longer than 63 characters"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("label starts or ends with '-'"));
        }
    }

    Ok(())
}

/// Validate the whole application config.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for service in &config.services {
        if let Err(e) = validate_hostname(&service.hostname) {
            errors.push(e);
        }
        if !seen.insert(service.namespace.as_str()) {
            errors.push(ValidationError::DuplicateNamespace {
                namespace: service.namespace.clone(),
            });
        }
    }

    for service in &config.services {
        let Some(parent) = &service.parent else {
            continue;
        };
        if parent == &service.namespace {
            errors.push(ValidationError::SelfParent {
                namespace: service.namespace.clone(),
            });
        } else if !seen.contains(parent.as_str()) {
            errors.push(ValidationError::UnknownParent {
                namespace: service.namespace.clone(),
                parent: parent.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
