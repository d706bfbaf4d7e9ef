//! Service error definitions.

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Errors raised by service construction and the mount lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Construction options failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// `mount` called while the service is mounted.
    #[error("service `{namespace}` is already mounted")]
    AlreadyMounted { namespace: String },

    /// `unmount` called while the service is not mounted.
    #[error("service `{namespace}` is not currently mounted")]
    NotMounted { namespace: String },

    /// The host is the service itself or is nested inside it.
    #[error("mounting service `{namespace}` onto this host would create a routing cycle")]
    MountCycle { namespace: String },
}

impl ServiceError {
    /// True for errors caused by calling an operation in the wrong mount state.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            ServiceError::AlreadyMounted { .. } | ServiceError::NotMounted { .. }
        )
    }
}
