use crate::resource::ResourceKind;

/// All error types that can occur while controlling lights through a bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// A filesystem operation on a cache snapshot or config file failed.
    #[error("io {action} error: {err:?}")]
    Io { action: String, err: std::io::Error },

    /// Attempted to write a [`crate::DeviceState`] with no attributes set.
    #[error("invalid state; no attributes set")]
    EmptyState,

    /// No record of the given kind exists under the given id.
    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    /// No bridge id was given and no bridge is currently connected.
    #[error("no bridge available")]
    NoBridgeAvailable,

    /// The bridge could not be reached, or did not answer in time.
    #[error("{target} unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    /// One record did not accept a write, or did not answer in time. The
    /// bridge itself is still reachable.
    #[error("{id} failed: {reason}")]
    DeviceFailed { id: String, reason: String },

    /// A stale cache collection could not be refreshed.
    #[error("stale {kind} data could not be refreshed: {reason}")]
    StaleData { kind: ResourceKind, reason: String },

    /// Part of a batch operation failed; the successful part took effect.
    #[error("{operation} failed for {} of {total}: {}", failures.len(), failures.join("; "))]
    PartialFailure {
        operation: String,
        failures: Vec<String>,
        total: usize,
    },

    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A bridge with this id is already registered.
    #[error("bridge {0} is already registered")]
    DuplicateBridge(String),

    /// The bridge rejected the credential.
    #[error("bridge {bridge} rejected the credential: {reason}")]
    Authentication { bridge: String, reason: String },

    /// A state write was aimed at a kind without writable state.
    #[error("{0} records have no writable state")]
    NotControllable(ResourceKind),

    /// A record returned by the transport failed validation.
    #[error("invalid {kind} record: {reason}")]
    InvalidRecord { kind: ResourceKind, reason: String },
}

impl Error {
    /// Create a new io error
    pub fn io(action: &str, err: std::io::Error) -> Self {
        Error::Io {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new not found error
    pub fn not_found(kind: impl std::fmt::Display, id: &str) -> Self {
        Error::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Create a new unreachable error
    pub fn unreachable(target: &str, reason: impl std::fmt::Display) -> Self {
        Error::Unreachable {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new device failure error
    pub fn device_failed(id: &str, reason: impl std::fmt::Display) -> Self {
        Error::DeviceFailed {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new stale data error
    pub fn stale(kind: ResourceKind, reason: impl std::fmt::Display) -> Self {
        Error::StaleData {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Create a new partial failure error
    pub fn partial(operation: &str, failures: Vec<String>, total: usize) -> Self {
        Error::PartialFailure {
            operation: operation.to_string(),
            failures,
            total,
        }
    }

    /// Create a new authentication error
    pub fn authentication(bridge: &str, reason: impl std::fmt::Display) -> Self {
        Error::Authentication {
            bridge: bridge.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new invalid record error
    pub fn invalid_record(kind: ResourceKind, reason: impl std::fmt::Display) -> Self {
        Error::InvalidRecord {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Whether the error means the bridge itself could not be talked to.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Error::Unreachable { .. })
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_message() {
        let err = Error::partial(
            "shutdown",
            vec!["attic: io error".into(), "garage: timeout".into()],
            3,
        );
        assert_eq!(
            err.to_string(),
            "shutdown failed for 2 of 3: attic: io error; garage: timeout"
        );
    }

    #[test]
    fn test_not_found_names_kind() {
        let err = Error::not_found(ResourceKind::Light, "abc");
        assert_eq!(err.to_string(), "light abc not found");
    }
}
