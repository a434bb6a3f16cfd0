//! Error types for the reconciliation engine.
//!
//! [`StoreError`] is what a [`GroupStore`](crate::store::GroupStore) returns;
//! [`SyncError`] is what the engine returns and wraps store failures together
//! with configuration errors and invariant violations.

use thiserror::Error;

use crate::ids::GroupId;

/// Error returned by a group store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to reach the store.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// The store rejected the credentials.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The addressed group does not exist.
    #[error("group not found: {group_id}")]
    GroupNotFound { group_id: GroupId },

    /// The store answered with an unexpected status.
    #[error("unexpected response (status {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },

    /// The store answered with a body that could not be decoded.
    #[error("invalid response data: {message}")]
    InvalidData { message: String },

    /// Any other store-side failure (also used by test doubles).
    #[error("store operation failed: {message}")]
    OperationFailed { message: String },
}

impl StoreError {
    /// Whether the failure is likely to clear up on its own.
    ///
    /// The engine never retries; the flag only feeds log output.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::ConnectionFailed { .. } | StoreError::Timeout { .. } => true,
            StoreError::UnexpectedResponse { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Shorthand for [`StoreError::OperationFailed`].
    pub fn failed(message: impl Into<String>) -> Self {
        StoreError::OperationFailed {
            message: message.into(),
        }
    }
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by the engine.
#[derive(Debug, Error)]
pub enum SyncError {
    // Configuration errors
    /// The world's type has no entry in the role maps.
    #[error("no role map configured for world type '{world_type}' (world {group_id})")]
    UnmappedWorldType {
        group_id: GroupId,
        world_type: String,
    },

    /// The role label has no entry in the world type's role map.
    #[error("role '{role}' is not mapped for world type '{world_type}' (world {group_id})")]
    UnmappedRole {
        group_id: GroupId,
        world_type: String,
        role: String,
    },

    /// The template code has no entry in the world template map.
    #[error("no world template configured for code '{code}' (world {group_id})")]
    MissingTemplate { group_id: GroupId, code: String },

    /// The import configuration could not be loaded.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Input errors
    /// A required column is absent or empty.
    #[error("line {line}: required column {index} ({name}) is empty")]
    MissingField {
        line: usize,
        index: usize,
        name: &'static str,
    },

    // Store state errors
    /// A row references a world that does not exist in the store.
    #[error("world {group_id} does not exist")]
    WorldNotFound { group_id: GroupId },

    /// A world has no `sakai:world-type` property.
    #[error("world {group_id} has no world type")]
    MissingWorldType { group_id: GroupId },

    /// The world's role definitions could not be decoded.
    #[error("world {group_id} has invalid role definitions: {message}")]
    InvalidRoles { group_id: GroupId, message: String },

    /// A world still has no properties after creation.
    #[error("failed to create world {group_id}")]
    WorldNotCreated { group_id: GroupId },

    /// A store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether the error stems from configuration rather than store state.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncError::UnmappedWorldType { .. }
                | SyncError::UnmappedRole { .. }
                | SyncError::MissingTemplate { .. }
                | SyncError::InvalidConfiguration { .. }
        )
    }

    /// Whether the error is a store failure that may clear up on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_transient())
    }
}

/// Result alias for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;
