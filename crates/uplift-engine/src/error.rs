//! Registry and dispatch errors.

use uplift_core::{InstanceId, SettingsError, UploadError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid instance id {id} (instance count is {count})")]
    InvalidInstanceId { id: InstanceId, count: u32 },

    /// The instance's configuration cannot be watched (missing directory,
    /// unusable filter). Logged and returned; never fatal.
    #[error("instance {id} is misconfigured: {message}")]
    Configuration { id: InstanceId, message: String },

    #[error("instance {id}: cannot watch {path}: {source}")]
    Watch {
        id: InstanceId,
        path: String,
        #[source]
        source: notify::Error,
    },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("registry has been stopped")]
    Stopped,
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Why a dispatched event did not end in a completed upload.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no transport enabled")]
    NoTransport,

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}
