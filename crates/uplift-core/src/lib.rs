//! # uplift-core: shared model for the watch-and-upload engine
//!
//! - `settings`: per-instance settings records and their defaults
//! - `provider`: the read contract the engine consumes (`SettingsProvider`)
//!   and the write extension used by front-ends (`SettingsStore`)
//! - `transport`: `TransportSelector`, `UploadTarget`, the `Uploader` trait
//! - `error`: `UploadError` taxonomy and `SettingsError`
//! - `event`: `UploadEvent`

pub mod error;
pub mod event;
pub mod provider;
pub mod settings;
pub mod transport;

pub use error::{SettingsError, SettingsResult, TransferPhase, UploadError, UploadErrorKind, UploadResult};
pub use event::UploadEvent;
pub use provider::{SettingsProvider, SettingsStore};
pub use settings::*;
pub use transport::{file_name_of, join_remote, Protocol, TransportSelector, UploadReceipt, UploadTarget, Uploader};

/// Positive, dense instance identifier (`1..=instance_count`).
pub type InstanceId = u32;
