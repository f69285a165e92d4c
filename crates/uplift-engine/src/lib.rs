//! # uplift-engine: watch directories, dispatch uploads
//!
//! - `registry`: `InstanceRegistry`: one watch handle per instance id
//! - `handle`: `WatchHandle` over a notify subscription
//! - `filter`: file-name glob (`"*" + extension`)
//! - `dispatcher`: event → FTP/SFTP transport
//! - `queue`: event router, optional per-instance serial workers
//! - `error`: `RegistryError`, `DispatchError`

pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod handle;
pub mod queue;
pub mod registry;

pub use dispatcher::{DispatchOutcome, Dispatcher, NetworkUploaderFactory, UploaderFactory};
pub use error::{DispatchError, RegistryError, RegistryResult};
pub use filter::FileFilter;
pub use handle::{HandleSnapshot, WatchHandle};
pub use queue::DispatchMode;
pub use registry::{InstanceRegistry, RegistryOptions, RegistryState};
