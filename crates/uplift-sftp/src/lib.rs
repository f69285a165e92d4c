//! # uplift-sftp: SFTP upload transport
//!
//! libssh2 is blocking, so every upload runs inside
//! `tokio::task::spawn_blocking` on its own SSH session.
//!
//! - `types`: endpoint resolution, client options, auth method
//! - `session`: connect, authenticate, put one file, disconnect
//! - `uploader`: `SftpUploader`, the `Uploader` implementation

pub mod session;
pub mod types;
pub mod uploader;

pub use types::*;
pub use uploader::SftpUploader;
