//! # uplift-ftp: FTP upload transport
//!
//! Ships one local file per call to an FTP server (RFC 959), over a
//! passive (`PASV`) or extended passive (`EPSV`, RFC 2428) data channel.
//!
//! Architecture:
//! - `types`: endpoint resolution and client options
//! - `error`: FTP-specific error type and reply-code classification
//! - `protocol`: low-level command/response codec
//! - `connection`: TCP control connection
//! - `transfer`: data channel (PASV/EPSV)
//! - `client`: login, TYPE, QUIT
//! - `file_ops`: STOR streaming
//! - `uploader`: `FtpUploader`, the `Uploader` implementation
//! - `mock_server`: loopback server for tests (feature `test-server`)

pub mod client;
pub mod connection;
pub mod error;
pub mod file_ops;
pub mod protocol;
pub mod transfer;
pub mod types;
pub mod uploader;

#[cfg(any(test, feature = "test-server"))]
pub mod mock_server;

pub use error::{FtpError, FtpErrorKind, FtpResult};
pub use types::*;
pub use uploader::FtpUploader;
