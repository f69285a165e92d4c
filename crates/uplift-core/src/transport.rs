//! Transport contract.
//!
//! Every transport opens a fresh connection per call, streams exactly one
//! file and closes the connection on every exit path.

use crate::error::{UploadError, UploadResult};
use crate::settings::{FtpSettings, SftpSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Ftp,
    Sftp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ftp => f.write_str("FTP"),
            Self::Sftp => f.write_str("SFTP"),
        }
    }
}

/// Which transport an instance dispatches to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportSelector {
    None,
    #[default]
    Ftp,
    Sftp,
}

impl TransportSelector {
    pub fn protocol(self) -> Option<Protocol> {
        match self {
            Self::None => None,
            Self::Ftp => Some(Protocol::Ftp),
            Self::Sftp => Some(Protocol::Sftp),
        }
    }
}

/// Resolved destination for one instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum UploadTarget {
    Ftp(FtpSettings),
    Sftp(SftpSettings),
}

impl UploadTarget {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Ftp(_) => Protocol::Ftp,
            Self::Sftp(_) => Protocol::Sftp,
        }
    }
}

/// What a successful upload wrote where.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub protocol: Protocol,
    pub local_path: PathBuf,
    pub remote_path: String,
    pub bytes: u64,
}

/// A single-file upload client.
#[async_trait]
pub trait Uploader: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Transfer `local_path` to the configured destination, keeping the
    /// base name.
    async fn upload(&self, local_path: &Path) -> UploadResult<UploadReceipt>;

    /// Boolean form of [`Uploader::upload`]: true iff the file was fully
    /// transferred.
    async fn upload_file(&self, local_path: &Path) -> bool {
        match self.upload(local_path).await {
            Ok(_) => true,
            Err(e) => {
                log::error!("{} upload of {} failed: {}", self.protocol(), local_path.display(), e);
                false
            }
        }
    }
}

/// Base name of a local path as a UTF-8 string.
pub fn file_name_of(local_path: &Path) -> UploadResult<String> {
    local_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            UploadError::local_io(format!("'{}' has no usable file name", local_path.display()))
        })
}

/// Join a remote folder and a file name with exactly one `/`.
pub fn join_remote(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        format!("/{}", file_name)
    } else {
        format!("{}/{}", folder, file_name)
    }
}
