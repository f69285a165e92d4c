//! Upload and settings error types.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Transfer phase ──────────────────────────────────────────────────

/// Where a single upload call is in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransferPhase {
    Idle,
    Connecting,
    Connected,
    Transferring,
    Closed,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Transferring => "transferring",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

// ─── Upload errors ───────────────────────────────────────────────────

/// Categorised transport failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadError {
    pub kind: UploadErrorKind,
    pub phase: TransferPhase,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadErrorKind {
    /// Target settings are unusable (empty host, empty destination, …).
    InvalidConfig,
    /// The local source file could not be read.
    LocalIo,
    /// DNS / TCP / handshake failure.
    Connect,
    /// Credentials rejected.
    Auth,
    /// Failure while streaming or finalising the remote file.
    Transfer,
    /// The server answered something we could not interpret.
    Protocol,
}

pub type UploadResult<T> = Result<T, UploadError>;

impl UploadError {
    pub fn new(kind: UploadErrorKind, phase: TransferPhase, msg: impl Into<String>) -> Self {
        Self {
            kind,
            phase,
            message: msg.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::InvalidConfig, TransferPhase::Idle, msg)
    }

    pub fn local_io(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::LocalIo, TransferPhase::Idle, msg)
    }

    pub fn connect(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Connect, TransferPhase::Connecting, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Auth, TransferPhase::Connecting, msg)
    }

    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Transfer, TransferPhase::Transferring, msg)
    }

    pub fn protocol(phase: TransferPhase, msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Protocol, phase, msg)
    }

    pub fn at(mut self, phase: TransferPhase) -> Self {
        self.phase = phase;
        self
    }

    /// Connect and auth failures happen before any remote write.
    pub fn is_connect_error(&self) -> bool {
        matches!(self.kind, UploadErrorKind::Connect | UploadErrorKind::Auth)
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?} while {}] {}", self.kind, self.phase, self.message)
    }
}

impl std::error::Error for UploadError {}

// ─── Settings errors ─────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings store I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("settings store {path} is not valid: {message}")]
    Parse { path: String, message: String },
    #[error("instance {0} does not exist")]
    UnknownInstance(u32),
}

pub type SettingsResult<T> = Result<T, SettingsError>;
