//! Endpoint resolution and client options for SFTP uploads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uplift_core::{SftpSettings, UploadError, UploadResult};

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SftpClientOptions {
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Per-operation libssh2 timeout in seconds (0 = none).
    #[serde(default = "default_io_timeout")]
    pub io_timeout_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_connect_timeout() -> u64 {
    15
}
fn default_io_timeout() -> u64 {
    30
}
fn default_chunk_size() -> usize {
    32 * 1024
}

impl Default for SftpClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            io_timeout_secs: default_io_timeout(),
            chunk_size: default_chunk_size(),
        }
    }
}

// ─── Endpoint ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SftpAuth {
    Password(String),
    /// Private key file; the password, when set, is tried as a fallback.
    KeyFile { path: PathBuf, password: Option<String> },
}

impl fmt::Display for SftpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("password"),
            Self::KeyFile { path, .. } => write!(f, "publickey({})", path.display()),
        }
    }
}

/// Connection parameters resolved from one instance's [`SftpSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: SftpAuth,
    pub remote_path: String,
}

impl SftpEndpoint {
    pub fn from_settings(settings: &SftpSettings) -> UploadResult<Self> {
        let host = settings.host.trim();
        if host.is_empty() {
            return Err(UploadError::invalid_config("SFTP host is empty"));
        }
        if settings.port == 0 {
            return Err(UploadError::invalid_config("SFTP port is 0"));
        }
        if settings.username.trim().is_empty() {
            return Err(UploadError::invalid_config("SFTP username is empty"));
        }
        if settings.remote_path.trim().is_empty() {
            return Err(UploadError::invalid_config("SFTP remote path is empty"));
        }

        let auth = match settings.key_path.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => SftpAuth::KeyFile {
                path: PathBuf::from(key),
                password: Some(settings.password.clone()).filter(|p| !p.is_empty()),
            },
            _ => SftpAuth::Password(settings.password.clone()),
        };

        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port: settings.port,
            username: settings.username.clone(),
            auth,
            remote_path: settings.remote_path.clone(),
        })
    }

    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uplift_core::UploadErrorKind;

    fn settings() -> SftpSettings {
        SftpSettings {
            host: "sftp.test".into(),
            username: "bob".into(),
            password: "pw".into(),
            ..SftpSettings::default()
        }
    }

    #[test]
    fn test_password_auth_by_default() {
        let ep = SftpEndpoint::from_settings(&settings()).unwrap();
        assert_eq!(ep.auth, SftpAuth::Password("pw".into()));
        assert_eq!(ep.port, 22);
        assert_eq!(ep.remote_path, "/upload");
        assert_eq!(ep.authority(), "sftp.test:22");
    }

    #[test]
    fn test_key_path_selects_key_auth() {
        let mut s = settings();
        s.key_path = Some("/keys/id_ed25519".into());
        let ep = SftpEndpoint::from_settings(&s).unwrap();
        assert_eq!(
            ep.auth,
            SftpAuth::KeyFile {
                path: PathBuf::from("/keys/id_ed25519"),
                password: Some("pw".into())
            }
        );

        s.key_path = Some("   ".into());
        let ep = SftpEndpoint::from_settings(&s).unwrap();
        assert!(matches!(ep.auth, SftpAuth::Password(_)));
    }

    #[test]
    fn test_auth_display_hides_secrets() {
        let pw = SftpAuth::Password("hunter2".into());
        assert_eq!(pw.to_string(), "password");

        let key = SftpAuth::KeyFile {
            path: PathBuf::from("/keys/id_ed25519"),
            password: Some("hunter2".into()),
        };
        assert_eq!(key.to_string(), "publickey(/keys/id_ed25519)");
    }

    #[test]
    fn test_rejects_unusable_settings() {
        let mut s = settings();
        s.host = String::new();
        assert_eq!(SftpEndpoint::from_settings(&s).unwrap_err().kind, UploadErrorKind::InvalidConfig);

        let mut s = settings();
        s.remote_path = String::new();
        assert_eq!(SftpEndpoint::from_settings(&s).unwrap_err().kind, UploadErrorKind::InvalidConfig);
    }
}
