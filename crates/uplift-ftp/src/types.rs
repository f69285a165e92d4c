//! Shared types for the FTP crate.

use crate::error::{FtpError, FtpResult};
use serde::{Deserialize, Serialize};
use uplift_core::FtpSettings;

// ─── Client options ──────────────────────────────────────────────────

/// Transfer mode selected for the data channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DataChannelMode {
    #[default]
    Passive,
    ExtendedPassive,
}

/// Knobs that are not part of the per-instance settings record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpClientOptions {
    /// Control-connection timeout in seconds (TCP connect and each reply).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    /// Data-channel timeout in seconds.
    #[serde(default = "default_data_timeout")]
    pub data_timeout_sec: u64,
    #[serde(default)]
    pub data_channel_mode: DataChannelMode,
}

fn default_connect_timeout() -> u64 {
    15
}
fn default_data_timeout() -> u64 {
    30
}

impl Default for FtpClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout_sec: default_connect_timeout(),
            data_timeout_sec: default_data_timeout(),
            data_channel_mode: DataChannelMode::default(),
        }
    }
}

// ─── Endpoint ────────────────────────────────────────────────────────

/// Where and as whom to connect, resolved from an [`FtpSettings`] record.
///
/// `server` may be a bare host (`ftp.example.com`), `host:port`, or an
/// `ftp://` URL. A port given inside `server` wins over the `port` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub destination_folder: String,
}

impl FtpEndpoint {
    pub fn from_settings(settings: &FtpSettings) -> FtpResult<Self> {
        let server = settings.server.trim();
        if server.is_empty() {
            return Err(FtpError::invalid_config("FTP server is empty"));
        }
        if settings.destination_folder.trim().is_empty() {
            return Err(FtpError::invalid_config("FTP destination folder is empty"));
        }

        let raw = if server.contains("://") {
            server.to_string()
        } else {
            format!("ftp://{}", server)
        };
        let url = url::Url::parse(&raw)
            .map_err(|e| FtpError::invalid_config(format!("FTP server '{}': {}", server, e)))?;
        if url.scheme() != "ftp" {
            return Err(FtpError::invalid_config(format!(
                "unsupported scheme '{}' in FTP server '{}'",
                url.scheme(),
                server
            )));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| FtpError::invalid_config(format!("FTP server '{}' has no host", server)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        let port = url
            .port()
            .or_else(|| explicit_port(&raw))
            .unwrap_or(settings.port);
        if port == 0 {
            return Err(FtpError::invalid_config("FTP port is 0"));
        }

        Ok(Self {
            host,
            port,
            username: settings.username.clone(),
            password: settings.password.clone(),
            destination_folder: settings.destination_folder.clone(),
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

/// Port written in the authority of `raw`, including a scheme-default
/// one that `Url::port` drops.
fn explicit_port(raw: &str) -> Option<u16> {
    let rest = raw.split_once("://").map(|(_, r)| r).unwrap_or(raw);
    let authority = rest.split('/').next().unwrap_or(rest);
    let host_port = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let port = if host_port.starts_with('[') {
        host_port.rsplit_once("]:").map(|(_, p)| p)?
    } else {
        match host_port.split_once(':') {
            Some((_, p)) if !p.contains(':') => p,
            _ => return None,
        }
    };
    port.parse().ok()
}

// ─── Protocol ────────────────────────────────────────────────────────

/// Raw FTP response (code + text lines).
#[derive(Debug, Clone)]
pub struct FtpResponse {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    /// Full response text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether this is a positive-preliminary reply (1xx).
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Whether this is a positive-completion reply (2xx).
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}
