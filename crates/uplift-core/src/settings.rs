//! Per-instance settings records.
//!
//! One record of each kind exists per instance id. Records that were
//! never saved read back as their `Default` with the requested id.

use crate::transport::TransportSelector;
use crate::InstanceId;
use serde::{Deserialize, Serialize};

// ─── Instance bookkeeping ────────────────────────────────────────────

/// Singleton record (always stored under id 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSettings {
    pub id: InstanceId,
    pub instance_count: u32,
    pub active_instance: InstanceId,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            id: 1,
            instance_count: 0,
            active_instance: 0,
        }
    }
}

impl InstanceSettings {
    /// Whether `id` lies inside `[1, instance_count]`.
    pub fn contains(&self, id: InstanceId) -> bool {
        id >= 1 && id <= self.instance_count
    }
}

// ─── Watched directory ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchedDirectorySettings {
    pub id: InstanceId,
    #[serde(default = "default_watcher_name")]
    pub name: String,
    pub directory_path: String,
    /// Extension pattern appended to `*`, e.g. `.csv` or `.*`.
    #[serde(default = "default_extension")]
    pub file_extension: String,
    #[serde(default)]
    pub info: String,
}

fn default_watcher_name() -> String {
    "File Watcher Name".into()
}

fn default_extension() -> String {
    ".*".into()
}

fn default_directory() -> String {
    if cfg!(windows) {
        r"C:\Temp".into()
    } else {
        "/tmp".into()
    }
}

impl Default for WatchedDirectorySettings {
    fn default() -> Self {
        Self {
            id: 1,
            name: default_watcher_name(),
            directory_path: default_directory(),
            file_extension: default_extension(),
            info: String::new(),
        }
    }
}

impl WatchedDirectorySettings {
    /// Glob pattern the watch handle matches file names against.
    pub fn filter_pattern(&self) -> String {
        format!("*{}", self.file_extension)
    }
}

// ─── Activation ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivationSettings {
    pub id: InstanceId,
    #[serde(default)]
    pub file_watcher_enabled: bool,
    /// FTP is the fallback transport; disabling it together with SFTP
    /// leaves the instance with no transport.
    #[serde(default = "default_true")]
    pub ftp_enabled: bool,
    #[serde(default)]
    pub sftp_enabled: bool,
    #[serde(default)]
    pub email_enabled: bool,
    #[serde(default)]
    pub settings_changed_since_notification: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ActivationSettings {
    fn default() -> Self {
        Self {
            id: 1,
            file_watcher_enabled: false,
            ftp_enabled: true,
            sftp_enabled: false,
            email_enabled: false,
            settings_changed_since_notification: false,
        }
    }
}

impl ActivationSettings {
    /// SFTP wins over FTP; with both off there is nothing to dispatch to.
    pub fn transport(&self) -> TransportSelector {
        if self.sftp_enabled {
            TransportSelector::Sftp
        } else if self.ftp_enabled {
            TransportSelector::Ftp
        } else {
            TransportSelector::None
        }
    }
}

// ─── FTP ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FtpSettings {
    pub id: InstanceId,
    /// Bare host, `host:port` or `ftp://host[:port]`.
    pub server: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    pub destination_folder: String,
    #[serde(default)]
    pub file_extension: String,
    #[serde(default)]
    pub info: String,
}

fn default_ftp_port() -> u16 {
    21
}

impl Default for FtpSettings {
    fn default() -> Self {
        Self {
            id: 1,
            server: "ftp.example.com".into(),
            username: "anonymous".into(),
            password: "password".into(),
            port: default_ftp_port(),
            destination_folder: "/uploads".into(),
            file_extension: ".txt".into(),
            info: String::new(),
        }
    }
}

// ─── SFTP ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SftpSettings {
    pub id: InstanceId,
    pub host: String,
    #[serde(default = "default_sftp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Private key file; when set it is tried before the password.
    #[serde(default)]
    pub key_path: Option<String>,
    pub remote_path: String,
    #[serde(default)]
    pub info: String,
}

fn default_sftp_port() -> u16 {
    22
}

impl Default for SftpSettings {
    fn default() -> Self {
        Self {
            id: 1,
            host: "sftp.example.com".into(),
            port: default_sftp_port(),
            username: "username".into(),
            password: "password".into(),
            key_path: None,
            remote_path: "/upload".into(),
            info: String::new(),
        }
    }
}

// ─── Email ───────────────────────────────────────────────────────────

/// Notification settings. Persisted and seeded like the others; the
/// upload path does not send mail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    pub id: InstanceId,
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub info: String,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            id: 1,
            server: "smtp.example.com".into(),
            port: default_smtp_port(),
            username: "username".into(),
            password: "password".into(),
            from: "sender@example.com".into(),
            to: "receiver@example.com".into(),
            info: String::new(),
        }
    }
}

// ─── Id-carrying records ─────────────────────────────────────────────

/// A settings record keyed by instance id.
pub trait InstanceRecord: Default + Clone {
    fn id(&self) -> InstanceId;
    fn set_id(&mut self, id: InstanceId);

    /// Default record for `id`.
    fn for_instance(id: InstanceId) -> Self {
        let mut record = Self::default();
        record.set_id(id);
        record
    }
}

macro_rules! instance_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl InstanceRecord for $ty {
                fn id(&self) -> InstanceId {
                    self.id
                }
                fn set_id(&mut self, id: InstanceId) {
                    self.id = id;
                }
            }
        )*
    };
}

instance_record!(
    WatchedDirectorySettings,
    ActivationSettings,
    FtpSettings,
    SftpSettings,
    EmailSettings,
);
