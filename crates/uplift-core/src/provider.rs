//! Configuration provider contract.
//!
//! The engine only reads through [`SettingsProvider`]. Front-ends that
//! create or edit instances use the [`SettingsStore`] extension.

use crate::error::SettingsResult;
use crate::settings::*;
use crate::InstanceId;

/// Read side consumed by the registry and the dispatcher.
///
/// Records that were never saved come back as defaults for the
/// requested id.
pub trait SettingsProvider: Send + Sync {
    fn instance_settings(&self) -> SettingsResult<InstanceSettings>;

    fn watched_directory(&self, id: InstanceId) -> SettingsResult<WatchedDirectorySettings>;

    fn activation(&self, id: InstanceId) -> SettingsResult<ActivationSettings>;

    fn ftp(&self, id: InstanceId) -> SettingsResult<FtpSettings>;

    fn sftp(&self, id: InstanceId) -> SettingsResult<SftpSettings>;

    fn email(&self, id: InstanceId) -> SettingsResult<EmailSettings>;

    /// Ensure a record of every kind exists for `id`, seeding defaults.
    /// Existing records are left untouched.
    fn initialize_instance(&self, id: InstanceId) -> SettingsResult<()>;
}

/// Write side used by the CLI (and any other front-end).
pub trait SettingsStore: SettingsProvider {
    fn save_instance_settings(&self, settings: &InstanceSettings) -> SettingsResult<()>;

    fn save_watched_directory(&self, settings: &WatchedDirectorySettings) -> SettingsResult<()>;

    fn save_activation(&self, settings: &ActivationSettings) -> SettingsResult<()>;

    fn save_ftp(&self, settings: &FtpSettings) -> SettingsResult<()>;

    fn save_sftp(&self, settings: &SftpSettings) -> SettingsResult<()>;

    fn save_email(&self, settings: &EmailSettings) -> SettingsResult<()>;

    /// Append a new instance: seeds its records, bumps the count and
    /// makes it the active instance. Returns the new id.
    fn register_instance(&self) -> SettingsResult<InstanceId> {
        let mut settings = self.instance_settings()?;
        let id = settings.instance_count + 1;
        self.initialize_instance(id)?;
        settings.instance_count = id;
        settings.active_instance = id;
        self.save_instance_settings(&settings)?;
        Ok(id)
    }

    fn set_active_instance(&self, id: InstanceId) -> SettingsResult<()> {
        let mut settings = self.instance_settings()?;
        if !settings.contains(id) {
            return Err(crate::error::SettingsError::UnknownInstance(id));
        }
        settings.active_instance = id;
        self.save_instance_settings(&settings)
    }
}
