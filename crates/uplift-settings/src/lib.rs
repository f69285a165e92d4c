//! # uplift-settings: settings stores
//!
//! Both stores hold the same [`SettingsDocument`]: the instance
//! bookkeeping record plus one id-keyed collection per settings kind.
//!
//! - [`JsonSettingsStore`] persists the document as pretty JSON and
//!   re-reads it on every access so edits made by another process (the
//!   CLI, a hand edit) are seen by a running engine.
//! - [`MemorySettingsStore`] keeps it in memory; used by tests.

/// Implements the provider and store traits for a type exposing
/// `read_document` and `update_document`.
macro_rules! document_backed_store {
    ($ty:ty) => {
        impl uplift_core::SettingsProvider for $ty {
            fn instance_settings(&self) -> uplift_core::SettingsResult<uplift_core::InstanceSettings> {
                Ok(self.read_document()?.instance_settings)
            }

            fn watched_directory(
                &self,
                id: uplift_core::InstanceId,
            ) -> uplift_core::SettingsResult<uplift_core::WatchedDirectorySettings> {
                Ok($crate::document::record(&self.read_document()?.watched_directories, id))
            }

            fn activation(
                &self,
                id: uplift_core::InstanceId,
            ) -> uplift_core::SettingsResult<uplift_core::ActivationSettings> {
                Ok($crate::document::record(&self.read_document()?.activation, id))
            }

            fn ftp(&self, id: uplift_core::InstanceId) -> uplift_core::SettingsResult<uplift_core::FtpSettings> {
                Ok($crate::document::record(&self.read_document()?.ftp, id))
            }

            fn sftp(&self, id: uplift_core::InstanceId) -> uplift_core::SettingsResult<uplift_core::SftpSettings> {
                Ok($crate::document::record(&self.read_document()?.sftp, id))
            }

            fn email(&self, id: uplift_core::InstanceId) -> uplift_core::SettingsResult<uplift_core::EmailSettings> {
                Ok($crate::document::record(&self.read_document()?.email, id))
            }

            fn initialize_instance(&self, id: uplift_core::InstanceId) -> uplift_core::SettingsResult<()> {
                self.update_document(|doc| doc.seed(id))
            }
        }

        impl uplift_core::SettingsStore for $ty {
            fn save_instance_settings(
                &self,
                settings: &uplift_core::InstanceSettings,
            ) -> uplift_core::SettingsResult<()> {
                self.update_document(|doc| doc.instance_settings = settings.clone())
            }

            fn save_watched_directory(
                &self,
                settings: &uplift_core::WatchedDirectorySettings,
            ) -> uplift_core::SettingsResult<()> {
                self.update_document(|doc| {
                    doc.watched_directories.insert(settings.id, settings.clone());
                })
            }

            fn save_activation(&self, settings: &uplift_core::ActivationSettings) -> uplift_core::SettingsResult<()> {
                self.update_document(|doc| {
                    doc.activation.insert(settings.id, settings.clone());
                })
            }

            fn save_ftp(&self, settings: &uplift_core::FtpSettings) -> uplift_core::SettingsResult<()> {
                self.update_document(|doc| {
                    doc.ftp.insert(settings.id, settings.clone());
                })
            }

            fn save_sftp(&self, settings: &uplift_core::SftpSettings) -> uplift_core::SettingsResult<()> {
                self.update_document(|doc| {
                    doc.sftp.insert(settings.id, settings.clone());
                })
            }

            fn save_email(&self, settings: &uplift_core::EmailSettings) -> uplift_core::SettingsResult<()> {
                self.update_document(|doc| {
                    doc.email.insert(settings.id, settings.clone());
                })
            }
        }
    };
}

pub(crate) use document_backed_store;

mod document;
mod json;
mod memory;

pub use document::SettingsDocument;
pub use json::JsonSettingsStore;
pub use memory::MemorySettingsStore;
