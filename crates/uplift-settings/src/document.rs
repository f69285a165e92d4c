//! The persisted settings document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uplift_core::settings::InstanceRecord;
use uplift_core::*;

/// Everything a store persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    #[serde(default)]
    pub instance_settings: InstanceSettings,
    #[serde(default)]
    pub watched_directories: BTreeMap<InstanceId, WatchedDirectorySettings>,
    #[serde(default)]
    pub activation: BTreeMap<InstanceId, ActivationSettings>,
    #[serde(default)]
    pub ftp: BTreeMap<InstanceId, FtpSettings>,
    #[serde(default)]
    pub sftp: BTreeMap<InstanceId, SftpSettings>,
    #[serde(default)]
    pub email: BTreeMap<InstanceId, EmailSettings>,
}

impl SettingsDocument {
    /// Insert default records for `id` where none exist yet.
    pub fn seed(&mut self, id: InstanceId) {
        seed(&mut self.watched_directories, id);
        seed(&mut self.activation, id);
        seed(&mut self.ftp, id);
        seed(&mut self.sftp, id);
        seed(&mut self.email, id);
    }
}

fn seed<T: InstanceRecord>(map: &mut BTreeMap<InstanceId, T>, id: InstanceId) {
    map.entry(id).or_insert_with(|| T::for_instance(id));
}

/// Stored record for `id`, or its default.
pub(crate) fn record<T: InstanceRecord>(map: &BTreeMap<InstanceId, T>, id: InstanceId) -> T {
    map.get(&id).cloned().unwrap_or_else(|| T::for_instance(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_keeps_existing_records() {
        let mut doc = SettingsDocument::default();
        let mut ftp = FtpSettings::for_instance(1);
        ftp.server = "ftp.test".into();
        doc.ftp.insert(1, ftp);

        doc.seed(1);

        assert_eq!(doc.ftp[&1].server, "ftp.test");
        assert_eq!(doc.sftp[&1].id, 1);
        assert_eq!(doc.email[&1].id, 1);
    }

    #[test]
    fn test_record_falls_back_to_default_with_id() {
        let doc = SettingsDocument::default();
        let sftp = record(&doc.sftp, 7);
        assert_eq!(sftp.id, 7);
        assert_eq!(sftp.port, 22);
    }
}
