//! In-memory settings store.

use crate::document::SettingsDocument;
use std::sync::Mutex;
use uplift_core::SettingsResult;

/// Settings held in memory only.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    doc: Mutex<SettingsDocument>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: SettingsDocument) -> Self {
        Self {
            doc: Mutex::new(doc),
        }
    }

    pub fn snapshot(&self) -> SettingsDocument {
        self.doc.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn read_document(&self) -> SettingsResult<SettingsDocument> {
        Ok(self.snapshot())
    }

    fn update_document<F>(&self, f: F) -> SettingsResult<()>
    where
        F: FnOnce(&mut SettingsDocument),
    {
        let mut doc = self.doc.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut doc);
        Ok(())
    }
}

crate::document_backed_store!(MemorySettingsStore);

#[cfg(test)]
mod tests {
    use super::*;
    use uplift_core::{SettingsProvider, SettingsStore};

    #[test]
    fn test_register_instance_appends_and_activates() {
        let store = MemorySettingsStore::new();
        assert_eq!(store.register_instance().unwrap(), 1);
        assert_eq!(store.register_instance().unwrap(), 2);

        let s = store.instance_settings().unwrap();
        assert_eq!(s.instance_count, 2);
        assert_eq!(s.active_instance, 2);
        assert_eq!(store.snapshot().activation.len(), 2);
    }

    #[test]
    fn test_set_active_instance_rejects_unknown() {
        let store = MemorySettingsStore::new();
        store.register_instance().unwrap();
        store.register_instance().unwrap();

        store.set_active_instance(1).unwrap();
        assert_eq!(store.instance_settings().unwrap().active_instance, 1);
        assert!(store.set_active_instance(3).is_err());
        assert!(store.set_active_instance(0).is_err());
    }

    #[test]
    fn test_save_and_read_back() {
        let store = MemorySettingsStore::new();
        let mut dir = store.watched_directory(1).unwrap();
        dir.directory_path = "/data/drop".into();
        dir.file_extension = ".csv".into();
        store.save_watched_directory(&dir).unwrap();

        let back = store.watched_directory(1).unwrap();
        assert_eq!(back.directory_path, "/data/drop");
        assert_eq!(back.filter_pattern(), "*.csv");
    }
}
