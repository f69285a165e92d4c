//! JSON-file settings store.
//!
//! The whole document lives in one file. Writes go to a sibling temp
//! file that is renamed over the live one, so a reader never observes a
//! half-written document.

use crate::document::SettingsDocument;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uplift_core::{SettingsError, SettingsResult};

pub struct JsonSettingsStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonSettingsStore {
    /// Open (or lazily create) the store at `path`. The file is only
    /// written on the first save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn read_document(&self) -> SettingsResult<SettingsDocument> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SettingsDocument::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };
        if raw.trim().is_empty() {
            return Ok(SettingsDocument::default());
        }
        serde_json::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn update_document<F>(&self, f: F) -> SettingsResult<()>
    where
        F: FnOnce(&mut SettingsDocument),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let before = self.read_document()?;
        let mut doc = before.clone();
        f(&mut doc);
        if doc == before {
            return Ok(());
        }
        self.write_document(&doc)
    }

    fn write_document(&self, doc: &SettingsDocument) -> SettingsResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let json = serde_json::to_string_pretty(doc).map_err(|e| SettingsError::Parse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        log::debug!("settings written to {}", self.path.display());
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

crate::document_backed_store!(JsonSettingsStore);

#[cfg(test)]
mod tests {
    use super::*;
    use uplift_core::{SettingsProvider, SettingsStore};

    #[test]
    fn test_missing_file_reads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::open(dir.path().join("settings.json"));

        assert!(!store.exists());
        let s = store.instance_settings().unwrap();
        assert_eq!(s.instance_count, 0);
        assert_eq!(store.ftp(4).unwrap().id, 4);
    }

    #[test]
    fn test_writes_are_visible_to_a_second_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("settings.json");
        let writer = JsonSettingsStore::open(&path);
        let reader = JsonSettingsStore::open(&path);

        let id = writer.register_instance().unwrap();
        let mut ftp = writer.ftp(id).unwrap();
        ftp.server = "ftp.test".into();
        ftp.destination_folder = "/in".into();
        writer.save_ftp(&ftp).unwrap();

        assert_eq!(reader.instance_settings().unwrap().instance_count, 1);
        assert_eq!(reader.ftp(id).unwrap().server, "ftp.test");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_initialize_instance_does_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::open(dir.path().join("settings.json"));
        let mut act = store.activation(1).unwrap();
        act.sftp_enabled = true;
        store.save_activation(&act).unwrap();

        store.initialize_instance(1).unwrap();

        assert!(store.activation(1).unwrap().sftp_enabled);
        assert_eq!(store.read_document().unwrap().email.len(), 1);
    }

    #[test]
    fn test_unchanged_document_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonSettingsStore::open(&path);

        store.initialize_instance(1).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        fs::write(&path, format!("{}\n\n", written)).unwrap();

        store.initialize_instance(1).unwrap();
        store.save_ftp(&store.ftp(1).unwrap()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{}\n\n", written));
    }

    #[test]
    fn test_seeding_a_missing_file_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::open(dir.path().join("settings.json"));
        store.instance_settings().unwrap();
        assert!(!store.exists());
        store.initialize_instance(2).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonSettingsStore::open(&path);

        match store.instance_settings() {
            Err(SettingsError::Parse { .. }) => {}
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
