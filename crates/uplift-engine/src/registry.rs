//! Instance registry: lifecycle of every instance's watch handle.
//!
//! The registry lives behind one async mutex ([`RegistryState`]), so
//! add, update, refresh and stop never interleave. Handles are keyed by
//! instance id and an add replaces whatever was there, so there is at
//! most one live handle per id.

use crate::dispatcher::{DispatchOutcome, Dispatcher, NetworkUploaderFactory, UploaderFactory};
use crate::error::{RegistryError, RegistryResult};
use crate::filter::FileFilter;
use crate::handle::{HandleSnapshot, WatchHandle};
use crate::queue::{DispatchMode, Router};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uplift_core::{InstanceId, SettingsProvider, UploadEvent};

pub type RegistryState = Arc<Mutex<InstanceRegistry>>;

#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    pub dispatch_mode: DispatchMode,
    /// Receives the outcome of every dispatched event.
    pub outcomes: Option<UnboundedSender<DispatchOutcome>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    Stopped,
}

pub struct InstanceRegistry {
    provider: Arc<dyn SettingsProvider>,
    dispatcher: Dispatcher,
    options: RegistryOptions,
    handles: BTreeMap<InstanceId, WatchHandle>,
    /// Template sender cloned into every handle; `None` after stop.
    events_tx: Option<UnboundedSender<UploadEvent>>,
    /// Held until the router is spawned by `start`.
    events_rx: Option<UnboundedReceiver<UploadEvent>>,
    router: Option<JoinHandle<()>>,
    lifecycle: Lifecycle,
}

impl InstanceRegistry {
    /// Registry uploading through the real FTP/SFTP transports.
    pub fn new(provider: Arc<dyn SettingsProvider>, options: RegistryOptions) -> RegistryState {
        Self::with_factory(provider, Arc::new(NetworkUploaderFactory::default()), options)
    }

    pub fn with_factory(
        provider: Arc<dyn SettingsProvider>,
        factory: Arc<dyn UploaderFactory>,
        options: RegistryOptions,
    ) -> RegistryState {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Arc::new(Mutex::new(Self {
            dispatcher: Dispatcher::new(provider.clone(), factory),
            provider,
            options,
            handles: BTreeMap::new(),
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            router: None,
            lifecycle: Lifecycle::Created,
        }))
    }

    // ── Start ────────────────────────────────────────────────────────────────

    /// Start routing events, then add every configured instance in
    /// ascending id order. A second call is a no-op.
    ///
    /// Per-instance failures are logged and skipped. An unreadable
    /// instance count is returned as an error, but the registry is
    /// running by then and a later `refresh_all` can recover.
    pub async fn start(&mut self) -> RegistryResult<()> {
        match self.lifecycle {
            Lifecycle::Running => {
                log::debug!("registry already started");
                return Ok(());
            }
            Lifecycle::Stopped => return Err(RegistryError::Stopped),
            Lifecycle::Created => {}
        }

        if let Some(rx) = self.events_rx.take() {
            let router = Router::new(
                self.dispatcher.clone(),
                self.options.dispatch_mode,
                self.options.outcomes.clone(),
            );
            self.router = Some(router.spawn(rx));
        }
        self.lifecycle = Lifecycle::Running;

        let count = self.provider.instance_settings()?.instance_count;
        for id in 1..=count {
            // Errors are logged inside add_instance.
            let _ = self.add_instance(id);
        }
        log::info!(
            "registry started: {} of {} instance(s) watching",
            self.handles.len(),
            count
        );
        Ok(())
    }

    // ── Add ──────────────────────────────────────────────────────────────────

    /// Create (or replace) the handle for `id` from the current settings.
    pub fn add_instance(&mut self, id: InstanceId) -> RegistryResult<()> {
        let events = self.events_tx.clone().ok_or(RegistryError::Stopped)?;
        if id == 0 {
            let count = self.instance_count_or_zero();
            log::warn!("refusing to add instance 0");
            return Err(RegistryError::InvalidInstanceId { id, count });
        }

        self.provider.initialize_instance(id)?;
        let dir = self.provider.watched_directory(id)?;
        let activation = self.provider.activation(id)?;

        let directory = PathBuf::from(dir.directory_path.trim());
        if !directory.is_dir() {
            self.close_handle(id);
            let err = RegistryError::Configuration {
                id,
                message: format!("watched directory '{}' does not exist", dir.directory_path),
            };
            log::error!("{}", err);
            return Err(err);
        }
        let filter = Self::filter_for(id, &dir.file_extension)?;

        // Replace, never accumulate.
        self.close_handle(id);
        let handle = WatchHandle::open(id, directory, filter, activation.file_watcher_enabled, events)
            .map_err(|e| {
                log::error!("{}", e);
                e
            })?;

        log::info!(
            "instance {} ({}) watching {} for {}{}",
            id,
            dir.name,
            handle.directory().display(),
            handle.filter().as_str(),
            if handle.is_enabled() { "" } else { " (disabled)" }
        );
        self.handles.insert(id, handle);
        Ok(())
    }

    // ── Update ───────────────────────────────────────────────────────────────

    /// Re-read the settings of `id` and bring its handle in line, then add
    /// a handle for every other configured instance that lacks one.
    pub fn update_instance(&mut self, id: InstanceId) -> RegistryResult<()> {
        if self.lifecycle == Lifecycle::Stopped {
            return Err(RegistryError::Stopped);
        }
        let count = self.provider.instance_settings()?.instance_count;
        if id == 0 || id > count {
            log::warn!("cannot update instance {}: instance count is {}", id, count);
            return Err(RegistryError::InvalidInstanceId { id, count });
        }

        let result = self.reconcile(id);
        self.backfill(count, Some(id));
        result
    }

    /// `update_instance` for every configured id.
    pub fn refresh_all(&mut self) -> RegistryResult<()> {
        if self.lifecycle == Lifecycle::Stopped {
            return Err(RegistryError::Stopped);
        }
        let count = self.provider.instance_settings()?.instance_count;
        for id in 1..=count {
            let _ = self.reconcile(id);
        }
        log::debug!("refreshed {} instance(s), {} handle(s) live", count, self.handles.len());
        Ok(())
    }

    fn reconcile(&mut self, id: InstanceId) -> RegistryResult<()> {
        let dir = self.provider.watched_directory(id)?;
        let activation = self.provider.activation(id)?;
        let directory = PathBuf::from(dir.directory_path.trim());

        let current = self.handles.get(&id).map(|h| h.directory().to_path_buf());
        match current {
            Some(current) if current == directory => {
                let filter = Self::filter_for(id, &dir.file_extension)?;
                let handle = &self.handles[&id];
                if handle.filter() != filter {
                    log::info!("instance {}: filter {} -> {}", id, handle.filter().as_str(), filter.as_str());
                    handle.set_filter(filter);
                }
                if handle.is_enabled() != activation.file_watcher_enabled {
                    log::info!("instance {}: watcher enabled = {}", id, activation.file_watcher_enabled);
                    handle.set_enabled(activation.file_watcher_enabled);
                }
                Ok(())
            }
            Some(_) => {
                log::info!("instance {}: directory changed to {}", id, directory.display());
                self.add_instance(id)
            }
            None => self.add_instance(id),
        }
    }

    fn backfill(&mut self, count: u32, skip: Option<InstanceId>) {
        for id in 1..=count {
            if Some(id) != skip && !self.handles.contains_key(&id) {
                let _ = self.add_instance(id);
            }
        }
    }

    // ── Stop ─────────────────────────────────────────────────────────────────

    /// Close every handle and the event channel, then wait for the router
    /// to hand off what was already queued. In-flight uploads keep going.
    /// Idempotent.
    pub async fn stop(&mut self) {
        if self.lifecycle == Lifecycle::Stopped {
            return;
        }
        for (_, mut handle) in std::mem::take(&mut self.handles) {
            handle.close();
        }
        self.events_tx = None;
        self.events_rx = None;
        self.options.outcomes = None;
        if let Some(router) = self.router.take() {
            if let Err(e) = router.await {
                log::error!("event router ended abnormally: {}", e);
            }
        }
        self.lifecycle = Lifecycle::Stopped;
        log::info!("registry stopped");
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn handle_snapshot(&self, id: InstanceId) -> Option<HandleSnapshot> {
        self.handles.get(&id).map(WatchHandle::snapshot)
    }

    pub fn snapshots(&self) -> Vec<HandleSnapshot> {
        self.handles.values().map(WatchHandle::snapshot).collect()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn close_handle(&mut self, id: InstanceId) {
        if let Some(mut old) = self.handles.remove(&id) {
            log::debug!("instance {}: closing handle on {}", id, old.directory().display());
            old.close();
        }
    }

    fn filter_for(id: InstanceId, extension: &str) -> RegistryResult<FileFilter> {
        FileFilter::from_extension(extension).map_err(|e| {
            let err = RegistryError::Configuration {
                id,
                message: format!("file extension '{}' is not a valid filter: {}", extension, e),
            };
            log::error!("{}", err);
            err
        })
    }

    fn instance_count_or_zero(&self) -> u32 {
        self.provider
            .instance_settings()
            .map(|s| s.instance_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::RecordingFactory;
    use std::path::Path;
    use std::time::Duration;
    use tokio::time::timeout;
    use uplift_core::{Protocol, SettingsStore};
    use uplift_ftp::mock_server::MockFtpServer;
    use uplift_settings::MemorySettingsStore;

    fn add_configured(store: &MemorySettingsStore, dir: &Path, ext: &str, enabled: bool) -> InstanceId {
        let id = store.register_instance().unwrap();
        let mut wd = store.watched_directory(id).unwrap();
        wd.directory_path = dir.display().to_string();
        wd.file_extension = ext.into();
        store.save_watched_directory(&wd).unwrap();
        let mut act = store.activation(id).unwrap();
        act.file_watcher_enabled = enabled;
        store.save_activation(&act).unwrap();
        id
    }

    fn recording_registry(
        store: Arc<MemorySettingsStore>,
    ) -> (RegistryState, mpsc::UnboundedReceiver<DispatchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let options = RegistryOptions {
            outcomes: Some(tx),
            ..RegistryOptions::default()
        };
        (
            InstanceRegistry::with_factory(store, Arc::new(RecordingFactory::default()), options),
            rx,
        )
    }

    async fn next_outcome(rx: &mut mpsc::UnboundedReceiver<DispatchOutcome>) -> DispatchOutcome {
        timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no outcome within 10s")
            .expect("outcome channel closed")
    }

    #[tokio::test]
    async fn test_start_with_no_instances() {
        let store = Arc::new(MemorySettingsStore::new());
        let (registry, _rx) = recording_registry(store);
        let mut reg = registry.lock().await;
        reg.start().await.unwrap();
        reg.start().await.unwrap();
        assert!(reg.is_running());
        assert_eq!(reg.handle_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_mirrors_settings_after_add() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, dir.path(), ".csv", true);
        let (registry, _rx) = recording_registry(store);
        let mut reg = registry.lock().await;

        reg.add_instance(id).unwrap();
        let snap = reg.handle_snapshot(id).unwrap();
        assert_eq!(snap.directory, dir.path());
        assert_eq!(snap.filter, "*.csv");
        assert!(snap.enabled);
    }

    #[tokio::test]
    async fn test_add_twice_keeps_one_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, dir.path(), ".csv", true);
        let (registry, mut rx) = recording_registry(store);
        let mut reg = registry.lock().await;

        reg.add_instance(id).unwrap();
        reg.add_instance(id).unwrap();
        assert_eq!(reg.handle_count(), 1);
        reg.start().await.unwrap();

        std::fs::write(dir.path().join("a.csv"), b"1").unwrap();
        let first = next_outcome(&mut rx).await;
        assert_eq!(first.event.path.file_name().unwrap(), "a.csv");
        std::fs::write(dir.path().join("b.csv"), b"2").unwrap();
        let second = next_outcome(&mut rx).await;
        // A duplicate handle would have produced a second a.csv first.
        assert_eq!(second.event.path.file_name().unwrap(), "b.csv");
    }

    #[tokio::test]
    async fn test_add_instance_zero_is_rejected() {
        let store = Arc::new(MemorySettingsStore::new());
        let (registry, _rx) = recording_registry(store);
        let mut reg = registry.lock().await;
        assert!(matches!(
            reg.add_instance(0),
            Err(RegistryError::InvalidInstanceId { id: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_update_out_of_range_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, dir.path(), ".csv", true);
        let (registry, _rx) = recording_registry(store);
        let mut reg = registry.lock().await;
        reg.start().await.unwrap();
        let before = reg.snapshots();

        assert!(matches!(
            reg.update_instance(0),
            Err(RegistryError::InvalidInstanceId { id: 0, count: 1 })
        ));
        assert!(matches!(
            reg.update_instance(id + 1),
            Err(RegistryError::InvalidInstanceId { id: 2, count: 1 })
        ));
        assert_eq!(reg.snapshots(), before);
    }

    #[tokio::test]
    async fn test_update_applies_filter_and_enabled_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, dir.path(), ".csv", true);
        let (registry, _rx) = recording_registry(store.clone());
        let mut reg = registry.lock().await;
        reg.start().await.unwrap();

        let mut wd = store.watched_directory(id).unwrap();
        wd.file_extension = ".xml".into();
        store.save_watched_directory(&wd).unwrap();
        let mut act = store.activation(id).unwrap();
        act.file_watcher_enabled = false;
        store.save_activation(&act).unwrap();

        reg.update_instance(id).unwrap();
        let snap = reg.handle_snapshot(id).unwrap();
        assert_eq!(snap.filter, "*.xml");
        assert!(!snap.enabled);
        assert_eq!(reg.handle_count(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_handle_when_directory_changes() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, first.path(), ".csv", true);
        let (registry, mut rx) = recording_registry(store.clone());
        let mut reg = registry.lock().await;
        reg.start().await.unwrap();

        let mut wd = store.watched_directory(id).unwrap();
        wd.directory_path = second.path().display().to_string();
        store.save_watched_directory(&wd).unwrap();
        reg.update_instance(id).unwrap();

        assert_eq!(reg.handle_snapshot(id).unwrap().directory, second.path());
        std::fs::write(first.path().join("old.csv"), b"1").unwrap();
        std::fs::write(second.path().join("new.csv"), b"1").unwrap();
        let outcome = next_outcome(&mut rx).await;
        assert_eq!(outcome.event.path.file_name().unwrap(), "new.csv");
    }

    #[tokio::test]
    async fn test_missing_directory_then_created() {
        let root = tempfile::tempdir().unwrap();
        let drop_dir = root.path().join("drop");
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, &drop_dir, ".csv", true);
        let (registry, _rx) = recording_registry(store);
        let mut reg = registry.lock().await;

        reg.start().await.unwrap();
        assert!(reg.handle_snapshot(id).is_none());
        assert!(matches!(
            reg.add_instance(id),
            Err(RegistryError::Configuration { id: 1, .. })
        ));

        std::fs::create_dir(&drop_dir).unwrap();
        reg.update_instance(id).unwrap();
        assert_eq!(reg.handle_snapshot(id).unwrap().directory, drop_dir);
    }

    #[tokio::test]
    async fn test_directory_removed_from_settings_drops_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, dir.path(), ".csv", true);
        let (registry, _rx) = recording_registry(store.clone());
        let mut reg = registry.lock().await;
        reg.start().await.unwrap();

        let mut wd = store.watched_directory(id).unwrap();
        wd.directory_path = dir.path().join("gone").display().to_string();
        store.save_watched_directory(&wd).unwrap();

        assert!(reg.update_instance(id).is_err());
        assert_eq!(reg.handle_count(), 0);
    }

    #[tokio::test]
    async fn test_update_backfills_missing_handles() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let first = add_configured(&store, a.path(), ".csv", true);
        let (registry, _rx) = recording_registry(store.clone());
        let mut reg = registry.lock().await;
        reg.start().await.unwrap();

        // Registered after start, as the CLI would.
        let second = add_configured(&store, b.path(), ".txt", true);
        reg.update_instance(first).unwrap();

        assert_eq!(reg.handle_count(), 2);
        assert_eq!(reg.handle_snapshot(second).unwrap().filter, "*.txt");
    }

    #[tokio::test]
    async fn test_refresh_all_picks_up_new_instances() {
        let a = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let (registry, _rx) = recording_registry(store.clone());
        let mut reg = registry.lock().await;
        reg.start().await.unwrap();

        add_configured(&store, a.path(), ".csv", true);
        reg.refresh_all().unwrap();
        assert_eq!(reg.handle_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_silences_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, dir.path(), ".csv", true);
        let (registry, mut rx) = recording_registry(store);
        let mut reg = registry.lock().await;
        reg.start().await.unwrap();

        reg.stop().await;
        reg.stop().await;
        assert_eq!(reg.handle_count(), 0);
        assert!(matches!(reg.add_instance(id), Err(RegistryError::Stopped)));

        std::fs::write(dir.path().join("late.csv"), b"1").unwrap();
        // Router is gone and with it every outcome sender.
        let next = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_follows_selector() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, dir.path(), ".csv", true);
        let mut act = store.activation(id).unwrap();
        act.sftp_enabled = true;
        store.save_activation(&act).unwrap();
        let (registry, mut rx) = recording_registry(store);
        registry.lock().await.start().await.unwrap();

        std::fs::write(dir.path().join("a.csv"), b"1").unwrap();
        let outcome = next_outcome(&mut rx).await;
        assert_eq!(outcome.event.instance_id, id);
        assert_eq!(outcome.protocol, Some(Protocol::Sftp));
        assert!(outcome.succeeded());
    }

    #[tokio::test]
    async fn test_end_to_end_upload_to_ftp() {
        let server = MockFtpServer::start("loader", "s3cret").await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemorySettingsStore::new());
        let id = add_configured(&store, dir.path(), ".csv", true);
        let mut ftp = store.ftp(id).unwrap();
        ftp.server = server.addr().to_string();
        ftp.username = "loader".into();
        ftp.password = "s3cret".into();
        ftp.destination_folder = "/in".into();
        store.save_ftp(&ftp).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let options = RegistryOptions {
            outcomes: Some(tx),
            ..RegistryOptions::default()
        };
        let registry = InstanceRegistry::new(store, options);
        registry.lock().await.start().await.unwrap();

        std::fs::write(dir.path().join("ignored.txt"), b"no").unwrap();
        std::fs::write(dir.path().join("a.csv"), b"id,qty\n7,3\n").unwrap();

        let outcome = next_outcome(&mut rx).await;
        assert_eq!(outcome.event.instance_id, 1);
        assert_eq!(outcome.event.path.file_name().unwrap(), "a.csv");
        assert_eq!(outcome.protocol, Some(Protocol::Ftp));
        let receipt = outcome.result.unwrap();
        assert_eq!(receipt.remote_path, "/in/a.csv");
        assert_eq!(server.file("/in/a.csv").unwrap(), b"id,qty\n7,3\n".to_vec());
        assert!(dir.path().join("a.csv").exists());

        registry.lock().await.stop().await;
    }
}
