//! Live reload: re-reconcile every instance when the settings document
//! changes on disk.
//!
//! The store writes through a temp file + rename, so the parent
//! directory is watched and events are filtered by file name. Bursts
//! are coalesced into one `refresh_all`.

use anyhow::Context;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uplift_engine::RegistryState;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

pub struct SettingsReloader {
    watcher: Option<RecommendedWatcher>,
    task: Option<JoinHandle<()>>,
    store_path: PathBuf,
}

impl SettingsReloader {
    pub fn spawn(store_path: &Path, registry: RegistryState, debounce: Duration) -> anyhow::Result<Self> {
        let file_name = store_path
            .file_name()
            .map(OsString::from)
            .with_context(|| format!("settings path {} has no file name", store_path.display()))?;
        let parent = match store_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("creating settings directory {}", parent.display()))?;

        let (tx, rx) = mpsc::unbounded_channel::<()>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &file_name) => {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => log::warn!("settings watcher error: {}", e),
            },
            Config::default(),
        )
        .context("creating settings watcher")?;
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {}", parent.display()))?;

        let task = tokio::spawn(reload_loop(rx, registry, debounce));
        log::info!("live reload enabled for {}", store_path.display());

        Ok(Self {
            watcher: Some(watcher),
            task: Some(task),
            store_path: store_path.to_path_buf(),
        })
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Stop watching and wait for a pending refresh to finish.
    pub async fn shutdown(mut self) {
        // Dropping the watcher drops the sender and ends the loop.
        self.watcher = None;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("reload task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SettingsReloader {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name().map(|n| n == file_name.as_os_str()).unwrap_or(false))
}

async fn reload_loop(mut rx: mpsc::UnboundedReceiver<()>, registry: RegistryState, debounce: Duration) {
    while rx.recv().await.is_some() {
        // Coalesce until the document has been quiet for `debounce`.
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let mut registry = registry.lock().await;
        match registry.refresh_all() {
            Ok(()) => log::info!("settings changed, {} instance(s) watching", registry.handle_count()),
            Err(e) => log::warn!("settings reload failed: {}", e),
        }
    }
}
