//! Watch handle: one native directory subscription per instance.
//!
//! notify calls back on its own thread. The callback filters by event
//! kind, the live filter and the live enabled flag, then forwards an
//! [`UploadEvent`] into the registry's channel.

use crate::error::{RegistryError, RegistryResult};
use crate::filter::FileFilter;
use notify::event::CreateKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::UnboundedSender;
use uplift_core::{InstanceId, UploadEvent};

/// State shared with the notify callback.
struct LiveState {
    instance_id: InstanceId,
    enabled: AtomicBool,
    filter: RwLock<FileFilter>,
    /// `None` once closed; the callback sends only while holding the read
    /// lock, so nothing is emitted after `close` returns.
    sink: RwLock<Option<UnboundedSender<UploadEvent>>>,
}

impl LiveState {
    fn on_event(&self, result: notify::Result<Event>) {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                log::warn!("instance {}: watcher error: {}", self.instance_id, e);
                return;
            }
        };
        if !matches!(event.kind, EventKind::Create(kind) if kind != CreateKind::Folder) {
            return;
        }
        if !self.enabled.load(Ordering::SeqCst) {
            return;
        }

        let sink = self.sink.read().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = sink.as_ref() else {
            return;
        };
        let filter = self.filter.read().unwrap_or_else(|e| e.into_inner());
        for path in event.paths {
            if path.is_dir() || !filter.matches(&path) {
                continue;
            }
            log::debug!("instance {}: detected {}", self.instance_id, path.display());
            if tx.send(UploadEvent::new(self.instance_id, path)).is_err() {
                log::debug!("instance {}: event channel closed", self.instance_id);
            }
        }
    }
}

/// Live view of a handle for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleSnapshot {
    pub instance_id: InstanceId,
    pub directory: PathBuf,
    pub filter: String,
    pub enabled: bool,
}

pub struct WatchHandle {
    directory: PathBuf,
    live: Arc<LiveState>,
    watcher: Option<RecommendedWatcher>,
}

impl WatchHandle {
    /// Subscribe to file creation directly under `directory`.
    pub fn open(
        instance_id: InstanceId,
        directory: PathBuf,
        filter: FileFilter,
        enabled: bool,
        sink: UnboundedSender<UploadEvent>,
    ) -> RegistryResult<Self> {
        let live = Arc::new(LiveState {
            instance_id,
            enabled: AtomicBool::new(enabled),
            filter: RwLock::new(filter),
            sink: RwLock::new(Some(sink)),
        });

        let callback_state = live.clone();
        let watch_error = |source| RegistryError::Watch {
            id: instance_id,
            path: directory.display().to_string(),
            source,
        };
        let mut watcher = RecommendedWatcher::new(
            move |result| callback_state.on_event(result),
            Config::default(),
        )
        .map_err(watch_error)?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        Ok(Self {
            directory,
            live,
            watcher: Some(watcher),
        })
    }

    pub fn instance_id(&self) -> InstanceId {
        self.live.instance_id
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filter(&self) -> FileFilter {
        self.live.filter.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_filter(&self, filter: FileFilter) {
        *self.live.filter.write().unwrap_or_else(|e| e.into_inner()) = filter;
    }

    pub fn is_enabled(&self) -> bool {
        self.live.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.live.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> HandleSnapshot {
        HandleSnapshot {
            instance_id: self.instance_id(),
            directory: self.directory.clone(),
            filter: self.filter().as_str().to_string(),
            enabled: self.is_enabled(),
        }
    }

    /// Disable, drop the event sink and release the OS subscription.
    /// Idempotent.
    pub fn close(&mut self) {
        self.set_enabled(false);
        self.live.sink.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.directory) {
                log::debug!("instance {}: unwatch {}: {}", self.instance_id(), self.directory.display(), e);
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.close();
    }
}
