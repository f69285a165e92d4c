//! Daemon wiring.
//!
//! Owns the settings store, the instance registry, the outcome logger and
//! (optionally) the live-reload watcher.

use crate::config::AppConfig;
use crate::reload::{SettingsReloader, DEFAULT_DEBOUNCE};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uplift_engine::{DispatchOutcome, InstanceRegistry, RegistryOptions, RegistryState};
use uplift_settings::JsonSettingsStore;

pub struct Daemon {
    registry: RegistryState,
    reloader: Option<SettingsReloader>,
    outcome_logger: JoinHandle<()>,
}

impl Daemon {
    /// Open the store, start the registry and, if asked, watch the store
    /// for edits. A registry that cannot read the store yet is left
    /// running so a later reload can recover.
    pub async fn start(config: &AppConfig, live_reload: bool) -> anyhow::Result<Self> {
        let store = Arc::new(JsonSettingsStore::open(&config.store.path));
        if !store.exists() {
            tracing::warn!(path = %config.store.path.display(), "settings store does not exist yet");
        }

        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let options = RegistryOptions {
            dispatch_mode: config.dispatch.dispatch_mode(),
            outcomes: Some(outcomes_tx),
        };
        let registry = InstanceRegistry::new(store, options);

        if let Err(e) = registry.lock().await.start().await {
            tracing::error!(error = %e, "registry started with errors");
        }

        let reloader = if live_reload {
            Some(SettingsReloader::spawn(&config.store.path, registry.clone(), DEFAULT_DEBOUNCE)?)
        } else {
            None
        };

        Ok(Self {
            registry,
            reloader,
            outcome_logger: tokio::spawn(log_outcomes(outcomes_rx)),
        })
    }

    pub fn registry(&self) -> RegistryState {
        self.registry.clone()
    }

    pub async fn shutdown(self) {
        if let Some(reloader) = self.reloader {
            reloader.shutdown().await;
        }
        self.registry.lock().await.stop().await;
        // The registry drops its outcome sender on stop.
        if let Err(e) = self.outcome_logger.await {
            tracing::error!(error = %e, "outcome logger ended abnormally");
        }
        tracing::info!("daemon stopped");
    }
}

async fn log_outcomes(mut rx: mpsc::UnboundedReceiver<DispatchOutcome>) {
    while let Some(outcome) = rx.recv().await {
        let path = outcome.event.path.display().to_string();
        match &outcome.result {
            Ok(receipt) => tracing::info!(
                instance = outcome.event.instance_id,
                path = %path,
                protocol = %receipt.protocol,
                remote = %receipt.remote_path,
                bytes = receipt.bytes,
                "uploaded"
            ),
            Err(e) => tracing::warn!(
                instance = outcome.event.instance_id,
                path = %path,
                error = %e,
                "upload failed"
            ),
        }
    }
}

/// Run until Ctrl+C (or SIGTERM on unix), then shut down cleanly.
pub async fn run_until_signal(config: AppConfig, live_reload: bool) -> anyhow::Result<()> {
    let daemon = Daemon::start(&config, live_reload).await?;
    tracing::info!(
        store = %config.store.path.display(),
        live_reload,
        "uplifter running, press Ctrl+C to stop"
    );

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }

    daemon.shutdown().await;
    Ok(())
}
