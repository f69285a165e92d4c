//! Event → transport dispatch.
//!
//! The activation record of the event's instance picks exactly one
//! transport (SFTP wins over FTP); the upload then runs to completion.
//! Nothing is retried and the local file is never touched.

use crate::error::DispatchError;
use std::sync::Arc;
use uplift_core::{
    FtpSettings, InstanceId, Protocol, SettingsError, SettingsProvider, SftpSettings, UploadEvent, UploadReceipt,
    UploadTarget, Uploader,
};
use uplift_ftp::{FtpClientOptions, FtpUploader};
use uplift_sftp::{SftpClientOptions, SftpUploader};

/// Builds a transport for one upload.
pub trait UploaderFactory: Send + Sync {
    fn ftp(&self, settings: FtpSettings) -> Box<dyn Uploader>;
    fn sftp(&self, settings: SftpSettings) -> Box<dyn Uploader>;

    fn build(&self, target: UploadTarget) -> Box<dyn Uploader> {
        match target {
            UploadTarget::Ftp(settings) => self.ftp(settings),
            UploadTarget::Sftp(settings) => self.sftp(settings),
        }
    }
}

/// Real network transports.
#[derive(Debug, Clone, Default)]
pub struct NetworkUploaderFactory {
    pub ftp_options: FtpClientOptions,
    pub sftp_options: SftpClientOptions,
}

impl UploaderFactory for NetworkUploaderFactory {
    fn ftp(&self, settings: FtpSettings) -> Box<dyn Uploader> {
        Box::new(FtpUploader::with_options(settings, self.ftp_options.clone()))
    }

    fn sftp(&self, settings: SftpSettings) -> Box<dyn Uploader> {
        Box::new(SftpUploader::with_options(settings, self.sftp_options.clone()))
    }
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub event: UploadEvent,
    /// Transport that ran, if any.
    pub protocol: Option<Protocol>,
    pub result: Result<UploadReceipt, DispatchError>,
}

impl DispatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn SettingsProvider>,
    factory: Arc<dyn UploaderFactory>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn SettingsProvider>, factory: Arc<dyn UploaderFactory>) -> Self {
        Self { provider, factory }
    }

    pub async fn dispatch(&self, event: UploadEvent) -> DispatchOutcome {
        let id = event.instance_id;

        let target = match self.resolve_target(id) {
            Ok(Some(target)) => target,
            Ok(None) => {
                log::info!(
                    "instance {}: no transport enabled, skipping {}",
                    id,
                    event.path.display()
                );
                return DispatchOutcome {
                    event,
                    protocol: None,
                    result: Err(DispatchError::NoTransport),
                };
            }
            Err(e) => {
                log::error!("instance {}: cannot read settings for {}: {}", id, event.path.display(), e);
                return DispatchOutcome {
                    event,
                    protocol: None,
                    result: Err(e.into()),
                };
            }
        };

        let protocol = target.protocol();
        let uploader = self.factory.build(target);
        let result = uploader.upload(&event.path).await;
        match &result {
            Ok(receipt) => log::info!(
                "instance {}: {} upload of {} succeeded ({} bytes to {})",
                id,
                protocol,
                event.path.display(),
                receipt.bytes,
                receipt.remote_path
            ),
            Err(e) => log::error!(
                "instance {}: {} upload of {} failed: {}",
                id,
                protocol,
                event.path.display(),
                e
            ),
        }

        DispatchOutcome {
            event,
            protocol: Some(protocol),
            result: result.map_err(DispatchError::from),
        }
    }

    /// The destination the activation record of `id` selects, or `None`
    /// when no transport is enabled.
    pub fn resolve_target(&self, id: InstanceId) -> Result<Option<UploadTarget>, SettingsError> {
        let selector = self.provider.activation(id)?.transport();
        Ok(match selector.protocol() {
            Some(Protocol::Sftp) => Some(UploadTarget::Sftp(self.provider.sftp(id)?)),
            Some(Protocol::Ftp) => Some(UploadTarget::Ftp(self.provider.ftp(id)?)),
            None => None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use uplift_core::{SettingsStore, UploadResult};
    use uplift_settings::MemorySettingsStore;

    /// Records which transport was asked to upload what.
    #[derive(Default)]
    pub(crate) struct RecordingFactory {
        pub calls: Arc<Mutex<Vec<(Protocol, String)>>>,
    }

    struct Recording {
        protocol: Protocol,
        calls: Arc<Mutex<Vec<(Protocol, String)>>>,
    }

    #[async_trait]
    impl Uploader for Recording {
        fn protocol(&self) -> Protocol {
            self.protocol
        }

        async fn upload(&self, local_path: &Path) -> UploadResult<UploadReceipt> {
            self.calls
                .lock()
                .unwrap()
                .push((self.protocol, local_path.display().to_string()));
            Ok(UploadReceipt {
                protocol: self.protocol,
                local_path: local_path.to_path_buf(),
                remote_path: "/remote".into(),
                bytes: 0,
            })
        }
    }

    impl UploaderFactory for RecordingFactory {
        fn ftp(&self, _settings: FtpSettings) -> Box<dyn Uploader> {
            Box::new(Recording {
                protocol: Protocol::Ftp,
                calls: self.calls.clone(),
            })
        }

        fn sftp(&self, _settings: SftpSettings) -> Box<dyn Uploader> {
            Box::new(Recording {
                protocol: Protocol::Sftp,
                calls: self.calls.clone(),
            })
        }
    }

    fn store_with(ftp: bool, sftp: bool) -> Arc<MemorySettingsStore> {
        let store = Arc::new(MemorySettingsStore::new());
        let mut act = store.activation(1).unwrap();
        act.ftp_enabled = ftp;
        act.sftp_enabled = sftp;
        store.save_activation(&act).unwrap();
        store
    }

    async fn dispatch_once(ftp: bool, sftp: bool) -> (DispatchOutcome, Vec<(Protocol, String)>) {
        let factory = Arc::new(RecordingFactory::default());
        let calls = factory.calls.clone();
        let dispatcher = Dispatcher::new(store_with(ftp, sftp), factory);
        let outcome = dispatcher.dispatch(UploadEvent::new(1, "/drop/a.csv")).await;
        let calls = calls.lock().unwrap().clone();
        (outcome, calls)
    }

    #[tokio::test]
    async fn test_sftp_selector_runs_sftp_only() {
        let (outcome, calls) = dispatch_once(true, true).await;
        assert!(outcome.succeeded());
        assert_eq!(outcome.protocol, Some(Protocol::Sftp));
        assert_eq!(calls, vec![(Protocol::Sftp, "/drop/a.csv".to_string())]);
    }

    #[tokio::test]
    async fn test_ftp_selector_runs_ftp_only() {
        let (outcome, calls) = dispatch_once(true, false).await;
        assert_eq!(outcome.protocol, Some(Protocol::Ftp));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Protocol::Ftp);
    }

    #[tokio::test]
    async fn test_no_transport_runs_nothing() {
        let (outcome, calls) = dispatch_once(false, false).await;
        assert!(!outcome.succeeded());
        assert!(matches!(outcome.result, Err(DispatchError::NoTransport)));
        assert!(calls.is_empty());
    }

    #[test]
    fn test_resolve_target_carries_the_selected_record() {
        let store = store_with(true, true);
        let mut sftp = store.sftp(1).unwrap();
        sftp.host = "files.corp.test".into();
        store.save_sftp(&sftp).unwrap();
        let dispatcher = Dispatcher::new(store.clone(), Arc::new(RecordingFactory::default()));

        match dispatcher.resolve_target(1).unwrap() {
            Some(UploadTarget::Sftp(s)) => assert_eq!(s.host, "files.corp.test"),
            other => panic!("expected SFTP target, got {:?}", other),
        }

        let mut act = store.activation(1).unwrap();
        act.sftp_enabled = false;
        store.save_activation(&act).unwrap();
        let target = dispatcher.resolve_target(1).unwrap().unwrap();
        assert_eq!(target.protocol(), Protocol::Ftp);

        act.ftp_enabled = false;
        store.save_activation(&act).unwrap();
        assert!(dispatcher.resolve_target(1).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_real_transport_failure_is_reported() {
        let store = store_with(true, false);
        let dispatcher = Dispatcher::new(store, Arc::new(NetworkUploaderFactory::default()));

        let outcome = dispatcher
            .dispatch(UploadEvent::new(1, "/no/such/dir/a.csv"))
            .await;
        match outcome.result {
            Err(DispatchError::Upload(e)) => assert_eq!(e.kind, uplift_core::UploadErrorKind::LocalIo),
            other => panic!("expected local I/O failure, got {:?}", other),
        }
    }
}
