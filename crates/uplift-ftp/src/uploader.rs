//! `Uploader` implementation over FTP.

use crate::client::FtpClient;
use crate::types::{FtpClientOptions, FtpEndpoint};
use async_trait::async_trait;
use std::path::Path;
use uplift_core::{
    file_name_of, join_remote, FtpSettings, Protocol, TransferPhase, UploadError, UploadReceipt, UploadResult,
    Uploader,
};

/// Uploads each file over a fresh FTP session built from one instance's
/// [`FtpSettings`].
#[derive(Debug, Clone)]
pub struct FtpUploader {
    settings: FtpSettings,
    options: FtpClientOptions,
}

impl FtpUploader {
    pub fn new(settings: FtpSettings) -> Self {
        Self::with_options(settings, FtpClientOptions::default())
    }

    pub fn with_options(settings: FtpSettings, options: FtpClientOptions) -> Self {
        Self { settings, options }
    }

    pub fn settings(&self) -> &FtpSettings {
        &self.settings
    }
}

#[async_trait]
impl Uploader for FtpUploader {
    fn protocol(&self) -> Protocol {
        Protocol::Ftp
    }

    async fn upload(&self, local_path: &Path) -> UploadResult<UploadReceipt> {
        // ── Idle: validate before touching the network ───────────
        let file_name = file_name_of(local_path)?;
        let meta = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| UploadError::local_io(format!("{}: {}", local_path.display(), e)))?;
        if !meta.is_file() {
            return Err(UploadError::local_io(format!("{} is not a regular file", local_path.display())));
        }
        let endpoint =
            FtpEndpoint::from_settings(&self.settings).map_err(|e| e.into_upload_error(TransferPhase::Idle))?;
        let remote_path = join_remote(&endpoint.destination_folder, &file_name);

        // ── Connecting ───────────────────────────────────────────
        let mut client = FtpClient::connect(endpoint, self.options.clone())
            .await
            .map_err(|e| e.into_upload_error(TransferPhase::Connecting))?;

        // ── Transferring ─────────────────────────────────────────
        let stored = client.store_file(local_path, &remote_path).await;
        let session = client.id.clone();
        client.quit().await;

        let bytes = stored.map_err(|e| e.into_upload_error(TransferPhase::Transferring))?;
        log::info!(
            "ftp[{}] uploaded {} to {} ({} bytes)",
            session,
            local_path.display(),
            remote_path,
            bytes
        );
        Ok(UploadReceipt {
            protocol: Protocol::Ftp,
            local_path: local_path.to_path_buf(),
            remote_path,
            bytes,
        })
    }
}
