//! `Uploader` implementation over SFTP.

use crate::session::SftpSession;
use crate::types::{SftpClientOptions, SftpEndpoint};
use async_trait::async_trait;
use std::path::Path;
use uplift_core::{
    file_name_of, join_remote, Protocol, SftpSettings, TransferPhase, UploadError, UploadReceipt, UploadResult,
    Uploader,
};

/// Uploads each file over a fresh SSH session built from one instance's
/// [`SftpSettings`].
#[derive(Debug, Clone)]
pub struct SftpUploader {
    settings: SftpSettings,
    options: SftpClientOptions,
}

impl SftpUploader {
    pub fn new(settings: SftpSettings) -> Self {
        Self::with_options(settings, SftpClientOptions::default())
    }

    pub fn with_options(settings: SftpSettings, options: SftpClientOptions) -> Self {
        Self { settings, options }
    }

    pub fn settings(&self) -> &SftpSettings {
        &self.settings
    }
}

#[async_trait]
impl Uploader for SftpUploader {
    fn protocol(&self) -> Protocol {
        Protocol::Sftp
    }

    async fn upload(&self, local_path: &Path) -> UploadResult<UploadReceipt> {
        let file_name = file_name_of(local_path)?;
        let meta = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| UploadError::local_io(format!("{}: {}", local_path.display(), e)))?;
        if !meta.is_file() {
            return Err(UploadError::local_io(format!("{} is not a regular file", local_path.display())));
        }
        let endpoint = SftpEndpoint::from_settings(&self.settings)?;
        let remote_path = join_remote(&endpoint.remote_path, &file_name);

        let options = self.options.clone();
        let local = local_path.to_path_buf();
        let remote = remote_path.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            let mut session = SftpSession::open(&endpoint, &options)?;
            let result = session.put_file(&local, &remote);
            session.disconnect();
            result
        })
        .await
        .map_err(|e| UploadError::protocol(TransferPhase::Transferring, format!("SFTP worker failed: {}", e)))??;

        log::info!(
            "SFTP uploaded {} to {}:{} ({} bytes)",
            local_path.display(),
            self.settings.host,
            remote_path,
            bytes
        );
        Ok(UploadReceipt {
            protocol: Protocol::Sftp,
            local_path: local_path.to_path_buf(),
            remote_path,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uplift_core::UploadErrorKind;

    fn local_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("report.csv");
        std::fs::File::create(&path).unwrap().write_all(b"a,b\n").unwrap();
        path
    }

    fn unused_port() -> u16 {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_missing_local_file_is_local_io() {
        let uploader = SftpUploader::new(SftpSettings::default());
        let err = uploader.upload(Path::new("/no/such/file.csv")).await.unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::LocalIo);
        assert_eq!(err.phase, TransferPhase::Idle);
    }

    #[tokio::test]
    async fn test_empty_host_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SftpSettings {
            host: String::new(),
            ..SftpSettings::default()
        };
        let err = SftpUploader::new(settings).upload(&local_file(&dir)).await.unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::InvalidConfig);
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SftpSettings {
            host: "127.0.0.1".into(),
            port: unused_port(),
            ..SftpSettings::default()
        };
        let err = SftpUploader::new(settings).upload(&local_file(&dir)).await.unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::Connect);
        assert!(!SftpUploader::new(SftpSettings::default()).upload_file(Path::new("/no/such")).await);
    }

    #[tokio::test]
    async fn test_non_ssh_peer_fails_handshake() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            if let Ok((mut sock, _)) = listener.accept() {
                let _ = sock.write_all(b"220 this is not ssh\r\n");
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let settings = SftpSettings {
            host: "127.0.0.1".into(),
            port,
            ..SftpSettings::default()
        };
        let err = SftpUploader::new(settings).upload(&local_file(&dir)).await.unwrap_err();
        assert_eq!(err.kind, UploadErrorKind::Connect);
        assert_eq!(err.phase, TransferPhase::Connecting);
    }
}
