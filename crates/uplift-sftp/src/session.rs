//! Blocking SSH/SFTP session used for one upload.
//!
//! Everything here calls into libssh2 synchronously; callers run it on
//! the blocking pool.

use crate::types::{SftpAuth, SftpClientOptions, SftpEndpoint};
use ssh2::Session;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use uplift_core::{TransferPhase, UploadError, UploadResult};
use uuid::Uuid;

pub struct SftpSession {
    pub id: String,
    /// `None` once disconnected.
    session: Option<Session>,
    authority: String,
    chunk_size: usize,
}

impl SftpSession {
    // ── Connect ──────────────────────────────────────────────────────────────

    /// TCP connect, SSH handshake and authentication.
    pub fn open(endpoint: &SftpEndpoint, options: &SftpClientOptions) -> UploadResult<Self> {
        let authority = endpoint.authority();
        log::debug!("SFTP connecting to {} as {} ({})", authority, endpoint.username, endpoint.auth);

        let tcp = connect_tcp(endpoint, Duration::from_secs(options.connect_timeout_secs))?;

        let mut session =
            Session::new().map_err(|e| UploadError::connect(format!("Failed to create SSH session: {}", e)))?;
        if options.io_timeout_secs > 0 {
            session.set_timeout(options.io_timeout_secs.saturating_mul(1000).min(u32::MAX as u64) as u32);
        }
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| UploadError::connect(format!("SSH handshake with {} failed: {}", authority, e)))?;

        let this = Self {
            id: Uuid::new_v4().to_string(),
            session: Some(session),
            authority,
            chunk_size: options.chunk_size.max(1),
        };

        // On failure `this` drops here and disconnects.
        let method = this.authenticate(endpoint)?;
        log::info!("SFTP[{}] authenticated to {} via {}", this.id, this.authority, method);
        Ok(this)
    }

    // ── Authentication ───────────────────────────────────────────────────────

    fn authenticate(&self, endpoint: &SftpEndpoint) -> UploadResult<&'static str> {
        let session = self.live()?;
        let user = endpoint.username.as_str();

        let (key, password) = match &endpoint.auth {
            SftpAuth::Password(pw) => (None, Some(pw.as_str())),
            SftpAuth::KeyFile { path, password } => (Some(path.as_path()), password.as_deref()),
        };

        if let Some(key) = key {
            match session.userauth_pubkey_file(user, None, key, None) {
                Ok(()) if session.authenticated() => return Ok("publickey"),
                Ok(()) => {}
                Err(e) => log::warn!("SFTP public-key auth with {} failed: {}", key.display(), e),
            }
        }

        if let Some(password) = password {
            if let Err(e) = session.userauth_password(user, password) {
                log::debug!("SFTP password auth for {} rejected: {}", user, e);
            }
            if session.authenticated() {
                return Ok("password");
            }
        }

        Err(UploadError::auth(format!(
            "{}@{} not authenticated after auth attempt",
            user, self.authority
        )))
    }

    // ── Upload ───────────────────────────────────────────────────────────────

    /// Stream `local_path` into `remote_path`, creating or truncating it.
    pub fn put_file(&mut self, local_path: &Path, remote_path: &str) -> UploadResult<u64> {
        let session = self.live()?;
        let sftp = session.sftp().map_err(|e| {
            UploadError::protocol(TransferPhase::Connected, format!("SFTP subsystem unavailable: {}", e))
        })?;

        let mut local_file = std::fs::File::open(local_path)
            .map_err(|e| UploadError::local_io(format!("Failed to open '{}': {}", local_path.display(), e)))?;

        let open_flags = ssh2::OpenFlags::WRITE | ssh2::OpenFlags::CREATE | ssh2::OpenFlags::TRUNCATE;
        let mut remote_file = sftp
            .open_mode(Path::new(remote_path), open_flags, 0o644, ssh2::OpenType::File)
            .map_err(|e| UploadError::transfer(format!("Failed to open remote '{}': {}", remote_path, e)))?;

        let mut transferred: u64 = 0;
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = local_file
                .read(&mut buf)
                .map_err(|e| UploadError::local_io(format!("Read error: {}", e)).at(TransferPhase::Transferring))?;
            if n == 0 {
                break;
            }
            remote_file
                .write_all(&buf[..n])
                .map_err(|e| UploadError::transfer(format!("Write error on '{}': {}", remote_path, e)))?;
            transferred += n as u64;
        }
        remote_file
            .flush()
            .map_err(|e| UploadError::transfer(format!("Flush error on '{}': {}", remote_path, e)))?;
        // Closing the handle is where the server reports a failed write.
        remote_file
            .close()
            .map_err(|e| UploadError::transfer(format!("Close error on '{}': {}", remote_path, e)))?;

        Ok(transferred)
    }

    // ── Disconnect ───────────────────────────────────────────────────────────

    /// Idempotent; only the first call reaches the server. A session
    /// that never authenticated is dropped without a goodbye.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            if !session.authenticated() {
                return;
            }
            if let Err(e) = session.disconnect(None, "upload finished", None) {
                log::debug!("SFTP[{}] disconnect from {}: {}", self.id, self.authority, e);
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn live(&self) -> UploadResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| UploadError::protocol(TransferPhase::Closed, "session already disconnected"))
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn connect_tcp(endpoint: &SftpEndpoint, timeout: Duration) -> UploadResult<TcpStream> {
    let authority = endpoint.authority();
    let addrs = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|e| UploadError::connect(format!("Cannot resolve {}: {}", authority, e)))?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => return Ok(tcp),
            Err(e) => last_err = Some(e),
        }
    }
    Err(UploadError::connect(match last_err {
        Some(e) => format!("TCP connection to {} failed: {}", authority, e),
        None => format!("{} resolved to no addresses", authority),
    }))
}
