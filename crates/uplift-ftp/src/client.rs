//! One FTP control session: connect, log in, switch to binary, quit.

use crate::connection;
use crate::error::{FtpError, FtpResult};
use crate::protocol::FtpCodec;
use crate::types::{FtpClientOptions, FtpEndpoint, FtpResponse};
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

/// A connected, logged-in FTP session.
pub struct FtpClient {
    /// Correlates log lines of one session.
    pub id: String,
    pub(crate) codec: FtpCodec,
    pub(crate) endpoint: FtpEndpoint,
    pub(crate) options: FtpClientOptions,
}

impl FtpClient {
    /// Establish a new FTP session ready for binary transfers.
    pub async fn connect(endpoint: FtpEndpoint, options: FtpClientOptions) -> FtpResult<Self> {
        let session_id = Uuid::new_v4().to_string();
        let reply_timeout = Duration::from_secs(options.connect_timeout_sec);
        let (codec, banner) = connection::connect(&endpoint, reply_timeout).await?;
        log::debug!(
            "ftp[{}] connected to {}: {}",
            session_id,
            endpoint.authority(),
            banner.text()
        );

        let mut client = Self {
            id: session_id,
            codec,
            endpoint,
            options,
        };

        // On failure here the caller never gets the client, so close the
        // control connection before bailing out.
        if let Err(e) = client.login().await {
            client.quit().await;
            return Err(e);
        }
        Ok(client)
    }

    // ── Authenticate ─────────────────────────────────────────────

    async fn login(&mut self) -> FtpResult<()> {
        let user_cmd = format!("USER {}", self.endpoint.username);
        let user_resp = self.command(&user_cmd).await?;
        if user_resp.code == 331 {
            // Server wants a password
            let pass_cmd = format!("PASS {}", self.endpoint.password);
            let pass_resp = self.command(&pass_cmd).await?;
            if !pass_resp.is_completion() {
                return Err(FtpError::auth_failed(format!("Login failed: {}", pass_resp.text()))
                    .with_code(pass_resp.code));
            }
        } else if !user_resp.is_completion() {
            return Err(
                FtpError::auth_failed(format!("USER rejected: {}", user_resp.text())).with_code(user_resp.code),
            );
        }

        // ── TYPE ─────────────────────────────────────────────────
        let type_resp = self.command("TYPE I").await?;
        if !type_resp.is_completion() {
            return Err(FtpError::from_reply(type_resp.code, &type_resp.text()));
        }

        log::debug!("ftp[{}] logged in as {}", self.id, self.endpoint.username);
        Ok(())
    }

    /// Send a command and wait at most the control timeout for its reply.
    pub(crate) async fn command(&mut self, cmd: &str) -> FtpResult<FtpResponse> {
        self.with_reply_timeout(cmd, self.reply_timeout()).await
    }

    pub(crate) async fn with_reply_timeout(&mut self, cmd: &str, limit: Duration) -> FtpResult<FtpResponse> {
        let verb = cmd.split_whitespace().next().unwrap_or(cmd).to_string();
        timeout(limit, self.codec.execute(cmd))
            .await
            .map_err(|_| FtpError::timeout(format!("no reply to {} within {:?}", verb, limit)))?
    }

    pub(crate) fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.options.connect_timeout_sec)
    }

    pub(crate) fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.options.data_timeout_sec)
    }

    // ── QUIT ─────────────────────────────────────────────────────

    /// Say goodbye and close the control connection. Never fails; the
    /// session is over either way.
    pub async fn quit(mut self) {
        let limit = self.reply_timeout();
        match self.with_reply_timeout("QUIT", limit).await {
            Ok(resp) => log::debug!("ftp[{}] quit: {}", self.id, resp.text()),
            Err(e) => log::debug!("ftp[{}] quit without reply: {}", self.id, e),
        }
        self.codec.shutdown().await;
    }
}
