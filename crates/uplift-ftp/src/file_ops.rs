//! STOR streaming.

use crate::client::FtpClient;
use crate::error::{FtpError, FtpResult};
use crate::transfer;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

/// Chunk size used when streaming a local file to the data channel.
const DEFAULT_CHUNK: usize = 64 * 1024;

impl FtpClient {
    /// Upload `local_path` to `remote_path` (absolute or relative to the
    /// login directory). Returns the number of bytes sent.
    ///
    /// Success means the server acknowledged the transfer with a 2xx
    /// after the data connection was closed.
    pub async fn store_file(&mut self, local_path: &Path, remote_path: &str) -> FtpResult<u64> {
        let mut file = fs::File::open(local_path).await?;

        // Open data channel + issue STOR
        let data_timeout = self.data_timeout();
        let mut tcp = transfer::open_data_channel(
            &mut self.codec,
            self.options.data_channel_mode,
            &self.endpoint.host,
            data_timeout,
        )
        .await?;
        let resp = self.command(&format!("STOR {}", remote_path)).await?;
        if !resp.is_preliminary() && !resp.is_completion() {
            return Err(FtpError::from_reply(resp.code, &resp.text()));
        }

        let mut transferred: u64 = 0;
        let mut buf = vec![0u8; DEFAULT_CHUNK];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            timeout(data_timeout, tcp.write_all(&buf[..n]))
                .await
                .map_err(|_| FtpError::timeout("data channel write timed out"))??;
            transferred += n as u64;
        }
        tcp.flush().await?;
        tcp.shutdown().await?;
        drop(tcp);

        // 150 was preliminary; the completion reply follows the data close.
        if resp.is_preliminary() {
            let done = timeout(data_timeout, self.codec.read_response())
                .await
                .map_err(|_| FtpError::timeout("no transfer-complete reply"))??;
            if !done.is_completion() {
                return Err(FtpError::from_reply(done.code, &done.text()));
            }
        }

        log::debug!(
            "ftp[{}] stored {} ({} bytes)",
            self.id,
            remote_path,
            transferred
        );
        Ok(transferred)
    }
}
