//! TCP control connection.

use crate::error::{FtpError, FtpResult};
use crate::protocol::FtpCodec;
use crate::types::{FtpEndpoint, FtpResponse};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Open the control connection and read the server banner.
///
/// Returns the codec and the 220 greeting.
pub async fn connect(endpoint: &FtpEndpoint, connect_timeout: Duration) -> FtpResult<(FtpCodec, FtpResponse)> {
    let addr = endpoint.authority();

    let tcp = timeout(connect_timeout, TcpStream::connect((endpoint.host.as_str(), endpoint.port)))
        .await
        .map_err(|_| FtpError::timeout(format!("TCP connect to {} timed out", addr)))?
        .map_err(|e| FtpError::connection_failed(format!("TCP connect to {}: {}", addr, e)))?;

    tcp.set_nodelay(true).ok();

    let mut codec = FtpCodec::new(tcp);
    let banner = timeout(connect_timeout, codec.read_response())
        .await
        .map_err(|_| FtpError::timeout(format!("no banner from {}", addr)))??;
    if banner.code != 220 {
        return Err(FtpError::from_reply(banner.code, &banner.text()));
    }
    Ok((codec, banner))
}
