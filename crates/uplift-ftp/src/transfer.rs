//! Data-channel establishment.
//!
//! Supports:
//! - **PASV** (RFC 959): server opens a port; client connects to it.
//! - **EPSV** (RFC 2428): extended passive, IPv6-friendly.

use crate::error::{FtpError, FtpResult};
use crate::protocol::FtpCodec;
use crate::types::DataChannelMode;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Open a data connection according to `mode`.
///
/// `host` is the control-connection host; EPSV data connections go back
/// to it.
pub async fn open_data_channel(
    codec: &mut FtpCodec,
    mode: DataChannelMode,
    host: &str,
    data_timeout: Duration,
) -> FtpResult<TcpStream> {
    match mode {
        DataChannelMode::Passive => open_pasv(codec, data_timeout).await,
        DataChannelMode::ExtendedPassive => open_epsv(codec, host, data_timeout).await,
    }
}

// ─── PASV ────────────────────────────────────────────────────────────

/// Issue `PASV`, parse the `(h1,h2,h3,h4,p1,p2)` tuple, connect.
async fn open_pasv(codec: &mut FtpCodec, data_timeout: Duration) -> FtpResult<TcpStream> {
    let resp = codec.expect_ok("PASV").await?;
    let addr = parse_pasv_response(&resp.text())?;
    let tcp = timeout(data_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| FtpError::data_channel("PASV data connect timed out"))?
        .map_err(|e| FtpError::data_channel(format!("PASV data connect: {}", e)))?;
    Ok(tcp)
}

/// Parse `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
pub(crate) fn parse_pasv_response(text: &str) -> FtpResult<SocketAddr> {
    let re = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)")
        .map_err(|e| FtpError::protocol_error(e.to_string()))?;
    let caps = re
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse PASV: {}", text)))?;

    let nums: Vec<u8> = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| FtpError::protocol_error("PASV number out of range"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + (nums[5] as u16);
    Ok(SocketAddr::new(ip, port))
}

// ─── EPSV ────────────────────────────────────────────────────────────

/// Issue `EPSV`, parse port, connect to the *same host* on that port.
///
/// Response format: `229 Entering Extended Passive Mode (|||port|)`
async fn open_epsv(codec: &mut FtpCodec, host: &str, data_timeout: Duration) -> FtpResult<TcpStream> {
    let resp = codec.expect_ok("EPSV").await?;
    let port = parse_epsv_response(&resp.text())?;
    let tcp = timeout(data_timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| FtpError::data_channel("EPSV data connect timed out"))?
        .map_err(|e| FtpError::data_channel(format!("EPSV data connect: {}", e)))?;
    Ok(tcp)
}

pub(crate) fn parse_epsv_response(text: &str) -> FtpResult<u16> {
    let re = Regex::new(r"\|\|\|(\d+)\|").map_err(|e| FtpError::protocol_error(e.to_string()))?;
    let caps = re
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse EPSV: {}", text)))?;
    caps[1]
        .parse::<u16>()
        .map_err(|_| FtpError::protocol_error("EPSV port out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pasv() {
        let addr = parse_pasv_response("227 Entering Passive Mode (192,168,1,10,195,80)").unwrap();
        assert_eq!(addr, "192.168.1.10:50000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_parse_pasv_rejects_bad_octet() {
        assert!(parse_pasv_response("227 Entering Passive Mode (300,0,0,1,4,1)").is_err());
        assert!(parse_pasv_response("227 Entering Passive Mode").is_err());
    }

    #[test]
    fn test_parse_epsv() {
        assert_eq!(parse_epsv_response("229 Entering Extended Passive Mode (|||6446|)").unwrap(), 6446);
        assert!(parse_epsv_response("229 Entering Extended Passive Mode (|||99999|)").is_err());
    }
}
