//! Client configuration file parser.
//!
//! Parses a flat `key = value` format, e.g.:
//!
//! ```text
//! camera_ip = 192.168.1.254
//! player = mpv
//! download_dir = /home/user/dcim
//! ```
//!
//! Every key is optional; anything absent keeps the compiled-in default.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CamError, Result};

// Default timeouts (seconds) and ports
const CAMERA_IP:       &str = "192.168.1.254";
const PREVIEW_PORT:    u16 = 8192;
const RTSP_PORT:       u16 = 554;
const COMMAND_TIMEOUT: u64 = 5;
const PROBE_TIMEOUT:   u64 = 1;

/// Full client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Camera IP address (the firmware always binds 192.168.1.254).
    pub camera_ip: String,
    /// Port of the preview frame server.
    pub preview_port: u16,
    /// Port of the RTSP live stream.
    pub rtsp_port: u16,
    /// Timeout for command GETs and directory listings (seconds).
    pub command_timeout: u64,
    /// Timeout for the HTTP liveness probe (seconds).
    pub probe_timeout: u64,
    /// Directory where downloaded files and previews are written.
    pub download_dir: PathBuf,
    /// External player command for RTSP streaming.
    pub player: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            camera_ip:       CAMERA_IP.to_string(),
            preview_port:    PREVIEW_PORT,
            rtsp_port:       RTSP_PORT,
            command_timeout: COMMAND_TIMEOUT,
            probe_timeout:   PROBE_TIMEOUT,
            download_dir:    PathBuf::from("."),
            player:          "vlc".to_string(),
        }
    }
}

/// Parse `path` as a `key = value` configuration file.
pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| CamError::Config(format!("cannot read {}: {e}", path.display())))?;
    let mut cfg = ClientConfig::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, '=');
        let key = match parts.next() {
            Some(k) => k.trim().to_ascii_lowercase(),
            None => continue,
        };
        let val = match parts.next() {
            Some(v) => v.trim().to_string(),
            None => continue,
        };
        if val.is_empty() {
            continue;
        }

        match key.as_str() {
            "camera_ip"       => cfg.camera_ip       = val,
            "preview_port"    => cfg.preview_port    = val.parse().unwrap_or(PREVIEW_PORT),
            "rtsp_port"       => cfg.rtsp_port       = val.parse().unwrap_or(RTSP_PORT),
            "command_timeout" => cfg.command_timeout = val.parse().unwrap_or(COMMAND_TIMEOUT),
            "probe_timeout"   => cfg.probe_timeout   = val.parse().unwrap_or(PROBE_TIMEOUT),
            "download_dir"    => cfg.download_dir    = PathBuf::from(&val),
            "player"          => cfg.player          = val,
            _ => {} // ignore unknown keys
        }
    }

    Ok(cfg)
}

/// Validate that required fields are populated.
pub fn validate_config(cfg: &ClientConfig) -> Result<()> {
    if cfg.camera_ip.is_empty() {
        return Err(CamError::Config("camera_ip is required".into()));
    }
    if cfg.camera_ip.parse::<std::net::Ipv4Addr>().is_err() {
        return Err(CamError::Config(format!(
            "camera_ip {:?} is not an IPv4 address",
            cfg.camera_ip
        )));
    }
    if cfg.command_timeout == 0 {
        return Err(CamError::Config("command_timeout must be non-zero".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_firmware_address() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.camera_ip, "192.168.1.254");
        assert_eq!(cfg.preview_port, 8192);
        assert_eq!(cfg.rtsp_port, 554);
        assert_eq!(cfg.command_timeout, 5);
    }

    #[test]
    fn validate_rejects_bad_ip() {
        let cfg = ClientConfig {
            camera_ip: "camera.local".into(),
            ..ClientConfig::default()
        };
        assert!(validate_config(&cfg).is_err());
        let cfg = ClientConfig {
            camera_ip: "10.0.0.7".into(),
            ..ClientConfig::default()
        };
        assert!(validate_config(&cfg).is_ok());
    }
}
