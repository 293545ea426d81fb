//! Camera control client.
//!
//! Every operation is an HTTP GET against the camera's embedded web server:
//! `http://<ip>/?custom=1&cmd=<code>[&par=<value>][&str=<string>]`.  Replies
//! are decoded by [`crate::xmlresp`]; file listings are scraped by
//! [`crate::listing`]; preview frames come from [`crate::preview`].
//!
//! The firmware is fragile — an unsupported parameter value can wedge the
//! camera until it is power-cycled — so setters validate values against the
//! compiled-in tables before anything goes on the wire, and nothing is ever
//! retried.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::command::{self, Mode};
use crate::config::ClientConfig;
use crate::error::{CamError, Result};
use crate::listing::{self, FileEntry};
use crate::preview;
use crate::util;
use crate::xmlresp;

/// Directory-listing paths served by the firmware.
pub const PHOTO_PATH: &str = "/NOVATEK/PHOTO";
pub const MOVIE_PATH: &str = "/NOVATEK/MOVIE";

/// Decoded row of the settings dump (command 3014).
#[derive(Debug, Serialize)]
pub struct SettingStatus {
    pub code:   String,
    /// Human-readable setting name, when the code is in the table.
    pub name:   Option<&'static str>,
    /// Decoded value, when the status is a valid index for the setting.
    pub value:  Option<&'static str>,
    pub status: i32,
}

pub struct CameraClient {
    http: Client,
    cfg:  ClientConfig,
}

/// Build the command URL.  Parameters are appended verbatim, the way the
/// firmware expects them; `Url::parse` percent-encodes only what it must.
pub fn build_command_url(
    ip: &str,
    code: &str,
    par: Option<&str>,
    str_param: Option<&str>,
) -> Result<Url> {
    let mut full = format!("http://{ip}/?custom=1&cmd={code}");
    if let Some(p) = par {
        full.push_str("&par=");
        full.push_str(p);
    }
    if let Some(s) = str_param {
        full.push_str("&str=");
        full.push_str(s);
    }
    Ok(Url::parse(&full)?)
}

/// Map a reqwest error, surfacing timeouts distinctly.
fn http_err(e: reqwest::Error) -> CamError {
    if e.is_timeout() {
        CamError::Timeout
    } else {
        CamError::Http(e)
    }
}

impl CameraClient {
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let http = Client::builder().build().map_err(CamError::Http)?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.cfg.command_timeout)
    }

    // ── Command sending ───────────────────────────────────────────────────────

    /// Send a command by name (from the command table) or bare numeric code.
    /// Returns the raw reply body.
    pub async fn send_command(
        &self,
        command: &str,
        par: Option<&str>,
        str_param: Option<&str>,
    ) -> Result<String> {
        let code = match command::command_code(command) {
            Some(c) => c,
            None if command.bytes().all(|b| b.is_ascii_digit()) => command,
            None => {
                return Err(CamError::Protocol(format!(
                    "unknown command {command:?}"
                )))
            }
        };
        let url = build_command_url(&self.cfg.camera_ip, code, par, str_param)?;
        debug!(">>> {url}");

        let resp = self
            .http
            .get(url)
            .timeout(self.command_timeout())
            .send()
            .await
            .map_err(http_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CamError::Status(status.as_u16()));
        }
        let body = resp.text().await.map_err(http_err)?;
        debug!("<<< {body}");
        Ok(body)
    }

    /// Send a command and fail unless the reply status is 0.
    async fn send_checked(
        &self,
        command: &str,
        par: Option<&str>,
        str_param: Option<&str>,
    ) -> Result<String> {
        let body = self.send_command(command, par, str_param).await?;
        if let Some(status) = xmlresp::status(&body)? {
            if status != 0 {
                if status == command::ERROR_STATUS {
                    warn!("{command}: hard firmware error; the camera may need a power cycle");
                }
                return Err(CamError::Firmware {
                    cmd: command.to_string(),
                    status,
                });
            }
        }
        Ok(body)
    }

    /// Send a command and extract a single reply field.
    async fn command_field(&self, command: &str, element: &str) -> Result<String> {
        let body = self.send_command(command, None, None).await?;
        xmlresp::extract(&body, element)?.ok_or_else(|| {
            CamError::Protocol(format!("no <{element}> in reply to {command}"))
        })
    }

    async fn command_value(&self, command: &str) -> Result<u64> {
        let v = self.command_field(command, "Value").await?;
        v.trim()
            .parse()
            .map_err(|_| CamError::Protocol(format!("non-numeric <Value> {v:?}")))
    }

    // ── Status getters ────────────────────────────────────────────────────────

    /// Firmware version string (command 3012).
    pub async fn get_version(&self) -> Result<String> {
        self.command_field("VERSION", "String").await
    }

    /// Free SD-card space in bytes (command 3017).
    pub async fn get_disk_space(&self) -> Result<u64> {
        self.command_value("DISK_SPACE").await
    }

    /// Number of photos that still fit on the card (command 1003).
    pub async fn get_remaining_photos(&self) -> Result<u64> {
        self.command_value("PHOTOS_REMAINING").await
    }

    /// Remaining movie recording time as (hours, minutes, seconds).
    pub async fn get_remaining_movie(&self) -> Result<(u64, u64, u64)> {
        let secs = self.command_value("MOVIE_REMAINING").await?;
        Ok((secs / 3600, (secs % 3600) / 60, secs % 60))
    }

    /// Current mode as reported by command 3016.  This firmware always
    /// reports 0 regardless of the actual mode.
    pub async fn get_mode(&self) -> Result<i32> {
        let body = self.send_command("STATUS_MODE", None, None).await?;
        xmlresp::status(&body)?
            .ok_or_else(|| CamError::Protocol("no <Status> in mode reply".into()))
    }

    /// Fetch and decode the full settings dump (command 3014).
    pub async fn get_settings(&self) -> Result<Vec<SettingStatus>> {
        let body = self.send_command("CONFIG", None, None).await?;
        let rows = xmlresp::parse_settings_dump(&body)?;
        Ok(rows
            .into_iter()
            .filter(|(code, _)| code != "3014") // the dump command's own row
            .map(|(code, status)| {
                let setting = command::setting_by_code(&code);
                SettingStatus {
                    name:  setting.map(|s| s.name),
                    value: setting.and_then(|s| s.value_for_status(status)),
                    code,
                    status,
                }
            })
            .collect())
    }

    // ── Setters ───────────────────────────────────────────────────────────────

    /// Change a setting by human-readable name and value.  Both are validated
    /// against the settings table before anything is sent.
    pub async fn set_setting(&self, name: &str, value: &str) -> Result<()> {
        let setting = command::setting_by_name(name)
            .ok_or_else(|| CamError::UnknownSetting(name.to_string()))?;
        let par = setting
            .par_for_value(value)
            .ok_or_else(|| CamError::InvalidValue {
                setting: setting.name.to_string(),
                value:   value.to_string(),
            })?;
        self.send_checked(setting.code, Some(&par.to_string()), None)
            .await?;
        info!("{} set to {}", setting.name, setting.values[par]);
        Ok(())
    }

    /// Switch capture mode (command 3001).  The mode query is unreliable on
    /// this firmware, so no confirmation poll is attempted.
    pub async fn set_mode(&self, mode: Mode) -> Result<()> {
        self.send_checked("MODE_PHOTO_MOVIE", Some(mode.par()), None)
            .await?;
        info!("mode set to {mode:?}");
        Ok(())
    }

    /// Set the camera date (command 3005, `YYYY-MM-DD`).
    pub async fn set_date(&self, date: &str) -> Result<()> {
        self.send_checked("DATE", None, Some(date)).await.map(|_| ())
    }

    /// Set the camera time (command 3006, `HH:MM:SS`).
    pub async fn set_time(&self, time: &str) -> Result<()> {
        self.send_checked("TIME", None, Some(time)).await.map(|_| ())
    }

    /// Push the host clock to the camera.
    pub async fn sync_clock(&self) -> Result<()> {
        let now = chrono::Local::now();
        self.set_date(&now.format("%Y-%m-%d").to_string()).await?;
        self.set_time(&now.format("%H:%M:%S").to_string()).await?;
        info!("camera clock synced to {}", now.format("%Y-%m-%d %H:%M:%S"));
        Ok(())
    }

    /// Set the WiFi SSID (command 3003).  Takes effect after reboot.
    pub async fn set_wifi_name(&self, name: &str) -> Result<()> {
        self.send_checked("WIFI_NAME", None, Some(name)).await.map(|_| ())
    }

    /// Set the WiFi password (command 3004).  Takes effect after reboot.
    pub async fn set_wifi_pw(&self, pw: &str) -> Result<()> {
        self.send_checked("WIFI_PW", None, Some(pw)).await.map(|_| ())
    }

    // ── Capture ───────────────────────────────────────────────────────────────

    /// Take a photo (command 1001) and return the new DCIM file entry,
    /// located by scraping the photo directory for its newest row.
    pub async fn snap(&self) -> Result<FileEntry> {
        self.send_checked("SNAP", None, None).await?;
        let entries = self.list_directory(PHOTO_PATH).await?;
        listing::newest(&entries)
            .cloned()
            .ok_or_else(|| CamError::Protocol("no photo found after snap".into()))
    }

    /// Start or stop movie recording (command 2001).
    pub async fn record(&self, start: bool) -> Result<()> {
        let par = if start { command::START } else { command::STOP };
        self.send_checked("START_STOP", Some(par), None).await?;
        info!("recording {}", if start { "started" } else { "stopped" });
        Ok(())
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    /// Scrape one directory-listing page.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<FileEntry>> {
        let url = format!("http://{}{}", self.cfg.camera_ip, path);
        let resp = self
            .http
            .get(&url)
            .timeout(self.command_timeout())
            .send()
            .await
            .map_err(http_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CamError::Status(status.as_u16()));
        }
        let body = resp.text().await.map_err(http_err)?;
        Ok(listing::parse_listing(&body))
    }

    /// All files on the card: photos first, then movies.
    pub async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let mut entries = self.list_directory(PHOTO_PATH).await?;
        entries.extend(self.list_directory(MOVIE_PATH).await?);
        Ok(entries)
    }

    /// Download a file by server path into `dir`, verifying it against the
    /// directory listing first.  Returns the local path.
    pub async fn download_file(&self, href: &str, dir: &Path) -> Result<PathBuf> {
        let entries = self.list_files().await?;
        let entry = listing::find_file(&entries, href).ok_or_else(|| {
            CamError::Protocol(format!("{href} not in the camera's file listing"))
        })?;

        tokio::fs::create_dir_all(dir).await?;
        let dest = dir.join(&entry.name);
        let mut out = tokio::fs::File::create(&dest).await?;

        // No per-request timeout here: large movie files take a while.
        let url = format!("http://{}{}", self.cfg.camera_ip, href);
        let resp = self.http.get(&url).send().await.map_err(http_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CamError::Status(status.as_u16()));
        }

        let mut got: u64 = 0;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(http_err)?;
            got += chunk.len() as u64;
            tokio::io::AsyncWriteExt::write_all(&mut out, &chunk).await?;
            debug!(
                "{}: {} of {}",
                entry.name,
                util::human_size(got),
                util::human_size(entry.size)
            );
        }
        if got != entry.size {
            warn!(
                "{}: got {got} bytes, listing said {}",
                entry.name, entry.size
            );
        }
        info!("downloaded {} ({})", dest.display(), util::human_size(got));
        Ok(dest)
    }

    // ── Preview & streaming ───────────────────────────────────────────────────

    /// Grab one low-resolution preview frame.  Only works in photo mode.
    pub async fn get_preview(&self) -> Result<Vec<u8>> {
        preview::fetch_frame(
            &self.http,
            &self.cfg.camera_ip,
            self.cfg.preview_port,
            self.command_timeout(),
        )
        .await
    }

    /// Grab a preview frame and write it to `dir` with a timestamped name.
    pub async fn save_preview(&self, dir: &Path) -> Result<PathBuf> {
        let frame = self.get_preview().await?;
        tokio::fs::create_dir_all(dir).await?;
        let ts = chrono::Local::now().format("%Y%m%d%H%M%S");
        let path = dir.join(format!("preview_{ts}.jpg"));
        tokio::fs::write(&path, &frame).await?;
        info!("preview saved to {} ({} bytes)", path.display(), frame.len());
        Ok(path)
    }

    /// RTSP URL of the live stream.
    pub fn rtsp_url(&self) -> String {
        format!(
            "rtsp://{}:{}/stream0/svc0/track1",
            self.cfg.camera_ip, self.cfg.rtsp_port
        )
    }

    /// Spawn the configured external player on the live stream, output
    /// discarded.  The child is returned so the caller decides whether to
    /// wait on it.
    pub fn spawn_stream(&self) -> Result<tokio::process::Child> {
        let url = self.rtsp_url();
        info!("spawning {} {url}", self.cfg.player);
        let child = tokio::process::Command::new(&self.cfg.player)
            .arg(&url)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        Ok(child)
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    /// Probe the camera's web server with a short GET.
    pub async fn http_test(&self) -> String {
        let url = format!("http://{}/", self.cfg.camera_ip);
        match self
            .http
            .get(&url)
            .timeout(Duration::from_secs(self.cfg.probe_timeout))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => "HTTP socket OPEN".to_string(),
            Ok(resp) => format!("HTTP socket open but returned: {}", resp.status().as_u16()),
            Err(_) => "HTTP socket CLOSED".to_string(),
        }
    }

    /// One ICMP ping via the system `ping` binary.
    pub async fn ping(&self) -> String {
        let status = tokio::process::Command::new("ping")
            .args(["-c1", "-W1", &self.cfg.camera_ip])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;
        match status {
            Ok(s) if s.success() => "Host is UP".to_string(),
            _ => "Host is DOWN".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_url_bare() {
        let url = build_command_url("192.168.1.254", "1001", None, None).unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.254/?custom=1&cmd=1001");
    }

    #[test]
    fn command_url_with_par() {
        let url = build_command_url("192.168.1.254", "2001", Some("1"), None).unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.254/?custom=1&cmd=2001&par=1");
    }

    #[test]
    fn command_url_with_str() {
        let url =
            build_command_url("192.168.1.254", "3005", None, Some("2024-01-01")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://192.168.1.254/?custom=1&cmd=3005&str=2024-01-01"
        );
    }

    #[test]
    fn command_url_with_both() {
        let url = build_command_url("10.0.0.7", "3001", Some("0"), Some("x")).unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.7/?custom=1&cmd=3001&par=0&str=x");
    }

    #[test]
    fn rtsp_url_uses_configured_port() {
        let cam = CameraClient::new(ClientConfig::default()).unwrap();
        assert_eq!(
            cam.rtsp_url(),
            "rtsp://192.168.1.254:554/stream0/svc0/track1"
        );
    }
}
