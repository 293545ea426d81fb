//! Control client for Novatek WiFi action cameras (VicTsing 4K and
//! compatible models).
//!
//! Usage:
//!   nvtcam status
//!   nvtcam set white_balance daylight
//!   nvtcam snap --download
//!   nvtcam --ip 192.168.1.254 files --json
//!
//! The firmware is buggy: sending an unsupported command parameter will
//! likely crash the camera, and power-cycling is the only recourse.  All
//! values therefore go through the compiled-in tables; `raw` is the explicit
//! escape hatch for exploration.

mod client;
mod command;
mod config;
mod error;
mod listing;
mod preview;
mod util;
mod xmlresp;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::warn;
use serde::Serialize;

use crate::client::CameraClient;
use crate::command::Mode;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "nvtcam", about = "Control client for Novatek WiFi action cameras")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Camera IP address (overrides the config file).
    #[arg(long)]
    ip: Option<String>,

    /// Log wire-level requests and replies.
    #[arg(short, long)]
    verbose: bool,

    /// Print machine-readable JSON where applicable.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum RecordAction {
    Start,
    Stop,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Show camera liveness, version, mode and capacity.
    Status,
    /// Dump the camera's current settings.
    Settings,
    /// Show a setting's allowed values (all settings when no name given).
    Values { name: Option<String> },
    /// Change a setting, e.g. `set white_balance daylight`.
    Set { name: String, value: String },
    /// Switch capture mode (photo|movie|tphoto|tmovie).
    Mode { mode: Mode },
    /// Take a photo and report its DCIM filename.
    Snap {
        /// Also download the photo to the download directory.
        #[arg(long)]
        download: bool,
    },
    /// Start or stop movie recording.
    Record { action: RecordAction },
    /// List the files on the SD card.
    Files,
    /// Download a file by server path, e.g. `/NOVATEK/MOVIE/....MP4`.
    Get {
        href: String,
        /// Destination directory (defaults to the configured download_dir).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Grab one low-resolution preview frame (photo mode only).
    Preview {
        /// Destination directory (defaults to the configured download_dir).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Open the RTSP live stream in the external player.
    Stream {
        /// Wait for the player to exit instead of detaching.
        #[arg(long)]
        wait: bool,
    },
    /// Set the camera clock; with no flags, sync both from the host clock.
    Clock {
        /// Date as YYYY-MM-DD.
        #[arg(long)]
        date: Option<String>,
        /// Time as HH:MM:SS.
        #[arg(long)]
        time: Option<String>,
    },
    /// Change the camera's WiFi SSID and/or password (takes effect on reboot).
    Wifi {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Send a raw numeric command code.  Dangerous: unsupported parameters
    /// can crash the camera.
    Raw {
        code: String,
        #[arg(long)]
        par: Option<String>,
        #[arg(long = "str")]
        str_param: Option<String>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let mut cfg = match &cli.config {
        Some(path) => match config::load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("nvtcam: config error: {e}");
                process::exit(1);
            }
        },
        None => config::ClientConfig::default(),
    };
    if let Some(ip) = &cli.ip {
        cfg.camera_ip = ip.clone();
    }
    if let Err(e) = config::validate_config(&cfg) {
        eprintln!("nvtcam: config validation: {e}");
        process::exit(1);
    }

    if let Err(e) = run(&cli, cfg).await {
        eprintln!("nvtcam: {e:#}");
        process::exit(1);
    }
}

// ── Subcommand dispatch ───────────────────────────────────────────────────────

async fn run(cli: &Cli, cfg: config::ClientConfig) -> anyhow::Result<()> {
    let cam = CameraClient::new(cfg)?;

    match &cli.cmd {
        Cmd::Status => show_status(&cam, cli.json).await?,
        Cmd::Settings => show_settings(&cam, cli.json).await?,
        Cmd::Values { name } => show_values(name.as_deref(), cli.json)?,
        Cmd::Set { name, value } => {
            cam.set_setting(name, value).await?;
            println!("{name} set to {value}");
        }
        Cmd::Mode { mode } => {
            cam.set_mode(*mode).await?;
            println!("mode set to {mode:?}");
        }
        Cmd::Snap { download } => {
            let entry = cam.snap().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                println!("{}", entry.name);
            }
            if *download {
                let dir = cam.config().download_dir.clone();
                let path = cam.download_file(&entry.href, &dir).await?;
                println!("saved to {}", path.display());
            }
        }
        Cmd::Record { action } => {
            cam.record(matches!(action, RecordAction::Start)).await?;
        }
        Cmd::Files => show_files(&cam, cli.json).await?,
        Cmd::Get { href, out } => {
            let dir = out.clone().unwrap_or_else(|| cam.config().download_dir.clone());
            let path = cam.download_file(href, &dir).await?;
            println!("saved to {}", path.display());
        }
        Cmd::Preview { out } => {
            let dir = out.clone().unwrap_or_else(|| cam.config().download_dir.clone());
            let path = cam.save_preview(&dir).await?;
            println!("saved to {}", path.display());
        }
        Cmd::Stream { wait } => {
            println!("streaming {}", cam.rtsp_url());
            let mut child = cam.spawn_stream()?;
            if *wait {
                child.wait().await.context("waiting for player")?;
            }
        }
        Cmd::Clock { date, time } => {
            if date.is_none() && time.is_none() {
                cam.sync_clock().await?;
                println!("camera clock synced");
            } else {
                if let Some(d) = date {
                    cam.set_date(d).await?;
                }
                if let Some(t) = time {
                    cam.set_time(t).await?;
                }
            }
        }
        Cmd::Wifi { name, password } => {
            if name.is_none() && password.is_none() {
                anyhow::bail!("provide --name and/or --password");
            }
            if let Some(n) = name {
                cam.set_wifi_name(n).await?;
                println!("WiFi name set (reboot the camera to apply)");
            }
            if let Some(p) = password {
                cam.set_wifi_pw(p).await?;
                println!("WiFi password set (reboot the camera to apply)");
            }
        }
        Cmd::Raw { code, par, str_param } => {
            let body = cam
                .send_command(code, par.as_deref(), str_param.as_deref())
                .await?;
            println!("{body}");
        }
    }
    Ok(())
}

// ── Reports ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StatusReport {
    ping: String,
    http: String,
    version: Option<String>,
    mode: Option<i32>,
    disk_space: Option<u64>,
    photos_remaining: Option<u64>,
    movie_remaining: Option<String>,
}

async fn show_status(cam: &CameraClient, json: bool) -> anyhow::Result<()> {
    let ping = cam.ping().await;
    let http = cam.http_test().await;

    // Each probe is best-effort: a half-crashed camera often answers some
    // commands and times out on others.
    let version = cam.get_version().await.map_err(|e| warn!("version: {e}")).ok();
    let mode = cam.get_mode().await.map_err(|e| warn!("mode: {e}")).ok();
    let disk_space = cam
        .get_disk_space()
        .await
        .map_err(|e| warn!("disk space: {e}"))
        .ok();
    let photos_remaining = cam
        .get_remaining_photos()
        .await
        .map_err(|e| warn!("photos remaining: {e}"))
        .ok();
    let movie_remaining = cam
        .get_remaining_movie()
        .await
        .map_err(|e| warn!("movie remaining: {e}"))
        .ok()
        .map(|(h, m, s)| format!("{h:02}h {m:02}m {s:02}s"));

    let report = StatusReport {
        ping,
        http,
        version,
        mode,
        disk_space,
        photos_remaining,
        movie_remaining,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.ping);
    println!("{}", report.http);
    if let Some(v) = &report.version {
        println!("Version: {v}");
    }
    if let Some(m) = report.mode {
        println!("Mode: {m}");
    }
    if let Some(d) = report.disk_space {
        println!("SD card space remaining: {}", util::human_size(d));
    }
    if let Some(p) = report.photos_remaining {
        println!("Photos remaining: {p}");
    }
    if let Some(m) = &report.movie_remaining {
        println!("Movie time remaining: {m}");
    }
    Ok(())
}

async fn show_settings(cam: &CameraClient, json: bool) -> anyhow::Result<()> {
    let settings = cam.get_settings().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }
    for s in &settings {
        match (s.name, s.value) {
            (Some(name), Some(value)) => println!("    {name}: {value}"),
            (Some(name), None) => println!("    {name}: {}", s.status),
            // Codes the table doesn't know are printed raw.
            _ => println!("    {}: {}", s.code, s.status),
        }
    }
    Ok(())
}

fn show_values(name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let selected: Vec<&command::Setting> = match name {
        Some(n) => vec![command::setting_by_name(n)
            .ok_or_else(|| anyhow::anyhow!("no such setting: {n}"))?],
        None => command::SETTINGS.iter().collect(),
    };

    if json {
        #[derive(Serialize)]
        struct Row {
            name: &'static str,
            code: &'static str,
            values: &'static [&'static str],
        }
        let rows: Vec<Row> = selected
            .iter()
            .map(|s| Row { name: s.name, code: s.code, values: s.values })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for s in selected {
        println!("    {}: {}", s.name, s.values.join(", "));
    }
    Ok(())
}

async fn show_files(cam: &CameraClient, json: bool) -> anyhow::Result<()> {
    let entries = cam.list_files().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for e in &entries {
        println!(
            "      {}    {:>10}    {}    {}",
            e.href,
            util::human_size(e.size),
            e.date,
            e.time
        );
    }
    match cam.get_disk_space().await {
        Ok(0) => println!("    SD card space remaining: None!"),
        Ok(d) => println!("    SD card space remaining: {}", util::human_size(d)),
        Err(e) => warn!("disk space: {e}"),
    }
    Ok(())
}
