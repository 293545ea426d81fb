//! Error types for the camera client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CamError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("camera returned HTTP {0}")]
    Status(u16),

    #[error("camera rejected command {cmd} (status {status})")]
    Firmware { cmd: String, status: i32 },

    #[error("timeout talking to camera")]
    Timeout,

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("config: {0}")]
    Config(String),

    #[error("no such setting: {0}")]
    UnknownSetting(String),

    #[error("invalid value {value:?} for setting {setting}")]
    InvalidValue { setting: String, value: String },
}

pub type Result<T> = std::result::Result<T, CamError>;
