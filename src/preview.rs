//! Preview frame capture from the camera's port-8192 stream.
//!
//! In photo mode the camera serves low-resolution JPEG frames over a
//! persistent HTTP connection with non-standard multipart-like framing:
//!
//! ```text
//! --arflebarfle\r\n
//! Content-type: image/jpeg\r\n
//! Content-length: <n>\r\n
//! \r\n
//! <n body bytes>
//! ```
//!
//! No standard multipart parser copes with this, so the framing is parsed by
//! hand: boundary line, header lines up to a blank line, then exactly `n`
//! body bytes.

use std::time::Duration;

use futures_util::StreamExt;
use log::debug;
use reqwest::Client;

use crate::error::{CamError, Result};

/// Boundary line the firmware emits before every frame.
pub const BOUNDARY: &str = "--arflebarfle";

/// Try to parse one complete frame from the front of `buf`.
///
/// Returns `Ok(None)` when more data is needed, or `Ok(Some((consumed,
/// body)))` with the number of bytes consumed and the frame body.  A buffer
/// that starts with anything other than the boundary, or a complete header
/// block without a content length, is an error.
pub fn parse_frame(buf: &[u8]) -> Result<Option<(usize, Vec<u8>)>> {
    let (line, mut pos) = match read_line(buf, 0) {
        Some(x) => x,
        None => return Ok(None),
    };
    if line != BOUNDARY.as_bytes() {
        return Err(CamError::Protocol(format!(
            "preview boundary not found (got {:?})",
            String::from_utf8_lossy(line)
        )));
    }

    let mut size: Option<usize> = None;
    loop {
        let (line, next) = match read_line(buf, pos) {
            Some(x) => x,
            None => return Ok(None),
        };
        pos = next;
        if line.is_empty() {
            break;
        }
        if let Some(v) = header_value(line, "content-length") {
            size = Some(v.parse().map_err(|_| {
                CamError::Protocol(format!("bad preview content length {v:?}"))
            })?);
        }
    }

    let size = match size {
        Some(s) => s,
        None => {
            return Err(CamError::Protocol(
                "could not determine preview image size".into(),
            ))
        }
    };
    if buf.len() < pos + size {
        return Ok(None);
    }
    Ok(Some((pos + size, buf[pos..pos + size].to_vec())))
}

/// One line starting at `pos`, without the trailing CR/LF, plus the position
/// just past the newline.  `None` when the line is not yet complete.
fn read_line(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let nl = buf[pos..].iter().position(|&b| b == b'\n')? + pos;
    let mut end = nl;
    if end > pos && buf[end - 1] == b'\r' {
        end -= 1;
    }
    Some((&buf[pos..end], nl + 1))
}

/// The value of `name: value` if the header line matches (case-insensitive).
fn header_value<'a>(line: &'a [u8], name: &str) -> Option<&'a str> {
    let line = std::str::from_utf8(line).ok()?;
    let (key, value) = line.split_once(':')?;
    if key.trim().eq_ignore_ascii_case(name) {
        Some(value.trim())
    } else {
        None
    }
}

/// Grab one preview frame from the camera.
pub async fn fetch_frame(
    http: &Client,
    ip: &str,
    port: u16,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let url = format!("http://{ip}:{port}/");
    let resp = http.get(&url).timeout(timeout).send().await?;
    if !resp.status().is_success() {
        return Err(CamError::Status(resp.status().as_u16()));
    }

    let mut stream = resp.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
        if let Some((consumed, body)) = parse_frame(&buf)? {
            debug!("preview frame: {} bytes ({} consumed)", body.len(), consumed);
            return Ok(body);
        }
    }
    Err(CamError::Protocol(
        "preview stream ended before a full frame".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"--arflebarfle\r\n");
        buf.extend_from_slice(b"Content-type: image/jpeg\r\n");
        buf.extend_from_slice(format!("Content-length: {}\r\n", body.len()).as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(body);
        buf
    }

    #[test]
    fn parses_a_complete_frame() {
        let body = b"\xff\xd8fake jpeg\xff\xd9";
        let buf = frame(body);
        let (consumed, got) = parse_frame(&buf).unwrap().unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(got, body);
    }

    #[test]
    fn trailing_bytes_are_not_consumed() {
        let mut buf = frame(b"abc");
        buf.extend_from_slice(b"--arflebarfle\r\n");
        let (consumed, got) = parse_frame(&buf).unwrap().unwrap();
        assert_eq!(got, b"abc");
        assert_eq!(&buf[consumed..], b"--arflebarfle\r\n");
    }

    #[test]
    fn incomplete_buffers_ask_for_more() {
        let buf = frame(b"0123456789");
        // headers cut short
        assert!(parse_frame(&buf[..10]).unwrap().is_none());
        // body cut short
        assert!(parse_frame(&buf[..buf.len() - 3]).unwrap().is_none());
    }

    #[test]
    fn wrong_boundary_is_an_error() {
        let buf = b"--somethingelse\r\nContent-length: 3\r\n\r\nabc";
        assert!(parse_frame(buf).is_err());
    }

    #[test]
    fn missing_length_is_an_error() {
        let buf = b"--arflebarfle\r\nContent-type: image/jpeg\r\n\r\nabc";
        assert!(parse_frame(buf).is_err());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let buf = b"--arflebarfle\r\ncontent-LENGTH: 3\r\n\r\nxyz";
        let (_, body) = parse_frame(buf).unwrap().unwrap();
        assert_eq!(body, b"xyz");
    }
}
