//! Decoding of the camera's XML command replies.
//!
//! A normal reply looks like:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8" ?>
//! <Function>
//! <Cmd>3012</Cmd>
//! <Status>0</Status>
//! <String>NT96660-V1.0.12</String>
//! </Function>
//! ```
//!
//! with `<Value>` instead of `<String>` for numeric results.  The settings
//! dump (command 3014) is not properly nested: the reply is one flat run of
//! `<Cmd>`/`<Status>` pairs inside `<Function>`, one pair per setting.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{CamError, Result};

/// Extract the text of the first `element` in `xml`, if present.
pub fn extract(xml: &str, element: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut inside = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == element.as_bytes() => inside = true,
            Event::Text(t) if inside => return Ok(Some(t.unescape()?.into_owned())),
            Event::End(e) if e.name().as_ref() == element.as_bytes() => inside = false,
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Extract `<Status>` as an integer.
pub fn status(xml: &str) -> Result<Option<i32>> {
    match extract(xml, "Status")? {
        Some(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CamError::Protocol(format!("non-numeric status {s:?}"))),
        None => Ok(None),
    }
}

/// Parse the flat settings dump into `(code, status)` rows in wire order.
///
/// The leading `3014` row (the dump command itself) is kept; callers that map
/// codes through the settings table will simply not find it there.
pub fn parse_settings_dump(xml: &str) -> Result<Vec<(String, i32)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rows = Vec::new();
    let mut tag: Option<Vec<u8>> = None;
    let mut pending_cmd: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => tag = Some(e.name().as_ref().to_vec()),
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                match tag.as_deref() {
                    Some(b"Cmd") => pending_cmd = Some(text),
                    Some(b"Status") => {
                        if let Some(cmd) = pending_cmd.take() {
                            let status = text.trim().parse().map_err(|_| {
                                CamError::Protocol(format!(
                                    "non-numeric status {text:?} for cmd {cmd}"
                                ))
                            })?;
                            rows.push((cmd, status));
                        }
                    }
                    _ => {}
                }
            }
            Event::End(_) => tag = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION_REPLY: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
        <Function>\n<Cmd>3012</Cmd>\n<Status>0</Status>\n\
        <String>NT96660-V1.0.12</String>\n</Function>";

    const VALUE_REPLY: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
        <Function>\n<Cmd>3017</Cmd>\n<Status>0</Status>\n\
        <Value>15242493952</Value>\n</Function>";

    const ERROR_REPLY: &str =
        "<Function><Cmd>2001</Cmd><Status>-256</Status></Function>";

    // Flat, improperly nested pairs, exactly as the firmware emits them.
    const DUMP_REPLY: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
        <Function>\n\
        <Cmd>3014</Cmd><Status>0</Status>\n\
        <Cmd>1002</Cmd><Status>5</Status>\n\
        <Cmd>2002</Cmd><Status>0</Status>\n\
        <Cmd>2007</Cmd><Status>1</Status>\n\
        </Function>";

    #[test]
    fn extracts_string_field() {
        assert_eq!(
            extract(VERSION_REPLY, "String").unwrap().as_deref(),
            Some("NT96660-V1.0.12")
        );
        assert_eq!(extract(VERSION_REPLY, "Value").unwrap(), None);
    }

    #[test]
    fn extracts_value_and_status() {
        assert_eq!(
            extract(VALUE_REPLY, "Value").unwrap().as_deref(),
            Some("15242493952")
        );
        assert_eq!(status(VALUE_REPLY).unwrap(), Some(0));
        assert_eq!(status(ERROR_REPLY).unwrap(), Some(-256));
    }

    #[test]
    fn settings_dump_yields_pairs_in_order() {
        let rows = parse_settings_dump(DUMP_REPLY).unwrap();
        assert_eq!(
            rows,
            vec![
                ("3014".to_string(), 0),
                ("1002".to_string(), 5),
                ("2002".to_string(), 0),
                ("2007".to_string(), 1),
            ]
        );
    }

    #[test]
    fn malformed_xml_is_an_error() {
        // Mismatched close tag is hit while scanning for the field.
        assert!(extract("<Function><Cmd>3012</Function>", "Status").is_err());
    }

    #[test]
    fn non_numeric_status_is_an_error() {
        assert!(status("<Function><Status>oops</Status></Function>").is_err());
    }
}
