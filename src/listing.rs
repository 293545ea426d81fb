//! Screen-scraper for the camera's HTML directory listings.
//!
//! The firmware serves `/NOVATEK/PHOTO` and `/NOVATEK/MOVIE` as HTML tables
//! where each file row carries a download link, a byte size, a `date time`
//! column, and a delete link.  There is no structured API for this; the only
//! option is scraping the table.  Rows that do not match the expected shape
//! are skipped rather than failing the whole listing.

use serde::Serialize;

use crate::util;

/// One file row from a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Server path, e.g. `/NOVATEK/PHOTO/2024_0101_120000_001.JPG`.
    pub href: String,
    /// Bare file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Creation date as reported, e.g. `2024/01/01`.
    pub date: String,
    /// Creation time as reported, e.g. `12:00:00`.
    pub time: String,
}

/// Parse a directory-listing page into file entries, in page order.
pub fn parse_listing(html: &str) -> Vec<FileEntry> {
    let mut entries = Vec::new();
    let mut pos = 0;
    while let Some(tr) = ifind(html, "<tr", pos) {
        let row_end = ifind(html, "</tr>", tr + 3).unwrap_or(html.len());
        let row = &html[tr..row_end];
        pos = row_end + 1;

        let cells = split_cells(row);
        for (i, cell) in cells.iter().enumerate() {
            let href = match cell_href(cell) {
                Some(h) => h,
                None => continue,
            };
            // Delete links point back at the file with a del query.
            if href.contains("del") {
                continue;
            }
            if let Some(entry) = entry_from_cells(&cells, i, href) {
                entries.push(entry);
            }
        }
    }
    entries
}

/// Find a listing entry by its server path.
pub fn find_file<'a>(entries: &'a [FileEntry], href: &str) -> Option<&'a FileEntry> {
    entries.iter().find(|e| e.href == href)
}

/// The most recently created entry.  The firmware appends new files to the
/// end of the table, so this is simply the last row.
pub fn newest(entries: &[FileEntry]) -> Option<&FileEntry> {
    entries.last()
}

// ── Row dissection ────────────────────────────────────────────────────────────

/// Build an entry from the file-link cell at `i` plus the two cells after it
/// (size, then `date time`).  Returns `None` when the row is malformed.
fn entry_from_cells(cells: &[String], i: usize, href: &str) -> Option<FileEntry> {
    let size_text = strip_tags(cells.get(i + 1)?);
    let size: u64 = size_text.trim().replace(',', "").parse().ok()?;
    let stamp = strip_tags(cells.get(i + 2)?);
    let mut stamp_parts = stamp.split_whitespace();
    let date = stamp_parts.next()?.to_string();
    let time = stamp_parts.next()?.to_string();
    Some(FileEntry {
        href: href.to_string(),
        name: util::file_name(href).to_string(),
        size,
        date,
        time,
    })
}

/// Inner HTML of every `<td>` in a row.
fn split_cells(row: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut pos = 0;
    while let Some(td) = ifind(row, "<td", pos) {
        let open_end = match row[td..].find('>') {
            Some(p) => td + p + 1,
            None => break,
        };
        let close = ifind(row, "</td>", open_end).unwrap_or(row.len());
        cells.push(row[open_end..close].to_string());
        pos = close + 1;
    }
    cells
}

/// The href of the first anchor in a cell, if any.
fn cell_href(cell: &str) -> Option<&str> {
    let at = ifind(cell, "href=", 0)? + "href=".len();
    let rest = &cell[at..];
    let (quote, rest) = match rest.as_bytes().first() {
        Some(b'"') => (Some('"'), &rest[1..]),
        Some(b'\'') => (Some('\''), &rest[1..]),
        _ => (None, rest),
    };
    let end = match quote {
        Some(q) => rest.find(q)?,
        None => rest
            .find(|c: char| c == '>' || c.is_ascii_whitespace())
            .unwrap_or(rest.len()),
    };
    Some(&rest[..end])
}

/// Drop everything between `<` and `>`, returning the bare text.
fn strip_tags(s: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Case-insensitive substring search starting at `from`.
fn ifind(hay: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = hay.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || from >= hay.len() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed-down copy of a real /NOVATEK/PHOTO page.
    const PHOTO_PAGE: &str = r#"<html><head><title>Index of PHOTO</title></head>
<body><table border=0>
<tr align=left><th width=22%>Name</th><th width=10%>Size</th><th width=20%>Date</th><th>Operate</th></tr>
<tr align=left>
<td><a href="/NOVATEK/PHOTO/2024_0101_120000_001.JPG">2024_0101_120000_001.JPG</a></td>
<td align=right> 1843200</td>
<td align=right>2024/01/01 12:00:00</td>
<td><a href="/NOVATEK/PHOTO/2024_0101_120000_001.JPG?del=1">Del</a></td>
</tr>
<tr align=left>
<td><a href="/NOVATEK/PHOTO/2024_0101_120107_002.JPG">2024_0101_120107_002.JPG</a></td>
<td align=right> 1921024</td>
<td align=right>2024/01/01 12:01:07</td>
<td><a href="/NOVATEK/PHOTO/2024_0101_120107_002.JPG?del=1">Del</a></td>
</tr>
</table></body></html>"#;

    #[test]
    fn scrapes_file_rows() {
        let entries = parse_listing(PHOTO_PAGE);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].href, "/NOVATEK/PHOTO/2024_0101_120000_001.JPG");
        assert_eq!(entries[0].name, "2024_0101_120000_001.JPG");
        assert_eq!(entries[0].size, 1843200);
        assert_eq!(entries[0].date, "2024/01/01");
        assert_eq!(entries[0].time, "12:00:00");
    }

    #[test]
    fn delete_links_are_not_entries() {
        let entries = parse_listing(PHOTO_PAGE);
        assert!(entries.iter().all(|e| !e.href.contains("del")));
    }

    #[test]
    fn newest_is_the_last_row() {
        let entries = parse_listing(PHOTO_PAGE);
        assert_eq!(
            newest(&entries).unwrap().name,
            "2024_0101_120107_002.JPG"
        );
    }

    #[test]
    fn find_by_server_path() {
        let entries = parse_listing(PHOTO_PAGE);
        let e = find_file(&entries, "/NOVATEK/PHOTO/2024_0101_120000_001.JPG").unwrap();
        assert_eq!(e.size, 1843200);
        assert!(find_file(&entries, "/NOVATEK/PHOTO/NOPE.JPG").is_none());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let html = r#"<table><tr>
<td><a href="/NOVATEK/MOVIE/CLIP.MP4">CLIP.MP4</a></td>
<td>not-a-size</td><td>2024/01/01 09:00:00</td>
</tr></table>"#;
        assert!(parse_listing(html).is_empty());
    }

    #[test]
    fn empty_page_yields_no_entries() {
        assert!(parse_listing("<html><body>no card</body></html>").is_empty());
    }
}
