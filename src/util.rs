//! Small formatting helpers.

/// Format a byte count as a human-readable string ("1.21 MB").
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let exp = std::cmp::min(
        (63 - bytes.leading_zeros()) as usize / 10,
        UNITS.len() - 1,
    );
    let scaled = bytes as f64 / (1u64 << (exp * 10)) as f64;
    format!("{scaled:.2} {}", UNITS[exp])
}

/// Last path component of an href like `/NOVATEK/PHOTO/2024_0101_120000_001.JPG`.
pub fn file_name(href: &str) -> &str {
    href.rsplit('/').next().unwrap_or(href)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_size_scales() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(512), "512.00 B");
        assert_eq!(human_size(1024), "1.00 KB");
        assert_eq!(human_size(1536), "1.50 KB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(
            file_name("/NOVATEK/MOVIE/2024_0101_120000_001.MP4"),
            "2024_0101_120000_001.MP4"
        );
        assert_eq!(file_name("plain.jpg"), "plain.jpg");
    }
}
