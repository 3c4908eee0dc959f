//! Human-readable byte sizes.

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

/// Formats a byte count with binary multiples, e.g. `1.5 GB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(6_938_040_682), "6.5 GB");
        assert_eq!(format_bytes(3 * 1024u64.pow(4)), "3.0 TB");
        assert_eq!(format_bytes(2048 * 1024u64.pow(4)), "2048.0 TB");
    }
}
