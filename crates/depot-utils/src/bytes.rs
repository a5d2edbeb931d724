const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Formats a byte count with binary units, e.g. `1536` -> `"1.50 KiB"`.
///
/// # Example
///
/// ```
/// use depot_utils::bytes::format_bytes;
///
/// assert_eq!(format_bytes(1024_u64.pow(2), 2), "1.00 MiB");
/// ```
pub fn format_bytes(bytes: u64, precision: usize) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.precision$} {}", UNITS[unit])
}

/// Formats a signed byte delta, keeping the sign in front of the unit.
pub fn format_signed_bytes(bytes: i64, precision: usize) -> String {
    let formatted = format_bytes(bytes.unsigned_abs(), precision);
    if bytes < 0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0, 0), "0 B");
        assert_eq!(format_bytes(1023, 0), "1023 B");
        assert_eq!(format_bytes(1024, 1), "1.0 KiB");
        assert_eq!(format_bytes(1536, 2), "1.50 KiB");
        assert_eq!(format_bytes(5 * 1024_u64.pow(3) / 2, 1), "2.5 GiB");
        assert_eq!(format_bytes(1024_u64.pow(6), 1), "1.0 EiB");
        assert_eq!(format_bytes(u64::MAX, 0), "16 EiB");
    }

    #[test]
    fn test_format_signed_bytes() {
        assert_eq!(format_signed_bytes(-2048, 1), "-2.0 KiB");
        assert_eq!(format_signed_bytes(2048, 1), "2.0 KiB");
        assert_eq!(format_signed_bytes(i64::MIN, 0), "-8 EiB");
    }
}
