/// Render a byte count for people: `1000 Bytes`, `1.46 KB`, `2 MB`.
///
/// Binary multiples, at most two decimals, trailing zeros dropped.
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

    if bytes.unsigned_abs() < 1024 {
        return if bytes.abs() == 1 {
            format!("{} Byte", bytes)
        } else {
            format!("{} Bytes", bytes)
        };
    }

    let mut value = bytes as f64;
    let mut unit = UNITS[0];
    for candidate in UNITS {
        value /= 1024.0;
        unit = candidate;
        if value.abs() < 1024.0 {
            break;
        }
    }

    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, unit)
}
