//! Presentation helpers shared by front ends.

use std::path::Path;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Formats a byte count with base-1024 units.
///
/// At most two decimals are shown and trailing zeros are dropped.  Sizes of a
/// terabyte and above are still expressed in GB.
///
/// # Examples
///
/// ```rust
/// use peerchat_core::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1024), "1 KB");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    // Halves round up, so 1.125 KB shows as 1.13 KB.
    let rounded = (value * 100.0).round() / 100.0;
    let mut number = format!("{rounded:.2}");
    if number.contains('.') {
        let trimmed = number.trim_end_matches('0').trim_end_matches('.').len();
        number.truncate(trimmed);
    }
    format!("{number} {}", SIZE_UNITS[unit])
}

/// Picks an icon for a file based on its extension.
pub fn file_type_icon(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "📄",
        "jpg" | "jpeg" | "png" | "gif" => "🖼️",
        "mp3" | "wav" => "🎵",
        "mp4" | "mov" => "🎥",
        _ => "📁",
    }
}
