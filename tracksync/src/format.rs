//! Human-readable sizes, counts and durations for prompts and summaries

use std::time::Duration;

use bytesize::ByteSize;

/// `1536` → `"1.5 KiB"`
pub fn human_bytes(bytes: u64) -> String {
    ByteSize(bytes).display().iec().to_string()
}

/// `1234567` → `"1,234,567"`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `Duration::from_secs(185)` → `"3 min 5 s"`
pub fn minutes(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{} min {} s", secs / 60, secs % 60)
}

/// `Some(320_000)` → `"320 kbps"`
pub fn bitrate(bits_per_second: Option<u32>) -> String {
    match bits_per_second {
        Some(bps) => format!("{} kbps", bps / 1000),
        None => "? kbps".to_string(),
    }
}
