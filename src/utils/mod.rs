//! Formatting helpers and logging setup

pub mod logging;

use std::time::Duration;

/// Display helpers shared by the CLI and reports
pub struct Utils;

impl Utils {
    /// `MM:SS.mmm`, or `HH:MM:SS.mmm` from one hour up
    pub fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();
        let (hours, rest) = (millis / 3_600_000, millis % 3_600_000);
        let (minutes, rest) = (rest / 60_000, rest % 60_000);
        let (seconds, millis) = (rest / 1_000, rest % 1_000);

        match hours {
            0 => format!("{:02}:{:02}.{:03}", minutes, seconds, millis),
            _ => format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis),
        }
    }

    /// Position of a sample in the video; negative values clamp to zero
    pub fn format_timestamp(seconds: f64) -> String {
        Self::format_duration(Duration::from_secs_f64(seconds.max(0.0)))
    }

    /// Binary-prefixed size, e.g. `100.00 MB`
    pub fn format_file_size(bytes: u64) -> String {
        const PREFIXES: [&str; 4] = ["KB", "MB", "GB", "TB"];
        if bytes < 1024 {
            return format!("{} B", bytes);
        }

        let mut value = bytes as f64 / 1024.0;
        let mut prefix = PREFIXES[0];
        for &next in &PREFIXES[1..] {
            if value < 1024.0 {
                break;
            }
            value /= 1024.0;
            prefix = next;
        }
        format!("{:.2} {}", value, prefix)
    }
}
