//! Time parsing and formatting utilities

use crate::domain::errors::DomainError;

/// Time parser for the positions accepted on the command line
pub struct TimeParser;

impl TimeParser {
    /// Parse `SS[.ms]`, `MM:SS[.ms]` or `HH:MM:SS[.ms]` into milliseconds
    pub fn parse_millis(time_str: &str) -> Result<u64, DomainError> {
        let trimmed = time_str.trim();
        let invalid = || {
            DomainError::InvalidParameter(format!(
                "Invalid time format: {}. Expected HH:MM:SS.ms, MM:SS.ms, or seconds",
                time_str
            ))
        };

        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }

        let seconds: f64 = parts[parts.len() - 1].parse().map_err(|_| invalid())?;
        if !seconds.is_finite() || seconds < 0.0 || (parts.len() > 1 && seconds >= 60.0) {
            return Err(invalid());
        }

        let mut whole_minutes: u64 = 0;
        if parts.len() >= 2 {
            let minutes: u64 = parts[parts.len() - 2].parse().map_err(|_| invalid())?;
            if parts.len() == 3 && minutes >= 60 {
                return Err(invalid());
            }
            whole_minutes += minutes;
        }
        if parts.len() == 3 {
            let hours: u64 = parts[0].parse().map_err(|_| invalid())?;
            whole_minutes += hours * 60;
        }

        Ok(whole_minutes * 60_000 + (seconds * 1000.0).round() as u64)
    }

    /// Format milliseconds as `HH:MM:SS.mmm`, the form ffmpeg expects for `-ss`/`-to`
    pub fn format_ffmpeg(millis: u64) -> String {
        let total_seconds = millis / 1000;
        let milliseconds = millis % 1000;
        let seconds = total_seconds % 60;
        let minutes = (total_seconds / 60) % 60;
        let hours = total_seconds / 3600;
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
    }
}
