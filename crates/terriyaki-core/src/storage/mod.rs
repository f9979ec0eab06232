pub mod config;
pub mod database;
pub mod grinds;
pub mod messages;
pub mod migrations;
pub mod records;
pub mod tasks;
pub mod users;

pub use config::Config;
pub use database::Database;

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};

/// Returns the data directory, creating it if needed.
///
/// `TERRIYAKI_DATA_DIR` overrides the location. Otherwise this is
/// `~/.config/terriyaki[-dev]/`, with the `-dev` suffix when
/// `TERRIYAKI_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("TERRIYAKI_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TERRIYAKI_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("terriyaki-dev")
            } else {
                base_dir.join("terriyaki")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Fixed-width RFC 3339 with a `Z` suffix, so text order matches time order.
pub(crate) fn format_ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_opt_ts(idx: usize, text: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    text.map(|t| parse_ts(idx, &t)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_as_text() {
        let a = Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        assert!(format_ts(&a) < format_ts(&b));
        assert!(format_ts(&a).ends_with('Z'));
        assert_eq!(parse_ts(0, &format_ts(&b)).unwrap(), b);
    }

    #[test]
    fn bad_timestamp_is_a_conversion_error() {
        assert!(parse_ts(3, "yesterday").is_err());
        assert_eq!(parse_opt_ts(0, None).unwrap(), None);
    }
}
