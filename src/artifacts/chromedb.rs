//! Chrome profile database constants and utilities.
//!
//! File names, profile locations and the timestamp format used by Chromium's
//! `History` and `Top Sites` SQLite stores.
//!
//! ## Reference Files
//! - `components/history/core/browser/history_database.cc`
//! - `components/history/core/browser/top_sites_database.cc`
//! - `base/time/time.h`

use time::OffsetDateTime;

/// Chromium uses microseconds since 1601-01-01 00:00:00 UTC (Windows FILETIME epoch).
/// This is the offset from Unix epoch (1970-01-01) in microseconds.
///
/// Reference: `base/time/time.h`
pub const CHROME_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

/// Convert Chrome epoch (microseconds since 1601) to a UTC date-time.
///
/// Returns `None` for `0`, which Chrome writes for "never".
pub fn chrome_to_datetime(chrome_time: i64) -> Option<OffsetDateTime> {
    if chrome_time == 0 {
        return None;
    }

    let unix_micros = chrome_time.checked_sub(CHROME_EPOCH_OFFSET_MICROS)?;
    OffsetDateTime::from_unix_timestamp_nanos(unix_micros as i128 * 1000).ok()
}

/// Convert Chrome epoch microseconds to Unix seconds.
///
/// `0` stays `0`; values before the Unix epoch or out of range also map to `0`.
pub fn chrome_to_unix_seconds(chrome_time: i64) -> i64 {
    chrome_to_datetime(chrome_time)
        .map(|t| t.unix_timestamp().max(0))
        .unwrap_or(0)
}

/// Database file names inside a Chrome profile directory.
pub mod files {
    /// URLs, visits and downloads.
    pub const HISTORY: &str = "History";

    /// Most-visited sites shown on the new tab page.
    pub const TOP_SITES: &str = "Top Sites";
}

/// Profile locations, relative to the root of an image.
///
/// `%` matches any run of characters, as in SQL `LIKE`.
pub mod paths {
    /// Default profile of every Windows user.
    pub const WINDOWS_DEFAULT_PROFILE: &str =
        "Users/%/AppData/Local/Google/Chrome/User Data/Default";
}
