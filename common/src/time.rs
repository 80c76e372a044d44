//! IST (UTC+5:30) timestamp rendering, per §6.

use chrono::Utc;
use chrono_tz::Asia::Kolkata;

/// Current time formatted `%Y-%m-%d %H:%M:%S` in IST.
pub fn ist_now_string() -> String {
    Utc::now()
        .with_timezone(&Kolkata)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Unix seconds, used for FileEntry/SsRecord timestamps (persisted, rendered
/// to IST only at display time).
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Render a stored unix-seconds timestamp as an IST string for display
/// blocks (INFO, VIEW -l, LISTREQUESTS).
pub fn unix_to_ist_string(secs: i64) -> String {
    use chrono::TimeZone;
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.with_timezone(&Kolkata).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
