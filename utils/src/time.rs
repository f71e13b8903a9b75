//! Time formatting helpers.

use iap_types::Timestamp;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// How long ago `then` was, relative to `now`, e.g. `"3m 12s ago"`.
pub fn format_age(then: Timestamp, now: Timestamp) -> String {
    let secs = now.as_secs().saturating_sub(then.as_secs());
    format!("{} ago", format_duration(secs))
}
