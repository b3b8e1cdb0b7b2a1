//! Formatting helpers
//!
//! Pure functions used for display and comparison. None of them change
//! the stored URL.

use chrono::{DateTime, Utc};

use crate::models::Entry;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Strip the scheme, a following `www.`, and one trailing slash
///
/// `https://www.example.com/` becomes `example.com`.
pub fn normalize_for_display(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    let rest = match rest {
        Some(rest) => rest.strip_prefix("www.").unwrap_or(rest),
        None => url,
    };

    rest.strip_suffix('/').unwrap_or(rest)
}

/// Prefix `https://` unless the input already names http or https
pub fn ensure_scheme(input: &str) -> String {
    if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    }
}

/// Seconds between `since` and `now`, never negative
pub fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_seconds().max(0)
}

/// Time since the last click, in the largest whole unit
///
/// Returns `None` for entries that were never clicked. Exactly one unit is
/// shown and the value is floored: 59s, 1m, 1h, 1d.
pub fn elapsed_label(last_clicked: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<String> {
    let elapsed = elapsed_secs(last_clicked?, now);

    let label = if elapsed >= SECS_PER_DAY {
        format!("{}d", elapsed / SECS_PER_DAY)
    } else if elapsed >= SECS_PER_HOUR {
        format!("{}h", elapsed / SECS_PER_HOUR)
    } else if elapsed >= SECS_PER_MINUTE {
        format!("{}m", elapsed / SECS_PER_MINUTE)
    } else {
        format!("{}s", elapsed)
    };

    Some(label)
}

/// Row suffix shown next to an entry: `(clicks, elapsed)`
pub fn click_summary(entry: &Entry, now: DateTime<Utc>) -> String {
    let elapsed = elapsed_label(entry.last_clicked, now).unwrap_or_else(|| "N/A".to_string());
    format!("({}, {})", entry.click_count, elapsed)
}
