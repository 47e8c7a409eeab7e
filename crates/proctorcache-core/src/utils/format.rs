use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Placeholder for empty input
const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for input that is not a recognizable date
const INVALID_DATE: &str = "Invalid Date";

/// Epoch values below this are seconds, at or above it milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Locale-style string comparison: case-insensitive first, then lowercase
/// before uppercase, then by code point. Never allocates.
pub fn cmp_locale(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded
        .then_with(|| {
            // Same letters: the first differing case decides, lowercase first
            a.chars()
                .zip(b.chars())
                .find(|(x, y)| x != y)
                .map(|(x, y)| y.is_lowercase().cmp(&x.is_lowercase()))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.cmp(b))
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Human display of a cache age given in minutes.
pub fn format_age(minutes: i64) -> String {
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            // Round up: 1h 30m+ becomes 2h
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Parse the date shapes found in the data: RFC 3339, naive date-times,
/// plain dates, and epoch seconds or milliseconds.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if let Ok(epoch) = input.parse::<i64>() {
        return if epoch < EPOCH_MILLIS_THRESHOLD {
            DateTime::from_timestamp(epoch, 0)
        } else {
            DateTime::from_timestamp_millis(epoch)
        };
    }
    None
}

fn format_with(date: &str, pattern: &str) -> String {
    if date.trim().is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    match parse_date(date) {
        Some(dt) => dt.format(pattern).to_string(),
        None => INVALID_DATE.to_string(),
    }
}

/// "May 1, 2024, 9:05 AM"
pub fn format_date(date: &str) -> String {
    format_with(date, "%b %-d, %Y, %-I:%M %p")
}

/// "May 1, 2024"
pub fn format_date_only(date: &str) -> String {
    format_with(date, "%b %-d, %Y")
}

/// "9:05 AM"
pub fn format_time_only(date: &str) -> String {
    format_with(date, "%-I:%M %p")
}

/// "Just now", "5 minutes ago", "3 hours ago", "2 days ago", or the plain
/// date once a week has passed.
pub fn format_relative_time(date: &str, now: DateTime<Utc>) -> String {
    if date.trim().is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    let Some(dt) = parse_date(date) else {
        return INVALID_DATE.to_string();
    };
    let seconds = (now - dt).num_seconds();
    if seconds < 60 {
        "Just now".to_string()
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604_800 {
        format!("{} days ago", seconds / 86_400)
    } else {
        dt.format("%b %-d, %Y").to_string()
    }
}
