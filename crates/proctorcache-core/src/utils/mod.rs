//! Utility functions for string and date formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    cmp_locale, format_age, format_date, format_date_only, format_relative_time,
    format_time_only, parse_date, truncate_string,
};
