//! Display formatting shared by every front end.

pub mod format;

pub use format::{
    format_currency, format_detailed_date, format_relative_day, format_relative_timestamp,
    group_by_time, service_label, status_group_label, truncate_string, TimeBucket, Timestamped,
};
