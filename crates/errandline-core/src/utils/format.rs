use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::models::order::parse_timestamp;
use crate::models::{Order, ServiceType, StatusGroup, Transaction};

pub const NAIRA: char = '\u{20A6}';

/// Format an amount as naira with thousands separators and two decimals,
/// e.g. `₦12,500.00`. Set `is_kobo` when the amount is in kobo.
pub fn format_currency(amount: f64, is_kobo: bool) -> String {
    let value = if is_kobo { amount / 100.0 } else { amount };
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}{}.{}", NAIRA, sign, grouped, fraction)
}

/// `Thu, 17 May, 2000 9:30pm`
pub fn format_detailed_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%a, %-d %b, %Y %-I:%M%P").to_string()
}

/// Relative day label against `now`: Today, Yesterday, "N days ago" within a
/// week, otherwise a short date like `May 17`.
pub fn format_relative_day(dt: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let days = now.date_naive().signed_duration_since(dt.date_naive()).num_days();
    match days {
        i64::MIN..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{} days ago", days),
        _ => dt.format("%b %-d").to_string(),
    }
}

/// Same as [`format_relative_day`] for a raw backend timestamp. Unparseable
/// input is returned unchanged.
pub fn format_relative_timestamp(timestamp: &str, now: &DateTime<Utc>) -> String {
    match parse_timestamp(timestamp) {
        Some(dt) => format_relative_day(&dt, now),
        None => timestamp.to_string(),
    }
}

/// Truncate a string to a maximum length in characters, adding an ellipsis
/// if needed
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

// ===== Time buckets =====

/// Anything listed by creation time.
pub trait Timestamped {
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

impl Timestamped for Order {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at_utc()
    }
}

impl Timestamped for Transaction {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBucket {
    Today,
    Yesterday,
    LastWeek,
    Earlier,
}

impl TimeBucket {
    pub const ALL: [TimeBucket; 4] = [
        TimeBucket::Today,
        TimeBucket::Yesterday,
        TimeBucket::LastWeek,
        TimeBucket::Earlier,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            TimeBucket::Today => "Today",
            TimeBucket::Yesterday => "Yesterday",
            TimeBucket::LastWeek => "Last Week",
            TimeBucket::Earlier => "Earlier",
        }
    }

    /// Items without a timestamp land in `Earlier`.
    pub fn of(dt: Option<DateTime<Utc>>, now: &DateTime<Utc>) -> Self {
        let Some(dt) = dt else {
            return TimeBucket::Earlier;
        };
        let today = Utc
            .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()
            .unwrap_or(*now);
        if dt >= today {
            TimeBucket::Today
        } else if dt >= today - Duration::days(1) {
            TimeBucket::Yesterday
        } else if dt >= today - Duration::days(7) {
            TimeBucket::LastWeek
        } else {
            TimeBucket::Earlier
        }
    }
}

/// Group items into Today / Yesterday / Last Week / Earlier sections, in that
/// order, keeping the input order within each section. Empty sections are
/// left out.
pub fn group_by_time<'a, T: Timestamped>(
    items: &'a [T],
    now: &DateTime<Utc>,
) -> Vec<(TimeBucket, Vec<&'a T>)> {
    let mut sections: Vec<(TimeBucket, Vec<&T>)> =
        TimeBucket::ALL.iter().map(|b| (*b, Vec::new())).collect();
    for item in items {
        let bucket = TimeBucket::of(item.timestamp(), now);
        if let Some((_, section)) = sections.iter_mut().find(|(b, _)| *b == bucket) {
            section.push(item);
        }
    }
    sections.retain(|(_, section)| !section.is_empty());
    sections
}

// ===== Classification =====

pub fn status_group_label(group: StatusGroup) -> &'static str {
    match group {
        StatusGroup::Active => "active",
        StatusGroup::Completed => "completed",
        StatusGroup::Cancelled => "cancelled",
        StatusGroup::Other => "pending",
    }
}

pub fn service_label(service: ServiceType) -> &'static str {
    match service {
        ServiceType::Restaurant => "Restaurant",
        ServiceType::Laundry => "Laundry",
        ServiceType::Package => "Package",
        ServiceType::Errand => "Errand",
        ServiceType::Other => "Other",
    }
}
