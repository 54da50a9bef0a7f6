use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Per-period consumption counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub messages_used: u32,
    /// Mirrors the catalog quota for the current plan; `-1` means unlimited.
    pub messages_limit: i64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub reset_date: DateTime<Utc>,
}

impl Usage {
    pub fn starting(messages_limit: i64, now: DateTime<Utc>) -> Self {
        Self {
            messages_used: 0,
            messages_limit,
            reset_date: first_of_next_month(now),
        }
    }
}

/// One entry per calendar day with tracked activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub messages: u32,
}

/// Midnight UTC on the 1st of the month following `now`.
pub fn first_of_next_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first = today.with_day(1).unwrap_or(today);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(first);
    Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN))
}
