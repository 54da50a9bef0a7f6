//! Usage ledger: per-period counters and daily history.

use crate::models::{first_of_next_month, DailyUsage, User};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Resets the period counter once `now` has passed the reset date.
///
/// The next reset date is always the 1st of the month after `now`, so a user
/// returning after several idle months advances in one step.
pub fn rollover_if_due(user: &mut User, now: DateTime<Utc>) -> bool {
    if now <= user.usage.reset_date {
        return false;
    }

    user.usage.messages_used = 0;
    user.usage.reset_date = first_of_next_month(now);
    tracing::info!(
        user_id = %user.id,
        reset_date = %user.usage.reset_date,
        "Usage period rolled over"
    );
    true
}

/// Charges `count` messages to the plan quota and records the daily activity.
pub fn record_consumption(user: &mut User, count: u32, now: DateTime<Utc>) {
    user.usage.messages_used = user.usage.messages_used.saturating_add(count);
    track_daily(&mut user.usage_history, count, now.date_naive());
}

/// Upserts the entry for `day`, keeping the history ordered by date.
pub fn track_daily(history: &mut Vec<DailyUsage>, count: u32, day: NaiveDate) {
    match history.binary_search_by_key(&day, |entry| entry.date) {
        Ok(idx) => history[idx].messages = history[idx].messages.saturating_add(count),
        Err(idx) => history.insert(
            idx,
            DailyUsage {
                date: day,
                messages: count,
            },
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl HistoryPeriod {
    /// Unknown values fall back to `Daily`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("weekly") => HistoryPeriod::Weekly,
            Some("monthly") => HistoryPeriod::Monthly,
            _ => HistoryPeriod::Daily,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::Daily => "daily",
            HistoryPeriod::Weekly => "weekly",
            HistoryPeriod::Monthly => "monthly",
        }
    }

    fn start(&self, today: NaiveDate) -> NaiveDate {
        match self {
            HistoryPeriod::Daily => today - Duration::days(30),
            HistoryPeriod::Weekly => today - Duration::days(7),
            HistoryPeriod::Monthly => today.with_day(1).unwrap_or(today),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub period: &'static str,
    pub total_messages: u64,
    pub average_per_day: u64,
    pub peak_usage: u32,
    pub series: Vec<DailyUsage>,
}

pub fn aggregate_history(
    history: &[DailyUsage],
    period: HistoryPeriod,
    now: DateTime<Utc>,
) -> HistorySummary {
    let start = period.start(now.date_naive());
    let series: Vec<DailyUsage> = history
        .iter()
        .filter(|entry| entry.date >= start)
        .cloned()
        .collect();

    let total_messages: u64 = series.iter().map(|e| u64::from(e.messages)).sum();
    let average_per_day = if series.is_empty() {
        0
    } else {
        (total_messages as f64 / series.len() as f64).round() as u64
    };
    let peak_usage = series.iter().map(|e| e.messages).max().unwrap_or(0);

    HistorySummary {
        period: period.as_str(),
        total_messages,
        average_per_day,
        peak_usage,
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user_created(now: DateTime<Utc>) -> User {
        User::community(NewUser::default(), 50, now)
    }

    #[test]
    fn rollover_resets_counter_after_reset_date() {
        let mut user = user_created(at(2024, 2, 10));
        user.usage.messages_used = 42;
        assert_eq!(
            user.usage.reset_date,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );

        assert!(!rollover_if_due(&mut user, at(2024, 2, 29)));
        assert_eq!(user.usage.messages_used, 42);

        assert!(rollover_if_due(&mut user, at(2024, 3, 15)));
        assert_eq!(user.usage.messages_used, 0);
        assert_eq!(
            user.usage.reset_date,
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rollover_advances_a_single_step_after_long_idle() {
        let mut user = user_created(at(2024, 2, 10));
        user.usage.messages_used = 7;

        assert!(rollover_if_due(&mut user, at(2024, 9, 20)));
        assert_eq!(user.usage.messages_used, 0);
        assert_eq!(
            user.usage.reset_date,
            Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()
        );
        assert!(!rollover_if_due(&mut user, at(2024, 9, 21)));
    }

    #[test]
    fn record_consumption_upserts_today() {
        let mut user = user_created(at(2024, 2, 10));
        record_consumption(&mut user, 1, at(2024, 2, 10));
        record_consumption(&mut user, 2, at(2024, 2, 10));
        record_consumption(&mut user, 1, at(2024, 2, 11));

        assert_eq!(user.usage.messages_used, 4);
        assert_eq!(
            user.usage_history,
            vec![
                DailyUsage {
                    date: day(2024, 2, 10),
                    messages: 3
                },
                DailyUsage {
                    date: day(2024, 2, 11),
                    messages: 1
                },
            ]
        );
    }

    #[test]
    fn track_daily_keeps_dates_ordered() {
        let mut history = Vec::new();
        track_daily(&mut history, 1, day(2024, 2, 12));
        track_daily(&mut history, 1, day(2024, 2, 10));
        track_daily(&mut history, 1, day(2024, 2, 11));

        let dates: Vec<NaiveDate> = history.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(2024, 2, 10), day(2024, 2, 11), day(2024, 2, 12)]);
    }

    #[test]
    fn aggregate_filters_by_period_window() {
        let history = vec![
            DailyUsage {
                date: day(2024, 1, 20),
                messages: 10,
            },
            DailyUsage {
                date: day(2024, 2, 1),
                messages: 4,
            },
            DailyUsage {
                date: day(2024, 2, 14),
                messages: 5,
            },
            DailyUsage {
                date: day(2024, 2, 15),
                messages: 2,
            },
        ];
        let now = at(2024, 2, 15);

        let weekly = aggregate_history(&history, HistoryPeriod::Weekly, now);
        assert_eq!(weekly.total_messages, 7);
        assert_eq!(weekly.average_per_day, 4);
        assert_eq!(weekly.peak_usage, 5);
        assert_eq!(weekly.series.len(), 2);

        let monthly = aggregate_history(&history, HistoryPeriod::Monthly, now);
        assert_eq!(monthly.total_messages, 11);

        let daily = aggregate_history(&history, HistoryPeriod::Daily, now);
        assert_eq!(daily.total_messages, 21);
        assert_eq!(daily.peak_usage, 10);
    }

    #[test]
    fn empty_history_aggregates_to_zero() {
        let summary = aggregate_history(&[], HistoryPeriod::Monthly, at(2024, 2, 15));
        assert_eq!(summary.total_messages, 0);
        assert_eq!(summary.average_per_day, 0);
        assert_eq!(summary.peak_usage, 0);
    }

    #[test]
    fn unknown_period_defaults_to_daily() {
        assert_eq!(HistoryPeriod::parse(Some("hourly")), HistoryPeriod::Daily);
        assert_eq!(HistoryPeriod::parse(None), HistoryPeriod::Daily);
        assert_eq!(HistoryPeriod::parse(Some("Weekly")), HistoryPeriod::Weekly);
    }
}
