//! Weekly aggregation of the upcoming window for the trend chart.

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

use crate::upcoming::UpcomingRecord;

/// One chart bar: a Monday-aligned week and the number of meetings in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBucket {
    pub week_start: NaiveDate,
    pub count: u64,
}

/// Bucket the window by the Monday-aligned week containing each meeting
/// instant, with week boundaries taken in `tz`.
///
/// The result is ascending by week start. Weeks with no meetings are not
/// emitted; gaps in the series are implicit. Bucket counts always sum
/// to the input length.
pub fn weekly_buckets<Tz: TimeZone>(window: &[UpcomingRecord], tz: &Tz) -> Vec<WeekBucket> {
    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for entry in window {
        let day = entry.bop_instant.with_timezone(tz).date_naive();
        let week_start = day.week(Weekday::Mon).first_day();
        *counts.entry(week_start).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(week_start, count)| WeekBucket { week_start, count })
        .collect()
}
