//! Upcoming-window derivation: the ordered subset of loaded records
//! whose meeting (BOP) date falls inside an operator-chosen date range.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::datetime::resolve_local;
use crate::records::ClientRecord;

/// A record admitted to the upcoming window, paired with its parsed
/// meeting instant so consumers don't re-parse the stored string.
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingRecord {
    pub record: ClientRecord,
    pub bop_instant: DateTime<Utc>,
}

/// Filter `rows` to those whose BOP date lies inside `[start, end]`.
///
/// The bounds are the midnights of `start` and `end` in `tz`, and the
/// meeting *instant* is compared against them inclusively, so a meeting
/// later in the end day is outside the window. Records with an absent
/// or unparseable BOP date are skipped silently ("not yet scheduled" is
/// an expected state). The result is sorted ascending by instant; ties
/// keep their original relative order. `start > end` yields an empty
/// window with no implicit swap.
pub fn upcoming_window<Tz: TimeZone>(
    rows: &[ClientRecord],
    start: NaiveDate,
    end: NaiveDate,
    tz: &Tz,
) -> Vec<UpcomingRecord> {
    let bounds = resolve_local(tz, start.and_time(NaiveTime::MIN))
        .zip(resolve_local(tz, end.and_time(NaiveTime::MIN)));
    let Some((start_bound, end_bound)) = bounds else {
        return Vec::new();
    };
    let start_bound = start_bound.with_timezone(&Utc);
    let end_bound = end_bound.with_timezone(&Utc);

    let mut window: Vec<UpcomingRecord> = rows
        .iter()
        .filter_map(|record| {
            let raw = record.bop_date.as_deref()?;
            let instant = DateTime::parse_from_rfc3339(raw).ok()?.with_timezone(&Utc);
            (instant >= start_bound && instant <= end_bound).then(|| UpcomingRecord {
                record: record.clone(),
                bop_instant: instant,
            })
        })
        .collect();
    // sort_by_key is stable, so same-instant records keep load order
    window.sort_by_key(|entry| entry.bop_instant);
    window
}
