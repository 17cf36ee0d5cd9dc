//! Timestamp feature engineering for card transactions.
//!
//! Derives hour of day, weekday name and the gap since the previous
//! transaction on the same card. Gaps are computed per account in ascending
//! timestamp order, but records are returned in their input order.

use crate::error::{PipelineError, PipelineResult};
use crate::types::transaction::{EngineeredRecord, TransactionRecord};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a transaction timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (optionally with fractional seconds or a `T`
/// separator), RFC 3339 with an offset, or a bare date. Values without an
/// offset are taken as UTC. The offset is kept: hour and weekday come from the
/// recorded wall-clock time, ordering and gaps from the instant.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();

    for format in NAIVE_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.and_utc().fixed_offset());
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().fixed_offset())
}

/// Engineer that adds the derived timestamp columns to a batch of records.
pub struct TimestampFeatures;

impl TimestampFeatures {
    pub fn new() -> Self {
        Self
    }

    /// Engineer a batch.
    ///
    /// Fails the whole batch if any timestamp is unparseable. Output order
    /// matches input order.
    pub fn engineer(&self, records: Vec<TransactionRecord>) -> PipelineResult<Vec<EngineeredRecord>> {
        let datetimes = records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                parse_timestamp(&record.timestamp).ok_or_else(|| PipelineError::Parse {
                    row,
                    value: record.timestamp.clone(),
                })
            })
            .collect::<PipelineResult<Vec<DateTime<FixedOffset>>>>()?;

        let gaps = time_since_last_minutes(&records, &datetimes);

        let engineered = records
            .into_iter()
            .zip(datetimes)
            .zip(gaps)
            .map(|((record, parsed), gap)| EngineeredRecord {
                hour: parsed.hour(),
                day_name: parsed.format("%A").to_string(),
                datetime: parsed.naive_local(),
                time_since_last_minutes: gap,
                record,
            })
            .collect();

        Ok(engineered)
    }

    /// Names of the derived columns.
    pub fn feature_names(&self) -> Vec<&'static str> {
        vec!["hour", "day_name", "time_since_last_minutes"]
    }
}

impl Default for TimestampFeatures {
    fn default() -> Self {
        Self::new()
    }
}

/// Minutes since the previous record of the same account, indexed by the
/// input position. Ties on timestamp keep input order.
fn time_since_last_minutes(
    records: &[TransactionRecord],
    datetimes: &[DateTime<FixedOffset>],
) -> Vec<Option<f64>> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| {
        records[a]
            .account_id
            .cmp(&records[b].account_id)
            .then(datetimes[a].cmp(&datetimes[b]))
    });

    let mut gaps = vec![None; records.len()];
    let mut previous: Option<usize> = None;

    for index in order {
        if let Some(prev) = previous {
            if records[prev].account_id == records[index].account_id {
                let delta = datetimes[index] - datetimes[prev];
                let minutes = match delta.num_microseconds() {
                    Some(micros) => micros as f64 / 60_000_000.0,
                    None => delta.num_seconds() as f64 / 60.0,
                };
                gaps[index] = Some(minutes);
            }
        }
        previous = Some(index);
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(account: &str, timestamp: &str) -> TransactionRecord {
        TransactionRecord::new(account, timestamp, Some(10.0), Some("food"))
    }

    #[test]
    fn test_parse_formats() {
        let expected = NaiveDateTime::parse_from_str("2019-01-01 10:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let local = |value: &str| parse_timestamp(value).map(|d| d.naive_local());

        assert_eq!(local("2019-01-01 10:30:00"), Some(expected));
        assert_eq!(local("2019-01-01T10:30:00"), Some(expected));
        assert_eq!(local("2019-01-01T10:30:00+02:00"), Some(expected));
        assert_eq!(local(" 2019-01-01 10:30:00.000 "), Some(expected));
        assert_eq!(
            parse_timestamp("2019-01-01T12:30:00+02:00").map(|d| d.naive_utc()),
            Some(expected)
        );
        assert_eq!(parse_timestamp("2019-01-01").map(|d| d.hour()), Some(0));
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_offset_timestamp_keeps_wall_clock_hour() {
        let engineered = TimestampFeatures::new()
            .engineer(vec![record("A", "2019-01-01T23:30:00-05:00")])
            .unwrap();

        assert_eq!(engineered[0].hour, 23);
        assert_eq!(engineered[0].day_name, "Tuesday");
        assert_eq!(
            engineered[0].datetime,
            NaiveDateTime::parse_from_str("2019-01-01 23:30:00", "%Y-%m-%d %H:%M:%S").unwrap()
        );
    }

    #[test]
    fn test_gaps_use_instants_across_offsets() {
        // 23:30 at -05:00 is 04:30 UTC, 20 minutes before 06:50 at +02:00
        let records = vec![
            record("A", "2019-01-02T06:50:00+02:00"),
            record("A", "2019-01-01T23:30:00-05:00"),
        ];

        let engineered = TimestampFeatures::new().engineer(records).unwrap();

        assert_eq!(engineered[0].time_since_last_minutes, Some(20.0));
        assert_eq!(engineered[1].time_since_last_minutes, None);
    }

    #[test]
    fn test_sub_millisecond_gap_kept() {
        let records = vec![
            record("A", "2019-01-01 10:00:00"),
            record("A", "2019-01-01 10:00:00.000030"),
        ];

        let engineered = TimestampFeatures::new().engineer(records).unwrap();
        let gap = engineered[1].time_since_last_minutes.unwrap();

        assert!((gap - 0.00003 / 60.0).abs() < 1e-15);
    }

    #[test]
    fn test_hour_and_day_name() {
        let engineered = TimestampFeatures::new()
            .engineer(vec![record("A", "2019-01-01 23:59:59")])
            .unwrap();

        assert_eq!(engineered[0].hour, 23);
        assert_eq!(engineered[0].day_name, "Tuesday");
    }

    #[test]
    fn test_time_delta_per_account() {
        let records = vec![
            record("A", "2019-01-01 10:00:00"),
            record("A", "2019-01-01 10:05:00"),
            record("A", "2019-01-01 10:15:00"),
        ];

        let engineered = TimestampFeatures::new().engineer(records).unwrap();
        let gaps: Vec<Option<f64>> = engineered.iter().map(|r| r.time_since_last_minutes).collect();

        assert_eq!(gaps, vec![None, Some(5.0), Some(10.0)]);
    }

    #[test]
    fn test_row_order_restored() {
        // Unsorted input, two interleaved accounts
        let records = vec![
            record("B", "2019-01-01 12:00:00"),
            record("A", "2019-01-01 10:15:00"),
            record("B", "2019-01-01 11:00:00"),
            record("A", "2019-01-01 10:00:00"),
        ];

        let engineered = TimestampFeatures::new().engineer(records.clone()).unwrap();

        for (input, output) in records.iter().zip(&engineered) {
            assert_eq!(input, &output.record);
        }
        let gaps: Vec<Option<f64>> = engineered.iter().map(|r| r.time_since_last_minutes).collect();
        assert_eq!(gaps, vec![Some(60.0), Some(15.0), None, None]);
    }

    #[test]
    fn test_single_record_account_is_missing() {
        let engineered = TimestampFeatures::new()
            .engineer(vec![record("solo", "2019-06-01 08:00:00")])
            .unwrap();
        assert_eq!(engineered[0].time_since_last_minutes, None);
    }

    #[test]
    fn test_duplicate_timestamps_are_stable() {
        let mut first = record("A", "2019-01-01 10:00:00");
        first.amount = Some(1.0);
        let mut second = record("A", "2019-01-01 10:00:00");
        second.amount = Some(2.0);

        let engineered = TimestampFeatures::new().engineer(vec![first, second]).unwrap();

        assert_eq!(engineered[0].time_since_last_minutes, None);
        assert_eq!(engineered[1].time_since_last_minutes, Some(0.0));
    }

    #[test]
    fn test_unparseable_timestamp_fails_batch() {
        let records = vec![
            record("A", "2019-01-01 10:00:00"),
            record("A", "13/45/2019"),
        ];

        let err = TimestampFeatures::new().engineer(records).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Parse {
                row: 1,
                value: "13/45/2019".to_string()
            }
        );
    }
}
