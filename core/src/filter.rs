//! Recency filter: keeps records whose `lastused` falls inside the active window

use crate::config::TimestampConvention;
use crate::dataset::{Dataset, RecencyStamp};
use crate::error::{ForceDiffError, Result};
use chrono::{DateTime, Duration, Utc};

/// Result of filtering a dataset
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Surviving records, input order preserved
    pub kept: Dataset,
    pub cutoff: RecencyStamp,
    pub dropped_null: usize,
    pub dropped_stale: usize,
}

/// Express `now` in the given convention so it can be compared with parsed stamps
pub fn reference_instant(now: DateTime<Utc>, convention: TimestampConvention) -> RecencyStamp {
    match convention {
        TimestampConvention::Utc => RecencyStamp::Aware(now),
        TimestampConvention::Naive => RecencyStamp::Naive(now.naive_utc()),
    }
}

/// Trailing-window recency filter.
///
/// A record is kept iff its stamp is non-null and `stamp >= now - window_days`.
/// Every non-null stamp must share the reference instant's convention
/// (UTC-aware or naive); a mismatch is a configuration error and nothing is
/// coerced.
#[derive(Debug, Clone, Copy)]
pub struct RecordFilter {
    window_days: u32,
}

impl RecordFilter {
    pub fn new(window_days: u32) -> Result<Self> {
        if window_days == 0 {
            return Err(ForceDiffError::configuration(
                "window_days must be a positive integer",
            ));
        }
        Ok(Self { window_days })
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn cutoff(&self, now: RecencyStamp) -> Result<RecencyStamp> {
        let window = Duration::days(i64::from(self.window_days));
        let cutoff = match now {
            RecencyStamp::Aware(ts) => ts.checked_sub_signed(window).map(RecencyStamp::Aware),
            RecencyStamp::Naive(ts) => ts.checked_sub_signed(window).map(RecencyStamp::Naive),
        };
        cutoff.ok_or_else(|| {
            ForceDiffError::configuration(format!(
                "A {}-day window before {now} is out of range",
                self.window_days
            ))
        })
    }

    pub fn filter(&self, dataset: &Dataset, now: RecencyStamp) -> Result<FilterOutcome> {
        let cutoff = self.cutoff(now)?;
        let mut kept = Vec::with_capacity(dataset.len());
        let mut dropped_null = 0;
        let mut dropped_stale = 0;

        for (row, record) in dataset.records().iter().enumerate() {
            let Some(stamp) = record.last_used else {
                dropped_null += 1;
                continue;
            };
            if is_recent(stamp, cutoff).ok_or_else(|| {
                ForceDiffError::configuration(format!(
                    "Row {}: timestamp {stamp} is {:?} but the reference instant is {:?}; \
                     set window.timestamps to match the data",
                    row + 1,
                    stamp.convention(),
                    now.convention()
                ))
            })? {
                kept.push(record.clone());
            } else {
                dropped_stale += 1;
            }
        }

        log::debug!(
            "Recency filter kept {} of {} rows (cutoff {cutoff}, {dropped_null} without timestamp, {dropped_stale} stale)",
            kept.len(),
            dataset.len()
        );

        Ok(FilterOutcome {
            kept: dataset.with_same_columns(kept),
            cutoff,
            dropped_null,
            dropped_stale,
        })
    }
}

/// `None` when the two stamps use different conventions
fn is_recent(stamp: RecencyStamp, cutoff: RecencyStamp) -> Option<bool> {
    match (stamp, cutoff) {
        (RecencyStamp::Aware(ts), RecencyStamp::Aware(cut)) => Some(ts >= cut),
        (RecencyStamp::Naive(ts), RecencyStamp::Naive(cut)) => Some(ts >= cut),
        _ => None,
    }
}

/// Convenience wrapper returning only the surviving records
pub fn filter(dataset: &Dataset, now: RecencyStamp, window_days: u32) -> Result<Dataset> {
    Ok(RecordFilter::new(window_days)?.filter(dataset, now)?.kept)
}
