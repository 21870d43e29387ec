use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::error::{NoiseError, Result};

pub const DAYS_PER_WEEK: u8 = 7;
pub const HOURS_PER_DAY: u8 = 24;

/// Sparse day-of-week × hour-of-day occurrence counts.
///
/// Days are numbered 0=Sunday..6=Saturday, hours 0..23. Cells that were never
/// incremented are absent and read as zero. Serializes as nested objects keyed
/// by the decimal day and hour, e.g. `{"0": {"9": 2}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HistogramGrid {
    cells: BTreeMap<u8, BTreeMap<u8, u64>>,
}

impl HistogramGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, day: u8, hour: u8) -> Result<()> {
        if day >= DAYS_PER_WEEK {
            return Err(NoiseError::precondition(format!(
                "day of week {day} is outside 0..{DAYS_PER_WEEK}"
            )));
        }
        if hour >= HOURS_PER_DAY {
            return Err(NoiseError::precondition(format!(
                "hour {hour} is outside 0..{HOURS_PER_DAY}"
            )));
        }

        *self.cells.entry(day).or_default().entry(hour).or_insert(0) += 1;
        Ok(())
    }

    /// Count one occurrence at the local day and hour of `datetime`.
    pub fn record(&mut self, datetime: &NaiveDateTime) -> Result<()> {
        let day = datetime.weekday().num_days_from_sunday() as u8;
        let hour = datetime.hour() as u8;
        self.accumulate(day, hour)
    }

    pub fn get(&self, day: u8, hour: u8) -> u64 {
        self.cells
            .get(&day)
            .and_then(|hours| hours.get(&hour))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.cells.values().flat_map(|hours| hours.values()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Non-zero cells as `(day, hour, count)`, ordered by day then hour.
    pub fn cells(&self) -> impl Iterator<Item = (u8, u8, u64)> + '_ {
        self.cells.iter().flat_map(|(&day, hours)| {
            hours.iter().map(move |(&hour, &count)| (day, hour, count))
        })
    }
}
