//! Search criteria and record predicates.
//!
//! Filters are pure substring tests combined with AND semantics, so they can
//! be evaluated in any order without changing which records match.

use std::ops::Bound;

use chrono::NaiveDate;

use crate::error::{NoiseError, Result};
use crate::models::{parse_local_datetime, NoiseEvent, NoiseField};
use crate::store::KeyRange;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Case-sensitive substring containment. An empty needle matches everything.
pub fn text_contains(text: &str, needle: &str) -> bool {
    needle.is_empty() || text.contains(needle)
}

/// One `field contains needle` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: NoiseField,
    pub needle: String,
}

impl FieldFilter {
    pub fn new(field: NoiseField, needle: impl Into<String>) -> Self {
        Self {
            field,
            needle: needle.into(),
        }
    }

    pub fn matches(&self, event: &NoiseEvent) -> bool {
        text_contains(event.field(self.field), &self.needle)
    }
}

/// Conjunction of [`FieldFilter`]s. No clauses matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    clauses: Vec<FieldFilter>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause unless `needle` is absent or empty.
    pub fn with(mut self, field: NoiseField, needle: Option<&str>) -> Self {
        if let Some(needle) = needle.filter(|n| !n.is_empty()) {
            self.clauses.push(FieldFilter::new(field, needle));
        }
        self
    }

    pub fn matches(&self, event: &NoiseEvent) -> bool {
        self.clauses.iter().all(|clause| clause.matches(event))
    }

    pub fn clauses(&self) -> &[FieldFilter] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Parse a calendar date. A full date-time is accepted and truncated to its date.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .ok()
        .or_else(|| parse_local_datetime(input).ok().map(|dt| dt.date()))
        .ok_or_else(|| NoiseError::validation(format!("'{input}' is not an ISO-8601 date")))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// First day included in the search
    pub from: Option<NaiveDate>,
    /// Last day included in the search
    pub to: Option<NaiveDate>,
    pub filter: EventFilter,
}

impl SearchCriteria {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>, filter: EventFilter) -> Result<Self> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(NoiseError::validation(format!(
                    "search range starts ({from}) after it ends ({to})"
                )));
            }
        }
        Ok(Self { from, to, filter })
    }

    /// Key range covering every time of day on the boundary days.
    ///
    /// Keys are canonical date-times, so a bare `YYYY-MM-DD` sorts before every
    /// key on that day and the next day's date sorts after all of them.
    pub fn key_range(&self) -> KeyRange {
        let lower = match self.from {
            Some(from) => Bound::Included(from.format(DATE_FORMAT).to_string()),
            None => Bound::Unbounded,
        };
        let upper = match self.to.map(|to| to.succ_opt()) {
            Some(Some(next_day)) => Bound::Excluded(next_day.format(DATE_FORMAT).to_string()),
            // No day after the last representable date: nothing is later anyway
            Some(None) | None => Bound::Unbounded,
        };
        KeyRange::unbounded().with_lower(lower).with_upper(upper)
    }

    pub fn matches(&self, event: &NoiseEvent) -> bool {
        self.filter.matches(event)
    }
}
