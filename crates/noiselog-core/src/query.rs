//! Read paths composed from record store cursors.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, error};

use crate::error::{NoiseError, Result};
use crate::histogram::HistogramGrid;
use crate::models::{NoiseEvent, NoiseField, PagedResult};
use crate::search::SearchCriteria;
use crate::store::{Direction, KeyRange, RecordStore};

/// Most-recent-first matches plus their day/hour histogram.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub logs: Vec<NoiseEvent>,
    pub histogram: HistogramGrid,
}

fn precondition(message: String) -> NoiseError {
    error!("{}", message);
    NoiseError::Precondition(message)
}

/// Page `page` (1-based) of the store, most recent first.
///
/// `total` is the size of the whole store. A page past the end is empty.
pub fn get_page<S: RecordStore + ?Sized>(
    store: &S,
    page: i64,
    page_size: i64,
) -> Result<PagedResult<NoiseEvent>> {
    if page < 1 {
        return Err(precondition(format!("page must be at least 1, got {page}")));
    }
    if page_size < 1 {
        return Err(precondition(format!(
            "page size must be at least 1, got {page_size}"
        )));
    }

    let (page, page_size) = (page as u64, page_size as u64);
    // Saturates: a skip that large is past the end of any store
    let skip = (page - 1).saturating_mul(page_size);

    let total = store.count()?;
    if skip >= total {
        debug!(page, page_size, total, "page is past the end");
        return Ok(PagedResult {
            total,
            page,
            values: Vec::new(),
        });
    }

    let mut cursor = store.open_cursor(&KeyRange::unbounded(), Direction::Reverse)?;
    if skip > 0 {
        cursor.advance(skip)?;
    }

    let mut values = Vec::with_capacity(page_size.min(256) as usize);
    while let Some(event) = cursor.value() {
        values.push(event.clone());
        if values.len() as u64 >= page_size {
            break;
        }
        cursor.step()?;
    }

    debug!(page, page_size, total, returned = values.len(), "served page");

    Ok(PagedResult {
        total,
        page,
        values,
    })
}

/// Every distinct value of `field`, in no particular order.
pub fn distinct_values<S: RecordStore + ?Sized>(
    store: &S,
    field: NoiseField,
) -> Result<HashSet<String>> {
    let mut values = HashSet::new();
    let mut cursor = store.open_cursor(&KeyRange::unbounded(), Direction::Forward)?;

    while let Some(event) = cursor.value() {
        let value = event.field(field);
        if !values.contains(value) {
            values.insert(value.to_string());
        }
        cursor.step()?;
    }

    debug!(%field, distinct = values.len(), "collected distinct values");
    Ok(values)
}

/// All records in the criteria's date range that pass its filters, most recent
/// first, with a histogram built from exactly those records.
pub fn search<S: RecordStore + ?Sized>(store: &S, criteria: &SearchCriteria) -> Result<SearchResult> {
    let mut result = SearchResult::default();
    let mut scanned = 0u64;
    let mut cursor = store.open_cursor(&criteria.key_range(), Direction::Reverse)?;

    while let Some(event) = cursor.value() {
        scanned += 1;
        if criteria.matches(event) {
            result.histogram.record(&event.local_datetime()?)?;
            result.logs.push(event.clone());
        }
        cursor.step()?;
    }

    debug!(
        scanned,
        matched = result.logs.len(),
        filters = criteria.filter.clauses().len(),
        "search finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::EventFilter;
    use crate::store::{MemoryStore, SqliteStore};
    use chrono::NaiveDate;

    fn event(datetime: &str, source: &str) -> NoiseEvent {
        NoiseEvent::new(datetime, "Bedroom", source, "Bass", "High")
    }

    fn store_with(count: u32) -> MemoryStore {
        let mut store = MemoryStore::new();
        for i in 0..count {
            let datetime = format!("2024-03-{:02}T{:02}:00:00", 1 + i / 24, i % 24);
            store.insert(&event(&datetime, "TV")).unwrap();
        }
        store
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_pages_are_most_recent_first() {
        let store = store_with(7);
        let page = get_page(&store, 1, 7).unwrap();
        assert_eq!(page.values.len(), 7);
        assert!(page
            .values
            .windows(2)
            .all(|w| w[0].datetime > w[1].datetime));
    }

    #[test]
    fn test_pagination_completeness() {
        let store = store_with(23);
        let sizes: Vec<usize> = (1..=4)
            .map(|page| {
                let result = get_page(&store, page, 10).unwrap();
                assert_eq!(result.total, 23);
                assert_eq!(result.page, page as u64);
                result.values.len()
            })
            .collect();
        assert_eq!(sizes, vec![10, 10, 3, 0]);

        // Pages neither overlap nor leave gaps
        let mut keys: Vec<String> = (1..=3)
            .flat_map(|page| get_page(&store, page, 10).unwrap().values)
            .map(|e| e.datetime)
            .collect();
        keys.dedup();
        assert_eq!(keys.len(), 23);
    }

    #[test]
    fn test_invalid_page_arguments() {
        let store = store_with(3);
        assert_eq!(get_page(&store, 0, 10).unwrap_err().kind(), "precondition");
        assert_eq!(get_page(&store, 1, 0).unwrap_err().kind(), "precondition");
        assert_eq!(get_page(&store, 1, -5).unwrap_err().kind(), "precondition");
    }

    #[test]
    fn test_huge_page_numbers_are_past_the_end() {
        let memory = store_with(3);
        let mut sqlite = SqliteStore::open_in_memory().unwrap();
        for i in 0..3 {
            sqlite
                .insert(&event(&format!("2024-03-01T{i:02}:00:00"), "TV"))
                .unwrap();
        }
        let stores: [&dyn RecordStore; 2] = [&memory, &sqlite];

        for store in stores {
            for (page, size) in [(i64::MAX, 10), (i64::MAX, i64::MAX), ((1 << 62) + 1, 2)] {
                let result = get_page(store, page, size).unwrap();
                assert_eq!(result.total, 3);
                assert_eq!(result.page, page as u64);
                assert!(result.values.is_empty());
            }
        }
    }

    #[test]
    fn test_empty_store_page() {
        let store = MemoryStore::new();
        let page = get_page(&store, 1, 10).unwrap();
        assert_eq!(page.total, 0);
        assert!(page.is_empty());
    }

    #[test]
    fn test_distinct_values_collapse_duplicates() {
        let mut store = MemoryStore::new();
        store.insert(&event("2024-01-01T10:00:00", "TV")).unwrap();
        store.insert(&event("2024-01-01T11:00:00", "TV")).unwrap();
        store.insert(&event("2024-01-01T12:00:00", "Radio")).unwrap();

        let sources = distinct_values(&store, NoiseField::Source).unwrap();
        assert_eq!(
            sources,
            HashSet::from(["TV".to_string(), "Radio".to_string()])
        );
        let listeners = distinct_values(&store, NoiseField::Listener).unwrap();
        assert_eq!(listeners, HashSet::from(["Bedroom".to_string()]));
    }

    #[test]
    fn test_search_substring_filter() {
        let mut store = MemoryStore::new();
        store.insert(&event("2024-01-01T10:00:00", "Neighbor TV")).unwrap();
        store.insert(&event("2024-01-01T11:00:00", "Street noise")).unwrap();

        let criteria = SearchCriteria::new(
            None,
            None,
            EventFilter::new().with(NoiseField::Source, Some("TV")),
        )
        .unwrap();
        let result = search(&store, &criteria).unwrap();
        assert_eq!(result.logs.len(), 1);
        assert_eq!(result.logs[0].source, "Neighbor TV");
        assert_eq!(result.histogram.total(), 1);
        // 2024-01-01 is a Monday
        assert_eq!(result.histogram.get(1, 10), 1);
    }

    #[test]
    fn test_search_histogram_counts_matches_only() {
        let mut store = MemoryStore::new();
        // 2024-01-07 is a Sunday
        store.insert(&event("2024-01-07T09:00:00", "TV")).unwrap();
        store.insert(&event("2024-01-07T09:30:00", "TV")).unwrap();
        store.insert(&event("2024-01-07T14:15:00", "TV")).unwrap();
        store.insert(&event("2024-01-08T14:15:00", "Radio")).unwrap();

        let criteria = SearchCriteria::new(
            None,
            None,
            EventFilter::new().with(NoiseField::Source, Some("TV")),
        )
        .unwrap();
        let result = search(&store, &criteria).unwrap();

        assert_eq!(result.histogram.get(0, 9), 2);
        assert_eq!(result.histogram.get(0, 14), 1);
        assert_eq!(result.histogram.total(), 3);
        assert_eq!(result.logs[0].datetime, "2024-01-07T14:15:00");
    }

    #[test]
    fn test_search_range_is_inclusive_of_boundary_days() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for datetime in [
            "2023-12-31T23:59:00",
            "2024-01-01T00:00:00",
            "2024-01-15T12:00:00",
            "2024-01-31T23:59:00",
            "2024-02-01T00:00:00",
        ] {
            store.insert(&event(datetime, "TV")).unwrap();
        }

        let criteria =
            SearchCriteria::new(date(2024, 1, 1), date(2024, 1, 31), EventFilter::new()).unwrap();
        let keys: Vec<String> = search(&store, &criteria)
            .unwrap()
            .logs
            .into_iter()
            .map(|e| e.datetime)
            .collect();
        assert_eq!(
            keys,
            vec![
                "2024-01-31T23:59:00",
                "2024-01-15T12:00:00",
                "2024-01-01T00:00:00"
            ]
        );

        let to_only = SearchCriteria::new(None, date(2024, 1, 1), EventFilter::new()).unwrap();
        assert_eq!(search(&store, &to_only).unwrap().logs.len(), 2);
    }

    #[test]
    fn test_reads_are_idempotent() {
        let store = store_with(30);
        assert_eq!(get_page(&store, 2, 7).unwrap(), get_page(&store, 2, 7).unwrap());

        let criteria = SearchCriteria::new(
            date(2024, 3, 1),
            None,
            EventFilter::new().with(NoiseField::Source, Some("T")),
        )
        .unwrap();
        assert_eq!(
            search(&store, &criteria).unwrap(),
            search(&store, &criteria).unwrap()
        );
    }

    #[test]
    fn test_backends_agree() {
        let mut memory = MemoryStore::new();
        let mut sqlite = SqliteStore::open_in_memory().unwrap();
        for i in 0..15u32 {
            let e = event(
                &format!("2024-05-{:02}T{:02}:30:00", 1 + i % 9, i),
                if i % 3 == 0 { "Radio" } else { "TV" },
            );
            memory.insert(&e).unwrap();
            sqlite.insert(&e).unwrap();
        }

        assert_eq!(get_page(&memory, 2, 4).unwrap(), get_page(&sqlite, 2, 4).unwrap());
        assert_eq!(
            distinct_values(&memory, NoiseField::Source).unwrap(),
            distinct_values(&sqlite, NoiseField::Source).unwrap()
        );
        let criteria =
            SearchCriteria::new(date(2024, 5, 3), date(2024, 5, 7), EventFilter::new()).unwrap();
        assert_eq!(
            search(&memory, &criteria).unwrap(),
            search(&sqlite, &criteria).unwrap()
        );
    }
}
