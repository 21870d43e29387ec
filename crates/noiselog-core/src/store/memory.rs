use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ops::Bound;

use super::{Cursor, Direction, KeyRange, RecordStore};
use crate::error::{NoiseError, Result};
use crate::models::NoiseEvent;

/// Non-durable store over a `BTreeMap`. Same ordering and duplicate semantics as [`super::SqliteStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<String, NoiseEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn insert(&mut self, event: &NoiseEvent) -> Result<()> {
        match self.records.entry(event.datetime.clone()) {
            Entry::Occupied(_) => Err(NoiseError::DuplicateKey(event.datetime.clone())),
            Entry::Vacant(slot) => {
                slot.insert(event.clone());
                Ok(())
            }
        }
    }

    fn count(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }

    fn open_cursor<'a>(
        &'a self,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Box<dyn Cursor + 'a>> {
        let mut cursor = MemoryCursor {
            records: &self.records,
            range: range.clone(),
            direction,
            position: None,
            done: false,
        };
        let first = cursor.nth_remaining(0);
        cursor.settle(first);
        Ok(Box::new(cursor))
    }
}

struct MemoryCursor<'a> {
    records: &'a BTreeMap<String, NoiseEvent>,
    range: KeyRange,
    direction: Direction,
    position: Option<&'a NoiseEvent>,
    done: bool,
}

/// `BTreeMap::range` panics on inverted bounds, so those are treated as empty up front.
fn is_empty_span(lower: &Bound<&str>, upper: &Bound<&str>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo) | Bound::Excluded(lo), Bound::Included(hi) | Bound::Excluded(hi)) => {
            lo >= hi
        }
        _ => false,
    }
}

fn as_str_bound(bound: &Bound<String>) -> Bound<&str> {
    match bound {
        Bound::Included(key) => Bound::Included(key.as_str()),
        Bound::Excluded(key) => Bound::Excluded(key.as_str()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

impl<'a> MemoryCursor<'a> {
    /// The record `n` places past the current position.
    fn nth_remaining(&self, n: u64) -> Option<&'a NoiseEvent> {
        let mut lower = as_str_bound(&self.range.lower);
        let mut upper = as_str_bound(&self.range.upper);
        if let Some(current) = self.position {
            match self.direction {
                Direction::Forward => lower = Bound::Excluded(current.datetime.as_str()),
                Direction::Reverse => upper = Bound::Excluded(current.datetime.as_str()),
            }
        }
        if is_empty_span(&lower, &upper) {
            return None;
        }

        let n = usize::try_from(n).unwrap_or(usize::MAX);
        let mut span = self.records.range::<str, _>((lower, upper));
        let found = match self.direction {
            Direction::Forward => span.nth(n),
            Direction::Reverse => span.nth_back(n),
        };
        found.map(|(_, event)| event)
    }

    fn settle(&mut self, next: Option<&'a NoiseEvent>) {
        self.done = next.is_none();
        self.position = next;
    }
}

impl Cursor for MemoryCursor<'_> {
    fn value(&self) -> Option<&NoiseEvent> {
        self.position
    }

    fn advance(&mut self, count: u64) -> Result<()> {
        if count == 0 {
            return Err(NoiseError::precondition("cursor advance count must be at least 1"));
        }
        if self.done {
            return Ok(());
        }
        let next = self.nth_remaining(count - 1);
        self.settle(next);
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }
        let next = self.nth_remaining(0);
        self.settle(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(count: u32) -> MemoryStore {
        let mut store = MemoryStore::new();
        for minute in 0..count {
            let event = NoiseEvent::new(
                format!("2024-02-10T10:{minute:02}:00"),
                "Kitchen",
                "Upstairs",
                "Footsteps",
                "Medium",
            );
            store.insert(&event).unwrap();
        }
        store
    }

    #[test]
    fn test_duplicate_insert_keeps_original() {
        let mut store = seeded(1);
        let clash = NoiseEvent::new("2024-02-10T10:00:00", "Hall", "Street", "Horn", "Low");
        assert_eq!(
            store.insert(&clash).unwrap_err(),
            NoiseError::DuplicateKey("2024-02-10T10:00:00".into())
        );
        assert_eq!(store.count().unwrap(), 1);
        let cursor = store
            .open_cursor(&KeyRange::unbounded(), Direction::Forward)
            .unwrap();
        assert_eq!(cursor.value().unwrap().source, "Upstairs");
    }

    #[test]
    fn test_reverse_walk_and_advance() {
        let store = seeded(6);
        let mut cursor = store
            .open_cursor(&KeyRange::unbounded(), Direction::Reverse)
            .unwrap();
        assert_eq!(cursor.value().unwrap().datetime, "2024-02-10T10:05:00");

        cursor.advance(3).unwrap();
        assert_eq!(cursor.value().unwrap().datetime, "2024-02-10T10:02:00");

        cursor.step().unwrap();
        cursor.step().unwrap();
        assert_eq!(cursor.value().unwrap().datetime, "2024-02-10T10:00:00");

        cursor.step().unwrap();
        assert!(cursor.is_done());
    }

    #[test]
    fn test_forward_within_bounds() {
        let store = seeded(6);
        let range = KeyRange::bound("2024-02-10T10:01:00", "2024-02-10T10:03:00");
        let mut cursor = store.open_cursor(&range, Direction::Forward).unwrap();

        let mut keys = Vec::new();
        while let Some(event) = cursor.value() {
            keys.push(event.datetime.clone());
            cursor.step().unwrap();
        }
        assert_eq!(
            keys,
            vec![
                "2024-02-10T10:01:00",
                "2024-02-10T10:02:00",
                "2024-02-10T10:03:00"
            ]
        );
    }

    #[test]
    fn test_inverted_range_is_empty_not_a_panic() {
        let store = seeded(3);
        let range = KeyRange::bound("2024-12-31", "2024-01-01");
        let cursor = store.open_cursor(&range, Direction::Reverse).unwrap();
        assert!(cursor.is_done());
    }

    #[test]
    fn test_advance_past_end() {
        let store = seeded(2);
        let mut cursor = store
            .open_cursor(&KeyRange::unbounded(), Direction::Forward)
            .unwrap();
        cursor.advance(5).unwrap();
        assert!(cursor.is_done());
        assert_eq!(cursor.advance(0).unwrap_err().kind(), "precondition");
    }
}
