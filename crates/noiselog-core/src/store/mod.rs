//! Ordered persistence of noise events keyed by `datetime`.
//!
//! The query engine only sees [`RecordStore`] and [`Cursor`], so any backend
//! able to iterate its keys in order in both directions can sit underneath.

pub mod db;
pub mod memory;

use std::ops::Bound;

use crate::config::{Backend, NoiseConfig};
use crate::error::Result;
use crate::models::NoiseEvent;

pub use db::{SqliteStore, SCHEMA_VERSION};
pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Oldest first
    Forward,
    /// Most recent first
    Reverse,
}

/// An optionally bounded interval over the `datetime` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub lower: Bound<String>,
    pub upper: Bound<String>,
}

impl KeyRange {
    pub fn unbounded() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    pub fn lower_bound(key: impl Into<String>) -> Self {
        Self {
            lower: Bound::Included(key.into()),
            upper: Bound::Unbounded,
        }
    }

    pub fn upper_bound(key: impl Into<String>) -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Included(key.into()),
        }
    }

    /// Both ends inclusive.
    pub fn bound(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            lower: Bound::Included(lower.into()),
            upper: Bound::Included(upper.into()),
        }
    }

    pub fn with_lower(mut self, lower: Bound<String>) -> Self {
        self.lower = lower;
        self
    }

    pub fn with_upper(mut self, upper: Bound<String>) -> Self {
        self.upper = upper;
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        let above_lower = match &self.lower {
            Bound::Included(lower) => key >= lower.as_str(),
            Bound::Excluded(lower) => key > lower.as_str(),
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(upper) => key <= upper.as_str(),
            Bound::Excluded(upper) => key < upper.as_str(),
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Ordered iteration handle over a key range.
///
/// A freshly opened cursor is positioned on the first record in its direction,
/// or already done when the range is empty. Moving a done cursor is a no-op.
pub trait Cursor {
    /// The current record, `None` once the cursor is done.
    fn value(&self) -> Option<&NoiseEvent>;

    /// Skip `count` records. The skipped records' payloads are not loaded.
    fn advance(&mut self, count: u64) -> Result<()>;

    /// Move one record forward (`continue`).
    fn step(&mut self) -> Result<()>;

    fn is_done(&self) -> bool {
        self.value().is_none()
    }
}

pub trait RecordStore {
    /// Fails with `DuplicateKey` when `event.datetime` is already stored.
    fn insert(&mut self, event: &NoiseEvent) -> Result<()>;

    fn count(&self) -> Result<u64>;

    fn open_cursor<'a>(
        &'a self,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Box<dyn Cursor + 'a>>;
}

pub type BoxedStore = Box<dyn RecordStore + Send>;

/// Open the backend selected by `config`.
pub fn open_store(config: &NoiseConfig) -> Result<BoxedStore> {
    match config.backend {
        Backend::Sqlite => Ok(Box::new(SqliteStore::open(config.database_path())?)),
        Backend::Memory => Ok(Box::new(MemoryStore::new())),
    }
}
