use serde::Serialize;

/// One page of a reverse-chronological listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagedResult<T> {
    /// Number of records in the whole store, not just this page
    pub total: u64,
    /// 1-based page number that was requested
    pub page: u64,
    pub values: Vec<T>,
}

impl<T> PagedResult<T> {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
