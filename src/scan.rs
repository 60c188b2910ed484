//! Scan descriptions and the key ranges they resolve to.
//!
//! A [`Scan`] is what callers build; [`KeyRange`] is what the scanner tracks
//! while iterating. The scanner's cursor is just a `KeyRange` whose start bound
//! moves forward: after returning row `R` the start becomes `Excluded(R)`, and
//! after crossing a region boundary it becomes `Included(region_end)`.

use std::ops::Bound;

use bytes::Bytes;

use crate::{get::ColumnFilter, row::RowKey};

/// A key range with owned bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRange<K> {
    /// Start bound (inclusive/exclusive/unbounded).
    pub start: Bound<K>,
    /// End bound (inclusive/exclusive/unbounded).
    pub end: Bound<K>,
}

impl<K> KeyRange<K> {
    /// Create an unbounded range (all keys).
    pub fn all() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// Create a new range from explicit bounds.
    pub fn new(start: Bound<K>, end: Bound<K>) -> Self {
        Self { start, end }
    }
}

impl<K: Ord + Clone> KeyRange<K> {
    /// Whether this range contains `key`.
    pub fn contains(&self, key: &K) -> bool {
        let start_ok = match &self.start {
            Bound::Unbounded => true,
            Bound::Included(bound) => key >= bound,
            Bound::Excluded(bound) => key > bound,
        };
        if !start_ok {
            return false;
        }
        match &self.end {
            Bound::Unbounded => true,
            Bound::Included(bound) => key <= bound,
            Bound::Excluded(bound) => key < bound,
        }
    }

    /// Whether no key can satisfy both bounds.
    pub fn is_empty(&self) -> bool {
        is_empty_range(&self.start, &self.end)
    }

    /// The remainder of this range strictly after `key`.
    pub fn after(&self, key: &K) -> Self {
        Self {
            start: Bound::Excluded(key.clone()),
            end: self.end.clone(),
        }
    }

    /// The remainder of this range starting at `key` (inclusive).
    pub fn from_key(&self, key: &K) -> Self {
        Self {
            start: Bound::Included(key.clone()),
            end: self.end.clone(),
        }
    }

    /// Whether the start bound lies strictly below `key`.
    pub fn starts_before(&self, key: &K) -> bool {
        match &self.start {
            Bound::Unbounded => true,
            Bound::Included(start) | Bound::Excluded(start) => start < key,
        }
    }

    /// Whether any key of this range is `>= key`.
    pub fn extends_to(&self, key: &K) -> bool {
        !is_empty_range(&Bound::Included(key.clone()), &self.end)
    }
}

fn is_empty_range<K: Ord>(start: &Bound<K>, end: &Bound<K>) -> bool {
    use Bound as B;
    match (start, end) {
        (B::Unbounded, _) | (_, B::Unbounded) => false,
        (B::Included(a), B::Included(b)) => a > b,
        (B::Included(a), B::Excluded(b)) => a >= b,
        (B::Excluded(a), B::Included(b)) => a >= b,
        (B::Excluded(a), B::Excluded(b)) => a >= b,
    }
}

/// Default number of rows requested per scan fetch.
pub const DEFAULT_SCANNER_CACHING: usize = 100;

/// Description of a range scan over one table.
///
/// The start row is inclusive and the stop row exclusive. An empty start or
/// stop row leaves that side unbounded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scan {
    start_row: RowKey,
    stop_row: RowKey,
    columns: ColumnFilter,
    caching: Option<usize>,
}

impl Scan {
    /// Scan over the whole table.
    pub fn new() -> Self {
        Self::default()
    }

    /// First row to return (inclusive).
    pub fn with_start_row(self, start_row: impl Into<RowKey>) -> Self {
        Scan {
            start_row: start_row.into(),
            ..self
        }
    }

    /// Row at which to stop (exclusive).
    pub fn with_stop_row(self, stop_row: impl Into<RowKey>) -> Self {
        Scan {
            stop_row: stop_row.into(),
            ..self
        }
    }

    /// Rows to request per fetch round trip.
    pub fn with_caching(self, rows: usize) -> Self {
        Scan {
            caching: Some(rows),
            ..self
        }
    }

    /// Return every column of `family`.
    pub fn add_family(mut self, family: impl Into<Bytes>) -> Self {
        self.columns.add_family(family.into());
        self
    }

    /// Return only `family:qualifier` (in addition to earlier selections).
    pub fn add_column(mut self, family: impl Into<Bytes>, qualifier: impl Into<Bytes>) -> Self {
        self.columns.add_column(family.into(), qualifier.into());
        self
    }

    pub fn start_row(&self) -> &RowKey {
        &self.start_row
    }

    pub fn stop_row(&self) -> &RowKey {
        &self.stop_row
    }

    pub fn columns(&self) -> &ColumnFilter {
        &self.columns
    }

    pub fn caching(&self) -> Option<usize> {
        self.caching
    }

    /// The key range this scan covers.
    pub fn key_range(&self) -> KeyRange<RowKey> {
        let start = if self.start_row.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(self.start_row.clone())
        };
        let end = if self.stop_row.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(self.stop_row.clone())
        };
        KeyRange::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Bound;

    use super::{KeyRange, Scan};
    use crate::row::RowKey;

    fn key(s: &str) -> RowKey {
        RowKey::from(s)
    }

    #[test]
    fn scan_bounds_are_half_open() {
        let range = Scan::new()
            .with_start_row("row_3")
            .with_stop_row("row_7")
            .key_range();
        assert!(range.contains(&key("row_3")));
        assert!(range.contains(&key("row_6")));
        assert!(!range.contains(&key("row_7")));
        assert!(!range.contains(&key("row_2")));
    }

    #[test]
    fn empty_rows_are_unbounded() {
        let range = Scan::new().key_range();
        assert_eq!(range, KeyRange::all());
        assert!(!range.is_empty());
    }

    #[test]
    fn inverted_and_degenerate_ranges_are_empty() {
        assert!(Scan::new()
            .with_start_row("b")
            .with_stop_row("a")
            .key_range()
            .is_empty());
        assert!(Scan::new()
            .with_start_row("a")
            .with_stop_row("a")
            .key_range()
            .is_empty());
        assert!(!Scan::new()
            .with_start_row("b")
            .key_range()
            .is_empty());
    }

    #[test]
    fn region_hops_only_move_forward() {
        let range = KeyRange::all().after(&key("row_4"));
        assert!(range.starts_before(&key("row_5")));
        assert!(!range.starts_before(&key("row_4")));
        assert!(!range.starts_before(&key("row_3")));
        assert!(KeyRange::<RowKey>::all().starts_before(&key("a")));
        assert!(!range.from_key(&key("row_4")).starts_before(&key("row_4")));
    }

    #[test]
    fn cursor_advancement_excludes_returned_row() {
        let range = Scan::new().with_stop_row("row_9").key_range();
        let next = range.after(&key("row_4"));
        assert_eq!(next.start, Bound::Excluded(key("row_4")));
        assert!(!next.contains(&key("row_4")));
        assert!(next.contains(&key("row_40")));

        let tail = range.after(&key("row_8"));
        assert!(!tail.is_empty());
        assert!(range.after(&key("row_9")).is_empty());
    }

    #[test]
    fn extends_to_region_boundary() {
        let range = Scan::new().with_stop_row("m").key_range();
        assert!(range.extends_to(&key("g")));
        assert!(!range.extends_to(&key("m")));
        assert!(!range.extends_to(&key("z")));
        assert!(KeyRange::<RowKey>::all().extends_to(&key("z")));
    }
}
