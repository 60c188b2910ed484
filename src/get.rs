//! Single-row lookups and column selection.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;

use crate::row::RowKey;

/// Column selection shared by [`Get`] and [`crate::Scan`].
///
/// An empty filter selects every column. A family mapped to `None` selects
/// the whole family; otherwise only the listed qualifiers are selected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnFilter {
    families: BTreeMap<Bytes, Option<BTreeSet<Bytes>>>,
}

impl ColumnFilter {
    /// Select every column of `family`, widening any earlier qualifier list.
    pub fn add_family(&mut self, family: Bytes) {
        self.families.insert(family, None);
    }

    /// Select `family:qualifier`. Has no effect if the whole family is
    /// already selected.
    pub fn add_column(&mut self, family: Bytes, qualifier: Bytes) {
        if let Some(qualifiers) = self
            .families
            .entry(family)
            .or_insert_with(|| Some(BTreeSet::new()))
        {
            qualifiers.insert(qualifier);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Whether a cell in `family:qualifier` passes the filter.
    pub fn matches(&self, family: &[u8], qualifier: &[u8]) -> bool {
        if self.families.is_empty() {
            return true;
        }
        match self.families.get(family) {
            None => false,
            Some(None) => true,
            Some(Some(qualifiers)) => qualifiers.contains(qualifier),
        }
    }

    /// Selected families, in byte order.
    pub fn families(&self) -> impl Iterator<Item = &Bytes> {
        self.families.keys()
    }
}

/// Lookup of a single row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Get {
    row: RowKey,
    columns: ColumnFilter,
}

impl Get {
    pub fn new(row: impl Into<RowKey>) -> Self {
        Self {
            row: row.into(),
            columns: ColumnFilter::default(),
        }
    }

    /// Return every column of `family`.
    pub fn add_family(mut self, family: impl Into<Bytes>) -> Self {
        self.columns.add_family(family.into());
        self
    }

    /// Return `family:qualifier`.
    pub fn add_column(mut self, family: impl Into<Bytes>, qualifier: impl Into<Bytes>) -> Self {
        self.columns.add_column(family.into(), qualifier.into());
        self
    }

    pub fn row(&self) -> &RowKey {
        &self.row
    }

    pub fn columns(&self) -> &ColumnFilter {
        &self.columns
    }
}
