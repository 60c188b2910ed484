//! Typed row results.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::row::{Cell, RowKey};

/// All cells returned for one row.
///
/// Cells are ordered by family, then qualifier, then newest timestamp first,
/// so the first cell for a column is its latest version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowResult {
    row: RowKey,
    cells: Vec<Cell>,
}

impl RowResult {
    pub fn new(row: RowKey, mut cells: Vec<Cell>) -> Self {
        cells.sort_by(|a, b| {
            a.family
                .cmp(&b.family)
                .then_with(|| a.qualifier.cmp(&b.qualifier))
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        Self { row, cells }
    }

    pub fn row(&self) -> &RowKey {
        &self.row
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// A present row that carries no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Latest cell stored under `family:qualifier`.
    pub fn latest_cell(&self, family: &[u8], qualifier: &[u8]) -> Option<&Cell> {
        let idx = self.cells.partition_point(|cell| {
            (cell.family.as_ref(), cell.qualifier.as_ref()) < (family, qualifier)
        });
        self.cells
            .get(idx)
            .filter(|cell| cell.family == family && cell.qualifier == qualifier)
    }

    /// Latest value stored under `family:qualifier`.
    pub fn value(&self, family: &[u8], qualifier: &[u8]) -> Option<&Bytes> {
        self.latest_cell(family, qualifier).map(|cell| &cell.value)
    }

    /// Latest value of every qualifier in `family`.
    pub fn family_map(&self, family: &[u8]) -> BTreeMap<Bytes, Bytes> {
        let mut map = BTreeMap::new();
        for cell in self.cells.iter().filter(|cell| cell.family == family) {
            map.entry(cell.qualifier.clone())
                .or_insert_with(|| cell.value.clone());
        }
        map
    }

    /// Distinct families present in this row.
    pub fn families(&self) -> Vec<Bytes> {
        let mut families: Vec<Bytes> = Vec::new();
        for cell in &self.cells {
            if families.last() != Some(&cell.family) {
                families.push(cell.family.clone());
            }
        }
        families
    }
}
