//! Single-row mutations.

use bytes::Bytes;

use crate::{
    error::ClientError,
    row::{Cell, RowKey, LATEST_TIMESTAMP},
};

/// A write of one or more cells to a single row.
///
/// Cells keep insertion order. Repeated `family:qualifier` pairs are allowed;
/// which one wins at equal timestamps is up to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Put {
    row: RowKey,
    cells: Vec<Cell>,
}

impl Put {
    pub fn new(row: impl Into<RowKey>) -> Self {
        Self {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Add a cell whose timestamp is assigned by the store.
    pub fn add_column(
        self,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        self.add_column_at(family, qualifier, LATEST_TIMESTAMP, value)
    }

    /// Add a cell with an explicit timestamp.
    pub fn add_column_at(
        mut self,
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        timestamp: u64,
        value: impl Into<Bytes>,
    ) -> Self {
        self.cells.push(Cell {
            row: self.row.clone(),
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            value: value.into(),
        });
        self
    }

    pub fn row(&self) -> &RowKey {
        &self.row
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reject mutations that would write nothing.
    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.row.is_empty() {
            return Err(ClientError::InvalidArgument(
                "put requires a non-empty row key".into(),
            ));
        }
        if self.cells.is_empty() {
            return Err(ClientError::InvalidArgument(format!(
                "put for row {} has no cells",
                self.row
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Put;
    use crate::{error::ClientError, row::LATEST_TIMESTAMP};

    #[test]
    fn cells_inherit_row_and_order() {
        let put = Put::new("row_1")
            .add_column("f", "q", "v1")
            .add_column_at("f", "q", 7, "v0");
        assert_eq!(put.len(), 2);
        assert!(put.cells().iter().all(|c| c.row == *put.row()));
        assert_eq!(put.cells()[0].timestamp, LATEST_TIMESTAMP);
        assert_eq!(put.cells()[1].timestamp, 7);
        assert!(put.validate().is_ok());
    }

    #[test]
    fn empty_put_is_rejected() {
        let err = Put::new("row_1").validate().unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));

        let err = Put::new("").add_column("f", "q", "v").validate().unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }
}
