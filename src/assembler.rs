//! Merging of per-cell response data into whole rows.
//!
//! Rows arrive as [`CellFrame`]s in key order. A large row may be split over
//! several frames, and those frames may straddle fetch boundaries, so the
//! assembler keeps the unfinished row between calls. A row is handed out only
//! once its last frame has arrived.

use crate::{
    dispatch::CellFrame,
    error::ClientError,
    result::RowResult,
    row::{Cell, RowKey},
};

#[derive(Debug, Default)]
pub struct ResultAssembler {
    partial: Option<(RowKey, Vec<Cell>)>,
    last_emitted: Option<RowKey>,
}

impl ResultAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame, returning the row it completes, if any.
    pub fn push(&mut self, frame: CellFrame) -> Result<Option<RowResult>, ClientError> {
        let CellFrame {
            row,
            cells,
            complete,
        } = frame;
        check_cells(&row, &cells)?;

        let mut buffered = match self.partial.take() {
            Some((partial_row, buffered)) if partial_row == row => buffered,
            Some((partial_row, _)) => {
                return Err(ClientError::Protocol(format!(
                    "frame for row {row} arrived before row {partial_row} was complete"
                )));
            }
            None => {
                if let Some(last) = &self.last_emitted {
                    if &row <= last {
                        return Err(ClientError::Protocol(format!(
                            "row {row} is not after previously returned row {last}"
                        )));
                    }
                }
                Vec::new()
            }
        };
        buffered.extend(cells);

        if !complete {
            self.partial = Some((row, buffered));
            return Ok(None);
        }
        self.last_emitted = Some(row.clone());
        Ok(Some(RowResult::new(row, buffered)))
    }

    /// Whether a row is waiting for more frames.
    pub fn has_partial(&self) -> bool {
        self.partial.is_some()
    }

    /// Key of the last row handed out.
    pub fn last_emitted(&self) -> Option<&RowKey> {
        self.last_emitted.as_ref()
    }

    /// Drop any unfinished row. Used when the stream feeding this assembler
    /// is abandoned and will be reopened after the last emitted row.
    pub fn discard_partial(&mut self) {
        self.partial = None;
    }

    /// Assert the stream ended on a row boundary.
    pub fn finish(&mut self) -> Result<(), ClientError> {
        match self.partial.take() {
            Some((row, cells)) => Err(ClientError::Protocol(format!(
                "response ended inside row {row} after {} cells",
                cells.len()
            ))),
            None => Ok(()),
        }
    }
}

/// Build the result of a point lookup. An empty cell list means the row does
/// not exist.
pub fn assemble_row(row: &RowKey, cells: Vec<Cell>) -> Result<Option<RowResult>, ClientError> {
    if cells.is_empty() {
        return Ok(None);
    }
    check_cells(row, &cells)?;
    Ok(Some(RowResult::new(row.clone(), cells)))
}

fn check_cells(row: &RowKey, cells: &[Cell]) -> Result<(), ClientError> {
    match cells.iter().find(|cell| &cell.row != row) {
        Some(stray) => Err(ClientError::Protocol(format!(
            "cell for row {} found in response for row {row}",
            stray.row
        ))),
        None => Ok(()),
    }
}
