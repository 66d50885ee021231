//! Raw row sources.
//!
//! This module contains adapters for the tabular resources a row generator
//! can read from: delimited text, spreadsheets, fixed-width text and
//! in-memory generator functions.

pub mod delimited;
pub mod fixed_width;
pub mod generator;
pub mod spreadsheet;

pub use delimited::{DelimitedOptions, DelimitedSource};
pub use fixed_width::FixedWidthSource;
pub use generator::GeneratorSource;
pub use spreadsheet::{DateEpoch, SpreadsheetOptions, SpreadsheetSource};

use crate::cell::{Cell, Row};
use crate::error::Result;

/// A lazy, restartable, line-numbered sequence of raw rows
///
/// Implementations must advance [`line_number`](RowSource::line_number) by
/// exactly one for every row produced, in source order, starting at 0 for
/// the first row. Header positioning depends on this.
pub trait RowSource {
    /// Rewind to the first row and set the line number back to 0
    fn reset(&mut self) -> Result<()>;

    /// Produce the next raw row, or `None` at end of input
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Zero-based line number of the most recently produced row
    fn line_number(&self) -> usize;

    /// Per-cell transform applied while producing rows
    fn decode(&self, cell: Cell) -> Cell {
        cell
    }

    /// Short description of the backing resource, for diagnostics
    fn describe(&self) -> String {
        String::from("rows")
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        (**self).next_row()
    }

    fn line_number(&self) -> usize {
        (**self).line_number()
    }

    fn decode(&self, cell: Cell) -> Cell {
        (**self).decode(cell)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Line counter shared by the adapters
///
/// Reads 0 before the first row and after a reset, then the index of the
/// row most recently produced.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LineCounter {
    produced: usize,
}

impl LineCounter {
    pub(crate) fn reset(&mut self) {
        self.produced = 0;
    }

    pub(crate) fn advance(&mut self) {
        self.produced += 1;
    }

    pub(crate) fn line_number(&self) -> usize {
        self.produced.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_counter() {
        let mut counter = LineCounter::default();
        assert_eq!(counter.line_number(), 0);
        counter.advance();
        assert_eq!(counter.line_number(), 0);
        counter.advance();
        counter.advance();
        assert_eq!(counter.line_number(), 2);
        counter.reset();
        assert_eq!(counter.line_number(), 0);
    }
}
