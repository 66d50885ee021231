//! Row source backed by an in-memory generator function.

use crate::cell::Row;
use crate::error::Result;
use crate::sources::{LineCounter, RowSource};

/// Row source over a caller-supplied function that returns rows
///
/// The function is called again on every reset, so it must be able to
/// produce the same rows more than once. By convention the first row it
/// produces is the header; see
/// [`RowGenerator::from_generator`](crate::RowGenerator::from_generator).
pub struct GeneratorSource<F, I>
where
    F: FnMut() -> I,
    I: IntoIterator<Item = Row>,
{
    factory: F,
    rows: Option<I::IntoIter>,
    lines: LineCounter,
}

impl<F, I> GeneratorSource<F, I>
where
    F: FnMut() -> I,
    I: IntoIterator<Item = Row>,
{
    /// Wrap a row-producing function
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            rows: None,
            lines: LineCounter::default(),
        }
    }
}

impl<F, I> RowSource for GeneratorSource<F, I>
where
    F: FnMut() -> I,
    I: IntoIterator<Item = Row>,
{
    fn reset(&mut self) -> Result<()> {
        self.rows = Some((self.factory)().into_iter());
        self.lines.reset();
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.rows.is_none() {
            self.reset()?;
        }

        let row = self.rows.as_mut().and_then(Iterator::next);
        match row {
            Some(row) => {
                self.lines.advance();
                Ok(Some(row.into_iter().map(|c| self.decode(c)).collect()))
            }
            None => Ok(None),
        }
    }

    fn line_number(&self) -> usize {
        self.lines.line_number()
    }

    fn describe(&self) -> String {
        String::from("generator")
    }
}
