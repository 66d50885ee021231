//! Fixed-width text row source.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::cell::{Cell, Row};
use crate::error::{Result, RowGenError};
use crate::sources::{LineCounter, RowSource};

/// Fixed-width text file row source
///
/// Each line is cut into columns of the configured widths, counted in
/// characters. Cells are trimmed; a line shorter than the layout yields
/// empty cells for the missing columns and text past the last column is
/// ignored.
pub struct FixedWidthSource {
    path: PathBuf,
    widths: Vec<usize>,
    reader: Option<BufReader<File>>,
    buffer: Vec<u8>,
    exhausted: bool,
    lines: LineCounter,
}

impl FixedWidthSource {
    /// Create a fixed-width source with the given column widths
    pub fn new(path: impl AsRef<Path>, widths: Vec<usize>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(RowGenError::FileNotFound(path.display().to_string()));
        }
        if widths.is_empty() || widths.contains(&0) {
            return Err(RowGenError::InvalidSpec(
                "fixed-width columns need non-zero widths".to_string(),
            ));
        }

        Ok(Self {
            path,
            widths,
            reader: None,
            buffer: Vec::new(),
            exhausted: false,
            lines: LineCounter::default(),
        })
    }

    fn split_line(&self, line: &str) -> Row {
        let chars: Vec<char> = line.chars().collect();
        let mut start = 0;

        self.widths
            .iter()
            .map(|&width| {
                let end = (start + width).min(chars.len());
                let text: String = if start < end {
                    chars[start..end].iter().collect()
                } else {
                    String::new()
                };
                start += width;
                self.decode(Cell::from(text.trim()))
            })
            .collect()
    }
}

impl RowSource for FixedWidthSource {
    fn reset(&mut self) -> Result<()> {
        self.reader = Some(BufReader::new(File::open(&self.path)?));
        self.exhausted = false;
        self.lines.reset();
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.exhausted {
            return Ok(None);
        }

        if self.reader.is_none() {
            self.reset()?;
        }

        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        self.buffer.clear();
        if reader.read_until(b'\n', &mut self.buffer)? == 0 {
            self.reader = None;
            self.exhausted = true;
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&self.buffer);
        let line = text.trim_end_matches(['\n', '\r']).to_string();

        self.lines.advance();
        Ok(Some(self.split_line(&line)))
    }

    fn line_number(&self) -> usize {
        self.lines.line_number()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
