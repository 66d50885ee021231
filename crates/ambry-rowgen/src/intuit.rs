//! Row spec intuition.
//!
//! When a file does not say where its header and data are, the intuiter
//! works it out from row shape alone. A sampling pass builds a histogram of
//! non-empty cell counts and derives a fullness threshold; a second pass
//! walks the rows through a three-state machine:
//!
//! ```text
//! ScanningHeader --first full row after a header--> InData --sparse row--> Done
//! ```
//!
//! Sparse rows before the first full row are header comments, the first
//! full row is the header, and the next full row starts the data. No state
//! is ever re-entered.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::cell::{non_nulls, AsciiPolicy, Row};
use crate::error::{Result, RowGenError};
use crate::sources::RowSource;

/// Rows buffered by the sampling pass unless the policy says otherwise
pub const DEFAULT_SAMPLE_LIMIT: usize = 100;

/// Header and data boundaries of a tabular source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RowSpec {
    /// First data line
    pub data_start_line: Option<usize>,
    /// First line after the data block
    pub data_end_line: Option<usize>,
    /// Lines that together form the header
    pub header_lines: Vec<usize>,
    /// Free-text lines above the header
    pub header_comment_lines: Vec<usize>,
}

impl RowSpec {
    /// Data start to use when none was found: one past the last header or
    /// comment line, or 0
    pub fn implied_data_start(&self) -> usize {
        self.header_lines
            .iter()
            .chain(self.header_comment_lines.iter())
            .max()
            .map_or(0, |last| last + 1)
    }
}

/// How the fullness threshold is derived from the sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdRule {
    /// Midpoint between the sparsest and the fullest sampled rows
    #[default]
    Midpoint,
    /// Rows with more non-empty cells than this are full
    Fixed(usize),
}

/// When a sparse row ends the data block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEndRule {
    /// The first sparse row after data starts ends it, even if full rows follow
    #[default]
    FirstSparseRow,
    /// Up to this many consecutive sparse rows stay inside the data block
    AfterGap(usize),
    /// Data runs to the end of the source
    Never,
}

/// Tunables for [`RowSpecIntuiter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntuitPolicy {
    /// Rows read by the sampling pass
    pub sample_limit: usize,
    pub threshold: ThresholdRule,
    pub data_end: DataEndRule,
    /// Applied to cell text before counting non-empty cells
    pub ascii_policy: AsciiPolicy,
}

impl Default for IntuitPolicy {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            threshold: ThresholdRule::default(),
            data_end: DataEndRule::default(),
            ascii_policy: AsciiPolicy::default(),
        }
    }
}

/// Classification state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntuitState {
    /// Looking for header comments, the header, and the first data row
    #[default]
    ScanningHeader,
    /// Inside the data block; `gap` is the start and length of the current
    /// run of sparse rows tolerated by [`DataEndRule::AfterGap`]
    InData { gap: Option<(usize, usize)> },
    /// Boundaries fixed; no further rows are classified
    Done,
}

/// Heuristic classifier of comment, header and data rows
#[derive(Debug, Default)]
pub struct RowSpecIntuiter {
    policy: IntuitPolicy,
    data_start_line: Option<usize>,
    data_end_line: Option<usize>,
    header: Vec<usize>,
    header_comments: Vec<usize>,
    lines: Vec<Row>,
    lengths: BTreeMap<usize, usize>,
    mid_length: usize,
    state: IntuitState,
}

impl RowSpecIntuiter {
    pub fn new(policy: IntuitPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Sample and classify `source`, returning the discovered spec
    ///
    /// The source is reset before each pass, so running again on the same
    /// source gives the same answer.
    pub fn intuit<S: RowSource + ?Sized>(&mut self, source: &mut S) -> Result<RowSpec> {
        self.clear();
        self.sample(source)?;

        let (Some(&min), Some(&max)) = (self.lengths.keys().next(), self.lengths.keys().next_back())
        else {
            return Err(RowGenError::EmptySample);
        };

        self.mid_length = match self.policy.threshold {
            ThresholdRule::Midpoint => (min + max) / 2,
            ThresholdRule::Fixed(n) => n,
        };

        debug!(
            "Sampled {} rows of {}: lengths {:?}, threshold {}",
            self.lines.len(),
            source.describe(),
            self.lengths,
            self.mid_length
        );

        source.reset()?;
        while let Some(row) = source.next_row()? {
            if self.state == IntuitState::Done {
                break;
            }
            let count = non_nulls(&row, self.policy.ascii_policy);
            self.step(source.line_number(), count);
        }
        self.finish();

        let spec = self.spec();
        debug!("Intuited {:?}", spec);
        Ok(spec)
    }

    fn clear(&mut self) {
        *self = Self::new(self.policy);
    }

    fn sample<S: RowSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        source.reset()?;

        while self.lines.len() < self.policy.sample_limit {
            let Some(row) = source.next_row()? else {
                break;
            };
            let count = non_nulls(&row, self.policy.ascii_policy);
            *self.lengths.entry(count).or_default() += 1;
            self.lines.push(row);
        }

        Ok(())
    }

    /// Advance the state machine by one row
    fn step(&mut self, line: usize, count: usize) {
        let full = count > self.mid_length;

        self.state = match self.state {
            IntuitState::ScanningHeader => {
                if full && !self.header.is_empty() {
                    self.data_start_line = Some(line);
                    IntuitState::InData { gap: None }
                } else if full {
                    self.header.push(line);
                    IntuitState::ScanningHeader
                } else {
                    if self.header.is_empty() {
                        self.header_comments.push(line);
                    }
                    IntuitState::ScanningHeader
                }
            }
            IntuitState::InData { .. } if full => IntuitState::InData { gap: None },
            IntuitState::InData { gap } => match self.policy.data_end {
                DataEndRule::FirstSparseRow => {
                    self.data_end_line = Some(line);
                    IntuitState::Done
                }
                DataEndRule::AfterGap(tolerance) => {
                    let (start, len) = gap.map_or((line, 1), |(start, len)| (start, len + 1));
                    if len > tolerance {
                        self.data_end_line = Some(start);
                        IntuitState::Done
                    } else {
                        IntuitState::InData {
                            gap: Some((start, len)),
                        }
                    }
                }
                DataEndRule::Never => IntuitState::InData { gap: None },
            },
            IntuitState::Done => IntuitState::Done,
        };
    }

    /// Sparse rows still open at the end of input are not data
    fn finish(&mut self) {
        if let IntuitState::InData {
            gap: Some((start, _)),
        } = self.state
        {
            self.data_end_line = Some(start);
            self.state = IntuitState::Done;
        }
    }

    /// The row spec found so far
    pub fn spec(&self) -> RowSpec {
        RowSpec {
            data_start_line: self.data_start_line,
            data_end_line: self.data_end_line,
            header_lines: self.header.clone(),
            header_comment_lines: self.header_comments.clone(),
        }
    }

    /// Fullness threshold: rows with more non-empty cells are full
    pub fn mid_length(&self) -> usize {
        self.mid_length
    }

    /// Histogram of non-empty cell counts over the sample
    pub fn lengths(&self) -> &BTreeMap<usize, usize> {
        &self.lengths
    }

    /// Rows buffered by the sampling pass
    pub fn sample_rows(&self) -> &[Row] {
        &self.lines
    }

    pub fn state(&self) -> IntuitState {
        self.state
    }
}
