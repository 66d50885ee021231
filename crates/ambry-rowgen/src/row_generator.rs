//! Header-once, then data rows iteration over a raw row source.

use log::debug;

use crate::cell::{AsciiPolicy, Cell, Row};
use crate::error::{BoxError, Result, RowGenError};
use crate::header::{assemble_comment, assemble_header};
use crate::intuit::{IntuitPolicy, RowSpec, RowSpecIntuiter};
use crate::sources::{GeneratorSource, RowSource};

/// Rows pulled before a line number still at 0 counts as a stalled source
const STALL_CHECK_ROWS: usize = 8;

/// Fallible transform from the assembled header to public column names
pub type HeaderMangler = Box<dyn Fn(&[String]) -> std::result::Result<Vec<String>, BoxError>>;

/// Column names and header commentary computed from the header lines
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    /// Header after the mangler
    pub names: Vec<String>,
    /// Header as assembled from the header lines
    pub unmangled: Vec<String>,
    /// Header comment lines joined per column
    pub comment: Vec<String>,
}

/// Row generator over one raw row source
///
/// Knows which lines hold the header, header comments and data, and turns
/// the source into a header plus a stream of data rows. Ranges come from
/// the builder methods, from a [`RowSpec`], or from [`intuit`](Self::intuit).
///
/// ```rust,ignore
/// use ambry_rowgen::{DelimitedSource, IntuitPolicy, RowGenerator};
///
/// let mut rows = RowGenerator::new(DelimitedSource::new("report.csv")?);
/// rows.intuit(IntuitPolicy::default())?;
///
/// println!("{:?}", rows.get_header()?);
/// for row in rows.rows()? {
///     println!("{:?}", row?);
/// }
/// ```
pub struct RowGenerator {
    source: Box<dyn RowSource>,
    data_start_line: usize,
    data_end_line: Option<usize>,
    header_lines: Vec<usize>,
    header_comment_lines: Vec<usize>,
    header_mangler: Option<HeaderMangler>,
    ascii_policy: AsciiPolicy,
    header: Option<Header>,
    /// Row read while positioning at the data start, replayed first
    put_row: Option<(usize, Row)>,
}

impl RowGenerator {
    /// Wrap a source with the default layout: header on line 0, data from line 1
    pub fn new(source: impl RowSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            data_start_line: 1,
            data_end_line: None,
            header_lines: vec![0],
            header_comment_lines: Vec::new(),
            header_mangler: None,
            ascii_policy: AsciiPolicy::default(),
            header: None,
            put_row: None,
        }
    }

    /// Row generator over a function that returns rows, first row being the header
    pub fn from_generator<F, I>(factory: F) -> Self
    where
        F: FnMut() -> I + 'static,
        I: IntoIterator<Item = Row> + 'static,
        I::IntoIter: 'static,
    {
        Self::new(GeneratorSource::new(factory))
            .with_header_lines(vec![0])
            .with_data_start_line(1)
    }

    /// Set the first line of the data block
    pub fn with_data_start_line(mut self, line: usize) -> Self {
        self.data_start_line = line;
        self.invalidate_header();
        self
    }

    /// Set the line where data stops (exclusive); `None` reads to the end
    pub fn with_data_end_line(mut self, line: Option<usize>) -> Self {
        self.data_end_line = line;
        self.invalidate_header();
        self
    }

    /// Set the lines merged into the header
    pub fn with_header_lines(mut self, lines: Vec<usize>) -> Self {
        self.header_lines = lines;
        self.invalidate_header();
        self
    }

    /// Set the lines joined into the header comment
    pub fn with_header_comment_lines(mut self, lines: Vec<usize>) -> Self {
        self.header_comment_lines = lines;
        self.invalidate_header();
        self
    }

    /// Normalize assembled header names with `mangler`
    pub fn with_header_mangler<M>(mut self, mangler: M) -> Self
    where
        M: Fn(&[String]) -> std::result::Result<Vec<String>, BoxError> + 'static,
    {
        self.header_mangler = Some(Box::new(mangler));
        self.invalidate_header();
        self
    }

    /// Set how non-ASCII text in header and comment lines is handled
    pub fn with_ascii_policy(mut self, policy: AsciiPolicy) -> Self {
        self.ascii_policy = policy;
        self.invalidate_header();
        self
    }

    /// Take line ranges from an intuited or declared spec
    pub fn with_spec(mut self, spec: &RowSpec) -> Self {
        self.apply_spec(spec);
        self
    }

    /// Take ranges from a spec; a missing data start is implied from the
    /// header and comment lines
    pub fn apply_spec(&mut self, spec: &RowSpec) {
        self.data_start_line = spec
            .data_start_line
            .unwrap_or_else(|| spec.implied_data_start());
        self.data_end_line = spec.data_end_line;
        self.header_lines = spec.header_lines.clone();
        self.header_comment_lines = spec.header_comment_lines.clone();
        self.invalidate_header();
    }

    /// Current ranges as a spec
    pub fn spec(&self) -> RowSpec {
        RowSpec {
            data_start_line: Some(self.data_start_line),
            data_end_line: self.data_end_line,
            header_lines: self.header_lines.clone(),
            header_comment_lines: self.header_comment_lines.clone(),
        }
    }

    /// Intuit the ranges from the source and adopt them
    pub fn intuit(&mut self, policy: IntuitPolicy) -> Result<RowSpec> {
        let spec = RowSpecIntuiter::new(policy).intuit(&mut self.source)?;
        self.apply_spec(&spec);
        Ok(spec)
    }

    pub fn data_start_line(&self) -> usize {
        self.data_start_line
    }

    pub fn data_end_line(&self) -> Option<usize> {
        self.data_end_line
    }

    pub fn source(&self) -> &dyn RowSource {
        self.source.as_ref()
    }

    /// Rewind the source and drop the put-back row
    pub fn reset(&mut self) -> Result<()> {
        self.put_row = None;
        self.source.reset()
    }

    /// Forget the cached header so the next access recomputes it
    pub fn invalidate_header(&mut self) {
        self.header = None;
    }

    /// Column names, after the mangler
    pub fn get_header(&mut self) -> Result<&[String]> {
        Ok(&self.header_info()?.names)
    }

    /// Column names as assembled, before the mangler
    pub fn unmangled_header(&mut self) -> Result<&[String]> {
        Ok(&self.header_info()?.unmangled)
    }

    /// Header comment text, per column
    pub fn header_comment(&mut self) -> Result<&[String]> {
        Ok(&self.header_info()?.comment)
    }

    /// The full cached header, computing it on first use
    pub fn header_info(&mut self) -> Result<&Header> {
        let header = match self.header.take() {
            Some(header) => header,
            None => {
                let (headers, comments) = self.position_at_data_start()?;
                self.build_header(&headers, &comments)?
            }
        };

        Ok(self.header.insert(header))
    }

    /// Text of the lines after the data block, or `None` without a data end
    pub fn get_footer(&mut self) -> Result<Option<Vec<String>>> {
        let Some(end) = self.data_end_line else {
            return Ok(None);
        };

        self.reset()?;
        let mut footer = Vec::new();
        while let Some(row) = self.source.next_row()? {
            if self.source.line_number() >= end {
                let text: Vec<String> = row.iter().map(Cell::text).collect();
                footer.push(text.join(" ").trim().to_string());
            }
        }

        Ok(Some(footer))
    }

    /// Data rows, positioned after the header
    ///
    /// The row read while locating the data start is yielded first, once.
    pub fn rows(&mut self) -> Result<DataRows<'_>> {
        let (headers, comments) = self.position_at_data_start()?;
        if self.header.is_none() {
            self.header = Some(self.build_header(&headers, &comments)?);
        }

        Ok(DataRows {
            generator: self,
            done: false,
        })
    }

    /// Data rows paired with column names
    ///
    /// Missing trailing cells are `Empty`; cells beyond the header are dropped.
    pub fn rows_as_maps(
        &mut self,
    ) -> Result<impl Iterator<Item = Result<Vec<(String, Cell)>>> + '_> {
        let names = self.get_header()?.to_vec();

        Ok(self.rows()?.map(move |row| {
            row.map(|row| {
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
        }))
    }

    fn validate(&self) -> Result<()> {
        if let Some(line) = self
            .header_lines
            .iter()
            .find(|&&line| line >= self.data_start_line)
        {
            return Err(RowGenError::InvalidSpec(format!(
                "header line {} is not before data start line {}",
                line, self.data_start_line
            )));
        }

        if let Some(line) = self
            .header_comment_lines
            .iter()
            .find(|&&line| line >= self.data_start_line)
        {
            return Err(RowGenError::InvalidSpec(format!(
                "header comment line {} is not before data start line {}",
                line, self.data_start_line
            )));
        }

        if let Some(end) = self.data_end_line.filter(|&end| end < self.data_start_line) {
            return Err(RowGenError::InvalidSpec(format!(
                "data end line {} is before data start line {}",
                end, self.data_start_line
            )));
        }

        Ok(())
    }

    /// Rewind and read up to the data start, collecting header and comment
    /// lines and stashing the first data row in `put_row`
    fn position_at_data_start(&mut self) -> Result<(Vec<Vec<String>>, Vec<Vec<String>>)> {
        self.validate()?;
        self.reset()?;

        let mut headers = Vec::new();
        let mut comments = Vec::new();
        let mut pulled = 0;

        while let Some(row) = self.source.next_row()? {
            pulled += 1;
            let line = self.source.line_number();

            if pulled >= STALL_CHECK_ROWS && line == 0 {
                return Err(RowGenError::Stalled(pulled));
            }

            if line >= self.data_start_line {
                self.put_row = Some((line, row));
                break;
            }

            if self.header_lines.contains(&line) {
                headers.push(self.ascii_policy.sanitize_row(&row));
            }
            if self.header_comment_lines.contains(&line) {
                comments.push(self.ascii_policy.sanitize_row(&row));
            }
        }

        debug!(
            "Positioned {} at line {} ({} header lines, {} comment lines)",
            self.source.describe(),
            self.data_start_line,
            headers.len(),
            comments.len()
        );

        Ok((headers, comments))
    }

    fn build_header(&self, headers: &[Vec<String>], comments: &[Vec<String>]) -> Result<Header> {
        let unmangled = assemble_header(headers);
        let names = match &self.header_mangler {
            Some(mangler) => mangler(&unmangled).map_err(RowGenError::Mangler)?,
            None => unmangled.clone(),
        };

        Ok(Header {
            names,
            unmangled,
            comment: assemble_comment(comments),
        })
    }

    fn past_end(&self, line: usize) -> bool {
        self.data_end_line.is_some_and(|end| line >= end)
    }
}

/// Iterator over the data rows of a [`RowGenerator`]
pub struct DataRows<'a> {
    generator: &'a mut RowGenerator,
    done: bool,
}

impl Iterator for DataRows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let (line, row) = match self.generator.put_row.take() {
            Some(put) => put,
            None => match self.generator.source.next_row() {
                Ok(Some(row)) => (self.generator.source.line_number(), row),
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            },
        };

        if self.generator.past_end(line) {
            self.done = true;
            return None;
        }

        Some(Ok(row))
    }
}
