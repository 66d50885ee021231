//! Delimited text (CSV, TSV, ...) row source.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Row};
use crate::error::{Result, RowGenError};
use crate::sources::{LineCounter, RowSource};

/// Bytes read from the top of the file when sniffing the dialect
const SNIFF_SAMPLE_BYTES: usize = 4096;

/// Lines of the sample considered when sniffing
const SNIFF_SAMPLE_LINES: usize = 10;

/// Delimiters tried when sniffing
const SNIFF_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Options for delimited parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitedOptions {
    /// Field delimiter (default: comma)
    #[serde(with = "byte_char")]
    pub delimiter: u8,
    /// Quote character (default: double quote)
    #[serde(with = "byte_char")]
    pub quote: u8,
    /// Detect the delimiter from a sample instead of using `delimiter`
    pub sniff: bool,
    /// Encoding label understood by the WHATWG encoding standard
    pub encoding: Option<String>,
    /// Whether to trim whitespace from fields
    pub trim: bool,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            sniff: false,
            encoding: None,
            trim: false,
        }
    }
}

impl DelimitedOptions {
    /// Create options for tab-separated values (TSV)
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Default::default()
        }
    }

    /// Create options for semicolon-separated values (common in European locales)
    pub fn semicolon() -> Self {
        Self {
            delimiter: b';',
            ..Default::default()
        }
    }

    /// Create options that sniff the delimiter
    pub fn sniffed() -> Self {
        Self {
            sniff: true,
            ..Default::default()
        }
    }
}

/// Delimited text file row source
///
/// Rows are read with a header-less, flexible reader so ragged rows and
/// leading comment lines come through untouched. Blank lines, which the
/// reader skips, are produced as empty rows so line numbers stay physical.
/// The file is loaded on the first read or on [`reset`](RowSource::reset)
/// and released once the input is exhausted.
pub struct DelimitedSource {
    /// Path to the delimited file
    path: PathBuf,
    /// Parsing options
    options: DelimitedOptions,
    /// Delimiter in effect (configured or sniffed)
    delimiter: u8,
    /// Cell text encoding
    encoding: &'static Encoding,
    reader: Option<csv::Reader<Cursor<Vec<u8>>>>,
    record: csv::ByteRecord,
    /// Blank lines still owed before `record`
    pending_blanks: usize,
    /// `record` holds a row not yet produced
    pending_record: bool,
    exhausted: bool,
    lines: LineCounter,
}

impl DelimitedSource {
    /// Create a new delimited source from a file path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, DelimitedOptions::default())
    }

    /// Create a new delimited source with custom options
    pub fn with_options(path: impl AsRef<Path>, options: DelimitedOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(RowGenError::FileNotFound(path.display().to_string()));
        }

        let encoding = match &options.encoding {
            Some(label) => Encoding::for_label(label.as_bytes())
                .ok_or_else(|| RowGenError::UnknownEncoding(label.clone()))?,
            None => UTF_8,
        };

        let delimiter = if options.sniff {
            let sample = read_sample(&path, encoding)?;
            let delimiter = sniff_delimiter(&sample)?;
            debug!(
                "Sniffed delimiter {:?} for {}",
                delimiter as char,
                path.display()
            );
            delimiter
        } else {
            options.delimiter
        };

        Ok(Self {
            path,
            options,
            delimiter,
            encoding,
            reader: None,
            record: csv::ByteRecord::new(),
            pending_blanks: 0,
            pending_record: false,
            exhausted: false,
            lines: LineCounter::default(),
        })
    }

    /// The delimiter in effect, after sniffing
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn open(&self) -> Result<csv::Reader<Cursor<Vec<u8>>>> {
        let data = std::fs::read(&self.path)?;

        Ok(csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.options.quote)
            .has_headers(false)
            .flexible(true)
            .trim(if self.options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_reader(Cursor::new(data)))
    }

    fn decode_bytes(&self, bytes: &[u8]) -> Cell {
        let (text, _) = self.encoding.decode_with_bom_removal(bytes);
        Cell::from(text.as_ref())
    }
}

impl RowSource for DelimitedSource {
    fn reset(&mut self) -> Result<()> {
        self.reader = Some(self.open()?);
        self.pending_blanks = 0;
        self.pending_record = false;
        self.exhausted = false;
        self.lines.reset();
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if self.pending_blanks > 0 {
                self.pending_blanks -= 1;
                self.lines.advance();
                return Ok(Some(Row::new()));
            }

            if self.pending_record {
                self.pending_record = false;
                self.lines.advance();
                let row = self
                    .record
                    .iter()
                    .map(|field| self.decode(self.decode_bytes(field)))
                    .collect();
                return Ok(Some(row));
            }

            if self.exhausted {
                return Ok(None);
            }

            if self.reader.is_none() {
                self.reset()?;
            }

            let Some(reader) = self.reader.as_mut() else {
                return Ok(None);
            };

            let start = reader.position().byte() as usize;
            let found = reader.read_byte_record(&mut self.record)?;
            self.pending_blanks = blank_lines(reader.get_ref().get_ref(), start);

            if found {
                self.pending_record = true;
            } else {
                // Drop the reader to release the buffered file
                self.reader = None;
                self.exhausted = true;
            }
        }
    }

    fn line_number(&self) -> usize {
        self.lines.line_number()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Count the blank lines in the run of line terminators at `start`
///
/// `start` is where the reader stopped after the previous record, just past
/// that record's terminator byte. The `\n` finishing a `\r\n` pair is
/// left unread by the reader and is not a blank line.
fn blank_lines(data: &[u8], start: usize) -> usize {
    let mut pos = start;
    if pos > 0 && data.get(pos - 1) == Some(&b'\r') && data.get(pos) == Some(&b'\n') {
        pos += 1;
    }

    let mut blanks = 0;
    while let Some(&byte) = data.get(pos) {
        match byte {
            b'\n' => pos += 1,
            b'\r' if data.get(pos + 1) == Some(&b'\n') => pos += 2,
            b'\r' => pos += 1,
            _ => break,
        }
        blanks += 1;
    }
    blanks
}

fn read_sample(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(SNIFF_SAMPLE_BYTES);
    file.take(SNIFF_SAMPLE_BYTES as u64)
        .read_to_end(&mut buffer)?;

    let (text, _) = encoding.decode_with_bom_removal(&buffer);
    Ok(text.into_owned())
}

/// Detect the delimiter of a text sample (comma, semicolon, tab, pipe)
///
/// Candidates are scored by how often they occur per line and how
/// consistent that count is across the sample. A sample in which no
/// candidate occurs is an error.
pub fn sniff_delimiter(sample: &str) -> Result<u8> {
    let sample_lines: Vec<&str> = sample
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_SAMPLE_LINES)
        .collect();

    if sample_lines.is_empty() {
        return Err(RowGenError::Dialect("sample is empty".to_string()));
    }

    let mut best: Option<(u8, f32)> = None;

    for &delimiter in &SNIFF_CANDIDATES {
        let field_counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| line.bytes().filter(|&b| b == delimiter).count())
            .collect();

        let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
        if avg == 0.0 {
            continue;
        }

        let variance = field_counts
            .iter()
            .map(|&x| (x as f32 - avg).powi(2))
            .sum::<f32>()
            / field_counts.len() as f32;

        let score = avg / (1.0 + variance.sqrt());

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((delimiter, score));
        }
    }

    best.map(|(delimiter, _)| delimiter).ok_or_else(|| {
        RowGenError::Dialect("no candidate delimiter occurs in the sample".to_string())
    })
}

/// Single-byte characters written as one-character strings (`"\t"` or
/// `"tab"` for a tab)
mod byte_char {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(byte: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(*byte as char)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "tab" || s == "\\t" {
            return Ok(b'\t');
        }

        let mut bytes = s.bytes();
        match (bytes.next(), bytes.next()) {
            (Some(b), None) => Ok(b),
            _ => Err(D::Error::custom(format!(
                "expected a single-byte character, got {:?}",
                s
            ))),
        }
    }
}
