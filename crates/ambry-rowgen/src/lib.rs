//! # ambry-rowgen
//!
//! Row generation for messy tabular sources - read CSV, Excel and
//! fixed-width files whose data is buried under titles, notes and
//! multi-line headers, and turn them into a header plus clean data rows.
//!
//! ## Features
//!
//! - **Row Sources**: Delimited text (`csv` + `encoding_rs`), workbooks
//!   (`calamine`), fixed-width text and in-memory generators
//! - **Header Intuition**: Classify comment, header and data lines from the
//!   shape of the first rows
//! - **Header Assembly**: Merge spanning multi-line headers into one
//! - **Date Casting**: Spreadsheet serial dates and free-text dates
//!
//! ## Example
//!
//! ```rust,ignore
//! use ambry_rowgen::{IntuitPolicy, RowGenEngine, RowGenSettings};
//!
//! let mut generator = RowGenEngine::open("report.xlsx", &RowGenSettings::default())?;
//! let spec = generator.intuit(IntuitPolicy::default())?;
//!
//! println!("header: {:?}", generator.get_header()?);
//! for row in generator.rows()? {
//!     println!("{:?}", row?);
//! }
//! ```

use std::path::Path;

use log::debug;

pub mod cell;
pub mod config;
pub mod dates;
pub mod error;
pub mod header;
pub mod intuit;
pub mod manglers;
pub mod row_generator;
pub mod sources;

// Re-exports
pub use cell::{non_nulls, text_row, AsciiPolicy, Cell, Row};
pub use config::{FixedWidthSettings, HeaderSettings, RowGenSettings};
pub use error::{BoxError, Result, RowGenError};
pub use intuit::{DataEndRule, IntuitPolicy, IntuitState, RowSpec, RowSpecIntuiter, ThresholdRule};
pub use row_generator::{DataRows, Header, HeaderMangler, RowGenerator};
pub use sources::{
    DateEpoch, DelimitedOptions, DelimitedSource, FixedWidthSource, GeneratorSource, RowSource,
    SpreadsheetOptions, SpreadsheetSource,
};

/// Kind of row source used for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Delimited,
    Spreadsheet,
    FixedWidth,
}

impl SourceKind {
    /// Pick the source kind for a path
    ///
    /// Configured fixed-width columns win; otherwise workbook extensions
    /// (`xls`, `xlsx`, `xlsm`, `xlsb`, `ods`) select a spreadsheet and
    /// everything else is read as delimited text.
    pub fn detect(path: &Path, settings: &RowGenSettings) -> Self {
        if !settings.fixed_width.widths.is_empty() {
            return SourceKind::FixedWidth;
        }

        match extension(path).as_deref() {
            Some("xls" | "xlsx" | "xlsm" | "xlsb" | "ods") => SourceKind::Spreadsheet,
            _ => SourceKind::Delimited,
        }
    }
}

/// Engine for opening tabular files as row generators
pub struct RowGenEngine;

impl RowGenEngine {
    /// Open a file as a row source, chosen by [`SourceKind::detect`]
    ///
    /// `.tsv` files are read tab-separated unless the delimiter is sniffed.
    pub fn open_source(
        path: impl AsRef<Path>,
        settings: &RowGenSettings,
    ) -> Result<Box<dyn RowSource>> {
        let path = path.as_ref();
        let kind = SourceKind::detect(path, settings);
        debug!("Opening {} as {:?}", path.display(), kind);

        Ok(match kind {
            SourceKind::Delimited => {
                let mut options = settings.delimited.clone();
                if extension(path).as_deref() == Some("tsv") && !options.sniff {
                    options.delimiter = b'\t';
                }
                Box::new(DelimitedSource::with_options(path, options)?)
            }
            SourceKind::Spreadsheet => Box::new(SpreadsheetSource::with_options(
                path,
                settings.spreadsheet.clone(),
            )?),
            SourceKind::FixedWidth => Box::new(FixedWidthSource::new(
                path,
                settings.fixed_width.widths.clone(),
            )?),
        })
    }

    /// Open a file as a row generator configured from `settings`
    ///
    /// A declared `[layout]` is applied; otherwise the generator keeps the
    /// default layout until [`RowGenerator::intuit`] is called.
    pub fn open(path: impl AsRef<Path>, settings: &RowGenSettings) -> Result<RowGenerator> {
        let source = Self::open_source(path, settings)?;

        let mut generator =
            RowGenerator::new(source).with_ascii_policy(settings.header.ascii_policy);
        if settings.header.mangle {
            generator = generator.with_header_mangler(manglers::snake_case);
        }
        if let Some(layout) = &settings.layout {
            generator.apply_spec(layout);
        }

        Ok(generator)
    }

    /// Open a file and intuit its layout with the configured policy
    pub fn intuit_path(path: impl AsRef<Path>, settings: &RowGenSettings) -> Result<RowSpec> {
        let mut source = Self::open_source(path, settings)?;
        RowSpecIntuiter::new(settings.intuit).intuit(&mut source)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
