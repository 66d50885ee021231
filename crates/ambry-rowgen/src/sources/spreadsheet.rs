//! Spreadsheet (XLS/XLSX/XLSB/ODS) row source using calamine.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use calamine::{
    open_workbook, open_workbook_auto, Data, ExcelDateTime, Range, Reader, Sheets, Xls, Xlsx,
};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub use crate::dates::DateEpoch;

use crate::cell::{Cell, Row};
use crate::dates;
use crate::error::{Result, RowGenError};
use crate::sources::{LineCounter, RowSource};

/// Per-cell transform applied to string cells
pub type CellDecoder = Box<dyn Fn(&str) -> String>;

/// Options for spreadsheet reading
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadsheetOptions {
    /// Zero-based sheet index
    pub segment: usize,
    /// Date system for the date casters, overriding the one read from the
    /// workbook
    pub date_epoch: Option<DateEpoch>,
}

/// What the first bytes of a workbook file say it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    /// OLE2 compound document (legacy BIFF `.xls`)
    Ole,
    /// Zip package (`.xlsx`, `.xlsm`, `.ods`)
    Zip,
    /// Plain XML text (SpreadsheetML 2003, HTML exports)
    Xml,
    Unknown,
}

/// Spreadsheet sheet row source
///
/// The selected sheet is loaded once; [`reset`](RowSource::reset) re-seeks
/// to the first sheet row. Line numbers follow sheet rows, so blank rows
/// above the used range are produced as empty rows.
pub struct SpreadsheetSource {
    /// Path to the workbook
    path: PathBuf,
    options: SpreadsheetOptions,
    sheet_names: Vec<String>,
    range: Range<Data>,
    /// Date system read from the workbook's own date cells
    workbook_epoch: Option<DateEpoch>,
    decoder: Option<CellDecoder>,
    cursor: usize,
    lines: LineCounter,
}

impl SpreadsheetSource {
    /// Open the first sheet of a workbook
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, SpreadsheetOptions::default())
    }

    /// Open a workbook with custom options
    pub fn with_options(path: impl AsRef<Path>, options: SpreadsheetOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(RowGenError::FileNotFound(path.display().to_string()));
        }

        let mut workbook = open_sheets(&path)?;
        let sheet_names = workbook.sheet_names();

        let range = workbook
            .worksheet_range_at(options.segment)
            .ok_or_else(|| {
                RowGenError::SheetNotFound(format!(
                    "segment {} of {} ({} sheets)",
                    options.segment,
                    path.display(),
                    sheet_names.len()
                ))
            })??;

        let workbook_epoch = detect_epoch(&range);

        debug!(
            "Loaded segment {} of {}: {} x {} cells, date system {:?}",
            options.segment,
            path.display(),
            range.height(),
            range.width(),
            workbook_epoch
        );

        Ok(Self {
            path,
            options,
            sheet_names,
            range,
            workbook_epoch,
            decoder: None,
            cursor: 0,
            lines: LineCounter::default(),
        })
    }

    /// Pass every string cell through `decoder` while producing rows
    pub fn with_decoder(mut self, decoder: impl Fn(&str) -> String + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Names of all sheets in the workbook
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Date system used for serial numbers
    ///
    /// The configured `date_epoch` wins, then the system the workbook's
    /// date cells were written in, then the 1900 system.
    pub fn date_epoch(&self) -> DateEpoch {
        self.options
            .date_epoch
            .or(self.workbook_epoch)
            .unwrap_or_default()
    }

    /// Caster from cells to date and time, using this workbook's date system
    pub fn datetime_caster(&self) -> impl Fn(&Cell) -> Option<NaiveDateTime> {
        let epoch = self.date_epoch();
        move |cell| dates::cast_datetime(cell, epoch)
    }

    /// Caster from cells to calendar dates, using this workbook's date system
    pub fn date_caster(&self) -> impl Fn(&Cell) -> Option<NaiveDate> {
        let epoch = self.date_epoch();
        move |cell| dates::cast_date(cell, epoch)
    }

    /// Total number of sheet rows, counting blank rows above the used range
    fn sheet_height(&self) -> usize {
        match self.range.start() {
            Some((row, _)) => row as usize + self.range.height(),
            None => 0,
        }
    }

    fn row_at(&self, index: usize) -> Row {
        let Some((start_row, start_col)) = self.range.start() else {
            return Row::new();
        };
        let (start_row, start_col) = (start_row as usize, start_col as usize);

        if index < start_row {
            return Row::new();
        }

        let relative = index - start_row;
        let mut row: Row = vec![Cell::Empty; start_col];
        row.extend((0..self.range.width()).map(|col| match self.range.get((relative, col)) {
            Some(data) => self.decode(cell_from_data(data)),
            None => Cell::Empty,
        }));
        row
    }
}

impl RowSource for SpreadsheetSource {
    fn reset(&mut self) -> Result<()> {
        self.cursor = 0;
        self.lines.reset();
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.cursor >= self.sheet_height() {
            return Ok(None);
        }

        let row = self.row_at(self.cursor);
        self.cursor += 1;
        self.lines.advance();
        Ok(Some(row))
    }

    fn line_number(&self) -> usize {
        self.lines.line_number()
    }

    fn decode(&self, cell: Cell) -> Cell {
        match (&self.decoder, cell) {
            (Some(decoder), Cell::String(s)) => Cell::from(decoder(&s)),
            (_, cell) => cell,
        }
    }

    fn describe(&self) -> String {
        format!("{}#{}", self.path.display(), self.options.segment)
    }
}

/// Convert a calamine cell into a [`Cell`]
fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::Error(e) => Cell::Error(format!("{:?}", e)),
        Data::DateTime(dt) if dt.is_datetime() => excel_datetime(dt)
            .map(Cell::DateTime)
            .unwrap_or(Cell::Float(dt.as_f64())),
        Data::DateTime(dt) => Cell::Float(dt.as_f64()),
        Data::DateTimeIso(s) => dates::parse_free_text(s)
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::from(s.as_str())),
        Data::DurationIso(s) => Cell::from(s.as_str()),
    }
}

/// Date and time of a workbook date cell, in the workbook's own date system
///
/// `None` for the phantom 1900-02-29.
fn excel_datetime(dt: &ExcelDateTime) -> Option<NaiveDateTime> {
    let (year, month, day, hour, minute, second, milli) = dt.to_ymd_hms_milli();
    NaiveDate::from_ymd_opt(year.into(), month.into(), day.into())?.and_hms_milli_opt(
        hour.into(),
        minute.into(),
        second.into(),
        milli.into(),
    )
}

/// Date system of the first date cell in `range`
///
/// calamine converts date cells with the workbook's own flag; the serial
/// number read back through the 1904 system tells which one that was.
fn detect_epoch(range: &Range<Data>) -> Option<DateEpoch> {
    range.used_cells().find_map(|(_, _, data)| match data {
        Data::DateTime(dt) if dt.is_datetime() => {
            let date = excel_datetime(dt)?.date();
            let as_1904 = dates::serial_to_datetime(dt.as_f64(), DateEpoch::Excel1904)?.date();
            Some(if date == as_1904 {
                DateEpoch::Excel1904
            } else {
                DateEpoch::Excel1900
            })
        }
        _ => None,
    })
}

/// Open a workbook, choosing the format by extension
///
/// When the extension and the content disagree (an `.xls` that is really a
/// zip package, or an `.xlsx` that is really a BIFF file) the open is
/// retried once with the substituted format.
fn open_sheets(path: &Path) -> Result<Sheets<BufReader<File>>> {
    let err = match open_workbook_auto(path) {
        Ok(workbook) => return Ok(workbook),
        Err(err) => err,
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let container = sniff_container(path)?;

    let retried = match (extension.as_deref(), container) {
        (Some("xls"), Container::Zip) => {
            warn!(
                "{} claims .xls but holds a zip package; retrying as .xlsx",
                path.display()
            );
            open_workbook::<Xlsx<_>, _>(path)
                .map(Sheets::Xlsx)
                .map_err(|e| e.to_string())
        }
        (Some("xlsx") | Some("xlsm"), Container::Ole) => {
            warn!(
                "{} claims .xlsx but holds a BIFF workbook; retrying as .xls",
                path.display()
            );
            open_workbook::<Xls<_>, _>(path)
                .map(Sheets::Xls)
                .map_err(|e| e.to_string())
        }
        (_, Container::Xml) => {
            return Err(RowGenError::WorkbookOpen(format!(
                "{}: XML spreadsheet content is not a supported workbook format ({})",
                path.display(),
                err
            )))
        }
        _ => {
            return Err(RowGenError::WorkbookOpen(format!(
                "{}: {}",
                path.display(),
                err
            )))
        }
    };

    retried.map_err(|retry_err| {
        RowGenError::WorkbookOpen(format!(
            "{}: {} (retry with substituted extension failed: {})",
            path.display(),
            err,
            retry_err
        ))
    })
}

fn sniff_container(path: &Path) -> Result<Container> {
    let mut magic = [0u8; 8];
    let mut file = File::open(path)?;
    let read = file.read(&mut magic)?;
    let magic = &magic[..read];

    let container = if magic.starts_with(b"PK\x03\x04") {
        Container::Zip
    } else if magic.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        Container::Ole
    } else if magic
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'<')
    {
        Container::Xml
    } else {
        Container::Unknown
    };

    Ok(container)
}
