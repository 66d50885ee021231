//! ambry CLI - Command-line interface library
//!
//! This library provides the CLI functionality for ambry, including:
//! - Intuit: Guess the comment, header and data lines of a file
//! - Header: Print the assembled column names
//! - Rows: Write the data rows as clean CSV
//! - Footer: Print the notes below the data
//!
//! # Library Usage
//!
//! ```ignore
//! use ambry_cli::{header_command, OutputFormat, SourceArgs};
//!
//! let mut args = SourceArgs::new("report.xlsx");
//! args.intuit = true;
//! header_command(&args, OutputFormat::Json, &mut std::io::stdout())?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Guess the layout of a spreadsheet
//! ambry intuit report.xlsx --format json
//!
//! # Clean CSV from a declared layout
//! ambry rows survey.csv --comment-lines 0,1 --header-lines 2,3 --data-start 4
//!
//! # Column names of a fixed-width file, normalized
//! ambry header stations.txt --widths 4,10,6 --intuit --mangle
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{
    footer_command, header_command, intuit_command, open_generator, rows_command,
};
pub use app::{run_cli, OutputFormat, SourceArgs};
