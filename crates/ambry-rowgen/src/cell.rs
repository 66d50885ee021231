//! Cell values produced by row sources.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A raw row: ordered cell values in source column order
pub type Row = Vec<Cell>;

/// A single cell value
///
/// Text sources only ever produce [`Cell::String`] and [`Cell::Empty`];
/// spreadsheets produce the native kinds.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Error(String),
}

impl Cell {
    /// Render the cell the way a spreadsheet shows it
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::String(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{:.0}", f)
                } else {
                    f.to_string()
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Cell::Error(e) => format!("#ERROR: {}", e),
        }
    }

    /// True for empty cells and cells holding only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Borrow the text of a string cell
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell, if it holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::String(s.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::String(s)
        }
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Int(i)
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Cell::Float(f)
    }
}

/// Build a row of string cells
pub fn text_row<I, S>(values: I) -> Row
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().map(|v| Cell::from(v.as_ref())).collect()
}

/// Policy for characters outside the ASCII range in header and comment text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AsciiPolicy {
    /// Remove non-ASCII characters
    #[default]
    Drop,
    /// Substitute each non-ASCII character
    Replace(char),
}

impl AsciiPolicy {
    /// Apply the policy to a piece of text
    pub fn sanitize(self, s: &str) -> String {
        match self {
            AsciiPolicy::Drop => s.chars().filter(char::is_ascii).collect(),
            AsciiPolicy::Replace(r) => s
                .chars()
                .map(|c| if c.is_ascii() { c } else { r })
                .collect(),
        }
    }

    /// Sanitize every cell of a row into strings
    pub fn sanitize_row(self, row: &[Cell]) -> Vec<String> {
        row.iter().map(|c| self.sanitize(&c.text())).collect()
    }
}

/// Count of cells with non-empty text after sanitizing and stripping
pub fn non_nulls(row: &[Cell], policy: AsciiPolicy) -> usize {
    row.iter()
        .filter(|c| !policy.sanitize(&c.text()).trim().is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(Cell::Empty.text(), "");
        assert_eq!(Cell::from("hello").text(), "hello");
        assert_eq!(Cell::Int(42).text(), "42");
        assert_eq!(Cell::Float(3.14).text(), "3.14");
        assert_eq!(Cell::Float(10.0).text(), "10");
        assert_eq!(Cell::Bool(true).text(), "true");
    }

    #[test]
    fn test_empty_string_is_empty_cell() {
        assert_eq!(Cell::from(""), Cell::Empty);
        assert!(Cell::from("   ").is_blank());
        assert!(!Cell::Int(0).is_blank());
    }

    #[test]
    fn test_ascii_drop() {
        assert_eq!(AsciiPolicy::Drop.sanitize("Caf\u{e9} Tot\u{e4}l"), "Caf Totl");
    }

    #[test]
    fn test_ascii_replace() {
        assert_eq!(AsciiPolicy::Replace('?').sanitize("na\u{ef}ve"), "na?ve");
    }

    #[test]
    fn test_non_nulls() {
        let row = vec![
            Cell::from("a"),
            Cell::Empty,
            Cell::from("  "),
            Cell::Int(0),
            Cell::from("\u{a0}"),
        ];
        assert_eq!(non_nulls(&row, AsciiPolicy::Drop), 2);
    }

    #[test]
    fn test_cells_serialize_as_plain_values() {
        let row = vec![
            Cell::Empty,
            Cell::from("a"),
            Cell::Int(3),
            Cell::Float(2.5),
            Cell::Bool(true),
        ];
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"[null,"a",3,2.5,true]"#
        );
    }
}
