//! Configuration Settings
//!
//! Reader options, intuition policy and header handling, loaded from TOML.
//!
//! ```toml
//! [delimited]
//! sniff = true
//! encoding = "windows-1252"
//!
//! [spreadsheet]
//! segment = 1
//! date_epoch = "1904"
//!
//! [intuit]
//! sample_limit = 50
//! data_end = { after_gap = 1 }
//!
//! [header]
//! mangle = true
//! ascii_policy = { replace = "?" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cell::AsciiPolicy;
use crate::error::Result;
use crate::intuit::{IntuitPolicy, RowSpec};
use crate::sources::{DelimitedOptions, SpreadsheetOptions};

/// Top-level settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RowGenSettings {
    /// Delimited text reader options
    pub delimited: DelimitedOptions,
    /// Workbook reader options
    pub spreadsheet: SpreadsheetOptions,
    /// Fixed-width layout
    pub fixed_width: FixedWidthSettings,
    /// Header intuition tunables
    pub intuit: IntuitPolicy,
    /// Header post-processing
    pub header: HeaderSettings,
    /// Declared row layout, used instead of intuition when present
    pub layout: Option<RowSpec>,
}

impl RowGenSettings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load settings from a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }
}

/// Fixed-width column layout
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FixedWidthSettings {
    /// Column widths in characters; empty means the source is not fixed-width
    pub widths: Vec<usize>,
}

/// Header handling
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HeaderSettings {
    /// Treatment of non-ASCII characters in header and comment text
    pub ascii_policy: AsciiPolicy,
    /// Normalize column names with [`snake_case`](crate::manglers::snake_case)
    pub mangle: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intuit::{DataEndRule, ThresholdRule};
    use crate::sources::DateEpoch;

    #[test]
    fn test_default_settings() {
        let settings = RowGenSettings::default();
        assert_eq!(settings.delimited.delimiter, b',');
        assert!(!settings.delimited.sniff);
        assert_eq!(settings.spreadsheet.segment, 0);
        assert_eq!(settings.spreadsheet.date_epoch, None);
        assert_eq!(settings.intuit, IntuitPolicy::default());
        assert!(settings.fixed_width.widths.is_empty());
        assert!(!settings.header.mangle);
        assert!(settings.layout.is_none());
    }

    #[test]
    fn test_parse_empty_toml() {
        let settings = RowGenSettings::from_toml_str("").unwrap();
        assert_eq!(settings.intuit.sample_limit, 100);
        assert_eq!(settings.header.ascii_policy, AsciiPolicy::Drop);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[delimited]
delimiter = ";"
encoding = "windows-1252"
trim = true

[spreadsheet]
segment = 2
date_epoch = "1904"

[fixed_width]
widths = [4, 10, 6]

[intuit]
sample_limit = 40
threshold = { fixed = 2 }
data_end = { after_gap = 1 }

[header]
mangle = true
ascii_policy = { replace = "?" }
"#;

        let settings = RowGenSettings::from_toml_str(toml).unwrap();
        assert_eq!(settings.delimited.delimiter, b';');
        assert_eq!(settings.delimited.encoding.as_deref(), Some("windows-1252"));
        assert!(settings.delimited.trim);
        assert_eq!(settings.spreadsheet.segment, 2);
        assert_eq!(settings.spreadsheet.date_epoch, Some(DateEpoch::Excel1904));
        assert_eq!(settings.fixed_width.widths, vec![4, 10, 6]);
        assert_eq!(settings.intuit.sample_limit, 40);
        assert_eq!(settings.intuit.threshold, ThresholdRule::Fixed(2));
        assert_eq!(settings.intuit.data_end, DataEndRule::AfterGap(1));
        assert!(settings.header.mangle);
        assert_eq!(settings.header.ascii_policy, AsciiPolicy::Replace('?'));
    }

    #[test]
    fn test_parse_tab_delimiter() {
        let settings = RowGenSettings::from_toml_str("[delimited]\ndelimiter = \"tab\"").unwrap();
        assert_eq!(settings.delimited.delimiter, b'\t');
    }

    #[test]
    fn test_parse_layout() {
        let toml = r#"
[layout]
header_comment_lines = [0]
header_lines = [1, 2]
data_start_line = 3
"#;

        let settings = RowGenSettings::from_toml_str(toml).unwrap();
        let layout = settings.layout.unwrap();
        assert_eq!(layout.header_comment_lines, vec![0]);
        assert_eq!(layout.header_lines, vec![1, 2]);
        assert_eq!(layout.data_start_line, Some(3));
        assert_eq!(layout.data_end_line, None);
    }

    #[test]
    fn test_rejects_multichar_delimiter() {
        assert!(RowGenSettings::from_toml_str("[delimited]\ndelimiter = \";;\"").is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ambry.toml");
        std::fs::write(&path, "[intuit]\ndata_end = \"never\"\n").unwrap();

        let settings = RowGenSettings::from_path(&path).unwrap();
        assert_eq!(settings.intuit.data_end, DataEndRule::Never);
    }
}
