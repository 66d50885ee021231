//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{debug, info};

use ambry_rowgen::{Cell, RowGenEngine, RowGenSettings, RowGenerator, RowSpec};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tool consumption
    Json,
}

#[derive(Parser)]
#[command(name = "ambry")]
#[command(author, version, about = "Find the header and the data in messy tabular files", long_about = None)]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Guess which lines hold header comments, the header and the data
    Intuit {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the column names
    Header {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write the data rows as CSV to stdout
    Rows {
        #[command(flatten)]
        source: SourceArgs,

        /// Stop after this many data rows
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Do not write the header row
        #[arg(long)]
        no_header: bool,
    },

    /// Print the lines after the data block
    Footer {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Input file, reader options and layout shared by every command
///
/// Flags override the values loaded from `--config`.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Input file: CSV/TSV/TXT, a workbook (XLS, XLSX, XLSM, XLSB, ODS), or
    /// fixed-width text with --widths
    pub input: PathBuf,

    /// Settings file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Zero-based sheet index in a workbook
    #[arg(long)]
    pub sheet: Option<usize>,

    /// Field delimiter for delimited text
    #[arg(short, long)]
    pub delimiter: Option<char>,

    /// Detect the delimiter from the top of the file
    #[arg(long)]
    pub sniff: bool,

    /// Text encoding label for delimited text (e.g. windows-1252)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Fixed-width column widths, comma separated
    #[arg(long, value_delimiter = ',')]
    pub widths: Vec<usize>,

    /// Zero-based header line numbers, comma separated
    #[arg(long, value_delimiter = ',')]
    pub header_lines: Vec<usize>,

    /// Zero-based header comment line numbers, comma separated
    #[arg(long, value_delimiter = ',')]
    pub comment_lines: Vec<usize>,

    /// First data line
    #[arg(long)]
    pub data_start: Option<usize>,

    /// First line after the data
    #[arg(long)]
    pub data_end: Option<usize>,

    /// Guess the layout from the file instead of declaring it
    #[arg(
        long,
        conflicts_with_all = ["header_lines", "comment_lines", "data_start", "data_end"]
    )]
    pub intuit: bool,

    /// Normalize column names to snake_case
    #[arg(long)]
    pub mangle: bool,
}

impl SourceArgs {
    /// Arguments for an input file with every option left unset
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// Settings from `--config` with the command-line flags applied
    pub fn settings(&self) -> Result<RowGenSettings> {
        let mut settings = match &self.config {
            Some(path) => RowGenSettings::from_path(path)
                .with_context(|| format!("Failed to load settings: {}", path.display()))?,
            None => RowGenSettings::default(),
        };

        if let Some(sheet) = self.sheet {
            settings.spreadsheet.segment = sheet;
        }
        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                bail!("Delimiter must be a single ASCII character, got {:?}", delimiter);
            }
            settings.delimited.delimiter = delimiter as u8;
        }
        if self.sniff {
            settings.delimited.sniff = true;
        }
        if let Some(encoding) = &self.encoding {
            settings.delimited.encoding = Some(encoding.clone());
        }
        if !self.widths.is_empty() {
            settings.fixed_width.widths = self.widths.clone();
        }
        if self.mangle {
            settings.header.mangle = true;
        }

        settings.layout = self.layout(settings.layout.take());
        Ok(settings)
    }

    /// Layout flags merged over a declared layout
    fn layout(&self, declared: Option<RowSpec>) -> Option<RowSpec> {
        if self.header_lines.is_empty()
            && self.comment_lines.is_empty()
            && self.data_start.is_none()
            && self.data_end.is_none()
        {
            return declared;
        }

        let mut layout = declared.unwrap_or_else(|| RowSpec {
            header_lines: vec![0],
            ..Default::default()
        });

        if !self.header_lines.is_empty() {
            layout.header_lines = self.header_lines.clone();
        }
        if !self.comment_lines.is_empty() {
            layout.header_comment_lines = self.comment_lines.clone();
        }
        if self.data_start.is_some() {
            layout.data_start_line = self.data_start;
        }
        if self.data_end.is_some() {
            layout.data_end_line = self.data_end;
        }

        Some(layout)
    }
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Intuit { source, format } => {
            intuit_command(&source, format, &mut out)?;
        }
        Commands::Header { source, format } => {
            header_command(&source, format, &mut out)?;
        }
        Commands::Rows {
            source,
            limit,
            no_header,
        } => {
            rows_command(&source, limit, !no_header, &mut out)?;
        }
        Commands::Footer { source, format } => {
            footer_command(&source, format, &mut out)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Open the input as a row generator, intuiting the layout on `--intuit`
pub fn open_generator(args: &SourceArgs) -> Result<RowGenerator> {
    let settings = args.settings()?;

    let mut generator = RowGenEngine::open(&args.input, &settings)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;

    if args.intuit {
        let spec = generator
            .intuit(settings.intuit)
            .with_context(|| format!("Failed to intuit layout of {}", args.input.display()))?;
        debug!(?spec, "Using intuited layout");
    }

    Ok(generator)
}

/// Execute the intuit command
pub fn intuit_command(args: &SourceArgs, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let settings = args.settings()?;
    info!("Intuiting layout of {}", args.input.display());

    let spec = RowGenEngine::intuit_path(&args.input, &settings)
        .with_context(|| format!("Failed to intuit layout of {}", args.input.display()))?;

    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&spec).context("Failed to serialize layout to JSON")?;
            writeln!(out, "{}", json)?;
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "header_comment_lines: {}",
                join_lines(&spec.header_comment_lines)
            )?;
            writeln!(out, "header_lines: {}", join_lines(&spec.header_lines))?;
            writeln!(out, "data_start_line: {}", optional_line(spec.data_start_line))?;
            writeln!(out, "data_end_line: {}", optional_line(spec.data_end_line))?;
        }
    }

    Ok(())
}

/// Execute the header command
pub fn header_command(args: &SourceArgs, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let mut generator = open_generator(args)?;
    let header = generator
        .header_info()
        .with_context(|| format!("Failed to read header of {}", args.input.display()))?;

    match format {
        OutputFormat::Json => {
            let value = json!({
                "header": header.names,
                "unmangled": header.unmangled,
                "comment": header.comment,
            });
            let json =
                serde_json::to_string_pretty(&value).context("Failed to serialize header to JSON")?;
            writeln!(out, "{}", json)?;
        }
        OutputFormat::Text => {
            for (index, name) in header.names.iter().enumerate() {
                writeln!(out, "{}: {}", index, name)?;
            }
        }
    }

    Ok(())
}

/// Execute the rows command
pub fn rows_command(
    args: &SourceArgs,
    limit: Option<usize>,
    with_header: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let mut generator = open_generator(args)?;
    let header = generator
        .get_header()
        .with_context(|| format!("Failed to read header of {}", args.input.display()))?
        .to_vec();

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);
    if with_header && !header.is_empty() {
        writer.write_record(&header)?;
    }

    let mut written = 0;
    for row in generator.rows()?.take(limit.unwrap_or(usize::MAX)) {
        let row = row.with_context(|| format!("Failed to read {}", args.input.display()))?;
        writer.write_record(row.iter().map(Cell::text))?;
        written += 1;
    }
    writer.flush()?;

    info!("Wrote {} rows from {}", written, args.input.display());
    Ok(())
}

/// Execute the footer command
pub fn footer_command(args: &SourceArgs, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let mut generator = open_generator(args)?;
    let footer = generator
        .get_footer()
        .with_context(|| format!("Failed to read footer of {}", args.input.display()))?;

    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&footer).context("Failed to serialize footer to JSON")?;
            writeln!(out, "{}", json)?;
        }
        OutputFormat::Text => match footer {
            Some(lines) => {
                for line in lines {
                    writeln!(out, "{}", line)?;
                }
            }
            None => info!("No data end line, so no footer"),
        },
    }

    Ok(())
}

fn join_lines(lines: &[usize]) -> String {
    if lines.is_empty() {
        return "-".to_string();
    }
    lines
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn optional_line(line: Option<usize>) -> String {
    line.map_or_else(|| "-".to_string(), |l| l.to_string())
}
