//! Integration tests for ambry-rowgen

use std::path::{Path, PathBuf};

use ambry_rowgen::{
    manglers, text_row, Cell, DataEndRule, DelimitedOptions, DelimitedSource, FixedWidthSource,
    IntuitPolicy, Row, RowGenEngine, RowGenError, RowGenSettings, RowGenerator, RowSpec,
    RowSource, RowSpecIntuiter, SpreadsheetSource,
};
use chrono::NaiveDate;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write fixture");
    path
}

/// County population workbook with a title, a blank line, a header, three
/// data rows, a blank line and a source note
fn write_population_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    sheet.write_string(0, 0, "Population by county").unwrap();
    for (col, name) in ["County", "Population", "Area"].iter().enumerate() {
        sheet.write_string(2, col as u16, *name).unwrap();
    }
    for (i, (county, population, area)) in [
        ("Adams", 4981.0, 12.5),
        ("Baker", 16124.0, 30.0),
        ("Clark", 8870.0, 7.25),
    ]
    .iter()
    .enumerate()
    {
        let row = 3 + i as u32;
        sheet.write_string(row, 0, *county).unwrap();
        sheet.write_number(row, 1, *population).unwrap();
        sheet.write_number(row, 2, *area).unwrap();
    }
    sheet.write_string(7, 0, "Source: census").unwrap();

    workbook.save(path).expect("Failed to save workbook");
}

fn collect(generator: &mut RowGenerator) -> Vec<Row> {
    generator
        .rows()
        .expect("Failed to position at data")
        .map(|row| row.expect("Failed to read row"))
        .collect()
}

#[test]
fn test_comment_block_header_and_data() {
    let dir = TempDir::new().unwrap();
    let mut content = String::from("Table 4,,,,\nAnnual survey,,,,\nPreliminary,,,,\n");
    content.push_str("id,name,city,year,score\n");
    for i in 0..10 {
        content.push_str(&format!("{},n{},c{},20{:02},{}\n", i, i, i, i, i * 10));
    }
    let path = write_file(&dir, "survey.csv", content);

    let mut source = DelimitedSource::new(&path).unwrap();
    let spec = RowSpecIntuiter::new(IntuitPolicy::default())
        .intuit(&mut source)
        .unwrap();

    assert_eq!(
        spec,
        RowSpec {
            data_start_line: Some(4),
            data_end_line: None,
            header_lines: vec![3],
            header_comment_lines: vec![0, 1, 2],
        }
    );
}

#[test]
fn test_blank_lines_above_table() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "padded.csv", "\n\nA,B,C\n1,2,3\n4,5,6\n");

    let spec = RowGenEngine::intuit_path(&path, &RowGenSettings::default()).unwrap();
    assert_eq!(spec.header_comment_lines, vec![0, 1]);
    assert_eq!(spec.header_lines, vec![2]);
    assert_eq!(spec.data_start_line, Some(3));

    let mut generator = RowGenerator::new(DelimitedSource::new(&path).unwrap())
        .with_header_lines(vec![2])
        .with_data_start_line(3);
    assert_eq!(generator.get_header().unwrap(), ["A", "B", "C"]);
    assert_eq!(
        collect(&mut generator),
        vec![text_row(["1", "2", "3"]), text_row(["4", "5", "6"])]
    );
}

#[test]
fn test_spanning_header_from_csv() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "sales.csv",
        "Region,,Sales,\n,Name,Qty,Amount\nwest,Ann,3,9.50\n",
    );

    let mut generator = RowGenerator::new(DelimitedSource::new(&path).unwrap())
        .with_header_lines(vec![0, 1])
        .with_data_start_line(2);

    assert_eq!(
        generator.get_header().unwrap(),
        ["Region", "Region Name", "Sales Qty", "Sales Amount"]
    );
    assert_eq!(
        collect(&mut generator),
        vec![text_row(["west", "Ann", "3", "9.50"])]
    );
}

#[test]
fn test_spreadsheet_date_caster() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dates.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_number(0, 0, 43831.0).unwrap();
    sheet.write_string(0, 1, "March 2020").unwrap();
    sheet.write_string(0, 2, "not a date").unwrap();
    workbook.save(&path).unwrap();

    let mut source = SpreadsheetSource::new(&path).unwrap();
    let row = source.next_row().unwrap().unwrap();
    let caster = source.date_caster();

    assert_eq!(caster(&row[0]), NaiveDate::from_ymd_opt(2020, 1, 1));
    assert_eq!(caster(&row[1]), NaiveDate::from_ymd_opt(2020, 3, 1));
    assert_eq!(caster(&row[2]), None);
}

#[test]
fn test_workbook_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("population.xlsx");
    write_population_workbook(&path);

    let mut generator = RowGenEngine::open(&path, &RowGenSettings::default()).unwrap();
    let spec = generator.intuit(IntuitPolicy::default()).unwrap();

    assert_eq!(spec.header_comment_lines, vec![0, 1]);
    assert_eq!(spec.header_lines, vec![2]);
    assert_eq!(spec.data_start_line, Some(3));
    assert_eq!(spec.data_end_line, Some(6));

    assert_eq!(generator.get_header().unwrap(), ["County", "Population", "Area"]);

    let rows = collect(&mut generator);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], Cell::from("Adams"));
    assert_eq!(rows[1][1].text(), "16124");
    assert_eq!(rows[2][2], Cell::Float(7.25));

    assert_eq!(
        generator.get_footer().unwrap(),
        Some(vec![String::new(), "Source: census".to_string()])
    );
}

#[test]
fn test_workbook_rows_as_maps_with_mangler() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("population.xlsx");
    write_population_workbook(&path);

    let mut generator = RowGenerator::new(SpreadsheetSource::new(&path).unwrap())
        .with_header_mangler(manglers::snake_case);
    generator.intuit(IntuitPolicy::default()).unwrap();

    let first = generator
        .rows_as_maps()
        .unwrap()
        .next()
        .expect("No data rows")
        .unwrap();

    assert_eq!(first[0], ("county".to_string(), Cell::from("Adams")));
    assert_eq!(first[1], ("population".to_string(), Cell::Float(4981.0)));
}

#[test]
fn test_subtotal_rows_inside_data() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "ledger.csv",
        "Ledger,,\ndate,item,amount\n1,a,10\n2,b,20\n,,\n3,c,30\n4,d,40\n,,\nTotal,,\n",
    );

    let settings = RowGenSettings {
        intuit: IntuitPolicy {
            data_end: DataEndRule::AfterGap(1),
            ..IntuitPolicy::default()
        },
        ..RowGenSettings::default()
    };

    let spec = RowGenEngine::intuit_path(&path, &settings).unwrap();
    assert_eq!(spec.data_start_line, Some(2));
    assert_eq!(spec.data_end_line, Some(7));

    let mut strict = RowGenerator::new(DelimitedSource::new(&path).unwrap());
    let spec = strict.intuit(IntuitPolicy::default()).unwrap();
    assert_eq!(spec.data_end_line, Some(4));
    assert_eq!(collect(&mut strict).len(), 2);
}

#[test]
fn test_sniffed_legacy_encoding() {
    let dir = TempDir::new().unwrap();
    // "Caf\xe9" is windows-1252 for "Café"
    let path = write_file(
        &dir,
        "menu.csv",
        b"item;price\nCaf\xe9;3\nTea;2\n".as_slice(),
    );

    let options = DelimitedOptions {
        sniff: true,
        encoding: Some("windows-1252".to_string()),
        ..DelimitedOptions::default()
    };
    let source = DelimitedSource::with_options(&path, options).unwrap();
    assert_eq!(source.delimiter(), b';');

    let mut generator = RowGenerator::new(source);
    let rows = collect(&mut generator);
    assert_eq!(rows[0], text_row(["Caf\u{e9}", "3"]));
    assert_eq!(generator.get_header().unwrap(), ["item", "price"]);
}

#[test]
fn test_sniff_without_delimiters_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "words.txt", "alpha\nbeta\ngamma\n");

    let result = DelimitedSource::with_options(&path, DelimitedOptions::sniffed());
    assert!(matches!(result, Err(RowGenError::Dialect(_))));
}

#[test]
fn test_fixed_width_intuit() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "stations.txt",
        "Jan\nID  NAME      ELEV\n001 Boulder   1655\n002 Denver    1609\n",
    );

    let mut generator = RowGenerator::new(FixedWidthSource::new(&path, vec![4, 10, 4]).unwrap());
    let spec = generator.intuit(IntuitPolicy::default()).unwrap();

    assert_eq!(spec.header_comment_lines, vec![0]);
    assert_eq!(spec.header_lines, vec![1]);
    assert_eq!(generator.get_header().unwrap(), ["ID", "NAME", "ELEV"]);
    assert_eq!(
        collect(&mut generator),
        vec![
            text_row(["001", "Boulder", "1655"]),
            text_row(["002", "Denver", "1609"]),
        ]
    );
}

#[test]
fn test_missing_file() {
    let result = RowGenEngine::open("/nonexistent/table.csv", &RowGenSettings::default());
    assert!(matches!(result, Err(RowGenError::FileNotFound(_))));

    let result = RowGenEngine::open("/nonexistent/book.xlsx", &RowGenSettings::default());
    assert!(matches!(result, Err(RowGenError::FileNotFound(_))));
}

#[test]
fn test_generator_rows_restart() {
    let mut generator = RowGenerator::from_generator(|| {
        vec![
            text_row(["a", "b"]),
            text_row(["1", "2"]),
            text_row(["3", "4"]),
        ]
    });

    assert_eq!(collect(&mut generator).len(), 2);
    assert_eq!(collect(&mut generator).len(), 2);
    assert_eq!(generator.get_header().unwrap(), ["a", "b"]);
}
