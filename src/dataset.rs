use rayon::prelude::*;
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::time::Instant;
use tracing::{debug, info};
use unicode_width::UnicodeWidthStr;

use crate::columns::{self, ColumnKind};
use crate::format::CellRule;

/// One row of a sheet, keyed by column name in file order.
pub type Record = Map<String, Value>;

/// A column with every cell already formatted for display.
#[derive(Debug)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub rule: CellRule,
    pub max_width: usize,
    pub data: Vec<String>,
}

impl Column {
    fn load(records: &[Record], name: &str) -> Self {
        let rule = CellRule::for_column(name);
        let mut max_width = 0;
        let data = records
            .iter()
            .map(|r| {
                let cell = single_line(rule.apply(r.get(name)));
                max_width = max_width.max(display_width(&cell));
                cell
            })
            .collect();

        Column {
            name: name.to_string(),
            kind: ColumnKind::of(name),
            rule,
            max_width,
            data,
        }
    }

    pub fn as_string(&self) -> String {
        format!(
            "\"{}\", {:?}, {:?}, width_max: {}, # rows {}",
            self.name,
            self.kind,
            self.rule,
            self.max_width,
            self.data.len(),
        )
    }
}

/// A loaded sheet. Replaced as a whole when another sheet is loaded.
#[derive(Debug)]
pub struct Dataset {
    pub sheet: String,
    pub records: Vec<Record>,
    pub columns: Vec<String>,
    pub cells: Vec<Column>,
}

impl Dataset {
    pub fn empty() -> Self {
        Dataset {
            sheet: String::new(),
            records: Vec::new(),
            columns: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Build a dataset. The column order is taken from the first record.
    pub fn from_records(sheet: impl Into<String>, records: Vec<Record>) -> Self {
        let start_time = Instant::now();
        let columns: Vec<String> = records
            .first()
            .map(|r| columns::column_order(r.keys()))
            .unwrap_or_default();

        // Each column is formatted on its own thread.
        let cells: Vec<Column> = columns
            .par_iter()
            .map(|name| Column::load(&records, name))
            .collect();

        let sheet = sheet.into();
        info!(
            "Formatted {} rows x {} columns of {sheet} in {}ms",
            records.len(),
            columns.len(),
            start_time.elapsed().as_millis()
        );
        for c in cells.iter() {
            debug!("Column: {}", c.as_string());
        }

        Dataset {
            sheet,
            records,
            columns,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn event_columns(&self) -> Vec<String> {
        columns::event_columns(&self.columns)
    }

    /// The display text of one cell.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.cells
            .get(column)
            .and_then(|c| c.data.get(row))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// All cells of one record in column order.
    pub fn formatted_row(&self, row: usize) -> Vec<String> {
        (0..self.cells.len())
            .map(|c| self.cell(row, c).to_string())
            .collect()
    }

    /// Write the header and the given rows as tab separated lines.
    pub fn write_table<W: Write>(&self, out: &mut W, rows: &[usize]) -> io::Result<()> {
        writeln!(out, "{}", self.columns.join("\t"))?;
        for &row in rows {
            writeln!(out, "{}", self.formatted_row(row).join("\t"))?;
        }
        Ok(())
    }
}

/// Terminal cells taken by `s`.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

// Keep every cell on one line of the table and in one field of the TSV output.
fn single_line(cell: String) -> String {
    if !cell.contains(['\n', '\r', '\t']) {
        return cell;
    }
    cell.replace("\r\n", " ↵ ")
        .replace(['\n', '\r'], " ↵ ")
        .replace('\t', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn columns_follow_first_record() {
        let ds = Dataset::from_records(
            "U12",
            records(json!([
                {"Rank": 1, "Name": "A", "100m": 0, "Total Point": 3},
                {"Name": "B", "Rank": 2, "Extra": "x"}
            ])),
        );
        assert_eq!(ds.columns, vec!["Rank", "Name", "100m", "Total Point"]);
        assert_eq!(ds.event_columns(), vec!["100m"]);
        assert_eq!(ds.formatted_row(0), vec!["1", "A", "", "3.00"]);
        // Missing keys render blank, keys not in the first record are ignored.
        assert_eq!(ds.formatted_row(1), vec!["2", "B", "", ""]);
    }

    #[test]
    fn empty_sheet_has_no_columns() {
        let ds = Dataset::from_records("empty", Vec::new());
        assert!(ds.is_empty());
        assert!(ds.columns.is_empty());
        assert!(ds.cells.is_empty());
        assert_eq!(ds.cell(0, 0), "");
    }

    #[test]
    fn column_width_is_widest_cell() {
        let ds = Dataset::from_records(
            "w",
            records(json!([{"Name": "Ana"}, {"Name": "Bartholomäus"}])),
        );
        assert_eq!(ds.cells[0].max_width, 12);
        assert_eq!(ds.cells[0].rule, CellRule::Text);
    }

    #[test]
    fn line_breaks_and_tabs_stay_inside_the_cell() {
        let ds = Dataset::from_records(
            "t",
            records(json!([
                {"Rank": 1, "Name": "Anna\nBerg", "Team": "TSV\tNord", "100m": 5},
                {"Rank": 2, "Name": "Ben\r\nOtt", "Team": "LG", "100m": 1}
            ])),
        );
        assert_eq!(ds.cell(0, 1), "Anna ↵ Berg");
        assert_eq!(ds.cell(0, 2), "TSV Nord");
        assert_eq!(ds.cell(1, 1), "Ben ↵ Ott");

        let mut out = Vec::new();
        ds.write_table(&mut out, &[0, 1]).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.split('\t').count() == 4));
    }

    #[test]
    fn numeric_keys_lead_the_columns() {
        let ds = Dataset::from_records("n", records(json!([{"Name": "A", "2567": 3, "1": 2}])));
        assert_eq!(ds.columns, vec!["1", "2567", "Name"]);
        assert_eq!(ds.formatted_row(0), vec!["2.00", "3.00", "A"]);
    }

    #[test]
    fn width_counts_terminal_cells() {
        assert_eq!(display_width("Anna"), 4);
        assert_eq!(display_width("田中太郎"), 8);
        // Thai combining marks take no cell of their own.
        assert_eq!(display_width("สมศักดิ์"), 5);

        let ds = Dataset::from_records("w", records(json!([{"Name": "田中太郎"}])));
        assert_eq!(ds.cells[0].max_width, 8);
    }

    #[test]
    fn write_table_emits_tsv() {
        let ds = Dataset::from_records(
            "t",
            records(json!([
                {"Rank": 1, "Name": "A", "100m": 0},
                {"Rank": 2, "Name": "B", "100m": 5.5}
            ])),
        );
        let mut out = Vec::new();
        ds.write_table(&mut out, &[1]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Rank\tName\t100m\n2\tB\t5.50\n");
    }
}
