use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::format::format_value;
use crate::selection::CellSelection;
use crate::value::{CellValue, Column, Row};
use crate::view::GridView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Tsv,
    Json,
    JsonLines,
    Sql,
    Markdown,
    Xlsx,
}

impl ExportFormat {
    pub const ALL: [Self; 7] = [
        Self::Csv,
        Self::Tsv,
        Self::Json,
        Self::JsonLines,
        Self::Sql,
        Self::Markdown,
        Self::Xlsx,
    ];

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Json => "json",
            Self::JsonLines => "jsonl",
            Self::Sql => "sql",
            Self::Markdown => "md",
            Self::Xlsx => "xlsx",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Tsv => "TSV",
            Self::Json => "JSON",
            Self::JsonLines => "JSON Lines",
            Self::Sql => "SQL INSERT",
            Self::Markdown => "Markdown",
            Self::Xlsx => "Excel",
        }
    }

    #[must_use]
    pub fn is_text(self) -> bool {
        self != Self::Xlsx
    }
}

fn escape_delimited(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains(['"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn delimited_line<'a>(fields: impl Iterator<Item = &'a str>, delimiter: char) -> String {
    let mut line = String::new();
    for (index, field) in fields.enumerate() {
        if index > 0 {
            line.push(delimiter);
        }
        line.push_str(&escape_delimited(field, delimiter));
    }
    line
}

fn delimited_lines(
    columns: &[&Column],
    rows: &[&Row],
    delimiter: char,
    include_header: bool,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    if include_header {
        lines.push(delimited_line(
            columns.iter().map(|column| column.name.as_str()),
            delimiter,
        ));
    }

    for row in rows {
        let values = columns
            .iter()
            .map(|column| format_value(row.get(&column.name)))
            .collect::<Vec<_>>();
        lines.push(delimited_line(values.iter().map(String::as_str), delimiter));
    }
    lines
}

#[must_use]
pub fn to_delimited(columns: &[&Column], rows: &[&Row], delimiter: char) -> String {
    let mut content = String::new();
    for line in delimited_lines(columns, rows, delimiter, true) {
        content.push_str(&line);
        content.push('\n');
    }
    content
}

fn row_object(columns: &[&Column], row: &Row) -> Value {
    let mut object = Map::with_capacity(columns.len());
    for column in columns {
        object.insert(column.name.clone(), row.get(&column.name).to_json());
    }
    Value::Object(object)
}

#[must_use]
pub fn to_json(columns: &[&Column], rows: &[&Row]) -> String {
    let records = rows
        .iter()
        .map(|row| row_object(columns, row))
        .collect::<Vec<_>>();
    format!("{:#}", Value::Array(records))
}

#[must_use]
pub fn to_json_lines(columns: &[&Column], rows: &[&Row]) -> String {
    let mut content = String::new();
    for row in rows {
        content.push_str(&row_object(columns, row).to_string());
        content.push('\n');
    }
    content
}

fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

fn sql_literal(value: &CellValue) -> String {
    match value {
        CellValue::Null | CellValue::Undefined => "NULL".to_string(),
        CellValue::Bool(flag) => flag.to_string(),
        CellValue::Number(number) => number.to_string(),
        CellValue::Text(_) | CellValue::Structured(_) => {
            format!("'{}'", format_value(value).replace('\'', "''"))
        }
    }
}

#[must_use]
pub fn to_sql(columns: &[&Column], rows: &[&Row], table: &str) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let table = quote_table(table);
    let column_list = columns
        .iter()
        .map(|column| quote_identifier(&column.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut content = String::new();
    for row in rows {
        let values = columns
            .iter()
            .map(|column| sql_literal(row.get(&column.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(content, "INSERT INTO {table} ({column_list}) VALUES ({values});");
    }
    content
}

fn escape_markdown(value: &str) -> String {
    value
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace(['\n', '\r'], "<br>")
}

#[must_use]
pub fn to_markdown(columns: &[&Column], rows: &[&Row]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    let mut content = String::new();
    let header = columns
        .iter()
        .map(|column| escape_markdown(&column.name))
        .collect::<Vec<_>>();
    let _ = writeln!(content, "| {} |", header.join(" | "));
    let _ = writeln!(content, "|{}", " --- |".repeat(columns.len()));

    for row in rows {
        let cells = columns
            .iter()
            .map(|column| escape_markdown(&format_value(row.get(&column.name))))
            .collect::<Vec<_>>();
        let _ = writeln!(content, "| {} |", cells.join(" | "));
    }
    content
}

/// `None` for formats rendered by the spreadsheet collaborator.
#[must_use]
pub fn render_text(
    format: ExportFormat,
    columns: &[&Column],
    rows: &[&Row],
    table: &str,
) -> Option<String> {
    match format {
        ExportFormat::Csv => Some(to_delimited(columns, rows, ',')),
        ExportFormat::Tsv => Some(to_delimited(columns, rows, '\t')),
        ExportFormat::Json => Some(to_json(columns, rows)),
        ExportFormat::JsonLines => Some(to_json_lines(columns, rows)),
        ExportFormat::Sql => Some(to_sql(columns, rows, table)),
        ExportFormat::Markdown => Some(to_markdown(columns, rows)),
        ExportFormat::Xlsx => None,
    }
}

/// Tab separated text for the selected rectangle. A single selected column
/// is copied without its header.
#[must_use]
pub fn copy_selection(view: &GridView, selection: &CellSelection) -> String {
    let (top, left, bottom, right) = selection.bounds();
    let columns = (left..=right)
        .filter_map(|position| view.column(position))
        .collect::<Vec<_>>();
    let rows = (top..=bottom)
        .filter_map(|position| view.row(position))
        .collect::<Vec<_>>();

    delimited_lines(&columns, &rows, '\t', columns.len() > 1).join("\n")
}

#[must_use]
pub fn copy_all(view: &GridView) -> String {
    let columns = view.columns();
    let rows = view.rows().collect::<Vec<_>>();
    delimited_lines(&columns, &rows, '\t', true).join("\n")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadsheetData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    Text(String),
    Spreadsheet(SpreadsheetData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub destination: PathBuf,
    pub columns: Vec<Column>,
    pub row_count: usize,
    pub payload: ExportPayload,
}

#[must_use]
pub fn build_export_request(
    view: &GridView,
    format: ExportFormat,
    destination: impl Into<PathBuf>,
    table: &str,
) -> ExportRequest {
    let columns = view.columns();
    let rows = view.rows().collect::<Vec<_>>();

    let payload = render_text(format, &columns, &rows, table).map_or_else(
        || {
            ExportPayload::Spreadsheet(SpreadsheetData {
                columns: columns.iter().map(|column| column.name.clone()).collect(),
                rows: rows
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|column| row.get(&column.name).to_json())
                            .collect()
                    })
                    .collect(),
            })
        },
        ExportPayload::Text,
    );

    ExportRequest {
        format,
        destination: destination.into(),
        columns: columns.into_iter().cloned().collect(),
        row_count: rows.len(),
        payload,
    }
}

#[must_use]
pub fn default_file_name(format: ExportFormat) -> String {
    format!("results.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use serde_json::json;

    use super::{
        build_export_request, copy_all, copy_selection, to_delimited, to_json, to_json_lines,
        to_markdown, to_sql, ExportFormat, ExportPayload,
    };
    use crate::filter::FilterSet;
    use crate::selection::{CellPosition, CellSelection};
    use crate::value::{CellValue, Column, ResultSet, Row};
    use crate::view::GridView;

    fn fixture() -> (Vec<Column>, Vec<Row>) {
        (
            vec![Column::new("id", "int4"), Column::new("name", "text")],
            vec![
                Row::new().with("id", 1_i64).with("name", "Ann, \"A\""),
                Row::new().with("id", 2_i64).with("name", CellValue::Null),
            ],
        )
    }

    fn view() -> GridView {
        let (columns, rows) = fixture();
        GridView::build(
            Arc::new(ResultSet::new(columns, rows)),
            &FilterSet::new(),
            None,
            &BTreeSet::new(),
        )
    }

    #[test]
    fn csv_quotes_delimiters_and_doubles_quotes() {
        let (columns, rows) = fixture();
        let columns = columns.iter().collect::<Vec<_>>();
        let rows = rows.iter().collect::<Vec<_>>();

        assert_eq!(
            to_delimited(&columns, &rows, ','),
            "id,name\n1,\"Ann, \"\"A\"\"\"\n2,NULL\n"
        );
        assert_eq!(
            to_delimited(&columns, &rows, '\t'),
            "id\tname\n1\t\"Ann, \"\"A\"\"\"\n2\tNULL\n"
        );
    }

    #[test]
    fn json_keeps_column_order_and_nulls() {
        let (columns, rows) = fixture();
        let columns = columns.iter().collect::<Vec<_>>();
        let rows = rows.iter().collect::<Vec<_>>();

        let parsed: serde_json::Value =
            serde_json::from_str(&to_json(&columns, &rows)).expect("json export parses");
        assert_eq!(parsed, json!([{"id": 1, "name": "Ann, \"A\""}, {"id": 2, "name": null}]));

        let lines = to_json_lines(&columns, &rows);
        assert_eq!(lines.lines().count(), 2);
        assert_eq!(lines.lines().nth(1), Some(r#"{"id":2,"name":null}"#));
    }

    #[test]
    fn sql_inserts_use_typed_literals() {
        let columns = [Column::new("id", "int4"), Column::new("note", "text"), Column::new("ok", "bool")];
        let columns = columns.iter().collect::<Vec<_>>();
        let row = Row::new()
            .with("id", 7_i64)
            .with("note", "it's")
            .with("ok", true);

        assert_eq!(
            to_sql(&columns, &[&row], "public.events"),
            "INSERT INTO \"public\".\"events\" (\"id\", \"note\", \"ok\") VALUES (7, 'it''s', true);\n"
        );

        let empty = Row::new().with("note", CellValue::Null);
        assert!(to_sql(&columns, &[&empty], "t").contains("VALUES (NULL, NULL, NULL);"));
    }

    #[test]
    fn markdown_escapes_pipes_and_newlines() {
        let columns = [Column::new("a|b", "text")];
        let columns = columns.iter().collect::<Vec<_>>();
        let row = Row::new().with("a|b", "x|y\nz");
        assert_eq!(
            to_markdown(&columns, &[&row]),
            "| a\\|b |\n| --- |\n| x\\|y<br>z |\n"
        );
    }

    #[test]
    fn single_column_selection_copies_without_header() {
        let selection = CellSelection::single(CellPosition::new(1, 1));
        assert_eq!(copy_selection(&view(), &selection), "NULL");
    }

    #[test]
    fn multi_column_selection_copies_header_and_rectangle() {
        let selection = CellSelection {
            anchor: CellPosition::new(1, 1),
            end: CellPosition::new(0, 0),
        };
        assert_eq!(
            copy_selection(&view(), &selection),
            "id\tname\n1\t\"Ann, \"\"A\"\"\"\n2\tNULL"
        );
        assert!(copy_all(&view()).starts_with("id\tname\n"));
    }

    #[test]
    fn spreadsheet_requests_carry_typed_rows() {
        let request = build_export_request(&view(), ExportFormat::Xlsx, "/tmp/out.xlsx", "results");
        assert_eq!(request.row_count, 2);
        let ExportPayload::Spreadsheet(data) = request.payload else {
            panic!("xlsx should hand off spreadsheet data");
        };
        assert_eq!(data.columns, vec!["id".to_string(), "name".to_string()]);
        assert_eq!(data.rows[1], vec![json!(2), json!(null)]);

        let text = build_export_request(&view(), ExportFormat::Csv, "/tmp/out.csv", "results");
        assert!(matches!(text.payload, ExportPayload::Text(ref content) if content.starts_with("id,name\n")));
    }
}
