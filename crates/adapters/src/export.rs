use std::fs;
use std::path::PathBuf;

use gridlens_core::export::{ExportFormat, ExportPayload, ExportRequest};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write export file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} export needs the spreadsheet writer", .0.label())]
    UnsupportedFormat(ExportFormat),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: usize,
}

/// Writes pre-rendered text to the request destination. Spreadsheet payloads
/// belong to a binary writer and are rejected.
pub fn write_export(request: &ExportRequest) -> Result<ExportSummary, ExportError> {
    let ExportPayload::Text(content) = &request.payload else {
        return Err(ExportError::UnsupportedFormat(request.format));
    };

    let path = &request.destination;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;

    info!(
        path = %path.display(),
        format = request.format.label(),
        rows = request.row_count,
        "export written"
    );
    Ok(ExportSummary {
        path: path.clone(),
        rows: request.row_count,
        bytes: content.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;
    use std::sync::Arc;

    use gridlens_core::export::{build_export_request, ExportFormat};
    use gridlens_core::filter::FilterSet;
    use gridlens_core::view::GridView;
    use gridlens_core::{CellValue, Column, ResultSet, Row};
    use tempfile::TempDir;

    use super::{write_export, ExportError};

    fn view() -> GridView {
        let result = ResultSet::new(
            vec![Column::new("id", "int4"), Column::new("name", "text")],
            vec![
                Row::new().with("id", 1_i64).with("name", "alpha"),
                Row::new().with("id", 2_i64).with("name", "quote \"name\""),
                Row::new().with("id", 3_i64).with("name", CellValue::Null),
            ],
        );
        GridView::build(Arc::new(result), &FilterSet::new(), None, &BTreeSet::new())
    }

    #[test]
    fn writes_csv_with_header_and_escaping() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("nested").join("result.csv");
        let request = build_export_request(&view(), ExportFormat::Csv, &path, "results");

        let summary = write_export(&request).expect("csv export failed");
        assert_eq!(summary.rows, 3);
        let output = fs::read_to_string(path).expect("failed to read csv output");
        assert!(output.starts_with("id,name\n"));
        assert!(output.contains("2,\"quote \"\"name\"\"\""));
        assert_eq!(summary.bytes, output.len());
    }

    #[test]
    fn writes_json_objects_by_column() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("result.json");
        let request = build_export_request(&view(), ExportFormat::Json, &path, "results");

        write_export(&request).expect("json export failed");
        let output = fs::read_to_string(path).expect("failed to read json output");
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("invalid json");
        assert_eq!(parsed[0]["id"], 1);
        assert_eq!(parsed[2]["name"], serde_json::Value::Null);
    }

    #[test]
    fn spreadsheet_payloads_are_rejected() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("result.xlsx");
        let request = build_export_request(&view(), ExportFormat::Xlsx, &path, "results");

        let error = write_export(&request).expect_err("xlsx should be rejected");
        assert!(matches!(error, ExportError::UnsupportedFormat(ExportFormat::Xlsx)));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_destination_reports_path() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let request = build_export_request(&view(), ExportFormat::Sql, temp_dir.path(), "results");

        let error = write_export(&request).expect_err("directory is not a file");
        assert!(error.to_string().contains("failed to write export file"));
    }
}
