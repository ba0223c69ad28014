use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gridlens_core::source::{ResultSource, RowPage, SourceError};
use gridlens_core::{Column, ResultSet, Row};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum JsonSourceError {
    #[error("failed to read result file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode result file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A query result as the fetch command emits it. Field names are accepted in
/// snake_case or camelCase.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultDocument {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
    #[serde(default, alias = "rowCount")]
    pub row_count: Option<usize>,
    #[serde(default, alias = "executionTimeMs")]
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SourceDocument {
    Result(ResultDocument),
    Rows(Vec<Map<String, Value>>),
}

impl SourceDocument {
    fn into_result_document(self) -> ResultDocument {
        match self {
            Self::Result(document) => document,
            Self::Rows(rows) => ResultDocument {
                columns: infer_columns(&rows),
                rows,
                row_count: None,
                execution_time_ms: 0,
            },
        }
    }
}

/// Column order follows first appearance across rows.
fn infer_columns(rows: &[Map<String, Value>]) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();
    for row in rows {
        for (name, value) in row {
            if columns.iter().any(|column| &column.name == name) {
                continue;
            }
            columns.push(Column::new(name.clone(), json_type_name(value)));
        }
    }
    columns
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Number(number) if number.is_f64() => "float8",
        Value::Number(_) => "int8",
        Value::Bool(_) => "bool",
        Value::Array(_) | Value::Object(_) => "jsonb",
        Value::Null | Value::String(_) => "text",
    }
}

/// Serves a result file page by page, the way a paged fetch command would.
#[derive(Debug, Clone)]
pub struct JsonResultSource {
    path: PathBuf,
    columns: Vec<Column>,
    rows: Vec<Row>,
    execution_time_ms: u64,
}

impl JsonResultSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JsonSourceError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| JsonSourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(path, &raw)
    }

    pub fn from_json_str(path: impl Into<PathBuf>, raw: &str) -> Result<Self, JsonSourceError> {
        let path = path.into();
        let document: SourceDocument =
            serde_json::from_str(raw).map_err(|source| JsonSourceError::Decode {
                path: path.clone(),
                source,
            })?;
        Ok(Self::from_document(path, document.into_result_document()))
    }

    #[must_use]
    pub fn from_document(path: impl Into<PathBuf>, document: ResultDocument) -> Self {
        Self {
            path: path.into(),
            columns: document.columns,
            rows: document.rows.into_iter().map(Row::from_json_object).collect(),
            execution_time_ms: document.execution_time_ms,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    fn page(&self, offset: usize, limit: usize) -> &[Row] {
        let start = offset.min(self.rows.len());
        let end = offset.saturating_add(limit).min(self.rows.len());
        &self.rows[start..end]
    }
}

#[async_trait]
impl ResultSource for JsonResultSource {
    async fn fetch_initial(&self, limit: usize) -> Result<ResultSet, SourceError> {
        let rows = self.page(0, limit).to_vec();
        debug!(path = %self.path.display(), rows = rows.len(), "initial page served");

        let mut result = ResultSet::new(self.columns.clone(), rows);
        if result.rows.len() < self.rows.len() {
            result = result.with_more(self.rows.len());
        }
        result.execution_time_ms = self.execution_time_ms;
        Ok(result)
    }

    async fn fetch_more(&self, offset: usize, limit: usize) -> Result<RowPage, SourceError> {
        let rows = self.page(offset, limit).to_vec();
        let end = offset.saturating_add(rows.len());
        debug!(offset, rows = rows.len(), "next page served");
        Ok(RowPage {
            rows,
            row_count: Some(self.rows.len()),
            has_more: end < self.rows.len(),
        })
    }
}
