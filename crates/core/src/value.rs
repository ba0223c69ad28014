use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

static UNDEFINED: CellValue = CellValue::Undefined;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Undefined,
    Bool(bool),
    Number(Number),
    Text(String),
    Structured(Value),
}

impl CellValue {
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::Text(text),
            structured @ (Value::Array(_) | Value::Object(_)) => Self::Structured(structured),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null | Self::Undefined => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Number(number) => Value::Number(number.clone()),
            Self::Text(text) => Value::String(text.clone()),
            Self::Structured(value) => value.clone(),
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => number.as_f64(),
            _ => None,
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl From<bool> for CellValue {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<i64> for CellValue {
    fn from(number: i64) -> Self {
        Self::Number(number.into())
    }
}

impl From<f64> for CellValue {
    fn from(number: f64) -> Self {
        Number::from_f64(number).map_or_else(|| Self::Text(number.to_string()), Self::Number)
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    #[serde(alias = "dataType")]
    pub data_type: String,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, CellValue>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn from_json_object(object: Map<String, Value>) -> Self {
        Self {
            values: object
                .into_iter()
                .map(|(column, value)| (column, CellValue::from_json(value)))
                .collect(),
        }
    }

    /// Missing keys read as [`CellValue::Undefined`].
    #[must_use]
    pub fn get(&self, column: &str) -> &CellValue {
        self.values.get(column).unwrap_or(&UNDEFINED)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub has_more: bool,
    pub execution_time_ms: u64,
}

impl ResultSet {
    #[must_use]
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            has_more: false,
            execution_time_ms: 0,
        }
    }

    #[must_use]
    pub fn with_more(mut self, row_count: usize) -> Self {
        self.row_count = row_count.max(self.rows.len());
        self.has_more = true;
        self
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn append(&mut self, rows: Vec<Row>, row_count: Option<usize>, has_more: bool) {
        self.rows.extend(rows);
        self.row_count = row_count.unwrap_or(0).max(self.rows.len());
        self.has_more = has_more;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CellValue, Column, ResultSet, Row};

    #[test]
    fn json_values_map_onto_closed_variants() {
        assert_eq!(CellValue::from_json(json!(null)), CellValue::Null);
        assert_eq!(CellValue::from_json(json!(true)), CellValue::Bool(true));
        assert_eq!(CellValue::from_json(json!("x")), CellValue::Text("x".into()));
        assert!(matches!(
            CellValue::from_json(json!({"a": 1})),
            CellValue::Structured(_)
        ));
        assert!(matches!(
            CellValue::from_json(json!([1, 2])),
            CellValue::Structured(_)
        ));
        assert_eq!(CellValue::from_json(json!(4)).as_f64(), Some(4.0));
    }

    #[test]
    fn missing_row_keys_read_as_undefined() {
        let row = Row::new().with("id", 1_i64);
        assert_eq!(row.get("id"), &CellValue::from(1_i64));
        assert_eq!(row.get("name"), &CellValue::Undefined);
        assert!(row.get("name").is_absent());
    }

    #[test]
    fn non_finite_floats_fall_back_to_text() {
        assert_eq!(CellValue::from(f64::NAN), CellValue::Text("NaN".into()));
    }

    #[test]
    fn append_extends_rows_and_tracks_more_flag() {
        let mut result = ResultSet::new(
            vec![Column::new("id", "int4")],
            vec![Row::new().with("id", 1_i64)],
        )
        .with_more(3);
        assert_eq!(result.row_count, 3);
        assert!(result.has_more);

        result.append(vec![Row::new().with("id", 2_i64)], None, false);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.row_count, 2);
        assert!(!result.has_more);
        assert_eq!(result.column_index("id"), Some(0));
    }

    #[test]
    fn columns_accept_camel_case_data_type() {
        let column: Column =
            serde_json::from_value(json!({"name": "id", "dataType": "int4"})).expect("column");
        assert_eq!(column, Column::new("id", "int4"));
    }
}
