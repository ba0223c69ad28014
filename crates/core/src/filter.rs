use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::format_value;
use crate::value::{CellValue, Column, Row};

const NUMERIC_TYPES: [&str; 19] = [
    "int", "int2", "int4", "int8", "smallint", "integer", "bigint", "serial", "serial2", "serial4",
    "serial8", "bigserial", "smallserial", "real", "double precision", "numeric", "decimal",
    "money", "oid",
];
const NUMERIC_PREFIXES: [&str; 4] = ["int", "float", "numeric", "decimal"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    Numeric,
    Boolean,
    Text,
}

impl TypeFamily {
    /// Unrecognized and array types fall back to text.
    #[must_use]
    pub fn classify(data_type: &str) -> Self {
        let normalized = data_type.trim().to_ascii_lowercase();
        if normalized.starts_with('_') || normalized.ends_with("[]") {
            return Self::Text;
        }
        if matches!(normalized.as_str(), "bool" | "boolean") {
            return Self::Boolean;
        }

        let base = normalized
            .split_once('(')
            .map_or(normalized.as_str(), |(base, _)| base)
            .trim();
        if NUMERIC_TYPES.contains(&base)
            || NUMERIC_PREFIXES
                .iter()
                .any(|prefix| base.starts_with(prefix) && !base.starts_with("interval"))
        {
            return Self::Numeric;
        }
        Self::Text
    }

    #[must_use]
    pub fn operators(self) -> &'static [FilterOperator] {
        match self {
            Self::Numeric => &[
                FilterOperator::Equals,
                FilterOperator::NotEquals,
                FilterOperator::GreaterThan,
                FilterOperator::LessThan,
                FilterOperator::GreaterOrEqual,
                FilterOperator::LessOrEqual,
                FilterOperator::Between,
                FilterOperator::IsNull,
                FilterOperator::IsNotNull,
            ],
            Self::Boolean => &[
                FilterOperator::IsTrue,
                FilterOperator::IsFalse,
                FilterOperator::IsNull,
                FilterOperator::IsNotNull,
            ],
            Self::Text => &[
                FilterOperator::Contains,
                FilterOperator::TextEquals,
                FilterOperator::StartsWith,
                FilterOperator::EndsWith,
                FilterOperator::IsNull,
                FilterOperator::IsNotNull,
            ],
        }
    }

    #[must_use]
    pub fn supports(self, operator: FilterOperator) -> bool {
        self.operators().contains(&operator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Between,
    IsTrue,
    IsFalse,
    Contains,
    TextEquals,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Between => "between",
            Self::IsTrue => "is true",
            Self::IsFalse => "is false",
            Self::Contains => "contains",
            Self::TextEquals => "equals",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
        }
    }

    #[must_use]
    pub fn takes_value(self) -> bool {
        !matches!(
            self,
            Self::IsTrue | Self::IsFalse | Self::IsNull | Self::IsNotNull
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("filter expression is empty")]
    Empty,
    #[error("unknown filter operator in `{0}`")]
    UnknownOperator(String),
    #[error("operator `{operator}` is not available for {family:?} column `{column}`")]
    UnsupportedOperator {
        column: String,
        operator: FilterOperator,
        family: TypeFamily,
    },
    #[error("operator `{0}` requires a value")]
    MissingValue(FilterOperator),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
    #[serde(default)]
    pub value2: Option<String>,
}

impl ColumnFilter {
    #[must_use]
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            value2: None,
        }
    }

    #[must_use]
    pub fn unary(column: impl Into<String>, operator: FilterOperator) -> Self {
        Self::new(column, operator, String::new())
    }

    #[must_use]
    pub fn between(column: impl Into<String>, low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            value2: Some(high.into()),
            ..Self::new(column, FilterOperator::Between, low)
        }
    }

    /// Parses expressions such as `contains foo`, `>= 3`, `between 1 and 10`
    /// or `is null`, validating the operator against the column's family.
    /// A bare word on a text column is shorthand for `contains`.
    pub fn parse(column: &Column, expression: &str) -> Result<Self, FilterParseError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(FilterParseError::Empty);
        }

        let family = TypeFamily::classify(&column.data_type);
        let lowered = trimmed.to_lowercase();
        let (operator, rest) = split_operator(&lowered, trimmed, family)
            .ok_or_else(|| FilterParseError::UnknownOperator(trimmed.to_string()))?;

        if !family.supports(operator) {
            return Err(FilterParseError::UnsupportedOperator {
                column: column.name.clone(),
                operator,
                family,
            });
        }

        if !operator.takes_value() {
            return Ok(Self::unary(column.name.clone(), operator));
        }

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(FilterParseError::MissingValue(operator));
        }

        if operator == FilterOperator::Between {
            let mut bounds = rest
                .split_whitespace()
                .filter(|token| !token.eq_ignore_ascii_case("and"));
            let low = bounds.next().ok_or(FilterParseError::MissingValue(operator))?;
            let high = bounds.next().ok_or(FilterParseError::MissingValue(operator))?;
            return Ok(Self::between(column.name.clone(), low, high));
        }

        Ok(Self::new(column.name.clone(), operator, rest))
    }

    /// Total over every value: unparsable operands make the predicate false.
    #[must_use]
    pub fn matches(&self, value: &CellValue) -> bool {
        match self.operator {
            FilterOperator::IsNull => value.is_absent(),
            FilterOperator::IsNotNull => !value.is_absent(),
            FilterOperator::IsTrue => boolean_value(value) == Some(true),
            FilterOperator::IsFalse => boolean_value(value) == Some(false),
            FilterOperator::Equals => self.compare_numeric(value, |cell, operand| cell == operand),
            FilterOperator::NotEquals => {
                self.compare_numeric(value, |cell, operand| cell != operand)
            }
            FilterOperator::GreaterThan => self.compare_numeric(value, |cell, operand| cell > operand),
            FilterOperator::LessThan => self.compare_numeric(value, |cell, operand| cell < operand),
            FilterOperator::GreaterOrEqual => {
                self.compare_numeric(value, |cell, operand| cell >= operand)
            }
            FilterOperator::LessOrEqual => {
                self.compare_numeric(value, |cell, operand| cell <= operand)
            }
            FilterOperator::Between => {
                let (Some(cell), Some(low), Some(high)) = (
                    parse_number(&format_value(value)),
                    parse_number(&self.value),
                    self.value2.as_deref().and_then(parse_number),
                ) else {
                    return false;
                };
                cell >= low && cell <= high
            }
            FilterOperator::Contains => {
                let needle = self.value.to_lowercase();
                format_value(value).to_lowercase().contains(&needle)
            }
            FilterOperator::TextEquals => {
                format_value(value).to_lowercase() == self.value.to_lowercase()
            }
            FilterOperator::StartsWith => {
                let needle = self.value.to_lowercase();
                format_value(value).to_lowercase().starts_with(&needle)
            }
            FilterOperator::EndsWith => {
                let needle = self.value.to_lowercase();
                format_value(value).to_lowercase().ends_with(&needle)
            }
        }
    }

    fn compare_numeric(&self, value: &CellValue, predicate: impl Fn(f64, f64) -> bool) -> bool {
        match (parse_number(&format_value(value)), parse_number(&self.value)) {
            (Some(cell), Some(operand)) => predicate(cell, operand),
            _ => false,
        }
    }
}

impl fmt::Display for ColumnFilter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.operator, &self.value2) {
            (FilterOperator::Between, Some(high)) => {
                write!(formatter, "{} between {} and {high}", self.column, self.value)
            }
            (operator, _) if !operator.takes_value() => {
                write!(formatter, "{} {operator}", self.column)
            }
            (operator, _) => write!(formatter, "{} {operator} {}", self.column, self.value),
        }
    }
}

fn split_operator<'a>(
    lowered: &str,
    original: &'a str,
    family: TypeFamily,
) -> Option<(FilterOperator, &'a str)> {
    const KEYWORDS: [(&str, FilterOperator); 15] = [
        ("is not null", FilterOperator::IsNotNull),
        ("is null", FilterOperator::IsNull),
        ("is true", FilterOperator::IsTrue),
        ("is false", FilterOperator::IsFalse),
        ("between ", FilterOperator::Between),
        ("contains ", FilterOperator::Contains),
        ("equals ", FilterOperator::TextEquals),
        ("starts with ", FilterOperator::StartsWith),
        ("ends with ", FilterOperator::EndsWith),
        (">=", FilterOperator::GreaterOrEqual),
        ("<=", FilterOperator::LessOrEqual),
        ("!=", FilterOperator::NotEquals),
        ("<>", FilterOperator::NotEquals),
        (">", FilterOperator::GreaterThan),
        ("<", FilterOperator::LessThan),
    ];

    for (keyword, operator) in KEYWORDS {
        if lowered.starts_with(keyword) {
            return Some((operator, original.get(keyword.len()..).unwrap_or_default()));
        }
    }

    if let Some(rest) = original.strip_prefix('=') {
        let operator = if family == TypeFamily::Text {
            FilterOperator::TextEquals
        } else {
            FilterOperator::Equals
        };
        return Some((operator, rest));
    }

    (family == TypeFamily::Text).then_some((FilterOperator::Contains, original))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|number| !number.is_nan())
}

fn boolean_value(value: &CellValue) -> Option<bool> {
    match value {
        CellValue::Bool(flag) => Some(*flag),
        CellValue::Text(text) if text.eq_ignore_ascii_case("true") => Some(true),
        CellValue::Text(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// At most one filter per column; the active set is their conjunction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    filters: BTreeMap<String, ColumnFilter>,
}

impl FilterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, filter: ColumnFilter) -> Option<ColumnFilter> {
        self.filters.insert(filter.column.clone(), filter)
    }

    pub fn remove(&mut self, column: &str) -> Option<ColumnFilter> {
        self.filters.remove(column)
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&ColumnFilter> {
        self.filters.get(column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnFilter> {
        self.filters.values()
    }

    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .values()
            .all(|filter| filter.matches(row.get(&filter.column)))
    }
}

/// Source indices of the rows passing every filter, in fetch order.
#[must_use]
pub fn filter_rows(rows: &[Row], filters: &FilterSet) -> Vec<usize> {
    if filters.is_empty() {
        return (0..rows.len()).collect();
    }

    rows.iter()
        .enumerate()
        .filter(|(_, row)| filters.matches(row))
        .map(|(index, _)| index)
        .collect()
}
