use crate::value::CellValue;

pub const NULL_DISPLAY: &str = "NULL";
pub const LINE_BREAK_MARKER: char = '↵';
pub const FORMAT_FAULT_PLACEHOLDER: &str = "#ERR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Null,
    Number,
    Boolean,
    Other,
}

#[must_use]
pub fn classify(value: &CellValue) -> CellKind {
    match value {
        CellValue::Null | CellValue::Undefined => CellKind::Null,
        CellValue::Number(_) => CellKind::Number,
        CellValue::Bool(_) => CellKind::Boolean,
        CellValue::Text(_) | CellValue::Structured(_) => CellKind::Other,
    }
}

/// Never fails: a structured value that cannot be encoded renders as
/// [`FORMAT_FAULT_PLACEHOLDER`].
#[must_use]
pub fn format_value(value: &CellValue) -> String {
    match value {
        CellValue::Null => NULL_DISPLAY.to_string(),
        CellValue::Undefined => String::new(),
        CellValue::Bool(flag) => flag.to_string(),
        CellValue::Number(number) => number.to_string(),
        CellValue::Text(text) => text.clone(),
        CellValue::Structured(structured) => serde_json::to_string(structured)
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "structured cell could not be encoded");
                FORMAT_FAULT_PLACEHOLDER.to_string()
            }),
    }
}

#[must_use]
pub fn display_value(value: &CellValue, show_line_breaks: bool) -> String {
    let formatted = format_value(value);
    if show_line_breaks {
        formatted
    } else {
        mark_line_breaks(&formatted)
    }
}

#[must_use]
pub fn mark_line_breaks(text: &str) -> String {
    if !text.contains(['\n', '\r']) {
        return text.to_string();
    }

    let marker = format!("{LINE_BREAK_MARKER} ");
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', &marker)
}

#[must_use]
pub fn longest_line_chars(text: &str) -> usize {
    text.lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
}
