use std::collections::HashMap;

use crate::config::GridMetrics;
use crate::format::{format_value, longest_line_chars};
use crate::value::{Column, ResultSet, Row};

/// Initial width from the header and the first `sample_rows` rows only, so
/// initial layout stays O(sample * columns) regardless of the row count.
#[must_use]
pub fn sampled_column_width(column: &Column, rows: &[Row], metrics: &GridMetrics) -> f32 {
    let content_chars = rows
        .iter()
        .take(metrics.sample_rows)
        .map(|row| longest_line_chars(&format_value(row.get(&column.name))))
        .max()
        .unwrap_or(0);

    measured_width(column, content_chars, metrics).clamp(
        metrics.min_column_width,
        metrics.max_sample_width.max(metrics.min_column_width),
    )
}

/// Exact width over every row. O(rows); only run on explicit request.
#[must_use]
pub fn autofit_column_width(column: &Column, rows: &[Row], metrics: &GridMetrics) -> f32 {
    let content_chars = rows
        .iter()
        .map(|row| longest_line_chars(&format_value(row.get(&column.name))))
        .max()
        .unwrap_or(0);

    measured_width(column, content_chars, metrics).clamp(
        metrics.min_column_width,
        metrics.max_autofit_width.max(metrics.min_column_width),
    )
}

fn measured_width(column: &Column, content_chars: usize, metrics: &GridMetrics) -> f32 {
    let header_chars = column.name.chars().count();
    metrics.text_width(header_chars.max(content_chars))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnWidths {
    computed: HashMap<String, f32>,
    overrides: HashMap<String, f32>,
    fallback: f32,
}

impl ColumnWidths {
    #[must_use]
    pub fn compute(result: &ResultSet, metrics: &GridMetrics) -> Self {
        let computed = result
            .columns
            .iter()
            .map(|column| {
                (
                    column.name.clone(),
                    sampled_column_width(column, &result.rows, metrics),
                )
            })
            .collect();

        Self {
            computed,
            overrides: HashMap::new(),
            fallback: metrics.min_column_width,
        }
    }

    #[must_use]
    pub fn width(&self, column: &str) -> f32 {
        self.overrides
            .get(column)
            .or_else(|| self.computed.get(column))
            .copied()
            .unwrap_or(self.fallback)
    }

    #[must_use]
    pub fn has_override(&self, column: &str) -> bool {
        self.overrides.contains_key(column)
    }

    #[must_use]
    pub fn overrides(&self) -> &HashMap<String, f32> {
        &self.overrides
    }

    /// Manual widths are floored at the minimum but have no ceiling.
    pub fn set_manual(&mut self, column: impl Into<String>, width: f32, metrics: &GridMetrics) {
        let width = if width.is_finite() {
            width.max(metrics.min_column_width)
        } else {
            metrics.min_column_width
        };
        self.overrides.insert(column.into(), width);
    }

    pub fn auto_fit(&mut self, column: &Column, rows: &[Row], metrics: &GridMetrics) -> f32 {
        let width = autofit_column_width(column, rows, metrics);
        self.overrides.insert(column.name.clone(), width);
        width
    }
}

#[cfg(test)]
mod tests {
    use super::{autofit_column_width, sampled_column_width, ColumnWidths};
    use crate::config::GridMetrics;
    use crate::value::{Column, ResultSet, Row};

    fn text_rows(values: &[&str]) -> Vec<Row> {
        values
            .iter()
            .map(|value| Row::new().with("note", *value))
            .collect()
    }

    #[test]
    fn short_content_is_clamped_to_minimum() {
        let metrics = GridMetrics::default();
        let width = sampled_column_width(&Column::new("a", "text"), &text_rows(&["x"]), &metrics);
        assert!((width - metrics.min_column_width).abs() < f32::EPSILON);
    }

    #[test]
    fn header_width_wins_over_narrow_content() {
        let metrics = GridMetrics::default();
        let column = Column::new("a_rather_long_header", "text");
        let width = sampled_column_width(&column, &[Row::new().with("a_rather_long_header", "1")], &metrics);
        assert!((width - metrics.text_width(20)).abs() < f32::EPSILON);
    }

    #[test]
    fn multi_line_content_uses_longest_line() {
        let metrics = GridMetrics::default();
        let rows = text_rows(&["short\nthe longest line here\nmid"]);
        let width = sampled_column_width(&Column::new("note", "text"), &rows, &metrics);
        assert!((width - metrics.text_width(21)).abs() < f32::EPSILON);
    }

    #[test]
    fn sampling_only_reads_leading_rows() {
        let metrics = GridMetrics {
            sample_rows: 2,
            ..GridMetrics::default()
        };
        let long = "x".repeat(30);
        let rows = text_rows(&["a", "b", &long]);
        let column = Column::new("note", "text");

        let sampled = sampled_column_width(&column, &rows, &metrics);
        let exact = autofit_column_width(&column, &rows, &metrics);
        assert!((sampled - metrics.min_column_width).abs() < f32::EPSILON);
        assert!((exact - metrics.text_width(30)).abs() < f32::EPSILON);
    }

    #[test]
    fn autofit_ceiling_exceeds_sampled_ceiling() {
        let metrics = GridMetrics::default();
        let huge = "y".repeat(500);
        let rows = text_rows(&[&huge]);
        let column = Column::new("note", "text");

        assert!((sampled_column_width(&column, &rows, &metrics) - metrics.max_sample_width).abs() < f32::EPSILON);
        assert!((autofit_column_width(&column, &rows, &metrics) - metrics.max_autofit_width).abs() < f32::EPSILON);
    }

    #[test]
    fn manual_override_has_floor_but_no_ceiling() {
        let metrics = GridMetrics::default();
        let result = ResultSet::new(vec![Column::new("note", "text")], text_rows(&["abc"]));
        let mut widths = ColumnWidths::compute(&result, &metrics);

        widths.set_manual("note", 5_000.0, &metrics);
        assert!((widths.width("note") - 5_000.0).abs() < f32::EPSILON);

        widths.set_manual("note", 1.0, &metrics);
        assert!((widths.width("note") - metrics.min_column_width).abs() < f32::EPSILON);
        assert!(widths.has_override("note"));
        assert!((widths.width("unknown") - metrics.min_column_width).abs() < f32::EPSILON);
    }
}
