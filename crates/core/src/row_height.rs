use serde::{Deserialize, Serialize};

use crate::config::GridMetrics;
use crate::format::{format_value, mark_line_breaks};
use crate::value::{Column, Row};
use crate::widths::ColumnWidths;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayMode {
    pub wrap_text: bool,
    pub show_line_breaks: bool,
}

impl DisplayMode {
    #[must_use]
    pub fn is_fixed_height(self) -> bool {
        !self.wrap_text && !self.show_line_breaks
    }
}

/// Rendered line count for one cell. Hard breaks count only when line
/// breaks are shown; soft wrapping subdivides each logical line.
#[must_use]
pub fn cell_line_count(text: &str, chars_per_line: usize, mode: DisplayMode) -> usize {
    let chars_per_line = chars_per_line.max(1);
    let wrapped = |line: &str| {
        if mode.wrap_text {
            line.chars().count().div_ceil(chars_per_line).max(1)
        } else {
            1
        }
    };

    if mode.show_line_breaks {
        text.split('\n')
            .map(|line| wrapped(line.strip_suffix('\r').unwrap_or(line)))
            .sum()
    } else {
        wrapped(&mark_line_breaks(text))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowHeightEstimator<'a> {
    columns: &'a [&'a Column],
    widths: &'a ColumnWidths,
    mode: DisplayMode,
    metrics: &'a GridMetrics,
}

impl<'a> RowHeightEstimator<'a> {
    #[must_use]
    pub fn new(
        columns: &'a [&'a Column],
        widths: &'a ColumnWidths,
        mode: DisplayMode,
        metrics: &'a GridMetrics,
    ) -> Self {
        Self {
            columns,
            widths,
            mode,
            metrics,
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.mode.is_fixed_height()
    }

    #[must_use]
    pub fn fixed_height(&self) -> f32 {
        self.metrics.row_height
    }

    #[must_use]
    pub fn row_height(&self, row: &Row) -> f32 {
        if self.is_fixed() {
            return self.metrics.row_height;
        }

        let max_lines = self
            .columns
            .iter()
            .map(|column| {
                let chars_per_line = self
                    .metrics
                    .chars_per_line(self.widths.width(&column.name));
                cell_line_count(&format_value(row.get(&column.name)), chars_per_line, self.mode)
            })
            .max()
            .unwrap_or(1);

        let extra_lines = max_lines.saturating_sub(1) as f32;
        (self.metrics.row_height + extra_lines * self.metrics.line_height)
            .min(self.metrics.max_row_height.max(self.metrics.row_height))
    }
}
