use std::collections::BTreeSet;
use std::sync::Arc;

use crate::filter::{filter_rows, FilterSet};
use crate::sort::{sort_indices, SortSpec};
use crate::value::{CellValue, Column, ResultSet, Row};

/// The resolved filter -> sort -> visible-column pipeline over a shared
/// result set. Row positions index `row_order`, which holds source indices.
#[derive(Debug, Clone, Default)]
pub struct GridView {
    result: Arc<ResultSet>,
    row_order: Vec<usize>,
    visible_columns: Vec<usize>,
}

impl GridView {
    #[must_use]
    pub fn build(
        result: Arc<ResultSet>,
        filters: &FilterSet,
        sort: Option<&SortSpec>,
        hidden: &BTreeSet<String>,
    ) -> Self {
        let mut row_order = filter_rows(&result.rows, filters);
        if let Some(spec) = sort {
            sort_indices(&result.rows, &mut row_order, spec);
        }

        let visible_columns = result
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !hidden.contains(&column.name))
            .map(|(index, _)| index)
            .collect();

        Self {
            result,
            row_order,
            visible_columns,
        }
    }

    #[must_use]
    pub fn result(&self) -> &Arc<ResultSet> {
        &self.result
    }

    /// Post-filter, post-sort row count. Every count shown to the user
    /// derives from this value.
    #[must_use]
    pub fn visible_row_count(&self) -> usize {
        self.row_order.len()
    }

    #[must_use]
    pub fn loaded_row_count(&self) -> usize {
        self.result.rows.len()
    }

    #[must_use]
    pub fn total_row_count(&self) -> usize {
        self.result.row_count.max(self.loaded_row_count())
    }

    #[must_use]
    pub fn filtered_out_count(&self) -> usize {
        self.loaded_row_count() - self.visible_row_count()
    }

    #[must_use]
    pub fn row_order(&self) -> &[usize] {
        &self.row_order
    }

    #[must_use]
    pub fn source_index(&self, position: usize) -> Option<usize> {
        self.row_order.get(position).copied()
    }

    #[must_use]
    pub fn row(&self, position: usize) -> Option<&Row> {
        self.source_index(position)
            .and_then(|index| self.result.rows.get(index))
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.row_order
            .iter()
            .filter_map(|&index| self.result.rows.get(index))
    }

    #[must_use]
    pub fn visible_column_count(&self) -> usize {
        self.visible_columns.len()
    }

    #[must_use]
    pub fn column(&self, position: usize) -> Option<&Column> {
        self.visible_columns
            .get(position)
            .and_then(|&index| self.result.columns.get(index))
    }

    #[must_use]
    pub fn columns(&self) -> Vec<&Column> {
        self.visible_columns
            .iter()
            .filter_map(|&index| self.result.columns.get(index))
            .collect()
    }

    #[must_use]
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.visible_columns.iter().position(|&index| {
            self.result
                .columns
                .get(index)
                .is_some_and(|column| column.name == name)
        })
    }

    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        let column = self.column(column)?;
        self.row(row).map(|row| row.get(&column.name))
    }
}
