use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::{GridConfig, GridMetrics};
use crate::export::{build_export_request, copy_all, copy_selection, ExportFormat, ExportRequest};
use crate::filter::{ColumnFilter, FilterSet};
use crate::row_height::{DisplayMode, RowHeightEstimator};
use crate::selection::{
    aggregate, CellPosition, CellSelection, ClickTarget, SelectionAggregate, SelectionModel,
};
use crate::sort::{next_sort, SortSpec};
use crate::value::{Column, ResultSet, Row};
use crate::view::GridView;
use crate::virtualizer::RowSizer;
use crate::widths::ColumnWidths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridSignal {
    Validation(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel<'a> {
    Loading,
    Validation(&'a str),
    Error(&'a str),
    Empty,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStatus {
    pub visible_rows: usize,
    pub loaded_rows: usize,
    pub total_rows: usize,
    pub filtered_out: usize,
    pub has_more: bool,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct GridState {
    config: GridConfig,
    result: Arc<ResultSet>,
    filters: FilterSet,
    sort: Option<SortSpec>,
    hidden: BTreeSet<String>,
    widths: ColumnWidths,
    display: DisplayMode,
    selection: SelectionModel,
    view: GridView,
    aggregate: Option<SelectionAggregate>,
    layout_revision: u64,
    executing: bool,
    signal: Option<GridSignal>,
}

impl Default for GridState {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl GridState {
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        let display = config.display;
        Self {
            config,
            result: Arc::default(),
            filters: FilterSet::new(),
            sort: None,
            hidden: BTreeSet::new(),
            widths: ColumnWidths::default(),
            display,
            selection: SelectionModel::default(),
            view: GridView::default(),
            aggregate: None,
            layout_revision: 0,
            executing: false,
            signal: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &GridMetrics {
        &self.config.metrics
    }

    #[must_use]
    pub fn result(&self) -> &Arc<ResultSet> {
        &self.result
    }

    #[must_use]
    pub fn view(&self) -> &GridView {
        &self.view
    }

    #[must_use]
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    #[must_use]
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    #[must_use]
    pub fn hidden_columns(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    #[must_use]
    pub fn widths(&self) -> &ColumnWidths {
        &self.widths
    }

    #[must_use]
    pub fn display(&self) -> DisplayMode {
        self.display
    }

    #[must_use]
    pub fn selection(&self) -> Option<CellSelection> {
        self.selection.selection()
    }

    #[must_use]
    pub fn selection_model(&self) -> SelectionModel {
        self.selection
    }

    #[must_use]
    pub fn aggregate(&self) -> Option<SelectionAggregate> {
        self.aggregate
    }

    /// Changes whenever the row sequence or any row height input changes.
    #[must_use]
    pub fn layout_revision(&self) -> u64 {
        self.layout_revision
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    #[must_use]
    pub fn signal(&self) -> Option<&GridSignal> {
        self.signal.as_ref()
    }

    #[must_use]
    pub fn panel(&self) -> Panel<'_> {
        if self.executing {
            return Panel::Loading;
        }
        match &self.signal {
            Some(GridSignal::Validation(message)) => Panel::Validation(message),
            Some(GridSignal::Error(message)) => Panel::Error(message),
            None if self.result.columns.is_empty() => Panel::Empty,
            None => Panel::Grid,
        }
    }

    #[must_use]
    pub fn status(&self) -> GridStatus {
        GridStatus {
            visible_rows: self.view.visible_row_count(),
            loaded_rows: self.view.loaded_row_count(),
            total_rows: self.view.total_row_count(),
            filtered_out: self.view.filtered_out_count(),
            has_more: self.result.has_more,
            execution_time_ms: self.result.execution_time_ms,
        }
    }

    #[must_use]
    pub fn set_executing(mut self, executing: bool) -> Self {
        self.executing = executing;
        if executing {
            self.signal = None;
        }
        self
    }

    #[must_use]
    pub fn set_signal(mut self, signal: GridSignal) -> Self {
        debug!(?signal, "grid signal raised");
        self.executing = false;
        self.signal = Some(signal);
        self
    }

    #[must_use]
    pub fn clear_signal(mut self) -> Self {
        self.signal = None;
        self
    }

    #[must_use]
    pub fn replace_result(mut self, result: ResultSet) -> Self {
        debug!(
            columns = result.columns.len(),
            rows = result.rows.len(),
            "result replaced"
        );
        self.widths = ColumnWidths::compute(&result, &self.config.metrics);
        self.result = Arc::new(result);
        self.filters.clear();
        self.sort = None;
        self.hidden.clear();
        self.executing = false;
        self.signal = None;
        self.selection = SelectionModel::default();
        self.rebuild()
    }

    /// The selection survives an append only when no sort can move rows.
    #[must_use]
    pub fn append_rows(mut self, rows: Vec<Row>, row_count: Option<usize>, has_more: bool) -> Self {
        debug!(appended = rows.len(), has_more, "rows appended");
        self.view = GridView::default();
        Arc::make_mut(&mut self.result).append(rows, row_count, has_more);
        self.executing = false;
        if self.sort.is_some() {
            self.selection = SelectionModel::default();
        }
        self.rebuild()
    }

    #[must_use]
    pub fn apply_filter(mut self, filter: ColumnFilter) -> Self {
        debug!(%filter, "filter applied");
        self.filters.set(filter);
        self.selection = SelectionModel::default();
        self.rebuild()
    }

    #[must_use]
    pub fn remove_filter(mut self, column: &str) -> Self {
        if self.filters.remove(column).is_none() {
            return self;
        }
        debug!(column, "filter removed");
        self.selection = SelectionModel::default();
        self.rebuild()
    }

    #[must_use]
    pub fn clear_filters(mut self) -> Self {
        if self.filters.is_empty() {
            return self;
        }
        self.filters.clear();
        self.selection = SelectionModel::default();
        self.rebuild()
    }

    #[must_use]
    pub fn toggle_sort(self, column: &str) -> Self {
        let next = next_sort(self.sort.as_ref(), column);
        self.set_sort(next)
    }

    #[must_use]
    pub fn set_sort(mut self, sort: Option<SortSpec>) -> Self {
        debug!(?sort, "sort changed");
        self.sort = sort;
        self.selection = SelectionModel::default();
        self.rebuild()
    }

    #[must_use]
    pub fn clear_sort(self) -> Self {
        if self.sort.is_none() {
            return self;
        }
        self.set_sort(None)
    }

    #[must_use]
    pub fn hide_column(mut self, column: &str) -> Self {
        if self.result.column(column).is_none() || !self.hidden.insert(column.to_string()) {
            return self;
        }
        self.selection = SelectionModel::default();
        self.rebuild()
    }

    #[must_use]
    pub fn show_column(mut self, column: &str) -> Self {
        if !self.hidden.remove(column) {
            return self;
        }
        self.selection = SelectionModel::default();
        self.rebuild()
    }

    #[must_use]
    pub fn show_all_columns(mut self) -> Self {
        if self.hidden.is_empty() {
            return self;
        }
        self.hidden.clear();
        self.selection = SelectionModel::default();
        self.rebuild()
    }

    #[must_use]
    pub fn set_column_width(mut self, column: &str, width: f32) -> Self {
        self.widths
            .set_manual(column, width, &self.config.metrics);
        self.bump_layout()
    }

    #[must_use]
    pub fn auto_fit_column(mut self, column: &str) -> Self {
        let Some(target) = self.result.column(column).cloned() else {
            return self;
        };
        let width = self
            .widths
            .auto_fit(&target, &self.result.rows, &self.config.metrics);
        debug!(column, width, "column auto-fit");
        self.bump_layout()
    }

    #[must_use]
    pub fn set_display(mut self, display: DisplayMode) -> Self {
        if self.display == display {
            return self;
        }
        self.display = display;
        self.bump_layout()
    }

    #[must_use]
    pub fn toggle_wrap(self) -> Self {
        let display = DisplayMode {
            wrap_text: !self.display.wrap_text,
            ..self.display
        };
        self.set_display(display)
    }

    #[must_use]
    pub fn toggle_line_breaks(self) -> Self {
        let display = DisplayMode {
            show_line_breaks: !self.display.show_line_breaks,
            ..self.display
        };
        self.set_display(display)
    }

    #[must_use]
    pub fn mouse_down(self, cell: CellPosition, extend: bool) -> Self {
        if !self.contains_cell(cell) {
            return self;
        }
        let selection = self.selection.mouse_down(cell, extend);
        self.with_selection_model(selection)
    }

    #[must_use]
    pub fn mouse_move(self, cell: CellPosition) -> Self {
        if !self.contains_cell(cell) {
            return self;
        }
        let selection = self.selection.mouse_move(cell);
        self.with_selection_model(selection)
    }

    #[must_use]
    pub fn mouse_up(self) -> Self {
        let selection = self.selection.mouse_up();
        self.with_selection_model(selection)
    }

    #[must_use]
    pub fn click(self, target: ClickTarget) -> Self {
        let selection = self.selection.click(target);
        self.with_selection_model(selection)
    }

    #[must_use]
    pub fn select_cell(self, cell: CellPosition) -> Self {
        if !self.contains_cell(cell) {
            return self;
        }
        self.with_selection_model(SelectionModel::select(cell))
    }

    #[must_use]
    pub fn select_range(self, selection: CellSelection) -> Self {
        if !self.contains_cell(selection.anchor) || !self.contains_cell(selection.end) {
            return self;
        }
        self.with_selection_model(SelectionModel::with_selection(selection))
    }

    #[must_use]
    pub fn clear_selection(self) -> Self {
        self.with_selection_model(SelectionModel::default())
    }

    #[must_use]
    pub fn clipboard_text(&self) -> String {
        match self.selection.selection() {
            Some(selection) => copy_selection(&self.view, &selection),
            None => copy_all(&self.view),
        }
    }

    #[must_use]
    pub fn export_request(
        &self,
        format: ExportFormat,
        destination: impl Into<std::path::PathBuf>,
    ) -> ExportRequest {
        build_export_request(
            &self.view,
            format,
            destination,
            &self.config.export.table_name,
        )
    }

    #[must_use]
    pub fn row_sizer(&self) -> GridRowSizer<'_> {
        GridRowSizer {
            view: &self.view,
            columns: self.view.columns(),
            widths: &self.widths,
            display: self.display,
            metrics: &self.config.metrics,
        }
    }

    fn contains_cell(&self, cell: CellPosition) -> bool {
        cell.row < self.view.visible_row_count() && cell.column < self.view.visible_column_count()
    }

    fn with_selection_model(mut self, selection: SelectionModel) -> Self {
        self.selection = selection;
        self.aggregate = selection
            .selection()
            .map(|selection| aggregate(&self.view, &selection));
        self
    }

    fn bump_layout(mut self) -> Self {
        self.layout_revision = self.layout_revision.wrapping_add(1);
        self
    }

    fn rebuild(mut self) -> Self {
        self.view = GridView::build(
            Arc::clone(&self.result),
            &self.filters,
            self.sort.as_ref(),
            &self.hidden,
        );
        let selection = self.selection;
        self.with_selection_model(selection).bump_layout()
    }
}

#[derive(Debug, Clone)]
pub struct GridRowSizer<'a> {
    view: &'a GridView,
    columns: Vec<&'a Column>,
    widths: &'a ColumnWidths,
    display: DisplayMode,
    metrics: &'a GridMetrics,
}

impl GridRowSizer<'_> {
    fn estimator(&self) -> RowHeightEstimator<'_> {
        RowHeightEstimator::new(&self.columns, self.widths, self.display, self.metrics)
    }
}

impl RowSizer for GridRowSizer<'_> {
    fn fixed_height(&self) -> Option<f64> {
        self.display
            .is_fixed_height()
            .then(|| f64::from(self.metrics.row_height))
    }

    fn estimated_height(&self) -> f64 {
        f64::from(self.metrics.row_height)
    }

    fn measure(&self, index: usize) -> f64 {
        self.view.row(index).map_or(0.0, |row| {
            f64::from(self.estimator().row_height(row))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{GridSignal, GridState, Panel};
    use crate::config::GridConfig;
    use crate::filter::{ColumnFilter, FilterOperator};
    use crate::selection::{CellPosition, ClickTarget};
    use crate::sort::SortDirection;
    use crate::value::{CellValue, Column, ResultSet, Row};
    use crate::virtualizer::RowSizer;

    fn people() -> ResultSet {
        ResultSet::new(
            vec![Column::new("id", "int4"), Column::new("name", "text")],
            vec![
                Row::new().with("id", 1_i64).with("name", "Ann"),
                Row::new().with("id", 2_i64).with("name", CellValue::Null),
                Row::new().with("id", 3_i64).with("name", "Cy"),
            ],
        )
        .with_more(5)
    }

    fn loaded() -> GridState {
        GridState::new(GridConfig::default()).replace_result(people())
    }

    fn ids(state: &GridState) -> Vec<String> {
        state
            .view()
            .rows()
            .map(|row| crate::format::format_value(row.get("id")))
            .collect()
    }

    #[test]
    fn panels_follow_executing_signal_and_columns() {
        let state = GridState::default();
        assert_eq!(state.panel(), Panel::Empty);

        let state = state.set_executing(true);
        assert_eq!(state.panel(), Panel::Loading);

        let state = state.set_signal(GridSignal::Error("boom".to_string()));
        assert_eq!(state.panel(), Panel::Error("boom"));

        let state = state.replace_result(people());
        assert_eq!(state.panel(), Panel::Grid);
    }

    #[test]
    fn filter_sort_and_hide_clear_the_selection() {
        let selected = loaded().select_cell(CellPosition::new(0, 0));
        assert!(selected.selection().is_some());
        assert!(selected
            .clone()
            .apply_filter(ColumnFilter::unary("name", FilterOperator::IsNotNull))
            .selection()
            .is_none());
        assert!(selected.clone().toggle_sort("id").selection().is_none());
        assert!(selected.hide_column("name").selection().is_none());
    }

    #[test]
    fn sort_cycle_restores_fetch_order() {
        let state = loaded().toggle_sort("id").toggle_sort("id");
        assert_eq!(
            state.sort().map(|spec| spec.direction),
            Some(SortDirection::Descending)
        );
        assert_eq!(ids(&state), vec!["3", "2", "1"]);

        let state = state.toggle_sort("id");
        assert!(state.sort().is_none());
        assert_eq!(ids(&state), vec!["1", "2", "3"]);
    }

    #[test]
    fn status_counts_derive_from_the_view() {
        let state = loaded().apply_filter(ColumnFilter::new("id", FilterOperator::GreaterThan, "1"));
        let status = state.status();
        assert_eq!(status.visible_rows, 2);
        assert_eq!(status.loaded_rows, 3);
        assert_eq!(status.filtered_out, 1);
        assert_eq!(status.total_rows, 5);
        assert!(status.has_more);
    }

    #[test]
    fn append_keeps_filters_and_unsorted_selection() {
        let state = loaded()
            .apply_filter(ColumnFilter::unary("name", FilterOperator::IsNotNull))
            .select_cell(CellPosition::new(1, 1));
        let revision = state.layout_revision();

        let state = state.append_rows(
            vec![
                Row::new().with("id", 4_i64).with("name", "Di"),
                Row::new().with("id", 5_i64),
            ],
            Some(5),
            false,
        );
        assert_eq!(ids(&state), vec!["1", "3", "4"]);
        assert!(state.selection().is_some());
        assert!(!state.status().has_more);
        assert_ne!(state.layout_revision(), revision);
    }

    #[test]
    fn new_result_resets_every_piece_of_derived_state() {
        let state = loaded()
            .apply_filter(ColumnFilter::new("id", FilterOperator::GreaterThan, "1"))
            .toggle_sort("id")
            .hide_column("name")
            .set_column_width("id", 300.0)
            .select_cell(CellPosition::new(0, 0));
        assert_eq!(state.filters().len(), 1);
        assert!(state.sort().is_some());
        assert!(state.hidden_columns().contains("name"));
        assert!(state.widths().has_override("id"));
        assert!(state.selection().is_some());
        assert!(state.aggregate().is_some());

        let state = state.replace_result(people());
        assert!(state.filters().is_empty());
        assert!(state.sort().is_none());
        assert!(state.hidden_columns().is_empty());
        assert!(!state.widths().has_override("id"));
        assert!(state.selection().is_none());
        assert!(state.aggregate().is_none());
        assert_eq!(ids(&state), vec!["1", "2", "3"]);
        assert_eq!(state.view().visible_column_count(), 2);
    }

    #[test]
    fn append_under_active_sort_clears_the_selection() {
        let state = loaded()
            .toggle_sort("id")
            .toggle_sort("id")
            .select_cell(CellPosition::new(0, 0));
        assert!(state.selection().is_some());

        let state = state.append_rows(
            vec![Row::new().with("id", 9_i64).with("name", "Ed")],
            Some(5),
            true,
        );
        assert!(state.selection().is_none());
        assert!(state.aggregate().is_none());
        assert_eq!(ids(&state), vec!["9", "3", "2", "1"]);
        assert_eq!(
            state.sort().map(|spec| spec.direction),
            Some(SortDirection::Descending)
        );
    }

    #[test]
    fn drag_then_click_keeps_selection_and_aggregates() {
        let state = loaded()
            .mouse_down(CellPosition::new(0, 0), false)
            .mouse_move(CellPosition::new(2, 1))
            .mouse_up()
            .click(ClickTarget::Chrome);

        let summary = state.aggregate().expect("aggregate for selection");
        assert_eq!(summary.count, 5);
        assert_eq!(summary.numeric.map(|numeric| numeric.count), Some(3));

        let state = state.click(ClickTarget::Chrome);
        assert!(state.selection().is_none());
        assert!(state.aggregate().is_none());
    }

    #[test]
    fn clipboard_prefers_selection_then_everything() {
        let state = loaded();
        assert_eq!(state.clipboard_text(), "id\tname\n1\tAnn\n2\tNULL\n3\tCy");
        let state = state.select_cell(CellPosition::new(1, 1));
        assert_eq!(state.clipboard_text(), "NULL");
    }

    #[test]
    fn out_of_range_cells_are_ignored() {
        let state = loaded().select_cell(CellPosition::new(10, 0));
        assert!(state.selection().is_none());
    }

    #[test]
    fn wrap_toggle_switches_between_fixed_and_measured_heights() {
        let state = loaded();
        assert!(state.row_sizer().fixed_height().is_some());
        let wrapped = state.toggle_wrap();
        assert!(wrapped.row_sizer().fixed_height().is_none());
        assert!(wrapped.row_sizer().measure(0) >= f64::from(wrapped.metrics().row_height));
    }
}
