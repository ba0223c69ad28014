use std::collections::HashMap;

use thiserror::Error;

use crate::export::ExportFormat;
use crate::state::GridState;

const MAX_RECENCY_BOOST: i32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionId {
    CopySelection,
    CopyAll,
    ExportCsv,
    ExportTsv,
    ExportJson,
    ExportJsonLines,
    ExportSql,
    ExportMarkdown,
    ExportXlsx,
    ToggleWrap,
    ToggleLineBreaks,
    ClearFilters,
    ClearSort,
    ClearSelection,
    AutoFitColumn,
    ShowAllColumns,
    LoadMore,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionContext {
    pub has_results: bool,
    pub has_selection: bool,
    pub has_filters: bool,
    pub has_sort: bool,
    pub has_hidden_columns: bool,
    pub has_more: bool,
    pub executing: bool,
    pub wrap_text: bool,
    pub show_line_breaks: bool,
    pub focused_column: Option<String>,
}

impl ActionContext {
    #[must_use]
    pub fn from_state(state: &GridState, focused_column: Option<&str>) -> Self {
        let display = state.display();
        Self {
            has_results: !state.result().columns.is_empty(),
            has_selection: state.selection().is_some(),
            has_filters: !state.filters().is_empty(),
            has_sort: state.sort().is_some(),
            has_hidden_columns: !state.hidden_columns().is_empty(),
            has_more: state.result().has_more,
            executing: state.is_executing(),
            wrap_text: display.wrap_text,
            show_line_breaks: display.show_line_breaks,
            focused_column: focused_column.map(str::to_string),
        }
    }

    #[must_use]
    pub fn with_focused_column(mut self, column: impl Into<String>) -> Self {
        self.focused_column = Some(column.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDefinition {
    pub id: ActionId,
    pub title: &'static str,
    pub description: &'static str,
}

const ACTIONS: [ActionDefinition; 17] = [
    ActionDefinition {
        id: ActionId::CopySelection,
        title: "Copy selection",
        description: "Copy the selected cells as tab separated text",
    },
    ActionDefinition {
        id: ActionId::CopyAll,
        title: "Copy all",
        description: "Copy every visible row with a header",
    },
    ActionDefinition {
        id: ActionId::ExportCsv,
        title: "Export CSV",
        description: "Write visible rows as comma separated values",
    },
    ActionDefinition {
        id: ActionId::ExportTsv,
        title: "Export TSV",
        description: "Write visible rows as tab separated values",
    },
    ActionDefinition {
        id: ActionId::ExportJson,
        title: "Export JSON",
        description: "Write visible rows as a JSON array of objects",
    },
    ActionDefinition {
        id: ActionId::ExportJsonLines,
        title: "Export JSON Lines",
        description: "Write one JSON object per visible row",
    },
    ActionDefinition {
        id: ActionId::ExportSql,
        title: "Export SQL",
        description: "Write visible rows as INSERT statements",
    },
    ActionDefinition {
        id: ActionId::ExportMarkdown,
        title: "Export Markdown",
        description: "Write visible rows as a Markdown table",
    },
    ActionDefinition {
        id: ActionId::ExportXlsx,
        title: "Export Excel",
        description: "Hand visible rows to the spreadsheet writer",
    },
    ActionDefinition {
        id: ActionId::ToggleWrap,
        title: "Toggle wrap",
        description: "Wrap long cell text onto several lines",
    },
    ActionDefinition {
        id: ActionId::ToggleLineBreaks,
        title: "Toggle line breaks",
        description: "Render embedded newlines as separate lines",
    },
    ActionDefinition {
        id: ActionId::ClearFilters,
        title: "Clear filters",
        description: "Remove every column filter",
    },
    ActionDefinition {
        id: ActionId::ClearSort,
        title: "Clear sort",
        description: "Restore fetch order",
    },
    ActionDefinition {
        id: ActionId::ClearSelection,
        title: "Clear selection",
        description: "Drop the selected rectangle",
    },
    ActionDefinition {
        id: ActionId::AutoFitColumn,
        title: "Auto-fit column",
        description: "Size the focused column to its widest value",
    },
    ActionDefinition {
        id: ActionId::ShowAllColumns,
        title: "Show all columns",
        description: "Unhide every hidden column",
    },
    ActionDefinition {
        id: ActionId::LoadMore,
        title: "Load more",
        description: "Fetch the next page of rows",
    },
];

#[derive(Debug, Default)]
pub struct ActionRegistry;

impl ActionRegistry {
    #[must_use]
    pub fn all(&self) -> &'static [ActionDefinition] {
        &ACTIONS
    }

    #[must_use]
    pub fn find(&self, action_id: ActionId) -> Option<ActionDefinition> {
        ACTIONS
            .iter()
            .copied()
            .find(|action| action.id == action_id)
    }

    #[must_use]
    pub fn enabled_actions(&self, context: &ActionContext) -> Vec<ActionDefinition> {
        ACTIONS
            .iter()
            .copied()
            .filter(|action| action_enabled(action.id, context))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAction {
    pub id: ActionId,
    pub title: &'static str,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyScope {
    Selection,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionInvocation {
    Copy(CopyScope),
    Export(ExportFormat),
    ToggleWrap,
    ToggleLineBreaks,
    ClearFilters,
    ClearSort,
    ClearSelection,
    AutoFitColumn(String),
    ShowAllColumns,
    LoadMore,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("action `{0:?}` is disabled in the current context")]
    ActionDisabled(ActionId),
    #[error("a focused column is required")]
    MissingFocusedColumn,
}

#[derive(Debug, Default)]
pub struct ActionsEngine {
    registry: ActionRegistry,
    recency_tick: u64,
    recency: HashMap<ActionId, u64>,
}

impl ActionsEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn rank_top_n(&self, context: &ActionContext, limit: usize) -> Vec<RankedAction> {
        let mut ranked = self
            .registry
            .all()
            .iter()
            .copied()
            .filter(|action| action_enabled(action.id, context))
            .map(|action| RankedAction {
                id: action.id,
                title: action.title,
                score: action_base_score(action.id, context) + self.recency_boost(action.id),
            })
            .collect::<Vec<_>>();

        ranked.sort_by(|left, right| {
            right
                .score
                .cmp(&left.score)
                .then_with(|| left.title.cmp(right.title))
        });
        ranked.truncate(limit);
        ranked
    }

    pub fn invoke(
        &mut self,
        action_id: ActionId,
        context: &ActionContext,
    ) -> Result<ActionInvocation, ActionError> {
        if !action_enabled(action_id, context) {
            return Err(ActionError::ActionDisabled(action_id));
        }

        let invocation = match action_id {
            ActionId::CopySelection => ActionInvocation::Copy(CopyScope::Selection),
            ActionId::CopyAll => ActionInvocation::Copy(CopyScope::All),
            ActionId::ExportCsv => ActionInvocation::Export(ExportFormat::Csv),
            ActionId::ExportTsv => ActionInvocation::Export(ExportFormat::Tsv),
            ActionId::ExportJson => ActionInvocation::Export(ExportFormat::Json),
            ActionId::ExportJsonLines => ActionInvocation::Export(ExportFormat::JsonLines),
            ActionId::ExportSql => ActionInvocation::Export(ExportFormat::Sql),
            ActionId::ExportMarkdown => ActionInvocation::Export(ExportFormat::Markdown),
            ActionId::ExportXlsx => ActionInvocation::Export(ExportFormat::Xlsx),
            ActionId::ToggleWrap => ActionInvocation::ToggleWrap,
            ActionId::ToggleLineBreaks => ActionInvocation::ToggleLineBreaks,
            ActionId::ClearFilters => ActionInvocation::ClearFilters,
            ActionId::ClearSort => ActionInvocation::ClearSort,
            ActionId::ClearSelection => ActionInvocation::ClearSelection,
            ActionId::AutoFitColumn => {
                let column = context
                    .focused_column
                    .clone()
                    .ok_or(ActionError::MissingFocusedColumn)?;
                ActionInvocation::AutoFitColumn(column)
            }
            ActionId::ShowAllColumns => ActionInvocation::ShowAllColumns,
            ActionId::LoadMore => ActionInvocation::LoadMore,
        };

        self.record_use(action_id);
        Ok(invocation)
    }

    fn record_use(&mut self, action_id: ActionId) {
        self.recency_tick = self.recency_tick.saturating_add(1);
        self.recency.insert(action_id, self.recency_tick);
    }

    fn recency_boost(&self, action_id: ActionId) -> i32 {
        let Some(last_used_tick) = self.recency.get(&action_id).copied() else {
            return 0;
        };

        let age = self.recency_tick.saturating_sub(last_used_tick);
        let age_i32 = i32::try_from(age).unwrap_or(i32::MAX);
        (MAX_RECENCY_BOOST - age_i32).max(0)
    }
}

/// Applies the state-only invocations. Copy, export and load more need a
/// collaborator and leave the state untouched.
#[must_use]
pub fn apply_invocation(state: GridState, invocation: &ActionInvocation) -> GridState {
    match invocation {
        ActionInvocation::ToggleWrap => state.toggle_wrap(),
        ActionInvocation::ToggleLineBreaks => state.toggle_line_breaks(),
        ActionInvocation::ClearFilters => state.clear_filters(),
        ActionInvocation::ClearSort => state.clear_sort(),
        ActionInvocation::ClearSelection => state.clear_selection(),
        ActionInvocation::AutoFitColumn(column) => state.auto_fit_column(column),
        ActionInvocation::ShowAllColumns => state.show_all_columns(),
        ActionInvocation::Copy(_) | ActionInvocation::Export(_) | ActionInvocation::LoadMore => {
            state
        }
    }
}

fn action_enabled(action_id: ActionId, context: &ActionContext) -> bool {
    let ready = context.has_results && !context.executing;
    match action_id {
        ActionId::CopySelection | ActionId::ClearSelection => ready && context.has_selection,
        ActionId::CopyAll
        | ActionId::ExportCsv
        | ActionId::ExportTsv
        | ActionId::ExportJson
        | ActionId::ExportJsonLines
        | ActionId::ExportSql
        | ActionId::ExportMarkdown
        | ActionId::ExportXlsx
        | ActionId::ToggleWrap
        | ActionId::ToggleLineBreaks => ready,
        ActionId::ClearFilters => ready && context.has_filters,
        ActionId::ClearSort => ready && context.has_sort,
        ActionId::AutoFitColumn => ready && context.focused_column.is_some(),
        ActionId::ShowAllColumns => ready && context.has_hidden_columns,
        ActionId::LoadMore => ready && context.has_more,
    }
}

fn action_base_score(action_id: ActionId, context: &ActionContext) -> i32 {
    match action_id {
        ActionId::CopySelection => 900,
        ActionId::LoadMore => 880,
        ActionId::ClearFilters => 860,
        ActionId::ClearSort => 840,
        ActionId::ShowAllColumns => 820,
        ActionId::CopyAll => {
            if context.has_selection {
                600
            } else {
                800
            }
        }
        ActionId::ExportCsv => 760,
        ActionId::AutoFitColumn => 740,
        ActionId::ToggleWrap => 720,
        ActionId::ToggleLineBreaks => 700,
        ActionId::ExportJson => 680,
        ActionId::ExportXlsx => 660,
        ActionId::ExportTsv | ActionId::ExportJsonLines => 640,
        ActionId::ExportSql | ActionId::ExportMarkdown => 620,
        ActionId::ClearSelection => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        apply_invocation, ActionContext, ActionError, ActionId, ActionInvocation, ActionsEngine,
        CopyScope,
    };
    use crate::config::GridConfig;
    use crate::export::ExportFormat;
    use crate::state::GridState;
    use crate::value::{Column, ResultSet, Row};

    fn results_context() -> ActionContext {
        ActionContext {
            has_results: true,
            ..ActionContext::default()
        }
    }

    #[test]
    fn registry_has_one_export_action_per_format() {
        let engine = ActionsEngine::new();
        let exports = engine
            .registry()
            .all()
            .iter()
            .filter(|action| action.title.starts_with("Export"))
            .count();
        assert_eq!(exports, ExportFormat::ALL.len());
    }

    #[test]
    fn disabled_actions_report_their_id() {
        let mut engine = ActionsEngine::new();
        assert_eq!(
            engine.invoke(ActionId::ExportCsv, &ActionContext::default()),
            Err(ActionError::ActionDisabled(ActionId::ExportCsv))
        );
        assert_eq!(
            engine.invoke(ActionId::LoadMore, &results_context()),
            Err(ActionError::ActionDisabled(ActionId::LoadMore))
        );

        let executing = ActionContext {
            executing: true,
            ..results_context()
        };
        assert!(engine.invoke(ActionId::CopyAll, &executing).is_err());
    }

    #[test]
    fn ranking_prefers_selection_copy_when_selected() {
        let engine = ActionsEngine::new();
        let context = ActionContext {
            has_selection: true,
            ..results_context()
        };
        let ranked = engine.rank_top_n(&context, 3);
        assert_eq!(ranked.first().map(|action| action.id), Some(ActionId::CopySelection));

        let ranked = engine.rank_top_n(&results_context(), 1);
        assert_eq!(ranked.first().map(|action| action.id), Some(ActionId::CopyAll));
    }

    #[test]
    fn recent_actions_get_boosted() {
        let mut engine = ActionsEngine::new();
        let context = results_context();
        let before = engine
            .rank_top_n(&context, 20)
            .iter()
            .position(|action| action.id == ActionId::ExportSql);

        engine
            .invoke(ActionId::ExportSql, &context)
            .expect("sql export enabled");
        let after = engine
            .rank_top_n(&context, 20)
            .iter()
            .position(|action| action.id == ActionId::ExportSql);
        assert!(after < before);
    }

    #[test]
    fn invocations_map_to_commands() {
        let mut engine = ActionsEngine::new();
        let context = ActionContext {
            has_selection: true,
            ..results_context()
        }
        .with_focused_column("name");

        assert_eq!(
            engine.invoke(ActionId::CopySelection, &context),
            Ok(ActionInvocation::Copy(CopyScope::Selection))
        );
        assert_eq!(
            engine.invoke(ActionId::ExportJsonLines, &context),
            Ok(ActionInvocation::Export(ExportFormat::JsonLines))
        );
        assert_eq!(
            engine.invoke(ActionId::AutoFitColumn, &context),
            Ok(ActionInvocation::AutoFitColumn("name".to_string()))
        );
    }

    #[test]
    fn state_invocations_update_the_grid() {
        let state = GridState::new(GridConfig::default()).replace_result(ResultSet::new(
            vec![Column::new("id", "int4")],
            vec![Row::new().with("id", 1_i64)],
        ));
        let context = ActionContext::from_state(&state, Some("id"));
        assert!(context.has_results);
        assert!(!context.wrap_text);

        let state = apply_invocation(state, &ActionInvocation::ToggleWrap);
        assert!(state.display().wrap_text);
        let state = apply_invocation(state, &ActionInvocation::AutoFitColumn("id".to_string()));
        assert!(state.widths().has_override("id"));
    }
}
