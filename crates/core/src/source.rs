use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::state::{GridSignal, GridState};
use crate::value::{ResultSet, Row};

pub const DEFAULT_PAGE_SIZE: usize = 1_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPage {
    pub rows: Vec<Row>,
    pub row_count: Option<usize>,
    pub has_more: bool,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("result source failed: {0}")]
    Backend(String),
}

/// The fetch collaborator. `fetch_more` receives the number of rows already
/// loaded as its offset.
#[async_trait]
pub trait ResultSource: Send + Sync {
    async fn fetch_initial(&self, limit: usize) -> Result<ResultSet, SourceError>;

    async fn fetch_more(&self, offset: usize, limit: usize) -> Result<RowPage, SourceError>;
}

#[derive(Debug)]
pub struct ResultLoader<S: ResultSource> {
    source: S,
    page_size: usize,
}

impl<S: ResultSource> ResultLoader<S> {
    #[must_use]
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replaces the grid contents with the first page. A failure becomes an
    /// error signal on the returned state.
    pub async fn load(&self, state: GridState) -> GridState {
        let started_at = Instant::now();
        let state = state.set_executing(true);
        match self.source.fetch_initial(self.page_size).await {
            Ok(mut result) => {
                if result.execution_time_ms == 0 {
                    result.execution_time_ms =
                        u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
                }
                info!(
                    rows = result.rows.len(),
                    has_more = result.has_more,
                    "result loaded"
                );
                state.replace_result(result)
            }
            Err(error) => {
                warn!(%error, "result load failed");
                state.set_signal(GridSignal::Error(error.to_string()))
            }
        }
    }

    /// `Ok(None)` when the source has nothing more to give.
    pub async fn next_page(&self, state: &GridState) -> Result<Option<RowPage>, SourceError> {
        if !state.result().has_more {
            return Ok(None);
        }

        let offset = state.view().loaded_row_count();
        let page = self.source.fetch_more(offset, self.page_size).await?;
        info!(offset, rows = page.rows.len(), has_more = page.has_more, "page fetched");
        Ok(Some(page))
    }

    /// Fetches and appends the next page; derived state is preserved.
    pub async fn load_more(&self, state: GridState) -> Result<GridState, SourceError> {
        match self.next_page(&state).await? {
            Some(page) => Ok(state.append_rows(page.rows, page.row_count, page.has_more)),
            None => Ok(state),
        }
    }
}
