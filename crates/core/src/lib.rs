pub mod actions;
pub mod config;
pub mod export;
pub mod filter;
pub mod format;
pub mod row_height;
pub mod selection;
pub mod sort;
pub mod source;
pub mod state;
pub mod value;
pub mod view;
pub mod virtualizer;
pub mod widths;

pub use config::{GridConfig, GridMetrics};
pub use state::{GridSignal, GridState, Panel};
pub use value::{CellValue, Column, ResultSet, Row};
