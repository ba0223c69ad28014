pub mod export;
pub mod json_source;
