use std::io;
use std::time::{Duration, Instant};

use gridlens_adapters::json_source::{JsonResultSource, ResultDocument};
use gridlens_core::export::{ExportFormat, ExportPayload};
use gridlens_core::filter::{ColumnFilter, FilterOperator};
use gridlens_core::sort::{SortDirection, SortSpec};
use gridlens_core::source::ResultLoader;
use gridlens_core::virtualizer::{ViewportMetrics, Virtualizer};
use gridlens_core::{Column, GridConfig, GridState};
use serde_json::{json, Map, Value};

const CATEGORIES: [&str; 5] = ["search", "play", "pause", "skip", "share"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseOutcome {
    Config,
    HelpRequested,
}

#[derive(Debug, Clone)]
struct BenchmarkConfig {
    rows: usize,
    page_size: usize,
    viewport_rows: u16,
    wrap_text: bool,
    filter: String,
    assert_sort_ms: Option<f64>,
    assert_window_ms: Option<f64>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            rows: 100_000,
            page_size: 5_000,
            viewport_rows: 40,
            wrap_text: true,
            filter: "a".to_string(),
            assert_sort_ms: None,
            assert_window_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
struct BenchmarkMetrics {
    rows_loaded: usize,
    visible_rows: usize,
    first_page: Duration,
    load: Duration,
    filter: Duration,
    sort: Duration,
    window: Duration,
    window_rows: usize,
    export: Duration,
    export_bytes: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args()?;
    let metrics = run_benchmark(&config).await?;

    println!("metric.rows_loaded={}", metrics.rows_loaded);
    println!("metric.first_page_ms={:.3}", millis(metrics.first_page));
    println!("metric.load_ms={:.3}", millis(metrics.load));
    println!("metric.filter_ms={:.3}", millis(metrics.filter));
    println!("metric.visible_rows={}", metrics.visible_rows);
    println!("metric.sort_ms={:.3}", millis(metrics.sort));
    println!("metric.window_ms={:.3}", millis(metrics.window));
    println!("metric.window_rows={}", metrics.window_rows);
    println!("metric.export_ms={:.3}", millis(metrics.export));
    println!("metric.export_bytes={}", metrics.export_bytes);
    if let Some(bytes) = peak_memory_bytes_best_effort() {
        println!("metric.peak_memory_bytes={bytes}");
    } else {
        println!("metric.peak_memory_bytes=n/a");
    }

    enforce_assertions(&config, millis(metrics.sort), millis(metrics.window))?;
    Ok(())
}

async fn run_benchmark(config: &BenchmarkConfig) -> io::Result<BenchmarkMetrics> {
    let source = JsonResultSource::from_document("synthetic", synthetic_document(config.rows));
    let loader = ResultLoader::new(source, config.page_size);

    let started_at = Instant::now();
    let mut state = loader.load(GridState::new(GridConfig::terminal())).await;
    let first_page = started_at.elapsed();
    if let Some(signal) = state.signal() {
        return Err(io_other(format!("initial load failed: {signal:?}")));
    }
    while state.status().has_more {
        state = loader.load_more(state).await.map_err(io_other)?;
    }
    let load = started_at.elapsed();
    let rows_loaded = state.status().loaded_rows;

    let started_at = Instant::now();
    let state = state.apply_filter(ColumnFilter::new(
        "category",
        FilterOperator::Contains,
        config.filter.clone(),
    ));
    let filter = started_at.elapsed();
    let visible_rows = state.view().visible_row_count();

    let started_at = Instant::now();
    let state = state.set_sort(Some(SortSpec::new("note", SortDirection::Descending)));
    let sort = started_at.elapsed();

    let state = if config.wrap_text {
        state.toggle_wrap()
    } else {
        state
    };
    let started_at = Instant::now();
    let window_rows = measure_window(&state, config.viewport_rows);
    let window = started_at.elapsed();

    let started_at = Instant::now();
    let request = state.export_request(ExportFormat::Csv, "benchmark.csv");
    let export = started_at.elapsed();
    let export_bytes = match &request.payload {
        ExportPayload::Text(content) => content.len(),
        ExportPayload::Spreadsheet(_) => 0,
    };

    Ok(BenchmarkMetrics {
        rows_loaded,
        visible_rows,
        first_page,
        load,
        filter,
        sort,
        window,
        window_rows,
        export,
        export_bytes,
    })
}

/// Lays out one viewport in the middle of the view and returns how many rows
/// the virtualizer had to produce.
fn measure_window(state: &GridState, viewport_rows: u16) -> usize {
    let sizer = state.row_sizer();
    let metrics = state.metrics();
    let mut virtualizer = Virtualizer::new();
    virtualizer.sync(
        state.layout_revision(),
        state.view().visible_row_count(),
        &sizer,
    );

    let viewport_height = f64::from(viewport_rows) * f64::from(metrics.row_height);
    let middle = virtualizer.total_height() / 2.0;
    virtualizer
        .window(
            ViewportMetrics::new(middle, viewport_height),
            metrics.overscan,
            &sizer,
        )
        .len()
}

fn synthetic_document(rows: usize) -> ResultDocument {
    let rows = (0..rows)
        .map(|index| {
            let note = if index % 7 == 0 {
                Value::Null
            } else if index % 3 == 0 {
                json!(format!("line one\nline two for event {index}"))
            } else {
                json!(format!("note {index}"))
            };

            let mut row = Map::new();
            row.insert("id".to_string(), json!(index));
            row.insert(
                "category".to_string(),
                json!(CATEGORIES[index % CATEGORIES.len()]),
            );
            row.insert("amount".to_string(), json!(format!("{}.{:02}", index / 4, index % 100)));
            row.insert("note".to_string(), note);
            row.insert("active".to_string(), json!(index % 2 == 0));
            row
        })
        .collect::<Vec<_>>();

    ResultDocument {
        columns: vec![
            Column::new("id", "int8"),
            Column::new("category", "varchar"),
            Column::new("amount", "numeric"),
            Column::new("note", "text"),
            Column::new("active", "bool"),
        ],
        row_count: Some(rows.len()),
        rows,
        execution_time_ms: 0,
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn enforce_assertions(config: &BenchmarkConfig, sort_ms: f64, window_ms: f64) -> io::Result<()> {
    if let Some(max_sort_ms) = config.assert_sort_ms {
        if sort_ms > max_sort_ms {
            return Err(io_other(format!(
                "sort took {sort_ms:.3}ms, threshold {max_sort_ms:.3}ms"
            )));
        }
    }

    if let Some(max_window_ms) = config.assert_window_ms {
        if window_ms > max_window_ms {
            return Err(io_other(format!(
                "window layout took {window_ms:.3}ms, threshold {max_window_ms:.3}ms"
            )));
        }
    }

    Ok(())
}

#[cfg(target_os = "linux")]
fn peak_memory_bytes_best_effort() -> Option<u64> {
    let contents = std::fs::read_to_string("/proc/self/status").ok()?;
    let vm_hwm_line = contents.lines().find(|line| line.starts_with("VmHWM:"))?;
    let kb = vm_hwm_line.split_whitespace().nth(1)?.parse::<u64>().ok()?;
    Some(kb * 1_024)
}

#[cfg(not(target_os = "linux"))]
fn peak_memory_bytes_best_effort() -> Option<u64> {
    None
}

fn parse_args() -> io::Result<BenchmarkConfig> {
    let mut config = BenchmarkConfig::default();
    let outcome = parse_args_from(std::env::args().skip(1), &mut config)?;
    if outcome == ParseOutcome::HelpRequested {
        print_help();
        std::process::exit(0);
    }
    Ok(config)
}

fn parse_args_from(
    args: impl IntoIterator<Item = String>,
    config: &mut BenchmarkConfig,
) -> io::Result<ParseOutcome> {
    let mut args = args.into_iter();

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::HelpRequested),
            "--rows" => {
                config.rows = next_value(&mut args, "--rows")?
                    .parse::<usize>()
                    .map_err(|error| io_other(format!("invalid --rows value: {error}")))?;
            }
            "--page-size" => {
                config.page_size = next_value(&mut args, "--page-size")?
                    .parse::<usize>()
                    .map_err(|error| io_other(format!("invalid --page-size value: {error}")))?;
            }
            "--viewport-rows" => {
                config.viewport_rows = next_value(&mut args, "--viewport-rows")?
                    .parse::<u16>()
                    .map_err(|error| io_other(format!("invalid --viewport-rows value: {error}")))?;
            }
            "--no-wrap" => config.wrap_text = false,
            "--filter" => config.filter = next_value(&mut args, "--filter")?,
            "--assert-sort-ms" => {
                config.assert_sort_ms = Some(
                    next_value(&mut args, "--assert-sort-ms")?
                        .parse::<f64>()
                        .map_err(|error| {
                            io_other(format!("invalid --assert-sort-ms value: {error}"))
                        })?,
                );
            }
            "--assert-window-ms" => {
                config.assert_window_ms = Some(
                    next_value(&mut args, "--assert-window-ms")?
                        .parse::<f64>()
                        .map_err(|error| {
                            io_other(format!("invalid --assert-window-ms value: {error}"))
                        })?,
                );
            }
            _ => {
                return Err(io_other(format!("unknown argument `{flag}`")));
            }
        }
    }

    Ok(ParseOutcome::Config)
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> io::Result<String> {
    args.next()
        .ok_or_else(|| io_other(format!("missing value for `{flag}`")))
}

fn print_help() {
    println!(
        "gridlens benchmark runner\n\n\
Usage:\n  cargo run -p gridlens-app --bin benchmark -- [OPTIONS]\n\n\
Options:\n  --rows <count>              Synthetic rows to load (default: 100000)\n  --page-size <rows>          Rows per fetched page (default: 5000)\n  --viewport-rows <rows>      Viewport height in terminal rows (default: 40)\n  --no-wrap                   Measure the fixed-height layout instead of wrapped rows\n  --filter <text>             Text matched against the category column (default: a)\n  --assert-sort-ms <ms>       Fail if sorting exceeds threshold\n  --assert-window-ms <ms>     Fail if window layout exceeds threshold\n"
    );
}

fn io_other(error: impl std::fmt::Display) -> io::Error {
    io::Error::other(error.to_string())
}

#[cfg(test)]
mod tests {
    use gridlens_core::CellValue;

    use super::{
        enforce_assertions, io_other, next_value, parse_args_from, run_benchmark,
        synthetic_document, BenchmarkConfig, ParseOutcome,
    };

    #[test]
    fn parse_args_from_applies_overrides() {
        let mut config = BenchmarkConfig::default();
        let outcome = parse_args_from(
            vec![
                "--rows".to_string(),
                "2500".to_string(),
                "--page-size".to_string(),
                "100".to_string(),
                "--viewport-rows".to_string(),
                "30".to_string(),
                "--no-wrap".to_string(),
                "--filter".to_string(),
                "sk".to_string(),
                "--assert-sort-ms".to_string(),
                "150".to_string(),
                "--assert-window-ms".to_string(),
                "5".to_string(),
            ],
            &mut config,
        )
        .expect("parse should succeed");

        assert_eq!(outcome, ParseOutcome::Config);
        assert_eq!(config.rows, 2_500);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.viewport_rows, 30);
        assert!(!config.wrap_text);
        assert_eq!(config.filter, "sk");
        assert_eq!(config.assert_sort_ms, Some(150.0));
        assert_eq!(config.assert_window_ms, Some(5.0));
    }

    #[test]
    fn parse_args_from_detects_help() {
        let mut config = BenchmarkConfig::default();
        let outcome = parse_args_from(vec!["--help".to_string()], &mut config).expect("help parse");
        assert_eq!(outcome, ParseOutcome::HelpRequested);
    }

    #[test]
    fn parse_args_from_fails_for_unknown_flag() {
        let mut config = BenchmarkConfig::default();
        let err = parse_args_from(vec!["--bogus".to_string()], &mut config)
            .expect_err("unknown flags should fail");
        assert!(err.to_string().contains("unknown argument"));
    }

    #[test]
    fn next_value_reports_missing_flag_values() {
        let mut args = std::iter::empty::<String>();
        let err = next_value(&mut args, "--rows").expect_err("missing value should fail");
        assert!(err.to_string().contains("missing value for `--rows`"));
    }

    #[test]
    fn synthetic_document_mixes_nulls_and_multiline_notes() {
        let document = synthetic_document(7);
        assert_eq!(document.columns.len(), 5);
        assert_eq!(document.row_count, Some(7));
        assert!(document.rows[0]["note"].is_null());
        assert_eq!(document.rows[3]["note"], "line one\nline two for event 3");
        assert_eq!(document.rows[1]["category"], "play");
        assert_eq!(
            CellValue::from_json(document.rows[4]["active"].clone()),
            CellValue::Bool(true)
        );
    }

    #[test]
    fn enforce_assertions_validates_thresholds() {
        let config = BenchmarkConfig {
            assert_sort_ms: Some(50.0),
            assert_window_ms: Some(2.0),
            ..BenchmarkConfig::default()
        };

        let sort_err = enforce_assertions(&config, 51.0, 1.0).expect_err("sort threshold");
        assert!(sort_err.to_string().contains("sort took"));

        let window_err = enforce_assertions(&config, 10.0, 3.0).expect_err("window threshold");
        assert!(window_err.to_string().contains("window layout"));

        assert!(enforce_assertions(&config, 10.0, 1.0).is_ok());
    }

    #[test]
    fn io_other_uses_display_text() {
        let err = io_other("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn small_benchmark_loads_every_page_and_bounds_the_window() {
        let config = BenchmarkConfig {
            rows: 2_000,
            page_size: 300,
            viewport_rows: 20,
            ..BenchmarkConfig::default()
        };

        let metrics = run_benchmark(&config).await.expect("benchmark runs");
        assert_eq!(metrics.rows_loaded, 2_000);
        // Every category except "skip" contains an `a`.
        assert_eq!(metrics.visible_rows, 1_600);
        assert!(metrics.window_rows > 0);
        assert!(metrics.window_rows <= 20 + 1 + 2 * 5);
        assert!(metrics.export_bytes > 0);
    }
}
