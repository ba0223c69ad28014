mod logging;

use std::io;
use std::path::PathBuf;

use gridlens_adapters::json_source::JsonResultSource;
use gridlens_core::config::{default_config_path, GridConfig};
use gridlens_core::source::DEFAULT_PAGE_SIZE;
use gridlens_tui::{ShellOptions, TuiError};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    result_path: PathBuf,
    page_size: usize,
    export_dir: PathBuf,
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseOutcome {
    Run(CliArgs),
    HelpRequested,
}

fn parse_args_from(args: impl IntoIterator<Item = String>) -> io::Result<ParseOutcome> {
    let mut args = args.into_iter();
    let mut result_path = None;
    let mut page_size = DEFAULT_PAGE_SIZE;
    let mut export_dir = PathBuf::from(".");
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::HelpRequested),
            "--page-size" => {
                page_size = next_value(&mut args, "--page-size")?
                    .parse::<usize>()
                    .map_err(|error| io_other(format!("invalid --page-size value: {error}")))?;
                if page_size == 0 {
                    return Err(io_other("--page-size must be at least 1"));
                }
            }
            "--export-dir" => export_dir = PathBuf::from(next_value(&mut args, "--export-dir")?),
            "--config" => config_path = Some(PathBuf::from(next_value(&mut args, "--config")?)),
            flag if flag.starts_with('-') => {
                return Err(io_other(format!("unknown argument `{flag}`")));
            }
            _ if result_path.is_some() => {
                return Err(io_other(format!("unexpected extra argument `{arg}`")));
            }
            _ => result_path = Some(PathBuf::from(arg)),
        }
    }

    let result_path = result_path.ok_or_else(|| io_other("missing result file argument"))?;
    Ok(ParseOutcome::Run(CliArgs {
        result_path,
        page_size,
        export_dir,
        config_path,
    }))
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> io::Result<String> {
    args.next()
        .ok_or_else(|| io_other(format!("missing value for `{flag}`")))
}

fn io_other(error: impl std::fmt::Display) -> io::Error {
    io::Error::other(error.to_string())
}

fn load_config(explicit: Option<&PathBuf>) -> Result<GridConfig, Box<dyn std::error::Error>> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => match default_config_path() {
            Ok(path) => path,
            Err(error) => {
                warn!(%error, "using built-in grid config");
                return Ok(GridConfig::terminal());
            }
        },
    };
    Ok(GridConfig::load_from_path_or(&path, GridConfig::terminal())?)
}

fn run_app(
    args: &CliArgs,
    run_tui: impl FnOnce(JsonResultSource, ShellOptions) -> Result<(), TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config_path.as_ref())?;
    let source = JsonResultSource::open(&args.result_path)?;
    info!(
        path = %args.result_path.display(),
        rows = source.total_rows(),
        page_size = args.page_size,
        "opening result file"
    );

    let title = args.result_path.file_name().map_or_else(
        || args.result_path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    );
    run_tui(
        source,
        ShellOptions {
            config,
            page_size: args.page_size,
            export_dir: args.export_dir.clone(),
            title,
        },
    )?;
    Ok(())
}

fn print_help() {
    println!(
        "gridlens result viewer\n\n\
Usage:\n  gridlens [OPTIONS] <result.json>\n\n\
The file holds either {{\"columns\": [...], \"rows\": [...]}} or a bare array of row objects.\n\n\
Options:\n  --page-size <rows>   Rows fetched per page (default: {DEFAULT_PAGE_SIZE})\n  --export-dir <dir>   Directory for export files (default: .)\n  --config <path>      Grid config TOML (default: <config dir>/gridlens/grid.toml)\n\n\
Environment:\n  RUST_LOG             Log filter\n  GRIDLENS_LOG_DIR     Log directory\n  GRIDLENS_CONFIG_DIR  Config directory\n"
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match parse_args_from(std::env::args().skip(1))? {
        ParseOutcome::Run(args) => args,
        ParseOutcome::HelpRequested => {
            print_help();
            return Ok(());
        }
    };

    let _log_guard = logging::init(&logging::LoggingConfig::from_env())?;
    run_app(&args, gridlens_tui::run)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;
    use std::path::PathBuf;

    use gridlens_core::source::DEFAULT_PAGE_SIZE;
    use tempfile::TempDir;

    use super::{parse_args_from, run_app, CliArgs, ParseOutcome};

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| (*arg).to_string()).collect()
    }

    fn cli_args(temp_dir: &TempDir) -> CliArgs {
        let result_path = temp_dir.path().join("result.json");
        fs::write(&result_path, r#"[{"id": 1}, {"id": 2}]"#).expect("failed to write result");
        CliArgs {
            result_path,
            page_size: 1,
            export_dir: temp_dir.path().to_path_buf(),
            config_path: Some(temp_dir.path().join("grid.toml")),
        }
    }

    #[test]
    fn parse_args_from_applies_overrides() {
        let outcome = parse_args_from(strings(&[
            "--page-size",
            "250",
            "out.json",
            "--export-dir",
            "/tmp/exports",
            "--config",
            "grid.toml",
        ]))
        .expect("parse should succeed");

        assert_eq!(
            outcome,
            ParseOutcome::Run(CliArgs {
                result_path: PathBuf::from("out.json"),
                page_size: 250,
                export_dir: PathBuf::from("/tmp/exports"),
                config_path: Some(PathBuf::from("grid.toml")),
            })
        );
    }

    #[test]
    fn parse_args_from_uses_defaults_and_detects_help() {
        let ParseOutcome::Run(args) =
            parse_args_from(strings(&["result.json"])).expect("parse should succeed")
        else {
            panic!("expected run outcome");
        };
        assert_eq!(args.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(args.config_path, None);

        assert_eq!(
            parse_args_from(strings(&["-h"])).expect("help parse"),
            ParseOutcome::HelpRequested
        );
    }

    #[test]
    fn parse_args_from_rejects_bad_input() {
        let cases: [(&[&str], &str); 4] = [
            (&["--bogus"], "unknown argument"),
            (&[], "missing result file"),
            (&["a.json", "b.json"], "unexpected extra argument"),
            (&["a.json", "--page-size", "0"], "at least 1"),
        ];
        for (args, expected) in cases {
            let error = parse_args_from(strings(args)).expect_err("parse should fail");
            assert!(error.to_string().contains(expected), "{error}");
        }
    }

    #[test]
    fn run_app_hands_source_and_options_to_the_shell() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let args = cli_args(&temp_dir);

        let result = run_app(&args, |source, options| {
            assert_eq!(source.total_rows(), 2);
            assert_eq!(options.page_size, 1);
            assert_eq!(options.title, "result.json");
            Ok(())
        });
        assert!(result.is_ok());
    }

    #[test]
    fn run_app_propagates_tui_errors() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let args = cli_args(&temp_dir);

        let result = run_app(&args, |_, _| {
            Err(gridlens_tui::TuiError::Io(io::Error::other("boom")))
        });
        assert!(result.is_err());
    }

    #[test]
    fn run_app_reports_unreadable_result_files() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut args = cli_args(&temp_dir);
        args.result_path = temp_dir.path().join("missing.json");

        let result = run_app(&args, |_, _| Ok(()));
        assert!(result.is_err());
    }
}
