// tests/config_loading.rs
use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tempfile::{tempdir, TempDir};
use tracing_subscriber::filter::LevelFilter;

use watchrun::cli::{CliArgs, LogLevel};
use watchrun::config::duration::parse_duration;
use watchrun::config::{resolve, GlobList, DEFAULT_IGNORE, DEFAULT_INTERVAL};
use watchrun::errors::WatchrunError;
use watchrun::exec::Stage;
use watchrun::logging::{level_filter, parse_level_str};

type TestResult = Result<(), Box<dyn Error>>;

fn args(argv: &[&str]) -> CliArgs {
    let mut full = vec!["watchrun"];
    full.extend_from_slice(argv);
    CliArgs::try_parse_from(full).expect("valid command line")
}

fn write_config(contents: &str) -> Result<(TempDir, String), Box<dyn Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("watchrun.toml");
    fs::write(&path, contents)?;
    let path = path.to_string_lossy().into_owned();
    Ok((dir, path))
}

fn toml_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[test]
fn defaults_apply_when_only_a_command_is_given() -> TestResult {
    let cfg = resolve(&args(&["make"]))?;

    assert_eq!(cfg.watch.monitor, vec!["."]);
    assert_eq!(cfg.watch.interval, DEFAULT_INTERVAL);
    assert_eq!(cfg.watch.interval, Duration::from_millis(300));
    assert!(cfg.watch.recurse);
    assert_eq!(cfg.watch.ignore.len(), DEFAULT_IGNORE.len());
    assert!(cfg.watch.care.is_empty());
    assert_eq!(cfg.pipeline.stages, vec![Stage::new("make", Vec::<String>::new())]);
    assert_eq!(cfg.pipeline.dir, None);
    Ok(())
}

#[test]
fn command_line_flags_are_split_and_merged() -> TestResult {
    let cli = args(&[
        "--monitor", "src;lib",
        "--monitor", "Cargo.toml",
        "--ignore", "target:dist",
        "--care", "*.rs;*.toml",
        "--interval", "2s",
        "--recurse=false",
        "cargo", "build", ";;", "./target/debug/app", "-v", "--port", "80",
    ]);
    assert!(!cli.verbose);

    let cfg = resolve(&cli)?;
    assert_eq!(cfg.watch.monitor, vec!["src", "lib", "Cargo.toml"]);
    assert_eq!(cfg.watch.interval, Duration::from_secs(2));
    assert!(!cfg.watch.recurse);
    assert!(cfg.watch.ignore.ends_with(&["target".to_string(), "dist".to_string()]));
    assert_eq!(cfg.watch.care, vec!["*.rs", "*.toml"]);
    assert_eq!(
        cfg.pipeline.stages,
        vec![
            Stage::new("cargo", ["build"]),
            Stage::new("./target/debug/app", ["-v", "--port", "80"]),
        ]
    );
    Ok(())
}

#[test]
fn no_default_ignore_keeps_only_user_patterns() -> TestResult {
    let cfg = resolve(&args(&["--no-default-ignore", "--ignore", "*.tmp", "make"]))?;
    assert_eq!(cfg.watch.ignore, vec!["*.tmp"]);
    Ok(())
}

#[test]
fn config_file_supplies_settings_and_stages() -> TestResult {
    let workdir = tempdir()?;
    let (_guard, path) = write_config(&format!(
        r#"
[watch]
monitor = ["src", "*.go"]
ignore = ["vendor"]
care = ["*.go"]
interval = "1s"
recurse = false

[pipeline]
dir = "{}"
stages = [["go", "build", "-o", "app"], ["./app"]]
"#,
        toml_path(workdir.path())
    ))?;

    let cfg = resolve(&args(&["--config", &path]))?;
    assert_eq!(cfg.watch.monitor, vec!["src", "*.go"]);
    assert_eq!(cfg.watch.interval, Duration::from_secs(1));
    assert!(!cfg.watch.recurse);
    assert_eq!(cfg.watch.care, vec!["*.go"]);
    assert_eq!(cfg.watch.ignore.last().map(String::as_str), Some("vendor"));
    assert_eq!(
        cfg.pipeline.stages,
        vec![
            Stage::new("go", ["build", "-o", "app"]),
            Stage::new("./app", Vec::<String>::new()),
        ]
    );
    assert_eq!(cfg.pipeline.dir.as_deref(), Some(workdir.path()));
    Ok(())
}

#[test]
fn command_line_overrides_config_file() -> TestResult {
    let (_guard, path) = write_config(
        r#"
[watch]
monitor = ["src"]
interval = "1s"
recurse = false

[pipeline]
stages = [["make"]]
"#,
    )?;

    let cfg = resolve(&args(&[
        "--config", &path,
        "--monitor", "lib",
        "--interval", "50ms",
        "--recurse",
        "--",
        "just", "run",
    ]))?;
    assert_eq!(cfg.watch.monitor, vec!["lib"]);
    assert_eq!(cfg.watch.interval, Duration::from_millis(50));
    assert!(cfg.watch.recurse);
    assert_eq!(cfg.pipeline.stages, vec![Stage::new("just", ["run"])]);
    Ok(())
}

#[test]
fn invalid_configurations_are_rejected() -> TestResult {
    let (_g1, unknown) = write_config("[watch]\nmonitr = [\"src\"]\n")?;
    assert!(matches!(
        resolve(&args(&["--config", &unknown, "make"])),
        Err(WatchrunError::TomlError(_))
    ));

    let (_g2, empty_stage) = write_config("[pipeline]\nstages = [[\"make\"], []]\n")?;
    let err = resolve(&args(&["--config", &empty_stage])).expect_err("empty stage");
    assert!(err.to_string().contains("stages[1]"), "{err}");

    let (_g3, zero) = write_config("[watch]\ninterval = \"0s\"\n")?;
    assert!(matches!(
        resolve(&args(&["--config", &zero, "make"])),
        Err(WatchrunError::ConfigError(_))
    ));

    let (_g4, bad_unit) = write_config("[watch]\ninterval = \"5 parsecs\"\n")?;
    assert!(matches!(
        resolve(&args(&["--config", &bad_unit, "make"])),
        Err(WatchrunError::ConfigError(_))
    ));

    assert!(matches!(resolve(&args(&[])), Err(WatchrunError::ConfigError(_))));

    assert!(matches!(
        resolve(&args(&["--ignore", "[unclosed", "make"])),
        Err(WatchrunError::InvalidGlob { .. })
    ));

    assert!(matches!(
        resolve(&args(&["--dir", "/no/such/working/dir", "make"])),
        Err(WatchrunError::ConfigError(_))
    ));

    assert!(matches!(
        resolve(&args(&["--config", "/no/such/watchrun.toml", "make"])),
        Err(WatchrunError::IoError(_))
    ));
    Ok(())
}

#[test]
fn zero_interval_flag_is_rejected() {
    let cli = args(&["--interval", "0ms", "make"]);
    assert!(matches!(resolve(&cli), Err(WatchrunError::ConfigError(_))));
}

#[test]
fn malformed_interval_flag_fails_parsing() {
    assert!(CliArgs::try_parse_from(["watchrun", "--interval", "5x", "make"]).is_err());
    assert!(CliArgs::try_parse_from(["watchrun", "--interval", "10", "make"]).is_err());
}

#[test]
fn parse_duration_units() {
    assert_eq!(parse_duration("300ms"), Ok(Duration::from_millis(300)));
    assert_eq!(parse_duration("2s"), Ok(Duration::from_secs(2)));
    assert_eq!(parse_duration(" 3m "), Ok(Duration::from_secs(180)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert_eq!(parse_duration("5MS"), Ok(Duration::from_millis(5)));

    assert_eq!(
        parse_duration("400000000000000000m"),
        Err("duration too large".to_string())
    );
    assert_eq!(
        parse_duration("18446744073709551615h"),
        Err("duration too large".to_string())
    );

    for bad in ["", "10", "ms", "5d", "-1s"] {
        assert!(parse_duration(bad).is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn glob_list_merges_defaults_and_additions() {
    let mut list = GlobList::ignore();
    list.add("build;out:tmp");
    list.add(" ; ");

    let all = list.all();
    assert_eq!(all.len(), DEFAULT_IGNORE.len() + 3);
    assert!(all.ends_with(&["build".to_string(), "out".to_string(), "tmp".to_string()]));

    list.no_default = true;
    assert_eq!(list.to_string(), "build;out;tmp");
    assert!(GlobList::empty().all().is_empty());
}

#[test]
fn log_level_precedence_and_parsing() {
    assert_eq!(args(&["make"]).effective_log_level(), None);
    assert_eq!(args(&["-v", "make"]).effective_log_level(), Some(LogLevel::Debug));
    assert_eq!(
        args(&["-v", "--log", "silent", "make"]).effective_log_level(),
        Some(LogLevel::Silent)
    );

    assert_eq!(parse_level_str("WARNING"), Some(LogLevel::Warn));
    assert_eq!(parse_level_str("off"), Some(LogLevel::Silent));
    assert_eq!(parse_level_str("loud"), None);
    assert_eq!(level_filter(LogLevel::Silent), LevelFilter::OFF);
    assert_eq!(level_filter(LogLevel::Trace), LevelFilter::TRACE);
}

#[test]
fn bare_recurse_flag_leaves_the_command_alone() -> TestResult {
    let cli = args(&["--recurse", "make", "build"]);
    assert_eq!(cli.recurse, Some(true));
    assert_eq!(cli.command, vec!["make", "build"]);

    let cli = args(&["--recurse=false", "true"]);
    assert_eq!(cli.recurse, Some(false));
    assert_eq!(cli.command, vec!["true"]);

    let cfg = resolve(&args(&["--recurse", "make"]))?;
    assert!(cfg.watch.recurse);
    assert_eq!(cfg.pipeline.stages, vec![Stage::new("make", Vec::<String>::new())]);
    Ok(())
}
