use anyhow::{Context, Result};
use ariadne::{Config, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use matcalc::{Diagnostic, Engine, EngineConfig, Snapshot, classify, math};
use std::fs;
use std::path::{Path, PathBuf};

mod config;
mod test_file;

use config::ConfigSource;

#[derive(Parser)]
#[command(name = "matcalc")]
#[command(about = "Reactive matrix calculator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file (default: nearest matcalc.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Decimal places for rendered values
    #[arg(long, global = true)]
    precision: Option<u32>,
    /// Passes before the divergence guard poisons still-changing names
    #[arg(long, global = true)]
    max_passes: Option<usize>,
    /// Log engine passes (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate entries given on the command line, in order
    Eval {
        /// Entry texts, e.g. `a = 2` `a * 3`
        entries: Vec<String>,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a file, one entry per line
    Run {
        file: PathBuf,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report syntax errors per line
    Check { file: PathBuf },
    /// Run test files with expected variables
    Test {
        /// Path to test file(s)
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let engine_config = engine_config(&cli)?;

    match cli.command {
        Commands::Eval { entries, json } => {
            print_entries(&entries, engine_config, json)?;
        }
        Commands::Run { file, json } => {
            let content = read_file(&file)?;
            print_entries(content.lines(), engine_config, json)?;
        }
        Commands::Check { file } => {
            let content = read_file(&file)?;
            if !check_file(&file, &content) {
                std::process::exit(1);
            }
        }
        Commands::Test { files } => {
            if !run_tests(&files, &engine_config) {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let loaded = config::load(cli.config.as_deref())?;
    match &loaded.source {
        ConfigSource::File(path) => log::info!("Using config at: {}", path.display()),
        ConfigSource::Default => log::debug!("No config found, using defaults"),
    }
    let mut engine_config = loaded.engine;
    if let Some(precision) = cli.precision {
        engine_config.precision = precision;
    }
    if cli.max_passes.is_some() {
        engine_config.max_passes = cli.max_passes;
    }
    Ok(engine_config)
}

fn read_file(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Error reading {}", file.display()))
}

fn print_entries<I, S>(entries: I, engine_config: EngineConfig, json: bool) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut engine = Engine::with_config(engine_config);
    let report = engine.load(entries);
    if !report.converged {
        eprintln!("warning: some bindings did not settle and were marked unevaluable");
    }
    let snapshot = Snapshot::capture(&engine, 0);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    let width = snapshot
        .entries
        .iter()
        .map(|view| view.display_text.chars().count())
        .max()
        .unwrap_or(0);
    for view in &snapshot.entries {
        println!("{:<width$}  {}", view.display_text, view.rendered_value);
    }
    Ok(())
}

/// Returns whether every line parses.
fn check_file(file: &Path, content: &str) -> bool {
    let mut clean = true;
    for (line_index, line) in content.lines().enumerate() {
        let classification = classify(line);
        let expression = classification.expression();
        if expression.is_empty() {
            continue;
        }
        let diagnostics = math::diagnose(expression);
        if !diagnostics.is_empty() {
            clean = false;
            let filename = format!("{}:{}", file.display(), line_index + 1);
            report_errors(&diagnostics, &filename, expression);
        }
    }
    if clean {
        eprintln!("{}: ok", file.display());
    }
    clean
}

fn report_errors(diagnostics: &[Diagnostic], filename: &str, source_code: &str) {
    for diagnostic in diagnostics {
        let report = Report::build(ReportKind::Error, (filename, diagnostic.span.clone()))
            .with_config(Config::default().with_color(false))
            .with_message(&diagnostic.message)
            .with_label(
                Label::new((filename, diagnostic.span.clone())).with_message(&diagnostic.reason),
            )
            .finish();
        if let Err(error) = report.eprint((filename, Source::from(source_code))) {
            log::error!("Failed to print report: {error}");
        }
    }
}

/// Returns whether every test passed.
fn run_tests(files: &[PathBuf], engine_config: &EngineConfig) -> bool {
    let mut total = 0;
    let mut passed = 0;
    let mut failed = 0;

    for file in files {
        let cases = read_file(file).and_then(|content| test_file::parse_test_file(&content));
        let cases = match cases {
            Ok(cases) => cases,
            Err(error) => {
                eprintln!("Error in {}: {error:#}", file.display());
                failed += 1;
                continue;
            }
        };
        eprintln!("{}", file.display());
        for case in &cases {
            total += 1;
            if run_single_test(case, engine_config) {
                passed += 1;
            } else {
                failed += 1;
            }
        }
    }

    eprintln!("\n{total} tests: {passed} passed, {failed} failed");
    failed == 0
}

fn run_single_test(case: &test_file::TestCase, engine_config: &EngineConfig) -> bool {
    eprint!("  {} ... ", case.name);
    let actual = match test_file::run_case(case, engine_config) {
        Ok(actual) => actual,
        Err(error) => {
            eprintln!("FAILED: {error:#}");
            return false;
        }
    };
    let Some(expected) = &case.expected else {
        // No expected value - just check it runs
        eprintln!("ok ({actual})");
        return true;
    };
    match serde_json::from_str::<serde_json::Value>(expected) {
        Ok(expected_value) if expected_value == actual => {
            eprintln!("ok");
            true
        }
        Ok(_) => {
            eprintln!("FAILED");
            eprintln!("    expected: {expected}");
            eprintln!("    actual:   {actual}");
            false
        }
        Err(error) => {
            eprintln!("FAILED (invalid expected JSON: {error})");
            false
        }
    }
}
