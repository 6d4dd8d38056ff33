//! Gridcalc - run spreadsheet commands against the reactive engine

mod config;
mod error;
mod functions;
mod script;

use anyhow::Context;
use config::OutputMode;
use gridcalc_engine::engine::{RhaiFormulaParser, Sheet};
use script::Runner;
use std::env;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Usage: gridcalc [OPTIONS] [SCRIPT]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [SCRIPT]                  Command file to run (default: stdin)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --command <CMD>       Run a single command (can be repeated)");
    eprintln!("  -f, --functions <FILE>    Load custom Rhai functions (can be repeated)");
    eprintln!("  -o, --output <MODE>       Print the sheet afterwards: values or texts");
    eprintln!("  --config <FILE>           Read settings from FILE instead of config.toml");
    eprintln!("  --no-config               Ignore config.toml");
    eprintln!("  --no-default-functions    Do not load default.rhai");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  set <CELL> <TEXT>   clear <CELL>   get <CELL>   text <CELL>");
    eprintln!("  refs <CELL>         size           values       texts");
}

#[derive(Default)]
struct Args {
    script: Option<PathBuf>,
    commands: Vec<String>,
    functions: Vec<PathBuf>,
    output: Option<OutputMode>,
    config: Option<PathBuf>,
    no_config: bool,
    no_default_functions: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();

    let value_of = |i: usize, flag: &str, what: &str| -> String {
        match args.get(i) {
            Some(value) => value.clone(),
            None => {
                eprintln!("Error: {} requires {}", flag, what);
                std::process::exit(1);
            }
        }
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "-c" | "--command" => {
                i += 1;
                parsed.commands.push(value_of(i, "--command", "a command"));
            }
            "-f" | "--functions" => {
                i += 1;
                parsed
                    .functions
                    .push(PathBuf::from(value_of(i, "--functions", "a file path")));
            }
            "-o" | "--output" => {
                i += 1;
                match value_of(i, "--output", "a mode").parse::<OutputMode>() {
                    Ok(mode) => parsed.output = Some(mode),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                }
            }
            "--config" => {
                i += 1;
                parsed.config = Some(PathBuf::from(value_of(i, "--config", "a file path")));
            }
            "--no-config" => parsed.no_config = true,
            "--no-default-functions" => parsed.no_default_functions = true,
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if parsed.script.is_none() {
                    parsed.script = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    parsed
}

fn init_logging(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_env("GRIDCALC_LOG")
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_sheet(files: &[PathBuf]) -> anyhow::Result<Sheet> {
    let Some(script) = functions::load_functions(files)
        .context("Failed to load custom functions")?
    else {
        return Ok(Sheet::new());
    };
    let parser = RhaiFormulaParser::with_functions(&script)?;
    tracing::debug!(files = files.len(), "loaded custom functions");
    Ok(Sheet::with_parser(Box::new(parser)))
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let (config, warnings) = if args.no_config {
        (config::Config::default(), Vec::new())
    } else {
        config::load_config(args.config.as_deref())
    };
    init_logging(config.log_filter.as_deref());
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }

    let mut function_files = config.functions.clone();
    function_files.extend(args.functions.iter().cloned());
    functions::prepend_default_functions_if_present(&mut function_files, args.no_default_functions);

    let sheet = build_sheet(&function_files)?;
    let stdout = io::stdout();
    let mut runner = Runner::new(sheet, stdout.lock());

    if !args.commands.is_empty() {
        for (idx, command) in args.commands.iter().enumerate() {
            runner.run_reporting(idx + 1, command)?;
        }
    } else if let Some(path) = &args.script {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        runner.run_lines(BufReader::new(file))?;
    } else {
        runner.run_lines(io::stdin().lock())?;
    }

    let failures = runner.failures();
    let (sheet, mut out) = runner.into_parts();
    match args.output.or(config.output.mode) {
        Some(OutputMode::Values) => sheet.print_values(&mut out)?,
        Some(OutputMode::Texts) => sheet.print_texts(&mut out)?,
        None => {}
    }
    out.flush()?;

    if failures > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn main() -> ExitCode {
    let args = parse_args();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
