//! `uni-validate-config`: check a provider configuration file before deploying it.
//!
//! Usage:
//!
//! ```text
//! uni-validate-config <config.json> [--strict] [--quiet]
//! ```
//!
//! Exit codes: `0` valid, `1` invalid (or warnings under `--strict`),
//! `2` the file could not be read or parsed.

use std::process;
use uni_integrator::validation::{ValidationReport, validate_config};

const EXIT_VALID: i32 = 0;
const EXIT_INVALID: i32 = 1;
const EXIT_UNREADABLE: i32 = 2;

fn print_usage() {
    eprintln!("Usage: uni-validate-config <config.json> [OPTIONS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <config.json>  Path to the configuration JSON file");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --strict       Treat warnings as errors");
    eprintln!("  --quiet        Only print errors");
    eprintln!("  --help         Show this message");
}

struct Args {
    config_path: String,
    strict: bool,
    quiet: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(EXIT_UNREADABLE);
        }
    };

    let config = match load(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            process::exit(EXIT_UNREADABLE);
        }
    };

    let report = validate_config(&config);
    process::exit(print_report(&report, &args));
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut config_path: Option<String> = None;
    let mut strict = false;
    let mut quiet = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "--strict" => strict = true,
            "--quiet" | "-q" => quiet = true,
            _ if arg.starts_with('-') => anyhow::bail!("Unknown option: {arg}"),
            _ => {
                if config_path.is_some() {
                    anyhow::bail!("Unexpected argument: {arg}");
                }
                config_path = Some(arg);
            }
        }
    }

    let config_path = config_path.ok_or_else(|| {
        print_usage();
        anyhow::anyhow!("Missing required argument: <config.json>")
    })?;

    Ok(Some(Args {
        config_path,
        strict,
        quiet,
    }))
}

fn load(path: &str) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{path}': {e}"))?;
    serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("Failed to parse '{path}': {e}"))
}

fn print_report(report: &ValidationReport, args: &Args) -> i32 {
    for error in &report.errors {
        println!("ERROR: {error}");
    }

    if !args.quiet || args.strict {
        for warning in &report.warnings {
            println!("WARNING: {warning}");
        }
    }

    if !report.valid {
        return EXIT_INVALID;
    }
    if args.strict && !report.warnings.is_empty() {
        println!("ERROR: warnings are not allowed in --strict mode");
        return EXIT_INVALID;
    }

    if !args.quiet {
        let providers: Vec<&str> = report
            .settings
            .as_ref()
            .map(|s| s.provider_names())
            .unwrap_or_default();
        println!("OK: Configuration valid. Providers: {providers:?}");
    }
    EXIT_VALID
}
