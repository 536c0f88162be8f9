//! Privacy Leak Analyzer
//!
//! Flags the dangerous permissions and the insecure API usages of Android applications, scores
//! their privacy risk and writes a JSON report for every analyzed package.

#![forbid(anonymous_parameters, unsafe_code)]
#![warn(
    clippy::all,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    variant_size_differences
)]

pub mod apk;
pub mod cli;
pub mod config;
pub mod error;
pub mod results;
pub mod risk;
pub mod server;
pub mod static_analysis;
pub mod utils;

use crate::{
    apk::Apk,
    config::Config,
    results::{FingerPrint, Results},
    static_analysis::static_analysis,
    utils::{print_error, print_report_summary, print_warning},
};
use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use env_logger::Builder;
use log::{info, Level, LevelFilter};
use std::{
    env,
    io::Write,
    path::{Path, PathBuf},
};

/// Initializes the config with the config files and command line options.
///
/// If a file is given with `--config`, that file is used. Otherwise, on UNIX, if the local file
/// (`config.toml`) does not exist but the global one does
/// (`/etc/privacy-leak-analyzer/config.toml`), the latter is used. Otherwise, the local file is
/// used. Finally, if none of the files could be loaded, the default config is used.
pub fn initialize_config(cli: &ArgMatches<'_>) -> Result<Config> {
    let config_path = PathBuf::from("config.toml");
    let global_config_path = PathBuf::from("/etc/privacy-leak-analyzer/config.toml");
    let cli_config_path = cli
        .value_of("config")
        .or_else(|| cli.subcommand().1.and_then(|sub| sub.value_of("config")));

    let mut config = if let Some(path) = cli_config_path {
        Config::from_file(path)
            .with_context(|| format!("there was an error when reading the {} file", path))?
    } else if cfg!(target_family = "unix") && !config_path.exists() && global_config_path.exists()
    {
        Config::from_file(&global_config_path).context(
            "there was an error when reading the /etc/privacy-leak-analyzer/config.toml file",
        )?
    } else if config_path.exists() {
        Config::from_file(&config_path)
            .context("there was an error when reading the config.toml file")?
    } else {
        print_warning("Config file not found. Using default configuration");
        Config::default()
    };

    for file in config.loaded_config_files() {
        info!("Loaded configuration from {}.", file.display());
    }
    config
        .decorate_with_cli(cli)
        .context("there was an error reading config from CLI")?;

    Ok(config)
}

/// Analyzes the package in the given path and saves its report.
///
/// Returns the results of the analysis and the path of the written report. Nothing is written if
/// the package can not be analyzed.
pub fn analyze_package<P: AsRef<Path>>(package: P, config: &Config) -> Result<(Results, PathBuf)> {
    let package = package.as_ref();

    let fingerprint = FingerPrint::new(package)?;
    let apk = Apk::open(package)?;
    let report = static_analysis(&apk);
    let report_path = report
        .save(config.reports_folder())
        .context("could not save the report")?;

    let results = Results::new(report, fingerprint, apk.version_name().map(str::to_owned));
    Ok((results, report_path))
}

/// Analyzes every package given in the command line, returning the number of failed analyses.
///
/// A failure is reported and the analysis continues with the next package.
pub fn analyze_packages(config: &Config) -> usize {
    let mut failures = 0;

    for package in config.packages() {
        info!("Starting analysis of {}.", package.display().to_string().italic());

        match analyze_package(package, config) {
            Ok((results, report_path)) => {
                if !config.is_quiet() {
                    print_report_summary(results.report(), &report_path);
                }
                if config.is_open() {
                    if let Err(e) = open::that(&report_path) {
                        print_warning(format!(
                            "could not open {}: {}",
                            report_path.display(),
                            e
                        ));
                    }
                }
            }
            Err(e) => {
                print_error(
                    &e.context(format!("the analysis of {} failed", package.display())),
                    config.is_verbose(),
                );
                failures += 1;
            }
        }
    }

    failures
}

/// Initializes the logger.
///
/// The default level is `info` for this crate, `debug` in verbose mode and `warn` in quiet
/// mode. The `RUST_LOG` environment variable overrides it.
pub fn initialize_logger(is_verbose: bool, is_quiet: bool) {
    let log_level = if is_verbose {
        LevelFilter::Debug
    } else if is_quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    let _ = builder.format(|buf, record| match record.level() {
        Level::Warn => writeln!(
            buf,
            "{}{}",
            "Warning: ".bold().yellow(),
            record.args().to_string().yellow()
        ),
        Level::Error => writeln!(
            buf,
            "{}{}",
            "Error: ".bold().red(),
            record.args().to_string().red()
        ),
        Level::Debug => writeln!(
            buf,
            "{}{}",
            "Debug: ".bold(),
            record.args().to_string().bold()
        ),
        Level::Info => writeln!(buf, "{}", record.args()),
        Level::Trace => writeln!(buf, "{}: {}", record.level(), record.args()),
    });

    if let Ok(env_log) = env::var("RUST_LOG") {
        let _ = builder.parse_filters(&env_log);
    } else {
        let _ = builder.filter(Some("privacy_leak_analyzer"), log_level);
    }

    if let Err(e) = builder.try_init() {
        eprintln!("Could not initialize logger: {}", e);
    }
}
