//! Utilities module.
//!
//! Console output helpers shared by the command line and the web server.

use crate::{results::Report, risk::RiskLevel};
use colored::Colorize;
use lazy_static::lazy_static;
use log::{error, warn};
use regex::Regex;
use std::path::Path;

/// Prints a warning to `stderr` in yellow.
pub fn print_warning<S: AsRef<str>>(warning: S) {
    warn!("{}", warning.as_ref());
}

/// Prints the given error to `stderr` in red, followed by its causes.
#[allow(clippy::print_stdout)]
pub fn print_error(error: &anyhow::Error, verbose: bool) {
    error!("{}", error);

    for cause in error.chain().skip(1) {
        error!("Caused by: {}", cause);
    }

    if !verbose {
        println!(
            "If you need more information, try to run the program again with the {} flag.",
            "-v".bold()
        );
    }
}

/// Prints the summary of a report, colored by its risk level.
#[allow(clippy::print_stdout)]
pub fn print_report_summary<P: AsRef<Path>>(report: &Report, path: P) {
    let start = format!("{} risk", report.risk_level());
    let text = format!(
        "{} ({}) scored {}: {} dangerous permissions, {} insecure API usages.",
        report.app_name(),
        report.package(),
        report.risk_score(),
        report.risky_permissions().len(),
        report.insecure_apis().len()
    );
    let (start, text) = match report.risk_level() {
        RiskLevel::Low => (start.green(), text.green()),
        RiskLevel::Medium => (start.yellow(), text.yellow()),
        RiskLevel::High => (start.red(), text.red()),
    };

    println!("{} {}", start.bold(), text);
    println!("The report was written to {}.", path.as_ref().display());
}

/// Checks if the given string is a valid Java package name.
///
/// Only such names are used to name report files, so a report can never be written outside of
/// the reports folder.
pub fn is_valid_package_name(package: &str) -> bool {
    lazy_static! {
        static ref PACKAGE_NAME: Regex =
            Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)*$").unwrap();
    }

    PACKAGE_NAME.is_match(package)
}
