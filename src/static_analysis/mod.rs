//! Static analysis for the manifest and the code of the application.
//!
//! The requested permissions are checked against the dangerous ones, and the method signatures
//! of the bytecode are searched for insecure API usages. Both findings are then scored.

pub mod code;
pub mod manifest;

use crate::{apk::Apk, results::Report};
use log::info;

/// Runs the analysis for the manifest and the code of the given package.
pub fn static_analysis(apk: &Apk) -> Report {
    // Run analysis for the permissions declared in the manifest.
    let (permissions, risky_permissions) = manifest::analysis(apk.permissions()).into_parts();

    // Run analysis for the methods in the bytecode.
    let insecure_apis = code::analysis(apk.methods());

    let report = Report::new(
        apk.app_name(),
        apk.package(),
        permissions,
        risky_permissions,
        insecure_apis,
    );
    info!(
        "{}: {} permissions, {} risky, {} insecure API usages, risk {} ({})",
        report.package(),
        report.permissions().len(),
        report.risky_permissions().len(),
        report.insecure_apis().len(),
        report.risk_level(),
        report.risk_score()
    );

    report
}
