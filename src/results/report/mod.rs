//! Report module.
//!
//! The report is the outcome of the analysis of one package. It is persisted as JSON and
//! rendered as an HTML page with handlebars.

pub mod handlebars;
mod json;

use crate::risk::{risk_score, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use self::json::report_path;

/// Privacy report of an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    app_name: String,
    package: String,
    permissions: BTreeSet<String>,
    risky_permissions: BTreeSet<String>,
    insecure_apis: Vec<String>,
    risk_score: u32,
    risk_level: RiskLevel,
}

impl Report {
    /// Creates a new report, scoring the given findings.
    pub fn new<N, P>(
        app_name: N,
        package: P,
        permissions: BTreeSet<String>,
        risky_permissions: BTreeSet<String>,
        insecure_apis: Vec<String>,
    ) -> Self
    where
        N: Into<String>,
        P: Into<String>,
    {
        let risk_score = risk_score(risky_permissions.len(), insecure_apis.len());

        Self {
            app_name: app_name.into(),
            package: package.into(),
            permissions,
            risky_permissions,
            insecure_apis,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
        }
    }

    /// Gets the display name of the application.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Gets the package name of the application.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Gets every requested permission.
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    /// Gets the requested permissions that are dangerous.
    pub fn risky_permissions(&self) -> &BTreeSet<String> {
        &self.risky_permissions
    }

    /// Gets the signatures of the insecure API usages, one per rule match.
    pub fn insecure_apis(&self) -> &[String] {
        &self.insecure_apis
    }

    /// Gets the risk score.
    pub fn risk_score(&self) -> u32 {
        self.risk_score
    }

    /// Gets the risk level.
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }
}
