//! Results module.
//!
//! Holds the outcome of the analysis of a package along with the data shown in the result page.

pub mod report;
mod utils;

use chrono::{DateTime, Local};
use clap::crate_version;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::result::Result as StdResult;

pub use self::{
    report::{report_path, Report},
    utils::{html_escape, FingerPrint},
};

/// Results of the analysis of one package.
#[derive(Debug, Clone)]
pub struct Results {
    report: Report,
    fingerprint: FingerPrint,
    version_name: Option<String>,
    generated_at: DateTime<Local>,
}

impl Results {
    /// Creates the results for the given report.
    pub fn new(report: Report, fingerprint: FingerPrint, version_name: Option<String>) -> Self {
        Self {
            report,
            fingerprint,
            version_name,
            generated_at: Local::now(),
        }
    }

    /// Gets the report.
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Gets the fingerprint of the analyzed package.
    pub fn fingerprint(&self) -> &FingerPrint {
        &self.fingerprint
    }

    /// Gets the version name declared by the package, if any.
    pub fn version_name(&self) -> Option<&str> {
        self.version_name.as_deref()
    }

    /// Gets the URL the report can be downloaded from.
    pub fn download_url(&self) -> String {
        format!("/reports/{}.json", self.report.package())
    }

    /// Gets the bars of the result chart, as `(label, value)` pairs.
    fn chart(&self) -> [(&'static str, u64); 4] {
        [
            ("Permissions", self.report.permissions().len() as u64),
            (
                "Risky permissions",
                self.report.risky_permissions().len() as u64,
            ),
            ("Insecure APIs", self.report.insecure_apis().len() as u64),
            ("Risk score", u64::from(self.report.risk_score())),
        ]
    }
}

/// Bar of the result chart.
struct ChartBar {
    label: &'static str,
    value: u64,
    percent: u64,
}

impl Serialize for ChartBar {
    fn serialize<S>(&self, serializer: S) -> StdResult<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut ser_struct = serializer.serialize_struct("ChartBar", 3)?;
        ser_struct.serialize_field("label", self.label)?;
        ser_struct.serialize_field("value", &self.value)?;
        ser_struct.serialize_field("percent", &self.percent)?;
        ser_struct.end()
    }
}

impl Serialize for Results {
    fn serialize<S>(&self, serializer: S) -> StdResult<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let now = self.generated_at;
        let report = &self.report;

        let chart = self.chart();
        let max = chart.iter().map(|(_, value)| *value).max().unwrap_or(0).max(1);
        let chart: Vec<_> = chart
            .iter()
            .map(|&(label, value)| ChartBar {
                label,
                value,
                percent: value * 100 / max,
            })
            .collect();

        let mut ser_struct = serializer.serialize_struct("Results", 18)?;

        ser_struct.serialize_field("analyzer_version", crate_version!())?;
        ser_struct.serialize_field("now_rfc2822", &now.to_rfc2822())?;
        ser_struct.serialize_field("now_rfc3339", &now.to_rfc3339())?;

        ser_struct.serialize_field("app_name", report.app_name())?;
        ser_struct.serialize_field("package", report.package())?;
        ser_struct.serialize_field("version_name", &self.version_name)?;
        ser_struct.serialize_field("fingerprint", &self.fingerprint)?;

        ser_struct.serialize_field("permissions", report.permissions())?;
        ser_struct.serialize_field("permissions_len", &report.permissions().len())?;
        ser_struct.serialize_field("risky_permissions", report.risky_permissions())?;
        ser_struct.serialize_field("risky_permissions_len", &report.risky_permissions().len())?;
        ser_struct.serialize_field("insecure_apis", report.insecure_apis())?;
        ser_struct.serialize_field("insecure_apis_len", &report.insecure_apis().len())?;

        ser_struct.serialize_field("risk_score", &report.risk_score())?;
        ser_struct.serialize_field("risk_level", &report.risk_level())?;
        ser_struct.serialize_field(
            "risk_class",
            &report.risk_level().as_str().to_lowercase(),
        )?;
        ser_struct.serialize_field("chart", &chart)?;
        ser_struct.serialize_field("download_url", &self.download_url())?;

        ser_struct.end()
    }
}
