//! Risk scoring of an analyzed application.

use crate::error::ErrorKind;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{convert::TryFrom, fmt, str::FromStr};

/// Weight of every dangerous permission requested by the application.
pub const PERMISSION_WEIGHT: u32 = 2;
/// Weight of every insecure API usage found in the application code.
pub const INSECURE_API_WEIGHT: u32 = 3;
/// Scores above this threshold are considered high risk.
pub const HIGH_RISK_THRESHOLD: u32 = 10;
/// Scores above this threshold (and not above the high one) are considered medium risk.
pub const MEDIUM_RISK_THRESHOLD: u32 = 5;

/// Computes the risk score for the given number of findings.
pub fn risk_score(risky_permissions: usize, insecure_apis: usize) -> u32 {
    let permissions = u32::try_from(risky_permissions).unwrap_or(u32::MAX);
    let apis = u32::try_from(insecure_apis).unwrap_or(u32::MAX);

    permissions
        .saturating_mul(PERMISSION_WEIGHT)
        .saturating_add(apis.saturating_mul(INSECURE_API_WEIGHT))
}

/// Risk level of an application.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
}

impl RiskLevel {
    /// Classifies the given risk score.
    pub fn from_score(score: u32) -> Self {
        if score > HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if score > MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Gets the name of the level as shown in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(RiskLevel::High),
            "medium" => Ok(RiskLevel::Medium),
            "low" => Ok(RiskLevel::Low),
            _ => Err(ErrorKind::parse(format!("unknown risk level `{}`", s))),
        }
    }
}

impl Serialize for RiskLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level = String::deserialize(de)?;
        RiskLevel::from_str(&level).map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&level), &"Low, Medium or High")
        })
    }
}
