//! Module containing the permission analysis logic.

mod permission;

use log::debug;
pub use permission::DangerousPermission;
use std::{collections::BTreeSet, str::FromStr};

/// Permissions requested by the application, and the dangerous ones among them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionAnalysis {
    requested: BTreeSet<String>,
    risky: BTreeSet<String>,
}

impl PermissionAnalysis {
    /// Gets every requested permission, without duplicates.
    pub fn requested(&self) -> &BTreeSet<String> {
        &self.requested
    }

    /// Gets the requested permissions that are dangerous.
    pub fn risky(&self) -> &BTreeSet<String> {
        &self.risky
    }

    /// Splits the analysis into requested and risky permissions.
    pub fn into_parts(self) -> (BTreeSet<String>, BTreeSet<String>) {
        (self.requested, self.risky)
    }
}

/// Performs the permission analysis.
///
/// Duplicate declarations are merged, and declaration order does not change the result.
pub fn analysis<S: AsRef<str>>(permissions: &[S]) -> PermissionAnalysis {
    let requested: BTreeSet<String> = permissions
        .iter()
        .map(|permission| permission.as_ref().to_owned())
        .collect();

    let risky = requested
        .iter()
        .filter(|permission| match DangerousPermission::from_str(permission) {
            Ok(dangerous) => {
                debug!(
                    "the application requests {}, which gives access to the {}",
                    dangerous,
                    dangerous.description()
                );
                true
            }
            Err(_) => false,
        })
        .cloned()
        .collect();

    PermissionAnalysis { requested, risky }
}
