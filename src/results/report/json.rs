//! JSON report persistence module.

use super::Report;
use crate::{error::ErrorKind, utils::is_valid_package_name};
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::{Path, PathBuf},
};
use uuid::Uuid;

/// Gets the path of the report for the given package in the given folder.
///
/// Returns `None` if the package name is not valid, so that it can never point outside of the
/// folder.
pub fn report_path<P: AsRef<Path>>(folder: P, package: &str) -> Option<PathBuf> {
    if is_valid_package_name(package) {
        Some(folder.as_ref().join(format!("{}.json", package)))
    } else {
        None
    }
}

impl Report {
    /// Serializes the report as JSON, indented with four spaces.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut json = Vec::new();
        let mut serializer =
            Serializer::with_formatter(&mut json, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)
            .context("could not serialize the report")?;

        Ok(json)
    }

    /// Writes the report to `<folder>/<package>.json`, returning the path of the file.
    ///
    /// The report is first written to a temporary file in the same folder and then renamed, so
    /// an error never leaves a partial report behind.
    pub fn save<P: AsRef<Path>>(&self, folder: P) -> Result<PathBuf> {
        let folder = folder.as_ref();
        let path = report_path(folder, self.package()).ok_or_else(|| ErrorKind::InvalidPackage {
            package: self.package().to_owned(),
        })?;
        let json = self.to_json()?;

        fs::create_dir_all(folder).with_context(|| {
            format!("could not create the reports folder {}", folder.display())
        })?;

        let temp_path = folder.join(format!(".{}.{}.tmp", self.package(), Uuid::new_v4()));
        if let Err(e) = write_file(&temp_path, &json).and_then(|_| {
            fs::rename(&temp_path, &path)
                .with_context(|| format!("could not move the report to {}", path.display()))
        }) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        debug!("report for {} saved to {}", self.package(), path.display());
        Ok(path)
    }

    /// Loads a report previously saved as JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("could not open the report {}", path.display()))?;

        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid report {}", path.display()))
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .with_context(|| format!("could not write {}", path.display()))
}
