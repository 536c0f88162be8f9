//! Android package decoding.
//!
//! An APK is a ZIP archive with a binary XML manifest, an optional compiled resource table and
//! one or more DEX files. This module decodes just enough of them to know who the application
//! is, what it asks for and which methods its code touches.

pub mod dex;
pub mod manifest;
mod reader;
pub mod resources;

#[cfg(test)]
pub(crate) mod fixtures;

use self::{
    dex::DexFile,
    manifest::{AndroidManifest, AttributeValue},
    resources::ResourceTable,
};
pub use self::dex::MethodRef;
use crate::{error::ErrorKind, utils::print_warning};
use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Read, Seek},
    panic::{self, AssertUnwindSafe},
    path::Path,
};
use zip::{result::ZipError, ZipArchive};

const MANIFEST_ENTRY: &str = "AndroidManifest.xml";
const RESOURCES_ENTRY: &str = "resources.arsc";

lazy_static! {
    static ref DEX_ENTRY: Regex = Regex::new(r"^classes(\d*)\.dex$").unwrap();
}

/// Decoded Android package.
#[derive(Debug, Clone)]
pub struct Apk {
    manifest: AndroidManifest,
    resources: Option<ResourceTable>,
    methods: Vec<MethodRef>,
    dex_count: usize,
}

impl Apk {
    /// Opens and decodes the package at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("could not open package {}", path.display()))?;

        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("could not decode package {}", path.display()))
    }

    /// Decodes a package from any seekable source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(|e| {
            ErrorKind::parse(format!("the file is not a valid package archive: {}", e))
        })?;

        let manifest_data = read_entry(&mut archive, MANIFEST_ENTRY)?.ok_or_else(|| {
            ErrorKind::MissingEntry {
                name: MANIFEST_ENTRY.to_owned(),
            }
        })?;
        let manifest = AndroidManifest::parse(&manifest_data)
            .with_context(|| format!("could not decode {}", MANIFEST_ENTRY))?;

        let resources = match read_entry(&mut archive, RESOURCES_ENTRY)? {
            Some(data) => match ResourceTable::parse(&data) {
                Ok(table) => Some(table),
                Err(e) => {
                    print_warning(format!(
                        "could not decode {} of {}, the application name may not be \
                         resolved: {}",
                        RESOURCES_ENTRY,
                        manifest.package(),
                        e
                    ));
                    None
                }
            },
            None => None,
        };

        let dex_entries = dex_entries(archive.file_names());
        if dex_entries.is_empty() {
            print_warning(format!(
                "the package {} does not contain any DEX file",
                manifest.package()
            ));
        }

        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for entry in &dex_entries {
            let data =
                read_entry(&mut archive, entry)?.ok_or_else(|| ErrorKind::MissingEntry {
                    name: entry.clone(),
                })?;
            let dex =
                DexFile::parse(&data).with_context(|| format!("could not decode {}", entry))?;
            debug!("{} references {} methods", entry, dex.methods().len());

            for method in dex.into_methods() {
                if seen.insert(method.clone()) {
                    methods.push(method);
                }
            }
        }

        Ok(Self {
            manifest,
            resources,
            methods,
            dex_count: dex_entries.len(),
        })
    }

    /// Gets the package name.
    pub fn package(&self) -> &str {
        self.manifest.package()
    }

    /// Gets the display name of the application.
    ///
    /// Resource references are resolved with the resource table. If there is no usable label,
    /// the package name is returned.
    pub fn app_name(&self) -> String {
        let name = match self.manifest.label() {
            Some(AttributeValue::String(label)) => Some(label.as_str()),
            Some(AttributeValue::Reference(id)) => self
                .resources
                .as_ref()
                .and_then(|resources| resources.resolve_string(*id)),
            _ => None,
        };

        match name.filter(|name| !name.is_empty()) {
            Some(name) => name.to_owned(),
            None => {
                debug!(
                    "no label could be resolved for {}, using the package name",
                    self.package()
                );
                self.package().to_owned()
            }
        }
    }

    /// Gets the version name declared in the manifest, if any.
    pub fn version_name(&self) -> Option<&str> {
        self.manifest.version_name()
    }

    /// Gets the requested permissions, in manifest order.
    pub fn permissions(&self) -> &[String] {
        self.manifest.permissions()
    }

    /// Gets the methods defined or referenced by the code, each of them once.
    pub fn methods(&self) -> &[MethodRef] {
        &self.methods
    }

    /// Gets the number of DEX files in the package.
    pub fn dex_count(&self) -> usize {
        self.dex_count
    }
}

/// Runs an `abxml` decoder.
///
/// Chunk sizes are not checked against the buffer by the decoder, so a malformed entry can make it
/// panic. The panic is reported as a parse error.
fn run_decoder<F>(decode: F) -> Result<()>
where
    F: FnOnce() -> Result<(), failure::Error>,
{
    match panic::catch_unwind(AssertUnwindSafe(decode)) {
        Ok(result) => result.map_err(|e| ErrorKind::from(e).into()),
        Err(_) => bail!(ErrorKind::parse(
            "a chunk of the entry overflows the entry data"
        )),
    }
}

/// Reads a whole archive entry, returning `None` if it does not exist.
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => bail!(ErrorKind::parse(format!(
            "could not read the `{}` entry: {}",
            name, e
        ))),
    };

    let mut data = Vec::new();
    let _ = file
        .read_to_end(&mut data)
        .with_context(|| format!("could not read the `{}` entry", name))?;
    Ok(Some(data))
}

/// Selects the DEX entries of the archive, in loading order: `classes.dex`, `classes2.dex`...
fn dex_entries<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut entries: Vec<(u32, String)> = names
        .into_iter()
        .filter_map(|name| {
            let captures = DEX_ENTRY.captures(name)?;
            let number = match captures.get(1).map(|m| m.as_str()) {
                Some("") | None => 1,
                Some(number) => number.parse().ok()?,
            };
            Some((number, name.to_owned()))
        })
        .collect();
    entries.sort();

    entries.into_iter().map(|(_, name)| name).collect()
}
