//! Utilities for the results module.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::{borrow::Cow, fs, path::Path, result::Result as StdResult};

/// Structure to store the fingerprint of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerPrint {
    md5: [u8; 16],
    sha1: [u8; 20],
    sha256: [u8; 32],
}

impl FingerPrint {
    /// Creates a new fingerprint from the package in the given path.
    pub fn new<P: AsRef<Path>>(package: P) -> Result<Self> {
        let package = package.as_ref();
        let buffer = fs::read(package)
            .with_context(|| format!("could not read {} to fingerprint it", package.display()))?;

        Ok(Self::from_bytes(&buffer))
    }

    /// Creates the fingerprint of the given contents.
    pub fn from_bytes(contents: &[u8]) -> Self {
        let mut fingerprint = Self {
            md5: md5::compute(contents).0,
            sha1: [0; 20],
            sha256: [0; 32],
        };

        fingerprint
            .sha1
            .copy_from_slice(Sha1::digest(contents).as_slice());
        fingerprint
            .sha256
            .copy_from_slice(Sha256::digest(contents).as_slice());

        fingerprint
    }

    /// Gets the hex encoded MD5 digest.
    pub fn md5(&self) -> String {
        hex::encode(self.md5)
    }

    /// Gets the hex encoded SHA-1 digest.
    pub fn sha1(&self) -> String {
        hex::encode(self.sha1)
    }

    /// Gets the hex encoded SHA-256 digest.
    pub fn sha256(&self) -> String {
        hex::encode(self.sha256)
    }
}

impl Serialize for FingerPrint {
    fn serialize<S>(&self, serializer: S) -> StdResult<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut ser_struct = serializer.serialize_struct("fingerprint", 3)?;
        ser_struct.serialize_field("md5", &self.md5())?;
        ser_struct.serialize_field("sha1", &self.sha1())?;
        ser_struct.serialize_field("sha256", &self.sha256())?;
        ser_struct.end()
    }
}

/// Escapes the given input's HTML special characters.
///
/// It changes the following characters:
///  - `<` => `&lt;`
///  - `>` => `&gt;`
///  - `&` => `&amp;`
///  - `"` => `&quot;`
///  - `'` => `&#x27;`
pub fn html_escape<'a, S: Into<Cow<'a, str>>>(input: S) -> Cow<'a, str> {
    lazy_static! {
        static ref REGEX: Regex = Regex::new("[<>&\"']").unwrap();
    }
    let input = input.into();
    let mut last_match = 0;

    if REGEX.is_match(&input) {
        let matches = REGEX.find_iter(&input);
        let mut output = String::with_capacity(input.len());
        for m in matches {
            output.push_str(&input[last_match..m.start()]);
            match m.as_str() {
                "<" => output.push_str("&lt;"),
                ">" => output.push_str("&gt;"),
                "&" => output.push_str("&amp;"),
                "\"" => output.push_str("&quot;"),
                "'" => output.push_str("&#x27;"),
                _ => unreachable!(),
            }
            last_match = m.end();
        }
        output.push_str(&input[last_match..]);
        Cow::Owned(output)
    } else {
        input
    }
}
