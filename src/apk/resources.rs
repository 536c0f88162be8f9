//! Compiled resource table (`resources.arsc`) lookups.
//!
//! Only simple values are kept: strings and references to other resources, which is all the
//! analyzer needs to resolve the application label.

use super::run_decoder;
use abxml::{
    chunks::{PackageWrapper, StringTableWrapper, TableTypeWrapper},
    model::{owned::Entry, Configuration, StringTable, TableType, Value},
    visitor::{ChunkVisitor, Executor, Origin},
};
use anyhow::Result;
use failure::{bail, format_err};
use log::debug;
use std::collections::HashMap;

/// Maximum number of references followed when resolving a value.
const MAX_REFERENCE_DEPTH: usize = 8;

/// Simple value of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResourceValue {
    String(String),
    Reference(u32),
}

/// How close a configuration is to the default one. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ConfigRank {
    /// No qualifier at all.
    Default,
    /// Qualifiers other than the locale, such as screen density.
    LocaleAgnostic,
    /// Locale specific.
    Localized,
}

impl ConfigRank {
    fn of<C: Configuration>(config: &C) -> Result<Self, failure::Error> {
        if config.get_language()? != "any" || config.get_region()? != "any" {
            return Ok(ConfigRank::Localized);
        }

        let qualified = config.get_mcc()? != 0
            || config.get_mnc()? != 0
            || config.get_orientation()? != 0
            || config.get_density()? != 0
            || config.get_width()? != 0
            || config.get_height()? != 0
            || config.get_sdk_version()? != 0;
        Ok(if qualified {
            ConfigRank::LocaleAgnostic
        } else {
            ConfigRank::Default
        })
    }
}

/// Collects the simple values of every type chunk in the table.
#[derive(Debug, Default)]
struct ResourceVisitor<'a> {
    strings: Option<StringTableWrapper<'a>>,
    package_id: Option<u32>,
    values: HashMap<u32, (ConfigRank, ResourceValue)>,
    error: Option<failure::Error>,
}

impl<'a> ResourceVisitor<'a> {
    fn fail(&mut self, error: failure::Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn table_type(&mut self, table_type: &TableTypeWrapper<'a>) -> Result<(), failure::Error> {
        let strings = self
            .strings
            .as_ref()
            .ok_or_else(|| format_err!("resource type found before the string pool"))?;
        let package_id = self
            .package_id
            .ok_or_else(|| format_err!("resource type found outside of a package"))?;
        let type_id = u32::from(table_type.get_id()?);
        let rank = ConfigRank::of(&table_type.get_configuration()?)?;

        for entry in table_type.get_entries()? {
            let simple = match entry {
                Entry::Simple(simple) => simple,
                Entry::Empty(_, _) | Entry::Complex(_) => continue,
            };
            let value = match Value::create(simple.get_type(), simple.get_value()) {
                Ok(Value::StringReference(index)) => {
                    ResourceValue::String(strings.get_string(index)?.to_string())
                }
                Ok(Value::ReferenceId(id)) => ResourceValue::Reference(id),
                _ => continue,
            };

            let id = (package_id << 24) | (type_id << 16) | (simple.get_id() & 0xffff);
            let better = self
                .values
                .get(&id)
                .map_or(true, |(existing, _)| rank < *existing);
            if better {
                let _ = self.values.insert(id, (rank, value));
            }
        }

        Ok(())
    }
}

impl<'a> ChunkVisitor<'a> for ResourceVisitor<'a> {
    fn visit_string_table(&mut self, string_table: StringTableWrapper<'a>, origin: Origin) {
        // Type and key names are not needed to resolve values by ID.
        if origin == Origin::Global && self.strings.is_none() {
            self.strings = Some(string_table);
        }
    }

    fn visit_package(&mut self, package: PackageWrapper<'a>) {
        match package.get_id() {
            Ok(id) if id <= 0xff => self.package_id = Some(id),
            Ok(id) => self.fail(format_err!("invalid resource package ID 0x{:x}", id)),
            Err(e) => self.fail(e),
        }
    }

    fn visit_table_type(&mut self, table_type: TableTypeWrapper<'a>) {
        if self.error.is_some() {
            return;
        }

        if let Err(e) = self.table_type(&table_type) {
            self.fail(e);
        }
    }
}

/// Decoded resource table.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    values: HashMap<u32, (ConfigRank, ResourceValue)>,
}

impl ResourceTable {
    /// Decodes a resource table.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut visitor = ResourceVisitor::default();
        run_decoder(|| {
            Executor::arsc(data, &mut visitor)?;
            if visitor.package_id.is_none() {
                bail!("the resource table has no package");
            }
            match visitor.error.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })?;

        debug!(
            "decoded {} simple resources from the resource table",
            visitor.values.len()
        );
        Ok(Self {
            values: visitor.values,
        })
    }

    /// Resolves the resource with the given ID to a string, following references.
    ///
    /// The value of the configuration closest to the default one is used. Returns `None` if the
    /// resource does not exist, is not a string, or references form a chain that is too long.
    pub fn resolve_string(&self, start: u32) -> Option<&str> {
        let mut id = start;
        for _ in 0..=MAX_REFERENCE_DEPTH {
            match self.values.get(&id) {
                Some((_, ResourceValue::String(s))) => return Some(s.as_str()),
                Some((_, ResourceValue::Reference(next))) => id = *next,
                None => return None,
            }
        }

        debug!("reference chain starting at 0x{:08x} is too long", start);
        None
    }
}
