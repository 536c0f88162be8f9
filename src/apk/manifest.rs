//! Android manifest information needed by the analysis.
//!
//! The binary XML is walked with the `abxml` chunk visitor. Only start tags are kept, which is
//! all the manifest extraction looks at.

use super::run_decoder;
use crate::error::ErrorKind;
use abxml::{
    chunks::{ResourceWrapper, StringTableWrapper, XmlTagStartWrapper},
    model::{AttributeTrait, StringTable, TagStart, Value},
    visitor::{ChunkVisitor, Executor, Origin},
};
use anyhow::{bail, Result};
use failure::format_err;
use log::debug;
use std::{convert::TryInto, io::Cursor};

/// Tags that declare a permission request.
const PERMISSION_TAGS: &[&str] = &["uses-permission", "uses-permission-sdk-23"];

/// Index used in the format to represent "no string".
const NO_INDEX: u32 = 0xffff_ffff;

/// Namespace of the Android specific attributes.
pub const ANDROID_NAMESPACE: &str = "http://schemas.android.com/apk/res/android";

/// Framework attributes the analysis reads, by resource ID.
///
/// Obfuscators rename or empty the attribute names in the string pool, but the resource map
/// still has to carry the real IDs for the platform to read the manifest.
const FRAMEWORK_ATTRIBUTES: &[(u32, &str)] = &[
    (0x0101_0001, "label"),
    (0x0101_0003, "name"),
    (0x0101_021c, "versionName"),
];

/// Decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Literal string.
    String(String),
    /// Reference to a resource, to be resolved with the resource table.
    Reference(u32),
    /// Any other typed value, formatted.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Attribute {
    namespace: Option<String>,
    name: String,
    value: AttributeValue,
}

/// Element start tag with its attributes.
#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    attributes: Vec<Attribute>,
}

impl Element {
    /// Finds an attribute by local name, preferring the one in the Android namespace.
    fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        let mut candidates = self.attributes.iter().filter(|a| a.name == name);
        let first = candidates.next()?;
        if first.namespace.as_deref() == Some(ANDROID_NAMESPACE) {
            return Some(&first.value);
        }

        Some(
            &candidates
                .find(|a| a.namespace.as_deref() == Some(ANDROID_NAMESPACE))
                .unwrap_or(first)
                .value,
        )
    }
}

/// Collects the start tags of a binary XML document.
#[derive(Debug, Default)]
struct ManifestVisitor<'a> {
    strings: Option<StringTableWrapper<'a>>,
    resource_ids: Vec<u32>,
    elements: Vec<Element>,
    error: Option<failure::Error>,
}

impl<'a> ManifestVisitor<'a> {
    fn element(&self, tag: &XmlTagStartWrapper<'a>) -> Result<Element, failure::Error> {
        let strings = self
            .strings
            .as_ref()
            .ok_or_else(|| format_err!("XML element found before the string pool"))?;
        let tag_name = strings.get_string(tag.get_element_name_index()?)?;

        let mut attributes = Vec::new();
        for i in 0..tag.get_attributes_amount()? {
            let attribute = tag.get_attribute(i)?;
            let namespace = match attribute.get_namespace()? {
                NO_INDEX => None,
                index => Some(strings.get_string(index)?.to_string()),
            };
            let name_index = attribute.get_name()?;
            let name = match self.framework_name(name_index) {
                Some(name) => name.to_owned(),
                None => strings.get_string(name_index)?.to_string(),
            };
            let value = match attribute.get_value()? {
                Value::StringReference(index) => {
                    AttributeValue::String(strings.get_string(index)?.to_string())
                }
                Value::ReferenceId(id) => AttributeValue::Reference(id),
                other => AttributeValue::Other(other.to_string()),
            };

            attributes.push(Attribute {
                namespace,
                name,
                value,
            });
        }

        Ok(Element {
            name: tag_name.to_string(),
            attributes,
        })
    }

    /// Names the attribute after its framework resource ID, if the resource map has one.
    fn framework_name(&self, name_index: u32) -> Option<&'static str> {
        let id = self.resource_ids.get(name_index as usize)?;
        FRAMEWORK_ATTRIBUTES
            .iter()
            .find(|(framework_id, _)| framework_id == id)
            .map(|(_, name)| *name)
    }
}

impl<'a> ChunkVisitor<'a> for ManifestVisitor<'a> {
    fn visit_string_table(&mut self, string_table: StringTableWrapper<'a>, _origin: Origin) {
        if self.strings.is_none() {
            self.strings = Some(string_table);
        }
    }

    fn visit_resource(&mut self, resource: ResourceWrapper<'a>) {
        match resource.get_resources() {
            Ok(ids) => self.resource_ids = ids,
            Err(e) => debug!("ignoring an unreadable resource map: {}", e),
        }
    }

    fn visit_xml_tag_start(&mut self, tag_start: XmlTagStartWrapper<'a>) {
        if self.error.is_some() {
            return;
        }

        match self.element(&tag_start) {
            Ok(element) => self.elements.push(element),
            Err(e) => self.error = Some(e),
        }
    }
}

/// Decoded `AndroidManifest.xml`.
#[derive(Debug, Clone)]
pub struct AndroidManifest {
    package: String,
    label: Option<AttributeValue>,
    version_name: Option<String>,
    permissions: Vec<String>,
}

impl AndroidManifest {
    /// Decodes a binary manifest.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let declared = data
            .get(4..8)
            .and_then(|size| size.try_into().ok())
            .map(u32::from_le_bytes);
        if let Some(size) = declared {
            if size as usize > data.len() {
                bail!(ErrorKind::parse(format!(
                    "the document declares {} bytes, but only {} are available",
                    size,
                    data.len()
                )));
            }
        }

        let mut visitor = ManifestVisitor::default();
        run_decoder(|| {
            Executor::xml(Cursor::new(data), &mut visitor)?;
            match visitor.error.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })?;

        Self::from_elements(&visitor.elements)
    }

    fn from_elements(elements: &[Element]) -> Result<Self> {
        let mut elements = elements.iter();
        let root = match elements.next() {
            Some(root) if root.name == "manifest" => root,
            Some(root) => bail!(ErrorKind::parse(format!(
                "the root element of the manifest is `{}`",
                root.name
            ))),
            None => bail!(ErrorKind::parse("the manifest is empty")),
        };

        let package = match root.attribute("package") {
            Some(AttributeValue::String(package)) if !package.is_empty() => package.clone(),
            _ => bail!(ErrorKind::parse(
                "the manifest does not declare a package name"
            )),
        };
        let version_name = match root.attribute("versionName") {
            Some(AttributeValue::String(version)) => Some(version.clone()),
            _ => None,
        };

        let mut label = None;
        let mut permissions = Vec::new();
        for element in elements {
            match element.name.as_str() {
                "application" if label.is_none() => {
                    label = element.attribute("label").cloned();
                }
                tag if PERMISSION_TAGS.contains(&tag) => match element.attribute("name") {
                    Some(AttributeValue::String(permission)) => {
                        permissions.push(permission.clone())
                    }
                    _ => debug!("ignoring a `{}` element without a name", tag),
                },
                _ => {}
            }
        }

        Ok(Self {
            package,
            label,
            version_name,
            permissions,
        })
    }

    /// Gets the package name.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Gets the application label, either literal or as a resource reference.
    pub fn label(&self) -> Option<&AttributeValue> {
        self.label.as_ref()
    }

    /// Gets the version name, if it is a literal string.
    pub fn version_name(&self) -> Option<&str> {
        self.version_name.as_deref()
    }

    /// Gets the requested permissions, in document order.
    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }
}
