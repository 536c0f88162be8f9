//! Builders for the binary formats used by the tests, so that no binary blobs are checked in.

use std::io::{Cursor, Write};
use zip::{write::FileOptions, ZipWriter};

const NO_INDEX: u32 = 0xffff_ffff;
const ANDROID_PREFIX: &str = "android";
const ANDROID_NAMESPACE: &str = "http://schemas.android.com/apk/res/android";

/// Resource IDs of the framework attributes the builders know about.
const FRAMEWORK_ATTRIBUTES: &[(&str, u32)] = &[
    ("label", 0x0101_0001),
    ("icon", 0x0101_0002),
    ("name", 0x0101_0003),
    ("debuggable", 0x0101_000f),
    ("minSdkVersion", 0x0101_020c),
    ("versionCode", 0x0101_021b),
    ("versionName", 0x0101_021c),
    ("targetSdkVersion", 0x0101_0270),
];

fn push_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn pad_to_4(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

/// Wraps a body in a chunk with the given type and header.
fn chunk(kind: u16, header: &[u8], body: &[u8]) -> Vec<u8> {
    let header_size = 8 + header.len();
    let mut data = Vec::with_capacity(header_size + body.len());
    push_u16(&mut data, kind);
    push_u16(&mut data, header_size as u16);
    push_u32(&mut data, (header_size + body.len()) as u32);
    data.extend_from_slice(header);
    data.extend_from_slice(body);
    data
}

fn utf8_pool_length(buffer: &mut Vec<u8>, len: usize) {
    if len > 0x7f {
        buffer.push(0x80 | (len >> 8) as u8);
        buffer.push((len & 0xff) as u8);
    } else {
        buffer.push(len as u8);
    }
}

/// Builds a string pool chunk.
fn string_pool<S: AsRef<str>>(strings: &[S], utf8: bool) -> Vec<u8> {
    let mut offsets = Vec::with_capacity(strings.len() * 4);
    let mut data = Vec::new();
    for string in strings {
        let string = string.as_ref();
        push_u32(&mut offsets, data.len() as u32);
        if utf8 {
            utf8_pool_length(&mut data, string.encode_utf16().count());
            utf8_pool_length(&mut data, string.len());
            data.extend_from_slice(string.as_bytes());
            data.push(0);
        } else {
            let units: Vec<u16> = string.encode_utf16().collect();
            push_u16(&mut data, units.len() as u16);
            for unit in units {
                push_u16(&mut data, unit);
            }
            push_u16(&mut data, 0);
        }
    }
    pad_to_4(&mut data);

    let mut header = Vec::with_capacity(20);
    push_u32(&mut header, strings.len() as u32);
    push_u32(&mut header, 0);
    push_u32(&mut header, if utf8 { 1 << 8 } else { 0 });
    push_u32(&mut header, (28 + offsets.len()) as u32);
    push_u32(&mut header, 0);

    offsets.extend(data);
    chunk(0x0001, &header, &offsets)
}

/// Typed attribute value for the binary XML builder.
#[derive(Debug, Clone, Copy)]
pub enum FixtureValue<'a> {
    /// String literal.
    Str(&'a str),
    /// Resource reference.
    Reference(u32),
    /// Boolean.
    Bool(bool),
    /// Decimal integer.
    Int(i32),
}

#[derive(Debug, Clone)]
enum OwnedValue {
    Str(String),
    Typed(u8, u32),
}

#[derive(Debug, Clone)]
struct FixtureAttribute {
    android: bool,
    name: String,
    value: OwnedValue,
}

#[derive(Debug, Clone)]
enum Node {
    Start(String, Vec<FixtureAttribute>),
    End(String),
}

/// Builder of binary XML documents.
#[derive(Debug, Default)]
pub struct XmlBuilder {
    nodes: Vec<Node>,
    utf8: bool,
    renamed: Vec<(String, String)>,
    strip_attribute_names: bool,
}

impl XmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes the string pool in UTF-8.
    pub fn utf8(&mut self) -> &mut Self {
        self.utf8 = true;
        self
    }

    /// Replaces the names of framework attributes with empty strings, as obfuscators do.
    pub fn strip_attribute_names(&mut self) -> &mut Self {
        self.strip_attribute_names = true;
        self
    }

    /// Writes another name in the string pool for a framework attribute, keeping its resource ID.
    pub fn rename_attribute(&mut self, name: &str, pool_name: &str) -> &mut Self {
        self.renamed.push((name.to_owned(), pool_name.to_owned()));
        self
    }

    pub fn start(
        &mut self,
        name: &str,
        attributes: &[(Option<&str>, &str, FixtureValue<'_>)],
    ) -> &mut Self {
        let attributes = attributes
            .iter()
            .map(|(namespace, name, value)| FixtureAttribute {
                android: namespace.is_some(),
                name: (*name).to_owned(),
                value: match value {
                    FixtureValue::Str(s) => OwnedValue::Str((*s).to_owned()),
                    FixtureValue::Reference(id) => OwnedValue::Typed(0x01, *id),
                    FixtureValue::Bool(b) => {
                        OwnedValue::Typed(0x12, if *b { NO_INDEX } else { 0 })
                    }
                    FixtureValue::Int(i) => OwnedValue::Typed(0x10, *i as u32),
                },
            })
            .collect();
        self.nodes.push(Node::Start(name.to_owned(), attributes));
        self
    }

    pub fn end(&mut self, name: &str) -> &mut Self {
        self.nodes.push(Node::End(name.to_owned()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        // Framework attribute names go first, since the resource map covers a pool prefix.
        let mut mapped: Vec<(&str, u32)> = Vec::new();
        for node in &self.nodes {
            if let Node::Start(_, attributes) = node {
                for attribute in attributes.iter().filter(|a| a.android) {
                    let id = FRAMEWORK_ATTRIBUTES
                        .iter()
                        .find(|(name, _)| *name == attribute.name)
                        .map(|(_, id)| *id);
                    if let Some(id) = id {
                        if !mapped.iter().any(|(name, _)| *name == attribute.name) {
                            mapped.push((attribute.name.as_str(), id));
                        }
                    }
                }
            }
        }

        let mut strings: Vec<String> = mapped
            .iter()
            .map(|(name, _)| {
                if self.strip_attribute_names {
                    return String::new();
                }
                self.renamed
                    .iter()
                    .find(|(renamed, _)| renamed == name)
                    .map_or_else(|| (*name).to_owned(), |(_, pool_name)| pool_name.clone())
            })
            .collect();

        let intern = |strings: &mut Vec<String>, s: &str| -> u32 {
            if let Some(i) = mapped.iter().position(|(name, _)| *name == s) {
                return i as u32;
            }
            match strings.iter().skip(mapped.len()).position(|e| e == s) {
                Some(i) => (i + mapped.len()) as u32,
                None => {
                    strings.push(s.to_owned());
                    (strings.len() - 1) as u32
                }
            }
        };

        let prefix = intern(&mut strings, ANDROID_PREFIX);
        let uri = intern(&mut strings, ANDROID_NAMESPACE);

        let mut body = Vec::new();
        for node in &self.nodes {
            match node {
                Node::Start(name, attributes) => {
                    let mut ext = Vec::new();
                    push_u32(&mut ext, NO_INDEX);
                    push_u32(&mut ext, intern(&mut strings, name));
                    push_u16(&mut ext, 20);
                    push_u16(&mut ext, 20);
                    push_u16(&mut ext, attributes.len() as u16);
                    push_u16(&mut ext, 0);
                    push_u16(&mut ext, 0);
                    push_u16(&mut ext, 0);
                    for attribute in attributes {
                        let namespace = if attribute.android { uri } else { NO_INDEX };
                        let name = if attribute.android {
                            intern(&mut strings, &attribute.name)
                        } else {
                            // Plain attributes are never mapped, even if they share a name.
                            match strings
                                .iter()
                                .skip(mapped.len())
                                .position(|e| *e == attribute.name)
                            {
                                Some(i) => (i + mapped.len()) as u32,
                                None => {
                                    strings.push(attribute.name.clone());
                                    (strings.len() - 1) as u32
                                }
                            }
                        };
                        let (raw, data_type, data) = match &attribute.value {
                            OwnedValue::Str(s) => {
                                let index = intern(&mut strings, s);
                                (index, 0x03, index)
                            }
                            OwnedValue::Typed(data_type, data) => (NO_INDEX, *data_type, *data),
                        };
                        push_u32(&mut ext, namespace);
                        push_u32(&mut ext, name);
                        push_u32(&mut ext, raw);
                        push_u16(&mut ext, 8);
                        ext.push(0);
                        ext.push(data_type);
                        push_u32(&mut ext, data);
                    }
                    body.extend(chunk(0x0102, &node_header(), &ext));
                }
                Node::End(name) => {
                    let mut ext = Vec::new();
                    push_u32(&mut ext, NO_INDEX);
                    push_u32(&mut ext, intern(&mut strings, name));
                    body.extend(chunk(0x0103, &node_header(), &ext));
                }
            }
        }

        let mut namespace = Vec::new();
        push_u32(&mut namespace, prefix);
        push_u32(&mut namespace, uri);

        let mut resource_map = Vec::new();
        for (_, id) in &mapped {
            push_u32(&mut resource_map, *id);
        }

        let mut document = string_pool(&strings, self.utf8);
        document.extend(chunk(0x0180, &[], &resource_map));
        document.extend(chunk(0x0100, &node_header(), &namespace));
        document.extend(body);
        document.extend(chunk(0x0101, &node_header(), &namespace));

        chunk(0x0003, &[], &document)
    }
}

/// Line number and comment fields shared by every XML node chunk.
fn node_header() -> Vec<u8> {
    let mut header = Vec::with_capacity(8);
    push_u32(&mut header, 1);
    push_u32(&mut header, NO_INDEX);
    header
}

/// Builds a typical manifest with the given package, label and permissions.
pub fn manifest(package: &str, label: FixtureValue<'_>, permissions: &[&str]) -> Vec<u8> {
    let mut builder = XmlBuilder::new();
    builder.start(
        "manifest",
        &[
            (None, "package", FixtureValue::Str(package)),
            (Some(ANDROID_NAMESPACE), "versionCode", FixtureValue::Int(1)),
        ],
    );
    for permission in permissions {
        builder
            .start(
                "uses-permission",
                &[(
                    Some(ANDROID_NAMESPACE),
                    "name",
                    FixtureValue::Str(*permission),
                )],
            )
            .end("uses-permission");
    }
    builder
        .start(
            "application",
            &[(Some(ANDROID_NAMESPACE), "label", label)],
        )
        .end("application")
        .end("manifest")
        .build()
}

/// Entry of the resource table builder.
#[derive(Debug, Clone, Copy)]
pub enum FixtureEntry<'a> {
    /// String value.
    Str(&'a str),
    /// Reference to another resource.
    Reference(u32),
}

#[derive(Debug, Clone)]
struct FixtureConfig {
    locale: Option<(String, String)>,
    entries: Vec<Option<(u8, u32)>>,
}

/// Builder of resource tables with a single `0x7f` package holding `string` resources.
///
/// The entry at index `i` of a configuration gets the resource ID `0x7f01_0000 + i`.
#[derive(Debug, Default)]
pub struct TableBuilder {
    strings: Vec<String>,
    configs: Vec<FixtureConfig>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a configuration, with a locale such as `"es"` or `"pt-BR"`, or the default one.
    pub fn config(
        &mut self,
        locale: Option<&str>,
        entries: &[Option<FixtureEntry<'_>>],
    ) -> &mut Self {
        let locale = locale.map(|locale| {
            let mut parts = locale.splitn(2, '-');
            let language = parts.next().unwrap_or_default().to_owned();
            let country = parts.next().unwrap_or_default().to_owned();
            (language, country)
        });
        let entries = entries
            .iter()
            .map(|entry| {
                entry.map(|entry| match entry {
                    FixtureEntry::Str(s) => {
                        let index = match self.strings.iter().position(|e| e == s) {
                            Some(i) => i,
                            None => {
                                self.strings.push(s.to_owned());
                                self.strings.len() - 1
                            }
                        };
                        (0x03, index as u32)
                    }
                    FixtureEntry::Reference(id) => (0x01, id),
                })
            })
            .collect();
        self.configs.push(FixtureConfig { locale, entries });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let entry_count = self
            .configs
            .iter()
            .map(|config| config.entries.len())
            .max()
            .unwrap_or(0);
        let keys: Vec<String> = (0..entry_count).map(|i| format!("key_{}", i)).collect();

        let type_strings = string_pool(&["string"], false);
        let key_strings = string_pool(&keys, true);

        let mut spec_header = Vec::new();
        spec_header.push(1);
        spec_header.push(0);
        push_u16(&mut spec_header, self.configs.len() as u16);
        push_u32(&mut spec_header, entry_count as u32);
        let mut spec_body = Vec::new();
        for _ in 0..entry_count {
            push_u32(&mut spec_body, 0);
        }

        let mut package_body = Vec::new();
        package_body.extend_from_slice(&type_strings);
        package_body.extend_from_slice(&key_strings);
        package_body.extend(chunk(0x0202, &spec_header, &spec_body));
        for config in &self.configs {
            package_body.extend(self.type_chunk(config));
        }

        let mut package_header = Vec::with_capacity(280);
        push_u32(&mut package_header, 0x7f);
        let mut name: Vec<u16> = "com.example".encode_utf16().collect();
        name.resize(128, 0);
        for unit in name {
            push_u16(&mut package_header, unit);
        }
        push_u32(&mut package_header, 288);
        push_u32(&mut package_header, 1);
        push_u32(&mut package_header, (288 + type_strings.len()) as u32);
        push_u32(&mut package_header, entry_count as u32);
        push_u32(&mut package_header, 0);

        let mut table_body = string_pool(&self.strings, true);
        table_body.extend(chunk(0x0200, &package_header, &package_body));

        let mut table_header = Vec::new();
        push_u32(&mut table_header, 1);
        chunk(0x0002, &table_header, &table_body)
    }

    fn type_chunk(&self, config: &FixtureConfig) -> Vec<u8> {
        let mut entries = Vec::new();
        let mut offset_table = Vec::new();
        for (i, entry) in config.entries.iter().enumerate() {
            match entry {
                Some((data_type, data)) => {
                    push_u32(&mut offset_table, entries.len() as u32);
                    push_u16(&mut entries, 8);
                    push_u16(&mut entries, 0);
                    push_u32(&mut entries, i as u32);
                    push_u16(&mut entries, 8);
                    entries.push(0);
                    entries.push(*data_type);
                    push_u32(&mut entries, *data);
                }
                None => push_u32(&mut offset_table, NO_INDEX),
            }
        }

        let mut resource_config = Vec::with_capacity(64);
        push_u32(&mut resource_config, 64);
        push_u32(&mut resource_config, 0);
        let (language, country) = config
            .locale
            .clone()
            .unwrap_or_else(|| (String::new(), String::new()));
        for code in &[language, country] {
            let mut bytes = code.as_bytes().to_vec();
            bytes.resize(2, 0);
            resource_config.extend_from_slice(&bytes);
        }
        resource_config.resize(64, 0);

        let header_size = 8 + 12 + resource_config.len();
        let mut header = Vec::new();
        header.push(1);
        header.push(0);
        push_u16(&mut header, 0);
        push_u32(&mut header, config.entries.len() as u32);
        push_u32(&mut header, (header_size + offset_table.len()) as u32);
        header.extend(resource_config);

        offset_table.extend(entries);
        chunk(0x0201, &header, &offset_table)
    }
}

/// Builds a DEX file referencing the given methods, as `(class, name, return, parameters)`
/// with type descriptors.
pub fn dex(methods: &[(&str, &str, &str, &[&str])]) -> Vec<u8> {
    let mut strings: Vec<String> = Vec::new();
    for (class, name, return_type, parameters) in methods {
        let shorty = shorty(return_type, parameters);
        for s in [*class, *name, *return_type, shorty.as_str()]
            .iter()
            .copied()
            .chain(parameters.iter().copied())
        {
            if !strings.iter().any(|e| e == s) {
                strings.push(s.to_owned());
            }
        }
    }
    strings.sort();
    let string_index = |s: &str| strings.iter().position(|e| e == s).unwrap_or(0) as u32;

    let mut types: Vec<u32> = Vec::new();
    for (class, _, return_type, parameters) in methods {
        for t in [*class, *return_type].iter().chain(parameters.iter()) {
            let index = string_index(*t);
            if !types.contains(&index) {
                types.push(index);
            }
        }
    }
    types.sort_unstable();
    let type_index = |s: &str| {
        let index = string_index(s);
        types.iter().position(|e| *e == index).unwrap_or(0) as u32
    };

    let header_size = 0x70;
    let string_ids_off = header_size;
    let type_ids_off = string_ids_off + strings.len() * 4;
    let proto_ids_off = type_ids_off + types.len() * 4;
    let method_ids_off = proto_ids_off + methods.len() * 12;
    let data_off = method_ids_off + methods.len() * 8;

    // Data section: parameter type lists first, then string data.
    let mut data = Vec::new();
    let mut parameter_offsets = Vec::with_capacity(methods.len());
    for (_, _, _, parameters) in methods {
        if parameters.is_empty() {
            parameter_offsets.push(0);
            continue;
        }
        pad_to_4(&mut data);
        parameter_offsets.push((data_off + data.len()) as u32);
        push_u32(&mut data, parameters.len() as u32);
        for parameter in parameters.iter() {
            push_u16(&mut data, type_index(*parameter) as u16);
        }
    }
    let mut string_data_offsets = Vec::with_capacity(strings.len());
    for string in &strings {
        string_data_offsets.push((data_off + data.len()) as u32);
        data.push(string.encode_utf16().count() as u8);
        data.extend_from_slice(string.as_bytes());
        data.push(0);
    }

    let mut ids = Vec::new();
    for offset in &string_data_offsets {
        push_u32(&mut ids, *offset);
    }
    for string in &types {
        push_u32(&mut ids, *string);
    }
    for ((_, _, return_type, parameters), parameters_off) in
        methods.iter().zip(&parameter_offsets)
    {
        push_u32(&mut ids, string_index(shorty(return_type, parameters).as_str()));
        push_u32(&mut ids, type_index(*return_type));
        push_u32(&mut ids, *parameters_off);
    }
    for (i, (class, name, _, _)) in methods.iter().enumerate() {
        push_u16(&mut ids, type_index(*class) as u16);
        push_u16(&mut ids, i as u16);
        push_u32(&mut ids, string_index(*name));
    }

    let file_size = data_off + data.len();
    let mut file = Vec::with_capacity(file_size);
    file.extend_from_slice(b"dex\n035\0");
    file.resize(0x20, 0);
    push_u32(&mut file, file_size as u32);
    push_u32(&mut file, header_size as u32);
    push_u32(&mut file, 0x1234_5678);
    file.resize(0x38, 0);
    for (size, offset) in &[
        (strings.len(), string_ids_off),
        (types.len(), type_ids_off),
        (methods.len(), proto_ids_off),
        (0, 0),
        (methods.len(), method_ids_off),
    ] {
        push_u32(&mut file, *size as u32);
        push_u32(&mut file, if *size == 0 { 0 } else { *offset as u32 });
    }
    file.resize(header_size, 0);
    file.extend(ids);
    file.extend(data);
    file
}

fn shorty(return_type: &str, parameters: &[&str]) -> String {
    let short = |t: &str| match t.chars().next() {
        Some('[') | Some('L') => 'L',
        Some(c) => c,
        None => 'V',
    };
    std::iter::once(short(return_type))
        .chain(parameters.iter().map(|p| short(*p)))
        .collect()
}

/// Builds a package archive with the given entries.
pub fn apk(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Methods of a small application using a JavaScript bridge and plain URL connections.
pub const SAMPLE_METHODS: &[(&str, &str, &str, &[&str])] = &[
    (
        "Lcom/example/notes/MainActivity;",
        "onCreate",
        "V",
        &["Landroid/os/Bundle;"],
    ),
    (
        "Landroid/webkit/WebView;",
        "addJavascriptInterface",
        "V",
        &["Ljava/lang/Object;", "Ljava/lang/String;"],
    ),
    (
        "Ljava/net/URL;",
        "openConnection",
        "Ljava/net/URLConnection;",
        &[],
    ),
    ("Ljava/lang/String;", "length", "I", &[]),
];

/// Builds a complete sample package: a label resolved from the resource table, five
/// permissions (two of them dangerous) and the sample methods.
pub fn sample_apk() -> Vec<u8> {
    let manifest = manifest(
        "com.example.notes",
        FixtureValue::Reference(0x7f01_0000),
        &[
            "android.permission.INTERNET",
            "android.permission.CAMERA",
            "android.permission.SEND_SMS",
            "android.permission.INTERNET",
            "android.permission.VIBRATE",
        ],
    );
    let resources = TableBuilder::new()
        .config(None, &[Some(FixtureEntry::Str("Notes"))])
        .config(Some("es"), &[Some(FixtureEntry::Str("Notas"))])
        .build();
    let classes = dex(SAMPLE_METHODS);

    apk(&[
        ("AndroidManifest.xml", &manifest[..]),
        ("resources.arsc", &resources[..]),
        ("classes.dex", &classes[..]),
        ("res/layout/main.xml", &b"\x03\x00\x08\x00\x08\x00\x00\x00"[..]),
    ])
}
