//! Decoder for Dalvik executables (`classes*.dex`).
//!
//! Only the identifier sections are decoded: strings, types, prototypes and methods. That is
//! enough to enumerate every method the code defines or calls, without touching the bytecode.

use super::reader::Reader;
use crate::error::ErrorKind;
use anyhow::{bail, Context, Result};
use std::fmt;

const DEX_MAGIC: &[u8] = b"dex\n";
const HEADER_SIZE: usize = 0x70;
const ENDIAN_CONSTANT: u32 = 0x1234_5678;
const REVERSE_ENDIAN_CONSTANT: u32 = 0x7856_3412;

const STRING_IDS_OFFSET: usize = 0x38;
const TYPE_IDS_OFFSET: usize = 0x40;
const PROTO_IDS_OFFSET: usize = 0x48;
const METHOD_IDS_OFFSET: usize = 0x58;

/// Method identifier: the class that declares it, its name and its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    class: String,
    name: String,
    descriptor: String,
}

impl MethodRef {
    /// Creates a new method reference.
    pub fn new<C, N, D>(class: C, name: N, descriptor: D) -> Self
    where
        C: Into<String>,
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            class: class.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Gets the type descriptor of the declaring class, such as `Landroid/webkit/WebView;`.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Gets the name of the method.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the method descriptor, such as `(Ljava/lang/String;)V`.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Gets the `Class->method` signature of the method.
    pub fn signature(&self) -> String {
        format!("{}->{}", self.class, self.name)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}{}", self.class, self.name, self.descriptor)
    }
}

/// Decoded identifier sections of a DEX file.
#[derive(Debug, Clone, Default)]
pub struct DexFile {
    methods: Vec<MethodRef>,
}

/// Size and offset of an identifier section.
#[derive(Debug, Clone, Copy)]
struct Section {
    size: usize,
    offset: usize,
}

impl Section {
    fn read(reader: &Reader<'_>, at: usize, item_size: usize) -> Result<Self> {
        let size = reader.usize_at(at)?;
        let offset = reader.usize_at(at + 4)?;
        // The whole section must fit, which also bounds bogus sizes.
        let len = size
            .checked_mul(item_size)
            .ok_or_else(|| ErrorKind::parse("DEX section size overflow"))?;
        if size > 0 {
            let _ = reader.slice(offset, len)?;
        }

        Ok(Self { size, offset })
    }

    fn item(&self, index: usize, item_size: usize) -> Result<usize> {
        if index >= self.size {
            bail!(ErrorKind::parse(format!(
                "DEX index {} out of bounds ({} items)",
                index, self.size
            )));
        }
        Ok(self.offset + index * item_size)
    }
}

impl DexFile {
    /// Decodes the identifier sections of a DEX file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let reader = Reader::new(data);
        let magic = reader
            .slice(0, 8)
            .context("file too small to be a DEX file")?;
        if &magic[..4] != DEX_MAGIC || magic[7] != 0 {
            bail!(ErrorKind::parse("invalid DEX magic"));
        }
        if data.len() < HEADER_SIZE {
            bail!(ErrorKind::parse("truncated DEX header"));
        }
        match reader.u32_at(0x28)? {
            ENDIAN_CONSTANT => {}
            REVERSE_ENDIAN_CONSTANT => {
                bail!(ErrorKind::parse("big endian DEX files are not supported"))
            }
            tag => bail!(ErrorKind::parse(format!(
                "invalid DEX endian tag 0x{:08x}",
                tag
            ))),
        }

        let decoder = Decoder {
            reader,
            string_ids: Section::read(&reader, STRING_IDS_OFFSET, 4)?,
            type_ids: Section::read(&reader, TYPE_IDS_OFFSET, 4)?,
            proto_ids: Section::read(&reader, PROTO_IDS_OFFSET, 12)?,
        };
        let method_ids = Section::read(&reader, METHOD_IDS_OFFSET, 8)?;

        let mut methods = Vec::with_capacity(method_ids.size);
        for i in 0..method_ids.size {
            let offset = method_ids.item(i, 8)?;
            let class = decoder.type_name(usize::from(reader.u16_at(offset)?))?;
            let descriptor = decoder.descriptor(usize::from(reader.u16_at(offset + 2)?))?;
            let name = decoder.string(reader.usize_at(offset + 4)?)?;
            methods.push(MethodRef {
                class,
                name,
                descriptor,
            });
        }

        Ok(Self { methods })
    }

    /// Gets the methods defined or referenced by the file, in identifier order.
    pub fn methods(&self) -> &[MethodRef] {
        &self.methods
    }

    /// Consumes the file, returning its methods.
    pub fn into_methods(self) -> Vec<MethodRef> {
        self.methods
    }
}

struct Decoder<'a> {
    reader: Reader<'a>,
    string_ids: Section,
    type_ids: Section,
    proto_ids: Section,
}

impl<'a> Decoder<'a> {
    fn string(&self, index: usize) -> Result<String> {
        let data_offset = self.reader.usize_at(self.string_ids.item(index, 4)?)?;
        let (utf16_len, len_size) = self.reader.uleb128_at(data_offset)?;
        let bytes = self.reader.nul_terminated_at(data_offset + len_size)?;
        let string = decode_mutf8(bytes)?;

        if string.encode_utf16().count() != utf16_len as usize {
            bail!(ErrorKind::parse(format!(
                "DEX string {} has a wrong length",
                index
            )));
        }
        Ok(string)
    }

    fn type_name(&self, index: usize) -> Result<String> {
        self.string(self.reader.usize_at(self.type_ids.item(index, 4)?)?)
    }

    fn descriptor(&self, index: usize) -> Result<String> {
        let offset = self.proto_ids.item(index, 12)?;
        let return_type = self.type_name(self.reader.usize_at(offset + 4)?)?;
        let parameters_offset = self.reader.usize_at(offset + 8)?;

        let mut descriptor = String::from("(");
        if parameters_offset != 0 {
            let count = self.reader.usize_at(parameters_offset)?;
            let _ = self.reader.slice(parameters_offset + 4, count.saturating_mul(2))?;
            for i in 0..count {
                let type_index = self.reader.u16_at(parameters_offset + 4 + i * 2)?;
                descriptor.push_str(&self.type_name(usize::from(type_index))?);
            }
        }
        descriptor.push(')');
        descriptor.push_str(&return_type);

        Ok(descriptor)
    }
}

/// Decodes a modified UTF-8 string.
///
/// It differs from UTF-8 in that NUL is encoded in two bytes and supplementary characters are
/// encoded as surrogate pairs, three bytes each.
fn decode_mutf8(bytes: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        let (unit, len) = match byte >> 4 {
            0x0..=0x7 => (u16::from(byte), 1),
            0xc | 0xd => {
                let second = continuation(bytes, i + 1)?;
                ((u16::from(byte & 0x1f) << 6) | second, 2)
            }
            0xe => {
                let second = continuation(bytes, i + 1)?;
                let third = continuation(bytes, i + 2)?;
                ((u16::from(byte & 0x0f) << 12) | (second << 6) | third, 3)
            }
            _ => bail!(ErrorKind::parse(format!(
                "invalid MUTF-8 byte 0x{:02x}",
                byte
            ))),
        };
        units.push(unit);
        i += len;
    }

    Ok(String::from_utf16_lossy(&units))
}

fn continuation(bytes: &[u8], index: usize) -> Result<u16> {
    match bytes.get(index) {
        Some(byte) if byte & 0xc0 == 0x80 => Ok(u16::from(byte & 0x3f)),
        _ => bail!(ErrorKind::parse("truncated MUTF-8 sequence")),
    }
}
