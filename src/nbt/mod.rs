//! Named binary tag trees
//!
//! Big-endian, self-describing nested records. Chunk payloads are one root
//! compound; only the handful of tags the rasterizer needs are ever looked
//! up, but the whole tree is decoded so that unknown tags are skipped safely.

use std::collections::HashMap;

use crate::error::{nbt_error, QuadMapResult};

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// Nesting deeper than this is treated as corrupt data
const MAX_DEPTH: usize = 512;

/// One decoded tag value
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    List(Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    fn type_id(&self) -> u8 {
        match self {
            Tag::Byte(_) => TAG_BYTE,
            Tag::Short(_) => TAG_SHORT,
            Tag::Int(_) => TAG_INT,
            Tag::Long(_) => TAG_LONG,
            Tag::Float(_) => TAG_FLOAT,
            Tag::Double(_) => TAG_DOUBLE,
            Tag::ByteArray(_) => TAG_BYTE_ARRAY,
            Tag::String(_) => TAG_STRING,
            Tag::List(_) => TAG_LIST,
            Tag::Compound(_) => TAG_COMPOUND,
            Tag::IntArray(_) => TAG_INT_ARRAY,
            Tag::LongArray(_) => TAG_LONG_ARRAY,
        }
    }

    /// Integer value of any integral scalar tag
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Tag::Byte(v) => Some(*v as i64),
            Tag::Short(v) => Some(*v as i64),
            Tag::Int(v) => Some(*v as i64),
            Tag::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }
}

/// A compound tag: named children in no particular order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    entries: HashMap<String, Tag>,
}

impl Compound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, tag: Tag) -> Self {
        self.insert(name, tag);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, tag: Tag) {
        self.entries.insert(name.into(), tag);
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Required compound child
    pub fn compound(&self, name: &str) -> QuadMapResult<&Compound> {
        match self.entries.get(name) {
            Some(Tag::Compound(c)) => Ok(c),
            Some(other) => Err(nbt_error(format!(
                "tag {:?} is type {}, expected compound",
                name,
                other.type_id()
            ))),
            None => Err(nbt_error(format!("missing compound {:?}", name))),
        }
    }

    /// Optional byte array child; a tag of another type counts as absent
    pub fn byte_array(&self, name: &str) -> Option<&[u8]> {
        match self.entries.get(name) {
            Some(Tag::ByteArray(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Optional list child; a tag of another type counts as absent
    pub fn list(&self, name: &str) -> Option<&[Tag]> {
        match self.entries.get(name) {
            Some(Tag::List(items)) => Some(items),
            _ => None,
        }
    }

    /// Optional integral child of any width
    pub fn int(&self, name: &str) -> Option<i64> {
        self.entries.get(name).and_then(Tag::as_int)
    }
}

/// Decode a whole NBT stream, returning the root tag's name and value
pub fn read_root(data: &[u8]) -> QuadMapResult<(String, Tag)> {
    let mut reader = Reader { data, pos: 0 };
    let type_id = reader.u8()?;
    if type_id == TAG_END {
        return Err(nbt_error("stream starts with an end tag"));
    }
    let name = reader.string()?;
    let tag = reader.payload(type_id, 0)?;
    Ok((name, tag))
}

/// Decode a stream whose root must be a compound
pub fn read_root_compound(data: &[u8]) -> QuadMapResult<Compound> {
    match read_root(data)? {
        (_, Tag::Compound(root)) => Ok(root),
        (_, other) => Err(nbt_error(format!(
            "root tag is type {}, expected compound",
            other.type_id()
        ))),
    }
}

/// Encode a named root tag
pub fn write_root(name: &str, tag: &Tag) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(tag.type_id());
    write_string(&mut out, name);
    write_payload(&mut out, tag);
    out
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> QuadMapResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                nbt_error(format!(
                    "unexpected end of data reading {} bytes at offset {}",
                    n, self.pos
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> QuadMapResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> QuadMapResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn i16(&mut self) -> QuadMapResult<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    fn i32(&mut self) -> QuadMapResult<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn i64(&mut self) -> QuadMapResult<i64> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    fn length(&mut self) -> QuadMapResult<usize> {
        let len = self.i32()?;
        usize::try_from(len).map_err(|_| nbt_error(format!("negative length {}", len)))
    }

    fn string(&mut self) -> QuadMapResult<String> {
        let len = u16::from_be_bytes(self.array()?) as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn payload(&mut self, type_id: u8, depth: usize) -> QuadMapResult<Tag> {
        if depth > MAX_DEPTH {
            return Err(nbt_error("tag nesting too deep"));
        }
        let tag = match type_id {
            TAG_BYTE => Tag::Byte(self.u8()? as i8),
            TAG_SHORT => Tag::Short(self.i16()?),
            TAG_INT => Tag::Int(self.i32()?),
            TAG_LONG => Tag::Long(self.i64()?),
            TAG_FLOAT => Tag::Float(f32::from_bits(self.i32()? as u32)),
            TAG_DOUBLE => Tag::Double(f64::from_bits(self.i64()? as u64)),
            TAG_BYTE_ARRAY => {
                let len = self.length()?;
                Tag::ByteArray(self.take(len)?.to_vec())
            }
            TAG_STRING => Tag::String(self.string()?),
            TAG_LIST => {
                let item_type = self.u8()?;
                let len = self.length()?;
                let mut items = Vec::with_capacity(len.min(1024));
                if item_type != TAG_END {
                    for _ in 0..len {
                        items.push(self.payload(item_type, depth + 1)?);
                    }
                }
                Tag::List(items)
            }
            TAG_COMPOUND => {
                let mut compound = Compound::new();
                loop {
                    let child_type = self.u8()?;
                    if child_type == TAG_END {
                        break;
                    }
                    let name = self.string()?;
                    let child = self.payload(child_type, depth + 1)?;
                    compound.insert(name, child);
                }
                Tag::Compound(compound)
            }
            TAG_INT_ARRAY => {
                let len = self.length()?;
                let bytes = self.take(len.checked_mul(4).ok_or_else(|| nbt_error("int array too long"))?)?;
                Tag::IntArray(
                    bytes
                        .chunks_exact(4)
                        .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                        .collect(),
                )
            }
            TAG_LONG_ARRAY => {
                let len = self.length()?;
                let bytes = self.take(len.checked_mul(8).ok_or_else(|| nbt_error("long array too long"))?)?;
                Tag::LongArray(
                    bytes
                        .chunks_exact(8)
                        .map(|b| i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                        .collect(),
                )
            }
            other => return Err(nbt_error(format!("unknown tag type {}", other))),
        };
        Ok(tag)
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_payload(out: &mut Vec<u8>, tag: &Tag) {
    match tag {
        Tag::Byte(v) => out.push(*v as u8),
        Tag::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        Tag::Float(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
        Tag::Double(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
        Tag::ByteArray(bytes) => {
            out.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
            out.extend_from_slice(bytes);
        }
        Tag::String(s) => write_string(out, s),
        Tag::List(items) => {
            out.push(items.first().map_or(TAG_END, Tag::type_id));
            out.extend_from_slice(&(items.len() as i32).to_be_bytes());
            for item in items {
                write_payload(out, item);
            }
        }
        Tag::Compound(compound) => {
            for (name, child) in &compound.entries {
                out.push(child.type_id());
                write_string(out, name);
                write_payload(out, child);
            }
            out.push(TAG_END);
        }
        Tag::IntArray(values) => {
            out.extend_from_slice(&(values.len() as i32).to_be_bytes());
            for v in values {
                out.extend_from_slice(&v.to_be_bytes());
            }
        }
        Tag::LongArray(values) => {
            out.extend_from_slice(&(values.len() as i32).to_be_bytes());
            for v in values {
                out.extend_from_slice(&v.to_be_bytes());
            }
        }
    }
}
