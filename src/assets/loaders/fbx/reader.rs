//! Binary FBX node reader
//!
//! Turns the byte stream of a binary FBX file into a generic tree of
//! [`RawNode`]s. The reader has no knowledge of what the nodes mean; the
//! scene resolver interprets them.
//!
//! Record layout (7.x, 32-bit offsets):
//!
//! ```text
//! u32 end_offset | u32 property_count | u32 property_list_len | u8 name_len
//! name bytes | properties | nested records ... | 13 zero bytes
//! ```

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

use crate::errors::{KinesisError, Result};

/// The 21-byte magic field. Only the first 20 bytes are compared; the
/// trailing NUL varies between exporters.
pub const FBX_MAGIC: &[u8; 21] = b"Kaydara FBX Binary  \0";
const FBX_MAGIC_MATCH_LEN: usize = 20;
pub const FBX_CODE: [u8; 2] = [0x1A, 0x00];
/// The format version this reader is written against.
pub const FBX_SUPPORTED_VERSION: u32 = 7400;

const SENTINEL_LEN: u64 = 13;

/// Deepest record nesting accepted before the file is rejected.
pub const MAX_NODE_DEPTH: usize = 256;

/// Upper bound on the deflate expansion ratio. A compressed array claiming
/// more output than this is rejected before inflating.
const MAX_DEFLATE_RATIO: u64 = 1032;

/// Header metadata and legacy take data. Parsed to stay in sync with the
/// stream, then dropped from the tree.
pub const SKIPPED_NODE_NAMES: &[&str] = &["FileId", "CreationTime", "Creator", "Takes"];

// ============================================================================
// Node tree
// ============================================================================

/// A typed property value of a node record.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Raw(Vec<u8>),
    BoolArray(Vec<bool>),
    I32Array(Vec<i32>),
    I64Array(Vec<i64>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
}

impl Property {
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Property::I16(v) => Some(i64::from(v)),
            Property::I32(v) => Some(i64::from(v)),
            Property::I64(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Property::F32(v) => Some(f64::from(v)),
            Property::F64(v) => Some(v),
            Property::I16(v) => Some(f64::from(v)),
            Property::I32(v) => Some(f64::from(v)),
            Property::I64(v) => Some(v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(s) => Some(s),
            _ => None,
        }
    }

    /// Floating point array, widened to `f64`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Property::F64Array(v) => Some(v.clone()),
            Property::F32Array(v) => Some(v.iter().map(|&x| f64::from(x)).collect()),
            _ => None,
        }
    }

    /// Floating point array, narrowed to `f32`.
    #[must_use]
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        match self {
            Property::F32Array(v) => Some(v.clone()),
            Property::F64Array(v) => Some(v.iter().map(|&x| x as f32).collect()),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i32_vec(&self) -> Option<Vec<i32>> {
        match self {
            Property::I32Array(v) => Some(v.clone()),
            Property::I64Array(v) => Some(v.iter().map(|&x| x as i32).collect()),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            Property::I64Array(v) => Some(v.clone()),
            Property::I32Array(v) => Some(v.iter().map(|&x| i64::from(x)).collect()),
            _ => None,
        }
    }
}

/// A named node with its properties and nested nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNode {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<RawNode>,
}

impl RawNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the node belongs to a region the importer never reads.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        SKIPPED_NODE_NAMES.contains(&self.name.as_str())
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&RawNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RawNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    #[inline]
    #[must_use]
    pub fn property(&self, index: usize) -> Option<&Property> {
        self.properties.get(index)
    }

    /// First property of the named child, the usual shape of array nodes
    /// such as `Vertices` or `KeyTime`.
    #[must_use]
    pub fn child_property(&self, name: &str) -> Option<&Property> {
        self.child(name)?.property(0)
    }
}

// ============================================================================
// Header
// ============================================================================

/// Reads the file header and returns the declared version.
///
/// Version policy is left to the caller.
pub fn read_header<R: Read>(reader: &mut R) -> Result<u32> {
    let mut magic = [0u8; 21];
    let mut code = [0u8; 2];
    reader
        .read_exact(&mut magic)
        .and_then(|()| reader.read_exact(&mut code))
        .map_err(|_| KinesisError::InvalidHeader("file is shorter than the FBX header".to_string()))?;

    if magic[..FBX_MAGIC_MATCH_LEN] != FBX_MAGIC[..FBX_MAGIC_MATCH_LEN] {
        return Err(KinesisError::InvalidHeader("magic string mismatch".to_string()));
    }
    if code != FBX_CODE {
        return Err(KinesisError::InvalidHeader(format!("unexpected code bytes {code:02x?}")));
    }

    reader
        .read_u32::<LittleEndian>()
        .map_err(|_| KinesisError::InvalidHeader("missing version field".to_string()))
}

// ============================================================================
// Node records
// ============================================================================

/// Reads node records from a stream positioned after the file header.
pub struct NodeReader<R> {
    inner: R,
    stream_len: u64,
}

impl<R: Read + Seek> NodeReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let position = inner.stream_position()?;
        let stream_len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(position))?;
        Ok(Self { inner, stream_len })
    }

    /// Reads top-level records until the terminating sentinel or end of data.
    pub fn read_document(&mut self) -> Result<Vec<RawNode>> {
        let mut nodes = Vec::new();

        loop {
            let position = self.inner.stream_position()?;
            if position + SENTINEL_LEN > self.stream_len {
                break;
            }
            match self.read_node()? {
                Some(node) if node.is_skippable() => {
                    log::debug!("Skipping FBX section '{}'", node.name);
                }
                Some(node) => nodes.push(node),
                None => break,
            }
        }

        Ok(nodes)
    }

    /// Reads one record. `None` is the all-zero sentinel.
    pub fn read_node(&mut self) -> Result<Option<RawNode>> {
        self.read_node_at(0)
    }

    fn read_node_at(&mut self, depth: usize) -> Result<Option<RawNode>> {
        let start = self.inner.stream_position()?;
        if depth > MAX_NODE_DEPTH {
            return Err(malformed(start, format!("records nested deeper than {MAX_NODE_DEPTH}")));
        }

        let end_offset = u64::from(self.read_u32(start)?);
        let property_count = self.read_u32(start)?;
        let property_list_len = u64::from(self.read_u32(start)?);
        let name_len = self.read_u8(start)?;

        if end_offset == 0 && property_count == 0 && property_list_len == 0 && name_len == 0 {
            return Ok(None);
        }

        if end_offset > self.stream_len || end_offset < start + SENTINEL_LEN + u64::from(name_len) {
            return Err(malformed(start, format!("end offset {end_offset} out of range")));
        }

        let mut name_bytes = vec![0u8; usize::from(name_len)];
        self.read_exact(start, &mut name_bytes)?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let properties_start = self.inner.stream_position()?;
        let properties_end = properties_start + property_list_len;
        if properties_end > end_offset {
            return Err(malformed(start, format!("property list of '{name}' overruns the record")));
        }

        let mut properties = Vec::with_capacity(property_count.min(64) as usize);
        for _ in 0..property_count {
            properties.push(self.read_property(start)?);
        }

        if self.inner.stream_position()? > properties_end {
            return Err(malformed(start, format!("properties of '{name}' exceed their declared length")));
        }
        self.inner.seek(SeekFrom::Start(properties_end))?;

        let mut children = Vec::new();
        while self.inner.stream_position()? < end_offset {
            match self.read_node_at(depth + 1)? {
                Some(child) if child.is_skippable() => {}
                Some(child) => children.push(child),
                None => break,
            }
        }

        self.inner.seek(SeekFrom::Start(end_offset))?;

        Ok(Some(RawNode { name, properties, children }))
    }

    fn read_property(&mut self, node_start: u64) -> Result<Property> {
        let tag = self.read_u8(node_start)?;

        let property = match tag {
            b'C' => Property::Bool(self.read_u8(node_start)? != 0),
            b'Y' => Property::I16(self.wrap(node_start, |r| r.read_i16::<LittleEndian>())?),
            b'I' => Property::I32(self.wrap(node_start, |r| r.read_i32::<LittleEndian>())?),
            b'L' => Property::I64(self.wrap(node_start, |r| r.read_i64::<LittleEndian>())?),
            b'F' => Property::F32(self.wrap(node_start, |r| r.read_f32::<LittleEndian>())?),
            b'D' => Property::F64(self.wrap(node_start, |r| r.read_f64::<LittleEndian>())?),
            b'S' | b'R' => {
                let len = u64::from(self.read_u32(node_start)?);
                self.check_remaining(node_start, len)?;
                let mut bytes = vec![0u8; len as usize];
                self.read_exact(node_start, &mut bytes)?;
                if tag == b'S' {
                    Property::String(String::from_utf8_lossy(&bytes).into_owned())
                } else {
                    Property::Raw(bytes)
                }
            }
            b'b' => Property::BoolArray(
                self.read_array(node_start, 1, |r| r.read_u8().map(|v| v != 0))?,
            ),
            b'i' => Property::I32Array(self.read_array(node_start, 4, |r| r.read_i32::<LittleEndian>())?),
            b'l' => Property::I64Array(self.read_array(node_start, 8, |r| r.read_i64::<LittleEndian>())?),
            b'f' => Property::F32Array(self.read_array(node_start, 4, |r| r.read_f32::<LittleEndian>())?),
            b'd' => Property::F64Array(self.read_array(node_start, 8, |r| r.read_f64::<LittleEndian>())?),
            other => {
                return Err(malformed(node_start, format!("unknown property type '{}'", other as char)));
            }
        };

        Ok(property)
    }

    /// Array payload: `u32 count | u32 encoding | u32 byte_len | data`.
    /// Encoding 1 means the data is zlib-compressed.
    fn read_array<T>(
        &mut self,
        node_start: u64,
        element_size: u64,
        read_element: impl Fn(&mut &[u8]) -> io::Result<T>,
    ) -> Result<Vec<T>> {
        let count = u64::from(self.read_u32(node_start)?);
        let encoding = self.read_u32(node_start)?;
        let byte_len = u64::from(self.read_u32(node_start)?);
        let expected = count * element_size;

        let bytes = match encoding {
            0 => {
                self.check_remaining(node_start, expected)?;
                let mut bytes = vec![0u8; expected as usize];
                self.read_exact(node_start, &mut bytes)?;
                bytes
            }
            1 => {
                self.check_remaining(node_start, byte_len)?;
                let mut compressed = vec![0u8; byte_len as usize];
                self.read_exact(node_start, &mut compressed)?;

                if expected > byte_len.saturating_mul(MAX_DEFLATE_RATIO) {
                    return Err(malformed(
                        node_start,
                        format!("{byte_len} compressed bytes cannot hold {count} array elements"),
                    ));
                }

                // One byte past the declared size is enough to detect overlong data.
                let mut bytes = Vec::new();
                ZlibDecoder::new(compressed.as_slice())
                    .take(expected + 1)
                    .read_to_end(&mut bytes)
                    .map_err(|e| malformed(node_start, format!("array decompression failed: {e}")))?;
                if bytes.len() as u64 != expected {
                    return Err(malformed(
                        node_start,
                        format!("decompressed array holds {} bytes, expected {expected}", bytes.len()),
                    ));
                }
                bytes
            }
            other => return Err(malformed(node_start, format!("unknown array encoding {other}"))),
        };

        let mut cursor = bytes.as_slice();
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(read_element(&mut cursor).map_err(|e| malformed(node_start, e.to_string()))?);
        }
        Ok(values)
    }

    // ------------------------------------------------------------------------
    // Primitive reads, with I/O failures reported against the current record
    // ------------------------------------------------------------------------

    fn wrap<T>(&mut self, node_start: u64, read: impl FnOnce(&mut R) -> io::Result<T>) -> Result<T> {
        read(&mut self.inner).map_err(|e| malformed(node_start, e.to_string()))
    }

    fn read_u8(&mut self, node_start: u64) -> Result<u8> {
        self.wrap(node_start, |r| r.read_u8())
    }

    fn read_u32(&mut self, node_start: u64) -> Result<u32> {
        self.wrap(node_start, |r| r.read_u32::<LittleEndian>())
    }

    fn read_exact(&mut self, node_start: u64, buf: &mut [u8]) -> Result<()> {
        self.wrap(node_start, |r| r.read_exact(buf))
    }

    fn check_remaining(&mut self, node_start: u64, len: u64) -> Result<()> {
        let position = self.inner.stream_position()?;
        if position + len > self.stream_len {
            return Err(malformed(node_start, format!("{len} byte payload runs past the end of the file")));
        }
        Ok(())
    }
}

fn malformed(offset: u64, reason: String) -> KinesisError {
    KinesisError::MalformedNode { offset, reason }
}
