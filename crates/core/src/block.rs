//! Snapshot block format for flash key-value partitions
//!
//! A partition is a ring of equally sized flash blocks. Each commit writes the
//! complete image of the partition into the next block; the block with the
//! highest valid sequence number is the current image.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header (16 bytes)                            │
//! │   magic: u32 = "NVSP"                        │
//! │   version: u16                               │
//! │   sequence: u16                              │
//! │   entry_count: u16                           │
//! │   reserved: u16                              │
//! │   payload_len: u32                           │
//! ├──────────────────────────────────────────────┤
//! │ Entries (payload_len bytes)                  │
//! │   ns_len: u8, namespace                      │
//! │   key_len: u8, key                           │
//! │   tag: u8, value (LE, strings u16-prefixed)  │
//! ├──────────────────────────────────────────────┤
//! │ CRC32 over header + entries (4 bytes)        │
//! └──────────────────────────────────────────────┘
//! ```

use crate::crc::checksum_parts;
use crate::name::{Key, Namespace, MAX_NAME_LEN};
use crate::value::{Value, ValueKind};
use alloc::vec::Vec;

/// Block magic number (ASCII "NVSP")
pub const BLOCK_MAGIC: u32 = u32::from_le_bytes(*b"NVSP");

/// Snapshot format version written by this crate
pub const FORMAT_VERSION: u16 = 1;

/// Size of the CRC32 trailer
pub const CRC_SIZE: usize = 4;

/// Snapshot block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Magic number (`BLOCK_MAGIC`)
    pub magic: u32,
    /// Snapshot format version
    pub version: u16,
    /// Commit sequence number, wraps at `u16::MAX`
    pub sequence: u16,
    /// Number of entries in the payload
    pub entry_count: u16,
    /// Reserved, written as zero
    pub reserved: u16,
    /// Payload length in bytes
    pub payload_len: u32,
}

impl BlockHeader {
    /// Size of header in bytes
    pub const SIZE: usize = 16;

    /// Create a header for the current format version
    pub fn new(sequence: u16, entry_count: u16, payload_len: u32) -> Self {
        Self {
            magic: BLOCK_MAGIC,
            version: FORMAT_VERSION,
            sequence,
            entry_count,
            reserved: 0,
            payload_len,
        }
    }

    /// Serialize header to bytes (little-endian)
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..8].copy_from_slice(&self.sequence.to_le_bytes());
        buf[8..10].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[10..12].copy_from_slice(&self.reserved.to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Deserialize header from bytes, `None` unless the magic matches
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let buf: &[u8; Self::SIZE] = buf.get(..Self::SIZE)?.try_into().ok()?;

        let header = Self {
            magic: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            version: u16::from_le_bytes([buf[4], buf[5]]),
            sequence: u16::from_le_bytes([buf[6], buf[7]]),
            entry_count: u16::from_le_bytes([buf[8], buf[9]]),
            reserved: u16::from_le_bytes([buf[10], buf[11]]),
            payload_len: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        };

        (header.magic == BLOCK_MAGIC).then_some(header)
    }
}

/// Classification of a block's header bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// All bytes 0xFF, never written since the last erase
    Erased,
    /// Valid magic and current format version
    Current(BlockHeader),
    /// Valid magic written by a different format version
    Incompatible(u16),
    /// Neither erased nor a recognizable header
    Garbage,
}

/// Classify the header bytes of a block
pub fn classify(header_bytes: &[u8]) -> BlockState {
    let head = &header_bytes[..header_bytes.len().min(BlockHeader::SIZE)];
    if head.len() == BlockHeader::SIZE && head.iter().all(|&b| b == 0xFF) {
        return BlockState::Erased;
    }
    match BlockHeader::from_bytes(head) {
        Some(header) if header.version == FORMAT_VERSION => BlockState::Current(header),
        Some(header) => BlockState::Incompatible(header.version),
        None => BlockState::Garbage,
    }
}

/// One stored entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub namespace: Namespace,
    pub key: Key,
    pub value: Value,
}

impl Entry {
    /// Append the encoded entry to `out`
    pub fn encode(namespace: &str, key: &str, value: &Value, out: &mut Vec<u8>) {
        out.push(namespace.len() as u8);
        out.extend_from_slice(namespace.as_bytes());
        out.push(key.len() as u8);
        out.extend_from_slice(key.as_bytes());
        out.push(value.kind().tag());
        value.encode(out);
    }

    /// Number of bytes [`Entry::encode`] appends
    pub fn encoded_len(namespace: &str, key: &str, value: &Value) -> usize {
        1 + namespace.len() + 1 + key.len() + 1 + value.encoded_len()
    }

    /// Decode an entry at `*offset`, advancing it
    pub fn decode(buf: &[u8], offset: &mut usize) -> Option<Self> {
        let namespace = decode_name(buf, offset)?;
        let key = decode_name(buf, offset)?;
        let tag = *buf.get(*offset)?;
        *offset += 1;
        let kind = ValueKind::from_tag(tag)?;
        let value = Value::decode(kind, buf, offset)?;
        Some(Self {
            namespace,
            key,
            value,
        })
    }
}

fn decode_name(buf: &[u8], offset: &mut usize) -> Option<heapless::String<MAX_NAME_LEN>> {
    let len = *buf.get(*offset)? as usize;
    *offset += 1;
    let bytes = buf.get(*offset..*offset + len)?;
    *offset += len;
    let mut name = heapless::String::new();
    name.push_str(core::str::from_utf8(bytes).ok()?).ok()?;
    Some(name)
}

/// Build a complete snapshot image (header + payload + CRC)
///
/// `entries` yields `(namespace, key, value)` triples.
pub fn encode_snapshot<'a, I>(sequence: u16, entries: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a Value)>,
{
    let mut payload = Vec::new();
    let mut count: u16 = 0;
    for (namespace, key, value) in entries {
        Entry::encode(namespace, key, value, &mut payload);
        count = count.wrapping_add(1);
    }

    let header = BlockHeader::new(sequence, count, payload.len() as u32);
    let header_bytes = header.to_bytes();
    let crc = checksum_parts(&[&header_bytes, &payload]);

    let mut image = Vec::with_capacity(BlockHeader::SIZE + payload.len() + CRC_SIZE);
    image.extend_from_slice(&header_bytes);
    image.extend_from_slice(&payload);
    image.extend_from_slice(&crc.to_le_bytes());
    image
}

/// Size of the image [`encode_snapshot`] would build for `entries`
pub fn snapshot_len<'a, I>(entries: I) -> usize
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a Value)>,
{
    let payload: usize = entries
        .into_iter()
        .map(|(namespace, key, value)| Entry::encoded_len(namespace, key, value))
        .sum();
    BlockHeader::SIZE + payload + CRC_SIZE
}

/// Decode and validate the payload of a snapshot
///
/// `body` holds the bytes following the header: payload then CRC. Returns
/// `None` when the CRC does not match or an entry fails to decode.
pub fn decode_snapshot(header: &BlockHeader, body: &[u8]) -> Option<Vec<Entry>> {
    let payload_len = header.payload_len as usize;
    let payload = body.get(..payload_len)?;
    let crc_bytes = body.get(payload_len..payload_len + CRC_SIZE)?;
    let stored_crc = u32::from_le_bytes(crc_bytes.try_into().ok()?);

    if checksum_parts(&[&header.to_bytes(), payload]) != stored_crc {
        return None;
    }

    let mut entries = Vec::with_capacity(header.entry_count as usize);
    let mut offset = 0;
    for _ in 0..header.entry_count {
        entries.push(Entry::decode(payload, &mut offset)?);
    }
    (offset == payload_len).then_some(entries)
}
