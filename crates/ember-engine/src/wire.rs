//! Wire format primitives for engine snapshots.
//!
//! Little-endian is the canonical byte order. [`WireWriter`] appends to a
//! growable buffer; [`WireReader`] performs bounds-checked reads and reports
//! truncation as [`CodecError::UnexpectedEnd`] instead of panicking. Both
//! sides expose a crc32 helper so snapshot producers and consumers can
//! checksum the same byte span.

use thiserror::Error;

/// Magic number for wheel snapshots: "EMBW".
pub const WHEEL_MAGIC: [u8; 4] = *b"EMBW";

/// Current wheel snapshot format version.
pub const WHEEL_VERSION: u32 = 1;

/// Snapshot encoding/decoding errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Ran out of input mid-value.
    #[error("Unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),

    /// Invalid magic number.
    #[error("Invalid magic number: expected EMBW, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported snapshot version.
    #[error("Unsupported snapshot version: {0} (current: {WHEEL_VERSION})")]
    UnsupportedVersion(u32),

    /// Checksum mismatch.
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// Checksum recorded in the snapshot.
        expected: u32,
        /// Checksum computed over the decoded bytes.
        actual: u32,
    },

    /// A decoded value is structurally impossible (bad index, bad length).
    #[error("Corrupted snapshot data")]
    CorruptedData,

    /// No decoder is registered for a persisted timer entry kind.
    #[error("Unknown timer entry kind: {0}")]
    UnknownEntryKind(u32),

    /// Decoded bytes are not valid UTF-8.
    #[error("Invalid UTF-8 in string at byte {0}")]
    InvalidUtf8(usize),

    /// Underlying file IO failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only snapshot writer.
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Borrow the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer, yielding the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Write a 16-bit unsigned integer (little-endian).
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 32-bit unsigned integer (little-endian).
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 64-bit unsigned integer (little-endian).
    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 32-bit signed integer (little-endian).
    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 64-bit signed integer (little-endian).
    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write raw bytes with no length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Write a u32 length prefix followed by the bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.buffer.extend_from_slice(bytes);
    }

    /// Write a string as a u32 length prefix plus UTF-8 bytes.
    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Crc32 of the bytes written since offset `from`.
    pub fn checksum_since(&self, from: usize) -> u32 {
        crc32fast::hash(&self.buffer[from..])
    }
}

impl Default for WireWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounds-checked snapshot reader over a byte slice.
pub struct WireReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader at the start of `buffer`.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Whether any bytes are left.
    pub fn has_more(&self) -> bool {
        self.position < self.buffer.len()
    }

    /// Read `count` raw bytes.
    pub fn read_raw(&mut self, count: usize) -> Result<&'a [u8], CodecError> {
        if self.position + count > self.buffer.len() {
            return Err(CodecError::UnexpectedEnd(self.position));
        }
        let bytes = &self.buffer[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let bytes = self.read_raw(1)?;
        Ok(bytes[0])
    }

    /// Read a 16-bit unsigned integer (little-endian).
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.read_raw(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a 32-bit unsigned integer (little-endian).
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.read_raw(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a 64-bit unsigned integer (little-endian).
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.read_raw(8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read a 32-bit signed integer (little-endian).
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        let bytes = self.read_raw(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a 64-bit signed integer (little-endian).
    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        let bytes = self.read_raw(8)?;
        Ok(i64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read a u32 length prefix followed by that many bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_u32()? as usize;
        self.read_raw(len)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<String, CodecError> {
        let start = self.position;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8(start))
    }

    /// Crc32 of the bytes between offset `from` and the current position.
    pub fn checksum_since(&self, from: usize) -> u32 {
        crc32fast::hash(&self.buffer[from..self.position])
    }
}
