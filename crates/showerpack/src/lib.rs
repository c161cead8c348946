//! # Showerpack
//!
//! The primitive codec for shower transactions.
//!
//! ## Philosophy
//!
//! - **Flat**: A transaction body is an ordered run of primitives. There are no
//!   containers; position alone carries meaning, and the schema lives in the
//!   transaction registry above this crate.
//! - **Tagged**: Every item starts with a one-byte `Tag`, so a decoder reading the
//!   wrong type at the wrong position fails immediately instead of misreading bytes.
//! - **Bounded**: Decoders are zero-copy, bounds-checked views. Nothing panics on
//!   hostile input.
//!
//! ## Format
//!
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Blobs**: `[Tag: 1b][Len: 4b][Data: Len]`
//!
//! All integers are Little-Endian.


/// Showerpack serialization and deserialization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Byte does not correspond to the expected `Tag`.
    InvalidTag(u8),
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Buffer exhausted while reading.
    UnexpectedEnd,
    /// Blob length exceeds `u32::MAX`.
    BlobTooLarge(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidTag(b) => write!(f, "Invalid Tag byte: {:#04x}", b),
            Error::InvalidUtf8 => write!(f, "String is not valid UTF-8"),
            Error::UnexpectedEnd => write!(f, "Unexpected end of buffer"),
            Error::BlobTooLarge(len) => write!(f, "Blob of {} bytes exceeds u32 length prefix", len),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for Showerpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Identifies the type of the encoded value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    // Fixed-width scalars
    S32 = 0x09,
    S64 = 0x0A,
    F32 = 0x0B,

    // Blobs (Tag + u32 Len + Bytes)
    String = 0x10,
    Bytes = 0x11,

    // Opaque resource reference (Tag + u32)
    Handle = 0x40,
}

impl Tag {
    /// Returns the Tag variant for a given byte, or `None` if invalid.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x09 => Some(Tag::S32),
            0x0A => Some(Tag::S64),
            0x0B => Some(Tag::F32),
            0x10 => Some(Tag::String),
            0x11 => Some(Tag::Bytes),
            0x40 => Some(Tag::Handle),
            _ => None,
        }
    }
}

/// An opaque reference to a resource owned by whichever side minted it.
///
/// The codec moves the number and nothing else. Only the owning side's resource
/// table can turn a `Handle` back into an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    /// The "no object" handle.
    pub const NULL: Handle = Handle(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "handle-null")
        } else {
            write!(f, "handle-{}", self.0)
        }
    }
}

/// An append-only encoder.
///
/// Items are written in call order; the resulting buffer must be read back in
/// the same order with the same types.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Creates a new encoder with default capacity.
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(256) }
    }

    /// Consumes the encoder and returns the final byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a view of the current buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn write_tag(&mut self, tag: Tag) {
        self.buf.push(tag as u8);
    }

    fn write_blob(&mut self, tag: Tag, v: &[u8]) -> Result<()> {
        let len = v.len();
        if len > u32::MAX as usize { return Err(Error::BlobTooLarge(len)); }
        self.write_tag(tag);
        self.buf.extend_from_slice(&(len as u32).to_le_bytes());
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Encodes a signed 32-bit integer (LE).
    pub fn s32(&mut self, v: i32) { self.write_tag(Tag::S32); self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Encodes a signed 64-bit integer (LE).
    pub fn s64(&mut self, v: i64) { self.write_tag(Tag::S64); self.buf.extend_from_slice(&v.to_le_bytes()); }
    /// Encodes a 32-bit float (LE, raw bits).
    pub fn f32(&mut self, v: f32) { self.write_tag(Tag::F32); self.buf.extend_from_slice(&v.to_bits().to_le_bytes()); }
    /// Encodes an opaque handle.
    pub fn handle(&mut self, v: Handle) { self.write_tag(Tag::Handle); self.buf.extend_from_slice(&v.raw().to_le_bytes()); }

    /// Encodes a UTF-8 string blob.
    pub fn str(&mut self, v: &str) -> Result<()> {
        self.write_blob(Tag::String, v.as_bytes())
    }

    /// Encodes a raw byte blob.
    pub fn bytes(&mut self, v: &[u8]) -> Result<()> {
        self.write_blob(Tag::Bytes, v)
    }
}

/// A zero-copy, bounds-checked cursor over a byte slice.
///
/// Decoders are immutable views. Reading advances the internal cursor.
///
/// # Errors
/// All read operations return `Error::UnexpectedEnd` if the buffer is exhausted,
/// and `Error::InvalidTag` if the next item is not of the requested type.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over the slice.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Returns the remaining bytes in the view.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Peeks the next Tag without advancing.
    pub fn peek_tag(&self) -> Result<Tag> {
        let Some(&b) = self.buf.first() else { return Err(Error::UnexpectedEnd) };
        Tag::from_u8(b).ok_or(Error::InvalidTag(b))
    }

    fn consume(&mut self, n: usize) -> Result<()> {
        if n > self.buf.len() { return Err(Error::UnexpectedEnd); }
        self.buf = &self.buf[n..];
        Ok(())
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() { return Err(Error::UnexpectedEnd); }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_len(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.read_array()?) as usize)
    }

    fn check_tag(&mut self, expected: Tag) -> Result<()> {
        let tag = self.peek_tag()?;
        if tag == expected {
            self.consume(1)
        } else {
            Err(Error::InvalidTag(tag as u8))
        }
    }

    /// Skips the next item.
    pub fn skip(&mut self) -> Result<()> {
        let tag = self.peek_tag()?;
        self.consume(1)?;

        match tag {
            Tag::S32 | Tag::F32 | Tag::Handle => self.consume(4),
            Tag::S64 => self.consume(8),
            Tag::String | Tag::Bytes => {
                let len = self.read_len()?;
                self.consume(len)
            }
        }
    }

    /// Decodes s32 (LE).
    pub fn s32(&mut self) -> Result<i32> { self.check_tag(Tag::S32)?; Ok(i32::from_le_bytes(self.read_array()?)) }
    /// Decodes s64 (LE).
    pub fn s64(&mut self) -> Result<i64> { self.check_tag(Tag::S64)?; Ok(i64::from_le_bytes(self.read_array()?)) }
    /// Decodes f32 (LE, raw bits).
    pub fn f32(&mut self) -> Result<f32> { self.check_tag(Tag::F32)?; Ok(f32::from_bits(u32::from_le_bytes(self.read_array()?))) }
    /// Decodes an opaque handle.
    pub fn handle(&mut self) -> Result<Handle> { self.check_tag(Tag::Handle)?; Ok(Handle(u32::from_le_bytes(self.read_array()?))) }

    /// Decodes a string slice (UTF-8).
    pub fn str(&mut self) -> Result<&'a str> {
        self.check_tag(Tag::String)?;
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    /// Decodes a byte slice.
    pub fn bytes(&mut self) -> Result<&'a [u8]> {
        self.check_tag(Tag::Bytes)?;
        let len = self.read_len()?;
        self.read_bytes(len)
    }
}
