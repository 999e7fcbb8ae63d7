//! Wire formats of the reference translator and host.
//!
//! A raw unit is what a compiler hands to `define`:
//!
//! ```text
//! "HSU1" | path_len: u16 BE | declared path (UTF-8, e.g. pkg/Foo.unit) | body
//! ```
//!
//! An image is what the host instantiates:
//!
//! ```text
//! "HSI1" | min_host_api: u16 BE | name_len: u16 BE | name (UTF-8, dotted)
//!        | body_len: u32 BE | body | crc32: u32 BE (over everything before it)
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FormatError;

pub const UNIT_MAGIC: &[u8; 4] = b"HSU1";
pub const IMAGE_MAGIC: &[u8; 4] = b"HSI1";

/// Bounds-checked cursor over a byte slice.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], FormatError> {
        let (head, rest) = self
            .buf
            .split_at_checked(n)
            .ok_or(FormatError::Truncated(what))?;
        self.buf = rest;
        Ok(head)
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, FormatError> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, FormatError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn str(&mut self, n: usize, what: &'static str) -> Result<&'a str, FormatError> {
        std::str::from_utf8(self.take(n, what)?).map_err(|_| FormatError::InvalidUtf8(what))
    }

    fn rest(self) -> &'a [u8] {
        self.buf
    }
}

/// Decoded raw unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    /// Path the compiler declared for the unit (`pkg/Foo.unit`).
    pub declared_path: String,
    pub body: Bytes,
}

impl RawUnit {
    pub fn new(declared_path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            declared_path: declared_path.into(),
            body: body.into(),
        }
    }

    pub fn decode(raw: &[u8]) -> Result<Self, FormatError> {
        let mut reader = Reader::new(raw);
        if reader.take(4, "unit magic")? != UNIT_MAGIC {
            return Err(FormatError::BadMagic);
        }
        let path_len = usize::from(reader.u16("unit path length")?);
        let declared_path = reader.str(path_len, "unit path")?.to_string();
        let body = Bytes::copy_from_slice(reader.rest());
        Ok(Self {
            declared_path,
            body,
        })
    }

    pub fn encode(&self) -> Result<Bytes, FormatError> {
        let path_len = u16::try_from(self.declared_path.len())
            .map_err(|_| FormatError::TooLong("unit path"))?;
        let mut out = BytesMut::with_capacity(
            UNIT_MAGIC
                .len()
                .saturating_add(2)
                .saturating_add(self.declared_path.len())
                .saturating_add(self.body.len()),
        );
        out.put_slice(UNIT_MAGIC);
        out.put_u16(path_len);
        out.put_slice(self.declared_path.as_bytes());
        out.put_slice(&self.body);
        Ok(out.freeze())
    }
}

/// Decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub min_host_api: u16,
    /// Dotted name of the unit the image defines.
    pub name: String,
    pub body: Bytes,
}

impl Image {
    pub fn encode(&self) -> Result<Bytes, FormatError> {
        let name_len =
            u16::try_from(self.name.len()).map_err(|_| FormatError::TooLong("image name"))?;
        let body_len =
            u32::try_from(self.body.len()).map_err(|_| FormatError::TooLong("image body"))?;

        let mut out = BytesMut::new();
        out.put_slice(IMAGE_MAGIC);
        out.put_u16(self.min_host_api);
        out.put_u16(name_len);
        out.put_slice(self.name.as_bytes());
        out.put_u32(body_len);
        out.put_slice(&self.body);
        let checksum = crc32fast::hash(&out);
        out.put_u32(checksum);
        Ok(out.freeze())
    }

    /// Decode and verify an image.
    ///
    /// The body is copied out so that nothing built from the image keeps the
    /// image buffer alive.
    pub fn decode(image: &[u8]) -> Result<Self, FormatError> {
        let payload_len = image
            .len()
            .checked_sub(4)
            .ok_or(FormatError::Truncated("image checksum"))?;
        let (payload, trailer) = image
            .split_at_checked(payload_len)
            .ok_or(FormatError::Truncated("image checksum"))?;
        let expected = Reader::new(trailer).u32("image checksum")?;
        if crc32fast::hash(payload) != expected {
            return Err(FormatError::ChecksumMismatch);
        }

        let mut reader = Reader::new(payload);
        if reader.take(4, "image magic")? != IMAGE_MAGIC {
            return Err(FormatError::BadMagic);
        }
        let min_host_api = reader.u16("image API level")?;
        let name_len = usize::from(reader.u16("image name length")?);
        let name = reader.str(name_len, "image name")?.to_string();
        let body_len = usize::try_from(reader.u32("image body length")?)
            .map_err(|_| FormatError::TooLong("image body"))?;
        let body = Bytes::copy_from_slice(reader.take(body_len, "image body")?);
        if !reader.rest().is_empty() {
            return Err(FormatError::TrailingBytes);
        }

        Ok(Self {
            min_host_api,
            name,
            body,
        })
    }
}
