//! Persistence of logical data.
//!
//! Only the logical side is stored: a format version, the logical string,
//! the marker count and each marker as `(id, pos)`. Physical data is always
//! rebuilt from the logical data and the field map on load.

use crate::error::{Result, SubstError};
use crate::field::{FieldId, FieldMap};
use crate::logical::{FieldMarker, LogicalData};
use crate::physical::PhysicalData;

/// Current archive format version.
pub const ARCHIVE_VERSION: u64 = 0;

/// Sink for the archive primitives.
pub trait ArchiveWriter {
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_count(&mut self, value: u64) -> Result<()>;
}

/// Source of the archive primitives.
pub trait ArchiveReader {
    fn read_string(&mut self) -> Result<String>;
    fn read_count(&mut self) -> Result<u64>;
}

/// Archive writer producing postcard (varint) bytes.
#[derive(Clone, Debug, Default)]
pub struct PostcardWriter {
    buf: Vec<u8>,
}

impl PostcardWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl ArchiveWriter for PostcardWriter {
    fn write_string(&mut self, value: &str) -> Result<()> {
        self.buf.extend(postcard::to_stdvec(value)?);
        Ok(())
    }

    fn write_count(&mut self, value: u64) -> Result<()> {
        self.buf.extend(postcard::to_stdvec(&value)?);
        Ok(())
    }
}

/// Archive reader over postcard bytes.
#[derive(Clone, Debug)]
pub struct PostcardReader<'a> {
    rest: &'a [u8],
}

impl<'a> PostcardReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

impl ArchiveReader for PostcardReader<'_> {
    fn read_string(&mut self) -> Result<String> {
        let (value, rest) = postcard::take_from_bytes::<String>(self.rest)?;
        self.rest = rest;
        Ok(value)
    }

    fn read_count(&mut self) -> Result<u64> {
        let (value, rest) = postcard::take_from_bytes::<u64>(self.rest)?;
        self.rest = rest;
        Ok(value)
    }
}

fn to_usize(value: u64, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| SubstError::Archive(format!("{what} {value} does not fit")))
}

impl<F: FieldId> FieldMarker<F> {
    pub fn encode(&self, writer: &mut impl ArchiveWriter) -> Result<()> {
        writer.write_count(self.id.to_raw())?;
        writer.write_count(self.pos as u64)
    }

    pub fn decode(reader: &mut impl ArchiveReader) -> Result<Self> {
        let raw = reader.read_count()?;
        let id = F::from_raw(raw)
            .ok_or_else(|| SubstError::Archive(format!("field id {raw} is out of range")))?;
        let pos = to_usize(reader.read_count()?, "marker position")?;
        Ok(Self::new(id, pos))
    }
}

impl<F: FieldId> LogicalData<F> {
    pub fn encode(&self, writer: &mut impl ArchiveWriter) -> Result<()> {
        writer.write_count(ARCHIVE_VERSION)?;
        writer.write_string(&self.text())?;
        writer.write_count(self.markers.len() as u64)?;
        for marker in &self.markers {
            marker.encode(writer)?;
        }
        Ok(())
    }

    /// Decode and validate against `map`.
    pub fn decode(reader: &mut impl ArchiveReader, map: FieldMap<F>) -> Result<Self> {
        let version = reader.read_count()?;
        if version != ARCHIVE_VERSION {
            return Err(SubstError::UnsupportedVersion { found: version });
        }
        let text = reader.read_string()?;
        let count = to_usize(reader.read_count()?, "marker count")?;
        let mut markers = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            markers.push(FieldMarker::decode(reader)?);
        }
        tracing::debug!(len = text.len(), fields = count, "decoded logical data");
        Self::from_parts(map, &text, markers)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = PostcardWriter::new();
        self.encode(&mut writer)?;
        Ok(writer.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8], map: FieldMap<F>) -> Result<Self> {
        Self::decode(&mut PostcardReader::new(bytes), map)
    }
}

impl<F: FieldId> PhysicalData<F> {
    /// Store the logical side.
    pub fn encode(&self, writer: &mut impl ArchiveWriter) -> Result<()> {
        self.logical().encode(writer)
    }

    /// Load logical data and rebuild the physical side from it.
    pub fn decode(reader: &mut impl ArchiveReader, map: FieldMap<F>) -> Result<Self> {
        Self::from_logical(&LogicalData::decode(reader, map)?)
    }
}
