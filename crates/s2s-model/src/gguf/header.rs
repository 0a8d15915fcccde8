use std::io::{Read, Write};

use crate::error::{ModelError, Result};
use super::io::{read_bytes, read_u32, read_u64, write_u32, write_u64};

/// The four-byte magic number identifying a GGUF file: ASCII "GGUF".
pub const GGUF_MAGIC: [u8; 4] = [0x47, 0x47, 0x55, 0x46];

/// The only container version read or written.
pub const GGUF_VERSION: u32 = 3;

/// Default alignment (in bytes) for tensor data within a GGUF file.
pub const GGUF_DEFAULT_ALIGNMENT: usize = 32;

/// Parsed GGUF file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GgufHeader {
    pub version: u32,
    /// Number of tensors stored in the file.
    pub n_tensors: u64,
    /// Number of key-value metadata entries.
    pub n_kv: u64,
}

impl GgufHeader {
    /// Parse and validate a GGUF header from the beginning of a reader.
    pub fn parse(reader: &mut impl Read) -> Result<GgufHeader> {
        let magic: [u8; 4] = read_bytes(reader)?;
        if magic != GGUF_MAGIC {
            return Err(ModelError::InvalidMagic(magic));
        }

        let version = read_u32(reader)?;
        if version != GGUF_VERSION {
            return Err(ModelError::UnsupportedVersion(version));
        }

        Ok(GgufHeader {
            version,
            n_tensors: read_u64(reader)?,
            n_kv: read_u64(reader)?,
        })
    }

    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&GGUF_MAGIC)?;
        write_u32(writer, self.version)?;
        write_u64(writer, self.n_tensors)?;
        write_u64(writer, self.n_kv)
    }
}
