//! Little-endian primitives shared by the GGUF reader and writer.

use std::io::{Read, Write};

use crate::error::{ModelError, Result};

/// Upper bound on capacity reserved up front for a count read from a file.
pub(crate) const MAX_PREALLOC: usize = 1 << 16;

pub(crate) fn read_bytes<const N: usize>(reader: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub(crate) fn read_u32(reader: &mut impl Read) -> Result<u32> {
    Ok(u32::from_le_bytes(read_bytes(reader)?))
}

pub(crate) fn read_u64(reader: &mut impl Read) -> Result<u64> {
    Ok(u64::from_le_bytes(read_bytes(reader)?))
}

/// Read a GGUF string: u64 length followed by that many UTF-8 bytes.
///
/// The buffer grows with the bytes actually present, so a corrupt length
/// fails as a short read rather than a huge allocation.
pub(crate) fn read_string(reader: &mut impl Read) -> Result<String> {
    let len = read_u64(reader)?;
    let mut buf = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("string of {} bytes cut short at {}", len, buf.len()),
        )
        .into());
    }
    String::from_utf8(buf).map_err(|e| ModelError::Other(format!("invalid UTF-8 in string: {}", e)))
}

pub(crate) fn write_u32(writer: &mut impl Write, v: u32) -> Result<()> {
    writer.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_u64(writer: &mut impl Write, v: u64) -> Result<()> {
    writer.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_string(writer: &mut impl Write, s: &str) -> Result<()> {
    write_u64(writer, s.len() as u64)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}
