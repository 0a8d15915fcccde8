use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::error::{ModelError, Result};
use super::io::{
    read_bytes, read_string, read_u32, read_u64, write_string, write_u32, write_u64, MAX_PREALLOC,
};

/// A single GGUF metadata value.
///
/// Every GGUF value type is parsed so unknown keys can be skipped, though
/// the model only ever reads strings and u32s.
#[derive(Debug, Clone, PartialEq)]
pub enum GgufMetadataValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Array(Vec<GgufMetadataValue>),
}

impl GgufMetadataValue {
    fn type_name(&self) -> &'static str {
        match self {
            GgufMetadataValue::U8(_) => "U8",
            GgufMetadataValue::I8(_) => "I8",
            GgufMetadataValue::U16(_) => "U16",
            GgufMetadataValue::I16(_) => "I16",
            GgufMetadataValue::U32(_) => "U32",
            GgufMetadataValue::I32(_) => "I32",
            GgufMetadataValue::U64(_) => "U64",
            GgufMetadataValue::I64(_) => "I64",
            GgufMetadataValue::F32(_) => "F32",
            GgufMetadataValue::F64(_) => "F64",
            GgufMetadataValue::Bool(_) => "Bool",
            GgufMetadataValue::String(_) => "String",
            GgufMetadataValue::Array(_) => "Array",
        }
    }

    /// GGUF value type ID:
    ///   0=U8, 1=I8, 2=U16, 3=I16, 4=U32, 5=I32, 6=F32, 7=Bool,
    ///   8=String, 9=Array, 10=U64, 11=I64, 12=F64
    fn type_id(&self) -> u32 {
        match self {
            GgufMetadataValue::U8(_) => 0,
            GgufMetadataValue::I8(_) => 1,
            GgufMetadataValue::U16(_) => 2,
            GgufMetadataValue::I16(_) => 3,
            GgufMetadataValue::U32(_) => 4,
            GgufMetadataValue::I32(_) => 5,
            GgufMetadataValue::F32(_) => 6,
            GgufMetadataValue::Bool(_) => 7,
            GgufMetadataValue::String(_) => 8,
            GgufMetadataValue::Array(_) => 9,
            GgufMetadataValue::U64(_) => 10,
            GgufMetadataValue::I64(_) => 11,
            GgufMetadataValue::F64(_) => 12,
        }
    }

    fn read(reader: &mut impl Read, type_id: u32) -> Result<GgufMetadataValue> {
        use GgufMetadataValue as V;
        Ok(match type_id {
            0 => V::U8(read_bytes::<1>(reader)?[0]),
            1 => V::I8(read_bytes::<1>(reader)?[0] as i8),
            2 => V::U16(u16::from_le_bytes(read_bytes(reader)?)),
            3 => V::I16(i16::from_le_bytes(read_bytes(reader)?)),
            4 => V::U32(read_u32(reader)?),
            5 => V::I32(i32::from_le_bytes(read_bytes(reader)?)),
            6 => V::F32(f32::from_le_bytes(read_bytes(reader)?)),
            7 => V::Bool(read_bytes::<1>(reader)?[0] != 0),
            8 => V::String(read_string(reader)?),
            9 => {
                let elem_type = read_u32(reader)?;
                let count = read_u64(reader)? as usize;
                let mut values = Vec::with_capacity(count.min(MAX_PREALLOC));
                for _ in 0..count {
                    values.push(Self::read(reader, elem_type)?);
                }
                V::Array(values)
            }
            10 => V::U64(read_u64(reader)?),
            11 => V::I64(i64::from_le_bytes(read_bytes(reader)?)),
            12 => V::F64(f64::from_le_bytes(read_bytes(reader)?)),
            other => return Err(ModelError::UnsupportedGgufType(other)),
        })
    }

    fn write_payload(&self, writer: &mut impl Write) -> Result<()> {
        use GgufMetadataValue as V;
        match self {
            V::U8(v) => writer.write_all(&v.to_le_bytes())?,
            V::I8(v) => writer.write_all(&v.to_le_bytes())?,
            V::U16(v) => writer.write_all(&v.to_le_bytes())?,
            V::I16(v) => writer.write_all(&v.to_le_bytes())?,
            V::U32(v) => write_u32(writer, *v)?,
            V::I32(v) => writer.write_all(&v.to_le_bytes())?,
            V::U64(v) => write_u64(writer, *v)?,
            V::I64(v) => writer.write_all(&v.to_le_bytes())?,
            V::F32(v) => writer.write_all(&v.to_le_bytes())?,
            V::F64(v) => writer.write_all(&v.to_le_bytes())?,
            V::Bool(v) => writer.write_all(&[*v as u8])?,
            V::String(s) => write_string(writer, s)?,
            V::Array(values) => {
                // An empty array is written with element type U8.
                let elem_type = values.first().map(|v| v.type_id()).unwrap_or(0);
                if let Some(bad) = values.iter().find(|v| v.type_id() != elem_type) {
                    return Err(ModelError::Other(format!(
                        "mixed-type GGUF array: {} among type id {}",
                        bad.type_name(),
                        elem_type
                    )));
                }
                write_u32(writer, elem_type)?;
                write_u64(writer, values.len() as u64)?;
                for v in values {
                    v.write_payload(writer)?;
                }
            }
        }
        Ok(())
    }
}

/// Collection of GGUF metadata key-value pairs.
///
/// Kept ordered so that written files are byte-for-byte reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GgufMetadata {
    pub entries: BTreeMap<String, GgufMetadataValue>,
}

impl GgufMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: GgufMetadataValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&GgufMetadataValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retrieve a string value by key.
    pub fn get_string(&self, key: &str) -> Result<&str> {
        match self.entries.get(key) {
            Some(GgufMetadataValue::String(s)) => Ok(s.as_str()),
            Some(other) => Err(type_mismatch(key, "String", other)),
            None => Err(ModelError::MissingKey(key.to_string())),
        }
    }

    /// Retrieve a u32 value by key.
    pub fn get_u32(&self, key: &str) -> Result<u32> {
        match self.entries.get(key) {
            Some(GgufMetadataValue::U32(v)) => Ok(*v),
            Some(other) => Err(type_mismatch(key, "U32", other)),
            None => Err(ModelError::MissingKey(key.to_string())),
        }
    }

    /// Parse `n_kv` entries: GGUF string key, u32 value type ID, payload.
    pub fn parse_kv(reader: &mut impl Read, n_kv: u64) -> Result<GgufMetadata> {
        let mut entries = BTreeMap::new();
        for _ in 0..n_kv {
            let key = read_string(reader)?;
            let type_id = read_u32(reader)?;
            let value = GgufMetadataValue::read(reader, type_id)?;
            entries.insert(key, value);
        }
        Ok(GgufMetadata { entries })
    }

    pub fn write_kv(&self, writer: &mut impl Write) -> Result<()> {
        for (key, value) in &self.entries {
            write_string(writer, key)?;
            write_u32(writer, value.type_id())?;
            value.write_payload(writer)?;
        }
        Ok(())
    }
}

fn type_mismatch(key: &str, expected: &str, got: &GgufMetadataValue) -> ModelError {
    ModelError::TypeMismatch {
        key: key.to_string(),
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_typed_getters() {
        let mut md = GgufMetadata::new();
        md.insert("s2s.hidden_size", GgufMetadataValue::U32(8));
        md.insert("s2s.architecture", GgufMetadataValue::String("dl4mt".into()));

        assert_eq!(md.get_u32("s2s.hidden_size").unwrap(), 8);
        assert_eq!(md.get_string("s2s.architecture").unwrap(), "dl4mt");
        assert!(matches!(
            md.get_u32("s2s.architecture"),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert!(matches!(md.get_u32("nope"), Err(ModelError::MissingKey(_))));
    }

    #[test]
    fn test_parse_skips_foreign_value_types() {
        let mut md = GgufMetadata::new();
        md.insert("general.name", GgufMetadataValue::String("tiny".into()));
        md.insert("general.scale", GgufMetadataValue::F64(0.5));
        md.insert(
            "general.tags",
            GgufMetadataValue::Array(vec![
                GgufMetadataValue::I16(-3),
                GgufMetadataValue::I16(4),
            ]),
        );
        md.insert("s2s.hidden_size", GgufMetadataValue::U32(16));

        let mut buf = Vec::new();
        md.write_kv(&mut buf).unwrap();
        let parsed = GgufMetadata::parse_kv(&mut Cursor::new(buf), md.len() as u64).unwrap();
        assert_eq!(parsed, md);
    }

    #[test]
    fn test_mixed_array_rejected() {
        let v = GgufMetadataValue::Array(vec![
            GgufMetadataValue::U8(1),
            GgufMetadataValue::Bool(true),
        ]);
        assert!(v.write_payload(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_unknown_type_id() {
        let mut buf = Vec::new();
        write_string(&mut buf, "k").unwrap();
        write_u32(&mut buf, 99).unwrap();
        let err = GgufMetadata::parse_kv(&mut Cursor::new(buf), 1).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedGgufType(99)));
    }
}
