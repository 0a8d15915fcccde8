use std::io::{Read, Write};

use crate::error::{ModelError, Result};
use super::io::{read_string, read_u32, read_u64, write_string, write_u32, write_u64};

/// Most dimensions a GGUF tensor may have.
pub const MAX_DIMS: usize = 4;

/// Element types the loader understands.
///
/// Quantized GGUF block types are rejected at parse time; the recurrent
/// weights of this model family are small enough to keep in float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorType {
    F32,
    /// IEEE 754 half precision, widened to f32 on load via the `half` crate.
    F16,
}

impl TensorType {
    pub fn from_gguf_type(id: u32) -> Option<TensorType> {
        match id {
            0 => Some(TensorType::F32),
            1 => Some(TensorType::F16),
            _ => None,
        }
    }

    pub fn to_gguf_type(&self) -> u32 {
        match self {
            TensorType::F32 => 0,
            TensorType::F16 => 1,
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        match self {
            TensorType::F32 => 4,
            TensorType::F16 => 2,
        }
    }
}

/// Describes a single tensor stored within a GGUF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GgufTensorInfo {
    pub name: String,
    /// Dimensions in GGUF order: `dims[0]` is the innermost (column) axis.
    pub dims: Vec<u64>,
    pub dtype: TensorType,
    /// Byte offset of this tensor's data from the start of the tensor data section.
    pub offset: u64,
}

impl GgufTensorInfo {
    /// Element count, or `None` if it does not fit in `usize`.
    pub fn numel(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |n, &d| {
            n.checked_mul(usize::try_from(d).ok()?)
        })
    }

    /// Size of the tensor data in bytes, or `None` on overflow.
    pub fn data_size(&self) -> Option<usize> {
        self.numel()?.checked_mul(self.dtype.size_in_bytes())
    }

    /// Dimensions in row-major order (outermost first).
    pub fn row_major_dims(&self) -> Vec<usize> {
        self.dims.iter().rev().map(|&d| d as usize).collect()
    }

    /// Entry layout: name, u32 n_dims, n_dims x u64 dims, u32 type ID, u64 offset.
    pub fn parse(reader: &mut impl Read) -> Result<GgufTensorInfo> {
        let name = read_string(reader)?;
        let n_dims = read_u32(reader)?;
        if n_dims as usize > MAX_DIMS {
            return Err(ModelError::Other(format!(
                "tensor '{}' has {} dimensions, at most {} supported",
                name, n_dims, MAX_DIMS
            )));
        }
        let mut dims = Vec::with_capacity(n_dims as usize);
        for _ in 0..n_dims {
            dims.push(read_u64(reader)?);
        }
        let type_id = read_u32(reader)?;
        let dtype = TensorType::from_gguf_type(type_id)
            .ok_or(ModelError::UnsupportedGgufType(type_id))?;
        let offset = read_u64(reader)?;

        Ok(GgufTensorInfo {
            name,
            dims,
            dtype,
            offset,
        })
    }

    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        write_string(writer, &self.name)?;
        write_u32(writer, self.dims.len() as u32)?;
        for &d in &self.dims {
            write_u64(writer, d)?;
        }
        write_u32(writer, self.dtype.to_gguf_type())?;
        write_u64(writer, self.offset)
    }
}

/// Parse `n_tensors` tensor info entries from a reader.
pub fn parse_tensor_infos(reader: &mut impl Read, n_tensors: u64) -> Result<Vec<GgufTensorInfo>> {
    (0..n_tensors).map(|_| GgufTensorInfo::parse(reader)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sizes() {
        let info = GgufTensorInfo {
            name: "decoder.output.w".into(),
            dims: vec![5, 3],
            dtype: TensorType::F16,
            offset: 0,
        };
        assert_eq!(info.numel(), Some(15));
        assert_eq!(info.data_size(), Some(30));
        assert_eq!(info.row_major_dims(), vec![3, 5]);
    }

    #[test]
    fn test_overflowing_size_is_none() {
        let info = GgufTensorInfo {
            name: "w".into(),
            dims: vec![u64::MAX, 2],
            dtype: TensorType::F32,
            offset: 0,
        };
        assert_eq!(info.numel(), None);
        assert_eq!(info.data_size(), None);
    }

    #[test]
    fn test_too_many_dims_rejected() {
        let info = GgufTensorInfo {
            name: "w".into(),
            dims: vec![1; MAX_DIMS + 1],
            dtype: TensorType::F32,
            offset: 0,
        };
        let mut buf = Vec::new();
        info.write(&mut buf).unwrap();
        assert!(matches!(
            GgufTensorInfo::parse(&mut Cursor::new(buf)),
            Err(ModelError::Other(msg)) if msg.contains("dimensions")
        ));
    }

    #[test]
    fn test_quantized_type_rejected() {
        let info = GgufTensorInfo {
            name: "w".into(),
            dims: vec![32],
            dtype: TensorType::F32,
            offset: 0,
        };
        let mut buf = Vec::new();
        info.write(&mut buf).unwrap();
        // Patch the type ID (after name, n_dims and one dim) to Q4_0.
        let type_pos = 8 + 1 + 4 + 8;
        buf[type_pos..type_pos + 4].copy_from_slice(&2u32.to_le_bytes());
        let err = GgufTensorInfo::parse(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedGgufType(2)));
    }
}
