use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use s2s_tensor::Tensor;

use crate::error::Result;
use super::header::{GgufHeader, GGUF_VERSION};
use super::metadata::{GgufMetadata, GgufMetadataValue};
use super::reader::align;
use super::tensor_info::{GgufTensorInfo, TensorType};

/// Builds a GGUF v3 file in memory and writes it out in one pass.
#[derive(Default)]
pub struct GgufWriter {
    metadata: GgufMetadata,
    infos: Vec<GgufTensorInfo>,
    data: Vec<Vec<u8>>,
    next_offset: usize,
}

impl GgufWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_u32(&mut self, key: &str, value: u32) -> &mut Self {
        self.metadata.insert(key, GgufMetadataValue::U32(value));
        self
    }

    pub fn add_string(&mut self, key: &str, value: &str) -> &mut Self {
        self.metadata
            .insert(key, GgufMetadataValue::String(value.to_string()));
        self
    }

    /// Queue a tensor, encoding it as `dtype`.
    pub fn add_tensor(&mut self, name: &str, tensor: &Tensor, dtype: TensorType) -> &mut Self {
        let bytes: Vec<u8> = match dtype {
            TensorType::F32 => tensor
                .data_f32()
                .iter()
                .flat_map(|v| v.to_le_bytes())
                .collect(),
            TensorType::F16 => tensor
                .data_f32()
                .iter()
                .flat_map(|&v| half::f16::from_f32(v).to_le_bytes())
                .collect(),
        };

        let offset = align(self.next_offset);
        self.next_offset = offset + bytes.len();
        self.infos.push(GgufTensorInfo {
            name: name.to_string(),
            dims: tensor.shape().dims().iter().rev().map(|&d| d as u64).collect(),
            dtype,
            offset: offset as u64,
        });
        self.data.push(bytes);
        self
    }

    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        let header = GgufHeader {
            version: GGUF_VERSION,
            n_tensors: self.infos.len() as u64,
            n_kv: self.metadata.len() as u64,
        };

        let mut head = Vec::new();
        header.write(&mut head)?;
        self.metadata.write_kv(&mut head)?;
        for info in &self.infos {
            info.write(&mut head)?;
        }
        head.resize(align(head.len()), 0);
        writer.write_all(&head)?;

        let mut written = 0usize;
        for (info, bytes) in self.infos.iter().zip(&self.data) {
            let pad = info.offset as usize - written;
            writer.write_all(&vec![0u8; pad])?;
            writer.write_all(bytes)?;
            written = info.offset as usize + bytes.len();
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::gguf::reader::GgufFile;
    use approx::assert_abs_diff_eq;
    use s2s_tensor::Shape;

    fn matrix() -> Tensor {
        Tensor::new(vec![0.5, -1.25, 2.0, 3.5, 0.0, -0.75], Shape::matrix(2, 3))
    }

    #[test]
    fn test_written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.gguf");

        let mut w = GgufWriter::new();
        w.add_string("s2s.architecture", "dl4mt")
            .add_u32("s2s.hidden_size", 3)
            .add_tensor("a", &matrix(), TensorType::F32)
            .add_tensor("b", &matrix(), TensorType::F16);
        w.write_to_path(&path).unwrap();

        let gguf = GgufFile::open(&path).unwrap();
        assert_eq!(gguf.metadata.get_u32("s2s.hidden_size").unwrap(), 3);
        assert_eq!(gguf.tensor_info("a").unwrap().dims, vec![3, 2]);

        let a = gguf.get_tensor("a").unwrap();
        assert_eq!(a, matrix());

        // These values are all exactly representable in half precision.
        let b = gguf.get_tensor("b").unwrap();
        assert_eq!(b.shape().dims(), &[2, 3]);
        for (x, y) in b.data_f32().iter().zip(matrix().data_f32()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-3);
        }

        assert!(matches!(
            gguf.get_tensor("missing"),
            Err(ModelError::TensorNotFound(_))
        ));
    }

    #[test]
    fn test_truncated_file_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.gguf");

        let mut w = GgufWriter::new();
        w.add_tensor("a", &matrix(), TensorType::F32);
        let mut buf = Vec::new();
        w.write(&mut buf).unwrap();
        buf.truncate(buf.len() - 4);
        std::fs::write(&path, &buf).unwrap();

        let gguf = GgufFile::open(&path).unwrap();
        assert!(matches!(
            gguf.get_tensor("a"),
            Err(ModelError::TruncatedTensor(_))
        ));
    }
}
