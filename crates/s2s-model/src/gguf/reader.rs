use std::collections::HashMap;
use std::io::{BufReader, Seek};
use std::path::Path;

use memmap2::Mmap;

use s2s_tensor::{Shape, Tensor};

use crate::error::{ModelError, Result};
use super::header::{GgufHeader, GGUF_DEFAULT_ALIGNMENT};
use super::metadata::GgufMetadata;
use super::tensor_info::{self, GgufTensorInfo, TensorType};

/// Round `pos` up to the next multiple of the GGUF data alignment.
pub(crate) fn align(pos: usize) -> usize {
    (pos + GGUF_DEFAULT_ALIGNMENT - 1) & !(GGUF_DEFAULT_ALIGNMENT - 1)
}

/// A parsed GGUF file backed by a memory-mapped region.
///
/// After parsing the header, metadata, and tensor info table from the file,
/// the entire file is memory-mapped so that tensor data can be accessed
/// without additional reads.
pub struct GgufFile {
    pub header: GgufHeader,
    pub metadata: GgufMetadata,
    pub tensor_infos: Vec<GgufTensorInfo>,
    by_name: HashMap<String, usize>,
    mmap: Mmap,
    /// Byte offset within the file where tensor data begins (aligned).
    data_offset: usize,
}

impl GgufFile {
    /// Open and parse a GGUF file from disk.
    pub fn open(path: &Path) -> Result<GgufFile> {
        let file = std::fs::File::open(path)?;
        let mut reader = BufReader::new(&file);

        let header = GgufHeader::parse(&mut reader)?;
        let metadata = GgufMetadata::parse_kv(&mut reader, header.n_kv)?;
        let tensor_infos = tensor_info::parse_tensor_infos(&mut reader, header.n_tensors)?;

        let data_offset = align(reader.stream_position()? as usize);

        // SAFETY: the map is read-only and the file is not modified while
        // the weights are being copied out of it.
        let mmap = unsafe { Mmap::map(&file)? };

        let by_name = tensor_infos
            .iter()
            .enumerate()
            .map(|(i, info)| (info.name.clone(), i))
            .collect();

        log::debug!(
            "parsed GGUF {}: {} metadata keys, {} tensors",
            path.display(),
            metadata.len(),
            tensor_infos.len()
        );

        Ok(GgufFile {
            header,
            metadata,
            tensor_infos,
            by_name,
            mmap,
            data_offset,
        })
    }

    pub fn tensor_info(&self, name: &str) -> Option<&GgufTensorInfo> {
        self.by_name.get(name).map(|&i| &self.tensor_infos[i])
    }

    /// Get the raw bytes of a tensor, checking they lie inside the file.
    pub fn tensor_data(&self, info: &GgufTensorInfo) -> Result<&[u8]> {
        let truncated = || ModelError::TruncatedTensor(info.name.clone());
        let start = usize::try_from(info.offset)
            .ok()
            .and_then(|offset| self.data_offset.checked_add(offset))
            .ok_or_else(truncated)?;
        let end = info
            .data_size()
            .and_then(|size| start.checked_add(size))
            .ok_or_else(truncated)?;
        self.mmap.get(start..end).ok_or_else(truncated)
    }

    /// Load a tensor by name as f32, widening F16 data.
    ///
    /// The returned tensor uses row-major dimension order.
    pub fn get_tensor(&self, name: &str) -> Result<Tensor> {
        let info = self
            .tensor_info(name)
            .ok_or_else(|| ModelError::TensorNotFound(name.to_string()))?;

        let raw = self.tensor_data(info)?;
        let data = match info.dtype {
            TensorType::F32 => raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            TensorType::F16 => raw
                .chunks_exact(2)
                .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
                .collect(),
        };

        Ok(Tensor::new(data, Shape::new(info.row_major_dims())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gguf::writer::GgufWriter;

    fn open_small() -> (tempfile::TempDir, GgufFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.gguf");
        let mut w = GgufWriter::new();
        w.add_tensor("a", &Tensor::zeros(Shape::matrix(2, 2)), TensorType::F32);
        w.write_to_path(&path).unwrap();
        let gguf = GgufFile::open(&path).unwrap();
        (dir, gguf)
    }

    #[test]
    fn test_out_of_file_ranges_are_truncation() {
        let (_dir, gguf) = open_small();
        let mut info = gguf.tensor_info("a").unwrap().clone();
        assert_eq!(gguf.tensor_data(&info).unwrap().len(), 16);

        info.offset = u64::MAX;
        assert!(matches!(gguf.tensor_data(&info), Err(ModelError::TruncatedTensor(_))));

        info.offset = 0;
        info.dims = vec![u64::MAX, 4];
        assert!(matches!(gguf.tensor_data(&info), Err(ModelError::TruncatedTensor(_))));
    }

    #[test]
    fn test_corrupt_key_length_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.gguf");
        let mut w = GgufWriter::new();
        w.add_string("s2s.architecture", "dl4mt");
        let mut buf = Vec::new();
        w.write(&mut buf).unwrap();
        // magic, version, n_tensors and n_kv take 24 bytes; the first key length follows.
        buf[24..32].copy_from_slice(&u64::MAX.to_le_bytes());
        std::fs::write(&path, &buf).unwrap();

        assert!(matches!(GgufFile::open(&path), Err(ModelError::Io(_))));
    }
}
