pub mod header;
pub(crate) mod io;
pub mod metadata;
pub mod reader;
pub mod tensor_info;
pub mod writer;

pub use header::{GgufHeader, GGUF_DEFAULT_ALIGNMENT, GGUF_MAGIC};
pub use metadata::{GgufMetadata, GgufMetadataValue};
pub use reader::GgufFile;
pub use tensor_info::{GgufTensorInfo, TensorType};
pub use writer::GgufWriter;
