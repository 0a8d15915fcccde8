//! `s2s-tensor` - Matrix library with pluggable compute backends for seq2seq-runtime.
//!
//! This crate provides:
//! - A `Tensor` type holding contiguous row-major f32 data
//! - A `ComputeBackend` trait for pluggable compute (CPU today, accelerators later)
//! - A reference `CpuBackend` implementation
//! - Row gather and column selection, the two primitives beam reassembly
//!   and vocabulary short-listing are built on

pub mod backend;
pub mod cpu;
pub mod error;
pub mod shape;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::ComputeBackend;
pub use cpu::CpuBackend;
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use tensor::Tensor;
