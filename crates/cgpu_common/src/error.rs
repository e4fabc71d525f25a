//! Error types for cgpu.

use thiserror::Error;

/// Failures while talking to the NVIDIA driver stack.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("nvidia-smi not found on PATH")]
    ToolMissing,

    #[error("nvidia-smi exited with code {code}: {stderr}")]
    QueryFailed { code: i32, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Version tag with no entry in the CUDA index table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown CUDA version '{tag}'")]
pub struct UnknownCudaVersion {
    pub tag: String,
}
