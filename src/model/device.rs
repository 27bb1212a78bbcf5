use std::fmt;

use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

/// The device inference runs on. Picked once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cuda,
    Cpu,
}

impl ComputeDevice {
    /// CUDA if the execution provider is usable in this build/host, CPU
    /// otherwise.
    pub fn detect() -> Self {
        if CUDAExecutionProvider::default()
            .is_available()
            .unwrap_or(false)
        {
            tracing::info!("CUDA execution provider available");
            ComputeDevice::Cuda
        } else {
            tracing::info!("CUDA unavailable, running inference on CPU");
            ComputeDevice::Cpu
        }
    }

    pub fn is_cuda(&self) -> bool {
        matches!(self, ComputeDevice::Cuda)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeDevice::Cuda => "cuda",
            ComputeDevice::Cpu => "cpu",
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
