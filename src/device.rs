//! Compute device detection
//!
//! Pruning needs an accelerator unless the job explicitly opts into the
//! reference CPU backend with `trainer.accelerator: cpu`.

use crate::config::AcceleratorKind;
use crate::error::{Error, Result};
use std::fmt;

/// Message raised when a GPU job runs on a host without one
pub const GPU_REQUIRED: &str = "GPU is required for the pruning.";

/// Compute device the job runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    /// Reference CPU backend
    Cpu,
    /// CUDA GPU with device ID
    Cuda { device_id: usize },
}

impl ComputeDevice {
    /// Check if CUDA is available
    #[must_use]
    pub fn cuda_available() -> bool {
        let visible = std::env::var("CUDA_VISIBLE_DEVICES").ok();
        cuda_visible(visible.as_deref(), nvidia_smi_ok)
    }

    /// Check if this device is CUDA
    #[must_use]
    pub const fn is_cuda(&self) -> bool {
        matches!(self, Self::Cuda { .. })
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Cuda { device_id } => write!(f, "CUDA:{device_id}"),
        }
    }
}

fn nvidia_smi_ok() -> bool {
    std::process::Command::new("nvidia-smi")
        .arg("--query-gpu=name")
        .arg("--format=csv,noheader")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// `CUDA_VISIBLE_DEVICES=""` or `-1` hides every device; any other value
/// counts as a device. Unset falls back to probing `nvidia-smi`.
fn cuda_visible(visible: Option<&str>, detect: impl FnOnce() -> bool) -> bool {
    match visible.map(str::trim) {
        Some("") | Some("-1") => false,
        Some(_) => true,
        None => detect(),
    }
}

fn resolve(kind: AcceleratorKind, cuda: bool) -> Result<ComputeDevice> {
    match kind {
        AcceleratorKind::Cpu => Ok(ComputeDevice::Cpu),
        AcceleratorKind::Gpu if cuda => Ok(ComputeDevice::Cuda { device_id: 0 }),
        AcceleratorKind::Gpu => Err(Error::Environment(GPU_REQUIRED.to_string())),
    }
}

/// Fail fast when the requested accelerator is not present
///
/// Must run before the checkpoint is restored or any data is fetched.
pub fn ensure_accelerator(kind: AcceleratorKind) -> Result<ComputeDevice> {
    let cuda = kind == AcceleratorKind::Gpu && ComputeDevice::cuda_available();
    resolve(kind, cuda)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_opt_in_never_detects() {
        assert_eq!(resolve(AcceleratorKind::Cpu, false).unwrap(), ComputeDevice::Cpu);
        assert_eq!(ensure_accelerator(AcceleratorKind::Cpu).unwrap(), ComputeDevice::Cpu);
    }

    #[test]
    fn test_gpu_missing_is_environment_error() {
        let err = resolve(AcceleratorKind::Gpu, false).unwrap_err();
        assert!(matches!(err, Error::Environment(ref m) if m == GPU_REQUIRED));
    }

    #[test]
    fn test_gpu_present() {
        let device = resolve(AcceleratorKind::Gpu, true).unwrap();
        assert!(device.is_cuda());
        assert_eq!(device.to_string(), "CUDA:0");
    }

    #[test]
    fn test_cuda_visible_rules() {
        assert!(!cuda_visible(Some(""), || true));
        assert!(!cuda_visible(Some("-1"), || true));
        assert!(cuda_visible(Some("0,1"), || false));
        assert!(cuda_visible(None, || true));
        assert!(!cuda_visible(None, || false));
    }
}
