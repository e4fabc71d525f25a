//! Device model and status query for the CUDA driver stack.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::smi;

/// Whether accelerated execution is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Cuda,
    Cpu,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Cuda => "cuda",
            DeviceClass::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One GPU as the driver reports it. Queried fresh each call, never cached.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub index: u32,
    pub name: String,
    /// Total VRAM in bytes.
    pub total_memory: u64,
    /// Bytes currently in use; None when the driver does not report the counter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_memory: Option<u64>,
    /// Bytes reserved by the driver; None when unreported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_memory: Option<u64>,
}

/// Snapshot of CUDA availability plus per-device details.
#[derive(Debug, Clone, Serialize)]
pub struct CudaStatus {
    pub available: bool,
    pub devices: Vec<DeviceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuda_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_version: Option<String>,
}

const DEVICE_FIELDS: [&str; 5] = [
    "index",
    "name",
    "memory.total",
    "memory.used",
    "memory.reserved",
];

/// Fields every nvidia-smi build answers. Old builds reject the memory
/// counter fields and fail the combined query outright.
const BASE_DEVICE_FIELDS: [&str; 3] = ["index", "name", "memory.total"];

/// nvidia-smi reports memory at MiB granularity.
const MIB: u64 = 1024 * 1024;

impl CudaStatus {
    /// Query the driver stack once and build a full snapshot.
    ///
    /// Err means the query tool itself is unusable (missing binary, io
    /// failure). A present-but-failing driver reports as unavailable.
    pub fn query() -> Result<Self, ProbeError> {
        let devices = match query_devices() {
            Ok(devices) => devices,
            Err(ProbeError::QueryFailed { code, stderr }) => {
                debug!("Device query failed (code {}): {}", code, stderr);
                return Ok(Self::unavailable());
            }
            Err(e) => return Err(e),
        };

        if devices.is_empty() {
            return Ok(Self::unavailable());
        }

        let (cuda_version, driver_version) = query_versions();

        Ok(CudaStatus {
            available: true,
            devices,
            cuda_version,
            driver_version,
        })
    }

    /// Snapshot for a host with no usable CUDA devices.
    pub fn unavailable() -> Self {
        CudaStatus {
            available: false,
            devices: Vec::new(),
            cuda_version: None,
            driver_version: None,
        }
    }

    /// Two-valued label for the snapshot.
    pub fn device_class(&self) -> DeviceClass {
        if self.available {
            DeviceClass::Cuda
        } else {
            DeviceClass::Cpu
        }
    }
}

fn query_devices() -> Result<Vec<DeviceInfo>, ProbeError> {
    devices_from(smi::query_gpu(&DEVICE_FIELDS, None), || {
        smi::query_gpu(&BASE_DEVICE_FIELDS, None)
    })
}

/// Devices from the full field query, with a base field fallback for builds
/// that reject the counter fields. Counter support only ever costs the
/// Allocated/Reserved lines, never availability.
fn devices_from<F>(
    full: Result<String, ProbeError>,
    base: F,
) -> Result<Vec<DeviceInfo>, ProbeError>
where
    F: FnOnce() -> Result<String, ProbeError>,
{
    let stdout = match full {
        Ok(stdout) => stdout,
        Err(ProbeError::QueryFailed { code, stderr }) => {
            debug!(
                "Counter field query failed (code {}): {}; asking for base fields",
                code, stderr
            );
            base()?
        }
        Err(e) => return Err(e),
    };

    let mut devices = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_device_line(line) {
            Some(device) => devices.push(device),
            None => warn!("Skipping unparseable device line: {}", line),
        }
    }
    Ok(devices)
}

fn parse_device_line(line: &str) -> Option<DeviceInfo> {
    let parts = smi::split_csv(line);
    if parts.len() < BASE_DEVICE_FIELDS.len() {
        return None;
    }

    Some(DeviceInfo {
        index: smi::parse_field(parts[0])?,
        name: parts[1].to_string(),
        total_memory: smi::parse_field::<u64>(parts[2])? * MIB,
        allocated_memory: counter_bytes(&parts, 3),
        reserved_memory: counter_bytes(&parts, 4),
    })
}

/// Counter column in bytes; None when the column is absent or unreported.
fn counter_bytes(parts: &[&str], index: usize) -> Option<u64> {
    parts
        .get(index)
        .and_then(|field| smi::parse_field::<u64>(field))
        .map(|mib| mib * MIB)
}

/// CUDA and driver versions from `nvidia-smi --version`, where reported.
fn query_versions() -> (Option<String>, Option<String>) {
    match smi::query_versions() {
        Ok(text) => parse_version_report(&text),
        Err(e) => {
            debug!("Version query failed: {}", e);
            (None, None)
        }
    }
}

fn parse_version_report(text: &str) -> (Option<String>, Option<String>) {
    let mut cuda = None;
    let mut driver = None;

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if key.starts_with("cuda version") {
            cuda = Some(value.to_string());
        } else if key.starts_with("driver version") {
            driver = Some(value.to_string());
        }
    }

    (cuda, driver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_line() {
        let device = parse_device_line("0, NVIDIA GeForce RTX 3070, 8192, 2048, 2560")
            .expect("line should parse");
        assert_eq!(device.index, 0);
        assert_eq!(device.name, "NVIDIA GeForce RTX 3070");
        assert_eq!(device.total_memory, 8192 * MIB);
        assert_eq!(device.allocated_memory, Some(2048 * MIB));
        assert_eq!(device.reserved_memory, Some(2560 * MIB));
    }

    #[test]
    fn test_parse_device_line_missing_counters() {
        let device = parse_device_line("1, Tesla K80, 11441, [N/A], [Not Supported]")
            .expect("line should parse");
        assert_eq!(device.index, 1);
        assert_eq!(device.total_memory, 11441 * MIB);
        assert_eq!(device.allocated_memory, None);
        assert_eq!(device.reserved_memory, None);
    }

    #[test]
    fn test_parse_device_line_truncated() {
        assert!(parse_device_line("0, NVIDIA GeForce RTX 3070").is_none());
        assert!(parse_device_line("").is_none());
    }

    #[test]
    fn test_parse_device_line_base_fields_only() {
        let device =
            parse_device_line("0, NVIDIA GeForce RTX 3070, 8192").expect("line should parse");
        assert_eq!(device.index, 0);
        assert_eq!(device.total_memory, 8192 * MIB);
        assert_eq!(device.allocated_memory, None);
        assert_eq!(device.reserved_memory, None);
    }

    #[test]
    fn test_counter_rejection_falls_back_to_base_fields() {
        let rejected = ProbeError::QueryFailed {
            code: 2,
            stderr: "\"memory.reserved\" is not a valid field to query".to_string(),
        };
        let devices = devices_from(Err(rejected), || {
            Ok("0, NVIDIA GeForce RTX 3070, 8192\n".to_string())
        })
        .expect("base query should answer");

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "NVIDIA GeForce RTX 3070");
        assert_eq!(devices[0].allocated_memory, None);
        assert_eq!(devices[0].reserved_memory, None);
    }

    #[test]
    fn test_missing_tool_skips_fallback() {
        let result = devices_from(Err(ProbeError::ToolMissing), || {
            panic!("base query should not run")
        });
        assert!(matches!(result, Err(ProbeError::ToolMissing)));
    }

    #[test]
    fn test_both_queries_failing_stays_a_query_failure() {
        let failed = || ProbeError::QueryFailed {
            code: 15,
            stderr: "couldn't communicate with the NVIDIA driver".to_string(),
        };
        let result = devices_from(Err(failed()), || Err(failed()));
        assert!(matches!(result, Err(ProbeError::QueryFailed { .. })));
    }

    #[test]
    fn test_parse_version_report() {
        let text = "NVIDIA-SMI version  : 550.54.14\n\
                    NVML version        : 550.54\n\
                    DRIVER version      : 550.54.14\n\
                    CUDA Version        : 12.4\n";
        let (cuda, driver) = parse_version_report(text);
        assert_eq!(cuda.as_deref(), Some("12.4"));
        assert_eq!(driver.as_deref(), Some("550.54.14"));
    }

    #[test]
    fn test_parse_version_report_empty() {
        let (cuda, driver) = parse_version_report("no version keys in here\n");
        assert_eq!(cuda, None);
        assert_eq!(driver, None);
    }

    #[test]
    fn test_device_class() {
        assert_eq!(CudaStatus::unavailable().device_class(), DeviceClass::Cpu);
        assert_eq!(DeviceClass::Cuda.as_str(), "cuda");
        assert_eq!(DeviceClass::Cpu.to_string(), "cpu");
    }
}
