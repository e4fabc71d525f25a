//! Thin client for the nvidia-smi management tool.
//!
//! Every query shells out fresh; nothing is cached between calls.

use std::process::Command;

use tracing::debug;

use crate::error::ProbeError;

/// Binary used for all device queries.
pub const SMI_BIN: &str = "nvidia-smi";

/// Run a `--query-gpu` request and return the raw CSV output.
///
/// `device_index` narrows the query to a single device when set.
pub fn query_gpu(fields: &[&str], device_index: Option<u32>) -> Result<String, ProbeError> {
    let mut args = vec![
        format!("--query-gpu={}", fields.join(",")),
        "--format=csv,noheader,nounits".to_string(),
    ];
    if let Some(index) = device_index {
        args.push("-i".to_string());
        args.push(index.to_string());
    }
    run(&args)
}

/// Ask the driver stack for its version report (plain `key : value` lines).
pub fn query_versions() -> Result<String, ProbeError> {
    run(&["--version".to_string()])
}

fn run(args: &[String]) -> Result<String, ProbeError> {
    let output = Command::new(SMI_BIN).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProbeError::ToolMissing
        } else {
            ProbeError::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!("{} {} failed: {}", SMI_BIN, args.join(" "), stderr);
        return Err(ProbeError::QueryFailed {
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Split one CSV line into trimmed fields.
pub fn split_csv(line: &str) -> Vec<&str> {
    line.split(',').map(|s| s.trim()).collect()
}

/// Parse a numeric CSV field. Placeholders like `[N/A]` and
/// `[Not Supported]` come back as None, as does anything unparseable.
pub fn parse_field<T: std::str::FromStr>(field: &str) -> Option<T> {
    if field.is_empty() || field.starts_with('[') {
        return None;
    }
    field.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv_trims_fields() {
        assert_eq!(
            split_csv("0, NVIDIA GeForce RTX 3070 , 8192"),
            vec!["0", "NVIDIA GeForce RTX 3070", "8192"]
        );
    }

    #[test]
    fn test_parse_field_numeric() {
        assert_eq!(parse_field::<u64>("8192"), Some(8192));
        assert_eq!(parse_field::<u32>("67"), Some(67));
        assert_eq!(parse_field::<f64>("67.5"), Some(67.5));
    }

    #[test]
    fn test_parse_field_placeholders() {
        assert_eq!(parse_field::<u64>("[N/A]"), None);
        assert_eq!(parse_field::<u64>("[Not Supported]"), None);
        assert_eq!(parse_field::<u64>(""), None);
        assert_eq!(parse_field::<u64>("garbage"), None);
    }
}
