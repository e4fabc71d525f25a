//! Point-in-time GPU telemetry for progress displays.

use tracing::debug;

use crate::smi;

const TELEMETRY_FIELDS: [&str; 4] = [
    "temperature.gpu",
    "memory.used",
    "memory.total",
    "utilization.gpu",
];

/// Pre-formatted telemetry strings for one device. Metrics that failed to
/// query are None and stay out of the rendered line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub temperature: Option<String>,
    pub vram: Option<String>,
    pub utilization: Option<String>,
}

impl TelemetrySnapshot {
    /// Query one device. Never fails; an unreachable driver yields an empty
    /// snapshot.
    pub fn capture(device_index: u32) -> Self {
        match smi::query_gpu(&TELEMETRY_FIELDS, Some(device_index)) {
            Ok(stdout) => stdout
                .lines()
                .find(|line| !line.trim().is_empty())
                .map(Self::parse)
                .unwrap_or_default(),
            Err(e) => {
                debug!("Telemetry capture failed for device {}: {}", device_index, e);
                Self::default()
            }
        }
    }

    fn parse(line: &str) -> Self {
        let parts = smi::split_csv(line);
        if parts.len() < 4 {
            return Self::default();
        }

        let temperature = smi::parse_field::<u32>(parts[0]).map(|t| format!("{}°C", t));
        let used = smi::parse_field::<f64>(parts[1]).map(mib_to_gib);
        let total = smi::parse_field::<f64>(parts[2]).map(mib_to_gib);
        let vram = match (used, total) {
            (Some(used), Some(total)) => Some(format!("{:.1}/{:.1}GB", used, total)),
            _ => None,
        };
        let utilization = smi::parse_field::<u32>(parts[3]).map(|u| format!("GPU:{}%", u));

        TelemetrySnapshot {
            temperature,
            vram,
            utilization,
        }
    }

    /// Join the available metrics with ` | ` in temperature, vram,
    /// utilization order.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref temperature) = self.temperature {
            parts.push(temperature.as_str());
        }
        if let Some(ref vram) = self.vram {
            parts.push(vram.as_str());
        }
        if let Some(ref utilization) = self.utilization {
            parts.push(utilization.as_str());
        }
        parts.join(" | ")
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.vram.is_none() && self.utilization.is_none()
    }
}

fn mib_to_gib(mib: f64) -> f64 {
    mib / 1024.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let snapshot = TelemetrySnapshot::parse("67, 1536, 8192, 45");
        assert_eq!(snapshot.temperature.as_deref(), Some("67°C"));
        assert_eq!(snapshot.vram.as_deref(), Some("1.5/8.0GB"));
        assert_eq!(snapshot.utilization.as_deref(), Some("GPU:45%"));
        assert_eq!(snapshot.render(), "67°C | 1.5/8.0GB | GPU:45%");
    }

    #[test]
    fn test_parse_partial_line_keeps_order() {
        let snapshot = TelemetrySnapshot::parse("[N/A], 1536, 8192, [N/A]");
        assert_eq!(snapshot.temperature, None);
        assert_eq!(snapshot.utilization, None);
        assert_eq!(snapshot.render(), "1.5/8.0GB");

        let snapshot = TelemetrySnapshot::parse("67, [N/A], 8192, 45");
        assert_eq!(snapshot.vram, None);
        assert_eq!(snapshot.render(), "67°C | GPU:45%");
    }

    #[test]
    fn test_parse_truncated_line_is_empty() {
        let snapshot = TelemetrySnapshot::parse("67, 1536");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.render(), "");
    }

    #[test]
    fn test_vram_needs_both_fields() {
        let snapshot = TelemetrySnapshot::parse("67, 1536, [N/A], 45");
        assert_eq!(snapshot.vram, None);
    }
}
