//! The status report: renders a CudaStatus for the terminal.

use tracing::debug;

use crate::device::{CudaStatus, DeviceClass};
use crate::error::ProbeError;
use crate::ui::{self, Style};

const GIB: f64 = (1024u64 * 1024 * 1024) as f64;

/// Query the driver stack, print the summary, and hand back the device class.
///
/// Never fails: a missing query tool prints one line and reports cpu.
pub fn report_status(style: &Style) -> DeviceClass {
    let status = match CudaStatus::query() {
        Ok(status) => status,
        Err(e) => {
            debug!("Status query failed: {}", e);
            println!(
                "{}{}{}",
                style.red(),
                describe_probe_failure(&e),
                style.reset()
            );
            return DeviceClass::Cpu;
        }
    };

    for line in render_status(&status, style) {
        println!("{}", line);
    }

    status.device_class()
}

fn describe_probe_failure(err: &ProbeError) -> String {
    match err {
        ProbeError::ToolMissing => "nvidia-smi not found (NVIDIA driver not installed?)".to_string(),
        other => format!("GPU query failed: {}", other),
    }
}

/// Render the full report as lines. Pure; printing is the caller's job.
pub fn render_status(status: &CudaStatus, style: &Style) -> Vec<String> {
    let mut lines = Vec::new();
    let frame = format!("{}{}", style.bold(), style.cyan());

    lines.push(format!("{}{}{}", frame, ui::RULE, style.reset()));
    lines.push(format!("{}          GPU Status Summary{}", frame, style.reset()));
    lines.push(format!("{}{}{}", frame, ui::RULE, style.reset()));

    if status.available {
        lines.push(format!(
            "{}{} CUDA Available{}",
            style.green(),
            ui::check_mark(),
            style.reset()
        ));
        lines.push(format!(
            "{}  Device: {}{}{}",
            style.white(),
            style.green(),
            status.device_class(),
            style.reset()
        ));
        lines.push(format!(
            "{}  GPU Count: {}{}{}",
            style.white(),
            style.magenta(),
            status.devices.len(),
            style.reset()
        ));

        for device in &status.devices {
            lines.push(format!(
                "{}  [{}] {}{}{}",
                style.white(),
                device.index,
                style.yellow(),
                device.name,
                style.reset()
            ));
            lines.push(format!(
                "{}      VRAM: {}{:.1} GB{}",
                style.white(),
                style.magenta(),
                device.total_memory as f64 / GIB,
                style.reset()
            ));
            if let Some(allocated) = device.allocated_memory {
                lines.push(format!(
                    "{}      Allocated: {}{:.2} GB{}",
                    style.white(),
                    style.cyan(),
                    allocated as f64 / GIB,
                    style.reset()
                ));
            }
            if let Some(reserved) = device.reserved_memory {
                lines.push(format!(
                    "{}      Reserved: {}{:.2} GB{}",
                    style.white(),
                    style.cyan(),
                    reserved as f64 / GIB,
                    style.reset()
                ));
            }
        }

        lines.push(version_line("CUDA Version", status.cuda_version.as_deref(), style));
        lines.push(version_line(
            "Driver Version",
            status.driver_version.as_deref(),
            style,
        ));
        lines.push(version_line("cgpu", Some(crate::VERSION), style));
    } else {
        lines.push(format!(
            "{}{} CUDA Not Available{}",
            style.red(),
            ui::cross_mark(),
            style.reset()
        ));
        lines.push(format!(
            "{}  Device: {}{}{}",
            style.white(),
            style.yellow(),
            status.device_class(),
            style.reset()
        ));
        lines.push(version_line("cgpu", Some(crate::VERSION), style));
    }

    lines.push(format!("{}{}{}", frame, ui::RULE, style.reset()));

    lines
}

fn version_line(label: &str, value: Option<&str>, style: &Style) -> String {
    format!(
        "{}  {}: {}{}{}",
        style.white(),
        label,
        style.cyan(),
        value.unwrap_or("unknown"),
        style.reset()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;

    const GIB_U64: u64 = 1024 * 1024 * 1024;

    fn one_device_status() -> CudaStatus {
        CudaStatus {
            available: true,
            devices: vec![DeviceInfo {
                index: 0,
                name: "X".to_string(),
                total_memory: 8 * GIB_U64,
                allocated_memory: Some(2 * GIB_U64),
                reserved_memory: Some(5 * GIB_U64 / 2),
            }],
            cuda_version: Some("12.4".to_string()),
            driver_version: Some("550.54.14".to_string()),
        }
    }

    #[test]
    fn test_report_one_device() {
        let report = render_status(&one_device_status(), &Style::plain()).join("\n");
        assert!(report.contains("CUDA Available"));
        assert!(report.contains("Device: cuda"));
        assert!(report.contains("GPU Count: 1"));
        assert!(report.contains("[0] X"));
        assert!(report.contains("VRAM: 8.0 GB"));
        assert!(report.contains("Allocated: 2.00 GB"));
        assert!(report.contains("Reserved: 2.50 GB"));
        assert!(report.contains("CUDA Version: 12.4"));
        assert!(report.contains("Driver Version: 550.54.14"));
        assert!(report.contains("cgpu: "));
    }

    #[test]
    fn test_report_unavailable_has_no_device_lines() {
        let status = CudaStatus::unavailable();
        assert_eq!(status.device_class(), DeviceClass::Cpu);

        let report = render_status(&status, &Style::plain()).join("\n");
        assert!(report.contains("CUDA Not Available"));
        assert!(report.contains("Device: cpu"));
        assert!(!report.contains("GPU Count"));
        assert!(!report.contains("VRAM"));
        assert!(!report.contains("Allocated"));
    }

    #[test]
    fn test_missing_counters_omit_lines() {
        let mut status = one_device_status();
        status.devices[0].allocated_memory = None;
        status.devices[0].reserved_memory = None;

        let report = render_status(&status, &Style::plain()).join("\n");
        assert!(report.contains("VRAM: 8.0 GB"));
        assert!(!report.contains("Allocated"));
        assert!(!report.contains("Reserved"));
    }

    #[test]
    fn test_styled_and_plain_are_textually_identical() {
        let status = one_device_status();
        let plain = render_status(&status, &Style::plain());
        let styled = render_status(&status, &Style::colored());

        assert_eq!(plain.len(), styled.len());
        for (plain_line, styled_line) in plain.iter().zip(styled.iter()) {
            assert_ne!(plain_line, styled_line);
            assert_eq!(
                plain_line.as_str(),
                console::strip_ansi_codes(styled_line).as_ref()
            );
        }
    }

    #[test]
    fn test_unknown_versions_render_as_unknown() {
        let mut status = one_device_status();
        status.cuda_version = None;
        status.driver_version = None;

        let report = render_status(&status, &Style::plain()).join("\n");
        assert!(report.contains("CUDA Version: unknown"));
        assert!(report.contains("Driver Version: unknown"));
    }

    #[test]
    fn test_report_is_framed() {
        let lines = render_status(&one_device_status(), &Style::plain());
        assert_eq!(lines.first().map(String::as_str), Some(ui::RULE));
        assert_eq!(lines.last().map(String::as_str), Some(ui::RULE));
    }
}
