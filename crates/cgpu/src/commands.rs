//! Command handlers for the cgpu CLI.

use owo_colors::OwoColorize;
use serde::Serialize;

use cgpu_common::installer::{self, InstallOutcome, Installer};
use cgpu_common::{report, CudaStatus, DeviceClass, Style};

/// `status` command: print the summary (or JSON) and succeed.
pub fn status(json: bool) -> i32 {
    if json {
        status_json()
    } else {
        report::report_status(&Style::detect());
        0
    }
}

#[derive(Serialize)]
struct StatusPayload {
    device: DeviceClass,
    #[serde(flatten)]
    status: CudaStatus,
}

fn status_json() -> i32 {
    let status = CudaStatus::query().unwrap_or_else(|_| CudaStatus::unavailable());
    let payload = StatusPayload {
        device: status.device_class(),
        status,
    };

    match serde_json::to_string_pretty(&payload) {
        Ok(body) => {
            println!("{}", body);
            0
        }
        Err(e) => {
            println!("{}", format!("Failed to encode status: {}", e).red());
            1
        }
    }
}

/// `install` command: plan, announce, run, and map the outcome to an exit code.
pub fn install(cuda_version: Option<&str>, force_pip: bool) -> i32 {
    let installer = if force_pip {
        Installer::Pip
    } else {
        installer::detect_installer()
    };

    let command = match installer::plan_install(installer, cuda_version) {
        Ok(command) => command,
        Err(e) => {
            println!("{}", format!("Error: {}", e).red());
            println!("Supported versions: {}", installer::supported_tags().join(", "));
            return 1;
        }
    };

    match cuda_version {
        Some(tag) => println!("Installing PyTorch with CUDA {}...", tag),
        None => println!("Installing PyTorch from PyPI (includes CUDA support)..."),
    }
    println!("Running: {}\n", command.join(" "));

    match installer::run_install(&command) {
        Ok(InstallOutcome::Exited(code)) => code,
        Ok(InstallOutcome::Interrupted) => {
            println!("\nInstallation cancelled.");
            1
        }
        Err(e) => {
            println!("{}", format!("Failed to run {}: {}", installer.as_str(), e).red());
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_unknown_tag_exits_one() {
        // force_pip skips the uv probe; planning fails before any spawn.
        assert_eq!(install(Some("9.9"), true), 1);
    }

    #[test]
    fn test_install_unknown_tag_with_detection_exits_one() {
        assert_eq!(install(Some("not-a-version"), false), 1);
    }
}
