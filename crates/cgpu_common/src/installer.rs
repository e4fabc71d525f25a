//! PyTorch install planning and execution.
//!
//! Planning is pure so command construction can be checked without spawning
//! anything; execution inherits the console and hands back the child's exit.

use std::io;
use std::process::Command;

use tracing::debug;

use crate::error::UnknownCudaVersion;

/// Version tag to PyTorch wheel index URL.
pub const CUDA_INDEX_URLS: &[(&str, &str)] = &[
    ("12.1", "https://download.pytorch.org/whl/cu121"),
    ("12.4", "https://download.pytorch.org/whl/cu124"),
    ("11.8", "https://download.pytorch.org/whl/cu118"),
    ("cpu", "https://download.pytorch.org/whl/cpu"),
];

/// Packages installed together, always this trio.
pub const TORCH_PACKAGES: &[&str] = &["torch", "torchvision", "torchaudio"];

/// Which installer binary runs the install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installer {
    Uv,
    Pip,
}

impl Installer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Installer::Uv => "uv",
            Installer::Pip => "pip",
        }
    }

    /// Leading command words for this installer.
    fn base_command(&self) -> Vec<String> {
        match self {
            Installer::Uv => vec!["uv".into(), "pip".into(), "install".into()],
            Installer::Pip => vec![
                "python3".into(),
                "-m".into(),
                "pip".into(),
                "install".into(),
            ],
        }
    }
}

/// Look up the index URL for a version tag.
pub fn index_url_for(tag: &str) -> Option<&'static str> {
    CUDA_INDEX_URLS
        .iter()
        .find(|(key, _)| *key == tag)
        .map(|(_, url)| *url)
}

/// All valid version tags, in table order.
pub fn supported_tags() -> Vec<&'static str> {
    CUDA_INDEX_URLS.iter().map(|(key, _)| *key).collect()
}

/// Probe for uv, falling back to pip. Probed fresh on every call.
pub fn detect_installer() -> Installer {
    match Command::new("uv").arg("--version").output() {
        Ok(output) if output.status.success() => {
            debug!("uv detected, using it for the install");
            Installer::Uv
        }
        _ => {
            debug!("uv not usable, falling back to pip");
            Installer::Pip
        }
    }
}

/// Build the full install command. Pure; spawns nothing.
pub fn plan_install(
    installer: Installer,
    cuda_version: Option<&str>,
) -> Result<Vec<String>, UnknownCudaVersion> {
    let index_url = match cuda_version {
        Some(tag) => Some(index_url_for(tag).ok_or_else(|| UnknownCudaVersion {
            tag: tag.to_string(),
        })?),
        None => None,
    };

    let mut command = installer.base_command();
    command.extend(TORCH_PACKAGES.iter().map(|p| p.to_string()));

    if let Some(url) = index_url {
        command.push("--index-url".to_string());
        command.push(url.to_string());
    }

    Ok(command)
}

/// How a launched install ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Child exited on its own; carries its exit code.
    Exited(i32),
    /// Child was taken down by Ctrl-C.
    Interrupted,
}

/// Run a planned command with inherited stdio and wait for it.
///
/// The parent ignores SIGINT while the child runs, so Ctrl-C lands on the
/// child alone and shows up here as a cancellation instead of tearing the
/// parent down mid-report. The ignore disposition survives exec, so the
/// child puts SIGINT back to the default before exec.
pub fn run_install(command: &[String]) -> io::Result<InstallOutcome> {
    let Some((program, args)) = command.split_first() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty install command",
        ));
    };

    debug!("Spawning installer: {}", command.join(" "));

    let mut child = Command::new(program);
    child.args(args);
    reset_child_sigint(&mut child);

    let _guard = SigintGuard::install();
    let status = child.status()?;

    Ok(exit_outcome(status))
}

/// Restore the default SIGINT disposition in the child before exec. Without
/// this the child inherits the parent guard's ignore and Ctrl-C cannot stop
/// the install at all.
#[cfg(unix)]
fn reset_child_sigint(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    use nix::sys::signal::{signal, SigHandler, Signal};

    // SAFETY: the closure runs between fork and exec and only calls signal(),
    // which is async-signal-safe.
    unsafe {
        command.pre_exec(|| {
            // SAFETY: SigDfl installs no handler function, only a disposition.
            match unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) } {
                Ok(_) => Ok(()),
                Err(e) => Err(io::Error::from_raw_os_error(e as i32)),
            }
        });
    }
}

#[cfg(not(unix))]
fn reset_child_sigint(_command: &mut Command) {}

#[cfg(unix)]
fn exit_outcome(status: std::process::ExitStatus) -> InstallOutcome {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        return InstallOutcome::Exited(code);
    }
    match status.signal() {
        Some(signal) if signal == nix::sys::signal::Signal::SIGINT as i32 => {
            InstallOutcome::Interrupted
        }
        // Shell convention for other signal deaths.
        Some(signal) => InstallOutcome::Exited(128 + signal),
        None => InstallOutcome::Exited(1),
    }
}

#[cfg(not(unix))]
fn exit_outcome(status: std::process::ExitStatus) -> InstallOutcome {
    InstallOutcome::Exited(status.code().unwrap_or(1))
}

/// Restores the previous SIGINT disposition when dropped.
#[cfg(unix)]
struct SigintGuard {
    previous: Option<nix::sys::signal::SigHandler>,
}

#[cfg(unix)]
impl SigintGuard {
    fn install() -> Self {
        use nix::sys::signal::{signal, SigHandler, Signal};
        use tracing::warn;

        // SAFETY: SigIgn installs no handler function, only a disposition.
        let previous = match unsafe { signal(Signal::SIGINT, SigHandler::SigIgn) } {
            Ok(previous) => Some(previous),
            Err(e) => {
                warn!("Could not ignore SIGINT around the installer: {}", e);
                None
            }
        };
        SigintGuard { previous }
    }
}

#[cfg(unix)]
impl Drop for SigintGuard {
    fn drop(&mut self) {
        use nix::sys::signal::{signal, Signal};
        use tracing::warn;

        if let Some(previous) = self.previous.take() {
            // SAFETY: restores the disposition saved by install().
            if let Err(e) = unsafe { signal(Signal::SIGINT, previous) } {
                warn!("Could not restore SIGINT handling: {}", e);
            }
        }
    }
}

#[cfg(not(unix))]
struct SigintGuard;

#[cfg(not(unix))]
impl SigintGuard {
    fn install() -> Self {
        SigintGuard
    }
}
