//! cgpu common - CUDA status probing, install planning, and progress telemetry.
//!
//! Everything the cgpu binary does lives here so other tools can reuse it:
//! query the driver stack, render the status summary, plan PyTorch installs,
//! and wrap progress bars with live GPU stats.

pub mod device;
pub mod error;
pub mod installer;
pub mod progress;
pub mod report;
pub mod smi;
pub mod telemetry;
pub mod ui;

pub use device::{CudaStatus, DeviceClass, DeviceInfo};
pub use error::{ProbeError, UnknownCudaVersion};
pub use installer::{InstallOutcome, Installer};
pub use progress::GpuProgressBar;
pub use report::report_status;
pub use telemetry::TelemetrySnapshot;
pub use ui::Style;

/// Crate version, reported in the status summary and by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
