//! cgpu - Quick CUDA/GPU status and PyTorch installation helper.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cgpu")]
#[command(
    about = "Quick CUDA/GPU status and PyTorch installation helper for ML engineers",
    long_about = None
)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Show version
    #[arg(long, short = 'v')]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show GPU status (default command)
    Status {
        /// Emit the status as JSON instead of the formatted summary
        #[arg(long)]
        json: bool,
    },

    /// Install PyTorch with optional CUDA version
    Install {
        /// CUDA version (12.1, 12.4, 11.8, cpu)
        #[arg(long)]
        cuda: Option<String>,

        /// Force use of pip instead of uv
        #[arg(long)]
        pip: bool,
    },
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    if cli.version {
        println!("cgpu-info {}", cgpu_common::VERSION);
        std::process::exit(0);
    }

    let code = match cli.command {
        Some(Commands::Status { json }) => commands::status(json),
        Some(Commands::Install { cuda, pip }) => commands::install(cuda.as_deref(), pip),
        None => commands::status(false),
    };

    std::process::exit(code);
}

/// Diagnostics go to stderr so the report on stdout stays clean.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}
