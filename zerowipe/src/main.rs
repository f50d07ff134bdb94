use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use zerowipe_core::device::DeviceInfo;
use zerowipe_core::format::format_bytes;
use zerowipe_core::platform::{self, NativePlatform, Platform};
use zerowipe_core::progress::ProgressState;
use zerowipe_core::wipe::{self, WipeError};

mod logging;
mod term;

/// Exit status for a wipe stopped by the user: not success, not failure.
const EXIT_INTERRUPTED: u8 = 2;

#[derive(Parser)]
#[command(name = "zerowipe")]
#[command(about = "A careful, interactive tool that zero-fills a whole disk", version)]
struct Cli {
    /// Append-only log file
    #[arg(long, global = true, default_value = "zerowipe.log")]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Overwrite every byte of a device with zeros
    Wipe {
        /// Device to erase (e.g. sdb or /dev/sdb); asked interactively if omitted
        device: Option<String>,

        /// Skip both confirmation prompts
        #[arg(long = "yes-i-am-sure")]
        yes_i_am_sure: bool,
    },
    /// List available disks
    List,
}

/// Presents an interactive menu for the user to select a device.
fn select_device(devices: &[DeviceInfo]) -> Result<PathBuf> {
    if devices.is_empty() {
        return Err(anyhow!("No disks found."));
    }

    let items: Vec<String> = devices.iter().map(|d| d.to_string()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the disk to ERASE")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(devices[selection].path.clone())
}

/// Asks the user to type `expected` exactly. Anything else declines.
fn confirm_typed(prompt: &str, expected: &str) -> Result<bool> {
    let answer: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(answer.trim() == expected)
}

fn print_warning(path: &Path, size: u64) {
    println!();
    println!("{}", style("!!! WARNING !!!").red().bold());
    println!("This will permanently erase ALL data on:");
    println!("  Device: {}", style(path.display()).cyan());
    println!("  Size:   {}", style(format_bytes(size)).cyan());
    println!();
    println!("This operation {} be undone!", style("CANNOT").red().bold());
    println!();
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    true
}

fn wipe_command(
    platform: &NativePlatform,
    device: Option<String>,
    assume_yes: bool,
) -> Result<ExitCode> {
    if !is_root() {
        error!("refused to start: not running as root");
        bail!("This program must be run as root (use sudo)");
    }

    let path = match device {
        Some(name) => platform::resolve_device_path(&name),
        None => select_device(&platform.list_devices()?)?,
    };
    info!("selected device: {}", path.display());

    platform.verify_device(&path).inspect_err(|e| {
        error!("device verification failed for {}: {e:#}", path.display());
    })?;

    let total_size = {
        let probe = platform.open_device(&path)?;
        platform.device_size(&probe)?
    };
    if total_size == 0 {
        bail!("Device {} reports a size of zero", path.display());
    }

    print_warning(&path, total_size);

    if !assume_yes {
        let name = platform::device_name(&path);
        if !confirm_typed("Type 'YES' to continue", "YES")?
            || !confirm_typed(&format!("Type '{name}' to confirm"), &name)?
        {
            println!("\nOperation cancelled.");
            info!("operation cancelled at confirmation");
            return Ok(ExitCode::SUCCESS);
        }
    }
    info!("user confirmed wipe of {}", path.display());

    println!();
    println!("Unmounting disk...");
    if let Err(e) = platform.unmount(&path) {
        println!(
            "{} {e:#} (it may already be unmounted)",
            style("WARNING:").yellow().bold()
        );
    }

    let mut device_file = platform.open_device(&path)?;

    // Set from the Ctrl+C / SIGTERM handler; the engine polls it between writes.
    let cancelled = Arc::new(AtomicBool::new(false));
    let c = cancelled.clone();
    ctrlc::set_handler(move || {
        c.store(true, Ordering::SeqCst);
    })?;

    println!("\nStarting secure erase...\n");
    info!(
        "starting wipe: device={}, total_size={}",
        path.display(),
        total_size
    );

    let mut progress = ProgressState::init(total_size);
    let pb = ProgressBar::new(total_size);
    pb.set_style(ProgressStyle::with_template("{msg}")?);
    pb.set_message(progress.render().to_string());

    let result = wipe::run(
        &mut device_file,
        total_size,
        &cancelled,
        &mut progress,
        |frame| {
            pb.set_position(frame.written);
            pb.set_message(frame.to_string());
        },
    );
    drop(device_file);

    match result {
        Ok(()) => {
            pb.set_message(progress.render().to_string());
            pb.finish();

            let summary = progress.finish();
            println!("\n{}\n", style("Operation completed successfully!").green().bold());
            println!("{summary}");
            println!("\nThe disk is now ready to be formatted.");
            info!(
                "wipe completed: device={}, bytes={}, seconds={}",
                path.display(),
                summary.total_bytes,
                summary.elapsed_secs
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(WipeError::Interrupted) => {
            pb.abandon();
            println!("\n\nOperation was interrupted.");
            println!(
                "{} Disk may be partially erased; do not rely on it being blank.",
                style("WARNING:").yellow().bold()
            );
            warn!(
                "wipe interrupted by user: device={}, written={}",
                path.display(),
                progress.written()
            );
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Err(e) => {
            pb.abandon();
            error!(
                "wipe failed: device={}, written={}, error={e}",
                path.display(),
                progress.written()
            );
            Err(e).with_context(|| format!("Wiping {} failed", path.display()))
        }
    }
}

fn list_command(platform: &NativePlatform) -> Result<()> {
    let devices = platform.list_devices()?;
    if devices.is_empty() {
        println!("No disks found.");
        return Ok(());
    }

    println!("Found {} disks:", devices.len());
    println!(
        "\n  {:<15} {:>10} {:<20} {}",
        "DEVICE", "SIZE", "MODEL", "LOCATION"
    );
    println!("  {:-<15} {:->10} {:-<20} {:-<20}", "", "", "", "");
    for device in devices {
        let location = if device.is_mounted() {
            device
                .mount_points
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            "(Not mounted)".to_string()
        };
        println!(
            "  {:<15} {:>10} {:<20} {}",
            device.path.display(),
            format_bytes(device.size_bytes),
            device.model.as_deref().unwrap_or("-"),
            location
        );
    }

    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let platform = NativePlatform::default();
    match cli.command {
        Commands::Wipe {
            device,
            yes_i_am_sure,
        } => wipe_command(&platform, device, yes_i_am_sure),
        Commands::List => list_command(&platform).map(|()| ExitCode::SUCCESS),
    }
}

fn main() -> ExitCode {
    // Restores the terminal when main() returns.
    let _term_restorer = term::TermRestorer::new();

    let cli = Cli::parse();
    logging::init(&cli.log_file);
    info!("zerowipe {} started", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\n{} {e:#}", style("ERROR:").red().bold());
            ExitCode::FAILURE
        }
    }
}
