//! ovfkit CLI - Inspect extracted OVA appliances.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use ovfkit_core::{
    template_virtual_size, ApplianceInfo, CompressionLevel, InspectOptions, OvfReader,
};
use rayon::prelude::*;
use tracing::debug;

/// Tool for reading the OVF descriptors of extracted OVA appliances.
#[derive(Parser)]
#[command(name = "ovfkit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show disks, networks, properties and deployment options.
    Inspect {
        /// OVF files or extracted appliance directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Compression level for stored license texts (fast, balanced, max).
        #[arg(short, long, value_enum, default_value = "balanced")]
        compression: CompressionArg,

        /// Show every property, not only user-configurable ones.
        #[arg(long)]
        all_properties: bool,

        /// Suppress progress output.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the total virtual size of all disks.
    Size {
        /// OVF file or extracted appliance directory.
        path: PathBuf,
    },

    /// Write a copy of a descriptor that keeps a single disk.
    Rewrite {
        /// Source OVF file or extracted appliance directory.
        source: PathBuf,

        /// Destination OVF file.
        dest: PathBuf,

        /// File href of the disk to keep (e.g. disk1.vmdk).
        #[arg(short, long)]
        disk: String,
    },

    /// Print the license agreements.
    Eula {
        /// OVF file or extracted appliance directory.
        path: PathBuf,
    },
}

/// Compression level argument mapping.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompressionArg {
    /// Fast compression (zlib level 1).
    Fast,
    /// Balanced compression (zlib level 6).
    Balanced,
    /// Maximum compression (zlib level 9).
    Max,
}

impl From<CompressionArg> for CompressionLevel {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Fast => CompressionLevel::Fast,
            CompressionArg::Balanced => CompressionLevel::Balanced,
            CompressionArg::Max => CompressionLevel::Max,
        }
    }
}

fn install_tracing(verbose: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    install_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect {
            paths,
            compression,
            all_properties,
            quiet,
        } => {
            let options = InspectOptions::new(compression.into(), !all_properties);
            run_inspect(&paths, &options, quiet)?;
        }
        Commands::Size { path } => show_size(&path)?,
        Commands::Rewrite { source, dest, disk } => run_rewrite(&source, &dest, &disk)?,
        Commands::Eula { path } => show_eulas(&path)?,
    }

    Ok(())
}

fn run_inspect(paths: &[PathBuf], options: &InspectOptions, quiet: bool) -> Result<()> {
    let reader = OvfReader::from_options(options);
    debug!(count = paths.len(), "inspecting appliances");

    let progress = if quiet || paths.len() < 2 {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(paths.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} appliances")?
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    };

    let results: Vec<_> = paths
        .par_iter()
        .map(|path| {
            let result = reader.inspect(path, options);
            progress.inc(1);
            (path, result)
        })
        .collect();
    progress.finish_and_clear();

    let mut failed = 0;
    for (i, (path, result)) in results.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        match result {
            Ok(info) => print_appliance(&info),
            Err(e) => {
                failed += 1;
                eprintln!("error: {}: {}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} appliances could not be inspected", failed, paths.len());
    }
    Ok(())
}

fn print_appliance(info: &ApplianceInfo) {
    println!("Appliance: {}", info.ovf_path.display());
    println!("Virtual size: {}", format_bytes(info.virtual_size));
    println!();

    if info.disks.is_empty() {
        println!("Disks:     None");
    } else {
        println!("Disks:");
        for (i, disk) in info.disks.iter().enumerate() {
            let name = disk
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut line = format!(
                "  {}. {} - {} virtual, {} file",
                i + 1,
                name,
                format_bytes(disk.virtual_size),
                format_bytes(disk.file_size)
            );
            if !disk.controller.is_empty() {
                line.push_str(&format!(" ({}, {})", disk.controller, disk.controller_sub_type));
            }
            if disk.is_iso {
                line.push_str(" [iso]");
            }
            if disk.is_bootable {
                line.push_str(" [boot]");
            }
            println!("{}", line);
        }
    }

    if !info.networks.is_empty() {
        println!("Networks:");
        for network in &info.networks {
            println!(
                "  - {}: {} {}",
                network.name,
                network.resource_sub_type.as_deref().unwrap_or("-"),
                network.element_name.as_deref().unwrap_or("")
            );
        }
    }

    if !info.properties.is_empty() {
        println!("Properties:");
        for property in &info.properties {
            let value = if property.password {
                "********"
            } else {
                property.value.as_deref().unwrap_or("")
            };
            println!(
                "  - {} ({}) = {:?}",
                property.key,
                property.property_type.as_deref().unwrap_or("string"),
                value
            );
        }
    }

    if !info.hardware.configurations.is_empty() {
        println!("Configurations:");
        for configuration in &info.hardware.configurations {
            println!(
                "  - {} ({}): {} items",
                configuration.id,
                configuration.label.as_deref().unwrap_or(""),
                configuration.hardware_items.len()
            );
        }
    }
    println!("Common hardware items: {}", info.hardware.common_items.len());

    if !info.eulas.is_empty() {
        println!("EULAs:");
        for (i, eula) in info.eulas.iter().enumerate() {
            println!("  {}. {}", i + 1, eula.info.as_deref().unwrap_or("(no info)"));
        }
    }
}

fn show_size(path: &Path) -> Result<()> {
    let reader = OvfReader::new();
    let ovf_path = reader.resolve_ovf_path(path)?;
    let doc = reader.parse_file(&ovf_path)?;
    let size = template_virtual_size(&doc, &ovf_path)?;

    println!("{} ({} bytes)", format_bytes(size), size);
    Ok(())
}

fn run_rewrite(source: &Path, dest: &Path, disk: &str) -> Result<()> {
    OvfReader::new()
        .rewrite_for_single_disk(source, dest, disk)
        .with_context(|| format!("failed to rewrite {} for disk {}", source.display(), disk))?;

    println!("Wrote {}", dest.display());
    Ok(())
}

fn show_eulas(path: &Path) -> Result<()> {
    let reader = OvfReader::new();
    let ovf_path = reader.resolve_ovf_path(path)?;
    let doc = reader.parse_file(&ovf_path)?;
    let eulas = reader.extract_eula_sections(&doc);

    if eulas.is_empty() {
        println!("No license agreements.");
        return Ok(());
    }

    for (i, eula) in eulas.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("=== {} ===", eula.info.as_deref().unwrap_or("License"));
        let text = eula
            .license_text(reader.compressor())
            .context("failed to decompress license text")?;
        println!("{}", text.trim());
    }
    Ok(())
}

/// Format bytes as human-readable string.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(50 * 1024 * 1024), "50.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 / 2), "1.50 GB");
    }
}
