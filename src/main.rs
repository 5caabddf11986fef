//! Command-line entry point for livery-installer.

use anyhow::Result;
use clap::Parser;

use livery_installer::logging::{effective_level, setup_logging};
use livery_installer::{ArchiveLocation, Cli, Command, Config, Installer, ZipFileEntry, inspect};

/// Application entry point.
///
/// Loads the config, sets up logging and dispatches the subcommand. Any
/// install error is returned from `main`, which prints its cause chain and
/// exits with a non-zero status.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    setup_logging(effective_level(&config.log_level, cli.quiet))?;

    match &cli.command {
        Command::Install { archive, community } => {
            let community_dir = config.resolve_community_dir(community.as_deref());
            let installer = Installer::new(community_dir);
            let report = installer.install(&ArchiveLocation::parse(archive)).await?;

            if !cli.is_quiet() {
                println!(
                    "Installed {} ({}) into {}",
                    report.metadata.title,
                    report.metadata.livery_id,
                    report.target_dir.display()
                );
                println!(
                    "  {} files, {} directories extracted",
                    report.files_written, report.dirs_created
                );
                if let Some(renamed) = &report.renamed_options {
                    println!("  options: {}", renamed.display());
                }
                if let Some(bytes) = report.transferred_bytes {
                    println!("  downloaded: {}", format_size(bytes));
                }
            }
        }
        Command::Info { archive, verbose } => {
            let summary = inspect(&ArchiveLocation::parse(archive)).await?;

            match &summary.metadata {
                Some(m) => {
                    println!("Title:        {}", m.title);
                    println!("Airline:      {} ({})", m.airline, m.airline_icao);
                    println!("Livery ID:    {}", m.livery_id);
                    println!("ATC ID:       {}", m.atc_id);
                    println!("Package:      {} (product {})", m.product_package, m.product_id);
                    println!("Version:      {} (rev {})", m.version, m.rev);
                }
                None => println!("No livery.json at the archive root"),
            }
            println!();

            list_files(&summary.entries, *verbose);
        }
    }

    Ok(())
}

/// Print the archive entries.
///
/// Simple format prints one name per line; verbose adds size, compression
/// ratio and timestamp columns plus a totals line.
fn list_files(entries: &[ZipFileEntry], verbose: bool) {
    if !verbose {
        for entry in entries {
            println!("{}", entry.file_name);
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files ({})",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count,
        format_size(total_uncompressed)
    );
}

/// Space saved by compression, as a right-aligned percentage.
///
/// Stored entries with extra headers can come out slightly larger than
/// their content, which shows as 0%.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed >= uncompressed {
        return "   0%".to_string();
    }
    format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
