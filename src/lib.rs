//! # livery-installer
//!
//! Installs PMDG 777F livery packages into a Microsoft Flight Simulator
//! community folder.
//!
//! A livery package is a zip archive with a `livery.json` at its root. The
//! installer reads that metadata, extracts the archive into
//! `<community>/pmdg-aircraft-77f-liveries/SimObjects/Airplanes/<liveryId>`
//! and renames the livery's `options.ini` to `<atcId>.ini`.
//!
//! Archives can be local files or HTTP/HTTPS URLs. Remote archives are read
//! with Range requests, so only the central directory and the entries
//! themselves are downloaded.
//!
//! ## Example
//!
//! ```no_run
//! use livery_installer::{ArchiveLocation, Installer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let installer = Installer::new("/mnt/msfs/Community");
//!     let report = installer
//!         .install(&ArchiveLocation::parse("AFR-001.zip"))
//!         .await?;
//!
//!     println!("installed into {}", report.target_dir.display());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod installer;
pub mod io;
pub mod livery;
pub mod logging;
pub mod sanitize;

#[cfg(test)]
mod test_helpers;

pub use archive::{ZipArchive, ZipFileEntry};
pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{InstallError, InstallResult};
pub use installer::{ArchiveSummary, InstallReport, Installer, inspect};
pub use io::{ArchiveLocation, HttpRangeReader, LocalFileReader, ReadAt};
pub use livery::LiveryMetadata;
