//! The livery install pipeline.
//!
//! Every read-only check (marker file, archive, `livery.json`, entry names)
//! runs before the first directory is created, so a rejected archive leaves
//! the community folder untouched. Extraction itself is not transactional:
//! a failure halfway leaves the files written so far.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use crate::archive::{ZipArchive, ZipFileEntry};
use crate::error::{InstallError, InstallResult};
use crate::io::{ArchiveLocation, HttpRangeReader, HttpStatusError, LocalFileReader, ReadAt};
use crate::livery::LiveryMetadata;
use crate::sanitize::entry_relative_path;

/// Marker file that identifies a community folder
pub const LAYOUT_GENERATOR: &str = "MSFSLayoutGenerator.exe";
/// Package folder all PMDG 777F liveries are installed under
pub const PACKAGE_FOLDER: &str = "pmdg-aircraft-77f-liveries";
pub const METADATA_ENTRY: &str = "livery.json";
pub const OPTIONS_FILE: &str = "options.ini";

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Outcome of a successful install
#[derive(Debug)]
pub struct InstallReport {
    pub metadata: LiveryMetadata,
    pub target_dir: PathBuf,
    pub files_written: usize,
    pub dirs_created: usize,
    /// Where `options.ini` ended up, if the livery shipped one
    pub renamed_options: Option<PathBuf>,
    /// Bytes downloaded, for remote archives
    pub transferred_bytes: Option<u64>,
}

/// Archive contents as seen by `info`
#[derive(Debug)]
pub struct ArchiveSummary {
    pub entries: Vec<ZipFileEntry>,
    /// `None` when the archive has no root `livery.json`
    pub metadata: Option<LiveryMetadata>,
}

/// An entry cleared for extraction, with its path below the target directory
struct PlannedEntry<'a> {
    entry: &'a ZipFileEntry,
    relative: PathBuf,
}

/// Installs livery archives into one community folder.
pub struct Installer {
    community_dir: PathBuf,
}

impl Installer {
    pub fn new(community_dir: impl Into<PathBuf>) -> Self {
        Self {
            community_dir: community_dir.into(),
        }
    }

    pub fn community_dir(&self) -> &Path {
        &self.community_dir
    }

    /// `<community>/pmdg-aircraft-77f-liveries/SimObjects/Airplanes`
    pub fn airplanes_dir(&self) -> PathBuf {
        self.community_dir
            .join(PACKAGE_FOLDER)
            .join("SimObjects")
            .join("Airplanes")
    }

    pub fn target_dir(&self, livery_id: &str) -> PathBuf {
        self.airplanes_dir().join(livery_id)
    }

    /// Make sure the layout generator sits directly in the community folder.
    ///
    /// # Errors
    ///
    /// [`InstallError::MissingPrerequisite`] when the marker is absent or not
    /// a regular file, [`InstallError::Access`] when it cannot be checked.
    pub async fn check_prerequisite(&self) -> InstallResult<PathBuf> {
        let marker = self.community_dir.join(LAYOUT_GENERATOR);

        match fs::metadata(&marker).await {
            Ok(meta) if meta.is_file() => Ok(marker),
            Ok(_) => Err(self.missing_prerequisite()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(self.missing_prerequisite()),
            Err(e) => Err(InstallError::Access {
                location: marker.display().to_string(),
                source: e.into(),
            }),
        }
    }

    fn missing_prerequisite(&self) -> InstallError {
        InstallError::MissingPrerequisite {
            path: self.community_dir.clone(),
        }
    }

    /// Install the livery archive at `location`.
    ///
    /// Steps, in order:
    /// 1. Check the layout generator marker
    /// 2. Open the archive and read its central directory
    /// 3. Decode `livery.json` from the archive root
    /// 4. Vet every entry name and compression method
    /// 5. Create `SimObjects/Airplanes/<liveryId>` below the package folder
    /// 6. Extract every entry into it
    /// 7. Rename `options.ini` to `<atcId>.ini`
    ///
    /// Running it again with the same archive overwrites the extracted files
    /// with identical content.
    pub async fn install(&self, location: &ArchiveLocation) -> InstallResult<InstallReport> {
        info!(
            archive = %location,
            community = %self.community_dir.display(),
            "Installing livery"
        );

        self.check_prerequisite().await?;

        let archive = open_archive(location).await?;
        let metadata = read_metadata(&archive, location)
            .await?
            .ok_or_else(|| InstallError::MetadataNotFound {
                location: location.to_string(),
            })?;
        info!(
            livery_id = %metadata.livery_id,
            atc_id = %metadata.atc_id,
            title = %metadata.title,
            "Read livery metadata"
        );

        let plan = plan_extraction(archive.entries())?;

        let airplanes_dir = self.airplanes_dir();
        create_dir(&airplanes_dir, None).await?;
        let target_dir = airplanes_dir.join(&metadata.livery_id);
        create_dir(&target_dir, None).await?;

        let (files_written, dirs_created) = extract(&archive, &plan, &target_dir).await?;
        let renamed_options = rename_options(&target_dir, &metadata).await?;

        info!(
            path = %target_dir.display(),
            files = files_written,
            "Livery installed"
        );

        Ok(InstallReport {
            metadata,
            target_dir,
            files_written,
            dirs_created,
            renamed_options,
            transferred_bytes: archive.transferred_bytes(),
        })
    }
}

/// Read the entry list and metadata of an archive without installing it.
pub async fn inspect(location: &ArchiveLocation) -> InstallResult<ArchiveSummary> {
    let archive = open_archive(location).await?;
    let metadata = read_metadata(&archive, location).await?;

    Ok(ArchiveSummary {
        entries: archive.entries().to_vec(),
        metadata,
    })
}

/// Resolve `location` to a reader, telling a missing archive apart from
/// one that cannot be reached.
async fn open_source(location: &ArchiveLocation) -> InstallResult<Arc<dyn ReadAt>> {
    let access = |source: anyhow::Error| InstallError::Access {
        location: location.to_string(),
        source,
    };

    match location {
        ArchiveLocation::Local(path) => {
            match fs::metadata(path).await {
                Ok(meta) if meta.is_dir() => {
                    return Err(access(anyhow::anyhow!("path is a directory")));
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(InstallError::FileNotFound {
                        location: location.to_string(),
                    });
                }
                Err(e) => return Err(access(e.into())),
            }

            let reader = LocalFileReader::new(path).map_err(access)?;
            Ok(Arc::new(reader))
        }
        ArchiveLocation::Remote(url) => match HttpRangeReader::new(url.clone()).await {
            Ok(reader) => Ok(Arc::new(reader)),
            Err(e)
                if e
                    .downcast_ref::<HttpStatusError>()
                    .is_some_and(HttpStatusError::is_not_found) =>
            {
                Err(InstallError::FileNotFound {
                    location: location.to_string(),
                })
            }
            Err(e) => Err(access(e)),
        },
    }
}

async fn open_archive(location: &ArchiveLocation) -> InstallResult<ZipArchive> {
    let reader = open_source(location).await?;

    let archive = ZipArchive::open(reader)
        .await
        .map_err(|source| InstallError::ArchiveOpen {
            location: location.to_string(),
            source,
        })?;
    debug!(archive = %location, entries = archive.entries().len(), "Read central directory");

    Ok(archive)
}

async fn read_metadata(
    archive: &ZipArchive,
    location: &ArchiveLocation,
) -> InstallResult<Option<LiveryMetadata>> {
    let Some(entry) = archive.by_name(METADATA_ENTRY) else {
        return Ok(None);
    };

    let bytes = archive
        .read_entry(entry)
        .await
        .map_err(|source| InstallError::MetadataRead {
            location: location.to_string(),
            source,
        })?;

    LiveryMetadata::from_slice(&bytes).map(Some)
}

/// Vet every entry before anything is written.
fn plan_extraction(entries: &[ZipFileEntry]) -> InstallResult<Vec<PlannedEntry<'_>>> {
    let mut plan = Vec::with_capacity(entries.len());

    for entry in entries {
        let relative = entry_relative_path(&entry.file_name).map_err(|reason| {
            InstallError::UnsafeEntryPath {
                entry: entry.file_name.clone(),
                reason,
            }
        })?;

        if relative.as_os_str().is_empty() {
            debug!(entry = %entry.file_name, "Skipping entry with empty path");
            continue;
        }

        if !entry.is_directory {
            ZipArchive::ensure_supported(entry).map_err(|source| InstallError::Extract {
                entry: entry.file_name.clone(),
                source,
            })?;
        }

        plan.push(PlannedEntry { entry, relative });
    }

    Ok(plan)
}

/// Create `path` and its parents; an existing directory is fine.
async fn create_dir(
    path: &Path,
    #[cfg_attr(not(unix), allow(unused_variables))] mode: Option<u32>,
) -> InstallResult<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    builder.mode(mode.unwrap_or(DIR_MODE));

    builder
        .create(path)
        .await
        .map_err(|source| InstallError::DirectoryCreate {
            path: path.to_path_buf(),
            source,
        })
}

/// Returns (files written, directories created).
async fn extract(
    archive: &ZipArchive,
    plan: &[PlannedEntry<'_>],
    target_dir: &Path,
) -> InstallResult<(usize, usize)> {
    let mut files = 0;
    let mut dirs = 0;

    for item in plan {
        let output_path = target_dir.join(&item.relative);

        if item.entry.is_directory {
            // Keep owner rwx so the entries below it can still be written
            create_dir(&output_path, item.entry.unix_mode().map(|m| m | 0o700)).await?;
            dirs += 1;
            continue;
        }

        debug!(entry = %item.entry.file_name, "extracting");
        archive
            .extract_to_file(item.entry, &output_path)
            .await
            .map_err(|source| InstallError::Extract {
                entry: item.entry.file_name.clone(),
                source,
            })?;
        files += 1;
    }

    Ok((files, dirs))
}

/// Rename `<target>/options.ini` to `<target>/<atcId>.ini` if present.
///
/// The name must match exactly, so the directory is listed instead of
/// checked by path (a path check would also hit `Options.ini` on case-insensitive
/// filesystems).
async fn rename_options(
    target_dir: &Path,
    metadata: &LiveryMetadata,
) -> InstallResult<Option<PathBuf>> {
    let listing = |source: std::io::Error| InstallError::Access {
        location: target_dir.display().to_string(),
        source: source.into(),
    };

    let mut found = false;
    let mut read_dir = fs::read_dir(target_dir).await.map_err(listing)?;
    while let Some(entry) = read_dir.next_entry().await.map_err(listing)? {
        if entry.file_name() == OPTIONS_FILE && entry.file_type().await.map_err(listing)?.is_file() {
            found = true;
            break;
        }
    }

    if !found {
        debug!(dir = %target_dir.display(), "No {} to rename", OPTIONS_FILE);
        return Ok(None);
    }

    let from = target_dir.join(OPTIONS_FILE);
    let to = target_dir.join(metadata.options_file_name());
    if from == to {
        return Ok(Some(to));
    }

    if let Err(source) = fs::rename(&from, &to).await {
        return Err(InstallError::Rename { from, to, source });
    }
    info!(from = %from.display(), to = %to.display(), "Renamed options file");

    Ok(Some(to))
}
