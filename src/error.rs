//! Error type for the install pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Every way an install or inspection can fail.
///
/// Nothing here terminates the process; the binary decides how to report
/// it. The underlying cause is kept as `source` so the full chain can be
/// printed.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The community folder lacks the layout generator marker.
    #[error("MSFSLayoutGenerator.exe not found in community folder: {}", .path.display())]
    MissingPrerequisite { path: PathBuf },

    #[error("archive does not exist: {location}")]
    FileNotFound { location: String },

    /// Stat, listing or network failure other than "not found".
    #[error("error accessing {location}")]
    Access {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    /// The archive exists but is not a readable zip.
    #[error("error opening zip archive {location}")]
    ArchiveOpen {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("livery.json not found at the root of {location}")]
    MetadataNotFound { location: String },

    #[error("error reading livery.json from {location}")]
    MetadataRead {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("error parsing livery.json")]
    MetadataParse(#[from] serde_json::Error),

    #[error("invalid `{field}` in livery.json: {reason}")]
    InvalidMetadata { field: &'static str, reason: String },

    /// An entry name would land outside the target directory.
    #[error("refusing to extract `{entry}`: {reason}")]
    UnsafeEntryPath { entry: String, reason: &'static str },

    #[error("error creating directory {}", .path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error extracting `{entry}`")]
    Extract {
        entry: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not rename {} to {}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type InstallResult<T> = Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_messages_name_the_path() {
        let err = InstallError::MissingPrerequisite {
            path: PathBuf::from("/sim/Community"),
        };
        assert_eq!(
            err.to_string(),
            "MSFSLayoutGenerator.exe not found in community folder: /sim/Community"
        );

        let err = InstallError::FileNotFound {
            location: "/tmp/AFR.zip".to_string(),
        };
        assert_eq!(err.to_string(), "archive does not exist: /tmp/AFR.zip");
    }

    #[test]
    fn test_source_chain_is_kept() {
        let err = InstallError::DirectoryCreate {
            path: PathBuf::from("/sim/pmdg-aircraft-77f-liveries"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied"),
        };
        assert_eq!(err.source().unwrap().to_string(), "Permission denied");

        let err = InstallError::ArchiveOpen {
            location: "AFR.zip".to_string(),
            source: anyhow::anyhow!("Not a valid ZIP file"),
        };
        assert_eq!(err.source().unwrap().to_string(), "Not a valid ZIP file");
    }
}
