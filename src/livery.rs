use serde::{Deserialize, Serialize};

use crate::error::InstallError;
use crate::sanitize::validate_component;

/// Contents of the `livery.json` entry at the archive root.
///
/// Every key is required; serde rejects documents that omit one. Unknown
/// keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveryMetadata {
    pub rev: i64,
    pub product_id: i64,
    pub product_package: String,
    pub title: String,
    pub airline: String,
    pub airline_icao: String,
    pub atc_id: String,
    /// Name of the folder the livery is installed into
    pub livery_id: String,
    pub version: i64,
}

impl LiveryMetadata {
    /// Decode and validate a `livery.json` document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InstallError> {
        // Editors on Windows like to prepend a BOM
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

        let metadata: LiveryMetadata = serde_json::from_slice(bytes)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// `liveryId` names a directory and `atcId` names a file, so both must
    /// be a single safe path component.
    fn validate(&self) -> Result<(), InstallError> {
        validate_component(&self.livery_id).map_err(|reason| InstallError::InvalidMetadata {
            field: "liveryId",
            reason,
        })?;
        validate_component(&self.atc_id).map_err(|reason| InstallError::InvalidMetadata {
            field: "atcId",
            reason,
        })?;
        Ok(())
    }

    /// File name `options.ini` is renamed to
    pub fn options_file_name(&self) -> String {
        format!("{}.ini", self.atc_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::livery_json;

    #[test]
    fn test_decode_all_fields() {
        let metadata = LiveryMetadata::from_slice(livery_json("AFR-001", "AFR1").as_bytes()).unwrap();

        assert_eq!(
            metadata,
            LiveryMetadata {
                rev: 3,
                product_id: 7700,
                product_package: "pmdg-aircraft-77f".to_string(),
                title: "Air France Cargo".to_string(),
                airline: "Air France".to_string(),
                airline_icao: "AFR".to_string(),
                atc_id: "AFR1".to_string(),
                livery_id: "AFR-001".to_string(),
                version: 1,
            }
        );
        assert_eq!(metadata.options_file_name(), "AFR1.ini");
    }

    #[test]
    fn test_bom_is_tolerated() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(livery_json("AFR-001", "AFR1").as_bytes());
        assert!(LiveryMetadata::from_slice(&bytes).is_ok());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let json = livery_json("AFR-001", "AFR1").replacen('{', r#"{"registration": "F-GZCP","#, 1);
        assert!(LiveryMetadata::from_slice(json.as_bytes()).is_ok());
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let json = r#"{"liveryId": "AFR-001", "atcId": "AFR1"}"#;
        let err = LiveryMetadata::from_slice(json.as_bytes()).unwrap_err();
        assert!(matches!(err, InstallError::MetadataParse(_)));
        assert!(err.to_string().contains("livery.json"));
    }

    #[test]
    fn test_malformed_json() {
        let err = LiveryMetadata::from_slice(b"{\"rev\": 1,").unwrap_err();
        assert!(matches!(err, InstallError::MetadataParse(_)));
    }

    #[test]
    fn test_wrong_type() {
        let json = livery_json("AFR-001", "AFR1").replace("\"rev\": 3", "\"rev\": \"three\"");
        let err = LiveryMetadata::from_slice(json.as_bytes()).unwrap_err();
        assert!(matches!(err, InstallError::MetadataParse(_)));
    }

    #[test]
    fn test_livery_id_must_be_a_plain_name() {
        let err = LiveryMetadata::from_slice(livery_json("../../Windows", "AFR1").as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            InstallError::InvalidMetadata { field: "liveryId", .. }
        ));
    }

    #[test]
    fn test_empty_atc_id_rejected() {
        let err = LiveryMetadata::from_slice(livery_json("AFR-001", "").as_bytes()).unwrap_err();
        assert!(matches!(err, InstallError::InvalidMetadata { field: "atcId", .. }));
    }
}
