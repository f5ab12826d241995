// Manual device file — curated JSON roster used when no directory API
// key is configured, and as an export target.
//
// Document shape:
//   { "devices": [ { "name", "hostname", "ipAddress",
//                    "os"?, "deviceType"?, "online"?, "tags"? } ] }

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// One entry in the manual device document. Optional fields get
/// defaults at normalization time, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualDevice {
    pub name: String,
    pub hostname: String,
    pub ip_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// The manual device document root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualDocument {
    pub devices: Vec<ManualDevice>,
}

impl ManualDocument {
    /// Parse a manual device document from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidFile {
            message: format!("malformed manual device document: {e}"),
        })
    }

    /// Serialize to pretty-printed JSON for writing back to disk.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidFile {
            message: format!("serialization failed: {e}"),
        })
    }

    /// Load a manual device document from a file.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        debug!(path = %path.display(), "loading manual device file");
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::InvalidFile {
                message: format!("{}: {e}", path.display()),
            })?;
        Self::from_json(&raw)
    }

    /// Write the document to a file, replacing any previous contents.
    pub async fn save(&self, path: &Path) -> Result<(), Error> {
        let json = self.to_json()?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| Error::InvalidFile {
                message: format!("{}: {e}", path.display()),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_entries() {
        let doc = ManualDocument::from_json(
            r#"{ "devices": [ { "name": "nas", "hostname": "nas.ts.net",
                 "ipAddress": "100.64.0.5" } ] }"#,
        )
        .unwrap();

        assert_eq!(doc.devices.len(), 1);
        let d = &doc.devices[0];
        assert_eq!(d.name, "nas");
        assert!(d.os.is_none());
        assert!(d.online.is_none());
        assert!(d.tags.is_empty());
    }

    #[test]
    fn parses_full_entries() {
        let doc = ManualDocument::from_json(
            r#"{ "devices": [ { "name": "nas", "hostname": "nas.ts.net",
                 "ipAddress": "100.64.0.5", "os": "Linux",
                 "deviceType": "server", "online": true,
                 "tags": ["storage"] } ] }"#,
        )
        .unwrap();

        let d = &doc.devices[0];
        assert_eq!(d.os.as_deref(), Some("Linux"));
        assert_eq!(d.device_type.as_deref(), Some("server"));
        assert_eq!(d.online, Some(true));
        assert_eq!(d.tags, vec!["storage".to_owned()]);
    }

    #[test]
    fn rejects_malformed_document() {
        let err = ManualDocument::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::InvalidFile { .. }));
    }

    #[test]
    fn json_round_trip_preserves_entries() {
        let doc = ManualDocument {
            devices: vec![ManualDevice {
                name: "nas".into(),
                hostname: "nas.ts.net".into(),
                ip_address: "100.64.0.5".into(),
                os: Some("Linux".into()),
                device_type: Some("server".into()),
                online: Some(false),
                tags: vec!["storage".into()],
            }],
        };

        let back = ManualDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(back.devices.len(), 1);
        assert_eq!(back.devices[0].hostname, "nas.ts.net");
        assert_eq!(back.devices[0].online, Some(false));
    }

    #[tokio::test]
    async fn load_and_save_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");

        let doc = ManualDocument {
            devices: vec![ManualDevice {
                name: "printer".into(),
                hostname: "printer.ts.net".into(),
                ip_address: "100.64.0.9".into(),
                os: None,
                device_type: None,
                online: Some(true),
                tags: Vec::new(),
            }],
        };

        doc.save(&path).await.unwrap();
        let loaded = ManualDocument::load(&path).await.unwrap();
        assert_eq!(loaded.devices[0].name, "printer");
    }

    #[tokio::test]
    async fn load_missing_file_is_invalid_file() {
        let err = ManualDocument::load(Path::new("/nonexistent/devices.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFile { .. }));
    }
}
