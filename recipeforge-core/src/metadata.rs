//! Upstream package metadata
//!
//! Metadata is fetched by a collaborator and may be missing entirely; the
//! engine tolerates that by falling back to defaults.

use md5::{Digest, Md5};
use serde::Deserialize;

/// Upstream metadata for one package, with fallbacks matching a missing
/// manifest: empty description, no license, default build type.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamMetadata {
    #[serde(default)]
    pub description: String,

    /// Raw upstream license strings, canonicalized at synthesis time.
    #[serde(default)]
    pub license: Vec<String>,

    #[serde(default)]
    pub homepage: Option<String>,

    #[serde(default = "default_author")]
    pub author: String,

    #[serde(default = "default_build_type")]
    pub build_type: String,

    /// Raw manifest text, used for the license file checksum line.
    #[serde(default)]
    pub manifest_text: Option<String>,
}

fn default_author() -> String {
    "OSRF".to_string()
}

fn default_build_type() -> String {
    "catkin".to_string()
}

impl Default for UpstreamMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            license: Vec::new(),
            homepage: None,
            author: default_author(),
            build_type: default_build_type(),
            manifest_text: None,
        }
    }
}

/// Location and digest of the license declaration inside the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseFileChecksum {
    pub line: usize,
    pub md5: String,
}

/// Find the first manifest line mentioning the license and hash it, for the
/// recipe's license-file checksum field.
pub fn license_file_checksum(manifest: &str) -> Option<LicenseFileChecksum> {
    for (index, line) in manifest.lines().enumerate() {
        if line.contains("license") {
            let mut hasher = Md5::new();
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
            return Some(LicenseFileChecksum {
                line: index + 1,
                md5: format!("{:x}", hasher.finalize()),
            });
        }
    }
    None
}
