//! Source archive download and digest caching
//!
//! Downloads a package's source archive at most once to a content-addressed
//! local path, computes md5 and sha256 digests, and persists both in the
//! digest cache so later runs skip the network entirely.

use std::fs;
use std::path::{Path, PathBuf};

use md5::Md5;
use recipeforge_cache::DigestCache;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{Error, Result};

/// Deterministic archive identifier derived from package identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveIdentity {
    file_name: String,
}

impl ArchiveIdentity {
    pub fn new(name: &str, version: &str, distro: &str) -> Self {
        Self {
            file_name: format!("{}-{}-{}.tar.gz", name.replace('-', "_"), version, distro),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Both digests of one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digests {
    pub md5: String,
    pub sha256: String,
}

/// Downloads archives and fills the digest cache.
pub struct ArchiveFetcher {
    archive_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl ArchiveFetcher {
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            client: reqwest::blocking::Client::builder()
                .user_agent(concat!("recipeforge/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Return cached digests for the archive, downloading and hashing it
    /// only if either digest is missing from the cache.
    pub fn ensure_archive(
        &self,
        cache: &mut DigestCache,
        identity: &ArchiveIdentity,
        src_uri: &str,
    ) -> Result<Digests> {
        let key = identity.file_name();

        if let (Some(md5), Some(sha256)) = (cache.get_md5(key)?, cache.get_sha256(key)?) {
            debug!("using cached digests for '{}'", key);
            return Ok(Digests { md5, sha256 });
        }

        let path = self.archive_dir.join(key);
        if path.exists() {
            info!("using cached archive '{}'", key);
        } else {
            info!("downloading '{}' from {}", key, src_uri);
            self.download(src_uri, &path)?;
        }

        let bytes = fs::read(&path)
            .map_err(|e| Error::ArchiveFetch(format!("failed to read '{}': {}", key, e)))?;
        let digests = Digests {
            md5: format!("{:x}", Md5::digest(&bytes)),
            sha256: format!("{:x}", Sha256::digest(&bytes)),
        };
        cache.insert(key, &digests.md5, &digests.sha256)?;
        Ok(digests)
    }

    fn download(&self, url: &str, out: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::ArchiveFetch(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ArchiveFetch(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| Error::ArchiveFetch(format!("{}: {}", url, e)))?;

        if let Some(dir) = out.parent() {
            fs::create_dir_all(dir)?;
        }
        // Write to a temp path first so a failed download never leaves a
        // half-written archive at the final path.
        let temp_path = out.with_file_name(format!(
            "{}.part",
            out.file_name().unwrap_or_default().to_string_lossy()
        ));
        fs::write(&temp_path, &bytes)?;
        fs::rename(&temp_path, out)?;
        Ok(())
    }
}
