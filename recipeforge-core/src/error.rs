use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("digest cache error: {0}")]
    Cache(#[from] recipeforge_cache::Error),

    #[error("upstream metadata unavailable for '{0}'")]
    MissingMetadata(String),

    #[error("could not resolve dependencies: {}", .0.join(", "))]
    UnresolvedDependency(Vec<String>),

    #[error("could not match license {0:?}")]
    UnknownLicense(String),

    #[error("archive fetch failed: {0}")]
    ArchiveFetch(String),

    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
