//! Digest cache schema definition

pub const SCHEMA_VERSION: i64 = 1;

pub const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_info (
    version INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS md5_digests (
    archive TEXT PRIMARY KEY,
    digest TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sha256_digests (
    archive TEXT PRIMARY KEY,
    digest TEXT NOT NULL
);
"#;
