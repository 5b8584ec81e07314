//! License taxonomy mapping
//!
//! Maps free-text upstream license declarations to canonical identifiers
//! through an ordered list of case-insensitive family patterns. Families
//! with an embedded version number carry it into the identifier; otherwise
//! a per-family default applies.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

enum Rule {
    /// Family with a version capture group and a default version.
    /// A `None` default renders the bare family name.
    Versioned {
        re: Regex,
        family: &'static str,
        default: Option<&'static str>,
    },
    /// Family that always maps to one fixed identifier.
    Literal { re: Regex, id: &'static str },
}

impl Rule {
    fn versioned(pattern: &str, family: &'static str, default: Option<&'static str>) -> Self {
        Rule::Versioned {
            re: Regex::new(pattern).expect("invalid license pattern"),
            family,
            default,
        }
    }

    fn literal(pattern: &str, id: &'static str) -> Self {
        Rule::Literal {
            re: Regex::new(pattern).expect("invalid license pattern"),
            id,
        }
    }
}

// Order matters: the first matching family wins. The version, when present,
// is capture group 4.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::versioned(r"(?i)^(Apache)((.)*(1\.0|1\.1|2\.0|2))?", "Apache", Some("1.0")),
        Rule::versioned(r"(?i)^(BSD)((.)*([1234]))?", "BSD", None),
        Rule::versioned(r"(?i)^(GPL)((.)*([123]))?", "GPL", Some("1")),
        Rule::versioned(r"(?i)^(LGPL)((.)*([23]|2\.1))?", "LGPL", Some("2")),
        Rule::versioned(r"(?i)^(Mozilla)((.)*(1\.1))?", "MPL", Some("2.0")),
        Rule::literal(r"(?i)^MIT", "MIT"),
        Rule::literal(r"(?i)^(Creative Commons)", "CC-BY-SA-3.0"),
    ]
});

/// Map one free-text license string to its canonical identifier.
pub fn canonicalize(raw: &str) -> Result<String> {
    let raw = raw.trim();
    for rule in RULES.iter() {
        match rule {
            Rule::Versioned { re, family, default } => {
                if let Some(caps) = re.captures(raw) {
                    if let Some(version) = caps.get(4) {
                        return Ok(format!("{}-{}", family, version.as_str()));
                    }
                    return Ok(match default {
                        Some(version) => format!("{}-{}", family, version),
                        None => (*family).to_string(),
                    });
                }
            }
            Rule::Literal { re, id } => {
                if re.is_match(raw) {
                    return Ok((*id).to_string());
                }
            }
        }
    }
    tracing::error!("could not match license '{}'", raw);
    Err(Error::UnknownLicense(raw.to_string()))
}

/// Canonicalize a full upstream license declaration.
///
/// Each entry may itself be a comma-joined list ("BSD,GPL"). Any single
/// failure aborts the whole expression; no partial results are returned.
pub fn canonicalize_expression(raw_licenses: &[String]) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    for raw in raw_licenses {
        for part in raw.split(',') {
            ids.push(canonicalize(part)?);
        }
    }
    Ok(ids)
}
