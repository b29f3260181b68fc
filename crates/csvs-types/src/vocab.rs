//! Fixed vocabularies of the schema language: directives, versions,
//! hash algorithm names, integrity folder specifications.
//!
//! Each directive table row maps the parse-node tag the external parser
//! emits to the directive key, its schema keyword, and its default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────
// Directives
// ─────────────────────────────────────────────────────────────────────

/// Keys of the global (prolog) directive scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlobalKey {
    Separator,
    Quoted,
    TotalColumns,
    PermitEmpty,
    NoHeader,
    IgnoreColumnNameCase,
}

/// Keys of the per-column directive scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnKey {
    Optional,
    MatchIsFalse,
    IgnoreCase,
    Warning,
}

/// One row of a directive vocabulary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSpec<K> {
    /// Parse-node tag, e.g. `no_header_directive`.
    pub tag: &'static str,
    /// Keyword as written in a schema document.
    pub keyword: &'static str,
    pub key: K,
    /// Whether the directive carries a value token.
    pub takes_value: bool,
    /// Default applied when the directive is absent.
    pub default: &'static str,
}

pub const GLOBAL_DIRECTIVES: &[DirectiveSpec<GlobalKey>] = &[
    DirectiveSpec {
        tag: "separator_directive",
        keyword: "@separator",
        key: GlobalKey::Separator,
        takes_value: true,
        default: ",",
    },
    DirectiveSpec {
        tag: "quoted_directive",
        keyword: "@quoted",
        key: GlobalKey::Quoted,
        takes_value: false,
        default: "false",
    },
    DirectiveSpec {
        tag: "total_columns_directive",
        keyword: "@totalColumns",
        key: GlobalKey::TotalColumns,
        takes_value: true,
        default: "none",
    },
    DirectiveSpec {
        tag: "permit_empty_directive",
        keyword: "@permitEmpty",
        key: GlobalKey::PermitEmpty,
        takes_value: false,
        default: "false",
    },
    DirectiveSpec {
        tag: "no_header_directive",
        keyword: "@noHeader",
        key: GlobalKey::NoHeader,
        takes_value: false,
        default: "false",
    },
    DirectiveSpec {
        tag: "ignore_column_name_case_directive",
        keyword: "@ignoreColumnNameCase",
        key: GlobalKey::IgnoreColumnNameCase,
        takes_value: false,
        default: "false",
    },
];

pub const COLUMN_DIRECTIVES: &[DirectiveSpec<ColumnKey>] = &[
    DirectiveSpec {
        tag: "optional_directive",
        keyword: "@optional",
        key: ColumnKey::Optional,
        takes_value: false,
        default: "false",
    },
    DirectiveSpec {
        tag: "match_is_false_directive",
        keyword: "@matchIsFalse",
        key: ColumnKey::MatchIsFalse,
        takes_value: false,
        default: "false",
    },
    DirectiveSpec {
        tag: "ignore_case_directive",
        keyword: "@ignoreCase",
        key: ColumnKey::IgnoreCase,
        takes_value: false,
        default: "false",
    },
    DirectiveSpec {
        tag: "warning_directive",
        keyword: "@warning",
        key: ColumnKey::Warning,
        takes_value: false,
        default: "false",
    },
];

/// Look up a global directive by parse-node tag.
pub fn global_directive(tag: &str) -> Option<&'static DirectiveSpec<GlobalKey>> {
    GLOBAL_DIRECTIVES.iter().find(|d| d.tag == tag)
}

/// Look up a column directive by parse-node tag.
pub fn column_directive(tag: &str) -> Option<&'static DirectiveSpec<ColumnKey>> {
    COLUMN_DIRECTIVES.iter().find(|d| d.tag == tag)
}

/// Whether a tag names a directive in either scope's naming convention.
pub fn looks_like_directive(tag: &str) -> bool {
    tag.ends_with("_directive")
}

// ─────────────────────────────────────────────────────────────────────
// Versions
// ─────────────────────────────────────────────────────────────────────

/// Schema language versions accepted by the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Version {
    #[serde(rename = "1.0")]
    V1_0,
    #[serde(rename = "1.1")]
    V1_1,
    #[serde(rename = "1.2")]
    V1_2,
}

pub const SUPPORTED_VERSIONS: &[&str] = &["1.0", "1.1", "1.2"];

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0" => Ok(Self::V1_0),
            "1.1" => Ok(Self::V1_1),
            "1.2" => Ok(Self::V1_2),
            other => Err(format!(
                "unsupported schema version '{other}', expected one of {}",
                SUPPORTED_VERSIONS.join(", ")
            )),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1_0 => write!(f, "1.0"),
            Self::V1_1 => write!(f, "1.1"),
            Self::V1_2 => write!(f, "1.2"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Checksum algorithms
// ─────────────────────────────────────────────────────────────────────

/// Hash algorithms a `checksum` rule may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
}

impl FromStr for HashAlgorithm {
    type Err = String;

    /// Names match case-insensitively, with or without the hyphen:
    /// `SHA-256`, `sha256`, `SHA-512/256`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SHA224" => Ok(Self::Sha224),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            "SHA512/224" => Ok(Self::Sha512_224),
            "SHA512/256" => Ok(Self::Sha512_256),
            _ => Err(format!("unsupported hash algorithm '{}'", s.trim())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Sha512_224 => "SHA-512/224",
            Self::Sha512_256 => "SHA-512/256",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Integrity check folder specification
// ─────────────────────────────────────────────────────────────────────

/// Whether directories on disk count as entries an integrity check expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderSpec {
    IncludeFolder,
    ExcludeFolder,
}

impl FromStr for FolderSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "includeFolder" => Ok(Self::IncludeFolder),
            "excludeFolder" => Ok(Self::ExcludeFolder),
            other => Err(format!(
                "unknown folder specification '{other}', expected includeFolder or excludeFolder"
            )),
        }
    }
}

impl fmt::Display for FolderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncludeFolder => write!(f, "includeFolder"),
            Self::ExcludeFolder => write!(f, "excludeFolder"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_directive_tags_are_unique() {
        let mut seen = HashSet::new();
        for tag in GLOBAL_DIRECTIVES
            .iter()
            .map(|d| d.tag)
            .chain(COLUMN_DIRECTIVES.iter().map(|d| d.tag))
        {
            assert!(seen.insert(tag), "duplicate directive tag {tag}");
            assert!(looks_like_directive(tag));
        }
    }

    #[test]
    fn test_directive_lookup() {
        assert_eq!(
            global_directive("no_header_directive").map(|d| d.key),
            Some(GlobalKey::NoHeader)
        );
        assert_eq!(
            column_directive("warning_directive").map(|d| d.key),
            Some(ColumnKey::Warning)
        );
        assert!(global_directive("optional_directive").is_none());
        assert!(column_directive("colour_directive").is_none());
    }

    #[test]
    fn test_version_parse() {
        assert_eq!("1.1".parse::<Version>(), Ok(Version::V1_1));
        assert_eq!(" 1.2 ".parse::<Version>(), Ok(Version::V1_2));
        let err = "2.0".parse::<Version>().unwrap_err();
        assert!(err.contains("1.0, 1.1, 1.2"));
        assert_eq!(Version::V1_0.to_string(), "1.0");
    }

    #[test]
    fn test_hash_algorithm_names() {
        assert_eq!("SHA-256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert_eq!("sha256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert_eq!("SHA-512/256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha512_256));
        assert_eq!("sha_384".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha384));
        assert!("MD5".parse::<HashAlgorithm>().is_err());
        assert!("SHA-1".parse::<HashAlgorithm>().is_err());
        assert_eq!(HashAlgorithm::Sha512_224.to_string(), "SHA-512/224");
    }

    #[test]
    fn test_folder_spec() {
        assert_eq!("includeFolder".parse::<FolderSpec>(), Ok(FolderSpec::IncludeFolder));
        assert_eq!("excludeFolder".parse::<FolderSpec>(), Ok(FolderSpec::ExcludeFolder));
        assert!("IncludeFolder".parse::<FolderSpec>().is_err());
    }
}
