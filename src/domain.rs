use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::HubError;

pub const DATA_TYPES: &[&str] = &["genomics", "epigenomics", "transcriptomics", "proteomics"];

pub const DEFAULT_DATA_TYPE: &str = "genomics";

pub const FILE_TYPES: &[&str] = &[
    "bam",
    "bed",
    "bedGraph",
    "bigBarChart",
    "bigBed",
    "bigChain",
    "bigDbSnp",
    "bigGenePred",
    "bigInteract",
    "bigLolly",
    "bigMaf",
    "bigNarrowPeak",
    "bigPsl",
    "bigWig",
    "cram",
    "hic",
    "vcfTabix",
];

pub const VISIBILITIES: &[&str] = &["hide", "dense", "squish", "pack", "full"];

pub const DEFAULT_VISIBILITY: &str = "hide";

static ASSEMBLY_ACCESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^GC[AF]_\d{9}(\.\d+)?$").expect("valid accession pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    DataType,
    FileType,
    Visibility,
}

impl LookupKind {
    pub const ALL: [LookupKind; 3] = [
        LookupKind::DataType,
        LookupKind::FileType,
        LookupKind::Visibility,
    ];

    pub fn table(self) -> &'static str {
        match self {
            LookupKind::DataType => "data_type",
            LookupKind::FileType => "file_type",
            LookupKind::Visibility => "visibility",
        }
    }

    pub fn names(self) -> &'static [&'static str] {
        match self {
            LookupKind::DataType => DATA_TYPES,
            LookupKind::FileType => FILE_TYPES,
            LookupKind::Visibility => VISIBILITIES,
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

/// Lowercases and validates a user supplied data type, falling back to
/// `genomics` when none is given.
pub fn resolve_data_type(value: Option<&str>) -> Result<String, HubError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(DEFAULT_DATA_TYPE.to_string());
    };
    let normalized = value.to_lowercase();
    if !DATA_TYPES.contains(&normalized.as_str()) {
        return Err(HubError::InvalidDataType {
            given: normalized,
            valid: DATA_TYPES.join(", "),
        });
    }
    Ok(normalized)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HubUrl(String);

impl HubUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hub url truncated at its last `/`.
    pub fn base_url(&self) -> &str {
        match self.0.rfind('/') {
            Some(index) => &self.0[..index],
            None => &self.0,
        }
    }

    /// Joins a path taken from a hub or genomes file onto the base url.
    /// Paths that are already absolute urls are returned unchanged.
    pub fn resolve(&self, relative: &str) -> String {
        resolve_against(&self.0, relative)
    }
}

impl fmt::Display for HubUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HubUrl {
    type Err = HubError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let path_start = normalized
            .strip_prefix("https://")
            .or_else(|| normalized.strip_prefix("http://"))
            .or_else(|| normalized.strip_prefix("ftp://"));
        let is_valid = path_start
            .map(|rest| rest.contains('/') && !rest.starts_with('/') && !rest.ends_with('/'))
            .unwrap_or(false);
        if !is_valid {
            return Err(HubError::InvalidHubUrl(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Joins `relative` onto the directory of the file at `file_url`. Absolute
/// urls are returned unchanged.
pub fn resolve_against(file_url: &str, relative: &str) -> String {
    let relative = relative.trim();
    if is_absolute_url(relative) {
        return relative.to_string();
    }
    let base = match file_url.rfind('/') {
        Some(index) => &file_url[..index],
        None => file_url,
    };
    format!("{base}/{}", relative.trim_start_matches("./"))
}

fn is_absolute_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://") || value.starts_with("ftp://")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyAccession(String);

impl AssemblyAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssemblyAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssemblyAccession {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if !ASSEMBLY_ACCESSION.is_match(normalized) {
            return Err(());
        }
        Ok(Self(normalized.to_string()))
    }
}

/// The user submitting (and owning) a hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub email: String,
}

impl Owner {
    pub fn new(id: i64, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn base_url_drops_file_name() {
        let url: HubUrl = "https://example.org/hubs/encode/hub.txt".parse().unwrap();
        assert_eq!(url.base_url(), "https://example.org/hubs/encode");
        assert_eq!(
            url.resolve("mm10/trackDb.txt"),
            "https://example.org/hubs/encode/mm10/trackDb.txt"
        );
    }

    #[test]
    fn resolve_keeps_absolute_urls() {
        let url: HubUrl = "https://example.org/hub.txt".parse().unwrap();
        assert_eq!(
            url.resolve("http://mirror.example.net/hg38/trackDb.txt"),
            "http://mirror.example.net/hg38/trackDb.txt"
        );
    }

    #[test]
    fn data_files_resolve_against_trackdb_directory() {
        let trackdb = "https://example.org/hub/mm10/trackDb.txt";
        assert_eq!(
            resolve_against(trackdb, "a.bb"),
            "https://example.org/hub/mm10/a.bb"
        );
        assert_eq!(
            resolve_against(trackdb, "./bw/b.bw"),
            "https://example.org/hub/mm10/bw/b.bw"
        );
        assert_eq!(
            resolve_against(trackdb, "ftp://data.example.net/a.bb"),
            "ftp://data.example.net/a.bb"
        );
    }

    #[test]
    fn reject_url_without_path() {
        let err = "https://example.org".parse::<HubUrl>().unwrap_err();
        assert_matches!(err, HubError::InvalidHubUrl(_));
        let err = "example.org/hub.txt".parse::<HubUrl>().unwrap_err();
        assert_matches!(err, HubError::InvalidHubUrl(_));
    }

    #[test]
    fn data_type_defaults_and_validates() {
        assert_eq!(resolve_data_type(None).unwrap(), "genomics");
        assert_eq!(resolve_data_type(Some("  ")).unwrap(), "genomics");
        assert_eq!(
            resolve_data_type(Some("Epigenomics")).unwrap(),
            "epigenomics"
        );
        let err = resolve_data_type(Some("astrology")).unwrap_err();
        assert_matches!(err, HubError::InvalidDataType { given, .. } if given == "astrology");
    }

    #[test]
    fn assembly_accession_pattern() {
        assert!("GCA_000001405.28".parse::<AssemblyAccession>().is_ok());
        assert!("GCF_000001635".parse::<AssemblyAccession>().is_ok());
        assert!("mm10".parse::<AssemblyAccession>().is_err());
    }
}
