use std::collections::HashMap;

use crate::domain::{DEFAULT_VISIBILITY, LookupKind};
use crate::error::HubError;
use crate::parser::first_word;

/// Immutable snapshot of the seeded DataType, FileType and Visibility rows.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    data_types: HashMap<String, i64>,
    file_types: HashMap<String, i64>,
    visibilities: HashMap<String, i64>,
}

impl Lookups {
    pub fn new(
        data_types: HashMap<String, i64>,
        file_types: HashMap<String, i64>,
        visibilities: HashMap<String, i64>,
    ) -> Self {
        Self {
            data_types,
            file_types,
            visibilities,
        }
    }

    pub fn id(&self, kind: LookupKind, name: &str) -> Option<i64> {
        self.table(kind).get(name).copied()
    }

    pub fn require(&self, kind: LookupKind, name: &str) -> Result<i64, HubError> {
        self.id(kind, name).ok_or_else(|| HubError::UnknownLookup {
            kind: kind.table(),
            name: name.to_string(),
        })
    }

    pub fn data_type(&self, name: &str) -> Result<i64, HubError> {
        self.require(LookupKind::DataType, name)
    }

    /// Resolves a raw `type` value such as `bigBed 6 +` by its first word.
    pub fn file_type(&self, raw: &str) -> Option<(i64, &str)> {
        let name = first_word(raw.trim_start());
        self.file_types
            .get_key_value(name)
            .map(|(name, id)| (*id, name.as_str()))
    }

    /// Resolves a `visibility` value, `hide` when absent or unknown.
    pub fn visibility(&self, raw: Option<&str>) -> Result<i64, HubError> {
        let requested = raw.map(|value| first_word(value.trim()));
        if let Some(id) = requested.and_then(|name| self.visibilities.get(name)) {
            return Ok(*id);
        }
        if let Some(name) = requested {
            tracing::warn!(
                visibility = name,
                fallback = DEFAULT_VISIBILITY,
                "unknown visibility"
            );
        }
        self.require(LookupKind::Visibility, DEFAULT_VISIBILITY)
    }

    pub fn len(&self, kind: LookupKind) -> usize {
        self.table(kind).len()
    }

    fn table(&self, kind: LookupKind) -> &HashMap<String, i64> {
        match kind {
            LookupKind::DataType => &self.data_types,
            LookupKind::FileType => &self.file_types,
            LookupKind::Visibility => &self.visibilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookups() -> Lookups {
        Lookups::new(
            HashMap::from([("genomics".to_string(), 1)]),
            HashMap::from([("bigBed".to_string(), 10), ("bigWig".to_string(), 11)]),
            HashMap::from([("hide".to_string(), 20), ("dense".to_string(), 21)]),
        )
    }

    #[test]
    fn file_type_uses_first_word() {
        let lookups = lookups();
        assert_eq!(lookups.file_type("bigBed 6 +"), Some((10, "bigBed")));
        assert_eq!(lookups.file_type("bigWig"), Some((11, "bigWig")));
        assert_eq!(lookups.file_type("narrowPeak"), None);
    }

    #[test]
    fn visibility_defaults_to_hide() {
        let lookups = lookups();
        assert_eq!(lookups.visibility(None).unwrap(), 20);
        assert_eq!(lookups.visibility(Some("dense")).unwrap(), 21);
        assert_eq!(lookups.visibility(Some("sideways")).unwrap(), 20);
    }
}
