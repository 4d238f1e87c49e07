use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::HubError;

pub const CONTAINER_KEYS: [&str; 3] = ["compositeTrack", "superTrack", "container"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Hub,
    Genomes,
    TrackDb,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl ParseMode {
    fn label(self) -> &'static str {
        match self {
            ParseMode::Hub => "hub",
            ParseMode::Genomes => "genome",
            ParseMode::TrackDb => "track",
        }
    }

    fn mandatory_keys(self) -> &'static [&'static str] {
        match self {
            ParseMode::Hub => &["hub"],
            ParseMode::Genomes => &["genome", "trackDb"],
            ParseMode::TrackDb => &["track"],
        }
    }
}

/// One blank-line delimited block of `key value` lines, in order of first
/// appearance of each key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    entries: Vec<(String, String)>,
}

impl Stanza {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(name, _)| name == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_container(&self) -> bool {
        CONTAINER_KEYS.iter().any(|key| self.contains_key(key))
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Stanza {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut stanza = Stanza::new();
        for (key, value) in iter {
            stanza.insert(key, value);
        }
        stanza
    }
}

impl Serialize for Stanza {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// `first_word("bigBed 6 +") == "bigBed"`
pub fn first_word(value: &str) -> &str {
    let trimmed = value.trim_end_matches(['\n', '\r']);
    trimmed.split(' ').next().unwrap_or(trimmed)
}

pub fn parse<S: AsRef<str>>(lines: &[S], mode: ParseMode) -> Result<Vec<Stanza>, HubError> {
    let stanzas = split_stanzas(lines);

    match mode {
        ParseMode::Hub => {
            let stanza = stanzas.into_iter().next().ok_or(HubError::EmptyHubFile)?;
            require_keys(&stanza, mode)?;
            Ok(vec![stanza])
        }
        ParseMode::Genomes => {
            for stanza in &stanzas {
                require_keys(stanza, mode)?;
            }
            Ok(stanzas)
        }
        ParseMode::TrackDb => Ok(stanzas
            .into_iter()
            .filter(|stanza| {
                let keep = stanza.contains_key("track");
                if !keep {
                    tracing::debug!(keys = stanza.len(), "skipping stanza without track key");
                }
                keep
            })
            .collect()),
    }
}

fn require_keys(stanza: &Stanza, mode: ParseMode) -> Result<(), HubError> {
    for &key in mode.mandatory_keys() {
        if !stanza.contains_key(key) {
            return Err(HubError::MissingKey {
                mode: mode.label(),
                key,
            });
        }
    }
    Ok(())
}

fn split_stanzas<S: AsRef<str>>(lines: &[S]) -> Vec<Stanza> {
    let mut stanzas = Vec::new();
    let mut current = Stanza::new();

    for line in lines {
        let line = line.as_ref().trim_end_matches(['\n', '\r']);
        let content = line.trim_start();
        if content.trim_end().is_empty() {
            if !current.is_empty() {
                stanzas.push(std::mem::take(&mut current));
            }
            continue;
        }
        if content.starts_with('#') {
            continue;
        }
        let (key, value) = split_line(content);
        current.insert(key, value);
    }
    if !current.is_empty() {
        stanzas.push(current);
    }
    stanzas
}

fn split_line(line: &str) -> (&str, &str) {
    match line.find(char::is_whitespace) {
        Some(index) => {
            let (key, rest) = line.split_at(index);
            (key, rest.trim_start())
        }
        None => (line, ""),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn first_word_strips_settings() {
        assert_eq!(first_word("bigBed 6 +"), "bigBed");
        assert_eq!(first_word("uniformDnasePeaks off"), "uniformDnasePeaks");
        assert_eq!(first_word("x"), "x");
        assert_eq!(first_word("bigWig\n"), "bigWig");
    }

    #[test]
    fn split_line_keeps_multi_word_values() {
        assert_eq!(
            split_line("longLabel ENCODE  DNase peaks"),
            ("longLabel", "ENCODE  DNase peaks")
        );
        assert_eq!(split_line("type\tbigBed 6 +"), ("type", "bigBed 6 +"));
        assert_eq!(split_line("compositeTrack"), ("compositeTrack", ""));
    }

    #[test]
    fn hub_mode_requires_hub_key() {
        let err = parse(&["shortLabel x", "genomesFile genomes.txt"], ParseMode::Hub).unwrap_err();
        assert_matches!(err, HubError::MissingKey { key: "hub", .. });
    }

    #[test]
    fn hub_mode_rejects_empty_input() {
        let lines: [&str; 2] = ["", "# nothing"];
        let err = parse(&lines, ParseMode::Hub).unwrap_err();
        assert_matches!(err, HubError::EmptyHubFile);
        assert!(err.is_parse());
    }

    #[test]
    fn genome_mode_requires_trackdb() {
        let lines = ["genome hg38", "trackDb hg38/trackDb.txt", "", "genome mm10"];
        let err = parse(&lines, ParseMode::Genomes).unwrap_err();
        assert_matches!(err, HubError::MissingKey { key: "trackDb", .. });
    }

    #[test]
    fn repeated_key_keeps_position() {
        let stanzas = parse(&["track a", "type bed", "track b"], ParseMode::TrackDb).unwrap();
        let keys: Vec<_> = stanzas[0].iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["track", "type"]);
        assert_eq!(stanzas[0].get("track"), Some("b"));
    }
}
