use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub id: i64,
    pub name: String,
    pub short_label: Option<String>,
    pub long_label: Option<String>,
    pub url: String,
    pub description_url: Option<String>,
    pub email: Option<String>,
    pub owner_id: i64,
    pub owner_email: String,
    pub species_taxon_id: Option<i64>,
    pub data_type_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHub {
    pub name: String,
    pub short_label: Option<String>,
    pub long_label: Option<String>,
    pub url: String,
    pub description_url: Option<String>,
    pub email: Option<String>,
    pub owner_id: i64,
    pub owner_email: String,
    pub species_taxon_id: Option<i64>,
    pub data_type_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub id: i64,
    pub name: String,
    pub trackdb_location: String,
    pub hub_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub id: i64,
    pub name: String,
    pub accession: Option<String>,
    pub long_name: Option<String>,
    pub synonyms: Option<String>,
    pub genome_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAssembly {
    pub name: String,
    pub accession: Option<String>,
    pub long_name: Option<String>,
    pub synonyms: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trackdb {
    pub id: i64,
    pub public: bool,
    pub configuration: Map<String, Value>,
    pub data: Vec<TrackEntry>,
    pub file_type_counts: BTreeMap<String, u64>,
    pub created: i64,
    pub updated: Option<i64>,
    pub source_url: String,
    pub source_checksum: Option<String>,
    pub assembly_id: i64,
    pub hub_id: i64,
    pub genome_id: i64,
}

/// One `{id, name}` item of a trackdb's flat `data` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub name: String,
    pub short_label: Option<String>,
    pub long_label: Option<String>,
    pub big_data_url: Option<String>,
    pub html: Option<String>,
    pub file_type_id: Option<i64>,
    pub visibility_id: i64,
    pub parent_id: Option<i64>,
    pub trackdb_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrack {
    pub name: String,
    pub short_label: Option<String>,
    pub long_label: Option<String>,
    pub big_data_url: Option<String>,
    pub html: Option<String>,
    pub file_type_id: Option<i64>,
    pub visibility_id: i64,
    pub trackdb_id: i64,
}

/// Result of one resolution pass written back onto a trackdb row.
#[derive(Debug, Clone, Copy)]
pub struct TrackdbUpdate<'a> {
    pub configuration: &'a Map<String, Value>,
    pub data: &'a [TrackEntry],
    pub file_type_counts: &'a BTreeMap<String, u64>,
    pub checksum: Option<&'a str>,
    pub updated: i64,
}

/// Relational state a search document is projected from.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackdbDocumentSource {
    pub trackdb: Trackdb,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTask {
    pub trackdb_id: i64,
    pub attempts: u32,
    pub last_error: Option<String>,
}
