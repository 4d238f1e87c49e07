use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::HttpSettings;
use crate::error::HubError;
use crate::model::{TrackEntry, TrackdbDocumentSource};

/// Denormalized projection of one trackdb, keyed by the trackdb id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackdbDocument {
    pub file_type: BTreeMap<String, u64>,
    pub data: Vec<TrackEntry>,
    pub updated: i64,
    pub source: DocumentSource,
    #[serde(rename = "type")]
    pub data_type: String,
    pub configuration: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub url: String,
    pub checksum: String,
}

impl TrackdbDocument {
    pub fn project(source: TrackdbDocumentSource) -> Self {
        let TrackdbDocumentSource { trackdb, data_type } = source;
        Self {
            file_type: trackdb.file_type_counts,
            data: trackdb.data,
            updated: trackdb.updated.unwrap_or(trackdb.created),
            source: DocumentSource {
                url: trackdb.source_url,
                checksum: trackdb.source_checksum.unwrap_or_default(),
            },
            data_type,
            configuration: trackdb.configuration,
        }
    }
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    doc: &'a TrackdbDocument,
    doc_as_upsert: bool,
}

pub trait SearchSink: Send + Sync {
    fn upsert_document(&self, index: &str, id: i64, body: &TrackdbDocument)
    -> Result<(), HubError>;
    fn delete_document(&self, index: &str, id: i64) -> Result<(), HubError>;
}

#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Client,
    base_url: String,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str, settings: &HttpSettings) -> Result<Self, HubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("trackhub-registry/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HubError::Indexing(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| HubError::Indexing(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn check(response: reqwest::blocking::Response) -> Result<(), HubError> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "search index request failed".to_string());
        Err(HubError::IndexStatus { status, message })
    }
}

impl SearchSink for ElasticsearchClient {
    fn upsert_document(
        &self,
        index: &str,
        id: i64,
        body: &TrackdbDocument,
    ) -> Result<(), HubError> {
        let url = format!("{}/{index}/_update/{id}", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("refresh", "true")])
            .json(&UpdateRequest {
                doc: body,
                doc_as_upsert: true,
            })
            .send()
            .map_err(|err| HubError::Indexing(err.to_string()))?;
        Self::check(response)
    }

    fn delete_document(&self, index: &str, id: i64) -> Result<(), HubError> {
        let url = format!("{}/{index}/_doc/{id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .query(&[("refresh", "true")])
            .send()
            .map_err(|err| HubError::Indexing(err.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::Trackdb;

    #[test]
    fn document_uses_search_field_names() {
        let mut configuration = Map::new();
        configuration.insert("comp".to_string(), json!({"track": "comp"}));
        let document = TrackdbDocument::project(TrackdbDocumentSource {
            trackdb: Trackdb {
                id: 7,
                public: true,
                configuration,
                data: vec![TrackEntry {
                    id: "comp".to_string(),
                    name: Some("Composite".to_string()),
                }],
                file_type_counts: BTreeMap::from([("bigBed".to_string(), 2)]),
                created: 100,
                updated: Some(200),
                source_url: "https://example.org/hg38/trackDb.txt".to_string(),
                source_checksum: None,
                assembly_id: 1,
                hub_id: 1,
                genome_id: 1,
            },
            data_type: "genomics".to_string(),
        });

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["type"], "genomics");
        assert_eq!(value["updated"], 200);
        assert_eq!(value["file_type"]["bigBed"], 2);
        assert_eq!(value["source"]["checksum"], "");
        assert_eq!(value["data"][0]["name"], "Composite");
        assert_eq!(value["configuration"]["comp"]["track"], "comp");
    }
}
