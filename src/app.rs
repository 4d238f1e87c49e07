use std::fmt;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::domain::{AssemblyAccession, HubUrl, Owner, resolve_data_type};
use crate::error::HubError;
use crate::fetch::Fetcher;
use crate::hierarchy::HierarchyResolver;
use crate::index::{Delivery, IndexFailure, IndexReport, Indexer};
use crate::lookup::Lookups;
use crate::model::{Hub, NewAssembly, NewHub, TrackdbUpdate};
use crate::parser::{ParseMode, Stanza, parse};
use crate::search::SearchSink;
use crate::store::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Start,
    HubFetched,
    GenomesFetched,
    TrackdbFetched,
    TracksResolved,
    Persisted,
    Indexed,
    Done,
    Rejected,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Start => "START",
            SubmissionState::HubFetched => "HUB_FETCHED",
            SubmissionState::GenomesFetched => "GENOMES_FETCHED",
            SubmissionState::TrackdbFetched => "TRACKDB_FETCHED",
            SubmissionState::TracksResolved => "TRACKS_RESOLVED",
            SubmissionState::Persisted => "PERSISTED",
            SubmissionState::Indexed => "INDEXED",
            SubmissionState::Done => "DONE",
            SubmissionState::Rejected => "REJECTED",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    pub message: String,
    pub hub_id: i64,
    pub hub_name: String,
    pub hub_url: String,
    pub data_type: String,
    pub trackdbs: Vec<TrackdbReport>,
    pub indexed: usize,
    pub index_failures: Vec<IndexFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackdbReport {
    pub id: i64,
    pub genome: String,
    pub source_url: String,
    pub tracks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub hub_id: i64,
    pub hub_url: String,
    pub trackdbs: Vec<i64>,
}

struct GenomesOutcome {
    trackdbs: Vec<TrackdbReport>,
    indexed: usize,
    index_failures: Vec<IndexFailure>,
}

pub struct App<R: Repository, F: Fetcher, S: SearchSink> {
    repo: R,
    fetcher: F,
    sink: S,
    index: String,
    lookups: Lookups,
}

impl<R: Repository, F: Fetcher, S: SearchSink> App<R, F, S> {
    /// Seeds the lookup tables and keeps the resulting snapshot for every
    /// later submission.
    pub fn initialize(
        repo: R,
        fetcher: F,
        sink: S,
        index: impl Into<String>,
    ) -> Result<Self, HubError> {
        let lookups = repo.seed_lookups()?;
        Ok(Self {
            repo,
            fetcher,
            sink,
            index: index.into(),
            lookups,
        })
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn lookups(&self) -> &Lookups {
        &self.lookups
    }

    fn indexer(&self) -> Indexer<'_, R, S> {
        Indexer::new(&self.repo, &self.sink, &self.index)
    }

    pub fn submit(
        &self,
        hub_url: &str,
        data_type: Option<&str>,
        owner: &Owner,
    ) -> Result<SubmissionReport, HubError> {
        let url: HubUrl = hub_url.parse()?;
        transition(SubmissionState::Start, &url);

        if let Err(err) = self.ensure_not_submitted(&url, owner) {
            transition(SubmissionState::Rejected, &url);
            return Err(err);
        }
        let data_type = resolve_data_type(data_type)?;
        let data_type_id = self.lookups.data_type(&data_type)?;

        let hub_info = parse(&self.fetcher.fetch(url.as_str())?, ParseMode::Hub)?
            .into_iter()
            .next()
            .unwrap_or_default();
        transition(SubmissionState::HubFetched, &url);
        let genomes_file = hub_info
            .get("genomesFile")
            .ok_or(HubError::MissingKey {
                mode: "hub",
                key: "genomesFile",
            })?
            .to_string();

        let hub = match self.repo.create_hub(new_hub(&hub_info, &url, owner, data_type_id)) {
            Ok(hub) => hub,
            Err(err) if err.is_duplicate_submission() => {
                // Lost a race against a concurrent submission of the same url.
                transition(SubmissionState::Rejected, &url);
                self.ensure_not_submitted(&url, owner)?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        info!(hub = %url, hub_id = hub.id, owner = owner.id, "hub created");

        match self.ingest_genomes(&url, &hub, &genomes_file) {
            Ok(GenomesOutcome {
                trackdbs,
                indexed,
                index_failures,
            }) => {
                transition(SubmissionState::Done, &url);
                Ok(SubmissionReport {
                    message: "The hub is submitted successfully".to_string(),
                    hub_id: hub.id,
                    hub_name: hub.name,
                    hub_url: hub.url,
                    data_type,
                    trackdbs,
                    indexed,
                    index_failures,
                })
            }
            Err(err) => {
                warn!(hub = %url, error = %err, "submission failed, rolling back");
                self.roll_back(&hub);
                Err(err)
            }
        }
    }

    fn ensure_not_submitted(&self, url: &HubUrl, owner: &Owner) -> Result<(), HubError> {
        match self.repo.find_hub_by_url(url.as_str())? {
            None => Ok(()),
            Some(existing) if existing.owner_id == owner.id => Err(HubError::AlreadySubmitted {
                url: url.to_string(),
            }),
            Some(existing) => Err(HubError::SubmittedByOther {
                url: url.to_string(),
                email: existing.owner_email,
            }),
        }
    }

    fn ingest_genomes(
        &self,
        url: &HubUrl,
        hub: &Hub,
        genomes_file: &str,
    ) -> Result<GenomesOutcome, HubError> {
        let genomes_url = url.resolve(genomes_file);
        let genomes = parse(&self.fetcher.fetch(&genomes_url)?, ParseMode::Genomes)?;
        transition(SubmissionState::GenomesFetched, url);
        debug!(hub = %url, genomes = genomes.len(), "genomes parsed");

        let indexer = self.indexer();
        let mut trackdbs = Vec::with_capacity(genomes.len());
        let mut indexed = 0;
        let mut index_failures = Vec::new();

        for genome_info in &genomes {
            let report = self.ingest_trackdb(url, hub, genome_info)?;
            match indexer.enqueue_and_deliver(report.id)? {
                Delivery::Delivered => {
                    indexed += 1;
                    debug!(
                        hub = %url,
                        genome = %report.genome,
                        state = %SubmissionState::Indexed,
                        "genome state"
                    );
                }
                Delivery::Failed(error) => index_failures.push(IndexFailure {
                    trackdb_id: report.id,
                    error,
                }),
            }
            trackdbs.push(report);
        }
        Ok(GenomesOutcome {
            trackdbs,
            indexed,
            index_failures,
        })
    }

    fn ingest_trackdb(
        &self,
        url: &HubUrl,
        hub: &Hub,
        genome_info: &Stanza,
    ) -> Result<TrackdbReport, HubError> {
        // Both keys are guaranteed by the genomes parser.
        let genome_name = genome_info.get("genome").unwrap_or_default();
        let trackdb_location = genome_info.get("trackDb").unwrap_or_default();

        let genome = self
            .repo
            .get_or_create_genome(genome_name, trackdb_location, hub.id)?;
        let assembly = self.repo.get_or_create_assembly(
            NewAssembly {
                name: genome_name.to_string(),
                accession: genome_name
                    .parse::<AssemblyAccession>()
                    .ok()
                    .map(|accession| accession.to_string()),
                long_name: genome_info.get("description").map(str::to_string),
                synonyms: None,
            },
            genome.id,
        )?;

        let trackdb_url = url.resolve(trackdb_location);
        let trackdb =
            self.repo
                .get_or_create_trackdb(&trackdb_url, hub.id, genome.id, assembly.id)?;

        let body = self.fetcher.fetch_text(&trackdb_url)?;
        let lines: Vec<&str> = body.lines().collect();
        let stanzas = parse(&lines, ParseMode::TrackDb)?;
        debug!(
            hub = %url,
            genome = genome_name,
            tracks = stanzas.len(),
            state = %SubmissionState::TrackdbFetched,
            "genome state"
        );

        let resolution =
            HierarchyResolver::new(&self.repo, &self.lookups, trackdb.id, &trackdb_url)
                .resolve(&stanzas)?;
        debug!(
            hub = %url,
            genome = genome_name,
            state = %SubmissionState::TracksResolved,
            "genome state"
        );

        let body_checksum = checksum(&body);
        self.repo.update_trackdb(
            trackdb.id,
            TrackdbUpdate {
                configuration: &resolution.configuration,
                data: &resolution.data,
                file_type_counts: &resolution.file_type_counts,
                checksum: Some(&body_checksum),
                updated: Utc::now().timestamp(),
            },
        )?;
        debug!(
            hub = %url,
            genome = genome_name,
            trackdb_id = trackdb.id,
            state = %SubmissionState::Persisted,
            "genome state"
        );

        Ok(TrackdbReport {
            id: trackdb.id,
            genome: genome.name,
            source_url: trackdb_url,
            tracks: resolution.data.len(),
        })
    }

    fn roll_back(&self, hub: &Hub) {
        let trackdb_ids = match self.repo.trackdb_ids_for_hub(hub.id) {
            Ok(ids) => ids,
            Err(err) => {
                error!(hub_id = hub.id, error = %err, "failed to list trackdbs for rollback");
                Vec::new()
            }
        };
        if let Err(err) = self.repo.delete_hub(hub.id) {
            error!(hub_id = hub.id, error = %err, "failed to roll back hub");
            return;
        }
        self.indexer().remove(&trackdb_ids);
    }

    /// Deletes a hub submitted by `owner` together with its trackdb
    /// documents, which allows the owner to submit it again.
    pub fn delete_hub(&self, hub_url: &str, owner: &Owner) -> Result<DeleteReport, HubError> {
        let hub = self
            .repo
            .find_hub_by_url(hub_url.trim())?
            .ok_or_else(|| HubError::HubNotFound(hub_url.to_string()))?;
        if hub.owner_id != owner.id {
            return Err(HubError::NotOwner { url: hub.url });
        }
        let trackdbs = self.repo.trackdb_ids_for_hub(hub.id)?;
        self.repo.delete_hub(hub.id)?;
        self.indexer().remove(&trackdbs);
        info!(hub = %hub.url, hub_id = hub.id, trackdbs = trackdbs.len(), "hub deleted");
        Ok(DeleteReport {
            hub_id: hub.id,
            hub_url: hub.url,
            trackdbs,
        })
    }

    /// Delivers every queued trackdb document again.
    pub fn reindex(&self) -> Result<IndexReport, HubError> {
        let report = self.indexer().drain()?;
        info!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "reindex finished"
        );
        Ok(report)
    }
}

fn new_hub(info: &Stanza, url: &HubUrl, owner: &Owner, data_type_id: i64) -> NewHub {
    NewHub {
        name: info.get("hub").unwrap_or_default().to_string(),
        short_label: info.get("shortLabel").map(str::to_string),
        long_label: info.get("longLabel").map(str::to_string),
        url: url.to_string(),
        description_url: info.get("descriptionUrl").map(str::to_string),
        email: info.get("email").map(str::to_string),
        owner_id: owner.id,
        owner_email: owner.email.clone(),
        species_taxon_id: None,
        data_type_id,
    }
}

fn transition(state: SubmissionState, url: &HubUrl) {
    info!(hub = %url, state = %state, "submission state");
}

fn checksum(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn state_names() {
        assert_eq!(SubmissionState::HubFetched.to_string(), "HUB_FETCHED");
        assert_eq!(SubmissionState::Rejected.to_string(), "REJECTED");
    }
}
