use serde::Serialize;
use tracing::{error, info};

use crate::error::HubError;
use crate::search::{SearchSink, TrackdbDocument};
use crate::store::Repository;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub delivered: Vec<i64>,
    pub failed: Vec<IndexFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexFailure {
    pub trackdb_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
}

/// Delivers queued trackdb documents to the search sink.
///
/// Storage errors propagate; search sink errors are logged, recorded on the
/// task and left for the next drain.
pub struct Indexer<'a, R: Repository + ?Sized, S: SearchSink + ?Sized> {
    repo: &'a R,
    sink: &'a S,
    index: &'a str,
}

impl<'a, R: Repository + ?Sized, S: SearchSink + ?Sized> Indexer<'a, R, S> {
    pub fn new(repo: &'a R, sink: &'a S, index: &'a str) -> Self {
        Self { repo, sink, index }
    }

    pub fn deliver(&self, trackdb_id: i64) -> Result<Delivery, HubError> {
        let document = TrackdbDocument::project(self.repo.trackdb_document_source(trackdb_id)?);
        match self.sink.upsert_document(self.index, trackdb_id, &document) {
            Ok(()) => {
                self.repo.complete_index_task(trackdb_id)?;
                info!(trackdb_id, index = self.index, "trackdb document updated");
                Ok(Delivery::Delivered)
            }
            Err(err) => {
                error!(
                    trackdb_id,
                    index = self.index,
                    error = %err,
                    "failed to update trackdb document, keeping it queued"
                );
                let message = err.to_string();
                self.repo.fail_index_task(trackdb_id, &message)?;
                Ok(Delivery::Failed(message))
            }
        }
    }

    pub fn enqueue_and_deliver(&self, trackdb_id: i64) -> Result<Delivery, HubError> {
        self.repo.enqueue_index_task(trackdb_id)?;
        self.deliver(trackdb_id)
    }

    pub fn drain(&self) -> Result<IndexReport, HubError> {
        let mut report = IndexReport::default();
        for task in self.repo.pending_index_tasks()? {
            match self.deliver(task.trackdb_id)? {
                Delivery::Delivered => report.delivered.push(task.trackdb_id),
                Delivery::Failed(error) => report.failed.push(IndexFailure {
                    trackdb_id: task.trackdb_id,
                    error,
                }),
            }
        }
        Ok(report)
    }

    /// Removes the documents of deleted trackdbs. Failures are only logged.
    pub fn remove(&self, trackdb_ids: &[i64]) {
        for &trackdb_id in trackdb_ids {
            if let Err(err) = self.sink.delete_document(self.index, trackdb_id) {
                error!(trackdb_id, index = self.index, error = %err, "failed to delete trackdb document");
            }
        }
    }
}
