use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use camino::Utf8Path;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, ffi, params};
use serde::Serialize;
use serde_json::Map;

use crate::domain::LookupKind;
use crate::error::HubError;
use crate::lookup::Lookups;
use crate::model::{
    Assembly, Genome, Hub, IndexTask, NewAssembly, NewHub, NewTrack, Track, Trackdb,
    TrackdbDocumentSource, TrackdbUpdate,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS data_type (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS file_type (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS visibility (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS hub (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    short_label TEXT,
    long_label TEXT,
    url TEXT NOT NULL UNIQUE,
    description_url TEXT,
    email TEXT,
    owner_id INTEGER NOT NULL,
    owner_email TEXT NOT NULL,
    species_taxon_id INTEGER,
    data_type_id INTEGER NOT NULL REFERENCES data_type(id)
);
CREATE TABLE IF NOT EXISTS genome (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    trackdb_location TEXT NOT NULL,
    hub_id INTEGER NOT NULL REFERENCES hub(id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS assembly (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    accession TEXT,
    long_name TEXT,
    synonyms TEXT,
    genome_id INTEGER NOT NULL REFERENCES genome(id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS trackdb (
    id INTEGER PRIMARY KEY,
    public INTEGER NOT NULL DEFAULT 0,
    configuration TEXT NOT NULL DEFAULT '{}',
    data TEXT NOT NULL DEFAULT '[]',
    file_type_counts TEXT NOT NULL DEFAULT '{}',
    created INTEGER NOT NULL,
    updated INTEGER,
    source_url TEXT NOT NULL UNIQUE,
    source_checksum TEXT,
    assembly_id INTEGER NOT NULL REFERENCES assembly(id) ON DELETE CASCADE,
    hub_id INTEGER NOT NULL REFERENCES hub(id) ON DELETE CASCADE,
    genome_id INTEGER NOT NULL REFERENCES genome(id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS track (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    short_label TEXT,
    long_label TEXT,
    big_data_url TEXT,
    html TEXT,
    file_type_id INTEGER REFERENCES file_type(id),
    visibility_id INTEGER NOT NULL REFERENCES visibility(id),
    parent_id INTEGER REFERENCES track(id) ON DELETE SET NULL,
    trackdb_id INTEGER NOT NULL REFERENCES trackdb(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_track_big_data_url ON track(big_data_url);
CREATE INDEX IF NOT EXISTS idx_track_trackdb_name ON track(trackdb_id, name);
CREATE TABLE IF NOT EXISTS index_task (
    trackdb_id INTEGER PRIMARY KEY REFERENCES trackdb(id) ON DELETE CASCADE,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    enqueued_at INTEGER NOT NULL
);
"#;

const HUB_COLUMNS: &str = "id, name, short_label, long_label, url, description_url, email, \
     owner_id, owner_email, species_taxon_id, data_type_id";

const TRACKDB_COLUMNS: &str = "id, public, configuration, data, file_type_counts, created, \
     updated, source_url, source_checksum, assembly_id, hub_id, genome_id";

const TRACK_COLUMNS: &str = "id, name, short_label, long_label, big_data_url, html, \
     file_type_id, visibility_id, parent_id, trackdb_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Hub,
    Genome,
    Assembly,
    Trackdb,
    Track,
    DataType,
    FileType,
    Visibility,
    IndexTask,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Hub => "hub",
            Table::Genome => "genome",
            Table::Assembly => "assembly",
            Table::Trackdb => "trackdb",
            Table::Track => "track",
            Table::DataType => LookupKind::DataType.table(),
            Table::FileType => LookupKind::FileType.table(),
            Table::Visibility => LookupKind::Visibility.table(),
            Table::IndexTask => "index_task",
        }
    }
}

/// Storage verbs the ingestion pipeline depends on.
///
/// `get_or_create_*` return the existing row unmodified when the natural key
/// is already present.
pub trait Repository: Send + Sync {
    /// Inserts the missing lookup names in one batch per table and returns
    /// the resulting snapshot. Safe to call repeatedly.
    fn seed_lookups(&self) -> Result<Lookups, HubError>;

    fn find_hub_by_url(&self, url: &str) -> Result<Option<Hub>, HubError>;
    /// Fails with `AlreadySubmitted` when the url is taken.
    fn create_hub(&self, hub: NewHub) -> Result<Hub, HubError>;
    fn get_or_create_genome(
        &self,
        name: &str,
        trackdb_location: &str,
        hub_id: i64,
    ) -> Result<Genome, HubError>;
    fn get_or_create_assembly(
        &self,
        assembly: NewAssembly,
        genome_id: i64,
    ) -> Result<Assembly, HubError>;
    fn get_or_create_trackdb(
        &self,
        source_url: &str,
        hub_id: i64,
        genome_id: i64,
        assembly_id: i64,
    ) -> Result<Trackdb, HubError>;
    fn update_trackdb(&self, trackdb_id: i64, update: TrackdbUpdate<'_>) -> Result<(), HubError>;
    fn trackdb(&self, trackdb_id: i64) -> Result<Option<Trackdb>, HubError>;
    fn trackdb_ids_for_hub(&self, hub_id: i64) -> Result<Vec<i64>, HubError>;
    fn trackdb_document_source(&self, trackdb_id: i64)
    -> Result<TrackdbDocumentSource, HubError>;

    fn get_or_create_track(&self, track: NewTrack) -> Result<Track, HubError>;
    fn set_track_parent(&self, track_id: i64, parent_id: Option<i64>) -> Result<(), HubError>;
    fn tracks_for_trackdb(&self, trackdb_id: i64) -> Result<Vec<Track>, HubError>;

    /// Removes the hub with everything it owns. Genomes still referenced by
    /// another hub's trackdb are handed over to that hub.
    fn delete_hub(&self, hub_id: i64) -> Result<(), HubError>;

    fn enqueue_index_task(&self, trackdb_id: i64) -> Result<(), HubError>;
    fn pending_index_tasks(&self) -> Result<Vec<IndexTask>, HubError>;
    fn complete_index_task(&self, trackdb_id: i64) -> Result<(), HubError>;
    fn fail_index_task(&self, trackdb_id: i64, error: &str) -> Result<(), HubError>;

    fn count(&self, table: Table) -> Result<u64, HubError>;
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Utf8Path) -> Result<Self, HubError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent.as_std_path())
                    .map_err(|err| HubError::Filesystem(format!("create {parent}: {err}")))?;
            }
        }
        let conn = Connection::open(path.as_std_path())?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, HubError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, HubError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, HubError> {
        self.conn
            .lock()
            .map_err(|_| HubError::Storage("connection lock poisoned".to_string()))
    }
}

impl Repository for SqliteStore {
    fn seed_lookups(&self) -> Result<Lookups, HubError> {
        let mut conn = self.conn()?;
        let mut tables = Vec::with_capacity(LookupKind::ALL.len());
        for kind in LookupKind::ALL {
            let tx = conn.transaction()?;
            {
                let mut insert = tx.prepare(&format!(
                    "INSERT OR IGNORE INTO {} (name) VALUES (?1)",
                    kind.table()
                ))?;
                for name in kind.names() {
                    insert.execute(params![name])?;
                }
            }
            tx.commit()?;

            let mut select = conn.prepare(&format!("SELECT name, id FROM {}", kind.table()))?;
            let rows = select
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<Result<HashMap<_, _>, _>>()?;
            tables.push(rows);
        }
        let visibilities = tables.pop().unwrap_or_default();
        let file_types = tables.pop().unwrap_or_default();
        let data_types = tables.pop().unwrap_or_default();
        Ok(Lookups::new(data_types, file_types, visibilities))
    }

    fn find_hub_by_url(&self, url: &str) -> Result<Option<Hub>, HubError> {
        let conn = self.conn()?;
        let hub = conn
            .query_row(
                &format!("SELECT {HUB_COLUMNS} FROM hub WHERE url = ?1"),
                params![url],
                hub_from_row,
            )
            .optional()?;
        Ok(hub)
    }

    fn create_hub(&self, hub: NewHub) -> Result<Hub, HubError> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO hub (name, short_label, long_label, url, description_url, email, \
             owner_id, owner_email, species_taxon_id, data_type_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                hub.name,
                hub.short_label,
                hub.long_label,
                hub.url,
                hub.description_url,
                hub.email,
                hub.owner_id,
                hub.owner_email,
                hub.species_taxon_id,
                hub.data_type_id,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(HubError::AlreadySubmitted { url: hub.url });
            }
            Err(err) => return Err(err.into()),
        }
        Ok(Hub {
            id: conn.last_insert_rowid(),
            name: hub.name,
            short_label: hub.short_label,
            long_label: hub.long_label,
            url: hub.url,
            description_url: hub.description_url,
            email: hub.email,
            owner_id: hub.owner_id,
            owner_email: hub.owner_email,
            species_taxon_id: hub.species_taxon_id,
            data_type_id: hub.data_type_id,
        })
    }

    fn get_or_create_genome(
        &self,
        name: &str,
        trackdb_location: &str,
        hub_id: i64,
    ) -> Result<Genome, HubError> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT id, name, trackdb_location, hub_id FROM genome WHERE name = ?1",
                params![name],
                genome_from_row,
            )
            .optional()?;
        if let Some(genome) = existing {
            return Ok(genome);
        }
        conn.execute(
            "INSERT INTO genome (name, trackdb_location, hub_id) VALUES (?1, ?2, ?3)",
            params![name, trackdb_location, hub_id],
        )?;
        Ok(Genome {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            trackdb_location: trackdb_location.to_string(),
            hub_id,
        })
    }

    fn get_or_create_assembly(
        &self,
        assembly: NewAssembly,
        genome_id: i64,
    ) -> Result<Assembly, HubError> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT id, name, accession, long_name, synonyms, genome_id \
                 FROM assembly WHERE name = ?1",
                params![assembly.name],
                assembly_from_row,
            )
            .optional()?;
        if let Some(assembly) = existing {
            return Ok(assembly);
        }
        conn.execute(
            "INSERT INTO assembly (name, accession, long_name, synonyms, genome_id) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                assembly.name,
                assembly.accession,
                assembly.long_name,
                assembly.synonyms,
                genome_id,
            ],
        )?;
        Ok(Assembly {
            id: conn.last_insert_rowid(),
            name: assembly.name,
            accession: assembly.accession,
            long_name: assembly.long_name,
            synonyms: assembly.synonyms,
            genome_id,
        })
    }

    fn get_or_create_trackdb(
        &self,
        source_url: &str,
        hub_id: i64,
        genome_id: i64,
        assembly_id: i64,
    ) -> Result<Trackdb, HubError> {
        let conn = self.conn()?;
        if let Some(trackdb) = query_trackdb(&conn, "source_url = ?1", params![source_url])? {
            return Ok(trackdb);
        }
        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO trackdb (public, created, updated, source_url, assembly_id, hub_id, genome_id) \
             VALUES (1, ?1, ?1, ?2, ?3, ?4, ?5)",
            params![now, source_url, assembly_id, hub_id, genome_id],
        )?;
        Ok(Trackdb {
            id: conn.last_insert_rowid(),
            public: true,
            configuration: Map::new(),
            data: Vec::new(),
            file_type_counts: BTreeMap::new(),
            created: now,
            updated: Some(now),
            source_url: source_url.to_string(),
            source_checksum: None,
            assembly_id,
            hub_id,
            genome_id,
        })
    }

    fn update_trackdb(&self, trackdb_id: i64, update: TrackdbUpdate<'_>) -> Result<(), HubError> {
        let configuration = to_json_text(update.configuration)?;
        let data = to_json_text(update.data)?;
        let file_type_counts = to_json_text(update.file_type_counts)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE trackdb SET configuration = ?1, data = ?2, file_type_counts = ?3, \
             source_checksum = ?4, updated = ?5 WHERE id = ?6",
            params![
                configuration,
                data,
                file_type_counts,
                update.checksum,
                update.updated,
                trackdb_id,
            ],
        )?;
        if changed == 0 {
            return Err(HubError::TrackdbNotFound(trackdb_id));
        }
        Ok(())
    }

    fn trackdb(&self, trackdb_id: i64) -> Result<Option<Trackdb>, HubError> {
        let conn = self.conn()?;
        query_trackdb(&conn, "id = ?1", params![trackdb_id])
    }

    fn trackdb_ids_for_hub(&self, hub_id: i64) -> Result<Vec<i64>, HubError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM trackdb WHERE hub_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![hub_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn trackdb_document_source(
        &self,
        trackdb_id: i64,
    ) -> Result<TrackdbDocumentSource, HubError> {
        let conn = self.conn()?;
        let trackdb = query_trackdb(&conn, "id = ?1", params![trackdb_id])?
            .ok_or(HubError::TrackdbNotFound(trackdb_id))?;
        let data_type: String = conn.query_row(
            "SELECT dt.name FROM hub h JOIN data_type dt ON dt.id = h.data_type_id WHERE h.id = ?1",
            params![trackdb.hub_id],
            |row| row.get(0),
        )?;
        Ok(TrackdbDocumentSource { trackdb, data_type })
    }

    fn get_or_create_track(&self, track: NewTrack) -> Result<Track, HubError> {
        let conn = self.conn()?;
        let existing = match &track.big_data_url {
            Some(url) => conn
                .query_row(
                    &format!(
                        "SELECT {TRACK_COLUMNS} FROM track WHERE big_data_url = ?1 ORDER BY id LIMIT 1"
                    ),
                    params![url],
                    track_from_row,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!(
                        "SELECT {TRACK_COLUMNS} FROM track \
                         WHERE trackdb_id = ?1 AND name = ?2 AND big_data_url IS NULL \
                         ORDER BY id LIMIT 1"
                    ),
                    params![track.trackdb_id, track.name],
                    track_from_row,
                )
                .optional()?,
        };
        if let Some(existing) = existing {
            return Ok(existing);
        }
        conn.execute(
            "INSERT INTO track (name, short_label, long_label, big_data_url, html, file_type_id, \
             visibility_id, trackdb_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                track.name,
                track.short_label,
                track.long_label,
                track.big_data_url,
                track.html,
                track.file_type_id,
                track.visibility_id,
                track.trackdb_id,
            ],
        )?;
        Ok(Track {
            id: conn.last_insert_rowid(),
            name: track.name,
            short_label: track.short_label,
            long_label: track.long_label,
            big_data_url: track.big_data_url,
            html: track.html,
            file_type_id: track.file_type_id,
            visibility_id: track.visibility_id,
            parent_id: None,
            trackdb_id: track.trackdb_id,
        })
    }

    fn set_track_parent(&self, track_id: i64, parent_id: Option<i64>) -> Result<(), HubError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE track SET parent_id = ?1 WHERE id = ?2",
            params![parent_id, track_id],
        )?;
        Ok(())
    }

    fn tracks_for_trackdb(&self, trackdb_id: i64) -> Result<Vec<Track>, HubError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACK_COLUMNS} FROM track WHERE trackdb_id = ?1 ORDER BY id"
        ))?;
        let tracks = stmt
            .query_map(params![trackdb_id], track_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    fn delete_hub(&self, hub_id: i64) -> Result<(), HubError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM trackdb WHERE hub_id = ?1", params![hub_id])?;
        tx.execute(
            "UPDATE genome SET hub_id = \
                 (SELECT t.hub_id FROM trackdb t WHERE t.genome_id = genome.id ORDER BY t.id LIMIT 1) \
             WHERE hub_id = ?1 AND EXISTS (SELECT 1 FROM trackdb t WHERE t.genome_id = genome.id)",
            params![hub_id],
        )?;
        tx.execute("DELETE FROM hub WHERE id = ?1", params![hub_id])?;
        tx.commit()?;
        Ok(())
    }

    fn enqueue_index_task(&self, trackdb_id: i64) -> Result<(), HubError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO index_task (trackdb_id, enqueued_at) VALUES (?1, ?2) \
             ON CONFLICT(trackdb_id) DO UPDATE SET enqueued_at = excluded.enqueued_at",
            params![trackdb_id, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn pending_index_tasks(&self) -> Result<Vec<IndexTask>, HubError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT trackdb_id, attempts, last_error FROM index_task ORDER BY enqueued_at, trackdb_id",
        )?;
        let tasks = stmt
            .query_map([], |row| {
                let attempts: i64 = row.get(1)?;
                Ok(IndexTask {
                    trackdb_id: row.get(0)?,
                    attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
                    last_error: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn complete_index_task(&self, trackdb_id: i64) -> Result<(), HubError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM index_task WHERE trackdb_id = ?1",
            params![trackdb_id],
        )?;
        Ok(())
    }

    fn fail_index_task(&self, trackdb_id: i64, error: &str) -> Result<(), HubError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE index_task SET attempts = attempts + 1, last_error = ?1 WHERE trackdb_id = ?2",
            params![error, trackdb_id],
        )?;
        Ok(())
    }

    fn count(&self, table: Table) -> Result<u64, HubError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn to_json_text<T: Serialize + ?Sized>(value: &T) -> Result<String, HubError> {
    serde_json::to_string(value).map_err(|err| HubError::Storage(err.to_string()))
}

fn query_trackdb(
    conn: &Connection,
    condition: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Trackdb>, HubError> {
    let row = conn
        .query_row(
            &format!("SELECT {TRACKDB_COLUMNS} FROM trackdb WHERE {condition}"),
            params,
            |row| {
                Ok(TrackdbRow {
                    id: row.get(0)?,
                    public: row.get(1)?,
                    configuration: row.get(2)?,
                    data: row.get(3)?,
                    file_type_counts: row.get(4)?,
                    created: row.get(5)?,
                    updated: row.get(6)?,
                    source_url: row.get(7)?,
                    source_checksum: row.get(8)?,
                    assembly_id: row.get(9)?,
                    hub_id: row.get(10)?,
                    genome_id: row.get(11)?,
                })
            },
        )
        .optional()?;
    row.map(TrackdbRow::into_trackdb).transpose()
}

struct TrackdbRow {
    id: i64,
    public: bool,
    configuration: String,
    data: String,
    file_type_counts: String,
    created: i64,
    updated: Option<i64>,
    source_url: String,
    source_checksum: Option<String>,
    assembly_id: i64,
    hub_id: i64,
    genome_id: i64,
}

impl TrackdbRow {
    fn into_trackdb(self) -> Result<Trackdb, HubError> {
        let configuration = serde_json::from_str(&self.configuration)
            .map_err(|err| HubError::Storage(format!("trackdb {} configuration: {err}", self.id)))?;
        let data = serde_json::from_str(&self.data)
            .map_err(|err| HubError::Storage(format!("trackdb {} data: {err}", self.id)))?;
        let file_type_counts = serde_json::from_str(&self.file_type_counts).map_err(|err| {
            HubError::Storage(format!("trackdb {} file type counts: {err}", self.id))
        })?;
        Ok(Trackdb {
            id: self.id,
            public: self.public,
            configuration,
            data,
            file_type_counts,
            created: self.created,
            updated: self.updated,
            source_url: self.source_url,
            source_checksum: self.source_checksum,
            assembly_id: self.assembly_id,
            hub_id: self.hub_id,
            genome_id: self.genome_id,
        })
    }
}

fn hub_from_row(row: &Row<'_>) -> rusqlite::Result<Hub> {
    Ok(Hub {
        id: row.get(0)?,
        name: row.get(1)?,
        short_label: row.get(2)?,
        long_label: row.get(3)?,
        url: row.get(4)?,
        description_url: row.get(5)?,
        email: row.get(6)?,
        owner_id: row.get(7)?,
        owner_email: row.get(8)?,
        species_taxon_id: row.get(9)?,
        data_type_id: row.get(10)?,
    })
}

fn genome_from_row(row: &Row<'_>) -> rusqlite::Result<Genome> {
    Ok(Genome {
        id: row.get(0)?,
        name: row.get(1)?,
        trackdb_location: row.get(2)?,
        hub_id: row.get(3)?,
    })
}

fn assembly_from_row(row: &Row<'_>) -> rusqlite::Result<Assembly> {
    Ok(Assembly {
        id: row.get(0)?,
        name: row.get(1)?,
        accession: row.get(2)?,
        long_name: row.get(3)?,
        synonyms: row.get(4)?,
        genome_id: row.get(5)?,
    })
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        name: row.get(1)?,
        short_label: row.get(2)?,
        long_label: row.get(3)?,
        big_data_url: row.get(4)?,
        html: row.get(5)?,
        file_type_id: row.get(6)?,
        visibility_id: row.get(7)?,
        parent_id: row.get(8)?,
        trackdb_id: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DATA_TYPES, FILE_TYPES, VISIBILITIES};

    fn new_hub(url: &str, data_type_id: i64) -> NewHub {
        NewHub {
            name: "test_hub".to_string(),
            short_label: Some("Test".to_string()),
            long_label: None,
            url: url.to_string(),
            description_url: None,
            email: None,
            owner_id: 1,
            owner_email: "owner@example.org".to_string(),
            species_taxon_id: None,
            data_type_id,
        }
    }

    #[test]
    fn seeding_twice_keeps_one_row_per_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_lookups().unwrap();
        let lookups = store.seed_lookups().unwrap();

        assert_eq!(store.count(Table::DataType).unwrap(), DATA_TYPES.len() as u64);
        assert_eq!(store.count(Table::FileType).unwrap(), FILE_TYPES.len() as u64);
        assert_eq!(
            store.count(Table::Visibility).unwrap(),
            VISIBILITIES.len() as u64
        );
        assert_eq!(lookups.len(LookupKind::FileType), FILE_TYPES.len());
    }

    #[test]
    fn duplicate_hub_url_is_rejected_by_constraint() {
        let store = SqliteStore::open_in_memory().unwrap();
        let lookups = store.seed_lookups().unwrap();
        let data_type = lookups.data_type("genomics").unwrap();
        store
            .create_hub(new_hub("https://example.org/hub.txt", data_type))
            .unwrap();
        let err = store
            .create_hub(new_hub("https://example.org/hub.txt", data_type))
            .unwrap_err();
        assert!(err.is_duplicate_submission());
        assert_eq!(store.count(Table::Hub).unwrap(), 1);
    }

    #[test]
    fn other_constraint_failures_are_not_duplicates() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.seed_lookups().unwrap();
        let err = store
            .create_hub(new_hub("https://example.org/hub.txt", 9_999))
            .unwrap_err();
        assert!(!err.is_duplicate_submission());
        assert!(matches!(err, HubError::Storage(_)));
        assert_eq!(store.count(Table::Hub).unwrap(), 0);
    }

    #[test]
    fn trackdb_is_keyed_by_source_url() {
        let store = SqliteStore::open_in_memory().unwrap();
        let lookups = store.seed_lookups().unwrap();
        let hub = store
            .create_hub(new_hub(
                "https://example.org/hub.txt",
                lookups.data_type("genomics").unwrap(),
            ))
            .unwrap();
        let genome = store
            .get_or_create_genome("mm10", "mm10/trackDb.txt", hub.id)
            .unwrap();
        let assembly = store
            .get_or_create_assembly(
                NewAssembly {
                    name: "mm10".to_string(),
                    accession: None,
                    long_name: None,
                    synonyms: None,
                },
                genome.id,
            )
            .unwrap();
        let url = "https://example.org/mm10/trackDb.txt";
        let first = store
            .get_or_create_trackdb(url, hub.id, genome.id, assembly.id)
            .unwrap();
        let second = store
            .get_or_create_trackdb(url, hub.id, genome.id, assembly.id)
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.count(Table::Trackdb).unwrap(), 1);
    }
}
