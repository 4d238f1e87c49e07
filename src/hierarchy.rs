use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::resolve_against;
use crate::error::HubError;
use crate::lookup::Lookups;
use crate::model::{NewTrack, TrackEntry};
use crate::parser::{Stanza, first_word};
use crate::store::Repository;

const MEMBERS: &str = "members";

/// Flat `data` list, nested `configuration` tree and per file type track
/// counts of one trackdb file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub data: Vec<TrackEntry>,
    pub configuration: Map<String, Value>,
    pub file_type_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone)]
struct SeenTrack {
    id: i64,
    owned: bool,
    parent: Option<String>,
}

/// Rebuilds the container → member → sub-member hierarchy of one trackdb
/// file. Parents must be declared before their members.
pub struct HierarchyResolver<'a, R: Repository + ?Sized> {
    repo: &'a R,
    lookups: &'a Lookups,
    trackdb_id: i64,
    source_url: &'a str,
    seen: HashMap<String, SeenTrack>,
    resolution: Resolution,
}

impl<'a, R: Repository + ?Sized> HierarchyResolver<'a, R> {
    pub fn new(repo: &'a R, lookups: &'a Lookups, trackdb_id: i64, source_url: &'a str) -> Self {
        Self {
            repo,
            lookups,
            trackdb_id,
            source_url,
            seen: HashMap::new(),
            resolution: Resolution::default(),
        }
    }

    pub fn resolve(mut self, stanzas: &[Stanza]) -> Result<Resolution, HubError> {
        for stanza in stanzas {
            self.add(stanza)?;
        }
        Ok(self.resolution)
    }

    fn add(&mut self, stanza: &Stanza) -> Result<(), HubError> {
        let Some(declaration) = stanza.get("track") else {
            return Ok(());
        };
        let name = first_word(declaration.trim_start()).to_string();

        let file_type_id = match stanza.get("type") {
            Some(raw) => match self.lookups.file_type(raw) {
                Some((id, file_type)) => {
                    *self
                        .resolution
                        .file_type_counts
                        .entry(file_type.to_string())
                        .or_default() += 1;
                    Some(id)
                }
                None => {
                    warn!(track = %name, file_type = raw, "unknown file type");
                    None
                }
            },
            None => None,
        };
        let visibility_id = self.lookups.visibility(stanza.get("visibility"))?;

        let track = self.repo.get_or_create_track(NewTrack {
            name: name.clone(),
            short_label: stanza.get("shortLabel").map(str::to_string),
            long_label: stanza.get("longLabel").map(str::to_string),
            big_data_url: stanza
                .get("bigDataUrl")
                .map(|url| resolve_against(self.source_url, url)),
            html: stanza.get("html").map(str::to_string),
            file_type_id,
            visibility_id,
            trackdb_id: self.trackdb_id,
        })?;
        // Data files shared with another trackdb keep that trackdb's links.
        let owned = track.trackdb_id == self.trackdb_id;
        if !owned {
            debug!(
                track = %name,
                owner_trackdb = track.trackdb_id,
                "data file already registered by another trackdb"
            );
        }

        self.resolution.data.push(TrackEntry {
            id: name.clone(),
            name: stanza.get("longLabel").map(str::to_string),
        });

        let mut node = stanza.to_json();
        if stanza.is_container() {
            node.remove("url");
            debug!(track = declaration, "container track");
            self.resolution
                .configuration
                .insert(declaration.to_string(), Value::Object(node.clone()));
        }

        let mut parent_name = None;
        if let Some(raw_parent) = stanza.get("parent") {
            let wanted = first_word(raw_parent.trim()).trim().to_string();
            match self.seen.get(&wanted).cloned() {
                Some(parent) => {
                    if owned && parent.owned {
                        self.repo.set_track_parent(track.id, Some(parent.id))?;
                    }
                    self.attach(declaration, &wanted, parent.parent.as_deref(), node);
                    parent_name = Some(wanted);
                }
                None => {
                    warn!(
                        trackdb = self.source_url,
                        track = %name,
                        parent = %wanted,
                        "parent track not declared before member, leaving it unlinked"
                    );
                    if owned {
                        self.repo.set_track_parent(track.id, None)?;
                    }
                }
            }
        }

        self.seen.insert(
            name,
            SeenTrack {
                id: track.id,
                owned,
                parent: parent_name,
            },
        );
        Ok(())
    }

    fn attach(
        &mut self,
        declaration: &str,
        parent: &str,
        grandparent: Option<&str>,
        node: Map<String, Value>,
    ) {
        let configuration = &mut self.resolution.configuration;
        match grandparent {
            None => {
                let attached = node_mut(configuration, parent)
                    .and_then(members_mut)
                    .map(|members| members.insert(declaration.to_string(), Value::Object(node)))
                    .is_some();
                if !attached {
                    warn!(
                        trackdb = self.source_url,
                        track = declaration,
                        parent,
                        "parent has no configuration node"
                    );
                }
            }
            Some(grandparent) => {
                // A member that is itself a top level container also keeps
                // its own members.
                if let Some(members) = node_mut(configuration, parent).and_then(members_mut) {
                    members.insert(declaration.to_string(), Value::Object(node.clone()));
                }
                let attached = node_mut(configuration, grandparent)
                    .and_then(members_mut)
                    .and_then(|members| node_mut(members, parent))
                    .and_then(members_mut)
                    .map(|members| members.insert(declaration.to_string(), Value::Object(node)))
                    .is_some();
                if !attached {
                    warn!(
                        trackdb = self.source_url,
                        track = declaration,
                        parent,
                        grandparent,
                        "grandparent has no configuration node for parent"
                    );
                }
            }
        }
    }
}

/// Looks a node up by its raw declaration, falling back to a key whose first
/// word is `name` (declarations may carry trailing settings).
fn node_mut<'m>(map: &'m mut Map<String, Value>, name: &str) -> Option<&'m mut Value> {
    let key = if map.contains_key(name) {
        name.to_string()
    } else {
        map.keys().find(|key| first_word(key) == name)?.clone()
    };
    map.get_mut(&key)
}

fn members_mut(node: &mut Value) -> Option<&mut Map<String, Value>> {
    node.as_object_mut()?
        .entry(MEMBERS)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}
