use std::collections::BTreeMap;

use trackhub_registry::domain::LookupKind;
use trackhub_registry::hierarchy::HierarchyResolver;
use trackhub_registry::lookup::Lookups;
use trackhub_registry::model::{NewAssembly, NewHub, Trackdb};
use trackhub_registry::parser::{ParseMode, Stanza, parse};
use trackhub_registry::store::{Repository, SqliteStore, Table};

const SOURCE_URL: &str = "https://example.org/hub/hg38/trackDb.txt";

fn fixture() -> (SqliteStore, Lookups, Trackdb) {
    let store = SqliteStore::open_in_memory().unwrap();
    let lookups = store.seed_lookups().unwrap();
    let hub = store
        .create_hub(NewHub {
            name: "fixture".to_string(),
            short_label: None,
            long_label: None,
            url: "https://example.org/hub/hub.txt".to_string(),
            description_url: None,
            email: None,
            owner_id: 1,
            owner_email: "owner@example.org".to_string(),
            species_taxon_id: None,
            data_type_id: lookups.data_type("genomics").unwrap(),
        })
        .unwrap();
    let genome = store
        .get_or_create_genome("hg38", "hg38/trackDb.txt", hub.id)
        .unwrap();
    let assembly = store
        .get_or_create_assembly(
            NewAssembly {
                name: "hg38".to_string(),
                accession: None,
                long_name: None,
                synonyms: None,
            },
            genome.id,
        )
        .unwrap();
    let trackdb = store
        .get_or_create_trackdb(SOURCE_URL, hub.id, genome.id, assembly.id)
        .unwrap();
    (store, lookups, trackdb)
}

fn stanzas(text: &str) -> Vec<Stanza> {
    let lines: Vec<&str> = text.lines().collect();
    parse(&lines, ParseMode::TrackDb).unwrap()
}

fn track_id(store: &SqliteStore, trackdb: &Trackdb, name: &str) -> i64 {
    store
        .tracks_for_trackdb(trackdb.id)
        .unwrap()
        .into_iter()
        .find(|track| track.name == name)
        .map(|track| track.id)
        .unwrap()
}

#[test]
fn composite_with_two_members() {
    let (store, lookups, trackdb) = fixture();
    let text = "\
track comp
compositeTrack on
shortLabel Comp
longLabel Composite track

track childA
parent comp
bigDataUrl a.bb
type bigBed 6 +
longLabel Child A

track childB
parent comp on
bigDataUrl b.bb
type bigBed 6 +
longLabel Child B
";
    let resolution = HierarchyResolver::new(&store, &lookups, trackdb.id, SOURCE_URL)
        .resolve(&stanzas(text))
        .unwrap();

    let keys: Vec<&String> = resolution.configuration.keys().collect();
    assert_eq!(keys, vec!["comp"]);
    let members = resolution.configuration["comp"]["members"]
        .as_object()
        .unwrap();
    let member_keys: Vec<&String> = members.keys().collect();
    assert_eq!(member_keys, vec!["childA", "childB"]);
    assert_eq!(members["childA"]["bigDataUrl"], "a.bb");

    let ids: Vec<&str> = resolution
        .data
        .iter()
        .map(|entry| entry.id.as_str())
        .collect();
    assert_eq!(ids, vec!["comp", "childA", "childB"]);
    assert_eq!(resolution.data[1].name.as_deref(), Some("Child A"));
    assert_eq!(
        resolution.file_type_counts,
        BTreeMap::from([("bigBed".to_string(), 2)])
    );

    let comp = track_id(&store, &trackdb, "comp");
    let tracks = store.tracks_for_trackdb(trackdb.id).unwrap();
    assert_eq!(tracks.len(), 3);
    assert!(
        tracks
            .iter()
            .filter(|track| track.name != "comp")
            .all(|track| track.parent_id == Some(comp))
    );
    let big_bed = lookups.id(LookupKind::FileType, "bigBed");
    assert!(big_bed.is_some());
    assert_eq!(tracks[1].file_type_id, big_bed);
    assert_eq!(tracks[0].file_type_id, None);
}

#[test]
fn three_levels_nest_under_grandparent() {
    let (store, lookups, trackdb) = fixture();
    let text = "\
track super1
superTrack on show
shortLabel Super

track comp1
parent super1
compositeTrack on
shortLabel Comp

track leaf1
parent comp1 on
bigDataUrl leaf.bw
type bigWig
visibility full
";
    let resolution = HierarchyResolver::new(&store, &lookups, trackdb.id, SOURCE_URL)
        .resolve(&stanzas(text))
        .unwrap();

    let leaf = &resolution.configuration["super1"]["members"]["comp1"]["members"]["leaf1"];
    assert_eq!(leaf["bigDataUrl"], "leaf.bw");
    assert_eq!(leaf["parent"], "comp1 on");
    // comp1 is a container too, so it also has its own top level node.
    assert_eq!(
        resolution.configuration["comp1"]["members"]["leaf1"]["type"],
        "bigWig"
    );
    assert_eq!(resolution.data.len(), 3);

    let super1 = track_id(&store, &trackdb, "super1");
    let comp1 = track_id(&store, &trackdb, "comp1");
    let tracks = store.tracks_for_trackdb(trackdb.id).unwrap();
    let leaf_track = tracks.iter().find(|track| track.name == "leaf1").unwrap();
    assert_eq!(leaf_track.parent_id, Some(comp1));
    assert_eq!(
        leaf_track.visibility_id,
        lookups.id(LookupKind::Visibility, "full").unwrap()
    );
    let comp_track = tracks.iter().find(|track| track.name == "comp1").unwrap();
    assert_eq!(comp_track.parent_id, Some(super1));
}

#[test]
fn unresolved_parent_is_left_unlinked() {
    let (store, lookups, trackdb) = fixture();
    let text = "\
track orphan
parent ghost
bigDataUrl orphan.bb
type bigBed

track standalone
type bigWig
bigDataUrl standalone.bw
";
    let resolution = HierarchyResolver::new(&store, &lookups, trackdb.id, SOURCE_URL)
        .resolve(&stanzas(text))
        .unwrap();

    assert!(resolution.configuration.is_empty());
    assert_eq!(resolution.data.len(), 2);
    let tracks = store.tracks_for_trackdb(trackdb.id).unwrap();
    assert!(tracks.iter().all(|track| track.parent_id.is_none()));
}

#[test]
fn container_node_drops_url_key() {
    let (store, lookups, trackdb) = fixture();
    let text = "\
track grp
container multiWig
url https://example.org/about/$$
type bigWig
";
    let resolution = HierarchyResolver::new(&store, &lookups, trackdb.id, SOURCE_URL)
        .resolve(&stanzas(text))
        .unwrap();
    let node = resolution.configuration["grp"].as_object().unwrap();
    assert!(!node.contains_key("url"));
    assert_eq!(node["container"], "multiWig");
}

#[test]
fn defaults_for_missing_type_and_visibility() {
    let (store, lookups, trackdb) = fixture();
    let text = "\
track first
type bigBed 9 .
bigDataUrl first.bb

track second
type narrowPeak
bigDataUrl second.np

track third
bigDataUrl third.bam
visibility sideways
";
    let resolution = HierarchyResolver::new(&store, &lookups, trackdb.id, SOURCE_URL)
        .resolve(&stanzas(text))
        .unwrap();
    assert_eq!(
        resolution.file_type_counts,
        BTreeMap::from([("bigBed".to_string(), 1)])
    );

    let tracks = store.tracks_for_trackdb(trackdb.id).unwrap();
    assert_eq!(
        tracks[0].big_data_url.as_deref(),
        Some("https://example.org/hub/hg38/first.bb")
    );
    let hide = lookups.id(LookupKind::Visibility, "hide").unwrap();
    assert_eq!(
        tracks[0].file_type_id,
        lookups.id(LookupKind::FileType, "bigBed")
    );
    assert_eq!(tracks[1].file_type_id, None);
    assert_eq!(tracks[2].file_type_id, None);
    assert!(tracks.iter().all(|track| track.visibility_id == hide));
}

#[test]
fn resolving_twice_reuses_tracks() {
    let (store, lookups, trackdb) = fixture();
    let text = "\
track comp
compositeTrack on

track child
parent comp
bigDataUrl child.bb
type bigBed
";
    let first = HierarchyResolver::new(&store, &lookups, trackdb.id, SOURCE_URL)
        .resolve(&stanzas(text))
        .unwrap();
    let second = HierarchyResolver::new(&store, &lookups, trackdb.id, SOURCE_URL)
        .resolve(&stanzas(text))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(store.count(Table::Track).unwrap(), 2);
}
