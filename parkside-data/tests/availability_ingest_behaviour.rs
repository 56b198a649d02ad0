//! Behavioural tests for availability ingestion.

use std::cell::RefCell;

use geo::Coord;
use parkside_core::test_support::MemoryParkingStore;
use parkside_core::{
    Facility, FacilityStore, NearestQuery, RankedResult, SqliteParkingStore, find_nearest,
};
use parkside_data::availability::{AvailabilityFeed, CarparkEntry, FeedItem, LotReading};
use parkside_data::test_support::StubFeedSource;
use parkside_data::{AvailabilityUpdater, UpdateError, UpdateResult};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Debug)]
enum Store {
    Sqlite(SqliteParkingStore),
    Memory(MemoryParkingStore),
}

#[derive(Debug, Default)]
struct IngestWorld {
    store: RefCell<Option<Store>>,
    feed: RefCell<Option<AvailabilityFeed>>,
    outcome: RefCell<Option<Result<UpdateResult, UpdateError>>>,
    results: RefCell<Vec<RankedResult>>,
}

impl IngestWorld {
    fn result(&self) -> UpdateResult {
        match self.outcome.borrow().as_ref() {
            Some(Ok(result)) => *result,
            Some(Err(err)) => panic!("ingestion failed: {err}"),
            None => panic!("ingestion has not run"),
        }
    }

    fn snapshot_count(&self) -> usize {
        match self.store.borrow().as_ref().expect("store prepared") {
            Store::Sqlite(store) => store.snapshot_count().expect("count snapshots"),
            Store::Memory(store) => store.snapshot_count(),
        }
    }
}

#[fixture]
fn world() -> IngestWorld {
    IngestWorld::default()
}

fn facility(id: &str, lat: f64, lon: f64, lots: u32) -> Facility {
    Facility::new(
        id,
        format!("{id} car park"),
        Coord { x: lon, y: lat },
        Coord { x: 0.0, y: 0.0 },
        lots,
    )
    .expect("valid facility")
}

fn unquote(value: &str) -> String {
    value.trim_matches('"').to_owned()
}

#[given("a SQLite store holding facilities F1 and F2")]
fn given_sqlite_store(world: &IngestWorld) {
    let mut store = SqliteParkingStore::open_in_memory().expect("open store");
    store
        .upsert_batch(&[
            facility("F1", 1.30, 103.80, 100),
            facility("F2", 1.35, 103.90, 50),
        ])
        .expect("seed facilities");
    world.store.replace(Some(Store::Sqlite(store)));
}

#[given("an in-memory store whose commits fail")]
fn given_failing_store(world: &IngestWorld) {
    let store =
        MemoryParkingStore::with_facilities([facility("F1", 1.30, 103.80, 100)]).failing_commits();
    world.store.replace(Some(Store::Memory(store)));
}

#[given("the feed is empty")]
fn given_empty_feed(world: &IngestWorld) {
    world.feed.replace(None);
}

#[given("the feed reports {id} with {lots} free lots")]
fn given_reading(world: &IngestWorld, id: String, lots: String) {
    let entry = CarparkEntry {
        carpark_number: Some(unquote(&id)),
        update_datetime: None,
        carpark_info: vec![LotReading {
            total_lots: None,
            lot_type: Some("C".to_owned()),
            lots_available: Some(unquote(&lots)),
        }],
    };
    let mut feed = world.feed.borrow_mut();
    let feed = feed.get_or_insert_with(|| AvailabilityFeed {
        items: vec![FeedItem {
            timestamp: Some("2024-01-15T10:30:00+08:00".to_owned()),
            carpark_data: Vec::new(),
        }],
    });
    feed.items[0].carpark_data.push(entry);
}

#[when("I ingest availability")]
fn when_ingest(world: &IngestWorld) {
    let source = world
        .feed
        .borrow()
        .clone()
        .map_or_else(StubFeedSource::empty, StubFeedSource::with_feed);
    let updater = AvailabilityUpdater::new(source);
    let outcome = match world.store.borrow_mut().as_mut().expect("store prepared") {
        Store::Sqlite(store) => updater.update_once(store),
        Store::Memory(store) => updater.update_once(store),
    };
    world.outcome.replace(Some(outcome));
}

#[when("I query the nearest facilities to {lat}, {lon}")]
fn when_query(world: &IngestWorld, lat: f64, lon: f64) {
    let query = NearestQuery::at(lat, lon).expect("valid query");
    let results = match world.store.borrow().as_ref().expect("store prepared") {
        Store::Sqlite(store) => find_nearest(store, &query),
        Store::Memory(store) => find_nearest(store, &query),
    }
    .expect("query succeeds");
    world.results.replace(results);
}

#[then("the run status is {status}")]
fn then_status(world: &IngestWorld, status: String) {
    let json = serde_json::to_value(world.result().status).expect("status serialises");
    assert_eq!(json, unquote(&status));
}

#[then("the counters are {processed} processed, {unknown} unknown and {errors} errors")]
fn then_counters(world: &IngestWorld, processed: usize, unknown: usize, errors: usize) {
    let result = world.result();
    assert_eq!(result.processed, processed, "processed");
    assert_eq!(result.skipped_unknown_facility, unknown, "unknown");
    assert_eq!(result.errors, errors, "errors");
}

#[then("no snapshots are stored")]
fn then_no_snapshots(world: &IngestWorld) {
    assert_eq!(world.snapshot_count(), 0);
}

#[then("facility {id} is not on file")]
fn then_not_on_file(world: &IngestWorld, id: String) {
    let id = unquote(&id);
    let exists = match world.store.borrow().as_ref().expect("store prepared") {
        Store::Sqlite(store) => store.exists(&id),
        Store::Memory(store) => store.exists(&id),
    }
    .expect("store read");
    assert!(!exists, "facility {id} should not have been created");
}

#[then("facility {id} has exactly one snapshot with {lots} free lots")]
fn then_single_snapshot(world: &IngestWorld, id: String, lots: i64) {
    let id = unquote(&id);
    assert_eq!(world.snapshot_count(), 1);
    let snapshot = match world.store.borrow().as_ref().expect("store prepared") {
        Store::Sqlite(store) => store.snapshot(&id).expect("store read"),
        Store::Memory(store) => store.snapshot(&id).cloned(),
    }
    .expect("snapshot stored");
    assert_eq!(snapshot.available_lots, lots);
}

#[then("the only result is {id} at the query point")]
fn then_only_result(world: &IngestWorld, id: String) {
    let results = world.results.borrow();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![unquote(&id).as_str()]);
    assert!(results[0].distance_km.abs() < 1e-6, "got {}", results[0].distance_km);
    assert_eq!(results[0].available_lots, 10);
}

#[then("the run fails with a store error")]
fn then_store_error(world: &IngestWorld) {
    let outcome = world.outcome.borrow();
    assert!(
        matches!(outcome.as_ref(), Some(Err(UpdateError::Store(_)))),
        "expected a store error, got {outcome:?}"
    );
}

#[scenario(path = "tests/features/availability_ingest.feature", index = 0)]
fn empty_feed(world: IngestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/availability_ingest.feature", index = 1)]
fn unknown_facility(world: IngestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/availability_ingest.feature", index = 2)]
fn invalid_counts(world: IngestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/availability_ingest.feature", index = 3)]
fn repeated_ingestion(world: IngestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/availability_ingest.feature", index = 4)]
fn end_to_end_query(world: IngestWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/availability_ingest.feature", index = 5)]
fn failed_commit(world: IngestWorld) {
    let _ = world;
}
