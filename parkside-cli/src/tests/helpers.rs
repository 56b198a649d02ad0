//! Test helpers for composing CLI workspaces and stub feed sources.

use camino::{Utf8Path, Utf8PathBuf};
use parkside_data::availability::{AvailabilityFeed, FeedSource};
use parkside_data::test_support::StubFeedSource;
use tempfile::TempDir;

use crate::CliError;
use crate::update::{FeedSourceBuilder, UpdateConfig};

pub(super) const SAMPLE_CSV: &str = "\
car_park_no,address,x_coord,y_coord,car_park_type,car_park_decks
ACB,BLK 270/271 ALBERT CENTRE BASEMENT CAR PARK,30314.7936,31490.4942,BASEMENT CAR PARK,
HE12,BLK 78/81 REDHILL LANE,28947.5,29208.5,MULTI-STOREY CAR PARK,8
BAD1,BLK 1 NOWHERE,not-a-number,29208.5,SURFACE CAR PARK,0
";

/// A temporary directory addressed through UTF-8 paths.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write fixture");
}

/// Hands out a [`StubFeedSource`] serving a fixed payload.
#[derive(Debug, Clone)]
pub(super) struct StubFeedSourceBuilder {
    pub(super) feed: Option<AvailabilityFeed>,
}

impl FeedSourceBuilder for StubFeedSourceBuilder {
    fn build(&self, _config: &UpdateConfig) -> Result<Box<dyn FeedSource>, CliError> {
        let source = self
            .feed
            .clone()
            .map_or_else(StubFeedSource::empty, StubFeedSource::with_feed);
        Ok(Box::new(source))
    }
}

/// Feed reporting `lots` free lots for each facility id.
pub(super) fn feed_for(readings: &[(&str, &str)]) -> AvailabilityFeed {
    let data: Vec<String> = readings
        .iter()
        .map(|(id, lots)| {
            format!(r#"{{"carpark_number":"{id}","carpark_info":[{{"lots_available":"{lots}"}}]}}"#)
        })
        .collect();
    let json = format!(r#"{{"items":[{{"carpark_data":[{}]}}]}}"#, data.join(","));
    serde_json::from_str(&json).expect("feed fixture parses")
}
