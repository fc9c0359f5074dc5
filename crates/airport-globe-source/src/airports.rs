//! Airport data source
//!
//! Fetches a JSON array of airport records, turns every record with a known
//! altitude into a pin entity on the globe, and tells the host about it
//! through the `changed`, `loading` and `error` channels.
//!
//! Each load replaces the whole entity collection. Collection events are
//! suspended for the duration of the replace, so observers of the entity
//! collection see a single change per load.

use airport_globe_core::{
    AirportRecord, DataSource, DataSourceClock, DataSourceError, Ellipsoid, EntityCollection,
    Event, JsonFetcher, PinBuilder, PointEntity, Projector,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::fetch::filename_from_url;

#[derive(Debug)]
struct SourceState {
    name: String,
    /// Name given at construction; never replaced by a URL filename
    explicit_name: bool,
    /// Loads started and not yet settled; `is_loading` while nonzero
    loads_in_flight: u32,
    height_scale: f64,
    show: bool,
}

/// Data source rendering airports as pins
pub struct AirportDataSource {
    state: RwLock<SourceState>,
    entities: EntityCollection,
    fetcher: Arc<dyn JsonFetcher>,
    projector: Arc<dyn Projector>,
    pin_builder: PinBuilder,
    /// Serializes `load_from_url` calls
    url_gate: tokio::sync::Mutex<()>,
    /// Held while the entity collection is being replaced
    replace_lock: Mutex<()>,
    changed: Event<dyn DataSource, ()>,
    error: Event<dyn DataSource, DataSourceError>,
    loading: Event<dyn DataSource, bool>,
}

impl AirportDataSource {
    pub const DEFAULT_HEIGHT_SCALE: f64 = 1.0;

    /// Create a source. Without a `name`, the filename of the first loaded
    /// URL becomes the name.
    pub fn new(name: Option<String>, fetcher: Arc<dyn JsonFetcher>) -> Self {
        let explicit_name = name.is_some();
        Self {
            state: RwLock::new(SourceState {
                name: name.unwrap_or_default(),
                explicit_name,
                loads_in_flight: 0,
                height_scale: Self::DEFAULT_HEIGHT_SCALE,
                show: true,
            }),
            entities: EntityCollection::new(),
            fetcher,
            projector: Arc::new(Ellipsoid::WGS84),
            pin_builder: PinBuilder::default(),
            url_gate: tokio::sync::Mutex::new(()),
            replace_lock: Mutex::new(()),
            changed: Event::new(),
            error: Event::new(),
            loading: Event::new(),
        }
    }

    /// Use a different mapping from degrees to viewer coordinates
    pub fn with_projector(mut self, projector: Arc<dyn Projector>) -> Self {
        self.projector = projector;
        self
    }

    /// Use a different pin style
    pub fn with_pin_builder(mut self, pin_builder: PinBuilder) -> Self {
        self.pin_builder = pin_builder;
        self
    }

    pub fn height_scale(&self) -> f64 {
        self.read_state().height_scale
    }

    /// Set the marker scale applied by subsequent loads
    ///
    /// Fails with `InvalidArgument` unless `value` is finite and greater
    /// than zero.
    pub fn set_height_scale(&self, value: f64) -> Result<(), DataSourceError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(DataSourceError::invalid_argument(format!(
                "height_scale must be a positive number, got {}",
                value
            )));
        }
        self.write_state().height_scale = value;
        debug!(height_scale = value, "Height scale updated");
        Ok(())
    }

    pub fn set_show(&self, show: bool) {
        self.write_state().show = show;
    }

    /// Fetch the dataset at `url` and replace the entities with it
    ///
    /// Overlapping calls run one after another in call order. On failure the
    /// previous entities are kept, `error` is raised once and the error is
    /// returned. Returns the number of entities created.
    pub async fn load_from_url(&self, url: &str) -> Result<usize, DataSourceError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DataSourceError::invalid_argument("url is required"));
        }

        let _gate = self.url_gate.lock().await;

        self.update_name_from_url(url);
        let in_flight = InFlight::begin(self);

        info!(url = %url, "Loading airports");

        let result = match self.fetcher.fetch_json(url).await {
            Ok(document) => self.load(&document),
            Err(e) => Err(e.into()),
        };

        if let Err(err) = &result {
            warn!(url = %url, error = %err, "Failed to load airports");
            drop(in_flight);
            self.error.raise(self, err);
        }
        result
    }

    /// Replace the entities with the records in a parsed JSON document
    ///
    /// The document must be a JSON array. Elements that are not valid
    /// airport records are skipped with a warning.
    pub fn load(&self, document: &Value) -> Result<usize, DataSourceError> {
        let items = match document {
            Value::Array(items) => items,
            Value::Null => {
                return Err(DataSourceError::invalid_argument("records are required"));
            }
            other => {
                return Err(DataSourceError::invalid_argument(format!(
                    "expected a JSON array of airport records, got {}",
                    json_kind(other)
                )));
            }
        };

        let records: Vec<AirportRecord> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match AirportRecord::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(index = index, error = %e, "Skipping malformed airport record");
                    None
                }
            })
            .collect();

        Ok(self.load_records(&records))
    }

    /// Replace the entities with `records`
    ///
    /// Records with zero altitude and records repeating an earlier
    /// `airport_id` are skipped. Returns the number of entities created.
    pub fn load_records(&self, records: &[AirportRecord]) -> usize {
        let in_flight = InFlight::begin(self);

        let height_scale = self.height_scale();
        let mut created = 0;
        let mut no_data = 0;

        {
            let _replace = self.replace_lock.lock().unwrap_or_else(|e| e.into_inner());
            self.entities.suspend_events();
            self.entities.remove_all();

            for record in records {
                if !record.has_altitude() {
                    no_data += 1;
                    continue;
                }
                match self.entities.add(self.build_entity(record, height_scale)) {
                    Ok(()) => created += 1,
                    Err(e) => warn!(error = %e, "Skipping airport record"),
                }
            }
        }
        self.entities.resume_events();

        info!(
            name = %self.name(),
            entities = created,
            skipped_no_altitude = no_data,
            "Airports loaded"
        );

        self.changed.raise(self, &());
        drop(in_flight);
        created
    }

    fn build_entity(&self, record: &AirportRecord, height_scale: f64) -> PointEntity {
        PointEntity {
            id: record.airport_id.clone(),
            name: record.name.clone(),
            position: self
                .projector
                .project_degrees(record.longitude, record.latitude, 0.0),
            marker: self.pin_builder.build(height_scale),
        }
    }

    fn update_name_from_url(&self, url: &str) {
        let Some(filename) = filename_from_url(url) else {
            return;
        };

        let renamed = {
            let mut state = self.write_state();
            if state.explicit_name || state.name == filename {
                false
            } else {
                debug!(from = %state.name, to = %filename, "Data source renamed");
                state.name = filename;
                true
            }
        };

        if renamed {
            self.changed.raise(self, &());
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SourceState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SourceState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl DataSource for AirportDataSource {
    fn name(&self) -> String {
        self.read_state().name.clone()
    }

    fn clock(&self) -> Option<DataSourceClock> {
        None
    }

    fn entities(&self) -> &EntityCollection {
        &self.entities
    }

    fn is_loading(&self) -> bool {
        self.read_state().loads_in_flight > 0
    }

    fn show(&self) -> bool {
        self.read_state().show
    }

    fn update(&self, _time: DateTime<Utc>) -> bool {
        true
    }

    fn changed_event(&self) -> &Event<dyn DataSource, ()> {
        &self.changed
    }

    fn error_event(&self) -> &Event<dyn DataSource, DataSourceError> {
        &self.error
    }

    fn loading_event(&self) -> &Event<dyn DataSource, bool> {
        &self.loading
    }
}

/// Keeps the source loading until dropped
///
/// Nested and overlapping loads share one `loading(true)` / `loading(false)`
/// pair. Dropping during a panic settles the count without notifying.
struct InFlight<'a> {
    source: &'a AirportDataSource,
}

impl<'a> InFlight<'a> {
    fn begin(source: &'a AirportDataSource) -> Self {
        let first = {
            let mut state = source.write_state();
            state.loads_in_flight += 1;
            state.loads_in_flight == 1
        };
        if first {
            source.loading.raise(source, &true);
        }
        Self { source }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let last = {
            let mut state = self.source.write_state();
            state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
            state.loads_in_flight == 0
        };
        if last && !std::thread::panicking() {
            self.source.loading.raise(self.source, &false);
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFetcher;
    use airport_globe_core::{Cartesian3, Color, DataSourceCollection, EntityId, FetchError};
    use serde_json::json;
    use std::time::Duration;

    const URL: &str = "https://example.com/data/airports.json";

    fn dataset() -> Value {
        json!([
            { "airport_id": 1, "name": "Goroka", "latitude": -6.081689834590001, "longitude": 145.391998291, "altitude": 5282 },
            { "airport_id": 2, "name": "Madang", "latitude": -5.20707988739, "longitude": 145.789001465, "altitude": 20 },
            { "airport_id": 3, "name": "Mount Hagen", "latitude": -5.826789855957031, "longitude": 144.29600524902344, "altitude": 5388 }
        ])
    }

    fn source_with(fetcher: MockFetcher) -> (AirportDataSource, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        let source = AirportDataSource::new(None, fetcher.clone());
        (source, fetcher)
    }

    /// Records every notification as a string, in the order raised
    fn record_notifications(source: &AirportDataSource) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        source.changed_event().add_listener(move |s, _| {
            l.lock().unwrap().push(format!("changed {}", s.name()));
        });
        let l = log.clone();
        source.loading_event().add_listener(move |_, loading| {
            l.lock().unwrap().push(format!("loading {}", loading));
        });
        let l = log.clone();
        source.error_event().add_listener(move |_, err| {
            l.lock().unwrap().push(format!("error {}", err));
        });
        log
    }

    fn loading_flags(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with("loading"))
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn test_load_from_url_creates_one_entity_per_record() {
        let (source, _) = source_with(MockFetcher::new().with_json(URL, dataset()));

        let created = source.load_from_url(URL).await.unwrap();

        assert_eq!(created, 3);
        assert_eq!(
            source.entities().ids(),
            vec![EntityId::new("1"), EntityId::new("2"), EntityId::new("3")]
        );
        let goroka = source.entities().get_by_id(&EntityId::new("1")).unwrap();
        assert_eq!(goroka.name, "Goroka");
        assert_eq!(
            goroka.position,
            Ellipsoid::WGS84.project_degrees(145.391998291, -6.081689834590001, 0.0)
        );
        assert_eq!(goroka.marker.color, Color::ROYAL_BLUE);
        assert!(!source.is_loading());
    }

    #[test]
    fn test_zero_altitude_records_are_skipped() {
        let (source, _) = source_with(MockFetcher::new());

        let created = source
            .load(&json!([
                { "airport_id": 1, "name": "No data", "latitude": 0.0, "longitude": 0.0, "altitude": 0 },
                { "airport_id": 2, "name": "Has data", "latitude": 1.0, "longitude": 1.0, "altitude": 5 }
            ]))
            .unwrap();

        assert_eq!(created, 1);
        assert_eq!(source.entities().ids(), vec![EntityId::new("2")]);
    }

    #[test]
    fn test_load_notification_sequence() {
        let (source, _) = source_with(MockFetcher::new());
        let log = record_notifications(&source);
        assert!(!source.is_loading());

        let during = Arc::new(Mutex::new(None));
        let d = during.clone();
        source.loading_event().add_listener(move |s, loading| {
            if *loading {
                *d.lock().unwrap() = Some(s.is_loading());
            }
        });

        source.load(&dataset()).unwrap();

        assert_eq!(*during.lock().unwrap(), Some(true));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["loading true", "changed ", "loading false"]
        );
        assert!(!source.is_loading());
    }

    #[tokio::test]
    async fn test_load_from_url_notification_sequence() {
        let (source, _) = source_with(MockFetcher::new().with_json(URL, dataset()));
        let log = record_notifications(&source);

        source.load_from_url(URL).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "changed airports.json",
                "loading true",
                "changed airports.json",
                "loading false"
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_load_keeps_entities_and_raises_one_error() {
        let (source, fetcher) = source_with(MockFetcher::new().with_json(URL, dataset()));
        source.load_from_url(URL).await.unwrap();
        let before = source.entities().values();

        let log = record_notifications(&source);
        let missing = "https://example.com/data/airports.json?unreachable";
        let err = source.load_from_url(missing).await.unwrap_err();

        assert!(matches!(
            err,
            DataSourceError::Fetch(FetchError::Transport { .. })
        ));
        assert_eq!(source.entities().values(), before);
        assert!(!source.is_loading());

        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|e| e.starts_with("error")).count(), 1);
        assert_eq!(
            log.iter()
                .filter(|e| e.starts_with("loading"))
                .collect::<Vec<_>>(),
            vec!["loading true", "loading false"]
        );
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_http_status_failure_is_reported() {
        let (source, _) = source_with(MockFetcher::new().with_status(URL, 503));
        let log = record_notifications(&source);

        let err = source.load_from_url(URL).await.unwrap_err();

        assert!(matches!(
            err,
            DataSourceError::Fetch(FetchError::Status { status: 503, .. })
        ));
        assert_eq!(loading_flags(&log), vec!["loading true", "loading false"]);
        assert!(source.entities().is_empty());
    }

    #[tokio::test]
    async fn test_non_array_document_fails_like_a_fetch_error() {
        let (source, _) = source_with(MockFetcher::new().with_json(URL, json!({ "airports": [] })));
        let log = record_notifications(&source);

        let err = source.load_from_url(URL).await.unwrap_err();

        assert!(matches!(err, DataSourceError::InvalidArgument(_)));
        assert!(!source.is_loading());
        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|e| e.starts_with("error")).count(), 1);
    }

    #[test]
    fn test_second_load_replaces_first() {
        let (source, _) = source_with(MockFetcher::new());
        source.load(&dataset()).unwrap();

        source
            .load(&json!([
                { "airport_id": "LAX", "name": "Los Angeles", "latitude": 33.94, "longitude": -118.41, "altitude": 125 }
            ]))
            .unwrap();

        assert_eq!(source.entities().ids(), vec![EntityId::new("LAX")]);
    }

    #[test]
    fn test_one_collection_change_per_load() {
        let (source, _) = source_with(MockFetcher::new());
        source.load(&dataset()).unwrap();

        let changes = Arc::new(Mutex::new(Vec::new()));
        let c = changes.clone();
        source.entities().collection_changed().add_listener(move |_, change| {
            c.lock().unwrap().push(change.clone());
        });

        source.load(&dataset()).unwrap();

        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].added.len(), 3);
        assert_eq!(changes[0].removed.len(), 3);
    }

    #[test]
    fn test_height_scale_validation() {
        let (source, _) = source_with(MockFetcher::new());
        assert_eq!(source.height_scale(), 1.0);

        source.set_height_scale(2.5).unwrap();
        assert_eq!(source.height_scale(), 2.5);

        for invalid in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = source.set_height_scale(invalid).unwrap_err();
            assert!(matches!(err, DataSourceError::InvalidArgument(_)));
        }
        assert_eq!(source.height_scale(), 2.5);
    }

    #[test]
    fn test_height_scale_applies_to_markers() {
        let (source, _) = source_with(MockFetcher::new());
        source.set_height_scale(3.0).unwrap();
        source.load(&dataset()).unwrap();

        assert!(source
            .entities()
            .values()
            .iter()
            .all(|e| e.marker.scale == 3.0));
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected_without_request() {
        let (source, fetcher) = source_with(MockFetcher::new());
        let log = record_notifications(&source);

        for url in ["", "   "] {
            let err = source.load_from_url(url).await.unwrap_err();
            assert!(matches!(err, DataSourceError::InvalidArgument(_)));
        }

        assert!(fetcher.requests().is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_records_rejected() {
        let (source, _) = source_with(MockFetcher::new());
        let log = record_notifications(&source);

        let err = source.load(&Value::Null).unwrap_err();
        assert!(matches!(err, DataSourceError::InvalidArgument(_)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_and_duplicate_records_skipped() {
        let (source, _) = source_with(MockFetcher::new());

        let created = source
            .load(&json!([
                { "airport_id": 1, "name": "Goroka", "latitude": -6.08, "longitude": 145.39, "altitude": 5282 },
                { "airport_id": 2, "name": "Missing coordinates", "altitude": 10 },
                { "airport_id": "1", "name": "Goroka again", "latitude": -6.08, "longitude": 145.39, "altitude": 5282 },
                { "airport_id": 4, "name": "Wewak", "latitude": -3.58, "longitude": 143.67, "altitude": 19 }
            ]))
            .unwrap();

        assert_eq!(created, 2);
        assert_eq!(
            source.entities().ids(),
            vec![EntityId::new("1"), EntityId::new("4")]
        );
        assert_eq!(
            source.entities().get_by_id(&EntityId::new("1")).unwrap().name,
            "Goroka"
        );
    }

    #[tokio::test]
    async fn test_explicit_name_is_kept() {
        let fetcher = Arc::new(MockFetcher::new().with_json(URL, dataset()));
        let source = AirportDataSource::new(Some("Airports".to_string()), fetcher);
        let log = record_notifications(&source);

        source.load_from_url(URL).await.unwrap();

        assert_eq!(source.name(), "Airports");
        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|e| e.starts_with("changed")).count(), 1);
    }

    #[tokio::test]
    async fn test_same_filename_does_not_rename() {
        let (source, _) = source_with(
            MockFetcher::new()
                .with_json(URL, dataset())
                .with_json("https://mirror.example.org/airports.json", dataset()),
        );
        source.load_from_url(URL).await.unwrap();

        let log = record_notifications(&source);
        source
            .load_from_url("https://mirror.example.org/airports.json")
            .await
            .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|e| e.starts_with("changed")).count(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_loads_are_serialized() {
        let slow = "https://example.com/slow/airports.json";
        let fast = "https://example.com/fast/airports.json";
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_json(slow, dataset())
                .with_delay(slow, Duration::from_millis(100))
                .with_json(
                    fast,
                    json!([
                        { "airport_id": "LAX", "name": "Los Angeles", "latitude": 33.94, "longitude": -118.41, "altitude": 125 }
                    ]),
                ),
        );
        let source = AirportDataSource::new(None, fetcher.clone());

        let (first, second) = tokio::join!(source.load_from_url(slow), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            source.load_from_url(fast).await
        });

        assert_eq!(first.unwrap(), 3);
        assert_eq!(second.unwrap(), 1);
        assert_eq!(
            fetcher.log(),
            vec![
                format!("start {}", slow),
                format!("end {}", slow),
                format!("start {}", fast),
                format!("end {}", fast),
            ]
        );
        assert_eq!(source.entities().ids(), vec![EntityId::new("LAX")]);
    }

    #[tokio::test]
    async fn test_direct_load_during_url_fetch_keeps_loading() {
        let slow = "https://example.com/slow/airports.json";
        let (source, _) = source_with(
            MockFetcher::new()
                .with_json(slow, dataset())
                .with_delay(slow, Duration::from_millis(100)),
        );
        let log = record_notifications(&source);

        let (fetched, loading_mid_fetch) = tokio::join!(source.load_from_url(slow), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            source.load(&json!([])).unwrap();
            source.is_loading()
        });

        assert!(loading_mid_fetch);
        assert_eq!(fetched.unwrap(), 3);
        assert_eq!(loading_flags(&log), vec!["loading true", "loading false"]);
        assert!(!source.is_loading());
        assert_eq!(source.entities().len(), 3);
    }

    #[test]
    fn test_panicking_listener_does_not_leave_source_loading() {
        let (source, _) = source_with(MockFetcher::new());
        let handle = source
            .changed_event()
            .add_listener(|_, _| panic!("listener failed"));

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            source.load(&dataset())
        }));
        assert!(outcome.is_err());
        assert!(!source.is_loading());
        assert_eq!(source.entities().len(), 3);

        source.changed_event().remove_listener(handle);
        let log = record_notifications(&source);
        source.load(&dataset()).unwrap();
        assert_eq!(loading_flags(&log), vec!["loading true", "loading false"]);
    }

    #[test]
    fn test_injected_projector_and_pin_builder() {
        struct Flat;
        impl Projector for Flat {
            fn project_degrees(&self, longitude: f64, latitude: f64, height: f64) -> Cartesian3 {
                Cartesian3::new(longitude, latitude, height)
            }
        }

        let source = AirportDataSource::new(None, Arc::new(MockFetcher::new()))
            .with_projector(Arc::new(Flat))
            .with_pin_builder(PinBuilder::new(Color::from_bytes(255, 0, 0, 255), 32));
        source.load(&dataset()).unwrap();

        let goroka = source.entities().get_by_id(&EntityId::new("1")).unwrap();
        assert_eq!(
            goroka.position,
            Cartesian3::new(145.391998291, -6.081689834590001, 0.0)
        );
        assert_eq!(goroka.marker.size, 32);
        assert_eq!(goroka.marker.color, Color::from_bytes(255, 0, 0, 255));
    }

    #[tokio::test]
    async fn test_registered_with_host_registry() {
        let (source, _) = source_with(MockFetcher::new().with_json(URL, dataset()));
        let source = Arc::new(source);
        let registry = DataSourceCollection::new();
        registry.add(source.clone());

        source.load_from_url(URL).await.unwrap();

        let registered = registry.get_by_name("airports.json").unwrap();
        assert_eq!(registered.entities().len(), 3);
        assert!(registered.clock().is_none());
        assert!(registered.update(Utc::now()));
        assert!(registered.show());

        source.set_show(false);
        assert!(!registry.summaries()[0].show);
    }
}
