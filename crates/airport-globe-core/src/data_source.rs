//! Data sources and the host-side registry that renders them
//!
//! A [`DataSource`] turns an external dataset into entities. The host owns a
//! [`DataSourceCollection`], enumerates its sources, draws their entity
//! collections and listens to their notification channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

use crate::entity::EntityCollection;
use crate::event::Event;
use crate::fetch::FetchError;

#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl DataSourceError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Time span covered by a time-dynamic source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceClock {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub current: DateTime<Utc>,
    /// Seconds of data time per second of wall time
    pub multiplier: f64,
}

/// Capabilities a host needs to enumerate, draw and manage a source
pub trait DataSource: Send + Sync {
    fn name(&self) -> String;

    /// `None` for sources with no temporal dimension
    fn clock(&self) -> Option<DataSourceClock>;

    fn entities(&self) -> &EntityCollection;

    fn is_loading(&self) -> bool;

    fn show(&self) -> bool;

    /// Advance the source to `time`. Returns true when the source is ready
    /// to be drawn at that time.
    fn update(&self, time: DateTime<Utc>) -> bool;

    /// Raised when the entity collection or the name changes
    fn changed_event(&self) -> &Event<dyn DataSource, ()>;

    /// Raised when loading fails
    fn error_event(&self) -> &Event<dyn DataSource, DataSourceError>;

    /// Raised when `is_loading` changes, with the new value
    fn loading_event(&self) -> &Event<dyn DataSource, bool>;
}

/// Summary of a registered source, suitable for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceSummary {
    pub name: String,
    pub is_loading: bool,
    pub show: bool,
    pub entity_count: usize,
}

impl DataSourceSummary {
    pub fn of(source: &dyn DataSource) -> Self {
        Self {
            name: source.name(),
            is_loading: source.is_loading(),
            show: source.show(),
            entity_count: source.entities().len(),
        }
    }
}

/// Ordered registry of the data sources a host viewer renders
#[derive(Default)]
pub struct DataSourceCollection {
    sources: RwLock<Vec<Arc<dyn DataSource>>>,
    data_source_added: Event<DataSourceCollection, Arc<dyn DataSource>>,
    data_source_removed: Event<DataSourceCollection, Arc<dyn DataSource>>,
}

impl DataSourceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_source_added(&self) -> &Event<DataSourceCollection, Arc<dyn DataSource>> {
        &self.data_source_added
    }

    pub fn data_source_removed(&self) -> &Event<DataSourceCollection, Arc<dyn DataSource>> {
        &self.data_source_removed
    }

    /// Register a source. Returns false if this instance is already registered.
    pub fn add(&self, source: Arc<dyn DataSource>) -> bool {
        {
            let mut sources = self.sources.write().unwrap_or_else(|e| e.into_inner());
            if sources.iter().any(|s| Arc::ptr_eq(s, &source)) {
                return false;
            }
            sources.push(source.clone());
        }

        debug!(name = %source.name(), "Data source registered");
        self.data_source_added.raise(self, &source);
        true
    }

    /// Unregister a source instance. Returns false if it was not registered.
    pub fn remove(&self, source: &Arc<dyn DataSource>) -> bool {
        let removed = {
            let mut sources = self.sources.write().unwrap_or_else(|e| e.into_inner());
            match sources.iter().position(|s| Arc::ptr_eq(s, source)) {
                Some(i) => sources.remove(i),
                None => return false,
            }
        };

        debug!(name = %removed.name(), "Data source removed");
        self.data_source_removed.raise(self, &removed);
        true
    }

    /// Unregister the first source with the given name
    pub fn remove_by_name(&self, name: &str) -> bool {
        match self.get_by_name(name) {
            Some(source) => self.remove(&source),
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<Arc<dyn DataSource>> {
        self.sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|s| s.name() == name)
            .cloned()
    }

    pub fn contains(&self, source: &Arc<dyn DataSource>) -> bool {
        self.sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|s| Arc::ptr_eq(s, source))
    }

    pub fn len(&self) -> usize {
        self.sources.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of registered sources in registration order
    pub fn sources(&self) -> Vec<Arc<dyn DataSource>> {
        self.sources.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn summaries(&self) -> Vec<DataSourceSummary> {
        self.sources()
            .iter()
            .map(|s| DataSourceSummary::of(s.as_ref()))
            .collect()
    }
}
