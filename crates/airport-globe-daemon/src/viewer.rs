//! Headless globe viewer
//!
//! Owns the data-source registry and "renders" by bumping a revision
//! counter whenever a registered source changes. Browser globe clients poll
//! the revision through the API and redraw when it moves.

use airport_globe_core::{DataSource, DataSourceCollection, ListenerHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

struct Attached {
    source: Arc<dyn DataSource>,
    changed: ListenerHandle,
    loading: ListenerHandle,
    error: ListenerHandle,
}

pub struct Viewer {
    data_sources: DataSourceCollection,
    revision: Arc<AtomicU64>,
}

impl Viewer {
    pub fn new() -> Self {
        let data_sources = DataSourceCollection::new();
        let revision = Arc::new(AtomicU64::new(0));
        let attached: Arc<Mutex<Vec<Attached>>> = Arc::new(Mutex::new(Vec::new()));

        let rev = revision.clone();
        let att = attached.clone();
        data_sources.data_source_added().add_listener(move |_, source| {
            let attachment = attach(source.clone(), rev.clone());
            att.lock().unwrap_or_else(|e| e.into_inner()).push(attachment);
            rev.fetch_add(1, Ordering::SeqCst);
        });

        let rev = revision.clone();
        data_sources.data_source_removed().add_listener(move |_, source| {
            let mut attached = attached.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(i) = attached.iter().position(|a| Arc::ptr_eq(&a.source, source)) {
                let a = attached.remove(i);
                a.source.changed_event().remove_listener(a.changed);
                a.source.loading_event().remove_listener(a.loading);
                a.source.error_event().remove_listener(a.error);
            }
            rev.fetch_add(1, Ordering::SeqCst);
        });

        Self {
            data_sources,
            revision,
        }
    }

    pub fn data_sources(&self) -> &DataSourceCollection {
        &self.data_sources
    }

    /// Incremented on every change that requires a redraw
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

fn attach(source: Arc<dyn DataSource>, revision: Arc<AtomicU64>) -> Attached {
    let changed = source.changed_event().add_listener(move |source, _| {
        let rev = revision.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            source = %source.name(),
            entities = source.entities().len(),
            revision = rev,
            "Rendering data source"
        );
    });

    let loading = source.loading_event().add_listener(|source, is_loading| {
        debug!(source = %source.name(), is_loading = *is_loading, "Data source loading state");
    });

    let error = source.error_event().add_listener(|source, err| {
        warn!(source = %source.name(), error = %err, "Data source failed to load");
    });

    Attached {
        source,
        changed,
        loading,
        error,
    }
}
