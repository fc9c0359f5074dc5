//! Application state management

use airport_globe_core::{DataSourceError, JsonFetcher};
use airport_globe_source::{AirportDataSource, HttpFetcher};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::viewer::Viewer;

/// Shared application state
pub struct AppState {
    /// Headless viewer and its data-source registry
    pub viewer: Viewer,
    /// The airport data source registered with the viewer
    pub airports: Arc<AirportDataSource>,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create state with the reqwest fetcher described by `config`
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let mut fetcher =
            HttpFetcher::new(config.fetch_timeout()).context("Failed to create HTTP client")?;
        if let Some(base) = &config.dataset.base_url {
            let base = base
                .parse()
                .with_context(|| format!("Invalid [dataset] base_url '{}'", base))?;
            fetcher = fetcher.with_base_url(base);
        }

        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create state around any fetcher
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn JsonFetcher>) -> Result<Arc<Self>> {
        let airports = AirportDataSource::new(config.dataset.name.clone(), fetcher)
            .with_pin_builder(config.pin_builder()?);
        airports
            .set_height_scale(config.marker.height_scale)
            .context("Invalid [marker] height_scale")?;
        let airports = Arc::new(airports);

        let viewer = Viewer::new();
        viewer.data_sources().add(airports.clone());

        Ok(Arc::new(Self {
            viewer,
            airports,
            config,
        }))
    }

    /// Load `url`, or the configured dataset URL when `None`
    pub async fn reload(&self, url: Option<&str>) -> Result<usize, DataSourceError> {
        let url = url.unwrap_or(&self.config.dataset.url);
        let count = self.airports.load_from_url(url).await?;
        info!(url = %url, entities = count, "Dataset applied");
        Ok(count)
    }
}
