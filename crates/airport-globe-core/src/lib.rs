//! Airport Globe Core - Entity model, geodesy and data-source registry
//!
//! This crate provides the foundational types for Airport Globe:
//! - Airport records as parsed from the input dataset
//! - Point entities, marker styles and the entity collection
//! - WGS84 geodetic to Cartesian conversion
//! - Multicast notification channels
//! - The data-source capability trait and the host-side registry

pub mod airport;
pub mod data_source;
pub mod entity;
pub mod event;
pub mod fetch;
pub mod geodesy;
pub mod marker;

pub use airport::AirportRecord;
pub use data_source::{
    DataSource, DataSourceClock, DataSourceCollection, DataSourceError, DataSourceSummary,
};
pub use entity::{CollectionChange, EntityCollection, EntityError, EntityId, PointEntity};
pub use event::{Event, ListenerHandle};
pub use fetch::{FetchError, JsonFetcher};
pub use geodesy::{Cartesian3, Cartographic, Ellipsoid, Projector};
pub use marker::{Color, ColorError, Marker, PinBuilder, VerticalOrigin};
