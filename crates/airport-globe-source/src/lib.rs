//! Airport Globe Source - Airport dataset adapter
//!
//! This crate provides:
//! - [`AirportDataSource`], which loads a JSON array of airports and keeps
//!   one pin entity per airport for the host viewer
//! - [`HttpFetcher`], the reqwest-backed dataset fetcher
//! - `MockFetcher` (feature `test-utils`) for tests

pub mod airports;
pub mod fetch;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use airports::AirportDataSource;
pub use fetch::{filename_from_url, HttpFetcher, DEFAULT_TIMEOUT};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockFetcher;
