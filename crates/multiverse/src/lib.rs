//! Browser-side client for the multiverse character/episode/location API.
//!
//! The crate provides:
//! - A content fetcher that turns HTTP GETs into typed records
//! - Collection search that materializes, filters and re-paginates a listing
//! - A list view controller switching between remote browsing and local search
//! - Detail page loaders and a static page server

pub mod config;
pub mod controller;
pub mod debounce;
pub mod detail;
pub mod entity;
pub mod error;
pub mod fetcher;
pub mod render;
pub mod search;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::MultiverseConfig;
pub use controller::{ListOptions, ListViewController, PageView, Renderer, ViewMode, ViewState};
pub use debounce::debounce;
pub use detail::{parse_detail_id, CharacterDetail, DetailLoader, EpisodeDetail, LocationDetail};
pub use entity::{Character, CollectionPage, Entity, EntityKind, Episode, Location};
pub use error::{ClientError, ClientResult, FetchError};
pub use fetcher::{ApiUrls, ContentFetcher, HttpFetcher};
pub use render::TextRenderer;
pub use search::{CollectionSearch, SearchResultSet, DEFAULT_PAGE_SIZE};
pub use server::Server;
