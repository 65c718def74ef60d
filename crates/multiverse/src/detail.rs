//! Detail pages: one entity plus the entities its relation fields point at.
//!
//! A detail page is addressed by the `id` query parameter. The id is
//! validated before any request is made.

use std::sync::Arc;

use crate::entity::{id_from_url, Character, Entity, Episode, Location, OneOrMany};
use crate::error::{ClientError, ClientResult};
use crate::fetcher::{decode, ApiUrls, ContentFetcher};

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDetail {
    pub character: Character,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationDetail {
    pub location: Location,
    pub residents: Vec<Character>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeDetail {
    pub episode: Episode,
    pub characters: Vec<Character>,
}

/// Extracts a numeric `id` from a raw query string such as `?id=42`.
pub fn parse_detail_id(query: &str) -> ClientResult<u32> {
    let raw = query
        .trim_start_matches('?')
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| *key == "id")
        .map(|(_, value)| value)
        .ok_or_else(|| ClientError::InvalidInput("missing id".to_string()))?;

    let value = urlencoding::decode(raw)
        .map_err(|_| ClientError::InvalidInput(format!("invalid id: {raw}")))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ClientError::InvalidInput("missing id".to_string()));
    }
    value
        .parse()
        .map_err(|_| ClientError::InvalidInput(format!("invalid id: {value}")))
}

pub struct DetailLoader {
    fetcher: Arc<dyn ContentFetcher>,
    urls: ApiUrls,
}

impl DetailLoader {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, urls: ApiUrls) -> Self {
        Self { fetcher, urls }
    }

    pub async fn character(&self, query: &str) -> ClientResult<CharacterDetail> {
        let id = parse_detail_id(query)?;
        let character: Character = self.item(id).await?;
        let episodes = self.related(&character.episode).await?;
        Ok(CharacterDetail {
            character,
            episodes,
        })
    }

    pub async fn location(&self, query: &str) -> ClientResult<LocationDetail> {
        let id = parse_detail_id(query)?;
        let location: Location = self.item(id).await?;
        let residents = self.related(&location.residents).await?;
        Ok(LocationDetail {
            location,
            residents,
        })
    }

    pub async fn episode(&self, query: &str) -> ClientResult<EpisodeDetail> {
        let id = parse_detail_id(query)?;
        let episode: Episode = self.item(id).await?;
        let characters = self.related(&episode.characters).await?;
        Ok(EpisodeDetail {
            episode,
            characters,
        })
    }

    /// Fetches one entity; a response that does not contain `id` is a
    /// not-found error.
    pub async fn item<E: Entity>(&self, id: u32) -> ClientResult<E> {
        let url = self.urls.item(E::KIND, id);
        let value = self.fetcher.fetch(&url).await?;
        let items: OneOrMany<E> = decode(&url, value)?;
        items
            .into_vec()
            .into_iter()
            .find(|item| item.id() == id)
            .ok_or(ClientError::NotFound { kind: E::KIND, id })
    }

    /// Batch-fetches the entities behind relation URLs, in response order.
    /// URLs without a numeric id are skipped; no ids means no request.
    pub async fn related<E: Entity>(&self, urls: &[String]) -> ClientResult<Vec<E>> {
        let ids: Vec<u32> = urls.iter().filter_map(|url| id_from_url(url)).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.urls.items(E::KIND, &ids);
        tracing::debug!(url = %url, count = ids.len(), "fetching related entities");
        let value = self.fetcher.fetch(&url).await?;
        let items: OneOrMany<E> = decode(&url, value)?;
        Ok(items.into_vec())
    }
}
