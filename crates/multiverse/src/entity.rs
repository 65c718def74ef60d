//! Typed records returned by the remote API.
//!
//! Only `id` and `name` are required on every entity; the remaining fields
//! default when the API omits them. A payload without the required fields is
//! rejected while decoding.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Character,
    Episode,
    Location,
}

impl EntityKind {
    /// Path segment of the kind's endpoints under the API base URL.
    pub fn path_segment(self) -> &'static str {
        match self {
            EntityKind::Character => "character",
            EntityKind::Episode => "episode",
            EntityKind::Location => "location",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// A record that can be listed, searched by name and rendered.
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> u32;

    fn name(&self) -> &str;

    /// One-line, kind-specific description used by text listings.
    fn summary(&self) -> String;

    /// Case-insensitive substring match; `needle` must already be lowercase.
    fn name_contains(&self, needle: &str) -> bool {
        self.name().to_lowercase().contains(needle)
    }
}

/// A `{ name, url }` reference to a related resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLink {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedLink {
    pub fn id(&self) -> Option<u32> {
        id_from_url(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub species: String,
    #[serde(default, rename = "type")]
    pub subtype: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub origin: NamedLink,
    #[serde(default)]
    pub location: NamedLink,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub episode: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created: String,
}

impl Entity for Character {
    const KIND: EntityKind = EntityKind::Character;

    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self) -> String {
        format!(
            "{} - {} (last seen: {})",
            or_unknown(&self.status),
            or_unknown(&self.species),
            or_unknown(&self.location.name)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub air_date: String,
    /// Season/episode code such as `S01E01`.
    #[serde(default, rename = "episode")]
    pub code: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created: String,
}

impl Entity for Episode {
    const KIND: EntityKind = EntityKind::Episode;

    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self) -> String {
        format!(
            "{} aired {} ({} characters)",
            or_unknown(&self.code),
            or_unknown(&self.air_date),
            self.characters.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: u32,
    pub name: String,
    #[serde(default, rename = "type")]
    pub location_type: String,
    #[serde(default)]
    pub dimension: String,
    #[serde(default)]
    pub residents: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created: String,
}

impl Entity for Location {
    const KIND: EntityKind = EntityKind::Location;

    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self) -> String {
        format!(
            "{} in {} ({} residents)",
            or_unknown(&self.location_type),
            or_unknown(&self.dimension),
            self.residents.len()
        )
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "Unknown"
    } else {
        value
    }
}

/// One server-side page of a collection endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(bound = "E: Entity")]
pub struct CollectionPage<E> {
    pub info: PageInfo,
    pub results: Vec<E>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
    pub pages: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
}

/// Item endpoints answer with a bare object when exactly one id is requested
/// and with an array otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Extracts the numeric id from the final path segment of a resource URL.
pub fn id_from_url(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}
