//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::controller::{PageView, Renderer, ViewMode};
use crate::entity::Entity;
use crate::error::FetchError;
use crate::fetcher::{page_url, ContentFetcher};

#[derive(Clone)]
struct Scripted {
    result: Result<Value, FetchError>,
    delay: Duration,
    gate: Option<Arc<Notify>>,
}

/// Fetcher answering from a per-URL script.
///
/// Responses can be delayed (on the tokio clock) or held until a gate is
/// released, which lets tests choose the order in which fetches complete.
/// Unscripted URLs answer with status 404.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    script: Mutex<HashMap<String, Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, url: impl Into<String>, body: Value) {
        self.insert(url.into(), Ok(body), Duration::ZERO, None);
    }

    pub(crate) fn respond_after(&self, url: impl Into<String>, body: Value, delay: Duration) {
        self.insert(url.into(), Ok(body), delay, None);
    }

    pub(crate) fn fail(&self, url: impl Into<String>) {
        let url = url.into();
        let error = FetchError::Status {
            url: url.clone(),
            status: 500,
        };
        self.insert(url, Err(error), Duration::ZERO, None);
    }

    /// Holds the response for `url` until the returned gate is notified.
    pub(crate) fn respond_gated(&self, url: impl Into<String>, body: Value) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.insert(url.into(), Ok(body), Duration::ZERO, Some(gate.clone()));
        gate
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    fn insert(
        &self,
        url: String,
        result: Result<Value, FetchError>,
        delay: Duration,
        gate: Option<Arc<Notify>>,
    ) {
        self.script
            .lock()
            .expect("script lock")
            .insert(url, Scripted { result, delay, gate });
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(url.to_string());
        let scripted = self.script.lock().expect("script lock").get(url).cloned();
        let Some(scripted) = scripted else {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        };
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        if let Some(gate) = scripted.gate {
            gate.notified().await;
        }
        scripted.result
    }
}

pub(crate) fn character_json(id: u32, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": "Alive",
        "species": "Human",
        "episode": [],
    })
}

pub(crate) fn collection_json(results: Vec<Value>, pages: usize) -> Value {
    json!({
        "info": { "count": results.len(), "pages": pages, "next": null, "prev": null },
        "results": results,
    })
}

/// Scripts `pages` of characters under `endpoint`; each page is a list of
/// `(id, name)` pairs. Returns the URL of every scripted page in order.
pub(crate) fn script_character_pages(
    fetcher: &ScriptedFetcher,
    endpoint: &str,
    pages: &[Vec<(u32, String)>],
) -> Vec<String> {
    pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let url = page_url(endpoint, index + 1);
            let results = page
                .iter()
                .map(|(id, name)| character_json(*id, name))
                .collect();
            fetcher.respond(url.clone(), collection_json(results, pages.len()));
            url
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RenderEvent {
    Loading,
    LoadingDone,
    Page {
        ids: Vec<u32>,
        current_page: usize,
        page_count: usize,
        mode: ViewMode,
    },
    Error(String),
}

/// Renderer that records every call so tests can assert on what was drawn.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingRenderer {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    pub(crate) fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub(crate) fn pages(&self) -> Vec<RenderEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, RenderEvent::Page { .. }))
            .collect()
    }

    pub(crate) fn last_page(&self) -> Option<RenderEvent> {
        self.pages().pop()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RenderEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Whether the last loading event shown is still on screen.
    pub(crate) fn loading_visible(&self) -> bool {
        self.events()
            .iter()
            .rev()
            .find_map(|event| match event {
                RenderEvent::Loading => Some(true),
                RenderEvent::LoadingDone => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    fn push(&self, event: RenderEvent) {
        self.events.lock().expect("events lock").push(event);
    }
}

impl<E: Entity> Renderer<E> for RecordingRenderer {
    fn show_loading(&mut self) {
        self.push(RenderEvent::Loading);
    }

    fn hide_loading(&mut self) {
        self.push(RenderEvent::LoadingDone);
    }

    fn render(&mut self, view: PageView<'_, E>) {
        self.push(RenderEvent::Page {
            ids: view.items.iter().map(Entity::id).collect(),
            current_page: view.current_page,
            page_count: view.page_count,
            mode: view.mode,
        });
    }

    fn show_error(&mut self, message: &str) {
        self.push(RenderEvent::Error(message.to_string()));
    }
}
