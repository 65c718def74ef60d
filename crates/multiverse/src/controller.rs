//! List view controller: browse the remote listing page by page, or search
//! it by name and page through the matches locally.
//!
//! The controller owns the only [`ViewState`]. Searches run as detached
//! [`SearchTicket`]s so a newer search can start while an older one is still
//! fetching; every search start bumps a generation counter and cancels the
//! previous ticket, and a completion whose generation is no longer current is
//! dropped without touching view state or the renderer.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{MultiverseConfig, SearchConfig};
use crate::debounce::debounce;
use crate::entity::{CollectionPage, Entity, EntityKind};
use crate::error::{ClientError, ClientResult, FetchError};
use crate::fetcher::{fetch_as, page_url, ApiUrls, ContentFetcher, HttpFetcher};
use crate::search::{CollectionSearch, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Paging is delegated to the remote API.
    Browse,
    /// Paging is served from the local search result set.
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub current_page: usize,
    pub mode: ViewMode,
    pub search_term: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_page: 1,
            mode: ViewMode::Browse,
            search_term: String::new(),
        }
    }
}

/// One page of entities handed to a [`Renderer`].
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a, E> {
    pub kind: EntityKind,
    pub items: &'a [E],
    pub current_page: usize,
    /// Zero when a search matched nothing.
    pub page_count: usize,
    pub mode: ViewMode,
}

/// Draws listings, the loading indicator and error messages.
pub trait Renderer<E: Entity> {
    fn show_loading(&mut self);

    fn hide_loading(&mut self);

    fn render(&mut self, view: PageView<'_, E>);

    /// Shown on failure; the previously rendered page stays in place.
    fn show_error(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: usize,
    pub concurrency_limit: Option<usize>,
    /// Quiet period applied to raw search box input.
    pub debounce: Duration,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency_limit: None,
            debounce: Duration::from_millis(400),
        }
    }
}

impl From<&SearchConfig> for ListOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            page_size: config.page_size,
            concurrency_limit: config.concurrency_limit,
            debounce: config.debounce(),
        }
    }
}

/// A started search, detached from the controller.
pub struct SearchTicket<E> {
    generation: u64,
    term: String,
    cancel: CancellationToken,
    work: BoxFuture<'static, Result<Vec<E>, FetchError>>,
}

impl<E> SearchTicket<E> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Drives the search to completion or until a newer search cancels it.
    pub async fn run(self) -> SearchOutcome<E> {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.work => Some(result),
        };
        SearchOutcome {
            generation: self.generation,
            term: self.term,
            result,
        }
    }
}

/// What a [`SearchTicket`] produced.
pub struct SearchOutcome<E> {
    generation: u64,
    term: String,
    /// `None` when the search was cancelled.
    result: Option<Result<Vec<E>, FetchError>>,
}

impl<E> SearchOutcome<E> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.result.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCompletion {
    /// The matches were installed and page 1 rendered.
    Applied,
    /// A newer search or a return to browsing superseded this one.
    Superseded,
}

enum InputStep<E> {
    Finished(SearchOutcome<E>),
    Superseded(String),
    Closed,
}

pub struct ListViewController<E: Entity, R: Renderer<E>> {
    fetcher: Arc<dyn ContentFetcher>,
    endpoint: String,
    page_size: usize,
    debounce: Duration,
    search: CollectionSearch<E>,
    state: ViewState,
    /// Remote page count seen by the last successful browse fetch.
    remote_pages: usize,
    generation: u64,
    in_flight: Option<CancellationToken>,
    /// Fetches (browse pages and the running search) the loading indicator
    /// is currently shown for.
    loading: usize,
    renderer: R,
}

impl<E: Entity, R: Renderer<E>> ListViewController<E, R> {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        endpoint: impl Into<String>,
        options: ListOptions,
        renderer: R,
    ) -> Self {
        let endpoint = endpoint.into();
        let search = CollectionSearch::new(fetcher.clone(), endpoint.clone(), options.concurrency_limit);
        Self {
            fetcher,
            endpoint,
            page_size: options.page_size.max(1),
            debounce: options.debounce,
            search,
            state: ViewState::default(),
            remote_pages: 0,
            generation: 0,
            in_flight: None,
            loading: 0,
            renderer,
        }
    }

    /// Controller for the listing endpoint of `E`'s kind.
    pub fn for_kind(
        fetcher: Arc<dyn ContentFetcher>,
        urls: &ApiUrls,
        options: ListOptions,
        renderer: R,
    ) -> Self {
        Self::new(fetcher, urls.collection(E::KIND), options, renderer)
    }

    /// Controller for `E`'s listing on the configured API, fetching over HTTP
    /// with the configured timeout.
    pub fn from_config(config: &MultiverseConfig, renderer: R) -> ClientResult<Self> {
        let fetcher = HttpFetcher::new(config.api.timeout())?;
        Ok(Self::with_config(Arc::new(fetcher), config, renderer))
    }

    pub fn with_config(
        fetcher: Arc<dyn ContentFetcher>,
        config: &MultiverseConfig,
        renderer: R,
    ) -> Self {
        let urls = ApiUrls::new(config.api.base_url.as_str());
        Self::for_kind(fetcher, &urls, ListOptions::from(&config.search), renderer)
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn search(&self) -> &CollectionSearch<E> {
        &self.search
    }

    /// Page count of the active mode.
    pub fn page_count(&self) -> usize {
        match self.state.mode {
            ViewMode::Browse => self.remote_pages,
            ViewMode::Search => self.search.get_total_pages(self.page_size),
        }
    }

    /// Renders the first remote page.
    pub async fn load(&mut self) -> ClientResult<()> {
        self.browse_to(1).await
    }

    /// Moves to page `page` of the active mode.
    ///
    /// Browsing fetches the remote page; searching slices the local result
    /// set without any network call. Pages outside `[1, page_count]` are
    /// rejected and leave the view untouched.
    pub async fn go_to_page(&mut self, page: usize) -> ClientResult<()> {
        let page_count = self.page_count();
        if page == 0 || (page > page_count && !(page == 1 && page_count == 0)) {
            return Err(ClientError::InvalidInput(format!(
                "page {page} is outside 1..={page_count}"
            )));
        }
        match self.state.mode {
            ViewMode::Browse => self.browse_to(page).await,
            ViewMode::Search => {
                self.state.current_page = page;
                self.render_search_page();
                Ok(())
            }
        }
    }

    /// Advances one page; a no-op on the last page.
    pub async fn next_page(&mut self) -> ClientResult<()> {
        if self.state.current_page >= self.page_count() {
            return Ok(());
        }
        self.go_to_page(self.state.current_page + 1).await
    }

    /// Goes back one page; a no-op on the first page.
    pub async fn previous_page(&mut self) -> ClientResult<()> {
        if self.state.current_page <= 1 {
            return Ok(());
        }
        self.go_to_page(self.state.current_page - 1).await
    }

    /// Handles one debounced value of the search box.
    pub async fn on_search_input(&mut self, input: &str) -> ClientResult<SearchCompletion> {
        match self.begin_search(input) {
            Some(ticket) => {
                let outcome = ticket.run().await;
                self.complete_search(outcome)
            }
            None => {
                self.exit_search().await?;
                Ok(SearchCompletion::Applied)
            }
        }
    }

    /// Starts a search for the trimmed `input`, superseding any search in
    /// flight. Returns `None` when the trimmed input is empty; the caller
    /// should then return to browsing with [`exit_search`](Self::exit_search).
    pub fn begin_search(&mut self, input: &str) -> Option<SearchTicket<E>> {
        let term = input.trim();
        if term.is_empty() {
            return None;
        }
        let generation = self.supersede();
        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        self.start_loading();
        tracing::debug!(endpoint = %self.endpoint, term, generation, "search started");
        Some(SearchTicket {
            generation,
            term: term.to_string(),
            cancel,
            work: self.search.matching(term),
        })
    }

    /// Applies a finished search if it is still the latest one.
    ///
    /// A failed search shows an error and keeps the previous view and
    /// result set.
    pub fn complete_search(&mut self, outcome: SearchOutcome<E>) -> ClientResult<SearchCompletion> {
        if outcome.generation != self.generation {
            tracing::debug!(
                generation = outcome.generation,
                current = self.generation,
                "discarding superseded search"
            );
            return Ok(SearchCompletion::Superseded);
        }
        if self.in_flight.take().is_some() {
            self.finish_loading();
        }

        let Some(result) = outcome.result else {
            return Ok(SearchCompletion::Superseded);
        };
        match result {
            Ok(items) => {
                self.search.install(&outcome.term, items);
                self.state = ViewState {
                    current_page: 1,
                    mode: ViewMode::Search,
                    search_term: outcome.term,
                };
                self.render_search_page();
                Ok(SearchCompletion::Applied)
            }
            Err(error) => {
                tracing::warn!(term = %outcome.term, %error, "search unavailable");
                self.renderer
                    .show_error(&format!("Search is unavailable: {error}"));
                Err(error.into())
            }
        }
    }

    /// Leaves search mode and shows the first remote page.
    ///
    /// The search result set is only dropped once page 1 has loaded; on
    /// failure the search page stays current and can still be paged.
    pub async fn exit_search(&mut self) -> ClientResult<()> {
        self.supersede();
        self.browse_to(1).await?;
        self.search.clear();
        self.state.search_term.clear();
        Ok(())
    }

    /// Consumes debounced search box values until the channel closes.
    ///
    /// A value arriving while a search is still fetching cancels that search.
    pub async fn run_search_input(&mut self, mut inputs: mpsc::Receiver<String>) {
        let mut next = inputs.recv().await;
        while let Some(input) = next.take() {
            let Some(ticket) = self.begin_search(&input) else {
                if let Err(error) = self.exit_search().await {
                    tracing::warn!(%error, "failed to return to browsing");
                }
                next = inputs.recv().await;
                continue;
            };

            let running = ticket.run();
            tokio::pin!(running);
            let step = tokio::select! {
                outcome = &mut running => InputStep::Finished(outcome),
                newer = inputs.recv() => match newer {
                    Some(newer) => InputStep::Superseded(newer),
                    None => InputStep::Closed,
                },
            };
            let outcome = match step {
                InputStep::Finished(outcome) => outcome,
                InputStep::Superseded(newer) => {
                    next = Some(newer);
                    continue;
                }
                InputStep::Closed => running.await,
            };
            if let Err(error) = self.complete_search(outcome) {
                tracing::debug!(%error, "search input failed");
            }
            next = inputs.recv().await;
        }
    }

    /// Debounces raw search box values by the configured quiet period and
    /// handles what settles, until `keystrokes` closes.
    pub async fn run_search_box(&mut self, keystrokes: mpsc::Receiver<String>) {
        let settled = debounce(keystrokes, self.debounce);
        self.run_search_input(settled).await;
    }

    /// Bumps the generation and cancels the search in flight, if any.
    fn supersede(&mut self) -> u64 {
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
            self.finish_loading();
        }
        self.generation += 1;
        self.generation
    }

    async fn browse_to(&mut self, page: usize) -> ClientResult<()> {
        let url = page_url(&self.endpoint, page);
        self.start_loading();
        let fetched: Result<CollectionPage<E>, FetchError> =
            fetch_as(self.fetcher.as_ref(), &url).await;
        self.finish_loading();

        match fetched {
            Ok(collection) => {
                self.remote_pages = collection.info.pages as usize;
                self.state.mode = ViewMode::Browse;
                self.state.current_page = page;
                self.renderer.render(PageView {
                    kind: E::KIND,
                    items: &collection.results,
                    current_page: page,
                    page_count: self.remote_pages,
                    mode: ViewMode::Browse,
                });
                Ok(())
            }
            Err(error) => {
                tracing::warn!(url = %url, %error, "browse fetch failed");
                self.renderer
                    .show_error(&format!("Failed to load {} page {page}", E::KIND));
                Err(error.into())
            }
        }
    }

    fn start_loading(&mut self) {
        self.loading += 1;
        if self.loading == 1 {
            self.renderer.show_loading();
        }
    }

    fn finish_loading(&mut self) {
        self.loading = self.loading.saturating_sub(1);
        if self.loading == 0 {
            self.renderer.hide_loading();
        }
    }

    fn render_search_page(&mut self) {
        let page_count = self.search.get_total_pages(self.page_size);
        let items = self.search.get_page(self.state.current_page, self.page_size);
        self.renderer.render(PageView {
            kind: E::KIND,
            items,
            current_page: self.state.current_page,
            page_count,
            mode: ViewMode::Search,
        });
    }
}
