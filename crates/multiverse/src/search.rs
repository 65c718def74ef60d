//! Client-side search over a server-paginated collection.
//!
//! A search materializes every remote page of a listing endpoint, keeps the
//! entities whose name contains the term (case-insensitive) and exposes a
//! second, local pagination over the matches.
//!
//! ## Ordering
//!
//! Remote pages are fetched concurrently but the matches are always
//! concatenated in ascending remote-page order, whatever order the fetches
//! complete in. Each page's matches land in a slot indexed by page number.
//!
//! ## Failure
//!
//! A search is all-or-nothing: the first failing page fetch aborts the
//! remaining fetches and the whole search reports that error.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;
use tokio::task::JoinSet;

use crate::entity::{CollectionPage, Entity};
use crate::error::FetchError;
use crate::fetcher::{fetch_as, page_url, ContentFetcher};

/// Page size used by listings when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest remote page count a search will walk.
pub const MAX_REMOTE_PAGES: usize = 1_000;

/// The filtered, flattened matches of one search term.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultSet<E> {
    term: String,
    items: Vec<E>,
}

impl<E> SearchResultSet<E> {
    pub fn new(term: impl Into<String>, items: Vec<E>) -> Self {
        Self {
            term: term.into(),
            items,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items of the 1-based `page_number`. Pages outside the result set,
    /// page 0 and a zero page size all yield an empty slice.
    pub fn page(&self, page_number: usize, page_size: usize) -> &[E] {
        if page_number == 0 || page_size == 0 {
            return &[];
        }
        let start = (page_number - 1).saturating_mul(page_size);
        if start >= self.items.len() {
            return &[];
        }
        let end = start.saturating_add(page_size).min(self.items.len());
        &self.items[start..end]
    }

    /// `ceil(len / page_size)`; an empty set has zero pages.
    pub fn total_pages(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.items.len().div_ceil(page_size)
    }
}

/// Searches one listing endpoint by entity name.
pub struct CollectionSearch<E: Entity> {
    fetcher: Arc<dyn ContentFetcher>,
    endpoint: String,
    concurrency_limit: Option<usize>,
    results: Option<SearchResultSet<E>>,
}

impl<E: Entity> CollectionSearch<E> {
    /// `concurrency_limit` caps how many remote pages are fetched at once;
    /// `None` fetches every trailing page simultaneously.
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        endpoint: impl Into<String>,
        concurrency_limit: Option<usize>,
    ) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
            concurrency_limit: concurrency_limit.map(|limit| limit.max(1)),
            results: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn concurrency_limit(&self) -> Option<usize> {
        self.concurrency_limit
    }

    /// Runs a search and keeps its matches as the current result set.
    ///
    /// On failure the previous result set is dropped as well, so no partial
    /// or stale matches remain visible.
    pub async fn search_by_name(&mut self, term: &str) -> Result<&[E], FetchError> {
        self.results = None;
        let items = self.matching(term).await?;
        Ok(self.install(term, items).items())
    }

    /// Detached search that borrows nothing from `self`.
    ///
    /// Dropping the returned future aborts every page fetch it started.
    pub fn matching(&self, term: &str) -> BoxFuture<'static, Result<Vec<E>, FetchError>> {
        Box::pin(collect_matching(
            self.fetcher.clone(),
            self.endpoint.clone(),
            term.to_lowercase(),
            self.concurrency_limit,
        ))
    }

    /// Replaces the current result set.
    pub fn install(&mut self, term: &str, items: Vec<E>) -> &SearchResultSet<E> {
        self.results.insert(SearchResultSet::new(term, items))
    }

    pub fn results(&self) -> Option<&SearchResultSet<E>> {
        self.results.as_ref()
    }

    pub fn get_page(&self, page_number: usize, page_size: usize) -> &[E] {
        self.results
            .as_ref()
            .map(|results| results.page(page_number, page_size))
            .unwrap_or_default()
    }

    pub fn get_total_pages(&self, page_size: usize) -> usize {
        self.results
            .as_ref()
            .map_or(0, |results| results.total_pages(page_size))
    }

    pub fn clear(&mut self) {
        self.results = None;
    }
}

async fn collect_matching<E: Entity>(
    fetcher: Arc<dyn ContentFetcher>,
    endpoint: String,
    needle: String,
    concurrency_limit: Option<usize>,
) -> Result<Vec<E>, FetchError> {
    let started = Instant::now();
    let first_url = page_url(&endpoint, 1);
    let first: CollectionPage<E> = fetch_as(fetcher.as_ref(), &first_url).await?;
    let total = remote_page_count(&first_url, first.info.pages)?;

    let mut slots: Vec<Option<Vec<E>>> = (0..total).map(|_| None).collect();
    slots[0] = Some(keep_matches(first.results, &needle));

    // At most `window` page tasks exist at any time; the next page is only
    // spawned once a running one has finished.
    let window = concurrency_limit.unwrap_or(usize::MAX).max(1);
    let mut pending = 2..=total;
    let mut tasks = JoinSet::new();
    loop {
        while tasks.len() < window {
            let Some(page) = pending.next() else {
                break;
            };
            let fetcher = fetcher.clone();
            let needle = needle.clone();
            let url = page_url(&endpoint, page);
            tasks.spawn(async move {
                let page_data: CollectionPage<E> = fetch_as(fetcher.as_ref(), &url).await?;
                Ok::<_, FetchError>((page - 1, keep_matches(page_data.results, &needle)))
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let outcome = joined.map_err(|error| FetchError::Network {
            url: endpoint.clone(),
            message: format!("page fetch task failed: {error}"),
        });
        match outcome.and_then(|result| result) {
            Ok((index, matches)) => slots[index] = Some(matches),
            Err(error) => {
                tasks.abort_all();
                tracing::warn!(endpoint = %endpoint, %error, "search aborted");
                return Err(error);
            }
        }
    }

    let items: Vec<E> = slots.into_iter().flatten().flatten().collect();
    tracing::debug!(
        endpoint = %endpoint,
        pages = total,
        matches = items.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "search complete"
    );
    Ok(items)
}

/// Page count announced by the first page. Zero counts as one page; counts
/// above [`MAX_REMOTE_PAGES`] are rejected as a malformed payload.
fn remote_page_count(url: &str, pages: u32) -> Result<usize, FetchError> {
    let pages = usize::try_from(pages).unwrap_or(usize::MAX);
    if pages > MAX_REMOTE_PAGES {
        return Err(FetchError::Parse {
            url: url.to_string(),
            message: format!("page count {pages} exceeds the limit of {MAX_REMOTE_PAGES}"),
        });
    }
    Ok(pages.max(1))
}

fn keep_matches<E: Entity>(results: Vec<E>, needle: &str) -> Vec<E> {
    results
        .into_iter()
        .filter(|entity| entity.name_contains(needle))
        .collect()
}
