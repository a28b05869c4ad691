use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use shared::domain::EntityId;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::error::ViewError;
use crate::mutation::{
    MutationHandle, MutationIntent, MutationKind, MutationOutcome, MutationReply, SettlePolicy,
};
use crate::source::DataSource;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Everything a list view asks the backend (or its own loaded data) for:
/// search term, named filters, and the page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search_term: String,
    pub filters: BTreeMap<String, String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            filters: BTreeMap::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ..Self::default()
        }
    }

    /// Returns true when the query actually changed. Any change to the
    /// search term sends the view back to page 1.
    fn set_search_term(&mut self, term: &str) -> bool {
        if self.search_term == term {
            return false;
        }
        self.search_term = term.to_string();
        self.page = 1;
        true
    }

    /// Empty value clears the filter entry. Any change resets to page 1.
    fn set_filter(&mut self, key: &str, value: &str) -> bool {
        let changed = if value.is_empty() {
            self.filters.remove(key).is_some()
        } else {
            self.filters.get(key).map(String::as_str) != Some(value) && {
                self.filters.insert(key.to_string(), value.to_string());
                true
            }
        };
        if changed {
            self.page = 1;
        }
        changed
    }

    fn set_page_size(&mut self, page_size: u32) -> bool {
        if page_size == 0 || page_size == self.page_size {
            return false;
        }
        self.page_size = page_size;
        // the old page index is meaningless under a new window size
        self.page = 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl PageMeta {
    pub fn new(total: u64, page: u32, page_size: u32) -> Self {
        Self {
            total,
            page,
            page_size,
            total_pages: Self::pages_for(total, page_size),
        }
    }

    /// Always at least 1 so an empty list still reads "page 1 of 1".
    pub fn pages_for(total: u64, page_size: u32) -> u32 {
        let page_size = u64::from(page_size.max(1));
        total.div_ceil(page_size).max(1) as u32
    }
}

/// Whether `items` is already the requested page slice or the full set the
/// view must window itself. Mixing the two up is exactly the
/// double-pagination bug class this tag exists to rule out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationSource {
    ServerPaginated,
    ClientPaginated,
}

#[derive(Debug, Clone)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
    pub source: PaginationSource,
}

/// What a row type must expose for the controller to search, filter, and
/// patch it.
pub trait ListEntity: Clone + Send + Sync + 'static {
    fn entity_id(&self) -> EntityId;

    /// Case-insensitive match against the view's search box. `term` is never
    /// empty when this is called.
    fn matches_search(&self, term: &str) -> bool;

    /// Match against one named filter. Unrecognized keys must return true so
    /// a view-specific filter does not silently hide every row of another
    /// resource.
    fn matches_filter(&self, key: &str, value: &str) -> bool;
}

fn matches_query<T: ListEntity>(item: &T, query: &ListQuery) -> bool {
    (query.search_term.is_empty() || item.matches_search(&query.search_term))
        && query
            .filters
            .iter()
            .all(|(key, value)| item.matches_filter(key, value))
}

/// The one place pagination is decided. Pure and deterministic: server-sliced
/// results pass through untouched, client-paginated results are filtered and
/// windowed here and nowhere else.
pub fn derive_visible_items<T: ListEntity>(result: &ListResult<T>, query: &ListQuery) -> Vec<T> {
    match result.source {
        PaginationSource::ServerPaginated => result.items.clone(),
        PaginationSource::ClientPaginated => {
            let start = (query.page.max(1) as usize - 1) * query.page_size as usize;
            result
                .items
                .iter()
                .filter(|item| matches_query(*item, query))
                .skip(start)
                .take(query.page_size as usize)
                .cloned()
                .collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// Fan-out notifications for hosts that render controller state.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    QueryChanged(ListQuery),
    Loading,
    Loaded { page: u32, total: u64 },
    FetchFailed(String),
    MutationSucceeded { id: EntityId, kind: MutationKind },
    MutationFailed {
        id: EntityId,
        kind: MutationKind,
        message: String,
    },
}

struct ListViewState<T> {
    query: ListQuery,
    result: Option<ListResult<T>>,
    display: DisplayState,
    pending: HashSet<EntityId>,
    stale: bool,
    closed: bool,
    issued_seq: u64,
}

/// Single source of truth for one list view: what to show, at what page,
/// filtered how, and which rows have a mutation in flight. One instance per
/// mounted view; nothing is shared across views.
pub struct ListView<T: ListEntity> {
    source: Arc<dyn DataSource<T>>,
    resource: String,
    inner: Mutex<ListViewState<T>>,
    events: broadcast::Sender<ViewEvent>,
}

impl<T: ListEntity> ListView<T> {
    pub fn new(source: Arc<dyn DataSource<T>>, resource: impl Into<String>) -> Self {
        Self::with_query(source, resource, ListQuery::default())
    }

    pub fn with_query(
        source: Arc<dyn DataSource<T>>,
        resource: impl Into<String>,
        query: ListQuery,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            source,
            resource: resource.into(),
            inner: Mutex::new(ListViewState {
                query,
                result: None,
                display: DisplayState::Idle,
                pending: HashSet::new(),
                stale: false,
                closed: false,
                issued_seq: 0,
            }),
            events,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub async fn query(&self) -> ListQuery {
        self.inner.lock().await.query.clone()
    }

    pub async fn display_state(&self) -> DisplayState {
        self.inner.lock().await.display.clone()
    }

    /// True once a settled mutation invalidated the loaded result; the host
    /// should `refresh` before trusting `visible_items` again.
    pub async fn needs_refresh(&self) -> bool {
        self.inner.lock().await.stale
    }

    /// Logical cancellation on unmount: late fetch and mutation callbacks
    /// are dropped instead of updating a view nobody renders.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
    }

    /// Updates the search term and goes back to page 1. No I/O happens here;
    /// debouncing the subsequent `refresh` is the caller's timing policy.
    pub async fn set_search_term(&self, term: &str) {
        let mut inner = self.inner.lock().await;
        if inner.query.set_search_term(term) {
            let query = inner.query.clone();
            drop(inner);
            let _ = self.events.send(ViewEvent::QueryChanged(query));
        }
    }

    pub async fn set_filter(&self, key: &str, value: &str) {
        let mut inner = self.inner.lock().await;
        if inner.query.set_filter(key, value) {
            let query = inner.query.clone();
            drop(inner);
            let _ = self.events.send(ViewEvent::QueryChanged(query));
        }
    }

    /// No-op for out-of-range targets, including anything past the last
    /// page of the currently effective result.
    pub async fn set_page(&self, page: u32) {
        let mut inner = self.inner.lock().await;
        if page < 1 || page > effective_meta(&inner.query, inner.result.as_ref()).total_pages {
            debug!(page, "ignoring out-of-range page request");
            return;
        }
        if inner.query.page != page {
            inner.query.page = page;
            let query = inner.query.clone();
            drop(inner);
            let _ = self.events.send(ViewEvent::QueryChanged(query));
        }
    }

    pub async fn set_page_size(&self, page_size: u32) {
        let mut inner = self.inner.lock().await;
        if inner.query.set_page_size(page_size) {
            let query = inner.query.clone();
            drop(inner);
            let _ = self.events.send(ViewEvent::QueryChanged(query));
        }
    }

    /// Fetches the current query through the data source. Only the most
    /// recently issued request may apply its result; anything older resolves
    /// into a no-op. On failure the last-known-good result and query are
    /// kept and only the display state carries the error.
    pub async fn refresh(&self) -> Result<(), ViewError> {
        let (seq, query) = {
            let mut inner = self.inner.lock().await;
            if inner.closed {
                return Ok(());
            }
            inner.issued_seq += 1;
            inner.display = DisplayState::Loading;
            (inner.issued_seq, inner.query.clone())
        };
        let _ = self.events.send(ViewEvent::Loading);

        let outcome = self.source.fetch_list(&self.resource, &query).await;

        let mut inner = self.inner.lock().await;
        if inner.closed {
            debug!(resource = %self.resource, "dropping fetch result for closed view");
            return Ok(());
        }
        if seq != inner.issued_seq {
            debug!(
                resource = %self.resource,
                seq,
                latest = inner.issued_seq,
                "dropping superseded fetch result"
            );
            return Ok(());
        }

        match outcome {
            Ok(result) => {
                info!(
                    resource = %self.resource,
                    page = query.page,
                    total = result.meta.total,
                    "list loaded"
                );
                let _ = self.events.send(ViewEvent::Loaded {
                    page: query.page,
                    total: result.meta.total,
                });
                inner.result = Some(result);
                inner.stale = false;
                inner.display = DisplayState::Ready;
                Ok(())
            }
            Err(err) => {
                warn!(resource = %self.resource, error = %err, "list fetch failed");
                inner.display = DisplayState::Error(err.message.clone());
                let _ = self.events.send(ViewEvent::FetchFailed(err.message.clone()));
                Err(err)
            }
        }
    }

    /// The rows the host should render right now, already searched,
    /// filtered, and windowed per the loaded result's pagination source.
    pub async fn visible_items(&self) -> Vec<T> {
        let inner = self.inner.lock().await;
        match inner.result.as_ref() {
            Some(result) => derive_visible_items(result, &inner.query),
            None => Vec::new(),
        }
    }

    /// Page metadata consistent with `visible_items`: server meta for
    /// server-paginated results, recomputed over the filtered set otherwise.
    pub async fn visible_meta(&self) -> PageMeta {
        let inner = self.inner.lock().await;
        effective_meta(&inner.query, inner.result.as_ref())
    }

    /// Marks `id` pending and hands back the exclusive settlement token.
    /// Rejected with a conflict error while a previous intent on the same id
    /// is still pending; intents on distinct ids may overlap freely.
    pub async fn begin_mutation(
        &self,
        id: EntityId,
        kind: MutationKind,
    ) -> Result<MutationHandle, ViewError> {
        let mut inner = self.inner.lock().await;
        if !inner.pending.insert(id.clone()) {
            return Err(ViewError::conflict(format!(
                "a mutation is already pending for {id}"
            )));
        }
        debug!(id = %id, kind = kind.label(), "mutation pending");
        Ok(MutationHandle { id, kind })
    }

    /// Clears the pending mark and reconciles the loaded result per the
    /// mutation kind's settle policy. Failures never touch the result.
    pub async fn settle_mutation(&self, handle: MutationHandle, outcome: MutationOutcome<T>) {
        let mut inner = self.inner.lock().await;
        inner.pending.remove(&handle.id);
        if inner.closed {
            return;
        }

        match outcome {
            MutationOutcome::Succeeded(reply) => {
                apply_success(&mut inner, &handle, reply);
                let _ = self.events.send(ViewEvent::MutationSucceeded {
                    id: handle.id,
                    kind: handle.kind,
                });
            }
            MutationOutcome::Failed(message) => {
                warn!(id = %handle.id, kind = handle.kind.label(), error = %message, "mutation failed");
                let _ = self.events.send(ViewEvent::MutationFailed {
                    id: handle.id,
                    kind: handle.kind,
                    message,
                });
            }
        }
    }

    /// Begin, run through the data source, settle. The one call sites
    /// normally use.
    pub async fn submit_mutation(&self, intent: MutationIntent) -> Result<(), ViewError> {
        let handle = self.begin_mutation(intent.id.clone(), intent.kind).await?;
        match self.source.mutate(&self.resource, &intent).await {
            Ok(reply) => {
                self.settle_mutation(handle, MutationOutcome::Succeeded(reply))
                    .await;
                Ok(())
            }
            Err(err) => {
                self.settle_mutation(handle, MutationOutcome::Failed(err.message.clone()))
                    .await;
                Err(err)
            }
        }
    }
}

fn effective_meta<T: ListEntity>(query: &ListQuery, result: Option<&ListResult<T>>) -> PageMeta {
    match result {
        None => PageMeta::new(0, query.page, query.page_size),
        Some(result) => match result.source {
            PaginationSource::ServerPaginated => {
                PageMeta::new(result.meta.total, query.page, query.page_size)
            }
            PaginationSource::ClientPaginated => {
                let filtered = result
                    .items
                    .iter()
                    .filter(|item| matches_query(*item, query))
                    .count() as u64;
                PageMeta::new(filtered, query.page, query.page_size)
            }
        },
    }
}

fn apply_success<T: ListEntity>(
    state: &mut ListViewState<T>,
    handle: &MutationHandle,
    reply: MutationReply<T>,
) {
    match handle.kind.settle_policy() {
        SettlePolicy::PatchInPlace => match reply.entity {
            Some(entity) => {
                if let Some(result) = state.result.as_mut() {
                    if let Some(row) = result
                        .items
                        .iter_mut()
                        .find(|row| row.entity_id() == handle.id)
                    {
                        *row = entity;
                    }
                }
            }
            // no echoed record to patch with; force a refetch instead of
            // guessing the row's new shape
            None => state.stale = true,
        },
        SettlePolicy::RemoveRow => {
            let Some(result) = state.result.as_mut() else {
                return;
            };
            let before = result.items.len();
            result.items.retain(|row| row.entity_id() != handle.id);
            if result.items.len() != before {
                result.meta.total = result.meta.total.saturating_sub(1);
                result.meta.total_pages =
                    PageMeta::pages_for(result.meta.total, state.query.page_size);
            }
            let emptied = derive_visible_items(result, &state.query).is_empty();
            if emptied && state.query.page > 1 {
                state.query.page -= 1;
                if result.source == PaginationSource::ServerPaginated {
                    // the previous page's rows live on the server
                    state.stale = true;
                }
            } else if emptied
                && result.source == PaginationSource::ServerPaginated
                && result.meta.total > 0
            {
                state.stale = true;
            }
        }
        SettlePolicy::MarkStale => state.stale = true,
    }
}

#[cfg(test)]
#[path = "tests/list_view_tests.rs"]
mod tests;
