//! Incremental timeline pagination.
//!
//! The loader is owned by one task (the UI loop) and split around the await
//! point: `begin_*` checks and updates [`LoadState`] and mints a page token,
//! the caller performs the fetch, and [`TimelineLoader::complete`] merges the
//! result only if the token is still current.

use std::collections::HashSet;
use std::future::Future;

use crate::api::{ApiError, TimelineItem, TimelinePage};

/// Something that can serve timeline pages.
pub trait TimelineSource: Send + Sync {
    fn fetch_page(
        &self,
        limit: usize,
        offset: usize,
        days: u32,
    ) -> impl Future<Output = Result<TimelinePage, ApiError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    /// The server reported no further pages.
    Exhausted,
    /// The last fetch failed; `begin_load_more` retries it.
    Errored,
}

/// A fetch the caller should perform, tagged with the token to hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub token: u64,
    pub limit: usize,
    pub offset: usize,
    pub days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// `added` new items; `duplicates` already-loaded ids were skipped.
    Appended { added: usize, duplicates: usize },
    /// Result belonged to a superseded request and was dropped.
    Discarded,
    Failed,
}

#[derive(Debug)]
pub struct TimelineLoader {
    items: Vec<TimelineItem>,
    seen: HashSet<String>,
    state: LoadState,
    has_more: bool,
    offset: usize,
    limit: usize,
    days: u32,
    token: u64,
    total_count: u64,
    is_clustering: bool,
    last_error: Option<ApiError>,
}

impl TimelineLoader {
    pub fn new(limit: usize, days: u32) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            state: LoadState::Idle,
            has_more: false,
            offset: 0,
            limit,
            days,
            token: 0,
            total_count: 0,
            is_clustering: false,
            last_error: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Raw items received so far; the `offset` of the next page.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn is_clustering(&self) -> bool {
        self.is_clustering
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Drop everything and invalidate any request in flight.
    pub fn reset(&mut self) {
        self.token += 1;
        self.items.clear();
        self.seen.clear();
        self.state = LoadState::Idle;
        self.has_more = false;
        self.offset = 0;
        self.total_count = 0;
        self.last_error = None;
    }

    /// Start a fresh load from offset 0, superseding any request in flight.
    pub fn begin_initial(&mut self, limit: usize, days: u32) -> PageRequest {
        self.reset();
        self.limit = limit;
        self.days = days;
        self.state = LoadState::Loading;
        self.request()
    }

    /// Request the next page, or `None` if no fetch may be issued now.
    ///
    /// Allowed from `Idle` with more pages available, and from `Errored` as
    /// a retry of the failed request.
    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        match self.state {
            LoadState::Idle if self.has_more => {}
            LoadState::Errored => {
                tracing::debug!(offset = self.offset, "Retrying timeline fetch");
            }
            state => {
                tracing::debug!(?state, has_more = self.has_more, "Load more ignored");
                return None;
            }
        }
        self.token += 1;
        self.state = LoadState::Loading;
        self.last_error = None;
        Some(self.request())
    }

    /// Sentinel entered view. Only an idle loader reacts.
    pub fn on_near_bottom(&mut self) -> Option<PageRequest> {
        if self.state != LoadState::Idle {
            return None;
        }
        self.begin_load_more()
    }

    fn request(&self) -> PageRequest {
        PageRequest {
            token: self.token,
            limit: self.limit,
            offset: self.offset,
            days: self.days,
        }
    }

    /// Apply the result of the request identified by `token`.
    pub fn complete(&mut self, token: u64, result: Result<TimelinePage, ApiError>) -> PageOutcome {
        if token != self.token || self.state != LoadState::Loading {
            tracing::debug!(
                token = token,
                current = self.token,
                state = ?self.state,
                "Discarding stale timeline page"
            );
            return PageOutcome::Discarded;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(offset = self.offset, error = %e, "Timeline fetch failed");
                self.state = LoadState::Errored;
                self.last_error = Some(e);
                return PageOutcome::Failed;
            }
        };

        let received = page.items.len();
        let mut added = 0;
        for item in page.items {
            if self.seen.insert(item.id.clone()) {
                self.items.push(item);
                added += 1;
            } else {
                tracing::debug!(id = %item.id, "Skipping duplicate timeline item");
            }
        }

        self.offset += received;
        self.total_count = page.total_count;
        self.is_clustering = page.is_clustering;
        // An empty page cannot advance the cursor; treat it as the end.
        self.has_more = page.has_more && received > 0;
        self.state = if self.has_more {
            LoadState::Idle
        } else {
            tracing::info!(items = self.items.len(), "Timeline exhausted");
            LoadState::Exhausted
        };

        PageOutcome::Appended {
            added,
            duplicates: received - added,
        }
    }

    // ========================================================================
    // Convenience drivers
    // ========================================================================

    /// Fetch the first page from `source`.
    pub async fn load_initial<S: TimelineSource>(
        &mut self,
        source: &S,
        limit: usize,
        days: u32,
    ) -> PageOutcome {
        let req = self.begin_initial(limit, days);
        let result = source.fetch_page(req.limit, req.offset, req.days).await;
        self.complete(req.token, result)
    }

    /// Fetch the next page from `source`. `None` if no fetch was allowed.
    pub async fn load_more<S: TimelineSource>(&mut self, source: &S) -> Option<PageOutcome> {
        let req = self.begin_load_more()?;
        let result = source.fetch_page(req.limit, req.offset, req.days).await;
        Some(self.complete(req.token, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn item(id: &str) -> TimelineItem {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("story {}", id),
            "link": format!("https://example.com/{}", id),
        }))
        .unwrap()
    }

    fn page(ids: &[&str], has_more: bool) -> TimelinePage {
        TimelinePage {
            items: ids.iter().map(|id| item(id)).collect(),
            has_more,
            total_count: 10,
            is_clustering: false,
        }
    }

    fn ids(loader: &TimelineLoader) -> Vec<&str> {
        loader.items().iter().map(|i| i.id.as_str()).collect()
    }

    /// Serves queued pages and records requested offsets.
    #[derive(Default)]
    struct QueueSource {
        pages: Mutex<Vec<Result<TimelinePage, ApiError>>>,
        offsets: Mutex<Vec<usize>>,
        calls: AtomicUsize,
    }

    impl QueueSource {
        fn new(mut pages: Vec<Result<TimelinePage, ApiError>>) -> Self {
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
                ..Default::default()
            }
        }
    }

    impl TimelineSource for QueueSource {
        async fn fetch_page(
            &self,
            _limit: usize,
            offset: usize,
            _days: u32,
        ) -> Result<TimelinePage, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.offsets.lock().unwrap().push(offset);
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(ApiError::HttpStatus(404)))
        }
    }

    #[test]
    fn overlapping_pages_merge_by_id_in_server_order() {
        let mut loader = TimelineLoader::new(3, 14);
        let req = loader.begin_initial(3, 14);
        assert_eq!(req.offset, 0);
        assert_eq!(
            loader.complete(req.token, Ok(page(&["A", "B", "C"], true))),
            PageOutcome::Appended { added: 3, duplicates: 0 }
        );

        let req = loader.begin_load_more().unwrap();
        assert_eq!(req.offset, 3);
        assert_eq!(
            loader.complete(req.token, Ok(page(&["C", "D"], true))),
            PageOutcome::Appended { added: 1, duplicates: 1 }
        );

        assert_eq!(ids(&loader), vec!["A", "B", "C", "D"]);
        assert_eq!(loader.offset(), 5);
        assert_eq!(loader.state(), LoadState::Idle);
    }

    #[test]
    fn second_load_more_while_loading_is_a_no_op() {
        let mut loader = TimelineLoader::new(3, 14);
        let req = loader.begin_initial(3, 14);
        loader.complete(req.token, Ok(page(&["A"], true)));

        assert!(loader.begin_load_more().is_some());
        assert_eq!(loader.begin_load_more(), None);
        assert_eq!(loader.on_near_bottom(), None);
        assert_eq!(loader.state(), LoadState::Loading);
    }

    #[test]
    fn exhausted_blocks_further_fetches_until_reset() {
        let mut loader = TimelineLoader::new(3, 14);
        let req = loader.begin_initial(3, 14);
        loader.complete(req.token, Ok(page(&["A", "B"], false)));

        assert_eq!(loader.state(), LoadState::Exhausted);
        assert_eq!(loader.on_near_bottom(), None);
        assert_eq!(loader.begin_load_more(), None);

        loader.reset();
        assert!(loader.is_empty());
        let req = loader.begin_initial(3, 14);
        assert_eq!(req.offset, 0);
    }

    #[test]
    fn empty_page_with_has_more_still_exhausts() {
        let mut loader = TimelineLoader::new(3, 14);
        let req = loader.begin_initial(3, 14);
        loader.complete(req.token, Ok(page(&[], true)));
        assert_eq!(loader.state(), LoadState::Exhausted);
        assert!(!loader.has_more());
    }

    #[test]
    fn failure_is_surfaced_and_retryable() {
        let mut loader = TimelineLoader::new(3, 14);
        let req = loader.begin_initial(3, 14);
        loader.complete(req.token, Ok(page(&["A", "B", "C"], true)));

        let req = loader.begin_load_more().unwrap();
        assert_eq!(loader.complete(req.token, Err(ApiError::Timeout)), PageOutcome::Failed);
        assert_eq!(loader.state(), LoadState::Errored);
        assert!(matches!(loader.last_error(), Some(ApiError::Timeout)));
        // The sentinel does not retry on its own
        assert_eq!(loader.on_near_bottom(), None);

        let retry = loader.begin_load_more().unwrap();
        assert_eq!(retry.offset, 3);
        assert!(loader.last_error().is_none());
        loader.complete(retry.token, Ok(page(&["D"], false)));
        assert_eq!(ids(&loader), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn page_from_before_reset_is_discarded() {
        let mut loader = TimelineLoader::new(3, 14);
        let first = loader.begin_initial(3, 14);
        loader.complete(first.token, Ok(page(&["A"], true)));
        let stale = loader.begin_load_more().unwrap();

        let fresh = loader.begin_initial(3, 14);
        assert_eq!(
            loader.complete(stale.token, Ok(page(&["X", "Y"], false))),
            PageOutcome::Discarded
        );
        assert_eq!(loader.state(), LoadState::Loading);

        loader.complete(fresh.token, Ok(page(&["B"], true)));
        assert_eq!(ids(&loader), vec!["B"]);
        // A duplicate delivery of the same token is ignored once idle
        assert_eq!(
            loader.complete(fresh.token, Ok(page(&["C"], true))),
            PageOutcome::Discarded
        );
    }

    #[tokio::test]
    async fn drivers_fetch_consecutive_offsets() {
        let source = QueueSource::new(vec![
            Ok(page(&["A", "B", "C"], true)),
            Ok(page(&["C", "D"], false)),
        ]);
        let mut loader = TimelineLoader::new(500, 14);

        loader.load_initial(&source, 3, 14).await;
        assert!(loader.load_more(&source).await.is_some());
        assert_eq!(loader.load_more(&source).await, None);

        assert_eq!(ids(&loader), vec!["A", "B", "C", "D"]);
        assert_eq!(*source.offsets.lock().unwrap(), vec![0, 3]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
