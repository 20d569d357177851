//! NoteCache: the local-first enrichment cache
//!
//! Owns the in-memory view of all notes. A load lists the store and
//! returns immediately with whatever is resident; notes without a
//! persisted enrichment are fetched in the background, one outstanding
//! fetch per note per load, and merged in as results land. The local
//! list is never blocked on the network.

use super::context::{build_context_window, DEFAULT_CONTEXT_LIMIT};
use super::fence::CommitFence;
use super::record::{FetchState, NoteRecord};
use crate::client::EnrichmentClient;
use crate::note::{Enrichment, NoteId};
use crate::session::SessionContext;
use crate::store::NoteStore;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// The enrichment cache over one note store
///
/// A cheap handle over shared state: clone it, or wrap it in an `Arc`,
/// and hand copies to every surface that needs the view. All state
/// mutation happens through interior concurrency-safe containers.
#[derive(Clone)]
pub struct NoteCache {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn NoteStore>,
    client: Arc<dyn EnrichmentClient>,
    session: Arc<SessionContext>,
    records: DashMap<NoteId, NoteRecord>,
    context_limit: usize,
    fence: CommitFence,
    /// Outstanding background fetches
    pending: AtomicUsize,
    /// Bumped on every view change; observers watch this
    version: watch::Sender<u64>,
}

impl NoteCache {
    pub fn new(
        store: Arc<dyn NoteStore>,
        client: Arc<dyn EnrichmentClient>,
        session: Arc<SessionContext>,
    ) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                store,
                client,
                session,
                records: DashMap::new(),
                context_limit: DEFAULT_CONTEXT_LIMIT,
                fence: CommitFence::new(),
                pending: AtomicUsize::new(0),
                version,
            }),
        }
    }

    /// Cap the number of prior summaries sent with each fetch
    ///
    /// Only effective before the cache is shared.
    pub fn with_context_limit(mut self, limit: usize) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.context_limit = limit;
        }
        self
    }

    /// Rebuild the view from the store and return it immediately
    ///
    /// Notes whose enrichment is already persisted come back `Idle`;
    /// the rest are marked `Fetching` and queued exactly once in this
    /// pass. Error marks from a previous pass are discarded, so a
    /// reload retries what failed before.
    ///
    /// A store that cannot even be listed degrades to an empty view
    /// rather than an error; the condition is logged.
    pub async fn load(&self) -> Vec<NoteRecord> {
        let inner = &self.inner;
        let ids = match inner.store.list_note_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("listing notes failed: {e}");
                inner.records.clear();
                inner.bump_version();
                return Vec::new();
            }
        };

        let mut queue = Vec::new();
        let mut fresh = Vec::with_capacity(ids.len());
        for id in ids {
            let enrichment = match inner.store.read_enrichment(id).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("reading enrichment for note {id} failed: {e}");
                    None
                }
            };
            let fetch = if enrichment.is_some() {
                FetchState::Idle
            } else {
                queue.push(id);
                FetchState::Fetching
            };
            fresh.push(NoteRecord { id, enrichment, fetch });
        }

        inner.records.clear();
        for record in &fresh {
            inner.records.insert(record.id, record.clone());
        }
        inner.bump_version();
        debug!(
            "loaded {} notes, {} awaiting enrichment",
            fresh.len(),
            queue.len()
        );

        // Spawn only after the whole view is resident, so every fetch
        // sees the complete set when building its context.
        for id in queue {
            self.spawn_fetch(id);
        }
        fresh
    }

    /// Reload when notes changed behind the cache's back, else do nothing
    pub async fn reload_if_changed(&self) -> Option<Vec<NoteRecord>> {
        if self.inner.session.take_notes_changed() {
            Some(self.load().await)
        } else {
            None
        }
    }

    /// The current view, newest note first
    pub fn snapshot(&self) -> Vec<NoteRecord> {
        self.inner.snapshot()
    }

    /// One record by id, if resident
    pub fn get(&self, id: NoteId) -> Option<NoteRecord> {
        self.inner.records.get(&id).map(|r| r.clone())
    }

    /// Number of background fetches still outstanding
    pub fn pending_fetches(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Watch for view changes; the value is a bare generation counter
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    /// Wait until no background fetch is outstanding
    pub async fn settled(&self) {
        let mut rx = self.inner.version.subscribe();
        loop {
            rx.borrow_and_update();
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Stop in-flight fetches from committing results
    ///
    /// Tasks already talking to the service run to completion but drop
    /// their results at the commit check.
    pub fn shutdown(&self) {
        self.inner.fence.raise();
    }

    fn spawn_fetch(&self, id: NoteId) {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_fetch(id).await;
            inner.pending.fetch_sub(1, Ordering::SeqCst);
            inner.bump_version();
        });
    }
}

impl Inner {
    fn snapshot(&self) -> Vec<NoteRecord> {
        let mut view: Vec<NoteRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        view.sort_unstable_by(|a, b| b.id.cmp(&a.id));
        view
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    async fn run_fetch(&self, id: NoteId) {
        if self.fence.is_raised() {
            return;
        }
        let outcome = self.fetch_one(id).await;
        // Nothing commits after a shutdown, not even an error mark
        if self.fence.is_raised() {
            return;
        }
        match outcome {
            Some(enrichment) => self.commit_success(id, enrichment),
            None => self.commit_failure(id),
        }
    }

    /// One enrichment attempt: read the body, call the service, persist.
    ///
    /// Returns the enrichment on success, `None` on any failure. The
    /// write-through is best-effort; a failed write costs one re-fetch
    /// on the next cold load, not the result already in hand.
    async fn fetch_one(&self, id: NoteId) -> Option<Enrichment> {
        // A note with no readable body has nothing to enrich; it fails
        // without ever touching the network.
        let body = match self.store.read_note_body(id).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                warn!("note {id} has no body to enrich");
                return None;
            }
            Err(e) => {
                warn!("reading body for note {id} failed: {e}");
                return None;
            }
        };

        let context = build_context_window(&self.snapshot(), id, self.context_limit);
        let media_dir = self.store.media_dir(id);
        let settings = self.session.settings();
        debug!("fetching enrichment for note {id} with {} context entries", context.len());

        let enrichment = match self
            .client
            .fetch_enrichment(id, &body, &media_dir, &context, &settings)
            .await
        {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!("enrichment fetch for note {id} failed: {e}");
                return None;
            }
        };

        if self.fence.is_raised() {
            return None;
        }
        if let Err(e) = self.store.write_enrichment(id, &enrichment).await {
            warn!("persisting enrichment for note {id} failed: {e}");
        }
        Some(enrichment)
    }

    fn commit_success(&self, id: NoteId, enrichment: Enrichment) {
        if let Some(mut record) = self.records.get_mut(&id) {
            record.enrichment = Some(enrichment);
            record.fetch = FetchState::Idle;
        }
        self.bump_version();
    }

    fn commit_failure(&self, id: NoteId) {
        if let Some(mut record) = self.records.get_mut(&id) {
            // A record that picked up an enrichment elsewhere stays good
            if record.enrichment.is_none() {
                record.fetch = FetchState::Error;
            } else {
                record.fetch = FetchState::Idle;
            }
        }
        self.bump_version();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, MockClient};
    use crate::session::Settings;
    use crate::store::{DraftItem, FsStore};
    use tempfile::TempDir;

    fn enrichment(tag: &str) -> Enrichment {
        Enrichment {
            title: format!("title-{tag}"),
            summary: format!("summary-{tag}"),
            raw_text: None,
        }
    }

    async fn note_with_text(store: &FsStore, text: &str) -> NoteId {
        store
            .create_note(vec![DraftItem::Text { text: text.to_string() }])
            .await
            .unwrap()
    }

    fn cache_over(store: FsStore, client: MockClient) -> Arc<NoteCache> {
        Arc::new(NoteCache::new(
            Arc::new(store),
            Arc::new(client),
            Arc::new(SessionContext::new(Settings::default())),
        ))
    }

    #[tokio::test]
    async fn load_returns_immediately_with_fetching_marks() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        let id = note_with_text(&store, "first").await;
        let cache = cache_over(store, MockClient::new().with_enrichment(id, enrichment("a")));

        let view = cache.load().await;
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, id);
        assert!(view[0].is_fetching());
        assert!(!view[0].enriched());

        cache.settled().await;
        let record = cache.get(id).unwrap();
        assert_eq!(record.fetch, FetchState::Idle);
        assert_eq!(record.enrichment, Some(enrichment("a")));
    }

    #[tokio::test]
    async fn fetched_enrichment_is_written_through_to_the_store() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        let id = note_with_text(&store, "persist me").await;
        let cache = cache_over(store, MockClient::new().with_enrichment(id, enrichment("a")));

        cache.load().await;
        cache.settled().await;

        let store = FsStore::open(tmp.path()).unwrap();
        assert_eq!(
            store.read_enrichment(id).await.unwrap(),
            Some(enrichment("a"))
        );
    }

    #[tokio::test]
    async fn already_enriched_notes_are_not_fetched_again() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        let id = note_with_text(&store, "done already").await;
        store.write_enrichment(id, &enrichment("old")).await.unwrap();

        let client = Arc::new(MockClient::new());
        let cache = Arc::new(NoteCache::new(
            Arc::new(store),
            client.clone(),
            Arc::new(SessionContext::new(Settings::default())),
        ));
        let view = cache.load().await;
        cache.settled().await;

        assert_eq!(view[0].fetch, FetchState::Idle);
        assert_eq!(view[0].enrichment, Some(enrichment("old")));
        assert_eq!(client.fetch_count(id), 0);
    }

    #[tokio::test]
    async fn one_failure_leaves_other_fetches_alone() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        let bad = note_with_text(&store, "will fail").await;
        let good = note_with_text(&store, "will succeed").await;

        let client = MockClient::new()
            .with_fetch_failure(bad, ClientError::Status { status: 500, message: "boom".into() })
            .with_enrichment(good, enrichment("good"));
        let cache = cache_over(store, client);

        cache.load().await;
        cache.settled().await;

        assert!(cache.get(bad).unwrap().failed());
        assert!(cache.get(bad).unwrap().enrichment.is_none());
        assert_eq!(cache.get(good).unwrap().enrichment, Some(enrichment("good")));
    }

    #[tokio::test]
    async fn a_note_without_a_body_errors_without_a_network_call() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        // A bare directory, as if a save was interrupted before note.json
        std::fs::create_dir(tmp.path().join("notes").join("12345")).unwrap();

        let client = Arc::new(MockClient::new());
        let cache = Arc::new(NoteCache::new(
            Arc::new(store),
            client.clone(),
            Arc::new(SessionContext::new(Settings::default())),
        ));

        cache.load().await;
        cache.settled().await;

        let id = NoteId::from(12345);
        assert!(cache.get(id).unwrap().failed());
        assert_eq!(client.fetch_count(id), 0);
    }

    #[tokio::test]
    async fn reload_retries_previously_failed_notes() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        let id = note_with_text(&store, "flaky").await;

        let client = Arc::new(
            MockClient::new()
                .with_fetch_failure(id, ClientError::Network("down".into())),
        );
        let cache = Arc::new(NoteCache::new(
            Arc::new(FsStore::open(tmp.path()).unwrap()),
            client.clone(),
            Arc::new(SessionContext::new(Settings::default())),
        ));

        cache.load().await;
        cache.settled().await;
        assert!(cache.get(id).unwrap().failed());
        assert_eq!(client.fetch_count(id), 1);

        cache.load().await;
        cache.settled().await;
        // The error mark was discarded and the fetch attempted again
        assert_eq!(client.fetch_count(id), 2);
    }

    #[tokio::test]
    async fn snapshot_is_always_newest_first() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        for millis in [100i64, 300, 200] {
            std::fs::create_dir(tmp.path().join("notes").join(millis.to_string())).unwrap();
        }
        let cache = cache_over(store, MockClient::new());

        cache.load().await;
        cache.settled().await;

        let order: Vec<i64> = cache
            .snapshot()
            .iter()
            .map(|r| r.id.timestamp_millis())
            .collect();
        assert_eq!(order, vec![300, 200, 100]);
    }

    #[tokio::test]
    async fn reload_if_changed_only_fires_on_the_signal() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        let session = Arc::new(SessionContext::new(Settings::default()));
        let cache = Arc::new(NoteCache::new(
            Arc::new(store),
            Arc::new(MockClient::new()),
            session.clone(),
        ));

        assert!(cache.reload_if_changed().await.is_none());

        session.mark_notes_changed();
        assert!(cache.reload_if_changed().await.is_some());
        assert!(cache.reload_if_changed().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_drops_late_results() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::open(tmp.path()).unwrap();
        let id = note_with_text(&store, "late").await;
        let cache = cache_over(store, MockClient::new().with_enrichment(id, enrichment("late")));

        // Cancel before loading: the fetch task starts, sees the token,
        // and never commits.
        cache.shutdown();
        cache.load().await;
        cache.settled().await;

        let record = cache.get(id).unwrap();
        assert!(record.is_fetching());
        assert!(record.enrichment.is_none());
    }
}
