//! Shared fixtures: an in-memory remote store double with failure
//! injection, plus record builders and a wired-up engine harness.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use volley_remote::{
    CreateOutcome, DeleteOutcome, Direction, Document, Filter, OrderBy, RemoteError,
    RemoteResult, RemoteStore,
};
use volley_store::LocalStore;
use volley_sync::{SyncConfig, SyncService, WatchNetworkMonitor};
use volley_types::{MatchId, PlayerId, SurvivalMatch, ThresholdMatch, Verdict};

/// In-memory [`RemoteStore`] with the same contract as the HTTP adapter:
/// idempotent creates, not-found-tolerant deletes, OR filters without
/// server ordering. `set_failing(true)` makes every call return a
/// transport fault; `set_ping_failing(true)` degrades only the
/// availability probe; the delay knobs make individual calls hang.
pub struct MockRemoteStore {
    docs: Mutex<HashMap<(String, String), Document>>,
    failing: AtomicBool,
    ping_failing: AtomicBool,
    ping_delay: Mutex<Option<Duration>>,
    create_delay: Mutex<Option<Duration>>,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub increment_calls: AtomicUsize,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            ping_failing: AtomicBool::new(false),
            ping_delay: Mutex::new(None),
            create_delay: Mutex::new(None),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            increment_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_ping_failing(&self, failing: bool) {
        self.ping_failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_ping_delay(&self, delay: Duration) {
        *self.ping_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn seed(&self, collection: &str, id: &str, doc: Document) {
        self.docs
            .lock()
            .unwrap()
            .insert((collection.to_string(), id.to_string()), doc);
    }

    pub fn doc(&self, collection: &str, id: &str) -> Option<Document> {
        self.docs
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    pub fn doc_count(&self, collection: &str) -> usize {
        self.docs
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    fn check_available(&self) -> RemoteResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable("injected fault".into()))
        } else {
            Ok(())
        }
    }
}

fn filter_matches(filter: &Filter, doc: &Document) -> bool {
    match filter {
        Filter::FieldEq { field, value } => doc.get(field) == Some(value),
        Filter::Or(parts) => parts.iter().any(|f| filter_matches(f, doc)),
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn ping(&self) -> RemoteResult<()> {
        let delay = *self.ping_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.ping_failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected probe fault".into()));
        }
        self.check_available()
    }

    async fn get(&self, collection: &str, id: &str) -> RemoteResult<Option<Document>> {
        self.check_available()?;
        Ok(self.doc(collection, id))
    }

    async fn create_with_id(
        &self,
        collection: &str,
        id: &str,
        doc: &Document,
    ) -> RemoteResult<CreateOutcome> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.create_delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.check_available()?;
        let key = (collection.to_string(), id.to_string());
        let mut docs = self.docs.lock().unwrap();
        if docs.contains_key(&key) {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            docs.insert(key, doc.clone());
            Ok(CreateOutcome::Created)
        }
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        doc: &Document,
        field_mask: &[&str],
    ) -> RemoteResult<()> {
        self.check_available()?;
        let key = (collection.to_string(), id.to_string());
        let mut docs = self.docs.lock().unwrap();
        let existing = docs
            .get_mut(&key)
            .ok_or_else(|| RemoteError::Api(format!("patch target missing: {id}")))?;
        for field in field_mask {
            if let Some(value) = doc.get(field) {
                existing.insert(*field, value.clone());
            }
        }
        Ok(())
    }

    async fn run_query(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
        limit: Option<usize>,
    ) -> RemoteResult<Vec<(String, Document)>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let docs = self.docs.lock().unwrap();
        let mut rows: Vec<(String, Document)> = docs
            .iter()
            .filter(|((c, _), _)| c == collection)
            .filter(|(_, doc)| filter.is_none_or(|f| filter_matches(f, doc)))
            .map(|((_, id), doc)| (id.clone(), doc.clone()))
            .collect();
        if let Some(order) = order_by {
            rows.sort_by_key(|(_, doc)| doc.get_i64(&order.field).unwrap_or(0));
            if order.direction == Direction::Descending {
                rows.reverse();
            }
        }
        if let Some(lim) = limit {
            rows.truncate(lim);
        }
        Ok(rows)
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<DeleteOutcome> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let key = (collection.to_string(), id.to_string());
        match self.docs.lock().unwrap().remove(&key) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn transform_increment(
        &self,
        collection: &str,
        id: &str,
        field_path: &str,
        delta: i64,
    ) -> RemoteResult<()> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let key = (collection.to_string(), id.to_string());
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.entry(key).or_default();
        let current = doc.get_i64(field_path).unwrap_or(0);
        doc.insert(field_path, current + delta);
        Ok(())
    }
}

/// Engine plus its collaborators, wired with throttling disabled.
pub struct Harness {
    pub service: Arc<SyncService>,
    pub remote: Arc<MockRemoteStore>,
    pub network: Arc<WatchNetworkMonitor>,
}

pub fn harness(online: bool) -> Harness {
    harness_with_config(online, SyncConfig::eager())
}

pub fn harness_with_config(online: bool, config: SyncConfig) -> Harness {
    let remote = Arc::new(MockRemoteStore::new());
    let network = Arc::new(WatchNetworkMonitor::new(online));
    let service = Arc::new(SyncService::new(
        LocalStore::open_in_memory().expect("in-memory store"),
        remote.clone(),
        network.clone(),
        config,
    ));
    Harness {
        service,
        remote,
        network,
    }
}

pub fn threshold(id: &str, owner: &str, opponent: &str, created_at: i64) -> ThresholdMatch {
    ThresholdMatch {
        id: MatchId::new(id),
        owner_id: PlayerId::new(owner),
        opponent_id: PlayerId::new(opponent),
        owner_score: 11,
        opponent_score: 7,
        winner_id: PlayerId::new(owner),
        elapsed_seconds: 180,
        target_threshold: Some(11),
        created_at,
        played_online: false,
        synced: false,
    }
}

pub fn survival(id: &str, owner: &str, created_at: i64) -> SurvivalMatch {
    SurvivalMatch {
        id: MatchId::new(id),
        owner_id: PlayerId::new(owner),
        verdict: Verdict::Win,
        survived_seconds: 95,
        target_seconds: Some(90),
        created_at,
        played_online: false,
        synced: false,
    }
}
