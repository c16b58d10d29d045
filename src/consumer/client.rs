//! Trigger interface: start, stop and observe category scans.

use super::channel::{EventChannel, EventStream};
use super::session::{Applied, ProgressSnapshot, ScanSession};
use crate::config::Credentials;
use crate::error::{ChannelError, ConfigResult, StoreResult};
use crate::protocol::ScanEvent;
use crate::storage::ResultStore;
use crate::types::{Category, ResultSet, ScanId};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Identifies one started scan session.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    id: ScanId,
    category: Category,
    token: CancellationToken,
}

impl ScanHandle {
    pub fn id(&self) -> ScanId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

type SharedSession = Arc<Mutex<ScanSession>>;

/// Serializes result writes of one category across scan restarts.
type Writer = Arc<Mutex<()>>;

#[derive(Debug)]
struct Slot {
    session: SharedSession,
    writer: Writer,
    handle: Option<ScanHandle>,
    pump: Option<JoinHandle<()>>,
}

impl Slot {
    fn new(category: Category) -> Self {
        Self {
            session: Arc::new(Mutex::new(ScanSession::new(category))),
            writer: Writer::default(),
            handle: None,
            pump: None,
        }
    }
}

/// Consumer of category scans.
///
/// Owns one [`ScanSession`] per category and a pump task per active scan
/// that feeds channel events into it. Sessions are independent: starting or
/// stopping one category never touches another.
pub struct AuditClient {
    channel: Arc<dyn EventChannel>,
    credentials: Credentials,
    store: Option<ResultStore>,
    slots: HashMap<Category, Slot>,
}

impl AuditClient {
    /// Create a client. Credentials are validated here and again on every start.
    pub fn new(channel: Arc<dyn EventChannel>, credentials: Credentials) -> ConfigResult<Self> {
        credentials.validate()?;
        let slots = Category::ALL
            .into_iter()
            .map(|category| (category, Slot::new(category)))
            .collect();

        Ok(Self {
            channel,
            credentials,
            store: None,
            slots,
        })
    }

    /// Persist results to `store`, restoring whatever it already holds.
    pub fn with_store(mut self, store: ResultStore) -> StoreResult<Self> {
        for results in store.load_all()? {
            let category = results.category();
            debug!(%category, records = results.len(), "restored stored results");
            *lock(&self.slot(category).session) = ScanSession::restored(results);
        }
        self.store = Some(store);
        Ok(self)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Start a fresh scan of `category`, restarting any running one.
    ///
    /// Prior results are cleared before the first new record arrives. Fails
    /// synchronously, opening no channel, when the credentials are invalid.
    /// Must be called within a tokio runtime.
    pub fn start_scan(&mut self, category: Category) -> ConfigResult<ScanHandle> {
        self.credentials.validate()?;
        self.stop_category(category);

        let handle = ScanHandle {
            id: ScanId::new(),
            category,
            token: CancellationToken::new(),
        };
        info!(%category, id = %handle.id.short(), "starting scan");

        let channel = Arc::clone(&self.channel);
        let credentials = self.credentials.clone();
        let store = self.store.clone();
        let token = handle.token.clone();

        let slot = self.slot_mut(category);
        lock(&slot.session).begin(handle.id);
        let session = Arc::clone(&slot.session);
        let store = store.map(|store| (store, Arc::clone(&slot.writer)));
        slot.pump = Some(tokio::spawn(pump(
            channel,
            credentials,
            category,
            session,
            store,
            token,
        )));
        slot.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Stop the scan `handle` started. A stale or repeated stop does nothing.
    pub fn stop_scan(&mut self, handle: &ScanHandle) -> bool {
        let current = self
            .slot(handle.category)
            .handle
            .as_ref()
            .map(|h| h.id);
        if current != Some(handle.id) {
            return false;
        }
        self.stop_category(handle.category)
    }

    /// Stop whatever scan of `category` is running.
    pub fn stop_category(&mut self, category: Category) -> bool {
        let slot = self.slot_mut(category);
        let Some(handle) = slot.handle.take() else {
            return false;
        };
        handle.token.cancel();
        lock(&slot.session).cancel();
        info!(%category, id = %handle.id.short(), "scan stopped");
        true
    }

    /// Stop every running scan.
    pub fn stop_all(&mut self) {
        for category in Category::ALL {
            self.stop_category(category);
        }
    }

    /// Wait until the pump of `category` exits.
    pub async fn wait(&mut self, category: Category) {
        if let Some(pump) = self.slot_mut(category).pump.take() {
            if let Err(e) = pump.await {
                warn!(%category, error = %e, "event pump ended abnormally");
            }
        }
    }

    pub fn is_scanning(&self, category: Category) -> bool {
        lock(&self.slot(category).session).is_scanning()
    }

    pub fn progress(&self, category: Category) -> ProgressSnapshot {
        lock(&self.slot(category).session).snapshot()
    }

    /// Copy of the accumulated results of `category`.
    pub fn results(&self, category: Category) -> ResultSet {
        lock(&self.slot(category).session).results().clone()
    }

    /// Stop everything and drop all results, stored ones included.
    pub fn clear(&mut self) -> StoreResult<usize> {
        self.stop_all();
        // Holding every writer lets in-flight saves land before the files go.
        let _writers: Vec<_> = self
            .slots
            .values()
            .map(|slot| {
                lock(&slot.session).reset();
                slot.writer.lock().unwrap_or_else(PoisonError::into_inner)
            })
            .collect();
        match &self.store {
            Some(store) => store.clear(),
            None => Ok(0),
        }
    }

    fn slot(&self, category: Category) -> &Slot {
        // Every category gets a slot in `new`.
        &self.slots[&category]
    }

    fn slot_mut(&mut self, category: Category) -> &mut Slot {
        self.slots
            .entry(category)
            .or_insert_with(|| Slot::new(category))
    }
}

impl Drop for AuditClient {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn lock(session: &SharedSession) -> MutexGuard<'_, ScanSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feed one channel's events into its session until a terminal event,
/// a lost connection, or cancellation.
async fn pump(
    channel: Arc<dyn EventChannel>,
    credentials: Credentials,
    category: Category,
    session: SharedSession,
    store: Option<(ResultStore, Writer)>,
    token: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        opened = channel.open(category, &credentials) => opened,
    };

    let mut events: EventStream = match opened {
        Ok(events) => events,
        Err(e) => {
            warn!(%category, error = %e, "could not open event channel");
            if !token.is_cancelled() {
                lock(&session).fail(e.to_string());
            }
            return;
        }
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = events.next() => next,
        };
        match handle_next(category, &session, store.is_some(), &token, next) {
            Step::Continue => {}
            Step::Persist(results) => {
                if let Some((store, writer)) = &store {
                    persist(category, store, writer, &token, results).await;
                }
            }
            Step::Stop => break,
        }
    }
    debug!(%category, "event pump finished");
}

/// What the pump does after one event has been applied.
#[derive(Debug)]
enum Step {
    Continue,
    /// Records were appended; write this snapshot out.
    Persist(ResultSet),
    Stop,
}

fn handle_next(
    category: Category,
    session: &SharedSession,
    persisting: bool,
    token: &CancellationToken,
    next: Option<Result<ScanEvent, ChannelError>>,
) -> Step {
    let mut session = lock(session);
    if token.is_cancelled() {
        return Step::Stop;
    }

    match next {
        Some(Ok(event)) => {
            let terminal = event.is_terminal();
            let applied = session.apply(event);
            if terminal {
                return Step::Stop;
            }
            if persisting && matches!(applied, Applied::Appended(_)) {
                return Step::Persist(session.results().clone());
            }
            Step::Continue
        }
        Some(Err(ChannelError::Protocol(e))) => {
            warn!(%category, error = %e, "dropping malformed event");
            Step::Continue
        }
        Some(Err(e)) => {
            warn!(%category, error = %e, "event channel failed");
            session.connection_lost();
            Step::Stop
        }
        None => {
            session.connection_lost();
            Step::Stop
        }
    }
}

/// Write `results` on the blocking pool. Skipped once the scan is cancelled,
/// so a stopped or cleared scan is never written back.
async fn persist(
    category: Category,
    store: &ResultStore,
    writer: &Writer,
    token: &CancellationToken,
    results: ResultSet,
) {
    let store = store.clone();
    let writer = Arc::clone(writer);
    let token = token.clone();
    let saved = tokio::task::spawn_blocking(move || {
        let _writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            return Ok(());
        }
        store.save(&results)
    })
    .await;

    match saved {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(%category, error = %e, "failed to persist results"),
        Err(e) => warn!(%category, error = %e, "persist task ended abnormally"),
    }
}
