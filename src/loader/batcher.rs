//! Key batcher: coalesces the keys requested during one scheduling tick into
//! a single bulk fetch.
//!
//! # Batching window
//!
//! A batch is opened by the first `enqueue` after the previous batch was
//! dispatched. It closes when a poll of its dispatch future observes that no
//! `enqueue` call happened since the previous poll, i.e. once the scheduler
//! has gone around every ready future without any of them requesting a new
//! key. Sibling resolvers driven by the same `join_all` therefore land in the
//! same batch, whatever their number, and no timer is involved.
//!
//! # Ordering
//!
//! The bulk fetch receives the distinct keys in first-enqueue order and must
//! return one value per key in that same order. Batches of one batcher are
//! dispatched strictly one after the other.

use crate::core::error::LoaderError;
use futures::future::{BoxFuture, FutureExt, Shared};
use indexmap::IndexMap;
use std::future::poll_fn;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::Poll;

/// Pending result of one enqueued key
///
/// Enqueuing the same key twice within one batch yields clones of the same
/// shared future (see [`Shared::ptr_eq`]).
pub type LoadFuture<V> = Shared<BoxFuture<'static, Result<V, LoaderError>>>;

/// Bulk fetch function: one value per key, aligned with the key order
pub type BatchFn<V> =
    Arc<dyn Fn(Vec<String>) -> BoxFuture<'static, anyhow::Result<Vec<V>>> + Send + Sync>;

type BatchFuture<V> = Shared<BoxFuture<'static, Result<Arc<Vec<V>>, LoaderError>>>;
type SettledFuture = Shared<BoxFuture<'static, ()>>;

struct PendingBatch<V> {
    id: u64,
    dispatch: BatchFuture<V>,
    slots: IndexMap<String, LoadFuture<V>>,
}

struct BatcherState<V> {
    pending: Option<PendingBatch<V>>,
    /// Count of `enqueue` calls, duplicates included
    enqueued: u64,
    next_batch_id: u64,
    /// Resolves once the most recently opened batch has settled
    last_batch: Option<SettledFuture>,
}

/// Coalesces keys enqueued within one tick into a single bulk fetch
pub struct Batcher<V> {
    name: Arc<str>,
    fetch: BatchFn<V>,
    state: Arc<Mutex<BatcherState<V>>>,
    dispatches: Arc<AtomicUsize>,
}

impl<V> Batcher<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a batcher around a bulk fetch function
    ///
    /// `name` labels the batcher in logs and errors.
    pub fn new<F>(name: impl Into<Arc<str>>, fetch: F) -> Self
    where
        F: Fn(Vec<String>) -> BoxFuture<'static, anyhow::Result<Vec<V>>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fetch: Arc::new(fetch),
            state: Arc::new(Mutex::new(BatcherState {
                pending: None,
                enqueued: 0,
                next_batch_id: 0,
                last_batch: None,
            })),
            dispatches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bulk fetches issued so far
    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    /// Register `key` in the pending batch and return its pending result
    ///
    /// The key is registered immediately; the returned future must be polled
    /// for the batch to be dispatched. An empty key is rejected right away.
    pub fn enqueue(&self, key: impl Into<String>) -> Result<LoadFuture<V>, LoaderError> {
        let key = key.into();
        if key.is_empty() {
            return Err(LoaderError::EmptyKey {
                scope: self.name.to_string(),
            });
        }

        let mut state = lock(&self.state);
        state.enqueued += 1;
        let mut batch = match state.pending.take() {
            Some(batch) => batch,
            None => self.open_batch(&mut state),
        };

        let slot = match batch.slots.get(&key) {
            Some(existing) => existing.clone(),
            None => {
                let index = batch.slots.len();
                let scope = self.name.clone();
                let slot = batch
                    .dispatch
                    .clone()
                    .map(move |result| {
                        let values = result?;
                        values
                            .get(index)
                            .cloned()
                            .ok_or_else(|| LoaderError::ShapeMismatch {
                                scope: scope.to_string(),
                                expected: index + 1,
                                actual: values.len(),
                            })
                    })
                    .boxed()
                    .shared();
                batch.slots.insert(key, slot.clone());
                slot
            }
        };
        state.pending = Some(batch);
        Ok(slot)
    }

    /// Enqueue every key and wait for all of them, in key order
    pub async fn enqueue_many<I, K>(&self, keys: I) -> Result<Vec<V>, LoaderError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let pending = keys
            .into_iter()
            .map(|key| self.enqueue(key))
            .collect::<Result<Vec<_>, _>>()?;
        futures::future::try_join_all(pending).await
    }

    fn open_batch(&self, state: &mut BatcherState<V>) -> PendingBatch<V> {
        let id = state.next_batch_id;
        state.next_batch_id += 1;

        let previous = state.last_batch.take();
        let dispatch = dispatch_batch(
            self.name.clone(),
            self.fetch.clone(),
            Arc::downgrade(&self.state),
            id,
            previous,
            self.dispatches.clone(),
        )
        .boxed()
        .shared();
        state.last_batch = Some(dispatch.clone().map(|_| ()).boxed().shared());

        PendingBatch {
            id,
            dispatch,
            slots: IndexMap::new(),
        }
    }
}

async fn dispatch_batch<V>(
    name: Arc<str>,
    fetch: BatchFn<V>,
    state: Weak<Mutex<BatcherState<V>>>,
    id: u64,
    previous: Option<SettledFuture>,
    dispatches: Arc<AtomicUsize>,
) -> Result<Arc<Vec<V>>, LoaderError>
where
    V: Clone + Send + Sync + 'static,
{
    if let Some(previous) = previous {
        previous.await;
    }

    let mut seen = None;
    let keys = poll_fn(|cx| {
        let Some(state) = state.upgrade() else {
            return Poll::Ready(None);
        };
        let mut state = lock(&state);
        if seen == Some(state.enqueued) {
            let batch = state.pending.take_if(|batch| batch.id == id);
            return Poll::Ready(batch.map(|batch| batch.slots.into_keys().collect::<Vec<_>>()));
        }
        seen = Some(state.enqueued);
        cx.waker().wake_by_ref();
        Poll::Pending
    })
    .await
    .ok_or_else(|| LoaderError::Abandoned {
        scope: name.to_string(),
    })?;

    dispatches.fetch_add(1, Ordering::SeqCst);
    let expected = keys.len();
    tracing::debug!(scope = %name, batch = id, keys = expected, "dispatching batch");

    let values = fetch(keys).await.map_err(|cause| {
        tracing::debug!(scope = %name, batch = id, error = %cause, "bulk fetch failed");
        LoaderError::BulkFetch {
            scope: name.to_string(),
            cause: Arc::new(cause),
        }
    })?;

    if values.len() != expected {
        return Err(LoaderError::ShapeMismatch {
            scope: name.to_string(),
            expected,
            actual: values.len(),
        });
    }
    Ok(Arc::new(values))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
