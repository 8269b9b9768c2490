//! Single source of truth for what the signed-in user may do.
//!
//! The provider owns the only write path to the cached subscription. Readers
//! get immutable [`SubscriptionSnapshot`]s through a `watch` channel, so every
//! reader sees either the old or the new state, never a mix.

use async_trait::async_trait;
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use serde::Serialize;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    subscription::{client::FetchError, metrics::METRICS, record::SubscriptionRecord},
    tiers::{EffectiveLimits, Tier, TierDefinition, definition},
    utils::logs_fmt::abbrev,
};

/// Where subscription records come from. Implemented by the REST client and
/// by in-memory fakes in tests.
#[async_trait]
pub trait SubscriptionSource: Send + Sync + 'static {
    async fn fetch_subscription(&self) -> Result<Option<SubscriptionRecord>, FetchError>;
}

#[async_trait]
impl<T: SubscriptionSource + ?Sized> SubscriptionSource for Arc<T> {
    async fn fetch_subscription(&self) -> Result<Option<SubscriptionRecord>, FetchError> {
        (**self).fetch_subscription().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// Nothing fetched yet.
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSnapshot {
    record: Option<SubscriptionRecord>,
    status: LoadStatus,
    #[serde(skip)]
    last_error: Option<FetchError>,
    /// Sequence number of the fetch that produced this snapshot.
    generation: u64,
}

impl SubscriptionSnapshot {
    pub fn empty() -> Self {
        Self {
            record: None,
            status: LoadStatus::Idle,
            last_error: None,
            generation: 0,
        }
    }

    /// A settled snapshot built from a known record, for callers that
    /// already hold one (CLI overrides, previews).
    pub fn from_record(record: Option<SubscriptionRecord>) -> Self {
        Self {
            record,
            status: LoadStatus::Ready,
            last_error: None,
            generation: 0,
        }
    }

    pub fn record(&self) -> Option<&SubscriptionRecord> {
        self.record.as_ref()
    }

    /// `None` when there is no active subscription, including while the
    /// first fetch is pending or after a failed one.
    pub fn effective_tier(&self) -> Option<Tier> {
        self.record.as_ref().and_then(SubscriptionRecord::effective_tier)
    }

    pub fn is_active(&self) -> bool {
        self.effective_tier().is_some()
    }

    pub fn limits(&self) -> EffectiveLimits {
        self.record
            .as_ref()
            .map(SubscriptionRecord::limits)
            .unwrap_or(EffectiveLimits::none())
    }

    pub fn definition(&self) -> Option<&'static TierDefinition> {
        self.effective_tier().map(definition)
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for SubscriptionSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// How the user came back from a hosted billing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Success,
    Cancelled,
    PortalReturn,
}

type RefetchFuture = Shared<BoxFuture<'static, Result<(), FetchError>>>;

struct InFlight {
    seq: u64,
    fut: RefetchFuture,
}

struct Inner<S> {
    source: S,
    state: watch::Sender<SubscriptionSnapshot>,
    in_flight: Mutex<Option<InFlight>>,
    next_seq: AtomicU64,
}

/// Held by a fetch task. Frees the in-flight slot however the task ends, and
/// fails the snapshot closed if the task ends without a result.
struct FetchGuard<'a, S> {
    inner: &'a Inner<S>,
    seq: u64,
    settled: bool,
}

impl<S> Drop for FetchGuard<'_, S> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(seq = self.seq, "Subscription fetch ended without a result");
            self.inner
                .apply(self.seq, &Err(FetchError::Interrupted("fetch task dropped".into())));
        }

        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|f| f.seq == self.seq) {
            slot.take();
        }
    }
}

pub struct SubscriptionProvider<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for SubscriptionProvider<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: SubscriptionSource> SubscriptionProvider<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(SubscriptionSnapshot::empty());
        Self {
            inner: Arc::new(Inner {
                source,
                state,
                in_flight: Mutex::new(None),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Initial load when the host screen comes up.
    pub async fn mount(&self) -> Result<(), FetchError> {
        self.refetch().await
    }

    /// Reloads the subscription. Concurrent callers share one request and
    /// all receive its result. Errors are already reflected in the snapshot
    /// (as "no subscription"); the return value is only for toasts.
    ///
    /// The request runs on its own tokio task, so a caller that gives up
    /// waiting does not stall it for the others.
    pub async fn refetch(&self) -> Result<(), FetchError> {
        let fut = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match slot.as_ref() {
                Some(in_flight) => {
                    METRICS.coalesced_refetches.inc();
                    debug!(seq = in_flight.seq, "Joining in-flight subscription fetch");
                    in_flight.fut.clone()
                }
                None => self.start_fetch(&mut slot),
            }
        };

        fut.await
    }

    /// Starts a new request even if one is in flight. The older request
    /// still answers its own callers, but its result is dropped if it lands
    /// after this one.
    pub async fn refetch_fresh(&self) -> Result<(), FetchError> {
        let fut = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.start_fetch(&mut slot)
        };

        fut.await
    }

    /// Called when the user lands back from checkout or the billing portal.
    /// A fetch started before the plan changed may carry the old plan, so
    /// anything but a cancelled checkout forces a fresh request.
    pub async fn handle_checkout_return(&self, outcome: CheckoutOutcome) -> Result<(), FetchError> {
        info!(outcome = ?outcome, "Returned from billing, refreshing subscription");
        match outcome {
            CheckoutOutcome::Cancelled => self.refetch().await,
            CheckoutOutcome::Success | CheckoutOutcome::PortalReturn => self.refetch_fresh().await,
        }
    }

    fn start_fetch(&self, slot: &mut Option<InFlight>) -> RefetchFuture {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self.inner.clone();

        let task = tokio::spawn(async move {
            let mut guard = FetchGuard {
                inner: &*inner,
                seq,
                settled: false,
            };
            let result = inner.fetch_and_apply(seq).await;
            guard.settled = true;
            result
        });

        let fut = async move {
            task.await
                .unwrap_or_else(|e| Err(FetchError::Interrupted(e.to_string())))
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            seq,
            fut: fut.clone(),
        });
        fut
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    pub fn snapshot(&self) -> SubscriptionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubscriptionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn current_subscription(&self) -> Option<SubscriptionRecord> {
        self.inner.state.borrow().record.clone()
    }

    pub fn effective_tier(&self) -> Option<Tier> {
        self.inner.state.borrow().effective_tier()
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.borrow().is_active()
    }

    pub fn limits(&self) -> EffectiveLimits {
        self.inner.state.borrow().limits()
    }

    pub fn last_error(&self) -> Option<FetchError> {
        self.inner.state.borrow().last_error.clone()
    }
}

impl<S: SubscriptionSource> Inner<S> {
    async fn fetch_and_apply(&self, seq: u64) -> Result<(), FetchError> {
        self.state.send_if_modified(|snap| {
            if seq <= snap.generation {
                return false;
            }
            snap.status = LoadStatus::Loading;
            true
        });
        METRICS.fetches.inc();

        let result = self.source.fetch_subscription().await;

        if let Err(e) = &result {
            METRICS.fetch_errors.inc();
            warn!(error = %e, transient = e.is_transient(), "Subscription fetch failed, denying gated actions");
        }

        if self.apply(seq, &result) {
            match &result {
                Ok(Some(record)) => info!(
                    tier = %record.tier,
                    active = record.is_active,
                    customer = %record.stripe_customer_id.as_deref().map(abbrev).unwrap_or_default(),
                    "Subscription loaded"
                ),
                Ok(None) => info!("No subscription on record"),
                Err(_) => {}
            }
        }

        result.map(|_| ())
    }
}

impl<S> Inner<S> {
    /// Publishes the result of fetch `seq` unless a newer fetch already
    /// landed. Returns whether the snapshot changed.
    fn apply(&self, seq: u64, result: &Result<Option<SubscriptionRecord>, FetchError>) -> bool {
        self.state.send_if_modified(|snap| {
            if seq <= snap.generation {
                METRICS.stale_results.inc();
                debug!(seq, applied = snap.generation, "Dropping stale subscription result");
                return false;
            }

            snap.generation = seq;
            match result {
                Ok(record) => {
                    snap.record = record.clone();
                    snap.status = LoadStatus::Ready;
                    snap.last_error = None;
                }
                Err(e) => {
                    snap.record = None;
                    snap.status = LoadStatus::Failed;
                    snap.last_error = Some(e.clone());
                }
            }
            true
        })
    }
}
