use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use printpass::gating::{GateState, Resource, UpgradePrompt};
use printpass::subscription::metrics::METRICS;
use printpass::subscription::{
    CheckoutOutcome, FetchError, LoadStatus, SubscriptionProvider, SubscriptionRecord,
    SubscriptionSource,
};
use printpass::tiers::{EffectiveLimits, Limit, Tier};

type FetchResult = Result<Option<SubscriptionRecord>, FetchError>;

/// Replays queued results, each after its own delay; returns "no
/// subscription" once the queue is empty.
struct ScriptedSource {
    script: Mutex<VecDeque<(Duration, FetchResult)>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(responses: Vec<FetchResult>) -> Arc<Self> {
        Self::with_delay(responses, Duration::ZERO)
    }

    fn with_delay(responses: Vec<FetchResult>, delay: Duration) -> Arc<Self> {
        Self::with_script(responses.into_iter().map(|r| (delay, r)).collect())
    }

    fn with_script(script: Vec<(Duration, FetchResult)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionSource for ScriptedSource {
    async fn fetch_subscription(&self) -> FetchResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(None)));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

fn active(tier: Tier) -> FetchResult {
    Ok(Some(SubscriptionRecord {
        tier,
        is_active: true,
        current_period_end: None,
        stripe_customer_id: Some("cus_test_0000000001".to_string()),
    }))
}

fn inactive(tier: Tier) -> FetchResult {
    Ok(Some(SubscriptionRecord {
        tier,
        is_active: false,
        current_period_end: None,
        stripe_customer_id: None,
    }))
}

#[tokio::test]
async fn starts_idle_and_denies_before_first_fetch() {
    let provider = SubscriptionProvider::new(ScriptedSource::new(vec![]));
    let snap = provider.snapshot();

    assert_eq!(snap.status(), LoadStatus::Idle);
    assert_eq!(snap.effective_tier(), None);
    assert_eq!(snap.limits(), EffectiveLimits::none());
    assert!(!snap.gate(Resource::Niches, 0).allowed);
}

#[tokio::test]
async fn mount_loads_tier_and_limits() {
    let provider = SubscriptionProvider::new(ScriptedSource::new(vec![active(Tier::Premium)]));
    provider.mount().await.unwrap();

    assert_eq!(provider.effective_tier(), Some(Tier::Premium));
    assert!(provider.is_active());
    assert_eq!(provider.limits().max_niches, Limit::Finite(15));
    assert_eq!(provider.snapshot().status(), LoadStatus::Ready);
    assert_eq!(provider.current_subscription().unwrap().tier, Tier::Premium);
}

#[tokio::test]
async fn inactive_record_denies_with_subscribe_prompt() {
    let provider = SubscriptionProvider::new(ScriptedSource::new(vec![inactive(Tier::Vip)]));
    provider.mount().await.unwrap();
    let snap = provider.snapshot();

    assert!(snap.record().is_some());
    assert!(!snap.is_active());
    for usage in [0, 3, 100] {
        let d = snap.gate(Resource::Niches, usage);
        assert!(!d.allowed);
        assert_eq!(d.state, GateState::NoSubscription);
        assert_eq!(d.upgrade, Some(UpgradePrompt::Subscribe));
    }
}

#[tokio::test]
async fn basis_fills_up_and_suggests_premium() {
    let provider = SubscriptionProvider::new(ScriptedSource::new(vec![
        active(Tier::Basis),
        active(Tier::Basis),
    ]));
    provider.mount().await.unwrap();

    let d = provider.snapshot().gate(Resource::Niches, 4);
    assert!(d.allowed);
    assert!(d.state.is_under_limit());

    // Niche saved; the server now reports 5.
    provider.refetch().await.unwrap();
    let d = provider.snapshot().gate(Resource::Niches, 5);
    assert_eq!(d.state, GateState::AtLimit);
    assert!(!d.allowed);
    assert_eq!(d.upgrade, Some(UpgradePrompt::UpgradeTo(Tier::Premium)));
}

#[tokio::test]
async fn vip_is_never_near_limit() {
    let provider = SubscriptionProvider::new(ScriptedSource::new(vec![active(Tier::Vip)]));
    provider.mount().await.unwrap();
    let snap = provider.snapshot();

    for usage in [0, 4, 5, 80, 1_000_000] {
        let d = snap.gate(Resource::Niches, usage);
        assert_eq!(d.state, GateState::UnderLimit);
        assert!(!d.is_near_limit());
    }
}

#[tokio::test]
async fn fetch_error_fails_closed_then_recovers_on_refetch() {
    let source = ScriptedSource::new(vec![
        Err(FetchError::Unreachable("connection refused".into())),
        active(Tier::Basis),
    ]);
    let provider = SubscriptionProvider::new(source.clone());

    let err = provider.mount().await.unwrap_err();
    assert!(err.is_transient());

    let snap = provider.snapshot();
    assert_eq!(snap.status(), LoadStatus::Failed);
    assert_eq!(snap.effective_tier(), None);
    assert!(!snap.is_active());
    assert_eq!(snap.last_error(), Some(&err));
    assert!(!snap.gate(Resource::Niches, 0).allowed);
    assert!(!snap.gate(Resource::Products, 0).allowed);

    provider.refetch().await.unwrap();
    let snap = provider.snapshot();
    assert_eq!(snap.effective_tier(), Some(Tier::Basis));
    assert!(snap.last_error().is_none());
    assert!(snap.gate(Resource::Niches, 2).allowed);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn failed_refetch_drops_a_previously_good_tier() {
    let provider = SubscriptionProvider::new(ScriptedSource::new(vec![
        active(Tier::Vip),
        Err(FetchError::ApiError(401)),
    ]));
    provider.mount().await.unwrap();
    assert_eq!(provider.effective_tier(), Some(Tier::Vip));

    assert_eq!(provider.refetch().await, Err(FetchError::ApiError(401)));
    assert_eq!(provider.effective_tier(), None);
    assert_eq!(provider.limits(), EffectiveLimits::none());
}

#[tokio::test]
async fn concurrent_refetches_share_one_request() {
    let source = ScriptedSource::with_delay(vec![active(Tier::Premium)], Duration::from_millis(50));
    let provider = SubscriptionProvider::new(source.clone());

    let results = futures::future::join_all((0..5).map(|_| provider.refetch())).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(source.calls(), 1);
    assert_eq!(provider.effective_tier(), Some(Tier::Premium));
}

#[tokio::test]
async fn coalesced_callers_see_the_same_error() {
    let source = ScriptedSource::with_delay(
        vec![Err(FetchError::ApiError(503))],
        Duration::from_millis(30),
    );
    let provider = SubscriptionProvider::new(source.clone());

    let (a, b) = tokio::join!(provider.refetch(), provider.refetch());
    assert_eq!(a, Err(FetchError::ApiError(503)));
    assert_eq!(a, b);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn spawned_refetches_coalesce_across_tasks() {
    let source = ScriptedSource::with_delay(vec![active(Tier::Basis)], Duration::from_millis(50));
    let provider = SubscriptionProvider::new(source.clone());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let p = provider.clone();
            tokio::spawn(async move { p.refetch().await })
        })
        .collect();
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn sequential_refetches_each_hit_the_backend() {
    let source = ScriptedSource::new(vec![active(Tier::Basis), active(Tier::Premium)]);
    let provider = SubscriptionProvider::new(source.clone());

    provider.refetch().await.unwrap();
    let first = provider.snapshot().generation();
    provider.refetch().await.unwrap();

    assert_eq!(source.calls(), 2);
    assert!(provider.snapshot().generation() > first);
    assert_eq!(provider.effective_tier(), Some(Tier::Premium));
}

#[tokio::test]
async fn checkout_return_picks_up_the_new_plan() {
    let provider = SubscriptionProvider::new(ScriptedSource::new(vec![
        Ok(None),
        active(Tier::Premium),
    ]));
    provider.mount().await.unwrap();
    assert!(!provider.is_active());

    provider
        .handle_checkout_return(CheckoutOutcome::Success)
        .await
        .unwrap();
    assert_eq!(provider.effective_tier(), Some(Tier::Premium));
}

#[tokio::test]
async fn watchers_observe_the_settled_snapshot() {
    let provider = SubscriptionProvider::new(ScriptedSource::new(vec![active(Tier::Vip)]));
    let mut rx = provider.subscribe();

    provider.mount().await.unwrap();

    assert!(rx.has_changed().unwrap());
    let snap = rx.borrow_and_update().clone();
    assert_eq!(snap.status(), LoadStatus::Ready);
    assert_eq!(snap.effective_tier(), Some(Tier::Vip));
}

#[tokio::test]
async fn abandoned_refetch_still_settles_and_frees_the_slot() {
    let source = ScriptedSource::with_script(vec![
        (Duration::from_millis(100), active(Tier::Basis)),
        (Duration::ZERO, active(Tier::Premium)),
    ]);
    let provider = SubscriptionProvider::new(source.clone());

    let gave_up = tokio::time::timeout(Duration::from_millis(10), provider.refetch()).await;
    assert!(gave_up.is_err());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(provider.snapshot().status(), LoadStatus::Ready);
    assert_eq!(provider.effective_tier(), Some(Tier::Basis));

    provider.refetch().await.unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(provider.effective_tier(), Some(Tier::Premium));
}

#[tokio::test]
async fn aborted_caller_task_does_not_cancel_the_shared_fetch() {
    let source = ScriptedSource::with_delay(vec![active(Tier::Basis)], Duration::from_millis(60));
    let provider = SubscriptionProvider::new(source.clone());

    let p = provider.clone();
    let handle = tokio::spawn(async move { p.refetch().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    assert_eq!(provider.snapshot().status(), LoadStatus::Loading);

    provider.refetch().await.unwrap();
    assert_eq!(source.calls(), 1);
    assert_eq!(provider.snapshot().status(), LoadStatus::Ready);
    assert_eq!(provider.effective_tier(), Some(Tier::Basis));
}

#[tokio::test]
async fn checkout_return_supersedes_a_slow_pre_checkout_fetch() {
    let source = ScriptedSource::with_script(vec![
        (Duration::from_millis(100), active(Tier::Basis)),
        (Duration::ZERO, active(Tier::Premium)),
    ]);
    let provider = SubscriptionProvider::new(source.clone());
    let stale_before = METRICS.stale_results.get();

    let p = provider.clone();
    let slow = tokio::spawn(async move { p.refetch().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    provider
        .handle_checkout_return(CheckoutOutcome::Success)
        .await
        .unwrap();
    assert_eq!(provider.effective_tier(), Some(Tier::Premium));

    // The old request still answers its caller, but its result lands late.
    slow.await.unwrap().unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(provider.effective_tier(), Some(Tier::Premium));
    assert_eq!(provider.snapshot().generation(), 2);
    assert!(METRICS.stale_results.get() > stale_before);
}

#[tokio::test]
async fn cancelled_checkout_joins_the_in_flight_fetch() {
    let source = ScriptedSource::with_delay(vec![active(Tier::Basis)], Duration::from_millis(50));
    let provider = SubscriptionProvider::new(source.clone());

    let (a, b) = tokio::join!(
        provider.refetch(),
        provider.handle_checkout_return(CheckoutOutcome::Cancelled)
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(source.calls(), 1);
}
