use once_cell::sync::Lazy;
use prometheus::{Counter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct SubscriptionMetrics {
    pub fetches: Counter,
    pub fetch_errors: Counter,
    pub coalesced_refetches: Counter,
    pub stale_results: Counter,
    /// Labelled by gate kind (`limit`, `platform`, `feature`). Counts attempts,
    /// not renders.
    pub gate_denied: IntCounterVec,
    registry: Registry,
}

impl SubscriptionMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        let fetches = Counter::new(
            "printpass_subscription_fetch_total",
            "Subscription fetches sent to the backend",
        )
        .unwrap();
        let fetch_errors = Counter::new(
            "printpass_subscription_fetch_errors_total",
            "Subscription fetches that failed",
        )
        .unwrap();
        let coalesced_refetches = Counter::new(
            "printpass_subscription_refetch_coalesced_total",
            "Refetch calls that joined an in-flight request",
        )
        .unwrap();
        let stale_results = Counter::new(
            "printpass_subscription_stale_results_total",
            "Fetch results dropped because a newer one was already applied",
        )
        .unwrap();
        let gate_denied = IntCounterVec::new(
            Opts::new("printpass_gate_denied_total", "Attempted gated actions that were denied"),
            &["gate"],
        )
        .unwrap();

        registry.register(Box::new(fetches.clone())).unwrap();
        registry.register(Box::new(fetch_errors.clone())).unwrap();
        registry
            .register(Box::new(coalesced_refetches.clone()))
            .unwrap();
        registry.register(Box::new(stale_results.clone())).unwrap();
        registry.register(Box::new(gate_denied.clone())).unwrap();

        Self {
            fetches,
            fetch_errors,
            coalesced_refetches,
            stale_results,
            gate_denied,
            registry,
        }
    }

    pub fn record_denied(&self, gate: &str) {
        self.gate_denied.with_label_values(&[gate]).inc();
    }

    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder.encode_to_string(&families).unwrap_or_default()
    }
}

pub static METRICS: Lazy<SubscriptionMetrics> = Lazy::new(SubscriptionMetrics::new);
