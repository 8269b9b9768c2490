pub mod client;
pub mod metrics;
pub mod provider;
pub mod record;

pub use client::{BillingClient, FetchError};
pub use provider::{
    CheckoutOutcome, LoadStatus, SubscriptionProvider, SubscriptionSnapshot, SubscriptionSource,
};
pub use record::{SubscriptionRecord, SubscriptionResponse};
