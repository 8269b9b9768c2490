use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use crate::{
    subscription::{
        provider::SubscriptionSource,
        record::{SubscriptionRecord, SubscriptionResponse},
    },
    tiers::Tier,
    utils::{config::ClientConfig, error::PrintpassError},
};

#[derive(Debug, Serialize)]
pub struct CheckoutSessionRequest<'a> {
    pub user_id: &'a str,
    pub tier: Tier,
}

#[derive(Debug, Serialize)]
pub struct PortalSessionRequest<'a> {
    pub user_id: &'a str,
    pub return_url: &'a str,
}

/// Hosted checkout or portal page to redirect the user to.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionUrl {
    pub url: String,
}

/// REST client for the billing endpoints of the backend.
pub struct BillingClient {
    client: Client,
    base_url: String,
    api_token: String,
    user_id: String,
}

impl BillingClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self, PrintpassError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(cfg.pool_idle_timeout_secs))
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .use_rustls_tls()
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.base_url().to_string(),
            api_token: cfg.api_token.clone(),
            user_id: cfg.user_id.clone(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// `Ok(None)` when the backend has no subscription for the user.
    #[instrument(skip(self), fields(user = %self.user_id))]
    pub async fn get_subscription(&self) -> Result<Option<SubscriptionRecord>, FetchError> {
        let url = format!("{}/subscriptions/{}", self.base_url, self.user_id);

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Subscription API unreachable");
                FetchError::Unreachable(e.to_string())
            })?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!("No subscription on record");
            return Ok(None);
        }

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "Subscription API returned non-2xx");
            return Err(FetchError::ApiError(resp.status().as_u16()));
        }

        let body = resp.json::<SubscriptionResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse subscription response");
            FetchError::ParseError(e.to_string())
        })?;

        SubscriptionRecord::try_from(body).map(Some)
    }

    /// Starts a hosted checkout for `tier` and returns the redirect URL.
    pub async fn create_checkout_session(&self, tier: Tier) -> Result<String, PrintpassError> {
        let url = format!("{}/billing/checkout-session", self.base_url);
        let body = CheckoutSessionRequest {
            user_id: &self.user_id,
            tier,
        };
        self.post_for_session(&url, &body).await
    }

    /// Opens the hosted billing portal; the provider sends the user back to
    /// `return_url` afterwards.
    pub async fn create_portal_session(&self, return_url: &str) -> Result<String, PrintpassError> {
        let url = format!("{}/billing/portal-session", self.base_url);
        let body = PortalSessionRequest {
            user_id: &self.user_id,
            return_url,
        };
        self.post_for_session(&url, &body).await
    }

    async fn post_for_session<B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<String, PrintpassError> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(status = %status, url = %url, "Billing session request failed");
            return Err(PrintpassError::Billing(format!("HTTP {}: {}", status.as_u16(), text)));
        }

        let session: SessionUrl = resp.json().await?;
        if session.url.is_empty() {
            return Err(PrintpassError::Billing(
                "backend returned an empty session url".to_string(),
            ));
        }

        Ok(session.url)
    }
}

#[async_trait]
impl SubscriptionSource for BillingClient {
    async fn fetch_subscription(&self) -> Result<Option<SubscriptionRecord>, FetchError> {
        self.get_subscription().await
    }
}

/// Why the subscription could not be loaded. Recoverable: the provider
/// falls back to "no subscription" and the caller may retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Subscription API unreachable: {0}")]
    Unreachable(String),
    #[error("Subscription API error: HTTP {0}")]
    ApiError(u16),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Backend reported unknown tier {0:?}")]
    UnknownTier(String),
    /// The fetch task died before it produced a result.
    #[error("Subscription fetch interrupted: {0}")]
    Interrupted(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Unreachable(_)
                | FetchError::ApiError(500..=599)
                | FetchError::Interrupted(_)
        )
    }
}
