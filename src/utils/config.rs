use serde::Deserialize;

use crate::utils::error::PrintpassError;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST backend, e.g. "https://api.example.com/v1"
    pub api_base_url: String,

    /// Session token issued by the auth provider, sent as a bearer token
    pub api_token: String,

    /// The signed-in user whose subscription is being gated
    pub user_id: String,

    /// Per-request timeout in ms for backend calls
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long idle keep-alive connections to the backend are kept
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

impl ClientConfig {
    /// Reads `PRINTPASS_*` variables, after loading a `.env` file if present.
    pub fn load() -> Result<Self, PrintpassError> {
        dotenvy::dotenv().ok();

        let cfg: ClientConfig = config::Config::builder()
            .add_source(config::Environment::with_prefix("PRINTPASS"))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PrintpassError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(PrintpassError::InvalidConfig(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }

        if self.api_token.trim().is_empty() {
            return Err(PrintpassError::InvalidConfig(
                "api_token must not be empty".to_string(),
            ));
        }

        if self.user_id.trim().is_empty() {
            return Err(PrintpassError::InvalidConfig(
                "user_id must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_pool_idle_timeout_secs() -> u64 {
    90
}
