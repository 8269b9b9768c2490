use crate::subscription::client::FetchError;

/// Crate-level error.
///
/// The `Unknown*` variants are programming or configuration mistakes and
/// are meant to surface loudly. Hitting a plan limit is never represented
/// here; gates return decisions instead.
#[derive(Debug)]
pub enum PrintpassError {
    UnknownTier(String),
    UnknownPlatform(String),
    UnknownFeature(String),
    UnknownResource(String),
    InvalidConfig(String),
    ConfigError(config::ConfigError),
    Fetch(FetchError),
    Billing(String),
    HttpError(reqwest::Error),
    SerdeError(serde_json::Error),
}

impl std::fmt::Display for PrintpassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrintpassError::UnknownTier(key) => write!(f, "Unknown tier: {:?}", key),
            PrintpassError::UnknownPlatform(key) => write!(f, "Unknown ad platform: {:?}", key),
            PrintpassError::UnknownFeature(key) => write!(f, "Unknown feature: {:?}", key),
            PrintpassError::UnknownResource(key) => write!(f, "Unknown resource: {:?}", key),
            PrintpassError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            PrintpassError::ConfigError(err) => write!(f, "Configuration error: {}", err),
            PrintpassError::Fetch(err) => write!(f, "Subscription fetch failed: {}", err),
            PrintpassError::Billing(msg) => write!(f, "Billing error: {}", msg),
            PrintpassError::HttpError(err) => write!(f, "HTTP error: {}", err),
            PrintpassError::SerdeError(err) => write!(f, "Serde error: {}", err),
        }
    }
}

impl std::error::Error for PrintpassError {}

impl From<config::ConfigError> for PrintpassError {
    fn from(err: config::ConfigError) -> Self {
        PrintpassError::ConfigError(err)
    }
}

impl From<FetchError> for PrintpassError {
    fn from(err: FetchError) -> Self {
        PrintpassError::Fetch(err)
    }
}

impl From<reqwest::Error> for PrintpassError {
    fn from(err: reqwest::Error) -> Self {
        PrintpassError::HttpError(err)
    }
}

impl From<serde_json::Error> for PrintpassError {
    fn from(err: serde_json::Error) -> Self {
        PrintpassError::SerdeError(err)
    }
}
