use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Clearsignal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "clearsignal=info"
}

/// Get the application data directory
/// ~/Clearsignal/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Clearsignal")
}

/// Get the knowledge-base data directory (pattern definitions, resources)
pub fn data_dir() -> PathBuf {
    app_data_dir().join("data")
}

/// Configuration for the remote insight collaborator endpoint.
///
/// Read from the environment once at client construction; every field
/// has a hosted-endpoint default so the pipeline runs without any
/// configuration (the client fails closed when no API key is present).
#[derive(Debug, Clone)]
pub struct InsightConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Bounded request timeout for the blocking collaborator call.
    pub timeout_secs: u64,
}

impl InsightConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://integrate.api.nvidia.com/v1";
    pub const DEFAULT_MODEL: &'static str = "nvidia/nemotron-3-8b-instruct";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("CLEARSIGNAL_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);

        Self {
            base_url: std::env::var("CLEARSIGNAL_LLM_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("CLEARSIGNAL_LLM_API_KEY").unwrap_or_default(),
            model: std::env::var("CLEARSIGNAL_LLM_MODEL")
                .unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string()),
            timeout_secs,
        }
    }

    /// True when pointing at the hosted endpoint, which requires a key.
    pub fn is_hosted_endpoint(&self) -> bool {
        self.base_url.starts_with(Self::DEFAULT_BASE_URL)
    }
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: Self::DEFAULT_MODEL.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}
