use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_API_URL: &str = "https://api.firecrawl.dev";
pub const DEFAULT_START_URL: &str = "https://clinicaltrials.gov/search?aggFilters=status:rec";
pub const DEFAULT_LIMIT: u32 = 50;
pub const DEFAULT_MAX_DEPTH: u32 = 2;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("FIRECRAWL_API_KEY must be set (or pass --api-key)")]
    MissingApiKey,
    #[error("limit must be at least 1")]
    InvalidLimit,
}

/// Content shape requested from the acquisition service: markdown of the
/// main page content, without navigation and boilerplate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOptions {
    pub formats: Vec<String>,
    pub only_main_content: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            formats: vec!["markdown".to_string()],
            only_main_content: true,
        }
    }
}

/// Parameters of one bulk crawl job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub start_url: String,
    pub limit: u32,
    pub max_depth: u32,
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub scrape_options: ScrapeOptions,
}

impl Default for CrawlRequest {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            limit: DEFAULT_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
            include_paths: vec!["study/NCT.*".to_string()],
            exclude_paths: vec!["about-site/.*".to_string(), "data-api/.*".to_string()],
            scrape_options: ScrapeOptions::default(),
        }
    }
}

/// Orchestrator settings. Built once at the process boundary and passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    pub request: CrawlRequest,
    pub poll_interval: Duration,
    /// `None` polls until the job settles.
    pub max_polls: Option<u32>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            request: CrawlRequest::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
        }
    }
}

impl CrawlConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.request.limit == 0 {
            return Err(ConfigError::InvalidLimit);
        }
        Ok(self)
    }
}

/// Credentials and endpoint for the acquisition service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub api_url: String,
}

impl ApiConfig {
    pub fn new(api_key: Option<String>, api_url: String) -> Result<Self, ConfigError> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        Ok(Self {
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}
