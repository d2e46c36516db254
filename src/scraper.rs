use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{ApiConfig, CrawlRequest, ScrapeOptions};

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("request to acquisition service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("acquisition service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode acquisition service response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("crawl job submission returned no job id")]
    MissingJobId,
    #[error("crawl job failed: {0}")]
    JobFailed(String),
    #[error("crawl job still running after {0} polls")]
    PollLimit(u32),
}

/// Job status as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Completed,
    Failed,
    InProgress(String),
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            other => JobState::InProgress(other.to_string()),
        }
    }
}

/// One crawled page. Either field may be missing in the service response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlItem {
    pub url: Option<String>,
    pub markdown: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    pub results: Vec<CrawlItem>,
    pub error: Option<String>,
}

/// Bulk and single-page content acquisition.
#[async_trait]
pub trait AcquisitionService: Send + Sync {
    async fn submit_job(&self, request: &CrawlRequest) -> Result<String, AcquisitionError>;

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus, AcquisitionError>;

    /// Best effort: any failure is reported as `None`.
    async fn fetch_single(&self, url: &str, options: &ScrapeOptions) -> Option<String>;
}

// ── Wire shapes ──

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    data: Option<Vec<Document>>,
    results: Option<Vec<Document>>,
    next: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    markdown: Option<String>,
    url: Option<String>,
    metadata: Option<Metadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    data: Option<Document>,
}

impl Document {
    fn into_item(self) -> CrawlItem {
        let metadata = self.metadata.unwrap_or_default();
        CrawlItem {
            url: self.url.or(metadata.source_url).or(metadata.url),
            markdown: self
                .markdown
                .filter(|m| !m.trim().is_empty())
                .map(|m| strip_images(&m)),
        }
    }
}

impl StatusResponse {
    /// Results may arrive under `data` or `results`.
    fn take_documents(&mut self) -> Vec<Document> {
        self.data.take().or_else(|| self.results.take()).unwrap_or_default()
    }
}

/// Firecrawl-compatible HTTP client.
pub struct FirecrawlClient {
    client: reqwest::Client,
    api: ApiConfig,
}

impl FirecrawlClient {
    pub fn new(api: ApiConfig) -> Result<Self, AcquisitionError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trial_scraper/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, api })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api.api_url, path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AcquisitionError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AcquisitionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_status_page(&self, url: &str) -> Result<StatusResponse, AcquisitionError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api.api_key)
            .send()
            .await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl AcquisitionService for FirecrawlClient {
    async fn submit_job(&self, request: &CrawlRequest) -> Result<String, AcquisitionError> {
        let body = serde_json::json!({
            "url": request.start_url,
            "limit": request.limit,
            "maxDepth": request.max_depth,
            "includePaths": request.include_paths,
            "excludePaths": request.exclude_paths,
            "scrapeOptions": request.scrape_options,
        });

        let response = self
            .client
            .post(self.endpoint("crawl"))
            .bearer_auth(&self.api.api_key)
            .json(&body)
            .send()
            .await?;
        let submitted: SubmitResponse = Self::read_json(response).await?;

        submitted
            .id
            .filter(|id| !id.is_empty())
            .ok_or(AcquisitionError::MissingJobId)
    }

    async fn get_job_status(&self, job_id: &str) -> Result<JobStatus, AcquisitionError> {
        let mut page = self
            .get_status_page(&self.endpoint(&format!("crawl/{}", job_id)))
            .await?;
        let state = JobState::from(page.status.as_str());
        let mut documents = page.take_documents();

        // Large completed jobs are paginated through `next`.
        if state == JobState::Completed {
            let mut next = page.next.take();
            while let Some(url) = next {
                debug!("Following crawl results page {}", url);
                let mut more = self.get_status_page(&url).await?;
                documents.extend(more.take_documents());
                next = more.next.take();
            }
        }

        Ok(JobStatus {
            state,
            results: documents.into_iter().map(Document::into_item).collect(),
            error: page.error,
        })
    }

    async fn fetch_single(&self, url: &str, options: &ScrapeOptions) -> Option<String> {
        let body = serde_json::json!({
            "url": url,
            "formats": options.formats,
            "onlyMainContent": options.only_main_content,
        });

        let response = self
            .client
            .post(self.endpoint("scrape"))
            .bearer_auth(&self.api.api_key)
            .json(&body)
            .send()
            .await;

        let parsed = match response {
            Ok(r) => Self::read_json::<ScrapeResponse>(r).await,
            Err(e) => Err(e.into()),
        };

        match parsed {
            Ok(scraped) => scraped.data.and_then(|d| d.into_item().markdown),
            Err(e) => {
                warn!("Single-page fetch failed for {}: {}", url, e);
                None
            }
        }
    }
}

/// Remove markdown image syntax and collapse runs of blank lines.
pub fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}
