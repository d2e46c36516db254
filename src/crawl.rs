use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::CrawlConfig;
use crate::parser;
use crate::record::TrialRecord;
use crate::scraper::{AcquisitionError, AcquisitionService, CrawlItem, JobState};

/// Lifecycle of one bulk crawl job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    JobSubmitted { job_id: String },
    Polling { job_id: String, attempts: u32 },
    Completed { results: Vec<CrawlItem> },
    Failed { reason: String },
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub results: usize,
    pub fallback_fetches: usize,
    pub skipped: usize,
    pub parsed: usize,
    pub kept: usize,
}

pub struct Crawler<'a, S: ?Sized> {
    service: &'a S,
    config: &'a CrawlConfig,
}

impl<'a, S: AcquisitionService + ?Sized> Crawler<'a, S> {
    pub fn new(service: &'a S, config: &'a CrawlConfig) -> Self {
        Self { service, config }
    }

    /// Crawl, parse and filter. Any service failure aborts the whole run.
    pub async fn run(&self) -> Result<(Vec<TrialRecord>, CrawlSummary), AcquisitionError> {
        let results = self.acquire().await?;
        Ok(self.collect(results).await)
    }

    /// Submit the job and poll until it settles.
    pub async fn acquire(&self) -> Result<Vec<CrawlItem>, AcquisitionError> {
        self.drive(&spinner()).await
    }

    /// Run the state machine to a terminal state. The spinner is cleared on
    /// every exit path.
    async fn drive(&self, spinner: &ProgressBar) -> Result<Vec<CrawlItem>, AcquisitionError> {
        let mut state = CrawlState::Idle;

        loop {
            state = match state {
                CrawlState::Completed { results } => {
                    spinner.finish_and_clear();
                    return Ok(results);
                }
                CrawlState::Failed { reason } => {
                    spinner.finish_and_clear();
                    return Err(AcquisitionError::JobFailed(reason));
                }
                other => self
                    .step(other, spinner)
                    .await
                    .inspect_err(|_| spinner.finish_and_clear())?,
            };
        }
    }

    async fn step(
        &self,
        state: CrawlState,
        spinner: &ProgressBar,
    ) -> Result<CrawlState, AcquisitionError> {
        match state {
            CrawlState::Idle => {
                let job_id = self.service.submit_job(&self.config.request).await?;
                info!(
                    "Submitted crawl job {} for {} (limit {}, depth {})",
                    job_id,
                    self.config.request.start_url,
                    self.config.request.limit,
                    self.config.request.max_depth
                );
                Ok(CrawlState::JobSubmitted { job_id })
            }
            CrawlState::JobSubmitted { job_id } => Ok(CrawlState::Polling {
                job_id,
                attempts: 0,
            }),
            CrawlState::Polling { job_id, attempts } => {
                if let Some(max) = self.config.max_polls {
                    if attempts >= max {
                        return Err(AcquisitionError::PollLimit(attempts));
                    }
                }

                let status = self.service.get_job_status(&job_id).await?;
                match status.state {
                    JobState::Completed => {
                        info!(
                            "Crawl job {} completed with {} results",
                            job_id,
                            status.results.len()
                        );
                        Ok(CrawlState::Completed {
                            results: status.results,
                        })
                    }
                    JobState::Failed => Ok(CrawlState::Failed {
                        reason: status.error.unwrap_or_else(|| "no reason given".to_string()),
                    }),
                    JobState::InProgress(s) => {
                        debug!("Crawl job {} is {} (poll {})", job_id, s, attempts + 1);
                        spinner.set_message(format!("crawl {}: {} ({} polls)", job_id, s, attempts + 1));
                        tokio::time::sleep(self.config.poll_interval).await;
                        Ok(CrawlState::Polling {
                            job_id,
                            attempts: attempts + 1,
                        })
                    }
                }
            }
            settled @ (CrawlState::Completed { .. } | CrawlState::Failed { .. }) => Ok(settled),
        }
    }

    /// Turn crawl results into recruiting records, in result order. Items without
    /// an address, or without text even after a single-page fetch, are dropped.
    pub async fn collect(&self, items: Vec<CrawlItem>) -> (Vec<TrialRecord>, CrawlSummary) {
        let mut summary = CrawlSummary {
            results: items.len(),
            ..Default::default()
        };
        let mut records = Vec::new();
        let pb = progress_bar(items.len());

        for item in items {
            pb.inc(1);

            let Some(url) = item.url else {
                debug!("Skipping crawl result without an address");
                summary.skipped += 1;
                continue;
            };

            let markdown = match item.markdown {
                Some(md) => md,
                None => {
                    summary.fallback_fetches += 1;
                    debug!("No inline content for {}, fetching page", url);
                    match self
                        .service
                        .fetch_single(&url, &self.config.request.scrape_options)
                        .await
                    {
                        Some(md) => md,
                        None => {
                            warn!("No content for {}, skipping", url);
                            summary.skipped += 1;
                            continue;
                        }
                    }
                }
            };

            let Some(record) = parser::parse_page(&markdown, &url) else {
                warn!("No NCT identifier in {}, skipping", url);
                summary.skipped += 1;
                continue;
            };
            summary.parsed += 1;

            if parser::filter::is_recruiting(&record) {
                summary.kept += 1;
                records.push(record);
            } else {
                debug!(
                    "{} is not recruiting ({:?})",
                    record.nct_id, record.recruitment_status
                );
            }
        }

        pb.finish_and_clear();
        info!(
            "Kept {} of {} parsed trials ({} results, {} fetched individually, {} skipped)",
            summary.kept, summary.parsed, summary.results, summary.fallback_fetches, summary.skipped
        );

        (records, summary)
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::{CrawlRequest, ScrapeOptions};
    use crate::scraper::JobStatus;

    #[derive(Default)]
    struct FakeService {
        job_id: Option<String>,
        statuses: Mutex<VecDeque<JobStatus>>,
        pages: HashMap<String, String>,
        polls: Mutex<u32>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn completing_with(results: Vec<CrawlItem>) -> Self {
            Self::with_statuses(vec![status(JobState::Completed, results, None)])
        }

        fn with_statuses(statuses: Vec<JobStatus>) -> Self {
            Self {
                job_id: Some("job-1".into()),
                statuses: Mutex::new(statuses.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl AcquisitionService for FakeService {
        async fn submit_job(&self, _request: &CrawlRequest) -> Result<String, AcquisitionError> {
            self.job_id.clone().ok_or(AcquisitionError::MissingJobId)
        }

        async fn get_job_status(&self, _job_id: &str) -> Result<JobStatus, AcquisitionError> {
            *self.polls.lock().unwrap() += 1;
            let mut statuses = self.statuses.lock().unwrap();
            Ok(statuses
                .pop_front()
                .unwrap_or_else(|| status(JobState::InProgress("scraping".into()), vec![], None)))
        }

        async fn fetch_single(&self, url: &str, _options: &ScrapeOptions) -> Option<String> {
            self.fetched.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned()
        }
    }

    fn status(state: JobState, results: Vec<CrawlItem>, error: Option<&str>) -> JobStatus {
        JobStatus {
            state,
            results,
            error: error.map(String::from),
        }
    }

    fn item(url: &str, markdown: Option<&str>) -> CrawlItem {
        CrawlItem {
            url: Some(url.to_string()),
            markdown: markdown.map(String::from),
        }
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.md", name)).unwrap()
    }

    fn config() -> CrawlConfig {
        CrawlConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn single_recruiting_trial() {
        let md = fixture("recruiting");
        let service = FakeService::completing_with(vec![item("https://ct/study/NCT12345678", Some(&md))]);
        let config = config();
        let (records, summary) = Crawler::new(&service, &config).run().await.unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.nct_id, "NCT12345678");
        assert_eq!(r.condition, "Diabetes; Hypertension");
        assert_eq!(r.inclusion_criteria, "Age 18 years or older; HbA1c < 9.0");
        assert_eq!(r.exclusion_criteria, "Pregnancy; Severe renal disease");
        assert_eq!(r.locations.len(), 1);
        assert_eq!(r.locations[0].city, "Austin");
        assert_eq!(r.locations[0].state, "Texas");
        assert_eq!(r.locations[0].country, "United States");
        assert_eq!(r.source_url, "https://ct/study/NCT12345678");
        assert_eq!(summary.kept, 1);
    }

    #[tokio::test]
    async fn completed_trials_filtered_out() {
        let service = FakeService::completing_with(vec![
            item("https://ct/study/NCT11112222", Some(&fixture("completed"))),
            item("https://ct/study/NCT12345678", Some(&fixture("recruiting"))),
        ]);
        let config = config();
        let (records, summary) = Crawler::new(&service, &config).run().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].nct_id, "NCT12345678");
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.kept, 1);
    }

    #[tokio::test]
    async fn bare_not_yet_recruiting_trial() {
        let service = FakeService::completing_with(vec![item(
            "https://ct/study/NCT99990000",
            Some("NCT99990000\nRecruitment Status: Not yet recruiting"),
        )]);
        let config = config();
        let (records, _) = Crawler::new(&service, &config).run().await.unwrap();

        assert_eq!(
            records,
            vec![TrialRecord {
                nct_id: "NCT99990000".into(),
                recruitment_status: "Not yet recruiting".into(),
                source_url: "https://ct/study/NCT99990000".into(),
                ..Default::default()
            }]
        );
    }

    #[tokio::test]
    async fn polls_until_completed() {
        let service = FakeService::with_statuses(vec![
            status(JobState::InProgress("scraping".into()), vec![], None),
            status(JobState::InProgress("scraping".into()), vec![], None),
            status(JobState::Completed, vec![], None),
        ]);
        let config = config();
        let results = Crawler::new(&service, &config).acquire().await.unwrap();

        assert!(results.is_empty());
        assert_eq!(*service.polls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn failed_job_is_fatal() {
        let service = FakeService::with_statuses(vec![status(
            JobState::Failed,
            vec![],
            Some("quota exceeded"),
        )]);
        let config = config();
        let err = Crawler::new(&service, &config).run().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::JobFailed(reason) if reason == "quota exceeded"));
    }

    #[tokio::test]
    async fn missing_job_id_is_fatal() {
        let service = FakeService::default();
        let config = config();
        let err = Crawler::new(&service, &config).run().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::MissingJobId));
        assert_eq!(*service.polls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn spinner_cleared_on_error() {
        let service = FakeService::default();
        let config = config();
        let pb = ProgressBar::hidden();
        let err = Crawler::new(&service, &config).drive(&pb).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::MissingJobId));
        assert!(pb.is_finished());

        let service = FakeService::with_statuses(vec![]);
        let config = CrawlConfig {
            max_polls: Some(1),
            ..config
        };
        let pb = ProgressBar::hidden();
        let err = Crawler::new(&service, &config).drive(&pb).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::PollLimit(1)));
        assert!(pb.is_finished());
    }

    #[tokio::test]
    async fn poll_ceiling() {
        let service = FakeService::with_statuses(vec![]);
        let config = CrawlConfig {
            max_polls: Some(3),
            ..config()
        };
        let err = Crawler::new(&service, &config).acquire().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::PollLimit(3)));
        assert_eq!(*service.polls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn fallback_fetch_keeps_result_order() {
        let mut service = FakeService::completing_with(vec![
            item("https://ct/study/NCT00000001", Some("NCT00000001\nRecruitment Status: Recruiting")),
            item("https://ct/study/NCT00000002", None),
            CrawlItem {
                url: None,
                markdown: Some("NCT00000009\nRecruitment Status: Recruiting".into()),
            },
            item("https://ct/study/NCT00000003", None),
            item("https://ct/study/NCT00000004", Some("NCT00000004\nRecruitment Status: Recruiting")),
        ]);
        service.pages.insert(
            "https://ct/study/NCT00000002".into(),
            "NCT00000002\nRecruitment Status: Recruiting".into(),
        );
        let config = config();
        let (records, summary) = Crawler::new(&service, &config).run().await.unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.nct_id.as_str()).collect();
        assert_eq!(ids, vec!["NCT00000001", "NCT00000002", "NCT00000004"]);
        assert_eq!(
            *service.fetched.lock().unwrap(),
            vec!["https://ct/study/NCT00000002", "https://ct/study/NCT00000003"]
        );
        assert_eq!(summary.fallback_fetches, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn pages_without_identifier_dropped() {
        let service = FakeService::completing_with(vec![item(
            "https://ct/search",
            Some("# Search results\nRecruitment Status: Recruiting"),
        )]);
        let config = config();
        let (records, summary) = Crawler::new(&service, &config).run().await.unwrap();
        assert!(records.is_empty());
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn state_steps() {
        let service = FakeService::completing_with(vec![]);
        let config = config();
        let crawler = Crawler::new(&service, &config);
        let pb = ProgressBar::hidden();

        let submitted = crawler.step(CrawlState::Idle, &pb).await.unwrap();
        assert_eq!(submitted, CrawlState::JobSubmitted { job_id: "job-1".into() });
        let polling = crawler.step(submitted, &pb).await.unwrap();
        assert_eq!(polling, CrawlState::Polling { job_id: "job-1".into(), attempts: 0 });
        let done = crawler.step(polling, &pb).await.unwrap();
        assert_eq!(done, CrawlState::Completed { results: vec![] });
    }
}
