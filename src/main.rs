mod config;
mod crawl;
mod parser;
mod record;
mod scraper;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use config::{ApiConfig, CrawlConfig, CrawlRequest, ScrapeOptions};
use crawl::Crawler;
use record::TrialRecord;
use scraper::{AcquisitionService, FirecrawlClient};

#[derive(Parser)]
#[command(
    name = "trial_scraper",
    about = "Collect clinical trials that are open for enrollment"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl study pages, parse them and print the recruiting trials as JSON
    Run {
        #[command(flatten)]
        api: ApiArgs,
        #[command(flatten)]
        crawl: CrawlArgs,
        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse saved markdown pages (no network)
    Parse {
        /// Markdown files, one study page each
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Keep trials regardless of recruitment status
        #[arg(long)]
        all: bool,
        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch one study page and print its parsed record
    Fetch {
        #[command(flatten)]
        api: ApiArgs,
        url: String,
    },
}

#[derive(Args)]
struct ApiArgs {
    /// Acquisition service API key
    #[arg(long, env = "FIRECRAWL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Acquisition service base URL
    #[arg(long, env = "FIRECRAWL_API_URL", default_value = config::DEFAULT_API_URL)]
    api_url: String,
}

#[derive(Args)]
struct CrawlArgs {
    /// Page the crawl starts from
    #[arg(long, env = "START_URL", default_value = config::DEFAULT_START_URL)]
    start_url: String,
    /// Max pages to crawl
    #[arg(short = 'n', long, env = "LIMIT", default_value_t = config::DEFAULT_LIMIT)]
    limit: u32,
    /// Max link depth from the start page
    #[arg(long, default_value_t = config::DEFAULT_MAX_DEPTH)]
    max_depth: u32,
    /// Path pattern to crawl (repeatable)
    #[arg(long = "include-path", default_values = ["study/NCT.*"])]
    include_paths: Vec<String>,
    /// Path pattern to skip (repeatable)
    #[arg(long = "exclude-path", default_values = ["about-site/.*", "data-api/.*"])]
    exclude_paths: Vec<String>,
    /// Seconds between job status checks
    #[arg(long, default_value_t = config::DEFAULT_POLL_INTERVAL.as_secs())]
    poll_interval_secs: u64,
    /// Give up after this many status checks (default: wait indefinitely)
    #[arg(long)]
    max_polls: Option<u32>,
}

impl CrawlArgs {
    fn into_config(self) -> Result<CrawlConfig, config::ConfigError> {
        CrawlConfig {
            request: CrawlRequest {
                start_url: self.start_url,
                limit: self.limit,
                max_depth: self.max_depth,
                include_paths: self.include_paths,
                exclude_paths: self.exclude_paths,
                scrape_options: ScrapeOptions::default(),
            },
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
        }
        .validate()
    }
}

impl ApiArgs {
    fn into_client(self) -> anyhow::Result<FirecrawlClient> {
        let api = ApiConfig::new(self.api_key, self.api_url)?;
        Ok(FirecrawlClient::new(api)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { api, crawl, output } => {
            // Validate everything before the first request.
            let config = crawl.into_config()?;
            let client = api.into_client()?;
            let (records, _) = Crawler::new(&client, &config)
                .run()
                .await
                .context("Crawl failed")?;
            write_records(&records, output.as_ref())
        }
        Commands::Parse { files, all, output } => {
            let mut records = Vec::new();
            for path in &files {
                let markdown = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let source = path.display().to_string();
                let record = if all {
                    parser::parse_page(&markdown, &source)
                } else {
                    parser::process_page(&markdown, &source)
                };
                records.extend(record);
            }
            info!("Parsed {} files, {} records", files.len(), records.len());
            write_records(&records, output.as_ref())
        }
        Commands::Fetch { api, url } => {
            let client = api.into_client()?;
            let markdown = client
                .fetch_single(&url, &ScrapeOptions::default())
                .await
                .with_context(|| format!("No content returned for {}", url))?;
            let record = parser::extract::build_record(&markdown, &url);
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn write_records(records: &[TrialRecord], output: Option<&PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} trials to {}", records.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
