//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the pieces together:
//! - Bootstrapping the cookie session
//! - Walking listing pages with a fixed pause between them
//! - Fetching, parsing and validating each profile
//! - Handing validated records to the sink
//!
//! Everything runs sequentially on one task; a failed profile is logged and
//! skipped, a failed listing page or an empty one ends the run.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, Fetcher};
use crate::crawler::listing::extract_links;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::session::{SessionBootstrapper, SessionState};
use crate::crawler::state::{CrawlState, Termination};
use crate::extract::{parser_for, DetailParser};
use crate::output::{build_sink, Sink};
use crate::record::{validate, ValidatedAgentRecord};
use crate::{ErrorKind, HarvestError};
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of a crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Listing pages fetched successfully
    pub pages_fetched: u32,

    /// Profile links found across all listing pages
    pub links_seen: usize,

    /// Records accepted by the sink
    pub records_saved: usize,

    /// Failures by kind
    pub failures: HashMap<ErrorKind, usize>,

    /// Why the run stopped
    pub termination: Option<Termination>,
}

impl CrawlReport {
    pub fn failures_of(&self, kind: ErrorKind) -> usize {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    fn record_failure(&mut self, error: &HarvestError) {
        *self.failures.entry(error.kind()).or_insert(0) += 1;
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    fetcher: Fetcher,
    parser: Box<dyn DetailParser>,
    sink: Box<dyn Sink>,
}

impl Coordinator {
    /// Creates a coordinator with the HTTP client, parser and sink the
    /// configuration asks for
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The client or the sink could not be set up
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.http).map_err(HarvestError::Client)?;
        let sink = build_sink(&config, &client)?;
        let parser = parser_for(config.crawl.parser);
        let fetcher = Fetcher::new(client, &config);

        Ok(Self::with_components(config, fetcher, parser, sink))
    }

    /// Creates a coordinator from explicit parts
    pub fn with_components(
        config: Config,
        fetcher: Fetcher,
        parser: Box<dyn DetailParser>,
        sink: Box<dyn Sink>,
    ) -> Self {
        Self {
            config,
            fetcher,
            parser,
            sink,
        }
    }

    /// Runs the crawl loop until a termination condition
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The run ended on a listing page condition
    /// * `Err(HarvestError)` - The session could not be bootstrapped
    pub async fn run(&mut self) -> Result<CrawlReport, HarvestError> {
        tracing::info!(
            "Starting crawl: pages {}..={}, parser {}, sink {}",
            self.config.crawl.start_page,
            self.config.crawl.max_page,
            self.parser.name(),
            self.sink.name()
        );

        let mut report = CrawlReport::default();
        let mut session = SessionState::default();
        let mut state = CrawlState::Bootstrapping;

        loop {
            tracing::debug!("Crawl state: {}", state.name());

            state = match state {
                CrawlState::Bootstrapping => {
                    session = self.bootstrap().await?;
                    CrawlState::FetchingPage {
                        page: self.config.crawl.start_page,
                    }
                }

                CrawlState::FetchingPage { page } => {
                    let interval = self.config.crawl.page_interval();
                    if !interval.is_zero() {
                        tracing::info!(
                            "Sleeping for {}ms before requesting page {}...",
                            interval.as_millis(),
                            page
                        );
                        tokio::time::sleep(interval).await;
                    }

                    match self.fetcher.fetch_listing_page(page, &session).await {
                        Ok(response) => {
                            report.pages_fetched += 1;
                            CrawlState::ExtractingLinks { page, response }
                        }
                        Err(e) => {
                            tracing::error!("Giving up on listing page {}: {}", page, e);
                            report.record_failure(&e);
                            CrawlState::Terminated(Termination::PageFetchFailed { page })
                        }
                    }
                }

                CrawlState::ExtractingLinks { page, response } => match extract_links(&response) {
                    Ok(links) if !links.is_empty() => {
                        report.links_seen += links.len();
                        CrawlState::ProcessingDetails { page, links }
                    }
                    Ok(_) => CrawlState::Terminated(Termination::NoLinks { page }),
                    Err(e) => {
                        tracing::error!("Failed to parse listing page {}: {}", page, e);
                        report.record_failure(&e);
                        CrawlState::Terminated(Termination::NoLinks { page })
                    }
                },

                CrawlState::ProcessingDetails { page, links } => {
                    for link in &links {
                        self.process_detail(link, &session, &mut report).await;
                    }
                    CrawlState::AdvancingPage { page }
                }

                CrawlState::AdvancingPage { page } => {
                    if page >= self.config.crawl.max_page {
                        CrawlState::Terminated(Termination::PageLimitReached { page })
                    } else {
                        CrawlState::FetchingPage { page: page + 1 }
                    }
                }

                CrawlState::Terminated(reason) => {
                    tracing::info!("Crawl finished: {}", reason);
                    report.termination = Some(reason);
                    break;
                }
            };
        }

        tracing::info!(
            "Crawl summary: {} page(s), {} link(s), {} record(s) saved",
            report.pages_fetched,
            report.links_seen,
            report.records_saved
        );

        Ok(report)
    }

    async fn bootstrap(&self) -> Result<SessionState, HarvestError> {
        let policy = RetryPolicy::new(
            self.config.retry.attempts,
            Duration::from_millis(self.config.retry.delay_ms),
        );
        let bootstrapper = SessionBootstrapper::new(
            self.fetcher.client(),
            &self.config.site.base_url,
            policy,
            self.config.http.timeout(),
        );

        bootstrapper.establish_session().await.map_err(|e| {
            tracing::error!("Session bootstrap failed: {}", e);
            e
        })
    }

    /// Handles one profile link; every failure stays local to the link
    async fn process_detail(&mut self, url: &str, session: &SessionState, report: &mut CrawlReport) {
        let record = match self.harvest_record(url, session).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Skipping {}: {}", url, e);
                report.record_failure(&e);
                return;
            }
        };

        match self.sink.persist(&record).await {
            Ok(()) => report.records_saved += 1,
            Err(e) => {
                let e = HarvestError::from(e);
                tracing::error!("Failed to save record from {}: {}", url, e);
                report.record_failure(&e);
            }
        }
    }

    async fn harvest_record(
        &self,
        url: &str,
        session: &SessionState,
    ) -> Result<ValidatedAgentRecord, HarvestError> {
        let page = self.fetcher.fetch_detail(url, session).await?;
        let raw = self.parser.parse(&page.body)?;
        if raw.is_empty() {
            return Err(HarvestError::parse(url, "profile has no agent fields"));
        }
        tracing::debug!("Scraped {} field(s) from {}", raw.len(), url);

        let record = validate(&raw)?;
        tracing::info!(
            "Validated record for {}",
            record.agent_name.as_deref().unwrap_or("<unnamed agent>")
        );
        Ok(record)
    }
}

/// Runs a complete crawl with the given configuration
///
/// # Example
///
/// ```no_run
/// use agent_harvest::config::load_config_with_env;
/// use agent_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config_with_env(None)?;
/// let report = run_crawl(config).await?;
/// println!("saved {} records", report.records_saved);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_failures_by_kind() {
        let mut report = CrawlReport::default();
        report.record_failure(&HarvestError::parse("detail", "no script"));
        report.record_failure(&HarvestError::parse("detail", "bad json"));
        report.record_failure(&HarvestError::Validation {
            field: "total_sales",
            value: "x".to_string(),
            reason: "expected a whole number".to_string(),
        });

        assert_eq!(report.failures_of(ErrorKind::Parse), 2);
        assert_eq!(report.failures_of(ErrorKind::Validation), 1);
        assert_eq!(report.failures_of(ErrorKind::Sink), 0);
    }

    #[test]
    fn test_coordinator_creation_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.csv_path = dir.path().join("agents.csv").display().to_string();
        assert!(Coordinator::new(config).is_ok());
    }
}
