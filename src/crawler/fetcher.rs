//! HTTP fetcher implementation
//!
//! This module handles the HTTP requests for listing and detail pages:
//! - Building the HTTP client (user agent, compression, proxy)
//! - GET requests carrying the session cookies and fixed header sets
//! - Retry through the shared [`RetryPolicy`]

use crate::config::{Config, HttpConfig};
use crate::crawler::headers::{header_map, DETAIL_PAGE_HEADERS, LISTING_HEADERS};
use crate::crawler::retry::{AttemptError, RetryPolicy};
use crate::crawler::session::SessionState;
use crate::HarvestError;
use reqwest::header::COOKIE;
use reqwest::{Client, Proxy, RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// A page fetched with status 200
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Page body
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client (e.g. bad proxy URL)
///
/// # Example
///
/// ```no_run
/// use agent_harvest::config::HttpConfig;
/// use agent_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.detail_timeout().max(config.timeout()))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = &config.proxy_url {
        builder = builder.proxy(Proxy::all(proxy_url)?);
    }

    builder.build()
}

/// Treats anything but 200 as a failed attempt
pub(crate) fn ensure_ok(response: Response) -> Result<Response, AttemptError> {
    if response.status() == StatusCode::OK {
        Ok(response)
    } else {
        Err(AttemptError::Status(response.status()))
    }
}

/// Sends the request and reads the body; both count toward the attempt
async fn fetch_page(request: RequestBuilder) -> Result<PageResponse, AttemptError> {
    let response = ensure_ok(request.send().await?)?;
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(PageResponse { url, status, body })
}

/// Fetches listing and detail pages for one crawl run
pub struct Fetcher {
    client: Client,
    listing_url: String,
    price_range: Option<String>,
    listing_policy: RetryPolicy,
    detail_policy: RetryPolicy,
    timeout: Duration,
    detail_timeout: Duration,
}

impl Fetcher {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            listing_url: config.site.listing_url.clone(),
            price_range: config.site.price_range.clone(),
            listing_policy: RetryPolicy::new(
                config.retry.attempts,
                Duration::from_millis(config.retry.delay_ms),
            ),
            detail_policy: RetryPolicy::new(
                config.retry.attempts,
                Duration::from_millis(config.retry.detail_delay_ms),
            ),
            timeout: config.http.timeout(),
            detail_timeout: config.http.detail_timeout(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Requests one page of the agent directory
    ///
    /// # Returns
    ///
    /// * `Ok(PageResponse)` - The first 200 response
    /// * `Err(HarvestError::Transport)` - Every attempt failed
    pub async fn fetch_listing_page(
        &self,
        page_number: u32,
        session: &SessionState,
    ) -> Result<PageResponse, HarvestError> {
        tracing::info!("Requesting agents listing page {}", page_number);

        let mut params = vec![("page", page_number.to_string())];
        if let Some(range) = &self.price_range {
            params.push(("priceRange", range.clone()));
        }
        let cookies = session.cookie_header();
        let target = format!("listing page {}", page_number);

        let page = self
            .listing_policy
            .run(&target, |_| {
                let mut request = self
                    .client
                    .get(&self.listing_url)
                    .query(&params)
                    .headers(header_map(LISTING_HEADERS))
                    .timeout(self.timeout);
                if let Some(cookies) = &cookies {
                    request = request.header(COOKIE, cookies.as_str());
                }
                fetch_page(request)
            })
            .await?;

        tracing::info!("Fetched listing page {} ({} bytes)", page_number, page.body.len());
        Ok(page)
    }

    /// Requests one agent profile page
    pub async fn fetch_detail(
        &self,
        url: &str,
        session: &SessionState,
    ) -> Result<PageResponse, HarvestError> {
        tracing::info!("Processing agent link: {}", url);
        let cookies = session.cookie_header();

        let page = self
            .detail_policy
            .run(url, |_| {
                let mut request = self
                    .client
                    .get(url)
                    .headers(header_map(DETAIL_PAGE_HEADERS))
                    .timeout(self.detail_timeout);
                if let Some(cookies) = &cookies {
                    request = request.header(COOKIE, cookies.as_str());
                }
                fetch_page(request)
            })
            .await?;

        tracing::debug!("Fetched detail page {} ({} bytes)", url, page.body.len());
        Ok(page)
    }
}
