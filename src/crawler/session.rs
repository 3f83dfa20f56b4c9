//! Session bootstrap
//!
//! The listing site only serves the agent directory to clients that carry
//! its session cookies. Bootstrapping takes two requests:
//!
//! 1. `GET {base}/` collects `zguid` and `zgsession` from `Set-Cookie`.
//! 2. `GET {base}/ajax/nav/UserNavAsync.htm` with those two cookies mints the
//!    remaining session cookies, which are merged into the same jar.
//!
//! The resulting [`SessionState`] is an ordinary value owned by the crawl
//! loop and lent to every later fetch.

use crate::crawler::fetcher::ensure_ok;
use crate::crawler::headers::{
    cookie_header, header_map, HOME_PAGE_HEADERS, SESSION_COOKIES, SESSION_HEADERS,
    SESSION_PARAMS,
};
use crate::crawler::retry::RetryPolicy;
use crate::HarvestError;
use reqwest::header::COOKIE;
use reqwest::{Client, Response};
use std::collections::BTreeMap;
use std::time::Duration;

/// Primary session cookie set by the home page
pub const SESSION_ID_COOKIE: &str = "zguid";

/// Secondary session cookie set by the home page
pub const SECONDARY_SESSION_COOKIE: &str = "zgsession";

/// Path of the session token endpoint
pub const SESSION_ENDPOINT: &str = "/ajax/nav/UserNavAsync.htm";

/// Cookies that authenticate listing and detail requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub session_id: Option<String>,
    pub secondary_session: Option<String>,
    pub cookies: BTreeMap<String, String>,
}

impl SessionState {
    /// Builds a session from the cookies returned by the home page
    pub fn from_cookies(cookies: BTreeMap<String, String>) -> Self {
        let mut state = Self::default();
        state.merge(cookies);
        state
    }

    /// Merges newly issued cookies, replacing values with the same name
    pub fn merge<I>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.cookies.extend(cookies);
        self.session_id = self.cookies.get(SESSION_ID_COOKIE).cloned();
        self.secondary_session = self.cookies.get(SECONDARY_SESSION_COOKIE).cloned();
    }

    /// Names of the session cookies that are still missing
    pub fn missing_cookies(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.session_id.as_deref().map_or(true, str::is_empty) {
            missing.push(SESSION_ID_COOKIE);
        }
        if self.secondary_session.as_deref().map_or(true, str::is_empty) {
            missing.push(SECONDARY_SESSION_COOKIE);
        }
        missing
    }

    /// `Cookie` header value for the full jar, if it holds anything
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            None
        } else {
            Some(cookie_header(&self.cookies))
        }
    }
}

/// Runs the two-step session handshake
pub struct SessionBootstrapper<'a> {
    client: &'a Client,
    base_url: String,
    policy: RetryPolicy,
    timeout: Duration,
}

impl<'a> SessionBootstrapper<'a> {
    pub fn new(client: &'a Client, base_url: &str, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
            timeout,
        }
    }

    /// Performs both bootstrap steps
    ///
    /// # Returns
    ///
    /// * `Ok(SessionState)` - Session cookies from both steps
    /// * `Err(HarvestError)` - Either step exhausted its retries, or the
    ///   home page did not issue the session cookies
    pub async fn establish_session(&self) -> Result<SessionState, HarvestError> {
        let session = self.request_home_page().await?;
        self.request_session_token(session).await
    }

    /// Step 1: requests the home page and collects its cookies
    pub async fn request_home_page(&self) -> Result<SessionState, HarvestError> {
        let url = format!("{}/", self.base_url);
        tracing::info!("Requesting the home page to set cookies...");

        let response = self
            .policy
            .run("home page", |_| {
                let request = self
                    .client
                    .get(&url)
                    .headers(header_map(HOME_PAGE_HEADERS))
                    .timeout(self.timeout);
                async move { ensure_ok(request.send().await?) }
            })
            .await?;

        let session = SessionState::from_cookies(response_cookies(&response));
        tracing::info!(
            "Home page set {} cookie(s): {:?}",
            session.cookies.len(),
            session.cookies.keys().collect::<Vec<_>>()
        );
        Ok(session)
    }

    /// Step 2: mints the session token using the step 1 cookies
    ///
    /// Fails with [`HarvestError::MissingSessionCookies`] before sending
    /// anything if step 1 did not yield both session cookies.
    pub async fn request_session_token(
        &self,
        mut session: SessionState,
    ) -> Result<SessionState, HarvestError> {
        let missing = session.missing_cookies();
        if !missing.is_empty() {
            tracing::warn!(
                "Missing {} cookie(s); the home page request did not set them",
                missing.join(", ")
            );
            return Err(HarvestError::MissingSessionCookies {
                missing: missing.join(", "),
            });
        }

        let mut cookies: BTreeMap<String, String> = SESSION_COOKIES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for name in [SESSION_ID_COOKIE, SECONDARY_SESSION_COOKIE] {
            if let Some(value) = session.cookies.get(name) {
                cookies.insert(name.to_string(), value.clone());
            }
        }
        let cookie_value = cookie_header(&cookies);

        let url = format!("{}{}", self.base_url, SESSION_ENDPOINT);
        tracing::info!("Requesting the session token endpoint...");

        let response = self
            .policy
            .run("session token", |_| {
                let request = self
                    .client
                    .get(&url)
                    .query(SESSION_PARAMS)
                    .headers(header_map(SESSION_HEADERS))
                    .header(COOKIE, cookie_value.as_str())
                    .timeout(self.timeout);
                async move { ensure_ok(request.send().await?) }
            })
            .await?;

        session.merge(response_cookies(&response));
        tracing::info!("Session established with {} cookie(s)", session.cookies.len());
        Ok(session)
    }
}

fn response_cookies(response: &Response) -> BTreeMap<String, String> {
    response
        .cookies()
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect()
}
