//! Crawler module for session bootstrap, page fetching and orchestration
//!
//! This module contains the core crawling logic, including:
//! - The shared fixed-delay retry policy
//! - The two-step cookie session bootstrap
//! - Listing and detail page fetching
//! - Profile link extraction from listing pages
//! - The crawl loop state machine

mod coordinator;
mod fetcher;
mod headers;
mod listing;
mod retry;
mod session;
mod state;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, Fetcher, PageResponse};
pub use listing::{extract_links, PROFILE_LINK_SELECTOR, RESULT_COUNT_SELECTOR};
pub use retry::{AttemptError, RetryPolicy};
pub use session::{
    SessionBootstrapper, SessionState, SECONDARY_SESSION_COOKIE, SESSION_ENDPOINT,
    SESSION_ID_COOKIE,
};
pub use state::{CrawlState, Termination};

pub(crate) use listing::selector;
