//! Crawl loop states
//!
//! The loop starts in `Bootstrapping`, walks listing pages in increasing
//! order and ends in `Terminated`.

use crate::crawler::fetcher::PageResponse;
use std::fmt;

/// Represents the current step of a crawl run
#[derive(Debug)]
pub enum CrawlState {
    /// Obtaining session cookies
    Bootstrapping,

    /// Waiting out the page interval, then requesting a listing page
    FetchingPage { page: u32 },

    /// Pulling profile links out of a fetched listing page
    ExtractingLinks { page: u32, response: PageResponse },

    /// Fetching, parsing, validating and persisting each profile in order
    ProcessingDetails { page: u32, links: Vec<String> },

    /// Deciding whether another page follows
    AdvancingPage { page: u32 },

    /// Run is over
    Terminated(Termination),
}

impl CrawlState {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bootstrapping => "bootstrapping",
            Self::FetchingPage { .. } => "fetching_page",
            Self::ExtractingLinks { .. } => "extracting_links",
            Self::ProcessingDetails { .. } => "processing_details",
            Self::AdvancingPage { .. } => "advancing_page",
            Self::Terminated(_) => "terminated",
        }
    }
}

/// Why a crawl run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The listing page could not be fetched within the retry budget
    PageFetchFailed { page: u32 },

    /// The listing page had no profile links (or could not be parsed)
    NoLinks { page: u32 },

    /// The configured last page was processed
    PageLimitReached { page: u32 },
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageFetchFailed { page } => write!(f, "listing page {} could not be fetched", page),
            Self::NoLinks { page } => write!(f, "no agent links on listing page {}", page),
            Self::PageLimitReached { page } => write!(f, "reached last page {}", page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(CrawlState::Bootstrapping.name(), "bootstrapping");
        assert_eq!(CrawlState::AdvancingPage { page: 1 }.name(), "advancing_page");
        assert_eq!(
            CrawlState::Terminated(Termination::NoLinks { page: 1 }).name(),
            "terminated"
        );
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(
            Termination::PageLimitReached { page: 25 }.to_string(),
            "reached last page 25"
        );
        assert_eq!(
            Termination::PageFetchFailed { page: 4 }.to_string(),
            "listing page 4 could not be fetched"
        );
    }
}
