//! Detail page parsers
//!
//! A profile page can be read two ways: from the JSON state the page embeds
//! for client-side hydration, or from the rendered markup. Both produce the
//! same [`RawAgentRecord`] shape and leave every missing value absent.

mod markup;
mod next_data;

pub use markup::MarkupParser;
pub use next_data::{EmbeddedJsonParser, NEXT_DATA_SELECTOR};

use crate::config::ParserStrategy;
use crate::record::RawAgentRecord;
use crate::HarvestError;

/// Turns a detail page body into a raw agent record
pub trait DetailParser: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Parses one profile page
    ///
    /// # Returns
    ///
    /// * `Ok(RawAgentRecord)` - Every field that could be found
    /// * `Err(HarvestError::Parse)` - The page lacks the structure the
    ///   strategy depends on
    fn parse(&self, html: &str) -> Result<RawAgentRecord, HarvestError>;
}

/// Returns the parser for a configured strategy
pub fn parser_for(strategy: ParserStrategy) -> Box<dyn DetailParser> {
    match strategy {
        ParserStrategy::EmbeddedJson => Box::new(EmbeddedJsonParser),
        ParserStrategy::Markup => Box::new(MarkupParser),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_for_strategy() {
        assert_eq!(parser_for(ParserStrategy::EmbeddedJson).name(), "embedded-json");
        assert_eq!(parser_for(ParserStrategy::Markup).name(), "markup");
    }
}
