//! Field extractor adapters.

mod http;
mod keyword;

pub use http::{HttpExtractorConfig, HttpFieldExtractor};
pub use keyword::KeywordFieldExtractor;
