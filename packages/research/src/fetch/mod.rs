//! Content fetching: HTTP pages, video transcripts, and the SSRF guard.

pub mod html;
pub mod http;
pub mod retry;
pub mod transcript;
pub mod validated;

pub use http::HttpFetcher;
pub use retry::with_retry;
pub use validated::ValidatedFetcher;
