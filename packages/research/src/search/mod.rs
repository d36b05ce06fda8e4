//! Search providers backed by external APIs.

pub mod tavily;
pub mod youtube;

pub use tavily::TavilySearcher;
pub use youtube::YouTubeSearcher;
