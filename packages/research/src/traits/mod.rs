//! Collaborator traits consumed by the pipeline stages.
//!
//! Each stage depends only on these interfaces; the workspace provides
//! HTTP- and model-backed implementations plus mocks in [`crate::testing`].

pub mod fetcher;
pub mod ranker;
pub mod searcher;
pub mod summarizer;
