//! Rate-limited model wrapper.
//!
//! Summarization fans out one model call per item at once; the token bucket
//! here is what keeps that burst inside the provider's request quota.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};

use crate::error::Result;
use crate::llm::{CompletionRequest, LanguageModel};

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A model wrapper that waits for a permit before every call.
pub struct RateLimitedModel<M: LanguageModel> {
    inner: M,
    limiter: Arc<DirectRateLimiter>,
}

impl<M: LanguageModel> RateLimitedModel<M> {
    /// Allow `requests_per_second` calls per second (minimum 1).
    pub fn new(model: M, requests_per_second: u32) -> Self {
        Self::with_quota(model, Quota::per_second(non_zero(requests_per_second)))
    }

    pub fn with_quota(model: M, quota: Quota) -> Self {
        Self {
            inner: model,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for RateLimitedModel<M> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.limiter.until_ready().await;
        self.inner.complete(request).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Extension trait for wrapping any model with a rate limit.
pub trait LanguageModelExt: LanguageModel + Sized {
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedModel<Self> {
        RateLimitedModel::new(self, requests_per_second)
    }
}

impl<M: LanguageModel> LanguageModelExt for M {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLanguageModel;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_passes_calls_through() {
        let mock = MockLanguageModel::new().with_response(r#"{"points":["a"]}"#);
        let model = mock.clone().rate_limited(10);

        let out = model.complete(&CompletionRequest::new("s", "u")).await.unwrap();
        assert_eq!(out, r#"{"points":["a"]}"#);
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_enforces_rate() {
        let model = RateLimitedModel::new(MockLanguageModel::new(), 2);
        let request = CompletionRequest::new("s", "u");

        let start = Instant::now();
        for _ in 0..4 {
            model.complete(&request).await.unwrap();
        }

        // 4 calls at 2/s: the bucket refills one permit every 500ms
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_zero_rate_clamped() {
        let mock = MockLanguageModel::new();
        let model = RateLimitedModel::new(mock.clone(), 0);

        model.complete(&CompletionRequest::new("s", "u")).await.unwrap();
        assert_eq!(mock.calls().len(), 1);
    }
}
