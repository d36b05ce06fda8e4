//! Per-unit failure isolation.
//!
//! Every collaborator call the stages make per provider, per item or per
//! summarization request goes through here. A failing unit contributes
//! nothing and leaves a `warn!` line; it never takes its siblings or the
//! stage down with it, not even when it panics.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::warn;

/// Run a fallible unit of work. Errors and panics become `None`.
pub async fn isolate<T, E, F>(unit: &str, fut: F) -> Option<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    match catch_panic(unit, fut).await? {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(unit, error = %e, "Unit of work failed, skipping");
            None
        }
    }
}

/// Run an infallible unit of work. A panic becomes `None`.
pub async fn catch_panic<T, F>(unit: &str, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match unwind(fut).await {
        Ok(value) => Some(value),
        Err(panic) => {
            warn!(unit, panic = %panic, "Unit of work panicked, skipping");
            None
        }
    }
}

/// Run a future, turning a panic into its message.
pub async fn unwind<T, F>(fut: F) -> std::result::Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
