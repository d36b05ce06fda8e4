//! In-memory store of background research runs.
//!
//! The store is owned by whoever starts jobs (a CLI session, a server) and
//! shared through an `Arc`; there is no process-wide registry. Status only
//! moves forward:
//!
//! ```text
//! pending -> in_progress -> completed
//!                        -> failed
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{JobError, JobResult};
use crate::pipeline::isolate::unwind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }
}

/// Result of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    pub report: String,
}

/// One tracked job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
        }
    }
}

/// Tracks background runs by id.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending job and return its id.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.write().await.insert(id, JobRecord::new(id));
        id
    }

    /// Move a job to `status`, optionally attaching its result or error.
    pub async fn update(
        &self,
        id: Uuid,
        status: JobStatus,
        result: Option<JobOutput>,
        error: Option<String>,
    ) -> JobResult<JobRecord> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;

        if !job.status.can_transition_to(status) {
            return Err(JobError::InvalidTransition {
                from: job.status,
                to: status,
            });
        }

        job.status = status;
        job.updated_at = Utc::now();
        if result.is_some() {
            job.result = result;
        }
        if error.is_some() {
            job.error = error;
        }

        Ok(job.clone())
    }

    pub async fn get(&self, id: Uuid) -> JobResult<JobRecord> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(JobError::NotFound(id))
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Create a job and drive `run` to completion on the runtime.
    ///
    /// The job is `in_progress` while `run` executes, then `completed` with
    /// the report or `failed` with the error text.
    pub async fn spawn<F, E>(self: &Arc<Self>, run: F) -> Uuid
    where
        F: Future<Output = Result<String, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let id = self.create().await;
        let store = Arc::clone(self);

        tokio::spawn(async move {
            if let Err(e) = store.update(id, JobStatus::InProgress, None, None).await {
                warn!(job_id = %id, error = %e, "Could not start job");
                return;
            }

            let result = match unwind(run).await {
                Ok(Ok(report)) => Ok(report),
                Ok(Err(e)) => Err(e.to_string()),
                Err(panic) => Err(format!("job panicked: {}", panic)),
            };

            let outcome = match result {
                Ok(report) => {
                    info!(job_id = %id, "Job completed");
                    store
                        .update(id, JobStatus::Completed, Some(JobOutput { report }), None)
                        .await
                }
                Err(error) => {
                    warn!(job_id = %id, error = %error, "Job failed");
                    store
                        .update(id, JobStatus::Failed, None, Some(error))
                        .await
                }
            };

            if let Err(e) = outcome {
                warn!(job_id = %id, error = %e, "Could not record job outcome");
            }
        });

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_terminal(store: &JobStore, id: Uuid) -> JobRecord {
        for _ in 0..100 {
            let job = store.get(id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never finished", id);
    }

    #[tokio::test]
    async fn test_create_is_pending() {
        let store = JobStore::new();
        let id = store.create().await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_forward_transitions() {
        let store = JobStore::new();
        let id = store.create().await;

        store.update(id, JobStatus::InProgress, None, None).await.unwrap();
        let job = store
            .update(
                id,
                JobStatus::Completed,
                Some(JobOutput { report: "# Research Report: q".into() }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.unwrap().report, "# Research Report: q");
        assert!(job.updated_at >= job.created_at);
    }

    #[tokio::test]
    async fn test_rejects_backwards_and_skipping() {
        let store = JobStore::new();
        let id = store.create().await;

        let err = store.update(id, JobStatus::Completed, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            JobError::InvalidTransition { from: JobStatus::Pending, to: JobStatus::Completed }
        ));

        store.update(id, JobStatus::InProgress, None, None).await.unwrap();
        store.update(id, JobStatus::Failed, None, Some("boom".into())).await.unwrap();
        assert!(store.update(id, JobStatus::InProgress, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = JobStore::new();
        let missing = Uuid::new_v4();
        assert!(matches!(store.get(missing).await, Err(JobError::NotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_spawn_records_success() {
        let store = Arc::new(JobStore::new());
        let id = store
            .spawn(async { Ok::<_, String>("report".to_string()) })
            .await;

        let job = wait_terminal(&store, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(JobOutput { report: "report".into() }));
    }

    #[tokio::test]
    async fn test_spawn_records_failure() {
        let store = Arc::new(JobStore::new());
        let id = store
            .spawn(async { Err::<String, _>("missing API key".to_string()) })
            .await;

        let job = wait_terminal(&store, id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("missing API key"));
        assert!(job.result.is_none());
    }

    #[tokio::test]
    async fn test_spawn_records_panic_as_failure() {
        let store = Arc::new(JobStore::new());
        let id = store
            .spawn(async {
                if true {
                    panic!("stage blew up");
                }
                Ok::<String, String>(String::new())
            })
            .await;

        let job = wait_terminal(&store, id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("job panicked: stage blew up"));
        assert!(job.result.is_none());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&JobStatus::InProgress).unwrap(), "\"in_progress\"");
    }
}
