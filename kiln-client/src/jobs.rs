//! Job-related API endpoints

use async_trait::async_trait;
use kiln_core::domain::credential::Credential;
use kiln_core::domain::job::{Job, JobId};
use kiln_core::domain::status::{SUCCESS_STATUS, StatusSnapshot, TaskData};
use kiln_core::dto::job::{JobSpec, SubmitData};
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::transport::Transport;
use crate::{JobClient, decode_envelope};

const SUBMIT_PATH: &str = "/api/task/submit";
const STATUS_PATH: &str = "/api/task/status";

/// Anything that can answer a status query for a job
///
/// This is the only capability the polling engine needs, which keeps it
/// independent of the HTTP plumbing.
#[async_trait]
pub trait StatusQuery: Send + Sync {
    /// Performs one status query; must be safe to call repeatedly
    async fn query_status(&self, job_id: &JobId, credential: &Credential)
    -> Result<StatusSnapshot>;
}

impl<T: Transport> JobClient<T> {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Submit a new generation job
    ///
    /// Submission is a one-shot action: failures are returned to the caller
    /// and never retried here.
    ///
    /// # Arguments
    /// * `spec` - The job description
    /// * `credential` - Session credential forwarded to the service
    ///
    /// # Returns
    /// The created job
    pub async fn submit(&self, spec: &JobSpec, credential: &Credential) -> Result<Job> {
        let body = serde_json::to_value(spec)
            .map_err(|e| ClientError::InvalidRequest(format!("Unserializable job spec: {}", e)))?;

        debug!("Submitting {} job", spec.job_type.as_str());
        let raw = self.transport.post_json(SUBMIT_PATH, &body, credential).await?;
        let envelope = decode_envelope::<SubmitData>(&raw)?;

        if envelope.status != SUCCESS_STATUS {
            return Err(ClientError::Rejected {
                status: envelope.status,
                message: envelope.message.unwrap_or_default(),
            });
        }

        let job: Job = envelope
            .data
            .ok_or_else(|| ClientError::Rejected {
                status: envelope.status,
                message: "response carries no task".to_string(),
            })?
            .into();

        info!("Submitted job {}", job.id);
        Ok(job)
    }

    /// Query the current status of a job
    ///
    /// A response whose envelope reports a failure still yields a snapshot;
    /// deciding what it means is left to the caller.
    ///
    /// # Arguments
    /// * `job_id` - The job to query
    /// * `credential` - Session credential forwarded to the service
    pub async fn query_status(
        &self,
        job_id: &JobId,
        credential: &Credential,
    ) -> Result<StatusSnapshot> {
        let raw = self
            .transport
            .get(STATUS_PATH, &[("taskId", job_id.as_str())], credential)
            .await?;
        let envelope = decode_envelope::<TaskData>(&raw)?;

        let snapshot = StatusSnapshot::new(envelope.status, envelope.message, envelope.data);
        debug!(
            "Job {} status: envelope={} application={}",
            job_id, snapshot.http_status, snapshot.application_status
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl<T: Transport> StatusQuery for JobClient<T> {
    async fn query_status(
        &self,
        job_id: &JobId,
        credential: &Credential,
    ) -> Result<StatusSnapshot> {
        JobClient::query_status(self, job_id, credential).await
    }
}
