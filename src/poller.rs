use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::configuration::PollerSettings;
use crate::helper::error_chain_fmt;

/// Statuses the poller keeps waiting on. Anything else is terminal.
const STATUS_PROCESSING: &str = "processing";
const STATUS_COMPLETED: &str = "completed";

/// Client-side poller for the `GET /status/{job_id}` endpoint.
///
/// Checks the job status at a fixed interval while it is `processing`,
/// one outstanding request at a time. Returns the full response payload on
/// `completed`; any other status, and any network failure, ends the poll
/// with an error. No automatic retry on network failures.
pub struct StatusPoller {
    client: reqwest::Client,
    base_url: String,
    interval: Duration,
    max_attempts: Option<u32>,
}

#[derive(thiserror::Error)]
pub enum PollJobError {
    /// The status request did not come back in time
    #[error("The status request timed out. The server might be busy")]
    Timeout(#[source] reqwest::Error),
    /// The server could not be reached at all
    #[error("Failed to reach the server. Check your connection")]
    Connectivity(#[source] reqwest::Error),
    #[error("The status request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Could not understand the status response: {0}")]
    InvalidResponse(#[source] reqwest::Error),
    /// The job ended in a status the poller does not wait on,
    /// e.g. `not_found` or `failed`
    #[error("The job ended with status `{status}`")]
    TerminalStatus { status: String, payload: JsonValue },
    #[error("Polling was cancelled")]
    Cancelled,
    #[error("The job was still processing after {0} checks")]
    AttemptsExhausted(u32),
}

impl std::fmt::Debug for PollJobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Failed to build the status poller HTTP client")]
pub struct StatusPollerBuildError(#[source] reqwest::Error);

impl StatusPoller {
    /// # Arguments
    /// - `base_url`: scheme, host and port of the service, without a trailing slash
    /// - `interval`: fixed delay between two status checks
    /// - `request_timeout`: per-request timeout
    /// - `max_attempts`: gives up after that many checks; `None` polls until
    ///   the server returns a terminal status
    pub fn new(
        base_url: String,
        interval: Duration,
        request_timeout: Duration,
        max_attempts: Option<u32>,
    ) -> Result<Self, StatusPollerBuildError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(StatusPollerBuildError)?;

        Ok(Self {
            client,
            base_url,
            interval,
            max_attempts,
        })
    }

    /// Builds a poller from the `poller` configuration section
    pub fn from_settings(
        base_url: String,
        settings: &PollerSettings,
    ) -> Result<Self, StatusPollerBuildError> {
        Self::new(
            base_url,
            settings.interval(),
            settings.request_timeout(),
            settings.max_attempts,
        )
    }

    /// Polls until the job reaches a terminal status.
    ///
    /// Convenience wrapper around [`StatusPoller::poll_with_cancellation`]
    /// for callers that do not need to stop the loop themselves.
    pub async fn poll(&self, job_id: &str) -> Result<JsonValue, PollJobError> {
        self.poll_with_cancellation(job_id, CancellationToken::new())
            .await
    }

    /// Polls until the job reaches a terminal status or `cancel_token` is
    /// cancelled. Cancellation wins over a sleeping delay, so a cancelled
    /// poll stops without waiting for the next check.
    #[tracing::instrument(name = "Polling job status", skip(self, cancel_token))]
    pub async fn poll_with_cancellation(
        &self,
        job_id: &str,
        cancel_token: CancellationToken,
    ) -> Result<JsonValue, PollJobError> {
        let url = format!("{}/status/{}", self.base_url, job_id);
        let mut attempts: u32 = 0;

        loop {
            if cancel_token.is_cancelled() {
                return Err(PollJobError::Cancelled);
            }

            attempts += 1;
            let payload = self.check_status(&url).await?;

            let status = payload
                .get("status")
                .and_then(JsonValue::as_str)
                .unwrap_or("unknown");

            match status {
                STATUS_PROCESSING => {
                    debug!(job_id, attempts, "Job is still processing");
                }
                STATUS_COMPLETED => {
                    info!(job_id, attempts, "Job completed");
                    return Ok(payload);
                }
                other => {
                    return Err(PollJobError::TerminalStatus {
                        status: other.to_string(),
                        payload,
                    });
                }
            }

            if let Some(max_attempts) = self.max_attempts {
                if attempts >= max_attempts {
                    return Err(PollJobError::AttemptsExhausted(max_attempts));
                }
            }

            tokio::select! {
                _ = cancel_token.cancelled() => return Err(PollJobError::Cancelled),
                _ = tokio::time::sleep(self.interval) => (),
            }
        }
    }

    /// One status check. A non-2xx response is not an error by itself:
    /// the server answers 404 with a `not_found` status payload.
    async fn check_status(&self, url: &str) -> Result<JsonValue, PollJobError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_request_error)?;

        response
            .json::<JsonValue>()
            .await
            .map_err(PollJobError::InvalidResponse)
    }
}

/// Maps a transport failure to the message category shown to the user:
/// timeout, unreachable server, or a generic fallback.
fn classify_request_error(error: reqwest::Error) -> PollJobError {
    if error.is_timeout() {
        PollJobError::Timeout(error)
    } else if error.is_connect() {
        PollJobError::Connectivity(error)
    } else {
        PollJobError::Request(error)
    }
}
