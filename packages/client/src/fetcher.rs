use async_trait::async_trait;
use chrono::Utc;
use common::config::ApiConfig;
use common::retry::RetryPolicy;
use common::{LeaderboardUpdate, LeaderboardView, SubmissionView};
use tracing::{info, warn};

use crate::endpoints;
use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ErrorMessages};
use crate::session::Session;

const SUBMISSION_ERRORS: ErrorMessages =
    ErrorMessages::new(&["detail", "message"], "Failed to fetch submission details");
const LEADERBOARD_ERRORS: ErrorMessages =
    ErrorMessages::new(&["message", "detail"], "Failed to fetch leaderboard");

/// Initial snapshot of a submission.
#[async_trait]
pub trait SubmissionSource: Send + Sync {
    async fn fetch_submission(&self, id: &str, session: &Session) -> Result<SubmissionView>;

    /// First fetch when a submission is opened. Sources with a retry policy
    /// apply it here; polling stays on [`SubmissionSource::fetch_submission`].
    async fn load_submission(&self, id: &str, session: &Session) -> Result<SubmissionView> {
        self.fetch_submission(id, session).await
    }
}

/// Initial snapshot of a contest leaderboard.
#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    async fn fetch_leaderboard(&self, contest_title: &str) -> Result<LeaderboardView>;
}

/// Issues the initial fetch for submissions and leaderboards and normalizes
/// the response at the boundary.
///
/// A fetch is a single request. The configured retry policy applies to
/// [`ResultFetcher::fetch_submission_with_retry`], which is also what
/// [`SubmissionSource::load_submission`] uses.
#[derive(Clone)]
pub struct ResultFetcher {
    api: ApiClient,
    endpoints: ApiConfig,
    retry: RetryPolicy,
}

impl ResultFetcher {
    pub fn new(api: ApiClient, endpoints: ApiConfig, retry: RetryPolicy) -> Self {
        Self {
            api,
            endpoints,
            retry,
        }
    }

    pub fn endpoints(&self) -> &ApiConfig {
        &self.endpoints
    }

    /// Fetch with the configured retry policy, retrying only failures that
    /// may go away (transport errors, timeouts, 5xx).
    pub async fn fetch_submission_with_retry(
        &self,
        id: &str,
        session: &Session,
    ) -> Result<SubmissionView> {
        let mut retries: u8 = 0;
        loop {
            match self.fetch_submission(id, session).await {
                Ok(view) => return Ok(view),
                Err(e) if e.is_retryable() && self.retry.allows_retry(retries) => {
                    retries += 1;
                    let delay = self.retry.delay_for(retries);
                    warn!(
                        submission_id = %id,
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying submission fetch"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl SubmissionSource for ResultFetcher {
    async fn fetch_submission(&self, id: &str, session: &Session) -> Result<SubmissionView> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ClientError::MissingIdentifier);
        }
        let token = session.bearer()?;

        let url = endpoints::submission_url(&self.endpoints.submission_url, id)?;
        let raw = self
            .api
            .get_json(url.as_str(), Some(token), &[], SUBMISSION_ERRORS)
            .await?;

        let view = SubmissionView::normalize(id, &raw, Utc::now());
        info!(
            submission_id = %view.id,
            status = %view.status,
            passed = view.test_cases_passed,
            total = view.total_test_cases,
            "Fetched submission"
        );
        Ok(view)
    }

    async fn load_submission(&self, id: &str, session: &Session) -> Result<SubmissionView> {
        self.fetch_submission_with_retry(id, session).await
    }
}

#[async_trait]
impl LeaderboardSource for ResultFetcher {
    async fn fetch_leaderboard(&self, contest_title: &str) -> Result<LeaderboardView> {
        let contest_title = contest_title.trim();
        if contest_title.is_empty() {
            return Err(ClientError::MissingIdentifier);
        }

        let url = endpoints::with_segments(&self.endpoints.leaderboard_url, &[""])?;
        let raw = self
            .api
            .get_json(
                url.as_str(),
                None,
                &[("contest_title", contest_title)],
                LEADERBOARD_ERRORS,
            )
            .await?;

        let update = LeaderboardUpdate::from_raw(&raw).ok_or(ClientError::EmptyResponse)?;
        info!(
            contest = %contest_title,
            entries = update.entries.len(),
            "Fetched leaderboard"
        );
        Ok(LeaderboardView::new(contest_title, update.entries, Utc::now()))
    }
}
