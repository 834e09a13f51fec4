use common::config::ApiConfig;
use common::contest::{ContestSnapshot, ContestSummary, ProblemSummary};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::endpoints;
use crate::error::{ClientError, Result};
use crate::http::{ApiClient, ErrorMessages};
use crate::session::Session;
use crate::store::LocalStore;

const LIST_ERRORS: ErrorMessages = ErrorMessages::new(&["message", "detail"], "Failed to load contests.");
const REGISTER_ERRORS: ErrorMessages =
    ErrorMessages::new(&["message", "detail"], "Failed to enter contest");
const PROBLEM_ERRORS: ErrorMessages =
    ErrorMessages::new(&["message", "detail"], "Failed to fetch problem");

#[derive(Debug, Serialize)]
struct Registration<'a> {
    user_id: i64,
    contest_title: &'a str,
}

/// Contest listing, registration and the contest problem set.
#[derive(Clone)]
pub struct ContestService {
    api: ApiClient,
    endpoints: ApiConfig,
    store: Option<LocalStore>,
}

impl ContestService {
    pub fn new(api: ApiClient, endpoints: ApiConfig) -> Self {
        Self {
            api,
            endpoints,
            store: None,
        }
    }

    /// Persist the entered contest so later invocations can pick it up.
    pub fn with_store(mut self, store: LocalStore) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn list_contests(&self) -> Result<Vec<ContestSummary>> {
        let raw = self
            .api
            .get_json(&self.endpoints.contests_url, None, &[], LIST_ERRORS)
            .await?;
        let contests: Vec<ContestSummary> = raw
            .get("contests")
            .and_then(|c| c.as_array())
            .map(|items| items.iter().map(ContestSummary::from_raw).collect())
            .unwrap_or_default();
        info!(count = contests.len(), "Fetched contests");
        Ok(contests)
    }

    /// Register the session's user for `contest` and return the snapshot the
    /// contest page works from.
    pub async fn register(
        &self,
        session: &Session,
        contest: &ContestSummary,
    ) -> Result<ContestSnapshot> {
        if !contest.has_problems() {
            return Err(ClientError::Validation(
                "Contest problems are not available yet".into(),
            ));
        }
        let token = session.bearer()?;
        let user_id = session.require_user_id()?;

        let payload = Registration {
            user_id,
            contest_title: &contest.title,
        };
        self.api
            .post_json(
                &self.endpoints.registration_url,
                Some(token),
                &payload,
                REGISTER_ERRORS,
            )
            .await
            .or_else(|e| match e {
                // Registration acknowledgements carry no body we need.
                ClientError::EmptyResponse => Ok(serde_json::Value::Null),
                e => Err(e),
            })?;
        info!(contest_id = %contest.contest_id, user_id, "Registered for contest");

        let snapshot = ContestSnapshot::from(contest);
        if let Some(store) = &self.store {
            store.set_current_contest(&snapshot).await?;
        }
        Ok(snapshot)
    }

    /// Fetch every problem of the contest concurrently.
    ///
    /// A problem that fails to load becomes a placeholder carrying its error;
    /// only a rejected session fails the whole load.
    pub async fn load_problems(
        &self,
        session: &Session,
        snapshot: &ContestSnapshot,
    ) -> Result<Vec<ProblemSummary>> {
        let token = session.bearer()?;

        let fetches = snapshot
            .problems
            .iter()
            .map(|id| self.fetch_problem(token, id));
        let results = join_all(fetches).await;

        let mut problems = Vec::with_capacity(results.len());
        for (id, result) in snapshot.problems.iter().zip(results) {
            match result {
                Ok(problem) => problems.push(problem),
                Err(ClientError::AuthRequired) => {
                    warn!(contest_id = %snapshot.contest_id, problem_id = %id, "Problem fetch rejected session");
                    return Err(ClientError::AuthRequired);
                }
                Err(e) => {
                    let partial = ClientError::PartialDataUnavailable {
                        item: format!("problem {id}"),
                        message: e.to_string(),
                    };
                    warn!(contest_id = %snapshot.contest_id, error = %partial, "Using placeholder problem");
                    problems.push(ProblemSummary::placeholder(id, e.to_string()));
                }
            }
        }

        if problems.is_empty() {
            return Err(ClientError::Validation(
                "No valid problems found for this contest".into(),
            ));
        }
        info!(
            contest_id = %snapshot.contest_id,
            total = problems.len(),
            placeholders = problems.iter().filter(|p| p.is_placeholder()).count(),
            "Loaded contest problems"
        );
        Ok(problems)
    }

    async fn fetch_problem(&self, token: &str, id: &str) -> Result<ProblemSummary> {
        let url = endpoints::problem_url(&self.endpoints.problems_url, id)?;
        let raw = self
            .api
            .get_json(url.as_str(), Some(token), &[], PROBLEM_ERRORS)
            .await?;
        Ok(ProblemSummary::from_raw(id, &raw))
    }
}
