use std::sync::Arc;

use common::config::ClientConfig;

use crate::channel::Connector;
use crate::complexity::ComplexityAnalyzer;
use crate::contests::ContestService;
use crate::error::Result;
use crate::fetcher::ResultFetcher;
use crate::http::ApiClient;
use crate::store::LocalStore;
use crate::tracker::{LeaderboardTracker, SubmissionTracker};
use crate::ws::WsConnector;

/// Every service wired from one [`ClientConfig`].
#[derive(Clone)]
pub struct ClientState {
    pub config: ClientConfig,
    pub fetcher: ResultFetcher,
    pub contests: ContestService,
    pub complexity: ComplexityAnalyzer,
    pub connector: Arc<dyn Connector>,
}

impl ClientState {
    pub fn new(config: ClientConfig, store: Option<LocalStore>) -> Result<Self> {
        Self::with_connector(config, store, Arc::new(WsConnector))
    }

    pub fn with_connector(
        config: ClientConfig,
        store: Option<LocalStore>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let api = ApiClient::new(&config.http)?;
        let fetcher = ResultFetcher::new(api.clone(), config.api.clone(), config.http.retry);
        let mut contests = ContestService::new(api.clone(), config.api.clone());
        if let Some(store) = store {
            contests = contests.with_store(store);
        }
        let complexity = ComplexityAnalyzer::new(api, config.api.complexity_url.clone());

        Ok(Self {
            config,
            fetcher,
            contests,
            complexity,
            connector,
        })
    }

    pub fn submission_tracker(&self) -> SubmissionTracker {
        SubmissionTracker::new(
            Arc::new(self.fetcher.clone()),
            Arc::clone(&self.connector),
            self.config.api.clone(),
            self.config.channel.clone(),
        )
    }

    pub fn leaderboard_tracker(&self) -> LeaderboardTracker {
        LeaderboardTracker::new(
            Arc::new(self.fetcher.clone()),
            Arc::clone(&self.connector),
            self.config.api.leaderboard_stream_url.clone(),
            self.config.channel.clone(),
        )
    }
}
