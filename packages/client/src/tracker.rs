//! Trackers own a view, keep it current from a live channel, and fall back to
//! polling when the channel goes away before the work is done.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::config::{ApiConfig, ChannelConfig};
use common::retry::calculate_backoff;
use common::{
    LeaderboardEntry, LeaderboardUpdate, LeaderboardView, SubmissionUpdate, SubmissionView,
    merge_leaderboard, merge_submission,
};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::channel::{
    ChannelEvent, ChannelHandle, ChannelSettings, CloseReason, Connector, LiveUpdateChannel,
};
use crate::endpoints;
use crate::error::{ClientError, Result};
use crate::fetcher::{LeaderboardSource, SubmissionSource};
use crate::session::Session;

/// What a tracker produced on its last step.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent<V> {
    /// The view changed.
    Updated(V),
    /// Connectivity changed; the view is kept as is.
    Notice(String),
    /// The view reached a final state. Emitted once.
    Finished(V),
}

/// Bounded polling with backoff, used once live updates are gone.
#[derive(Debug, Clone)]
struct Poller {
    attempts: u32,
    max_attempts: u32,
    interval_ms: u64,
}

impl Poller {
    fn new(config: &ChannelConfig) -> Self {
        Self {
            attempts: 0,
            max_attempts: config.max_poll_attempts,
            interval_ms: config.poll_interval_ms,
        }
    }

    fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Count an attempt and return how long to wait before making it.
    fn next_delay(&mut self) -> Duration {
        self.attempts += 1;
        let attempt = u8::try_from(self.attempts).unwrap_or(u8::MAX);
        calculate_backoff(attempt, self.interval_ms, self.interval_ms.saturating_mul(8))
    }
}

fn close_notice(reason: CloseReason) -> String {
    format!("Live updates stopped ({reason}); checking periodically")
}

/// Tracks one submission from initial fetch to a final status.
pub struct SubmissionTracker {
    source: Arc<dyn SubmissionSource>,
    connector: Arc<dyn Connector>,
    endpoints: ApiConfig,
    channel_config: ChannelConfig,
    session: Session,
    view: Option<SubmissionView>,
    channel: Option<ChannelHandle<SubmissionUpdate>>,
    poller: Option<Poller>,
    finished: bool,
}

impl SubmissionTracker {
    pub fn new(
        source: Arc<dyn SubmissionSource>,
        connector: Arc<dyn Connector>,
        endpoints: ApiConfig,
        channel_config: ChannelConfig,
    ) -> Self {
        Self {
            source,
            connector,
            endpoints,
            channel_config,
            session: Session::anonymous(),
            view: None,
            channel: None,
            poller: None,
            finished: false,
        }
    }

    pub fn current(&self) -> Option<&SubmissionView> {
        self.view.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// Fetch the submission and, if it is still being judged, start
    /// following it. Any previously tracked submission is released first.
    pub async fn load(&mut self, id: &str, session: &Session) -> Result<&SubmissionView> {
        self.close();
        self.view = None;
        self.poller = None;
        self.finished = false;
        self.session = session.clone();

        let view = self.source.load_submission(id, session).await?;
        if view.status.is_in_progress() {
            match self.stream_url(&view) {
                Some(url) => {
                    debug!(submission_id = %view.id, url = %url, "Following submission");
                    self.channel = Some(LiveUpdateChannel::open(
                        &self.connector,
                        view.id.clone(),
                        url,
                        ChannelSettings::from(&self.channel_config),
                    ));
                }
                None => {
                    info!(submission_id = %view.id, "No stream available, polling");
                    self.poller = Some(Poller::new(&self.channel_config));
                }
            }
        }

        Ok(&*self.view.insert(view))
    }

    fn stream_url(&self, view: &SubmissionView) -> Option<Url> {
        let resolved = match (&view.stream_url, &self.endpoints.submission_stream_url) {
            (Some(candidate), _) => {
                endpoints::resolve_stream_url(&self.endpoints.submission_url, candidate)
            }
            (None, Some(template)) => endpoints::submission_stream_url(template, &view.id),
            (None, None) => return None,
        };
        resolved
            .inspect_err(|e| warn!(submission_id = %view.id, error = %e, "Unusable stream URL"))
            .ok()
    }

    /// Wait for the next change. `None` once there is nothing left to follow.
    pub async fn next_event(&mut self) -> Option<TrackerEvent<SubmissionView>> {
        loop {
            if self.finished {
                return None;
            }
            if self.view.as_ref()?.status.is_final() {
                self.finished = true;
                self.close();
                let view = self.view.clone()?;
                info!(submission_id = %view.id, status = %view.status, "Submission finished");
                return Some(TrackerEvent::Finished(view));
            }

            if let Some(channel) = self.channel.as_mut() {
                match channel.recv().await {
                    Some(ChannelEvent::Opened) => continue,
                    Some(ChannelEvent::Message(update)) => {
                        return Some(self.apply(&update));
                    }
                    Some(ChannelEvent::Error(ClientError::MalformedMessage(_))) => continue,
                    Some(ChannelEvent::Error(e)) => {
                        return Some(TrackerEvent::Notice(e.to_string()));
                    }
                    Some(ChannelEvent::Closed(reason)) => {
                        self.channel = None;
                        match reason {
                            CloseReason::Requested => return None,
                            CloseReason::Terminal => continue,
                            _ => {
                                self.poller = Some(Poller::new(&self.channel_config));
                                return Some(TrackerEvent::Notice(close_notice(reason)));
                            }
                        }
                    }
                    None => {
                        self.channel = None;
                        continue;
                    }
                }
            }

            return self.poll().await;
        }
    }

    fn apply(&mut self, update: &SubmissionUpdate) -> TrackerEvent<SubmissionView> {
        let Some(view) = self.view.as_mut() else {
            return TrackerEvent::Notice("No submission loaded".into());
        };
        *view = merge_submission(view, update, Some(Utc::now()));
        let view = view.clone();
        if view.status.is_final() {
            self.finished = true;
            self.close();
            TrackerEvent::Finished(view)
        } else {
            TrackerEvent::Updated(view)
        }
    }

    async fn poll(&mut self) -> Option<TrackerEvent<SubmissionView>> {
        let id = self.view.as_ref()?.id.clone();
        let poller = self.poller.as_mut()?;
        if poller.exhausted() {
            self.finished = true;
            warn!(submission_id = %id, attempts = poller.attempts, "Giving up on submission updates");
            return Some(TrackerEvent::Notice(
                "Still judging; refresh later for the final result".into(),
            ));
        }

        let delay = poller.next_delay();
        let attempt = poller.attempts;
        tokio::time::sleep(delay).await;

        match self.source.fetch_submission(&id, &self.session).await {
            Ok(snapshot) => {
                debug!(submission_id = %id, attempt, status = %snapshot.status, "Polled submission");
                Some(self.apply(&SubmissionUpdate::from(&snapshot)))
            }
            Err(e) if e.is_retryable() => {
                warn!(submission_id = %id, attempt, error = %e, "Poll failed");
                Some(TrackerEvent::Notice(e.to_string()))
            }
            Err(e) => {
                warn!(submission_id = %id, error = %e, "Poll failed, stopping");
                self.finished = true;
                Some(TrackerEvent::Notice(e.to_string()))
            }
        }
    }

    /// Stop following. The last view stays readable.
    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }
}

/// Tracks one contest's leaderboard.
pub struct LeaderboardTracker {
    source: Arc<dyn LeaderboardSource>,
    connector: Arc<dyn Connector>,
    stream_base: String,
    channel_config: ChannelConfig,
    view: Option<LeaderboardView>,
    channel: Option<ChannelHandle<LeaderboardUpdate>>,
    poller: Option<Poller>,
}

impl LeaderboardTracker {
    pub fn new(
        source: Arc<dyn LeaderboardSource>,
        connector: Arc<dyn Connector>,
        stream_base: impl Into<String>,
        channel_config: ChannelConfig,
    ) -> Self {
        Self {
            source,
            connector,
            stream_base: stream_base.into(),
            channel_config,
            view: None,
            channel: None,
            poller: None,
        }
    }

    pub fn current(&self) -> Option<&LeaderboardView> {
        self.view.as_ref()
    }

    /// 1-based rank and entry of `user_name` in the current standings.
    pub fn rank_of(&self, user_name: &str) -> Option<(usize, &LeaderboardEntry)> {
        self.view.as_ref()?.rank_of(user_name)
    }

    /// Fetch the standings for `contest_title` and subscribe to changes.
    pub async fn load(&mut self, contest_title: &str) -> Result<&LeaderboardView> {
        self.close();
        self.view = None;
        self.poller = None;

        let view = self.source.fetch_leaderboard(contest_title).await?;
        match endpoints::leaderboard_stream_url(&self.stream_base, contest_title) {
            Ok(url) => {
                // Standings only move when someone scores, so quiet periods
                // are normal here.
                let settings = ChannelSettings {
                    idle_timeout: None,
                    ..ChannelSettings::from(&self.channel_config)
                };
                self.channel = Some(LiveUpdateChannel::open(
                    &self.connector,
                    view.contest_id.clone(),
                    url,
                    settings,
                ));
            }
            Err(e) => {
                warn!(contest = %contest_title, error = %e, "Unusable leaderboard stream URL");
                self.poller = Some(Poller::new(&self.channel_config));
            }
        }

        Ok(&*self.view.insert(view))
    }

    pub async fn next_event(&mut self) -> Option<TrackerEvent<LeaderboardView>> {
        loop {
            let view = self.view.as_mut()?;

            if let Some(channel) = self.channel.as_mut() {
                match channel.recv().await {
                    Some(ChannelEvent::Opened) => continue,
                    Some(ChannelEvent::Message(update)) => {
                        *view = merge_leaderboard(view, &update, Utc::now());
                        debug!(contest = %view.contest_id, entries = view.entries.len(), "Leaderboard updated");
                        return Some(TrackerEvent::Updated(view.clone()));
                    }
                    Some(ChannelEvent::Error(ClientError::MalformedMessage(_))) => continue,
                    Some(ChannelEvent::Error(e)) => {
                        return Some(TrackerEvent::Notice(e.to_string()));
                    }
                    Some(ChannelEvent::Closed(CloseReason::Requested)) | None => {
                        self.channel = None;
                        return None;
                    }
                    Some(ChannelEvent::Closed(reason)) => {
                        self.channel = None;
                        self.poller = Some(Poller::new(&self.channel_config));
                        return Some(TrackerEvent::Notice(close_notice(reason)));
                    }
                }
            }

            let contest = view.contest_id.clone();
            let poller = self.poller.as_mut()?;
            if poller.exhausted() {
                self.poller = None;
                return None;
            }
            tokio::time::sleep(poller.next_delay()).await;
            return match self.source.fetch_leaderboard(&contest).await {
                Ok(snapshot) => {
                    let update = LeaderboardUpdate {
                        entries: snapshot.entries,
                    };
                    let view = self.view.as_mut()?;
                    *view = merge_leaderboard(view, &update, snapshot.last_updated);
                    Some(TrackerEvent::Updated(view.clone()))
                }
                Err(e) => {
                    warn!(contest = %contest, error = %e, "Leaderboard poll failed");
                    if !e.is_retryable() {
                        self.poller = None;
                    }
                    Some(TrackerEvent::Notice(e.to_string()))
                }
            };
        }
    }

    pub fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }
}
