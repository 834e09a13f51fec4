use std::time::Duration;

use serde::Deserialize;

use crate::retry::RetryPolicy;

/// Backend service endpoints.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Submission query service base URL. Default: "http://localhost:8000".
    #[serde(default = "default_submission_url")]
    pub submission_url: String,
    /// Stream URL template for submissions, `{id}` is replaced by the
    /// submission id. Used when the server does not provide one.
    #[serde(default = "default_submission_stream_url")]
    pub submission_stream_url: Option<String>,
    /// Problem detail service base URL. Default: "http://localhost:8000".
    #[serde(default = "default_problems_url")]
    pub problems_url: String,
    /// Contest listing endpoint. Default: "http://localhost:8001/contests/".
    #[serde(default = "default_contests_url")]
    pub contests_url: String,
    /// Contest registration endpoint. Default: "http://localhost:8001/register/".
    #[serde(default = "default_registration_url")]
    pub registration_url: String,
    /// Leaderboard snapshot endpoint. Default: "http://localhost:8002/leaderboard".
    #[serde(default = "default_leaderboard_url")]
    pub leaderboard_url: String,
    /// Leaderboard stream base URL; the escaped contest title is appended.
    /// Default: "ws://localhost:8002/ws/leaderboard".
    #[serde(default = "default_leaderboard_stream_url")]
    pub leaderboard_stream_url: String,
    /// Complexity-analysis endpoint. Default: "http://localhost:8003/analyze/".
    #[serde(default = "default_complexity_url")]
    pub complexity_url: String,
}

fn default_submission_url() -> String {
    "http://localhost:8000".into()
}
fn default_submission_stream_url() -> Option<String> {
    Some("ws://localhost:8000/ws/submission/{id}/".into())
}
fn default_problems_url() -> String {
    "http://localhost:8000".into()
}
fn default_contests_url() -> String {
    "http://localhost:8001/contests/".into()
}
fn default_registration_url() -> String {
    "http://localhost:8001/register/".into()
}
fn default_leaderboard_url() -> String {
    "http://localhost:8002/leaderboard".into()
}
fn default_leaderboard_stream_url() -> String {
    "ws://localhost:8002/ws/leaderboard".into()
}
fn default_complexity_url() -> String {
    "http://localhost:8003/analyze/".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            submission_url: default_submission_url(),
            submission_stream_url: default_submission_stream_url(),
            problems_url: default_problems_url(),
            contests_url: default_contests_url(),
            registration_url: default_registration_url(),
            leaderboard_url: default_leaderboard_url(),
            leaderboard_stream_url: default_leaderboard_stream_url(),
            complexity_url: default_complexity_url(),
        }
    }
}

/// HTTP client behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Per-request timeout in seconds. Default: 10.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retry policy for explicitly retried fetches. Default: no retries.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Live update channel behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    /// Connect timeout in seconds. Default: 10.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Close the channel after this many seconds without a frame. 0 disables
    /// the bound. Default: 60.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Buffered events between the channel task and the consumer. Default: 64.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Base interval for the polling fallback in milliseconds. Default: 2000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Polls before giving up on an in-progress submission. Default: 30.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_idle_timeout_secs() -> u64 {
    60
}
fn default_event_buffer() -> usize {
    64
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_max_poll_attempts() -> u32 {
    30
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            event_buffer: default_event_buffer(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl ChannelConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

/// Local key/value store holding the session and the contest handoff.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Path of the store file. Default: `<config dir>/codeverse/store.json`.
    #[serde(default)]
    pub path: Option<String>,
}

/// Everything the client library needs.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}
