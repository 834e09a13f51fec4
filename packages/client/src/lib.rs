pub mod channel;
pub mod complexity;
pub mod contests;
pub mod endpoints;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod session;
pub mod state;
pub mod store;
pub mod tracker;
pub mod ws;

pub use channel::{ChannelEvent, ChannelHandle, CloseReason, LiveUpdateChannel};
pub use error::{ClientError, Result};
pub use fetcher::{LeaderboardSource, ResultFetcher, SubmissionSource};
pub use session::Session;
pub use state::ClientState;
pub use store::LocalStore;
pub use tracker::{LeaderboardTracker, SubmissionTracker, TrackerEvent};
