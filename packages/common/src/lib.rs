pub mod config;
pub mod contest;
pub mod leaderboard;
pub mod merge;
pub mod normalize;
pub mod retry;
pub mod submission;
pub mod submission_status;

pub use leaderboard::{LeaderboardEntry, LeaderboardUpdate, LeaderboardView};
pub use merge::{merge_leaderboard, merge_submission};
pub use submission::{SubmissionUpdate, SubmissionView, TestCaseResult};
pub use submission_status::{SubmissionStatus, TestCaseStatus};
