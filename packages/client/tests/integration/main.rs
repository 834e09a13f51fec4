mod common;

mod contest;
mod leaderboard;
mod submission;
