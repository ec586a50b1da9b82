//! Per-user best level and the full leaderboard listing.

pub mod handlers;
mod service;

pub use service::{LeaderboardService, Submission, SubmitOutcome};
