use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::models::ScoreEntry;
use crate::db::store::ScoreStore;
use crate::error::AppError;
use crate::validation::present;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitOutcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub outcome: SubmitOutcome,
    pub entry: ScoreEntry,
}

pub struct LeaderboardService {
    scores: Arc<dyn ScoreStore>,
}

impl LeaderboardService {
    pub fn new(scores: Arc<dyn ScoreStore>) -> Self {
        Self { scores }
    }

    /// Records `level_reached` for `username`, keeping only the best level.
    /// A level that does not beat the stored one is a successful no-op.
    pub async fn submit_result(
        &self,
        username: Option<&str>,
        level_reached: Option<i64>,
    ) -> Result<Submission> {
        let invalid = || AppError::InvalidInput("Username and levelReached are required!".to_string());

        let username = present(username).ok_or_else(invalid)?;
        let level = match level_reached {
            Some(level) if level > 0 => i32::try_from(level).map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };

        match self.scores.find_by_username(username).await? {
            Some(existing) => self.raise(existing, level).await,
            None => match self.scores.create(username, level).await {
                Ok(entry) => {
                    info!(username, level, "leaderboard entry created");
                    Ok(Submission {
                        outcome: SubmitOutcome::Created,
                        entry,
                    })
                }
                // another request inserted the first entry in the meantime
                Err(AppError::Conflict(_)) => {
                    let existing = self.scores.find_by_username(username).await?.ok_or_else(|| {
                        AppError::Internal(format!("score entry for {} missing after conflict", username))
                    })?;
                    self.raise(existing, level).await
                }
                Err(e) => Err(e),
            },
        }
    }

    pub async fn list_all(&self) -> Result<Vec<ScoreEntry>> {
        self.scores.list_all().await
    }

    async fn raise(&self, existing: ScoreEntry, level: i32) -> Result<Submission> {
        if level <= existing.level_reached {
            debug!(username = %existing.username, level, best = existing.level_reached, "result not higher");
            return Ok(Submission {
                outcome: SubmitOutcome::Unchanged,
                entry: existing,
            });
        }

        match self.scores.raise_level(&existing.username, level).await? {
            Some(entry) => {
                info!(username = %entry.username, level, "leaderboard entry updated");
                Ok(Submission {
                    outcome: SubmitOutcome::Updated,
                    entry,
                })
            }
            // a concurrent submission already stored something at least as high
            None => Ok(Submission {
                outcome: SubmitOutcome::Unchanged,
                entry: self
                    .scores
                    .find_by_username(&existing.username)
                    .await?
                    .unwrap_or(existing),
            }),
        }
    }
}
