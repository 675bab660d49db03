use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::{Match, TeamStats};

/// Anything that can supply fixtures, season aggregates and past meetings.
#[async_trait]
pub trait FootballDataSource: Send + Sync {
    /// Fixtures for a league between two dates (inclusive).
    async fn fixtures(
        &self,
        league_id: i64,
        season: i32,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Match>>;

    /// Season aggregates for a team within a league.
    async fn team_stats(&self, team_id: i64, league_id: i64, season: i32) -> Result<TeamStats>;

    /// The last `last` meetings between two teams, in API order.
    async fn head_to_head(&self, team1_id: i64, team2_id: i64, last: u32) -> Result<Vec<Match>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
