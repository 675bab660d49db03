use chrono::{Datelike, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::FootballDataSource;
use crate::db::models::{HeadToHeadStats, Match, MatchStatus, Prediction, TeamStats};
use crate::leagues::{self, League};

use super::PredictionModel;

/// Fetches fixtures and statistics from a data source and runs a model
/// over every upcoming match.
pub struct MatchPredictor {
    source: Arc<dyn FootballDataSource>,
    model: Box<dyn PredictionModel>,
    h2h_limit: u32,
}

impl MatchPredictor {
    pub fn new(
        source: Arc<dyn FootballDataSource>,
        model: Box<dyn PredictionModel>,
        h2h_limit: u32,
    ) -> Self {
        MatchPredictor {
            source,
            model,
            h2h_limit,
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    /// Fixtures in `[today, today + days_ahead]` across `leagues`, sorted by
    /// kickoff. Leagues are queried concurrently; one failing league is
    /// logged and skipped. Finished and cancelled fixtures are dropped.
    pub async fn get_upcoming_matches(
        &self,
        leagues: &[League],
        days_ahead: u32,
        today: NaiveDate,
    ) -> Vec<Match> {
        let to = today + Duration::days(days_ahead as i64);

        let fetches: Vec<_> = leagues
            .iter()
            .map(|league| {
                let source = Arc::clone(&self.source);
                async move {
                    let res = source.fixtures(league.id, league.season, today, to).await;
                    (league.key, res)
                }
            })
            .collect();

        let mut matches = Vec::new();
        for (key, result) in futures_util::future::join_all(fetches).await {
            match result {
                Ok(found) => {
                    info!("{}: {} fixture(s) between {} and {}", key, found.len(), today, to);
                    matches.extend(found.into_iter().filter(|m| {
                        !matches!(m.status, MatchStatus::Finished | MatchStatus::Cancelled)
                    }));
                }
                Err(e) => error!("Failed to get fixtures for league {}: {:#}", key, e),
            }
        }

        matches.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        matches
    }

    pub async fn get_team_stats(&self, team_id: i64, league_id: i64, season: i32) -> Option<TeamStats> {
        match self.source.team_stats(team_id, league_id, season).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("Failed to get statistics for team {}: {:#}", team_id, e);
                None
            }
        }
    }

    pub async fn get_h2h_stats(&self, team1_id: i64, team2_id: i64) -> Option<HeadToHeadStats> {
        match self
            .source
            .head_to_head(team1_id, team2_id, self.h2h_limit)
            .await
        {
            Ok(matches) => Some(HeadToHeadStats::from_matches(team1_id, team2_id, matches)),
            Err(e) => {
                error!(
                    "Failed to get H2H data for teams {} and {}: {:#}",
                    team1_id, team2_id, e
                );
                None
            }
        }
    }

    /// Season to query stats for: the configured season of a known league,
    /// else the kickoff year, else the current year.
    fn season_for(fixture: &Match) -> i32 {
        leagues::by_id(fixture.league_id)
            .map(|l| l.season)
            .or_else(|| fixture.date.map(|d| d.year()))
            .unwrap_or_else(|| Utc::now().year())
    }

    /// Predict one fixture. `None` when either team's stats are unavailable;
    /// a missing H2H record only lowers confidence.
    pub async fn predict_match(&self, fixture: &Match) -> Option<Prediction> {
        info!("Predicting match: {}", fixture.title());
        let season = Self::season_for(fixture);

        let (home, away, h2h) = tokio::join!(
            self.get_team_stats(fixture.home_team.id, fixture.league_id, season),
            self.get_team_stats(fixture.away_team.id, fixture.league_id, season),
            self.get_h2h_stats(fixture.home_team.id, fixture.away_team.id),
        );

        let (Some(home), Some(away)) = (home, away) else {
            error!("Failed to get team statistics for {}", fixture.title());
            return None;
        };
        if h2h.is_none() {
            warn!("Predicting {} without head-to-head data", fixture.title());
        }

        Some(self.model.predict(fixture, &home, &away, h2h.as_ref()))
    }

    /// Fetch and predict every upcoming fixture, skipping failures.
    pub async fn analyze(&self, leagues: &[League], days_ahead: u32, today: NaiveDate) -> Vec<Prediction> {
        info!(
            "Analysing upcoming matches for {} league(s) with the {} model via {}",
            leagues.len(),
            self.model.name(),
            self.source.name()
        );
        let matches = self.get_upcoming_matches(leagues, days_ahead, today).await;
        info!("Found {} upcoming match(es)", matches.len());
        if matches.is_empty() {
            warn!("No upcoming matches found");
            return vec![];
        }

        let mut predictions = Vec::with_capacity(matches.len());
        for fixture in &matches {
            match self.predict_match(fixture).await {
                Some(p) => predictions.push(p),
                None => warn!("Failed to predict match: {}", fixture.title()),
            }
        }
        info!("Successfully analysed {} match(es)", predictions.len());
        predictions
    }
}
