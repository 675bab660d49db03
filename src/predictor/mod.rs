pub mod basic;
pub mod engine;
pub mod enhanced;
pub mod form;
pub mod poisson;

pub use basic::BasicModel;
pub use engine::MatchPredictor;
pub use enhanced::EnhancedModel;

use crate::config::ModelKind;
use crate::db::models::{ConfidenceLabel, HeadToHeadStats, Match, Prediction, TeamStats};

/// Goal lines predicted for every fixture.
pub const OVER_UNDER_THRESHOLDS: [f64; 4] = [1.5, 2.5, 3.5, 4.5];

/// A statistical model turning season aggregates into a prediction.
pub trait PredictionModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// `h2h` is oriented with the home team as team1.
    fn predict(
        &self,
        fixture: &Match,
        home: &TeamStats,
        away: &TeamStats,
        h2h: Option<&HeadToHeadStats>,
    ) -> Prediction;
}

pub fn model_for(kind: ModelKind) -> Box<dyn PredictionModel> {
    match kind {
        ModelKind::Basic => Box::new(BasicModel),
        ModelKind::Enhanced => Box::new(EnhancedModel),
    }
}

/// Expected goals for each side plus how much we trust them (0–1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreEstimate {
    pub home_xg: f64,
    pub away_xg: f64,
    pub confidence: f64,
}

pub(crate) fn btts_label(probability: f64) -> ConfidenceLabel {
    let distance = (probability - 0.5).abs();
    if distance > 0.2 {
        ConfidenceLabel::High
    } else if distance > 0.1 {
        ConfidenceLabel::Medium
    } else {
        ConfidenceLabel::Low
    }
}

/// Human-readable summary of the inputs behind a prediction.
pub(crate) fn reasoning(
    home: &TeamStats,
    away: &TeamStats,
    h2h: Option<&HeadToHeadStats>,
) -> Vec<String> {
    let show_form = |f: &str| if f.is_empty() { "n/a".to_string() } else { form::recent(f, 5).to_string() };
    let mut lines = vec![
        format!(
            "Current form (last 5): {}: {}, {}: {}",
            home.team_name,
            show_form(&home.form),
            away.team_name,
            show_form(&away.form)
        ),
        format!(
            "Season goals scored per game: {}: {:.1}, {}: {:.1}",
            home.team_name, home.avg_goals_scored, away.team_name, away.avg_goals_scored
        ),
        format!(
            "Season goals conceded per game: {}: {:.1}, {}: {:.1}",
            home.team_name, home.avg_goals_conceded, away.team_name, away.avg_goals_conceded
        ),
    ];
    if let Some(h2h) = h2h.filter(|h| h.total_matches > 0) {
        lines.push(format!(
            "H2H record (last {}): {} wins: {}, {} wins: {}, draws: {}",
            h2h.total_matches,
            home.team_name,
            h2h.team1_wins,
            away.team_name,
            h2h.team2_wins,
            h2h.draws
        ));
    }
    lines
}
