//! Weighted-average heuristics over season aggregates, form and H2H history.

use crate::db::models::{
    percent, round_to, Btts, FirstHalf, HeadToHeadStats, Match, Outcome, OutcomeProbabilities,
    OverUnder, Prediction, TeamStats,
};

use super::form::form_points;
use super::{btts_label, reasoning, PredictionModel, ScoreEstimate, OVER_UNDER_THRESHOLDS};

const HOME_ADVANTAGE: f64 = 0.1;
/// (home, draw, away) used when there is nothing to go on.
const PRIOR: (f64, f64, f64) = (0.45, 0.30, 0.25);

pub struct BasicModel;

impl PredictionModel for BasicModel {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn predict(
        &self,
        fixture: &Match,
        home: &TeamStats,
        away: &TeamStats,
        h2h: Option<&HeadToHeadStats>,
    ) -> Prediction {
        let score = predict_score(home, away, h2h);
        let (p_home, p_draw, p_away) = predict_outcome(home, away, h2h);

        Prediction {
            fixture: fixture.clone(),
            home_win_probability: p_home,
            draw_probability: p_draw,
            away_win_probability: p_away,
            predicted_home_score: score.home_xg,
            predicted_away_score: score.away_xg,
            confidence: score.confidence,
            over_under: OVER_UNDER_THRESHOLDS
                .iter()
                .map(|t| predict_over_under(home, away, *t))
                .collect(),
            btts: Some(predict_btts(home, away)),
            first_half: Some(predict_first_half(home, away)),
            reasoning: reasoning(home, away, h2h),
        }
    }
}

/// Expected goals from a 60/40 blend of own attack and opponent defence,
/// nudged for home advantage and blended 70/30 with past meetings.
pub fn predict_score(
    home: &TeamStats,
    away: &TeamStats,
    h2h: Option<&HeadToHeadStats>,
) -> ScoreEstimate {
    let mut home_xg = (home.avg_goals_scored * 0.6 + away.avg_goals_conceded * 0.4) * 1.1;
    let mut away_xg = (away.avg_goals_scored * 0.6 + home.avg_goals_conceded * 0.4) * 0.9;

    if let Some(h2h) = h2h.filter(|h| h.total_matches > 0) {
        let mut goals_home = 0i64;
        let mut goals_away = 0i64;
        let mut counted = 0i64;
        for m in &h2h.matches {
            if let Some((f, a)) = m.goals_for_team(home.team_id) {
                goals_home += f as i64;
                goals_away += a as i64;
                counted += 1;
            }
        }
        if counted > 0 {
            let h2h_home = goals_home as f64 / counted as f64;
            let h2h_away = goals_away as f64 / counted as f64;
            home_xg = home_xg * 0.7 + h2h_home * 0.3;
            away_xg = away_xg * 0.7 + h2h_away * 0.3;
        }
    }

    let played_factor = if home.matches_played >= 10 && away.matches_played >= 10 {
        1.0
    } else if home.matches_played >= 5 && away.matches_played >= 5 {
        0.8
    } else {
        0.6
    };
    let h2h_total = h2h.map_or(0, |h| h.total_matches);
    let h2h_factor = if h2h_total >= 5 {
        1.0
    } else if h2h_total >= 2 {
        0.8
    } else {
        0.6
    };

    ScoreEstimate {
        home_xg,
        away_xg,
        confidence: (played_factor + h2h_factor) / 2.0,
    }
}

/// Form-only result probabilities. The draw share is whatever the two
/// form-based win shares leave over.
fn form_probabilities(home: &TeamStats, away: &TeamStats) -> (f64, f64, f64) {
    let home_points = form_points(&home.form);
    let away_points = form_points(&away.form);
    let total = home_points + away_points + HOME_ADVANTAGE;
    if total <= 0.0 {
        return PRIOR;
    }
    let p_home = (home_points + HOME_ADVANTAGE) / total;
    let p_away = away_points / total;
    (p_home, 1.0 - p_home - p_away, p_away)
}

fn normalise((h, d, a): (f64, f64, f64)) -> (f64, f64, f64) {
    let (h, d, a) = (h.max(0.0), d.max(0.0), a.max(0.0));
    let total = h + d + a;
    if total <= 0.0 {
        return PRIOR;
    }
    (h / total, d / total, a / total)
}

/// (home, draw, away) as fractions summing to one: 70% form, 30% H2H record.
pub fn predict_outcome(
    home: &TeamStats,
    away: &TeamStats,
    h2h: Option<&HeadToHeadStats>,
) -> (f64, f64, f64) {
    let (fh, fd, fa) = form_probabilities(home, away);
    let (hh, hd, ha) = match h2h.filter(|h| h.total_matches > 0) {
        Some(h) => {
            let n = h.total_matches as f64;
            (h.team1_wins as f64 / n, h.draws as f64 / n, h.team2_wins as f64 / n)
        }
        None => PRIOR,
    };
    normalise((
        fh * 0.7 + hh * 0.3,
        fd * 0.7 + hd * 0.3,
        fa * 0.7 + ha * 0.3,
    ))
}

pub fn predict_over_under(home: &TeamStats, away: &TeamStats, threshold: f64) -> OverUnder {
    let expected_goals = 0.5
        * (home.avg_goals_scored
            + away.avg_goals_conceded
            + away.avg_goals_scored
            + home.avg_goals_conceded);

    let mut p = 0.5 + 0.1 * (expected_goals - threshold);

    let often_blank = |s: &TeamStats| s.failed_to_score as f64 > 0.3 * s.matches_played as f64;
    let often_clean = |s: &TeamStats| s.clean_sheets as f64 > 0.3 * s.matches_played as f64;
    if often_blank(home) || often_blank(away) {
        p -= 0.1;
    }
    if often_clean(home) || often_clean(away) {
        p -= 0.1;
    }
    let p = p.clamp(0.0, 1.0);

    OverUnder {
        threshold,
        prediction: p > 0.5,
        probability: percent(p),
        expected_goals: round_to(expected_goals, 2),
        confidence: None,
    }
}

pub fn predict_btts(home: &TeamStats, away: &TeamStats) -> Btts {
    let home_scores = home.scoring_rate().unwrap_or(0.5);
    let away_scores = away.scoring_rate().unwrap_or(0.5);
    let home_concedes = home.clean_sheet_rate().map_or(0.5, |r| 1.0 - r);
    let away_concedes = away.clean_sheet_rate().map_or(0.5, |r| 1.0 - r);

    let p = ((home_scores * away_concedes + away_scores * home_concedes) / 2.0).clamp(0.0, 1.0);

    Btts {
        prediction: p > 0.5,
        probability: percent(p),
        confidence: btts_label(p),
    }
}

/// Half-time result: form probabilities shifted toward the draw.
pub fn predict_first_half(home: &TeamStats, away: &TeamStats) -> FirstHalf {
    let (h, d, a) = form_probabilities(home, away);
    let (h, d, a) = normalise((h - 0.05, d + 0.1, a - 0.05));
    let (prediction, confidence) = Outcome::argmax(h, d, a);

    FirstHalf {
        prediction,
        probabilities: OutcomeProbabilities::from_fractions(h, d, a),
        confidence: percent(confidence),
    }
}
