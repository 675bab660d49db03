//! Attack/defence strength model with Poisson score grids.
//!
//! Each side's expected goals is `attack × opponent defence × league
//! average`, adjusted for recent form, venue, past meetings, defensive
//! solidity and scoring consistency. Outcome, exact-score and goal-line
//! probabilities then come from two independent Poisson distributions.

use chrono::{DateTime, Utc};

use crate::db::models::{
    percent, round_to, Btts, FirstHalf, HeadToHeadStats, Match, Outcome, OutcomeProbabilities,
    OverUnder, Prediction, TeamStats,
};

use super::form::{form_consistency, form_factor, recent};
use super::poisson;
use super::{btts_label, reasoning, PredictionModel, ScoreEstimate, OVER_UNDER_THRESHOLDS};

// Typical top-flight European per-match averages.
const LEAGUE_AVG_HOME_GOALS: f64 = 1.5;
const LEAGUE_AVG_AWAY_GOALS: f64 = 1.2;
const LEAGUE_AVG_HOME_CONCEDED: f64 = 1.2;
const LEAGUE_AVG_AWAY_CONCEDED: f64 = 1.5;

const HOME_BOOST: f64 = 1.2;
const AWAY_DAMPING: f64 = 0.85;
/// Decay per position for recency-weighted past meetings.
const H2H_DECAY: f64 = 0.3;
const H2H_WINDOW: usize = 5;

pub struct EnhancedModel;

impl PredictionModel for EnhancedModel {
    fn name(&self) -> &'static str {
        "enhanced"
    }

    fn predict(
        &self,
        fixture: &Match,
        home: &TeamStats,
        away: &TeamStats,
        h2h: Option<&HeadToHeadStats>,
    ) -> Prediction {
        let score = predict_score(home, away, h2h);
        let (ml_home, ml_away) = poisson::most_likely_score(score.home_xg, score.away_xg);
        let (p_home, p_draw, p_away) = poisson::outcome_probabilities(score.home_xg, score.away_xg);

        Prediction {
            fixture: fixture.clone(),
            home_win_probability: p_home,
            draw_probability: p_draw,
            away_win_probability: p_away,
            predicted_home_score: ml_home as f64,
            predicted_away_score: ml_away as f64,
            confidence: score.confidence,
            over_under: OVER_UNDER_THRESHOLDS
                .iter()
                .map(|t| predict_over_under(home, away, *t))
                .collect(),
            btts: Some(predict_btts(&score)),
            first_half: Some(predict_first_half(&score)),
            reasoning: reasoning(home, away, h2h),
        }
    }
}

fn rate(count: u32, played: u32) -> f64 {
    count as f64 / played.max(1) as f64
}

/// Expected goals before any form, venue or history adjustment.
fn base_expected_goals(home: &TeamStats, away: &TeamStats) -> (f64, f64) {
    let home_attack = home.avg_goals_scored / LEAGUE_AVG_HOME_GOALS.max(0.5);
    let away_defence = away.avg_goals_conceded / LEAGUE_AVG_AWAY_CONCEDED.max(0.5);
    let away_attack = away.avg_goals_scored / LEAGUE_AVG_AWAY_GOALS.max(0.5);
    let home_defence = home.avg_goals_conceded / LEAGUE_AVG_HOME_CONCEDED.max(0.5);

    (
        home_attack * away_defence * LEAGUE_AVG_HOME_GOALS,
        away_attack * home_defence * LEAGUE_AVG_AWAY_GOALS,
    )
}

/// Recency-weighted goals per side over the last five scored meetings,
/// oriented to `home_team_id`. `None` when no meeting has a score.
fn weighted_h2h_goals(h2h: &HeadToHeadStats, home_team_id: i64) -> Option<(f64, f64)> {
    let mut scored: Vec<&Match> = h2h.matches.iter().filter(|m| m.is_scored()).collect();
    scored.sort_by_key(|m| std::cmp::Reverse(m.date.unwrap_or(DateTime::<Utc>::MIN_UTC)));

    let (mut home_goals, mut away_goals, mut weights) = (0.0, 0.0, 0.0);
    for (i, m) in scored.iter().take(H2H_WINDOW).enumerate() {
        let Some((f, a)) = m.goals_for_team(home_team_id) else {
            continue;
        };
        let w = (-H2H_DECAY * i as f64).exp();
        home_goals += f as f64 * w;
        away_goals += a as f64 * w;
        weights += w;
    }

    (weights > 0.0).then(|| (home_goals / weights, away_goals / weights))
}

pub fn predict_score(
    home: &TeamStats,
    away: &TeamStats,
    h2h: Option<&HeadToHeadStats>,
) -> ScoreEstimate {
    let (mut home_xg, mut away_xg) = base_expected_goals(home, away);

    if home.form.chars().count() >= 5 {
        home_xg *= form_factor(recent(&home.form, 5));
    }
    if away.form.chars().count() >= 5 {
        away_xg *= form_factor(recent(&away.form, 5));
    }

    home_xg *= HOME_BOOST;
    away_xg *= AWAY_DAMPING;

    if let Some(h2h) = h2h.filter(|h| h.total_matches > 0) {
        if let Some((h2h_home, h2h_away)) = weighted_h2h_goals(h2h, home.team_id) {
            let w = (0.1 * h2h.total_matches.min(4) as f64).min(0.4);
            home_xg = home_xg * (1.0 - w) + h2h_home * w;
            away_xg = away_xg * (1.0 - w) + h2h_away * w;
        }
    }

    // A side that often keeps clean sheets suppresses the opponent.
    if rate(home.clean_sheets, home.matches_played) > 0.4 {
        away_xg *= 0.9;
    }
    if rate(away.clean_sheets, away.matches_played) > 0.4 {
        home_xg *= 0.9;
    }

    home_xg *= (1.0 - rate(home.failed_to_score, home.matches_played)).max(0.8);
    away_xg *= (1.0 - rate(away.failed_to_score, away.matches_played)).max(0.8);

    ScoreEstimate {
        home_xg,
        away_xg,
        confidence: score_confidence(home, away, h2h),
    }
}

/// Weighted (0.4 / 0.3 / 0.3) blend of sample size, H2H depth and form
/// consistency. Without both form strings the last term contributes nothing.
fn score_confidence(home: &TeamStats, away: &TeamStats, h2h: Option<&HeadToHeadStats>) -> f64 {
    let min_played = home.matches_played.min(away.matches_played);
    let played_factor = match min_played {
        15.. => 1.0,
        10..=14 => 0.9,
        5..=9 => 0.7,
        _ => 0.5,
    };
    let h2h_factor = match h2h.map_or(0, |h| h.total_matches) {
        5.. => 1.0,
        3..=4 => 0.85,
        1..=2 => 0.7,
        _ => 0.6,
    };
    let form_term = if !home.form.is_empty() && !away.form.is_empty() {
        (form_consistency(&home.form) + form_consistency(&away.form)) / 2.0
    } else {
        0.0
    };

    0.4 * played_factor + 0.3 * h2h_factor + 0.3 * form_term
}

pub fn predict_over_under(home: &TeamStats, away: &TeamStats, threshold: f64) -> OverUnder {
    let (home_xg, away_xg) = base_expected_goals(home, away);
    let (home_xg, away_xg) = (home_xg * HOME_BOOST, away_xg * AWAY_DAMPING);
    let expected_goals = home_xg + away_xg;

    let mut p = poisson::over_probability(home_xg, away_xg, threshold);

    let home_scoring = 1.0 - rate(home.failed_to_score, home.matches_played);
    let away_scoring = 1.0 - rate(away.failed_to_score, away.matches_played);
    if home_scoring < 0.5 && away_scoring < 0.5 {
        p -= 0.1;
    } else if home_scoring > 0.8 && away_scoring > 0.8 {
        p += 0.1;
    }
    if rate(home.clean_sheets, home.matches_played) > 0.4
        && rate(away.clean_sheets, away.matches_played) > 0.4
    {
        p -= 0.1;
    }
    let p = p.clamp(0.0, 1.0);

    let mut confidence = 0.7;
    if home.matches_played >= 10 && away.matches_played >= 10 {
        confidence += 0.2;
    } else if home.matches_played >= 5 && away.matches_played >= 5 {
        confidence += 0.1;
    }
    confidence += ((p - 0.5).abs() * 0.4).min(0.2);

    OverUnder {
        threshold,
        prediction: p > 0.5,
        probability: percent(p),
        expected_goals: round_to(expected_goals, 2),
        confidence: Some(percent(confidence.clamp(0.0, 1.0))),
    }
}

pub fn predict_btts(score: &ScoreEstimate) -> Btts {
    let p = poisson::both_score_probability(score.home_xg, score.away_xg);
    Btts {
        prediction: p > 0.5,
        probability: percent(p),
        confidence: btts_label(p),
    }
}

/// First half modelled as the full-match rates halved.
pub fn predict_first_half(score: &ScoreEstimate) -> FirstHalf {
    let (h, d, a) = poisson::outcome_probabilities(score.home_xg / 2.0, score.away_xg / 2.0);
    let (prediction, confidence) = Outcome::argmax(h, d, a);
    FirstHalf {
        prediction,
        probabilities: OutcomeProbabilities::from_fractions(h, d, a),
        confidence: percent(confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::fixtures::{fixture, h2h, played, stats};
    use approx::assert_relative_eq;

    #[test]
    fn base_xg_at_league_average_is_league_average() {
        // home scores 1.5 / concedes 1.2, away scores 1.2 / concedes 1.5
        let home = stats(1, 10, 15, 12, 0, 0, "");
        let away = stats(2, 10, 12, 15, 0, 0, "");
        let (h, a) = base_expected_goals(&home, &away);
        assert_relative_eq!(h, 1.5, epsilon = 1e-9);
        assert_relative_eq!(a, 1.2, epsilon = 1e-9);
    }

    #[test]
    fn score_applies_venue_adjustment_only() {
        // No form, no H2H, no clean sheets, always scores
        let home = stats(1, 10, 15, 12, 0, 0, "");
        let away = stats(2, 10, 12, 15, 0, 0, "");
        let est = predict_score(&home, &away, None);
        assert_relative_eq!(est.home_xg, 1.5 * 1.2, epsilon = 1e-9);
        assert_relative_eq!(est.away_xg, 1.2 * 0.85, epsilon = 1e-9);
        // played 10 → 0.9, no H2H → 0.6, no form → 0
        assert_relative_eq!(est.confidence, 0.4 * 0.9 + 0.3 * 0.6, epsilon = 1e-9);
    }

    #[test]
    fn short_form_is_ignored() {
        let home_short = stats(1, 10, 15, 12, 0, 0, "WWWW");
        let home_none = stats(1, 10, 15, 12, 0, 0, "");
        let away = stats(2, 10, 12, 15, 0, 0, "");
        let a = predict_score(&home_short, &away, None);
        let b = predict_score(&home_none, &away, None);
        assert_relative_eq!(a.home_xg, b.home_xg, epsilon = 1e-12);
    }

    #[test]
    fn winning_form_raises_expected_goals() {
        let hot = stats(1, 10, 15, 12, 0, 0, "WWWWW");
        let cold = stats(1, 10, 15, 12, 0, 0, "LLLLL");
        let away = stats(2, 10, 12, 15, 0, 0, "");
        assert!(predict_score(&hot, &away, None).home_xg > predict_score(&cold, &away, None).home_xg);
    }

    #[test]
    fn h2h_weights_recent_meetings_more() {
        let record = h2h(
            1,
            2,
            vec![
                played(1, 1, 2, 0, 0, 1), // oldest
                played(2, 2, 1, 0, 4, 20), // newest: team 1 won 4-0 away
            ],
        );
        let (h, a) = weighted_h2h_goals(&record, 1).unwrap();
        let w1 = (-0.3f64).exp();
        assert_relative_eq!(h, 4.0 / (1.0 + w1), epsilon = 1e-9);
        assert_relative_eq!(a, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn h2h_blend_weight_grows_with_meetings() {
        let home = stats(1, 10, 15, 12, 0, 0, "");
        let away = stats(2, 10, 12, 15, 0, 0, "");
        let record = h2h(1, 2, vec![played(1, 1, 2, 5, 0, 3)]);
        let est = predict_score(&home, &away, Some(&record));
        // one meeting → 10% weight on 5 goals
        assert_relative_eq!(est.home_xg, 1.8 * 0.9 + 5.0 * 0.1, epsilon = 1e-9);
        assert_relative_eq!(est.away_xg, 1.02 * 0.9, epsilon = 1e-9);
    }

    #[test]
    fn clean_sheets_and_blanks_dampen() {
        // away keeps 5/10 clean sheets; home fails to score in 3/10
        let home = stats(1, 10, 15, 12, 0, 3, "");
        let away = stats(2, 10, 12, 15, 5, 0, "");
        let est = predict_score(&home, &away, None);
        assert_relative_eq!(est.home_xg, 1.8 * 0.9 * 0.8, epsilon = 1e-9);
    }

    #[test]
    fn confidence_uses_form_consistency() {
        let home = stats(1, 20, 30, 20, 0, 0, "WWWWW");
        let away = stats(2, 20, 20, 30, 0, 0, "LLLLL");
        let record = h2h(1, 2, (0..5).map(|i| played(i, 1, 2, 1, 1, i as u32 + 1)).collect());
        let est = predict_score(&home, &away, Some(&record));
        assert_relative_eq!(est.confidence, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn over_under_confidence_and_bounds() {
        let home = stats(1, 10, 15, 12, 0, 0, "");
        let away = stats(2, 10, 12, 15, 0, 0, "");
        let ou = predict_over_under(&home, &away, 2.5);
        // both score in every game → +0.1 on top of the Poisson tail
        let base = poisson::over_probability(1.8, 1.02, 2.5);
        assert_relative_eq!(ou.probability, percent((base + 0.1).min(1.0)), epsilon = 1e-9);
        assert_eq!(ou.expected_goals, 2.82);
        let conf = ou.confidence.unwrap();
        assert!(conf >= 90.0 && conf <= 100.0);
    }

    #[test]
    fn predict_uses_most_likely_score_and_grid_probabilities() {
        let home = stats(1, 20, 50, 10, 8, 1, "WWWDW");
        let away = stats(2, 20, 15, 35, 2, 8, "LLDLL");
        let p = EnhancedModel.predict(&fixture(1, 1, 2), &home, &away, None);
        assert_eq!(p.predicted_outcome(), Outcome::Home);
        assert_eq!(p.predicted_home_score.fract(), 0.0);
        assert!(p.predicted_home_score > p.predicted_away_score);
        let sum = p.home_win_probability + p.draw_probability + p.away_win_probability;
        assert!(sum > 0.99 && sum <= 1.0 + 1e-9);
        assert!(p.over_under.iter().all(|o| o.confidence.is_some()));
    }

    #[test]
    fn first_half_is_drawier_than_full_match() {
        let est = ScoreEstimate {
            home_xg: 1.6,
            away_xg: 1.1,
            confidence: 0.8,
        };
        let (_, full_draw, _) = poisson::outcome_probabilities(1.6, 1.1);
        let fh = predict_first_half(&est);
        assert!(fh.probabilities.draw > percent(full_draw));
    }
}
