//! JSON prediction report and console summary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::db::models::{percent, Btts, FirstHalf, Outcome, OutcomeProbabilities, OverUnder, Prediction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    /// RFC 3339 kickoff, if known
    pub date: Option<String>,
    pub league: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreLine {
    pub home: i32,
    pub away: i32,
    pub display: String,
}

/// Flattened, percent-based view of a [`Prediction`] as written to
/// `predictions.json`, stored in the database and sent to chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    #[serde(rename = "match")]
    pub fixture: MatchInfo,
    pub probabilities: OutcomeProbabilities,
    pub prediction: Outcome,
    pub score: ScoreLine,
    /// Percent, one decimal
    pub confidence: f64,
    /// Keyed by threshold ("1.5", "2.5", ...)
    pub over_under: BTreeMap<String, OverUnder>,
    pub btts: Option<Btts>,
    pub first_half: Option<FirstHalf>,
    #[serde(default)]
    pub reasoning: Vec<String>,
}

impl From<&Prediction> for PredictionReport {
    fn from(p: &Prediction) -> Self {
        let (home, away) = p.rounded_score();
        PredictionReport {
            fixture: MatchInfo {
                id: p.fixture.id,
                home_team: p.fixture.home_team.name.clone(),
                away_team: p.fixture.away_team.name.clone(),
                date: p.fixture.date.map(|d| d.to_rfc3339()),
                league: p.fixture.league_name.clone(),
                country: p.fixture.country.clone(),
            },
            probabilities: OutcomeProbabilities::from_fractions(
                p.home_win_probability,
                p.draw_probability,
                p.away_win_probability,
            ),
            prediction: p.predicted_outcome(),
            score: ScoreLine {
                home,
                away,
                display: p.predicted_score(),
            },
            confidence: percent(p.confidence),
            over_under: p
                .over_under
                .iter()
                .map(|ou| (format!("{:.1}", ou.threshold), ou.clone()))
                .collect(),
            btts: p.btts.clone(),
            first_half: p.first_half.clone(),
            reasoning: p.reasoning.clone(),
        }
    }
}

impl PredictionReport {
    pub fn title(&self) -> String {
        format!("{} vs {}", self.fixture.home_team, self.fixture.away_team)
    }
}

pub fn build_reports(predictions: &[Prediction]) -> Vec<PredictionReport> {
    predictions.iter().map(PredictionReport::from).collect()
}

/// Write reports as pretty-printed JSON, replacing any existing file.
pub fn save_predictions(reports: &[PredictionReport], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(reports).context("Failed to serialise predictions")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write predictions to {}", path.display()))?;
    info!("Predictions saved to {}", path.display());
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

/// Console rendering used by [`print_summary`].
pub fn summary_text(reports: &[PredictionReport]) -> String {
    if reports.is_empty() {
        return "\nNo predictions available.\n".to_string();
    }

    let mut out = String::from("\nMatch Predictions Summary:\n");
    for r in reports {
        let _ = writeln!(out, "\n{} ({})", r.title(), r.fixture.league);
        let _ = writeln!(out, "Date: {}", r.fixture.date.as_deref().unwrap_or("TBD"));
        let _ = writeln!(
            out,
            "Predicted Outcome: {} (Home: {}%, Draw: {}%, Away: {}%)",
            r.prediction, r.probabilities.home, r.probabilities.draw, r.probabilities.away
        );
        let _ = writeln!(
            out,
            "Predicted Score: {} (Confidence: {}%)",
            r.score.display, r.confidence
        );
        for ou in r.over_under.values() {
            let _ = writeln!(
                out,
                "Over {}: {} (Probability: {}%)",
                ou.threshold,
                yes_no(ou.prediction),
                ou.probability
            );
        }
        if let Some(btts) = &r.btts {
            let _ = writeln!(
                out,
                "Both Teams To Score: {} (Probability: {}%)",
                yes_no(btts.prediction),
                btts.probability
            );
        }
    }
    out
}

pub fn print_summary(reports: &[PredictionReport]) {
    print!("{}", summary_text(reports));
}
