use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A football club as returned by the fixtures API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub logo: Option<String>,
    pub country: Option<String>,
    pub founded: Option<i32>,
}

impl Team {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Team {
            id,
            name: name.into(),
            logo: None,
            country: None,
            founded: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    HalfTime,
    Finished,
    Postponed,
    Cancelled,
    Unknown,
}

impl MatchStatus {
    /// Map an API-Football short status code.
    pub fn from_short(code: &str) -> Self {
        match code.to_uppercase().as_str() {
            "NS" | "TBD" => MatchStatus::Scheduled,
            "1H" | "2H" | "ET" | "P" | "BT" | "LIVE" => MatchStatus::InProgress,
            "HT" => MatchStatus::HalfTime,
            "FT" | "AET" | "PEN" => MatchStatus::Finished,
            "PST" | "SUSP" | "INT" => MatchStatus::Postponed,
            "CANC" | "ABD" | "AWD" | "WO" => MatchStatus::Cancelled,
            _ => MatchStatus::Unknown,
        }
    }
}

/// A single fixture, scheduled or played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// API fixture ID
    pub id: i64,
    pub home_team: Team,
    pub away_team: Team,
    pub date: Option<DateTime<Utc>>,
    pub league_id: i64,
    pub league_name: String,
    pub country: String,
    pub status: MatchStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    /// e.g. "Regular Season - 12"
    pub round: Option<String>,
}

impl Match {
    /// Both sides have a recorded score.
    pub fn is_scored(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    /// Goals for and against from `team_id`'s point of view.
    pub fn goals_for_team(&self, team_id: i64) -> Option<(i32, i32)> {
        let (h, a) = (self.home_score?, self.away_score?);
        if self.home_team.id == team_id {
            Some((h, a))
        } else {
            Some((a, h))
        }
    }

    pub fn title(&self) -> String {
        format!("{} vs {}", self.home_team.name, self.away_team.name)
    }
}

/// Season aggregates for one team in one competition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub team_id: i64,
    pub team_name: String,
    pub matches_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_scored: u32,
    pub goals_conceded: u32,
    pub clean_sheets: u32,
    pub failed_to_score: u32,
    /// Results string, oldest first, e.g. "WDLWW"
    pub form: String,
    pub avg_goals_scored: f64,
    pub avg_goals_conceded: f64,
}

impl TeamStats {
    pub fn new(team_id: i64, team_name: impl Into<String>) -> Self {
        TeamStats {
            team_id,
            team_name: team_name.into(),
            matches_played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_scored: 0,
            goals_conceded: 0,
            clean_sheets: 0,
            failed_to_score: 0,
            form: String::new(),
            avg_goals_scored: 0.0,
            avg_goals_conceded: 0.0,
        }
    }

    pub fn calculate_averages(&mut self) {
        if self.matches_played > 0 {
            let played = self.matches_played as f64;
            self.avg_goals_scored = self.goals_scored as f64 / played;
            self.avg_goals_conceded = self.goals_conceded as f64 / played;
        }
    }

    /// Share of matches in which the team scored. `None` without games.
    pub fn scoring_rate(&self) -> Option<f64> {
        (self.matches_played > 0)
            .then(|| 1.0 - self.failed_to_score as f64 / self.matches_played as f64)
    }

    /// Share of matches without conceding. `None` without games.
    pub fn clean_sheet_rate(&self) -> Option<f64> {
        (self.matches_played > 0)
            .then(|| self.clean_sheets as f64 / self.matches_played as f64)
    }
}

/// Head-to-head record between two teams, from team1's point of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHeadStats {
    pub team1_id: i64,
    pub team2_id: i64,
    /// Every fixture the API returned, scored or not
    pub total_matches: u32,
    pub team1_wins: u32,
    pub team2_wins: u32,
    pub draws: u32,
    pub avg_goals: f64,
    pub matches: Vec<Match>,
}

impl HeadToHeadStats {
    pub fn empty(team1_id: i64, team2_id: i64) -> Self {
        HeadToHeadStats {
            team1_id,
            team2_id,
            total_matches: 0,
            team1_wins: 0,
            team2_wins: 0,
            draws: 0,
            avg_goals: 0.0,
            matches: Vec::new(),
        }
    }

    /// Tally a set of past meetings. Unscored fixtures count toward
    /// `total_matches` but not toward results or goals.
    pub fn from_matches(team1_id: i64, team2_id: i64, matches: Vec<Match>) -> Self {
        let mut h2h = HeadToHeadStats::empty(team1_id, team2_id);
        h2h.total_matches = matches.len() as u32;

        let mut total_goals = 0i64;
        for m in &matches {
            let Some((for_t1, against_t1)) = m.goals_for_team(team1_id) else {
                continue;
            };
            total_goals += (for_t1 + against_t1) as i64;
            match for_t1.cmp(&against_t1) {
                std::cmp::Ordering::Greater => h2h.team1_wins += 1,
                std::cmp::Ordering::Less => h2h.team2_wins += 1,
                std::cmp::Ordering::Equal => h2h.draws += 1,
            }
        }

        if h2h.total_matches > 0 {
            h2h.avg_goals = total_goals as f64 / h2h.total_matches as f64;
        }
        h2h.matches = matches;
        h2h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    /// Highest of three probabilities; ties go home, then draw.
    pub fn argmax(home: f64, draw: f64, away: f64) -> (Outcome, f64) {
        let mut best = (Outcome::Home, home);
        if draw > best.1 {
            best = (Outcome::Draw, draw);
        }
        if away > best.1 {
            best = (Outcome::Away, away);
        }
        best
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "away",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentages (0–100, one decimal) for the three results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OutcomeProbabilities {
    pub fn from_fractions(home: f64, draw: f64, away: f64) -> Self {
        OutcomeProbabilities {
            home: percent(home),
            draw: percent(draw),
            away: percent(away),
        }
    }
}

/// Total-goals market prediction for one threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverUnder {
    pub threshold: f64,
    /// `true` = over
    pub prediction: bool,
    /// Percent, one decimal
    pub probability: f64,
    pub expected_goals: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

/// Both-teams-to-score prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Btts {
    pub prediction: bool,
    /// Percent, one decimal
    pub probability: f64,
    pub confidence: ConfidenceLabel,
}

/// Half-time result prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstHalf {
    pub prediction: Outcome,
    pub probabilities: OutcomeProbabilities,
    /// Percent, one decimal
    pub confidence: f64,
}

/// Full prediction for one fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "match")]
    pub fixture: Match,
    /// Fractions in [0, 1]
    pub home_win_probability: f64,
    pub draw_probability: f64,
    pub away_win_probability: f64,
    pub predicted_home_score: f64,
    pub predicted_away_score: f64,
    /// Fraction in [0, 1]
    pub confidence: f64,
    /// Ordered by ascending threshold
    pub over_under: Vec<OverUnder>,
    pub btts: Option<Btts>,
    pub first_half: Option<FirstHalf>,
    /// Human-readable notes on the inputs behind the numbers
    pub reasoning: Vec<String>,
}

impl Prediction {
    pub fn predicted_outcome(&self) -> Outcome {
        Outcome::argmax(
            self.home_win_probability,
            self.draw_probability,
            self.away_win_probability,
        )
        .0
    }

    pub fn rounded_score(&self) -> (i32, i32) {
        (
            self.predicted_home_score.round_ties_even() as i32,
            self.predicted_away_score.round_ties_even() as i32,
        )
    }

    pub fn predicted_score(&self) -> String {
        let (h, a) = self.rounded_score();
        format!("{}-{}", h, a)
    }
}

/// Fraction → percent rounded to one decimal.
pub fn percent(fraction: f64) -> f64 {
    round_to(fraction * 100.0, 1)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
