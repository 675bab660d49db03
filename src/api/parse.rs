use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::db::models::{Match, MatchStatus, Team, TeamStats};

/// Parse one entry of a `/fixtures` or `/fixtures/headtohead` response.
/// Returns `None` when the `fixture` or `teams` blocks are missing.
pub fn parse_fixture(item: &Value) -> Option<Match> {
    let fixture = item.get("fixture")?;
    let teams = item.get("teams")?;
    let league = &item["league"];
    let goals = &item["goals"];

    let id = fixture["id"].as_i64()?;
    let home_team = parse_team(&teams["home"])?;
    let away_team = parse_team(&teams["away"])?;

    let date = fixture["date"].as_str().and_then(parse_date);
    let status = fixture["status"]["short"]
        .as_str()
        .map(MatchStatus::from_short)
        .unwrap_or(MatchStatus::Unknown);

    Some(Match {
        id,
        home_team,
        away_team,
        date,
        league_id: league["id"].as_i64().unwrap_or(0),
        league_name: league["name"].as_str().unwrap_or("Unknown League").to_string(),
        country: league["country"].as_str().unwrap_or("Unknown Country").to_string(),
        status,
        home_score: goals["home"].as_i64().map(|v| v as i32),
        away_score: goals["away"].as_i64().map(|v| v as i32),
        round: league["round"].as_str().map(str::to_string),
    })
}

/// Parse every fixture in an API envelope, skipping malformed entries.
pub fn parse_fixtures(raw: &Value) -> Vec<Match> {
    match raw["response"].as_array() {
        Some(items) => items.iter().filter_map(parse_fixture).collect(),
        None => vec![],
    }
}

fn parse_team(v: &Value) -> Option<Team> {
    let id = v["id"].as_i64()?;
    let name = v["name"].as_str().unwrap_or("Unknown Team").to_string();
    Some(Team {
        id,
        name,
        logo: v["logo"].as_str().map(str::to_string),
        country: v["country"]
            .get("name")
            .and_then(Value::as_str)
            .or_else(|| v["country"].as_str())
            .map(str::to_string),
        founded: v["founded"].as_i64().map(|y| y as i32),
    })
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s.replace('Z', "+00:00"))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Parse a `/teams/statistics` envelope (or its bare `response` object).
/// Missing counters default to zero. `None` when the response is not an
/// object, which the API sends as an empty list for teams without data.
pub fn parse_team_stats(team_id: i64, raw: &Value) -> Option<TeamStats> {
    let r = raw.get("response").unwrap_or(raw);
    if !r.is_object() {
        return None;
    }

    let count = |v: &Value| v.as_u64().unwrap_or(0) as u32;
    let name = r["team"]["name"].as_str().unwrap_or("Unknown Team");

    let mut stats = TeamStats::new(team_id, name);
    stats.matches_played = count(&r["fixtures"]["played"]["total"]);
    stats.wins = count(&r["fixtures"]["wins"]["total"]);
    stats.draws = count(&r["fixtures"]["draws"]["total"]);
    stats.losses = count(&r["fixtures"]["loses"]["total"]);
    stats.goals_scored = count(&r["goals"]["for"]["total"]["total"]);
    stats.goals_conceded = count(&r["goals"]["against"]["total"]["total"]);
    stats.clean_sheets = count(&r["clean_sheet"]["total"]);
    stats.failed_to_score = count(&r["failed_to_score"]["total"]);
    stats.form = r["form"].as_str().unwrap_or("").to_uppercase();
    stats.calculate_averages();
    Some(stats)
}

/// The API reports failures in-band as a non-empty `errors` object or array.
pub fn api_errors(raw: &Value) -> Option<String> {
    let errors = raw.get("errors")?;
    let non_empty = match errors {
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => false,
    };
    non_empty.then(|| errors.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture_json() -> Value {
        json!({
            "fixture": {
                "id": 1035037,
                "date": "2024-08-16T19:00:00+00:00",
                "status": { "short": "FT" }
            },
            "league": {
                "id": 39, "name": "Premier League", "country": "England",
                "season": 2024, "round": "Regular Season - 1"
            },
            "teams": {
                "home": { "id": 33, "name": "Manchester United", "logo": "mu.png" },
                "away": { "id": 36, "name": "Fulham" }
            },
            "goals": { "home": 1, "away": 0 }
        })
    }

    #[test]
    fn parses_full_fixture() {
        let m = parse_fixture(&fixture_json()).unwrap();
        assert_eq!(m.id, 1035037);
        assert_eq!(m.home_team.name, "Manchester United");
        assert_eq!(m.away_team.id, 36);
        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!((m.home_score, m.away_score), (Some(1), Some(0)));
        assert_eq!(m.round.as_deref(), Some("Regular Season - 1"));
        assert_eq!(m.date.unwrap().to_rfc3339(), "2024-08-16T19:00:00+00:00");
    }

    #[test]
    fn unplayed_fixture_has_no_scores() {
        let mut v = fixture_json();
        v["goals"] = json!({ "home": null, "away": null });
        v["fixture"]["status"]["short"] = json!("NS");
        let m = parse_fixture(&v).unwrap();
        assert!(!m.is_scored());
        assert_eq!(m.status, MatchStatus::Scheduled);
    }

    #[test]
    fn missing_teams_is_rejected() {
        let mut v = fixture_json();
        v.as_object_mut().unwrap().remove("teams");
        assert!(parse_fixture(&v).is_none());
    }

    #[test]
    fn zulu_dates_parse() {
        let mut v = fixture_json();
        v["fixture"]["date"] = json!("2024-08-16T19:00:00Z");
        assert!(parse_fixture(&v).unwrap().date.is_some());
    }

    #[test]
    fn team_stats_from_envelope() {
        let raw = json!({
            "errors": [],
            "response": {
                "team": { "id": 33, "name": "Manchester United" },
                "form": "wdlww",
                "fixtures": {
                    "played": { "total": 10 }, "wins": { "total": 5 },
                    "draws": { "total": 3 }, "loses": { "total": 2 }
                },
                "goals": {
                    "for": { "total": { "total": 15 } },
                    "against": { "total": { "total": 8 } }
                },
                "clean_sheet": { "total": 4 },
                "failed_to_score": { "total": 2 }
            }
        });
        let s = parse_team_stats(33, &raw).unwrap();
        assert_eq!(s.team_name, "Manchester United");
        assert_eq!(s.matches_played, 10);
        assert_eq!(s.losses, 2);
        assert_eq!(s.form, "WDLWW");
        assert_eq!(s.avg_goals_scored, 1.5);
        assert_eq!(s.avg_goals_conceded, 0.8);
    }

    #[test]
    fn team_stats_defaults_when_fields_missing() {
        let s = parse_team_stats(7, &json!({ "response": {} })).unwrap();
        assert_eq!(s.team_name, "Unknown Team");
        assert_eq!(s.matches_played, 0);
        assert_eq!(s.avg_goals_scored, 0.0);
    }

    #[test]
    fn team_stats_rejects_empty_response_list() {
        assert!(parse_team_stats(7, &json!({ "errors": [], "results": 0, "response": [] })).is_none());
        assert!(parse_team_stats(7, &json!({ "response": null })).is_none());
    }

    #[test]
    fn detects_in_band_errors() {
        assert!(api_errors(&json!({ "errors": [] })).is_none());
        assert!(api_errors(&json!({ "errors": {} })).is_none());
        assert!(api_errors(&json!({ "errors": { "token": "bad" } })).is_some());
        assert!(api_errors(&json!({ "response": [] })).is_none());
    }
}
