use anyhow::Result;
use serde::Serialize;

/// A competition the predictor knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct League {
    /// Stable short key used on the command line, e.g. "premier_league"
    pub key: &'static str,
    /// API-Football league ID
    pub id: i64,
    pub name: &'static str,
    pub country: &'static str,
    /// Starting year of the season, e.g. 2024 for 2024/25
    pub season: i32,
}

const LEAGUES: [League; 6] = [
    League {
        key: "premier_league",
        id: 39,
        name: "Premier League",
        country: "England",
        season: 2024,
    },
    League {
        key: "la_liga",
        id: 140,
        name: "La Liga",
        country: "Spain",
        season: 2024,
    },
    League {
        key: "bundesliga",
        id: 78,
        name: "Bundesliga",
        country: "Germany",
        season: 2024,
    },
    League {
        key: "serie_a",
        id: 135,
        name: "Serie A",
        country: "Italy",
        season: 2024,
    },
    League {
        key: "ligue_1",
        id: 61,
        name: "Ligue 1",
        country: "France",
        season: 2024,
    },
    League {
        key: "champions_league",
        id: 2,
        name: "UEFA Champions League",
        country: "Europe",
        season: 2024,
    },
];

pub fn all() -> &'static [League] {
    &LEAGUES
}

pub fn by_key(key: &str) -> Option<&'static League> {
    LEAGUES.iter().find(|l| l.key.eq_ignore_ascii_case(key.trim()))
}

pub fn by_id(id: i64) -> Option<&'static League> {
    LEAGUES.iter().find(|l| l.id == id)
}

/// Resolve a list of keys, keeping table order. An empty list selects all.
pub fn select(keys: &[String]) -> Result<Vec<League>> {
    for key in keys {
        if by_key(key).is_none() {
            anyhow::bail!(
                "Unknown league '{}'. Known leagues: {}",
                key,
                LEAGUES.iter().map(|l| l.key).collect::<Vec<_>>().join(", ")
            );
        }
    }
    if keys.is_empty() {
        return Ok(all().to_vec());
    }
    Ok(LEAGUES
        .iter()
        .filter(|l| keys.iter().any(|k| l.key.eq_ignore_ascii_case(k.trim())))
        .copied()
        .collect())
}
