use chrono::DateTime;

use crate::db::models::Outcome;
use crate::leagues::League;
use crate::report::PredictionReport;

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_LEN: usize = 4096;

const COMMANDS: &str = "/predictions - Get predictions for upcoming matches\n\
                        /leagues - Show supported leagues\n\
                        /help - Show this help message";

pub const WAITING_TEXT: &str = "⏳ Analyzing upcoming matches... This may take a minute.";
pub const NO_PREDICTIONS_TEXT: &str =
    "❌ Could not generate predictions for any matches. Please try again later.";
pub const DONE_TEXT: &str = "✅ All predictions sent!";
pub const ERROR_TEXT: &str = "❌ An error occurred while getting predictions. Please try again later.";

pub fn start_text(first_name: Option<&str>) -> String {
    let greeting = match first_name {
        Some(name) if !name.is_empty() => format!("Hi {}! 👋", name),
        _ => "Hi! 👋".to_string(),
    };
    format!(
        "{}\n\nWelcome to the Football Betting Predictor Bot!\n\n*Available commands:*\n{}",
        greeting, COMMANDS
    )
}

pub fn help_text() -> String {
    format!("*Available commands:*\n{}", COMMANDS)
}

pub fn unknown_text() -> String {
    format!(
        "I didn't understand that. Try using one of these commands:\n{}",
        COMMANDS
    )
}

pub fn leagues_text(leagues: &[League]) -> String {
    let mut lines = vec!["📋 *Supported Leagues*".to_string()];
    lines.extend(
        leagues
            .iter()
            .map(|l| format!("🏆 {} ({})", l.name, l.country)),
    );
    lines.join("\n")
}

pub fn summary_text(count: usize) -> String {
    format!(
        "📊 *Found {} upcoming matches with predictions*\nI'll send them one by one...",
        count
    )
}

/// "Saturday, 14 September 2024 - 15:00", or the raw string if unparseable.
fn pretty_date(raw: Option<&str>) -> String {
    match raw {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.format("%A, %d %B %Y - %H:%M").to_string())
            .unwrap_or_else(|_| s.to_string()),
        None => "Unknown Date".to_string(),
    }
}

fn outcome_label(outcome: Outcome, report: &PredictionReport) -> String {
    match outcome {
        Outcome::Home => format!("{} win", report.fixture.home_team),
        Outcome::Away => format!("{} win", report.fixture.away_team),
        Outcome::Draw => "Draw".to_string(),
    }
}

pub fn format_prediction_message(report: &PredictionReport) -> String {
    let m = &report.fixture;
    let mut lines = vec![
        format!("🏆 *{} ({})*", m.league, m.country),
        format!("⚽ *{} vs {}*", m.home_team, m.away_team),
        format!("📅 {}", pretty_date(m.date.as_deref())),
        "\n📊 *Match Prediction*".to_string(),
        format!("🏁 Outcome: *{}*", outcome_label(report.prediction, report)),
        format!("🔢 Score: *{}*", report.score.display),
        format!("💪 Confidence: {}%", report.confidence),
        "\n📈 *Win Probabilities*".to_string(),
        format!("🏠 {}: {}%", m.home_team, report.probabilities.home),
        format!("🤝 Draw: {}%", report.probabilities.draw),
        format!("🚌 {}: {}%", m.away_team, report.probabilities.away),
    ];

    if !report.over_under.is_empty() {
        lines.push("\n📊 *Over/Under*".to_string());
        for ou in report.over_under.values() {
            let side = if ou.prediction { "Over" } else { "Under" };
            lines.push(format!("O/U {}: *{}* ({}%)", ou.threshold, side, ou.probability));
        }
    }

    if let Some(btts) = &report.btts {
        lines.push("\n📊 *Both Teams To Score*".to_string());
        let answer = if btts.prediction { "Yes" } else { "No" };
        lines.push(format!("BTTS: *{}* ({}%)", answer, btts.probability));
    }

    if let Some(fh) = &report.first_half {
        lines.push("\n📊 *First Half*".to_string());
        lines.push(format!(
            "Result: *{}* ({}%)",
            outcome_label(fh.prediction, report),
            fh.confidence
        ));
    }

    lines.join("\n")
}

/// Split `text` into chunks of at most `max` characters, never inside a
/// multi-byte character. Prefers to break after a newline when one falls in
/// the window.
pub fn split_message(text: &str, max: usize) -> Vec<String> {
    if max == 0 || text.chars().count() <= max {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        // byte offset just past the `max`-th char, or the end
        let window_end = rest
            .char_indices()
            .nth(max)
            .map_or(rest.len(), |(i, _)| i);
        if window_end == rest.len() {
            chunks.push(rest.to_string());
            break;
        }
        let cut = match rest[..window_end].rfind('\n') {
            Some(nl) if nl > 0 => nl + 1,
            _ => window_end,
        };
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leagues;
    use crate::predictor::fixtures::{fixture, stats};
    use crate::predictor::{BasicModel, PredictionModel};

    fn report() -> PredictionReport {
        let home = stats(1, 12, 20, 10, 4, 2, "WWDLW");
        let away = stats(2, 12, 14, 16, 2, 4, "LDWLL");
        PredictionReport::from(&BasicModel.predict(&fixture(1, 1, 2), &home, &away, None))
    }

    #[test]
    fn prediction_message_sections() {
        let text = format_prediction_message(&report());
        assert!(text.starts_with("🏆 *Premier League (England)*"));
        assert!(text.contains("⚽ *Team 1 vs Team 2*"));
        assert!(text.contains("📅 Saturday, 14 September 2024 - 15:00"));
        assert!(text.contains("🏁 Outcome: *Team 1 win*"));
        assert_eq!(text.matches("O/U ").count(), 4);
        assert!(text.contains("BTTS: *"));
        assert!(text.contains("📊 *First Half*"));
    }

    #[test]
    fn unparseable_date_is_shown_raw() {
        let mut r = report();
        r.fixture.date = Some("soon".into());
        assert!(format_prediction_message(&r).contains("📅 soon"));
        r.fixture.date = None;
        assert!(format_prediction_message(&r).contains("📅 Unknown Date"));
    }

    #[test]
    fn leagues_list_has_every_league() {
        let text = leagues_text(leagues::all());
        assert_eq!(text.lines().count(), leagues::all().len() + 1);
        assert!(text.contains("🏆 Premier League (England)"));
    }

    #[test]
    fn start_greets_by_name() {
        assert!(start_text(Some("Sam")).starts_with("Hi Sam! 👋"));
        assert!(start_text(None).starts_with("Hi! 👋"));
        assert!(help_text().contains("/leagues"));
    }

    #[test]
    fn short_messages_are_not_split() {
        assert_eq!(split_message("hello", MAX_MESSAGE_LEN), vec!["hello"]);
    }

    #[test]
    fn split_respects_char_boundaries() {
        let text = "⚽".repeat(10);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_prefers_newlines() {
        let chunks = split_message("abc\ndefgh", 6);
        assert_eq!(chunks, vec!["abc\n", "defgh"]);
    }
}
