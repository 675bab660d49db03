//! Scores derived from a team's results string (e.g. "WWDLW").
//!
//! The API returns form oldest-first, so the last character is the most
//! recent match.

/// League points per game, weighting earlier characters more heavily
/// (weight starts at 1.0 and decays ×0.9 per result). Empty form → 0.
pub fn form_points(form: &str) -> f64 {
    let mut points = 0.0;
    let mut weight = 1.0;
    let mut total_weight = 0.0;

    for result in form.chars() {
        match result.to_ascii_uppercase() {
            'W' => points += 3.0 * weight,
            'D' => points += 1.0 * weight,
            _ => {}
        }
        total_weight += weight;
        weight *= 0.9;
    }

    if total_weight > 0.0 {
        points / total_weight
    } else {
        0.0
    }
}

/// Multiplier on expected goals from recent results: W=1.2, D=1.0, L=0.8,
/// with the most recent match weighted 1 and older ones `e^(-0.2·i)`.
/// Empty form is neutral (1.0).
pub fn form_factor(form: &str) -> f64 {
    let mut total_weight = 0.0;
    let mut value = 0.0;

    for (i, result) in form.chars().rev().enumerate() {
        let weight = (-0.2 * i as f64).exp();
        total_weight += weight;
        value += weight
            * match result.to_ascii_uppercase() {
                'W' => 1.2,
                'D' => 1.0,
                'L' => 0.8,
                _ => 0.0,
            };
    }

    if total_weight > 0.0 {
        value / total_weight
    } else {
        1.0
    }
}

/// How steady a run of results is, in [0.5, 1.0]. Each change of result
/// between consecutive matches lowers it. Fewer than three results → 0.7.
pub fn form_consistency(form: &str) -> f64 {
    let results: Vec<char> = form.chars().collect();
    if results.len() < 3 {
        return 0.7;
    }

    let transitions = results.windows(2).filter(|w| w[0] != w[1]).count();
    let consistency = 1.0 - (transitions as f64 / (results.len() - 1) as f64) * 0.5;
    consistency.clamp(0.5, 1.0)
}

/// The last `n` results.
pub fn recent(form: &str, n: usize) -> &str {
    let len = form.chars().count();
    if len <= n {
        return form;
    }
    let start = form
        .char_indices()
        .nth(len - n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &form[start..]
}
