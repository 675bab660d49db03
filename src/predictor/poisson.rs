//! Independent-Poisson score model helpers.

/// Highest goal count per side summed over for probabilities.
pub const OUTCOME_MAX_GOALS: u32 = 10;
/// Highest goal count per side considered for the most likely exact score.
pub const SCORE_MAX_GOALS: u32 = 5;

/// P(X = k) for X ~ Poisson(lambda). A non-positive rate puts all mass on 0.
pub fn pmf(k: u32, lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    let mut p = (-lambda).exp();
    for i in 1..=k {
        p *= lambda / i as f64;
    }
    p
}

fn pmf_table(lambda: f64, max_k: u32) -> Vec<f64> {
    (0..=max_k).map(|k| pmf(k, lambda)).collect()
}

/// (home win, draw, away win) over the 0..=10 grid. The tail beyond ten
/// goals is dropped, so the sum is marginally below one.
pub fn outcome_probabilities(home_xg: f64, away_xg: f64) -> (f64, f64, f64) {
    let h = pmf_table(home_xg, OUTCOME_MAX_GOALS);
    let a = pmf_table(away_xg, OUTCOME_MAX_GOALS);
    let (mut home, mut draw, mut away) = (0.0, 0.0, 0.0);
    for (i, ph) in h.iter().enumerate() {
        for (j, pa) in a.iter().enumerate() {
            let p = ph * pa;
            match i.cmp(&j) {
                std::cmp::Ordering::Greater => home += p,
                std::cmp::Ordering::Less => away += p,
                std::cmp::Ordering::Equal => draw += p,
            }
        }
    }
    (home, draw, away)
}

/// P(total goals > threshold) over the 0..=10 grid.
pub fn over_probability(home_xg: f64, away_xg: f64, threshold: f64) -> f64 {
    let h = pmf_table(home_xg, OUTCOME_MAX_GOALS);
    let a = pmf_table(away_xg, OUTCOME_MAX_GOALS);
    let mut over = 0.0;
    for (i, ph) in h.iter().enumerate() {
        for (j, pa) in a.iter().enumerate() {
            if (i + j) as f64 > threshold {
                over += ph * pa;
            }
        }
    }
    over
}

/// Most probable exact score with each side capped at five goals.
/// Ties keep the lowest-scoring candidate found first.
pub fn most_likely_score(home_xg: f64, away_xg: f64) -> (u32, u32) {
    let mut best = (0, 0);
    let mut best_p = -1.0;
    for h in 0..=SCORE_MAX_GOALS {
        for a in 0..=SCORE_MAX_GOALS {
            let p = pmf(h, home_xg) * pmf(a, away_xg);
            if p > best_p {
                best_p = p;
                best = (h, a);
            }
        }
    }
    best
}

/// P(both sides score at least once).
pub fn both_score_probability(home_xg: f64, away_xg: f64) -> f64 {
    (1.0 - pmf(0, home_xg)) * (1.0 - pmf(0, away_xg))
}
