//! Expected-goals estimation from recent team form.
//!
//! Each side's scoring and conceding rates are shrunk toward the league
//! baseline until the team has `full_weight_matches` results on record, so a
//! newly promoted side doesn't produce wild rates from two games.

use serde::{Deserialize, Serialize};

/// Aggregated finished-match history for one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamForm {
    pub matches: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl TeamForm {
    pub fn record(&mut self, scored: u32, conceded: u32) {
        self.matches += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingConfig {
    /// League-average total goals per match.
    pub goals_total_base: f64,
    /// Sample size at which a team's own rates get full weight.
    pub full_weight_matches: u32,
    pub min_lambda: f64,
    pub max_lambda: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            goals_total_base: 2.60,
            full_weight_matches: 10,
            min_lambda: 0.20,
            max_lambda: 3.80,
        }
    }
}

/// Expected goals `(λ_home, λ_away)` for a fixture.
pub fn expected_goals(home: &TeamForm, away: &TeamForm, cfg: &RatingConfig) -> (f64, f64) {
    let base = (cfg.goals_total_base / 2.0).max(0.01);

    let attack_home = shrunk_rate(home.goals_for, home.matches, base, cfg);
    let defence_home = shrunk_rate(home.goals_against, home.matches, base, cfg);
    let attack_away = shrunk_rate(away.goals_for, away.matches, base, cfg);
    let defence_away = shrunk_rate(away.goals_against, away.matches, base, cfg);

    let lambda_home = (attack_home * defence_away / base).clamp(cfg.min_lambda, cfg.max_lambda);
    let lambda_away = (attack_away * defence_home / base).clamp(cfg.min_lambda, cfg.max_lambda);
    (lambda_home, lambda_away)
}

fn shrunk_rate(goals: u32, matches: u32, base: f64, cfg: &RatingConfig) -> f64 {
    if matches == 0 {
        return base;
    }
    let raw = goals as f64 / matches as f64;
    let w = (matches as f64 / cfg.full_weight_matches.max(1) as f64).clamp(0.0, 1.0);
    (1.0 - w) * base + w * raw
}
