//! Independent-Poisson goal model.
//!
//! Given expected-goals rates for both sides, builds the joint scoreline
//! table over `[0, max_goals]²` and aggregates it into market probabilities.
//! Mass beyond the truncation bound is dropped, not redistributed, so the
//! default bound of 10 goals per side keeps the error well under 0.01%.

use crate::error::{PredictError, Result};

use super::markets::{Market, MarketBook};

/// Default truncation bound (goals per side) for the scoreline grid.
pub const DEFAULT_MAX_GOALS: u32 = 10;

/// Parameters of the probability model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    /// Highest goal count per side included in the grid.
    pub max_goals: u32,
    /// Home-advantage bias applied to the 1X2 split, in percentage points.
    pub home_bias: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_goals: DEFAULT_MAX_GOALS,
            home_bias: 3.5,
        }
    }
}

/// Home / draw / away split. Any non-negative scale; it is normalised
/// before use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultSplit {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

/// Integer 1X2 percentages that always sum to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResultPct {
    pub home: u8,
    pub draw: u8,
    pub away: u8,
}

/// Joint scoreline probabilities `P(h, a)` under independent Poisson rates.
#[derive(Debug, Clone)]
pub struct ScoreGrid {
    cells: Vec<Vec<f64>>,
}

impl ScoreGrid {
    pub fn new(lambda_home: f64, lambda_away: f64, max_goals: u32) -> Result<Self> {
        let pmf_h = poisson_pmf(validate_rate(lambda_home)?, max_goals);
        let pmf_a = poisson_pmf(validate_rate(lambda_away)?, max_goals);

        let cells = pmf_h
            .iter()
            .map(|p_h| pmf_a.iter().map(|p_a| p_h * p_a).collect())
            .collect();
        Ok(ScoreGrid { cells })
    }

    /// Probability of the exact scoreline, zero outside the grid.
    #[cfg(test)]
    pub fn scoreline(&self, home: usize, away: usize) -> f64 {
        self.cells
            .get(home)
            .and_then(|row| row.get(away))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of `P(h, a)` over every cell matching `pred`.
    pub fn mass_where(&self, pred: impl Fn(usize, usize) -> bool) -> f64 {
        let mut total = 0.0;
        for (h, row) in self.cells.iter().enumerate() {
            for (a, p) in row.iter().enumerate() {
                if pred(h, a) {
                    total += p;
                }
            }
        }
        total
    }

    pub fn over_1_5(&self) -> f64 {
        self.mass_where(|h, a| h + a >= 2)
    }

    pub fn over_2_5(&self) -> f64 {
        self.mass_where(|h, a| h + a >= 3)
    }

    pub fn both_teams_score(&self) -> f64 {
        self.mass_where(|h, a| h >= 1 && a >= 1)
    }

    /// Home/draw/away mass of the grid, normalised to sum to 1.
    pub fn result_split(&self) -> ResultSplit {
        let home = self.mass_where(|h, a| h > a);
        let draw = self.mass_where(|h, a| h == a);
        let away = self.mass_where(|h, a| h < a);
        let sum = home + draw + away;
        if sum > 0.0 {
            ResultSplit {
                home: home / sum,
                draw: draw / sum,
                away: away / sum,
            }
        } else {
            ResultSplit {
                home: 1.0 / 3.0,
                draw: 1.0 / 3.0,
                away: 1.0 / 3.0,
            }
        }
    }
}

/// Price every market from the two expected-goals rates.
pub fn predict(lambda_home: f64, lambda_away: f64, cfg: &ModelConfig) -> Result<MarketBook> {
    let grid = ScoreGrid::new(lambda_home, lambda_away, cfg.max_goals)?;
    let mut book = MarketBook::new();

    let result = match_result(grid.result_split(), cfg.home_bias);
    book.set(Market::HomeWin, result.home);
    book.set(Market::Draw, result.draw);
    book.set(Market::AwayWin, result.away);
    book.set(Market::HomeOrDraw, result.home + result.draw);
    book.set(Market::DrawOrAway, result.draw + result.away);
    book.set(Market::HomeOrAway, result.home + result.away);

    let over_15 = to_pct(grid.over_1_5());
    book.set(Market::Over15, over_15);
    book.set(Market::Under15, 100 - over_15);

    let over_25 = to_pct(grid.over_2_5());
    book.set(Market::Over25, over_25);
    book.set(Market::Under25, 100 - over_25);

    let btts = to_pct(grid.both_teams_score());
    book.set(Market::BothTeamsScore, btts);
    book.set(Market::NotBothTeamsScore, 100 - btts);

    Ok(book)
}

/// Apply the home-advantage bias to a base split and round to integers
/// summing to exactly 100. Rounding residue lands on the away value.
pub fn match_result(split: ResultSplit, home_bias: f64) -> MatchResultPct {
    let total = split.home.max(0.0) + split.draw.max(0.0) + split.away.max(0.0);
    let (home, draw, away) = if total > 0.0 && total.is_finite() {
        (
            split.home.max(0.0) / total * 100.0,
            split.draw.max(0.0) / total * 100.0,
            split.away.max(0.0) / total * 100.0,
        )
    } else {
        (100.0 / 3.0, 100.0 / 3.0, 100.0 / 3.0)
    };

    let bias = if home_bias.is_finite() { home_bias } else { 0.0 };
    let home = (home + bias).max(0.0);
    let away = (away - bias).max(0.0);

    let sum = (home + draw + away).max(f64::EPSILON);
    let home_pct = (home / sum * 100.0).round().clamp(0.0, 100.0) as u8;
    let draw_pct = ((draw / sum * 100.0).round().clamp(0.0, 100.0) as u8).min(100 - home_pct);
    let away_pct = 100 - home_pct - draw_pct;

    MatchResultPct {
        home: home_pct,
        draw: draw_pct,
        away: away_pct,
    }
}

fn validate_rate(lambda: f64) -> Result<f64> {
    if lambda.is_finite() && lambda >= 0.0 {
        Ok(lambda)
    } else {
        Err(PredictError::InvalidRate(lambda))
    }
}

fn poisson_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let max_k = max_k as usize;
    let mut out = vec![0.0; max_k + 1];
    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    out
}

fn to_pct(p: f64) -> u8 {
    (p * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cfg() -> ModelConfig {
        ModelConfig::default()
    }

    #[test]
    fn pmf_matches_closed_form() {
        let pmf = poisson_pmf(1.5, 5);
        // P(2; 1.5) = 1.5² e^-1.5 / 2
        assert_relative_eq!(pmf[2], 1.125 * (-1.5f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(pmf[0], (-1.5f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn zero_rates_put_all_mass_on_nil_nil() {
        let book = predict(0.0, 0.0, &cfg()).unwrap();
        assert_eq!(book.get(Market::Over15), Some(0));
        assert_eq!(book.get(Market::Under15), Some(100));
        assert_eq!(book.get(Market::Over25), Some(0));
        assert_eq!(book.get(Market::Under25), Some(100));
        assert_eq!(book.get(Market::BothTeamsScore), Some(0));
        assert_eq!(book.get(Market::NotBothTeamsScore), Some(100));

        let grid = ScoreGrid::new(0.0, 0.0, 5).unwrap();
        assert_relative_eq!(grid.scoreline(0, 0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn complementary_markets_sum_to_100() {
        let rates = [0.0, 0.2, 0.75, 1.1, 1.45, 2.0, 2.9, 3.8, 5.5];
        for &lh in &rates {
            for &la in &rates {
                let book = predict(lh, la, &cfg()).unwrap();
                let pair = |a: Market, b: Market| {
                    u32::from(book.get(a).unwrap()) + u32::from(book.get(b).unwrap())
                };
                assert_eq!(pair(Market::Over15, Market::Under15), 100, "{lh}/{la}");
                assert_eq!(pair(Market::Over25, Market::Under25), 100, "{lh}/{la}");
                assert_eq!(
                    pair(Market::BothTeamsScore, Market::NotBothTeamsScore),
                    100,
                    "{lh}/{la}"
                );
                let result = u32::from(book.get(Market::HomeWin).unwrap())
                    + u32::from(book.get(Market::Draw).unwrap())
                    + u32::from(book.get(Market::AwayWin).unwrap());
                assert_eq!(result, 100, "{lh}/{la}");
            }
        }
    }

    #[test]
    fn typical_rates_match_hand_computed_values() {
        // λ = 1.5 / 1.2, 10-goal grid.
        // P(total ≤ 1) = e^-2.7 (1 + 2.7) ≈ 0.2487 → Over 1.5 = 75
        // P(total ≤ 2) = e^-2.7 (1 + 2.7 + 3.645) ≈ 0.4936 → Over 2.5 = 51
        // BTTS = (1 - e^-1.5)(1 - e^-1.2) ≈ 0.5429 → 54
        let book = predict(1.5, 1.2, &ModelConfig { max_goals: 10, home_bias: 0.0 }).unwrap();
        assert_eq!(book.get(Market::Over15), Some(75));
        assert_eq!(book.get(Market::Over25), Some(51));
        assert_eq!(book.get(Market::BothTeamsScore), Some(54));
    }

    #[test]
    fn coarse_bound_of_five_goals_is_reproducible() {
        let grid = ScoreGrid::new(1.5, 1.2, 5).unwrap();
        let total: f64 = grid.mass_where(|_, _| true);
        assert!(total < 1.0 && total > 0.99);
        // Truncated Over 2.5 is slightly below the untruncated value.
        let full = ScoreGrid::new(1.5, 1.2, 10).unwrap();
        assert!(grid.over_2_5() < full.over_2_5());
    }

    #[test]
    fn negative_or_nan_rate_is_rejected() {
        assert!(matches!(
            predict(-0.1, 1.0, &cfg()),
            Err(PredictError::InvalidRate(_))
        ));
        assert!(matches!(
            predict(1.0, f64::NAN, &cfg()),
            Err(PredictError::InvalidRate(_))
        ));
    }

    #[test]
    fn match_result_always_sums_to_100() {
        let splits = [
            (1.0, 1.0, 1.0),
            (0.455, 0.27, 0.275),
            (0.605, 0.395, 0.0),
            (0.0, 0.0, 1.0),
            (0.0, 0.0, 0.0),
            (3.0, 2.0, 5.0),
            (0.499, 0.499, 0.002),
        ];
        for (h, d, a) in splits {
            for bias in [0.0, 3.5, 10.0, 60.0] {
                let r = match_result(ResultSplit { home: h, draw: d, away: a }, bias);
                assert_eq!(
                    u32::from(r.home) + u32::from(r.draw) + u32::from(r.away),
                    100,
                    "split {h}/{d}/{a} bias {bias}"
                );
            }
        }
    }

    #[test]
    fn home_bias_moves_mass_from_away_to_home() {
        let split = ResultSplit { home: 0.40, draw: 0.30, away: 0.30 };
        let neutral = match_result(split, 0.0);
        assert_eq!(neutral, MatchResultPct { home: 40, draw: 30, away: 30 });
        let biased = match_result(split, 5.0);
        assert_eq!(biased, MatchResultPct { home: 45, draw: 30, away: 25 });
    }

    #[test]
    fn away_absorbs_rounding_residue() {
        // 33.33 / 33.33 / 33.33 rounds to 33 + 33 → away gets 34.
        let r = match_result(ResultSplit { home: 1.0, draw: 1.0, away: 1.0 }, 0.0);
        assert_eq!(r, MatchResultPct { home: 33, draw: 33, away: 34 });
    }

    #[test]
    fn double_chance_is_sum_of_pairs() {
        let book = predict(1.7, 0.9, &cfg()).unwrap();
        let p = |m| book.get(m).unwrap();
        assert_eq!(p(Market::HomeOrDraw), p(Market::HomeWin) + p(Market::Draw));
        assert_eq!(p(Market::DrawOrAway), p(Market::Draw) + p(Market::AwayWin));
        assert_eq!(p(Market::HomeOrAway), p(Market::HomeWin) + p(Market::AwayWin));
    }

    #[test]
    fn stronger_home_side_is_favoured() {
        let book = predict(2.2, 0.6, &cfg()).unwrap();
        assert!(book.get(Market::HomeWin).unwrap() > 60);
        assert!(book.get(Market::AwayWin).unwrap() < 15);
    }
}
