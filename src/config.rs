use clap::Parser;

use crate::model::{GateConfig, ModelConfig, RatingConfig};
use crate::pipeline::{PipelineSettings, ValueConfig};

/// Pre-match football prediction and value-pick service
#[derive(Parser, Debug, Clone)]
#[command(name = "prebet-engine", version, about)]
pub struct Config {
    /// Dashboard/API listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "prebet.db")]
    pub database_path: String,

    /// Fixture/odds feed base URL
    #[arg(
        long,
        env = "FEED_API_URL",
        default_value = "https://v3.football.api-sports.io"
    )]
    pub feed_api_url: String,

    /// Fixture/odds feed API key
    #[arg(long, env = "FEED_API_KEY")]
    pub feed_api_key: Option<String>,

    /// Bookmaker whose prices go into the daily odds snapshot
    #[arg(long, env = "BOOKMAKER", default_value = "Bet365")]
    pub bookmaker: String,

    /// Minimum edge for a value pick (e.g. 0.07 = 7%)
    #[arg(long, env = "VALUE_THRESHOLD", default_value = "0.07")]
    pub value_threshold: f64,

    /// Markets below this percentage are not stored in snapshots
    #[arg(long, env = "STRONG_THRESHOLD", default_value = "70")]
    pub strong_threshold: u8,

    /// Percentage points moved from away to home in the 1X2 split
    #[arg(long, env = "HOME_BIAS", default_value = "3.5")]
    pub home_bias: f64,

    /// Highest per-team goal count in the score grid
    #[arg(long, env = "MAX_GOALS", default_value = "10")]
    pub max_goals: u32,

    /// Prior matches (per team) needed for the high confidence tier
    #[arg(long, env = "HIGH_MIN_MATCHES", default_value = "10")]
    pub high_min_matches: u32,

    /// Prior matches (per team) needed for the medium confidence tier
    #[arg(long, env = "MEDIUM_MIN_MATCHES", default_value = "5")]
    pub medium_min_matches: u32,

    /// League-average total goals per match
    #[arg(long, env = "GOALS_TOTAL_BASE", default_value = "2.6")]
    pub goals_total_base: f64,

    /// Matches at which a team's own rates stop being shrunk to the baseline
    #[arg(long, env = "FULL_WEIGHT_MATCHES", default_value = "10")]
    pub full_weight_matches: u32,

    /// Recent finished matches used for team form
    #[arg(long, env = "FORM_WINDOW", default_value = "38")]
    pub form_window: u32,

    /// Snapshot job interval in seconds
    #[arg(long, env = "SNAPSHOT_INTERVAL_SECS", default_value = "1800")]
    pub snapshot_interval_secs: u64,

    /// Evaluation job interval in seconds
    #[arg(long, env = "EVALUATION_INTERVAL_SECS", default_value = "900")]
    pub evaluation_interval_secs: u64,

    /// Odds job interval in seconds
    #[arg(long, env = "ODDS_INTERVAL_SECS", default_value = "3600")]
    pub odds_interval_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.feed_api_key.as_deref().map_or(true, str::is_empty) {
            anyhow::bail!("FEED_API_KEY is required");
        }
        if self.bookmaker.trim().is_empty() {
            anyhow::bail!("bookmaker must not be empty");
        }
        if !(0.0..=1.0).contains(&self.value_threshold) {
            anyhow::bail!("value_threshold must be between 0.0 and 1.0");
        }
        if self.strong_threshold > 100 {
            anyhow::bail!("strong_threshold must be between 0 and 100");
        }
        if !(0.0..=20.0).contains(&self.home_bias) {
            anyhow::bail!("home_bias must be between 0 and 20 percentage points");
        }
        if !(2..=20).contains(&self.max_goals) {
            anyhow::bail!("max_goals must be between 2 and 20");
        }
        if self.medium_min_matches > self.high_min_matches {
            anyhow::bail!("medium_min_matches must not exceed high_min_matches");
        }
        if !(self.goals_total_base > 0.0 && self.goals_total_base.is_finite()) {
            anyhow::bail!("goals_total_base must be positive");
        }
        if self.form_window == 0 {
            anyhow::bail!("form_window must be at least 1");
        }
        if self.snapshot_interval_secs == 0
            || self.evaluation_interval_secs == 0
            || self.odds_interval_secs == 0
        {
            anyhow::bail!("job intervals must be positive");
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            model: ModelConfig {
                max_goals: self.max_goals,
                home_bias: self.home_bias,
            },
            gate: GateConfig {
                high_min_matches: self.high_min_matches,
                medium_min_matches: self.medium_min_matches,
            },
            ratings: RatingConfig {
                goals_total_base: self.goals_total_base,
                full_weight_matches: self.full_weight_matches,
                ..RatingConfig::default()
            },
            value: ValueConfig {
                threshold: self.value_threshold,
            },
            strong_pct: self.strong_threshold,
            form_window: self.form_window,
            bookmaker: self.bookmaker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["prebet-engine", "--feed-api-key", "k"];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = parse(&[]);
        cfg.validate().unwrap();
        let s = cfg.pipeline_settings();
        assert_eq!(s.strong_pct, 70);
        assert_eq!(s.model.max_goals, 10);
        assert_eq!(s.gate.high_min_matches, 10);
        assert_eq!(s.value.threshold, 0.07);
        assert_eq!(s.bookmaker, "Bet365");
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse(&["--value-threshold", "1.5"]).validate().is_err());
        assert!(parse(&["--max-goals", "1"]).validate().is_err());
        assert!(parse(&["--medium-min-matches", "12"]).validate().is_err());
        assert!(parse(&["--strong-threshold", "101"]).validate().is_err());
        assert!(parse(&["--odds-interval-secs", "0"]).validate().is_err());
    }
}
