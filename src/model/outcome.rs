use std::collections::BTreeMap;

use super::markets::Market;

/// Ground truth for every market given a final score.
///
/// Only meaningful once the fixture has reached `FT`, `AET` or `PEN`;
/// callers check completion before calling.
pub fn classify(home_goals: u32, away_goals: u32) -> BTreeMap<Market, bool> {
    Market::ALL
        .into_iter()
        .map(|m| (m, settles_true(m, home_goals, away_goals)))
        .collect()
}

/// Whether `market` wins on a `hg`–`ag` final score.
pub fn settles_true(market: Market, hg: u32, ag: u32) -> bool {
    let total = hg + ag;
    match market {
        Market::HomeWin => hg > ag,
        Market::Draw => hg == ag,
        Market::AwayWin => ag > hg,
        Market::HomeOrDraw => hg >= ag,
        Market::DrawOrAway => ag >= hg,
        Market::HomeOrAway => hg != ag,
        Market::Over15 => total >= 2,
        Market::Under15 => total <= 1,
        Market::Over25 => total >= 3,
        Market::Under25 => total <= 2,
        Market::BothTeamsScore => hg > 0 && ag > 0,
        Market::NotBothTeamsScore => hg == 0 || ag == 0,
    }
}
