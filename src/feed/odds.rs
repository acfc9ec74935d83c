use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::models::OddsSnapshot;
use crate::model::Market;

/// All bookmaker prices offered for one fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureOdds {
    pub fixture_id: u64,
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmaker {
    pub name: String,
    #[serde(default)]
    pub bets: Vec<Bet>,
}

/// One bet type (e.g. "Match Winner") with its selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub name: String,
    #[serde(default)]
    pub values: Vec<BetValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetValue {
    pub value: String,
    /// Decimal odds, as the feed sends them (usually a string)
    pub odd: String,
}

/// Build the day's odds snapshot from `bookmaker`'s prices.
///
/// Fixtures the bookmaker doesn't price, or whose bets map to no known
/// market, are left out.
pub fn build_odds_snapshot(date: NaiveDate, bookmaker: &str, odds: &[FixtureOdds]) -> OddsSnapshot {
    let mut fixtures = BTreeMap::new();

    for fixture in odds {
        let Some(book) = fixture
            .bookmakers
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(bookmaker))
        else {
            continue;
        };

        let mut prices: BTreeMap<String, f64> = BTreeMap::new();
        for bet in &book.bets {
            for (market, price) in map_bet(bet) {
                prices.insert(market.label().to_string(), price);
            }
        }

        if !prices.is_empty() {
            fixtures.insert(fixture.fixture_id, prices);
        }
    }

    OddsSnapshot {
        date,
        bookmaker: bookmaker.to_lowercase(),
        fixtures,
    }
}

/// Translate one bet type's selections into our market labels.
pub fn map_bet(bet: &Bet) -> Vec<(Market, f64)> {
    let kind = bet.name.trim().to_lowercase();
    bet.values
        .iter()
        .filter_map(|v| {
            let market = selection_market(&kind, v.value.trim())?;
            let price = parse_price(&v.odd)?;
            Some((market, price))
        })
        .collect()
}

fn selection_market(kind: &str, selection: &str) -> Option<Market> {
    let sel = selection.to_lowercase();
    match kind {
        "match winner" | "1x2" => match sel.as_str() {
            "home" | "1" => Some(Market::HomeWin),
            "draw" | "x" => Some(Market::Draw),
            "away" | "2" => Some(Market::AwayWin),
            _ => None,
        },
        "double chance" => match sel.as_str() {
            "home/draw" | "1x" => Some(Market::HomeOrDraw),
            "draw/away" | "x2" => Some(Market::DrawOrAway),
            "home/away" | "12" => Some(Market::HomeOrAway),
            _ => None,
        },
        "goals over/under" => match sel.as_str() {
            "over 1.5" => Some(Market::Over15),
            "under 1.5" => Some(Market::Under15),
            "over 2.5" => Some(Market::Over25),
            "under 2.5" => Some(Market::Under25),
            _ => None,
        },
        "both teams score" | "both teams to score" => match sel.as_str() {
            "yes" => Some(Market::BothTeamsScore),
            "no" => Some(Market::NotBothTeamsScore),
            _ => None,
        },
        _ => None,
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    let price = raw.trim().parse::<f64>().ok()?;
    (price.is_finite() && price > 0.0).then_some(price)
}
