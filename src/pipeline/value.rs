use chrono::NaiveDate;
use tracing::debug;

use crate::db::models::{OddsSnapshot, PredictionSnapshot, ValuePick};
use crate::db::SnapshotStore;
use crate::error::Result;

/// Minimum edge for a market to count as value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueConfig {
    pub threshold: f64,
}

impl Default for ValueConfig {
    fn default() -> Self {
        Self { threshold: 0.07 }
    }
}

/// Expected profit per unit staked: `probability × decimal_odds − 1`.
pub fn edge(probability: f64, decimal_odds: f64) -> f64 {
    probability * decimal_odds - 1.0
}

/// Join the day's odds with the stored snapshots and rank mispriced markets.
///
/// Fixtures are walked in ascending id and markets in canonical order, so
/// equal edges keep that encounter order after the stable sort. Markets
/// missing from either side are skipped. The threshold applies to the raw
/// edge; the emitted edge is rounded to 2 dp.
pub fn find_value_picks<'a>(
    odds: &OddsSnapshot,
    mut lookup: impl FnMut(u64) -> Option<&'a PredictionSnapshot>,
    cfg: &ValueConfig,
) -> Vec<ValuePick> {
    let mut picks = Vec::new();

    for (fixture_id, prices) in &odds.fixtures {
        let Some(pred) = lookup(*fixture_id) else {
            continue;
        };
        if !pred.confidence.publishes_probabilities() {
            continue;
        }

        for (market, pct) in &pred.markets {
            let Some(&price) = prices.get(market.label()) else {
                continue;
            };
            if !price.is_finite() || price <= 0.0 {
                continue;
            }

            let probability = f64::from(*pct) / 100.0;
            let e = edge(probability, price);
            if e >= cfg.threshold {
                picks.push(ValuePick {
                    fixture_id: *fixture_id,
                    market: *market,
                    probability,
                    odds: price,
                    edge: round2(e),
                });
            }
        }
    }

    picks.sort_by(|a, b| b.edge.total_cmp(&a.edge));
    picks
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Value picks for `date`, read from the store. No odds snapshot for the
/// date means no picks.
pub fn build_value_picks(
    store: &dyn SnapshotStore,
    date: NaiveDate,
    cfg: &ValueConfig,
) -> Result<Vec<ValuePick>> {
    let Some(odds) = store.get_odds_snapshot(date)? else {
        debug!("No odds snapshot for {}", date);
        return Ok(Vec::new());
    };

    let mut predictions = Vec::with_capacity(odds.fixtures.len());
    for fixture_id in odds.fixtures.keys() {
        if let Some(pred) = store.get_prediction(*fixture_id)? {
            predictions.push(pred);
        }
    }

    Ok(find_value_picks(
        &odds,
        |id| predictions.iter().find(|p| p.fixture_id == id),
        cfg,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::model::{Confidence, Market};
    use approx::assert_relative_eq;
    use std::collections::{BTreeMap, HashMap};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    fn pred(id: u64, confidence: Confidence, markets: &[(Market, u8)]) -> PredictionSnapshot {
        PredictionSnapshot {
            fixture_id: id,
            date: date(),
            home: format!("H{id}"),
            away: format!("A{id}"),
            confidence,
            markets: markets.iter().copied().collect(),
            result: None,
            evaluated: false,
        }
    }

    fn odds(prices: &[(u64, &str, f64)]) -> OddsSnapshot {
        let mut fixtures: BTreeMap<u64, BTreeMap<String, f64>> = BTreeMap::new();
        for (id, label, price) in prices {
            fixtures
                .entry(*id)
                .or_default()
                .insert(label.to_string(), *price);
        }
        OddsSnapshot {
            date: date(),
            bookmaker: "bet365".into(),
            fixtures,
        }
    }

    fn run(odds: &OddsSnapshot, preds: &[PredictionSnapshot]) -> Vec<ValuePick> {
        let by_id: HashMap<u64, &PredictionSnapshot> =
            preds.iter().map(|p| (p.fixture_id, p)).collect();
        find_value_picks(odds, |id| by_id.get(&id).copied(), &ValueConfig::default())
    }

    #[test]
    fn edge_formula() {
        assert_relative_eq!(edge(0.6, 2.0), 0.2, epsilon = 1e-12);
        assert_relative_eq!(edge(0.5, 1.9), -0.05, epsilon = 1e-12);
    }

    #[test]
    fn includes_positive_edge_and_excludes_negative() {
        let preds = [
            pred(1, Confidence::High, &[(Market::HomeWin, 60)]),
            pred(2, Confidence::High, &[(Market::HomeWin, 50)]),
        ];
        let o = odds(&[(1, "1", 2.0), (2, "1", 1.9)]);
        let picks = run(&o, &preds);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].fixture_id, 1);
        assert_eq!(picks[0].market, Market::HomeWin);
        assert_relative_eq!(picks[0].probability, 0.6, epsilon = 1e-12);
        assert_relative_eq!(picks[0].odds, 2.0, epsilon = 1e-12);
        assert_relative_eq!(picks[0].edge, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn sorted_by_edge_descending() {
        // Edges: 0.05 (excluded), 0.20, 0.07, 0.15
        let preds = [
            pred(1, Confidence::High, &[(Market::HomeOrDraw, 70)]),
            pred(2, Confidence::High, &[(Market::HomeOrDraw, 80)]),
            pred(3, Confidence::High, &[(Market::HomeOrDraw, 50)]),
            pred(4, Confidence::High, &[(Market::HomeOrDraw, 50)]),
        ];
        let o = odds(&[
            (1, "1X", 1.5),
            (2, "1X", 1.5),
            (3, "1X", 2.14),
            (4, "1X", 2.3),
        ]);
        let picks = run(&o, &preds);
        let edges: Vec<f64> = picks.iter().map(|p| p.edge).collect();
        assert_eq!(edges.len(), 3);
        assert_relative_eq!(edges[0], 0.20, epsilon = 1e-9);
        assert_relative_eq!(edges[1], 0.15, epsilon = 1e-9);
        assert_relative_eq!(edges[2], 0.07, epsilon = 1e-9);
        assert_eq!(
            picks.iter().map(|p| p.fixture_id).collect::<Vec<_>>(),
            vec![2, 4, 3]
        );
    }

    #[test]
    fn equal_edges_keep_encounter_order() {
        let preds = [
            pred(7, Confidence::High, &[(Market::HomeWin, 60), (Market::Under25, 60)]),
            pred(3, Confidence::High, &[(Market::Over15, 60)]),
        ];
        let o = odds(&[(7, "1", 2.0), (7, "Under 2.5", 2.0), (3, "Over 1.5", 2.0)]);
        let picks = run(&o, &preds);
        let order: Vec<(u64, Market)> = picks.iter().map(|p| (p.fixture_id, p.market)).collect();
        assert_eq!(
            order,
            vec![(3, Market::Over15), (7, Market::HomeWin), (7, Market::Under25)]
        );
    }

    #[test]
    fn partial_coverage_and_low_tiers_are_skipped() {
        let preds = [
            pred(1, Confidence::High, &[(Market::Draw, 40), (Market::Over25, 75)]),
            pred(2, Confidence::Medium, &[(Market::HomeWin, 90)]),
        ];
        let o = odds(&[
            // Only "X" priced for fixture 1; Over 2.5 has no odds.
            (1, "X", 3.4),
            (1, "Over 3.5", 4.0),
            (2, "1", 3.0),
            // Fixture 3 has odds but no snapshot.
            (3, "1", 5.0),
        ]);
        let picks = run(&o, &preds);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].market, Market::Draw);
        assert_relative_eq!(picks[0].edge, 0.36, epsilon = 1e-9);
    }

    #[test]
    fn emitted_edge_is_rounded_after_the_threshold() {
        let preds = [
            pred(1, Confidence::High, &[(Market::HomeWin, 55)]),
            pred(2, Confidence::High, &[(Market::HomeWin, 50)]),
        ];
        // 0.55 × 1.95 − 1 = 0.0725 passes; 0.5 × 2.137 − 1 = 0.0685 does not,
        // even though it would round up to 0.07.
        let o = odds(&[(1, "1", 1.95), (2, "1", 2.137)]);
        let picks = run(&o, &preds);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].fixture_id, 1);
        assert_eq!(picks[0].edge, 0.07);

        let v = serde_json::to_string(&picks[0]).unwrap();
        assert!(v.contains("\"edge\":0.07"), "{}", v);
    }

    #[test]
    fn threshold_is_configurable() {
        let preds = [pred(1, Confidence::High, &[(Market::HomeWin, 60)])];
        let o = odds(&[(1, "1", 1.8)]);
        let by_id: HashMap<u64, &PredictionSnapshot> =
            preds.iter().map(|p| (p.fixture_id, p)).collect();
        let strict = ValueConfig { threshold: 0.10 };
        assert!(find_value_picks(&o, |id| by_id.get(&id).copied(), &strict).is_empty());
        let loose = ValueConfig { threshold: 0.05 };
        assert_eq!(find_value_picks(&o, |id| by_id.get(&id).copied(), &loose).len(), 1);
    }

    #[test]
    fn builds_from_store() {
        let db = Database::open_in_memory().unwrap();
        assert!(build_value_picks(&db, date(), &ValueConfig::default())
            .unwrap()
            .is_empty());

        db.insert_prediction(&pred(1, Confidence::High, &[(Market::HomeWin, 60)]))
            .unwrap();
        db.insert_odds_snapshot(&odds(&[(1, "1", 2.0), (2, "1", 9.0)]))
            .unwrap();

        let picks = build_value_picks(&db, date(), &ValueConfig::default()).unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].fixture_id, 1);
    }
}
