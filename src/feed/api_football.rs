use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::models::{
    Fixture, FixtureStatus, Goals, League, ScoreBreakdown, Status, TeamRef, Teams,
};

use super::odds::{Bookmaker, FixtureOdds};
use super::provider::{FixtureFeed, OddsFeed};

/// Fixture and odds feed backed by API-Football v3.
/// Docs: <https://www.api-football.com/documentation-v3>
pub struct ApiFootball {
    http: Client,
    api_key: String,
    /// Base URL for overriding in tests
    base_url: String,
}

impl ApiFootball {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiFootball {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Fetching {} {:?}", url, query);

        let resp = self
            .http
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(query)
            .send()
            .await
            .context("API-Football request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("API-Football error: {}", resp.status());
        }

        let raw: Value = resp
            .json()
            .await
            .context("Failed to parse API-Football response")?;

        // Quota and auth problems come back as 200 with a non-empty `errors`.
        if let Some(errors) = raw["errors"].as_object().filter(|e| !e.is_empty()) {
            anyhow::bail!("API-Football rejected request: {:?}", errors);
        }
        Ok(raw)
    }
}

#[async_trait]
impl FixtureFeed for ApiFootball {
    fn name(&self) -> &str {
        "API-Football"
    }

    async fn fetch_fixtures(&self, date: NaiveDate) -> Result<Vec<Fixture>> {
        let raw = self
            .get("fixtures", &[("date", date.format("%Y-%m-%d").to_string())])
            .await?;
        Ok(parse_fixtures_response(&raw))
    }
}

#[async_trait]
impl OddsFeed for ApiFootball {
    fn name(&self) -> &str {
        "API-Football"
    }

    /// Walks every result page for the date.
    async fn fetch_odds(&self, date: NaiveDate) -> Result<Vec<FixtureOdds>> {
        let mut all = Vec::new();
        let mut page = 1u64;
        loop {
            let raw = self
                .get(
                    "odds",
                    &[
                        ("date", date.format("%Y-%m-%d").to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            all.extend(parse_odds_response(&raw));

            let total = raw["paging"]["total"].as_u64().unwrap_or(1);
            if page >= total {
                break;
            }
            page += 1;
        }
        Ok(all)
    }
}

fn parse_fixtures_response(raw: &Value) -> Vec<Fixture> {
    let items = match raw["response"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    items
        .iter()
        .filter_map(|item| {
            let id = item["fixture"]["id"].as_u64()?;
            let date = item["fixture"]["date"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
                .with_timezone(&Utc);
            let short = item["fixture"]["status"]["short"].as_str().unwrap_or("");

            let score: ScoreBreakdown = match serde_json::from_value(item["score"].clone()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Fixture {}: unreadable score block: {}", id, e);
                    ScoreBreakdown::default()
                }
            };

            Some(Fixture {
                id,
                league: League {
                    name: item["league"]["name"].as_str().unwrap_or("unknown").to_string(),
                    country: item["league"]["country"].as_str().map(str::to_string),
                },
                teams: Teams {
                    home: TeamRef {
                        name: item["teams"]["home"]["name"].as_str()?.to_string(),
                    },
                    away: TeamRef {
                        name: item["teams"]["away"]["name"].as_str()?.to_string(),
                    },
                },
                date,
                status: Status {
                    short: FixtureStatus::from_code(short),
                },
                score,
                goals: Goals {
                    home: goal_count(&item["goals"]["home"]),
                    away: goal_count(&item["goals"]["away"]),
                },
            })
        })
        .collect()
}

fn goal_count(v: &Value) -> Option<u32> {
    v.as_u64().and_then(|g| u32::try_from(g).ok())
}

fn parse_odds_response(raw: &Value) -> Vec<FixtureOdds> {
    let items = match raw["response"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    items
        .iter()
        .filter_map(|item| {
            let fixture_id = item["fixture"]["id"].as_u64()?;
            let bookmakers: Vec<Bookmaker> =
                serde_json::from_value(item["bookmakers"].clone()).unwrap_or_default();
            Some(FixtureOdds {
                fixture_id,
                bookmakers,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ScoreLine;
    use serde_json::json;

    #[test]
    fn test_parse_fixtures() {
        let raw = json!({
            "errors": [],
            "response": [
                {
                    "fixture": {
                        "id": 1208021,
                        "date": "2025-03-09T17:00:00+00:00",
                        "status": {"short": "PEN"}
                    },
                    "league": {"name": "Coppa Italia", "country": "Italy"},
                    "teams": {"home": {"name": "Inter"}, "away": {"name": "Roma"}},
                    "goals": {"home": 1, "away": 1},
                    "score": {
                        "halftime": {"home": 0, "away": 1},
                        "fulltime": {"home": 1, "away": 1},
                        "extratime": {"home": 0, "away": 0},
                        "penalty": {"home": 4, "away": 3}
                    }
                },
                {
                    "fixture": {
                        "id": 1208020,
                        "date": "2025-03-09T14:00:00+00:00",
                        "status": {"short": "FT"}
                    },
                    "league": {"name": "Serie A", "country": "Italy"},
                    "teams": {"home": {"name": "Como"}, "away": {"name": "Genoa"}},
                    "goals": {"home": null, "away": null},
                    "score": {
                        "halftime": {"home": 1, "away": 0},
                        "fulltime": {"home": 2, "away": 1},
                        "extratime": {"home": null, "away": null},
                        "penalty": {"home": null, "away": null}
                    }
                },
                {
                    "fixture": {
                        "id": 1208022,
                        "date": "2025-03-09T20:45:00+00:00",
                        "status": {"short": "NS"}
                    },
                    "league": {"name": "Serie A"},
                    "teams": {"home": {"name": "Milan"}, "away": {"name": "Lazio"}},
                    "goals": {"home": null, "away": null},
                    "score": {"halftime": {"home": null, "away": null}}
                },
                {"fixture": {"id": 3}, "teams": {}}
            ]
        });

        let fixtures = parse_fixtures_response(&raw);
        assert_eq!(fixtures.len(), 3);

        let pen = &fixtures[0];
        assert_eq!(pen.id, 1208021);
        assert_eq!(pen.status(), FixtureStatus::AfterPenalties);
        assert_eq!(pen.final_goals(), Some((1, 1)));
        assert_eq!(pen.score.penalty.and_then(|p| p.pair()), Some((4, 3)));

        let ft = &fixtures[1];
        assert_eq!(ft.score.halftime.and_then(|s| s.pair()), Some((1, 0)));
        assert_eq!(ft.score.fulltime.and_then(|s| s.pair()), Some((2, 1)));
        assert_eq!(ft.score.extratime.and_then(|s| s.pair()), None);
        assert_eq!(ft.score.penalty.and_then(|s| s.pair()), None);
        assert_eq!(ft.final_goals(), Some((2, 1)));

        let ns = &fixtures[2];
        assert_eq!(ns.status(), FixtureStatus::NotStarted);
        assert_eq!(ns.final_goals(), None);
        assert_eq!(ns.league.country, None);
        assert_eq!(ns.score.halftime, Some(ScoreLine::default()));
        assert_eq!(ns.score.fulltime, None);
    }

    #[test]
    fn test_parse_odds() {
        let raw = json!({
            "paging": {"current": 1, "total": 1},
            "response": [{
                "fixture": {"id": 77},
                "bookmakers": [{
                    "id": 8,
                    "name": "Bet365",
                    "bets": [{
                        "id": 1,
                        "name": "Match Winner",
                        "values": [{"value": "Home", "odd": "1.90"}]
                    }]
                }]
            }]
        });
        let odds = parse_odds_response(&raw);
        assert_eq!(odds.len(), 1);
        assert_eq!(odds[0].fixture_id, 77);
        assert_eq!(odds[0].bookmakers[0].bets[0].values[0].odd, "1.90");
    }

    #[test]
    fn test_missing_response_is_empty() {
        assert!(parse_fixtures_response(&json!({})).is_empty());
        assert!(parse_odds_response(&json!({"response": null})).is_empty());
    }
}
