// Energy spot price oracle client.
//
// The price endpoint returns hour-keyed intra-day (today) and day-ahead
// (tomorrow) prices. Any failure to reach or parse the endpoint yields
// None; the energy-aware policy falls back to near-immediate scheduling.
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::time::Duration;

const HOUR_KEY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Hourly prices over the 48-hour horizon starting at the top of the
/// current day.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceCurve {
    pub intra_day: BTreeMap<NaiveDateTime, f64>,
    pub day_ahead: BTreeMap<NaiveDateTime, f64>,
}

impl PriceCurve {
    /// Both sub-maps merged into one hour -> price map.
    pub fn merged(&self) -> BTreeMap<NaiveDateTime, f64> {
        let mut merged = self.intra_day.clone();
        merged.extend(self.day_ahead.iter().map(|(k, v)| (*k, *v)));
        merged
    }
}

#[derive(Deserialize)]
struct RawPriceCurve {
    #[serde(rename = "intra-day")]
    intra_day: BTreeMap<String, f64>,
    #[serde(rename = "day-ahead")]
    day_ahead: BTreeMap<String, f64>,
}

fn parse_hour_keys(
    raw: BTreeMap<String, f64>,
) -> Result<BTreeMap<NaiveDateTime, f64>, chrono::ParseError> {
    raw.into_iter()
        .map(|(k, v)| Ok((NaiveDateTime::parse_from_str(&k, HOUR_KEY_FORMAT)?, v)))
        .collect()
}

impl TryFrom<RawPriceCurve> for PriceCurve {
    type Error = chrono::ParseError;

    fn try_from(raw: RawPriceCurve) -> Result<Self, Self::Error> {
        Ok(PriceCurve {
            intra_day: parse_hour_keys(raw.intra_day)?,
            day_ahead: parse_hour_keys(raw.day_ahead)?,
        })
    }
}

#[derive(Clone)]
pub struct PriceOracle {
    endpoint: String,
    client: reqwest::Client,
}

impl PriceOracle {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    /// Fetch the current price curve. A short timeout keeps a hung
    /// endpoint from starving the scheduler tick.
    pub async fn get_prices(&self) -> Option<PriceCurve> {
        let response = match self
            .client
            .get(&self.endpoint)
            .timeout(Duration::from_secs(3))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Energy price endpoint unreachable: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "Energy price endpoint returned status {}",
                response.status()
            );
            return None;
        }

        let raw: RawPriceCurve = match response.json().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Malformed energy price payload: {}", e);
                return None;
            }
        };

        match PriceCurve::try_from(raw) {
            Ok(curve) => Some(curve),
            Err(e) => {
                tracing::warn!("Malformed hour key in energy price payload: {}", e);
                None
            }
        }
    }
}
