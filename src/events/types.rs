/// Wire types sent to the downstream event consumer
use serde::Serialize;

use crate::types::CanonicalAsset;

/// `{"eventType": ..., "payload": [...]}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<'a> {
    pub event_type: &'a str,
    pub payload: &'a [CanonicalAsset],
}

impl<'a> EventEnvelope<'a> {
    pub fn new(event_type: &'a str, payload: &'a [CanonicalAsset]) -> Self {
        EventEnvelope { event_type, payload }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string(self).map_err(crate::error::FeedError::SerializationError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::fold::tests::fragment;
    use crate::aggregation::{fold, AggregationMap};
    use crate::types::Currency;

    #[test]
    fn test_envelope_wire_shape() {
        let map = fold(AggregationMap::new(), Currency::Usd, vec![fragment("bitcoin", "btc", 102775.0)]);
        let json = EventEnvelope::new("CRYPTO_UPDATE", map.assets()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["eventType"], "CRYPTO_UPDATE");
        let asset = &value["payload"][0];
        assert_eq!(asset["id"], "bitcoin");
        assert_eq!(asset["prices"]["usd"], 102775.0);
        assert!(asset["prices"]["eur"].is_null());
        assert_eq!(asset["high24h"]["usd"], 102776.0);
        assert_eq!(asset["priceChangePercentage24h"], 0.1);
        assert_eq!(asset["marketCapRank"], 1);
        assert_eq!(asset["athDate"], "2024-12-17T15:02:41.429Z");
    }

    #[test]
    fn test_empty_batch() {
        let json = EventEnvelope::new("CRYPTO_UPDATE", &[]).to_json().unwrap();
        assert_eq!(json, r#"{"eventType":"CRYPTO_UPDATE","payload":[]}"#);
    }
}
