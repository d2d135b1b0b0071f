//! Ingestion types delivered by the transport layer.
//!
//! Prices and volumes stay as text until a book scales them, so no value
//! ever passes through binary floating point on the way in.

use serde::{Deserialize, Deserializer, Serialize};

use lob_core::types::{OrderId, Side, Symbol};

use crate::error::DepthError;

/// A `(price, volume)` pair as received.
pub type Level = (String, String);

/// Incremental depth update for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthEvent {
    pub symbol: Symbol,
    /// Exchange sequence or timestamp of the update.
    pub sequence: u64,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

/// Full book returned by a snapshot source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub sequence: u64,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

/// A JSON price or volume, sent either as a string or as a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Text(String),
    Number(serde_json::Number),
}

impl WireNumber {
    fn into_text(self) -> String {
        match self {
            WireNumber::Text(s) => s,
            WireNumber::Number(n) => n.to_string(),
        }
    }
}

fn wire_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    WireNumber::deserialize(deserializer).map(WireNumber::into_text)
}

fn wire_levels<'de, D>(deserializer: D) -> Result<Vec<Level>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<(WireNumber, WireNumber)>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(price, volume)| (price.into_text(), volume.into_text()))
        .collect())
}

/// Exchange depth push.
///
/// ```json
/// {"channel": "market_ethbtc_depth_step0", "ts": 1615377930695,
///  "tick": {"buys": [["0.033085", 0.051]], "asks": [["0.033086", 0.046]]}}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DepthMessage {
    pub channel: String,
    #[serde(default)]
    pub ts: u64,
    #[serde(default)]
    pub tick: Option<DepthTick>,
}

/// Payload of a [`DepthMessage`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepthTick {
    #[serde(default, deserialize_with = "wire_levels")]
    pub buys: Vec<Level>,
    #[serde(default, deserialize_with = "wire_levels")]
    pub asks: Vec<Level>,
}

impl DepthMessage {
    /// Parse a raw push and convert it to a [`DepthEvent`].
    ///
    /// Returns `Ok(None)` for messages without a `tick` (subscription
    /// acknowledgements, pings).
    pub fn parse(text: &str) -> Result<Option<DepthEvent>, DepthError> {
        let message: DepthMessage = serde_json::from_str(text)?;
        message.into_event()
    }

    /// Symbol encoded in the channel name, `market_<symbol>_depth_<step>`.
    pub fn symbol(&self) -> Result<Symbol, DepthError> {
        self.channel
            .strip_prefix("market_")
            .and_then(|rest| rest.split_once("_depth"))
            .map(|(symbol, _)| symbol)
            .filter(|symbol| !symbol.is_empty())
            .map(Symbol::new)
            .ok_or_else(|| DepthError::Channel(self.channel.clone()))
    }

    /// The push as a depth event sequenced by its timestamp.
    pub fn into_event(self) -> Result<Option<DepthEvent>, DepthError> {
        if self.tick.is_none() {
            return Ok(None);
        }
        let symbol = self.symbol()?;
        let tick = self.tick.unwrap_or_default();
        Ok(Some(DepthEvent {
            symbol,
            sequence: self.ts,
            bids: tick.buys,
            asks: tick.asks,
        }))
    }
}

/// Order-level event for a [`lob_book::TrackedBook`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Insert {
        id: OrderId,
        side: Side,
        #[serde(deserialize_with = "wire_text")]
        price: String,
        #[serde(deserialize_with = "wire_text")]
        volume: String,
        #[serde(default)]
        status: String,
    },
    Resize {
        id: OrderId,
        #[serde(deserialize_with = "wire_text")]
        volume: String,
        #[serde(default)]
        status: Option<String>,
    },
    Cancel {
        id: OrderId,
    },
}

impl OrderEvent {
    /// Id of the order the event refers to.
    pub fn id(&self) -> OrderId {
        match self {
            OrderEvent::Insert { id, .. } | OrderEvent::Resize { id, .. } | OrderEvent::Cancel { id } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_depth_push() {
        let text = r#"{"channel":"market_ethbtc_depth_step0","ts":1615377930695,
            "tick":{"buys":[["0.033085",0.051],["0.033084","0"]],"asks":[[0.033086,0.046]]}}"#;
        let event = DepthMessage::parse(text).unwrap().unwrap();

        assert_eq!(event.symbol, Symbol::new("ETHBTC"));
        assert_eq!(event.sequence, 1615377930695);
        assert_eq!(
            event.bids,
            vec![
                ("0.033085".to_string(), "0.051".to_string()),
                ("0.033084".to_string(), "0".to_string()),
            ]
        );
        assert_eq!(event.asks, vec![("0.033086".to_string(), "0.046".to_string())]);
    }

    #[test]
    fn test_message_without_tick_is_ignored() {
        let text = r#"{"channel":"market_ethbtc_depth_step0","ts":1,"status":"ok"}"#;
        assert!(DepthMessage::parse(text).unwrap().is_none());
    }

    #[test]
    fn test_missing_side_is_empty() {
        let text = r#"{"channel":"market_btcusdt_depth_step0","ts":2,"tick":{"asks":[["1","2"]]}}"#;
        let event = DepthMessage::parse(text).unwrap().unwrap();
        assert!(event.bids.is_empty());
        assert_eq!(event.asks.len(), 1);
    }

    #[test]
    fn test_bad_channel_and_json() {
        let text = r#"{"channel":"ticker","ts":2,"tick":{"buys":[]}}"#;
        assert!(matches!(DepthMessage::parse(text), Err(DepthError::Channel(_))));
        assert!(matches!(DepthMessage::parse("{"), Err(DepthError::Decode(_))));
    }

    #[test]
    fn test_order_event_json() {
        let insert: OrderEvent = serde_json::from_str(
            r#"{"type":"insert","id":1,"side":"BID","price":"0.18394","volume":1,"status":"NEW"}"#,
        )
        .unwrap();
        assert_eq!(
            insert,
            OrderEvent::Insert {
                id: OrderId(1),
                side: Side::Bid,
                price: "0.18394".to_string(),
                volume: "1".to_string(),
                status: "NEW".to_string(),
            }
        );

        let resize: OrderEvent =
            serde_json::from_str(r#"{"type":"resize","id":1,"volume":"0.5"}"#).unwrap();
        assert_eq!(resize.id(), OrderId(1));
        assert!(matches!(resize, OrderEvent::Resize { status: None, .. }));

        let cancel: OrderEvent = serde_json::from_str(r#"{"type":"cancel","id":9}"#).unwrap();
        assert_eq!(cancel, OrderEvent::Cancel { id: OrderId(9) });
    }
}
