//! JSON messages exchanged with WebSocket clients.
//!
//! Inbound messages carry their `"type"` tag inline, eg/
//! `{"type":"subscribe","topic":"strength"}`. Outbound messages carry the tag
//! next to a `"data"` payload, eg/ `{"type":"strength:update","data":{...}}`.

use crate::error::ServerError;
use chrono::{DateTime, Utc};
use fx_strength::{
    DashboardSnapshot, HeatmapSnapshot, IngestReport, PricePush, StrengthService, StrengthUpdate,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast stream a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Strength,
    Dashboard,
}

/// Topics a single client is subscribed to. Nothing is subscribed on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Subscriptions {
    strength: bool,
    dashboard: bool,
}

impl Subscriptions {
    pub fn contains(&self, topic: Topic) -> bool {
        match topic {
            Topic::Strength => self.strength,
            Topic::Dashboard => self.dashboard,
        }
    }

    pub fn set(&mut self, topic: Topic, subscribed: bool) {
        match topic {
            Topic::Strength => self.strength = subscribed,
            Topic::Dashboard => self.dashboard = subscribed,
        }
    }
}

/// Client request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Inbound {
    Subscribe {
        topic: Topic,
    },
    Unsubscribe {
        topic: Topic,
    },
    /// Price push, same shape as the bridge feed.
    Prices(PricePush),
    Heatmap {
        #[serde(default)]
        at: Option<i64>,
    },
    Dashboard,
}

/// Server message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Outbound {
    #[serde(rename = "welcome")]
    Welcome {
        message: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "strength:initial")]
    StrengthInitial(StrengthUpdate),
    #[serde(rename = "dashboard:initial")]
    DashboardInitial(Option<DashboardSnapshot>),
    #[serde(rename = "strength:update")]
    StrengthUpdate(StrengthUpdate),
    #[serde(rename = "dashboard:update")]
    DashboardUpdate(DashboardSnapshot),
    #[serde(rename = "prices:ack")]
    PricesAck(IngestReport),
    #[serde(rename = "heatmap")]
    Heatmap(Option<HeatmapSnapshot>),
    #[serde(rename = "dashboard")]
    Dashboard(Option<DashboardSnapshot>),
    #[serde(rename = "error")]
    Error { message: String },
}

impl Outbound {
    pub fn welcome() -> Self {
        Self::Welcome {
            message: "Connected to fx-strength feed".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Topic for messages fanned out to subscribers. Direct replies have none.
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Self::StrengthUpdate(_) => Some(Topic::Strength),
            Self::DashboardUpdate(_) => Some(Topic::Dashboard),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, ServerError> {
        serde_json::to_string(self).map_err(ServerError::from)
    }
}

/// Serialised outbound message shared by every subscriber of `topic`.
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub topic: Topic,
    pub json: Arc<str>,
}

/// Serialise `outbound` once and fan it out to every connected client.
///
/// Returns the number of clients that received it. Messages without a topic are
/// not broadcast.
pub fn publish(
    tx: &broadcast::Sender<Broadcast>,
    outbound: &Outbound,
) -> Result<usize, ServerError> {
    let Some(topic) = outbound.topic() else {
        return Ok(0);
    };

    let json = Arc::from(outbound.to_json()?);
    // No receivers is not an error: clients may simply not be connected yet.
    Ok(tx.send(Broadcast { topic, json }).unwrap_or(0))
}

/// Apply one client request, returning the direct reply if there is one.
pub fn handle_inbound(
    service: &StrengthService,
    subscriptions: &mut Subscriptions,
    inbound: Inbound,
) -> Option<Outbound> {
    match inbound {
        Inbound::Subscribe { topic } => {
            debug!(?topic, "client subscribed");
            subscriptions.set(topic, true);
            None
        }
        Inbound::Unsubscribe { topic } => {
            debug!(?topic, "client unsubscribed");
            subscriptions.set(topic, false);
            None
        }
        Inbound::Prices(push) => {
            let at = push.timestamp;
            let prices = push.into_price_map();
            Some(Outbound::PricesAck(service.ingest(&prices, at)))
        }
        Inbound::Heatmap { at } => Some(Outbound::Heatmap(service.heatmap(at))),
        Inbound::Dashboard => Some(Outbound::Dashboard(service.latest_dashboard())),
    }
}

/// Parse and apply one raw client message, replying with an `error` message when
/// it cannot be parsed.
pub fn handle_text(
    service: &StrengthService,
    subscriptions: &mut Subscriptions,
    text: &str,
) -> Option<Outbound> {
    match serde_json::from_str::<Inbound>(text) {
        Ok(inbound) => handle_inbound(service, subscriptions, inbound),
        Err(error) => {
            let preview = text.chars().take(100).collect::<String>();
            debug!(%error, "unparseable client message: {}", preview);
            Some(Outbound::Error {
                message: format!("invalid message: {error}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fx_strength::{CurrencyMap, Pair};

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_inbound_deserialisation() {
        struct TestCase {
            input: &'static str,
            expected: Inbound,
        }

        let tests = vec![
            TestCase {
                // TC0: subscribe
                input: r#"{"type":"subscribe","topic":"strength"}"#,
                expected: Inbound::Subscribe {
                    topic: Topic::Strength,
                },
            },
            TestCase {
                // TC1: unsubscribe
                input: r#"{"type":"unsubscribe","topic":"dashboard"}"#,
                expected: Inbound::Unsubscribe {
                    topic: Topic::Dashboard,
                },
            },
            TestCase {
                // TC2: heatmap without time
                input: r#"{"type":"heatmap"}"#,
                expected: Inbound::Heatmap { at: None },
            },
            TestCase {
                // TC3: heatmap at a time
                input: r#"{"type":"heatmap","at":1700000000000}"#,
                expected: Inbound::Heatmap { at: Some(T0) },
            },
            TestCase {
                // TC4: dashboard
                input: r#"{"type":"dashboard"}"#,
                expected: Inbound::Dashboard,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = serde_json::from_str::<Inbound>(test.input).unwrap();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_inbound_prices() {
        let inbound = serde_json::from_str::<Inbound>(
            r#"{"type":"prices","timestamp":1700000000000,"prices":{"EURUSD":1.1,"USDJPY":"150"}}"#,
        )
        .unwrap();

        let Inbound::Prices(push) = inbound else {
            panic!("expected a prices message");
        };
        assert_eq!(push.timestamp, Some(T0));

        let prices = push.into_price_map();
        let usdjpy: Pair = "USDJPY".parse().unwrap();
        assert_eq!(prices.get(&usdjpy), Some(&150.0));
    }

    #[test]
    fn test_outbound_shape() {
        let update = Outbound::StrengthUpdate(StrengthUpdate::realtime(
            CurrencyMap::splat(5.0),
            T0,
        ));
        let json = serde_json::to_value(&update).unwrap();

        assert_eq!(json["type"], "strength:update");
        assert_eq!(json["data"]["type"], "realtime");
        assert_eq!(json["data"]["strengths"]["USD"], 5.0);
        assert_eq!(update.topic(), Some(Topic::Strength));

        let initial = serde_json::to_value(Outbound::DashboardInitial(None)).unwrap();
        assert_eq!(initial["type"], "dashboard:initial");
        assert!(initial["data"].is_null());
        assert_eq!(Outbound::DashboardInitial(None).topic(), None);
    }

    #[test]
    fn test_subscriptions() {
        let service = StrengthService::default();
        let mut subscriptions = Subscriptions::default();
        assert!(!subscriptions.contains(Topic::Strength));

        let subscribe = r#"{"type":"subscribe","topic":"strength"}"#;
        let reply = handle_text(&service, &mut subscriptions, subscribe);
        assert_eq!(reply, None);
        assert!(subscriptions.contains(Topic::Strength));
        assert!(!subscriptions.contains(Topic::Dashboard));

        let unsubscribe = r#"{"type":"unsubscribe","topic":"strength"}"#;
        handle_text(&service, &mut subscriptions, unsubscribe);
        assert_eq!(subscriptions, Subscriptions::default());
    }

    #[test]
    fn test_prices_are_acknowledged() {
        let service = StrengthService::default();
        let mut subscriptions = Subscriptions::default();

        let reply = handle_text(
            &service,
            &mut subscriptions,
            r#"{"type":"prices","timestamp":1700000000000,"prices":{"EURUSD":1.1,"USDJPY":110}}"#,
        );

        let Some(Outbound::PricesAck(report)) = reply else {
            panic!("expected a prices:ack reply");
        };
        assert_eq!(report.at, T0);
        assert_eq!(report.received, 2);
        assert_eq!(report.updated, 3);
        service.with_store(|store| assert_eq!(store.latest_time(), Some(T0)));
    }

    #[test]
    fn test_invalid_message_replies_with_error() {
        let service = StrengthService::default();
        let mut subscriptions = Subscriptions::default();

        let invalid = [
            "not json",
            r#"{"type":"subscribe","topic":"alerts"}"#,
            r#"{"type":"nope"}"#,
        ];
        for text in invalid {
            let reply = handle_text(&service, &mut subscriptions, text);
            assert!(matches!(reply, Some(Outbound::Error { .. })), "{text} failed");
        }
    }

    #[test]
    fn test_publish_skips_direct_replies() {
        let (tx, mut rx) = broadcast::channel(8);

        let error = Outbound::Error {
            message: "nope".to_string(),
        };
        assert_eq!(publish(&tx, &error).unwrap(), 0);

        let update =
            Outbound::StrengthUpdate(StrengthUpdate::realtime(CurrencyMap::splat(5.0), T0));
        assert_eq!(publish(&tx, &update).unwrap(), 1);

        let received = rx.try_recv().unwrap();
        assert_eq!(received.topic, Topic::Strength);
        assert_eq!(&*received.json, update.to_json().unwrap());
    }
}
