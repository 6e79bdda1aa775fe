//! # Event
//!
//! The [`Event`] is the immutable unit of communication on the [`crate::bus::EventBus`].
//! Once constructed it is never mutated; every subscriber receives an
//! independently cloned copy via [`Event::clone_for_dispatch`], so in-place
//! modification by one subscriber can never leak into another's view.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

/// Closed tag set for events crossing the bus boundary. `UserCustom` is the
/// escape hatch for host-defined event kinds, disambiguated further by
/// [`Payload::payload_type`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum EventType {
    System,
    MarketData,
    News,
    Signal,
    Alert,
    Warning,
    UserCustom,
}

/// Opaque, typed event payload. Hot-path producers should prefer a typed
/// variant (`Json`, `Decimal`, `Bytes`) over stuffing everything into
/// [`Event::attributes`], so the dispatcher never has to parse strings to
/// decide what an event is carrying.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Payload {
    Empty,
    Text(String),
    Json(serde_json::Value),
    #[serde(with = "bytes_payload")]
    Bytes(Bytes),
    Decimal(Decimal),
}

/// Round `bytes::Bytes` through a plain `Vec<u8>` for serde, since `bytes`'s
/// own `serde` feature is not enabled in this crate's dependency graph.
mod bytes_payload {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes.as_ref())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let buf = Vec::<u8>::deserialize(deserializer)?;
        Ok(Bytes::from(buf))
    }
}

impl Payload {
    /// String discriminator carried alongside the payload, used by
    /// subscribers to distinguish `UserCustom` events without matching on
    /// the variant itself.
    pub fn payload_type(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Text(_) => "text",
            Payload::Json(_) => "json",
            Payload::Bytes(_) => "bytes",
            Payload::Decimal(_) => "decimal",
        }
    }
}

/// Immutable, cloneable event flowing through the [`crate::bus::EventBus`].
///
/// Constructed by a producer (data source, strategy, trigger, or the
/// `Engine` itself), owned by the bus from enqueue until every subscriber has
/// been invoked, then dropped.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub kind: EventType,
    pub timestamp: DateTime<Utc>,
    pub source: SmolStr,
    pub attributes: IndexMap<String, String>,
    pub payload: Payload,
}

impl Event {
    /// Start building an [`Event`] of the given kind and timestamp.
    pub fn builder(kind: EventType, timestamp: DateTime<Utc>) -> EventBuilder {
        EventBuilder::new(kind, timestamp)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Deep-clone for handing an independent copy to a single subscriber.
    /// Distinct from `derive(Clone)` only in name: the name documents the
    /// invariant that every dispatch clones, never shares, an `Event`.
    pub fn clone_for_dispatch(&self) -> Event {
        self.clone()
    }
}

/// Fluent constructor for [`Event`], mirroring the builder idiom used
/// throughout the wider trading-system domain (instrument, order, and
/// request builders all follow this shape).
#[derive(Debug, Clone)]
pub struct EventBuilder {
    kind: EventType,
    timestamp: DateTime<Utc>,
    source: SmolStr,
    attributes: IndexMap<String, String>,
    payload: Payload,
}

impl EventBuilder {
    pub fn new(kind: EventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp,
            source: SmolStr::new_static("unknown"),
            attributes: IndexMap::new(),
            payload: Payload::Empty,
        }
    }

    pub fn source(mut self, source: impl Into<SmolStr>) -> Self {
        self.source = source.into();
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Event {
        Event {
            id: Uuid::new_v4(),
            kind: self.kind,
            timestamp: self.timestamp,
            source: self.source,
            attributes: self.attributes,
            payload: self.payload,
        }
    }
}
