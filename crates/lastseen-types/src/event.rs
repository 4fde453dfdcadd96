//! The event payload carried through the processor.
//!
//! An [`Event`] is opaque to the processor except for two parts: its
//! [`TrackKey`], which selects the cache slot, and its [`PropertySet`],
//! which carries metadata such as the event type and the owning
//! processor. Attributes (the actual payload fields) are passed through
//! untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::EventId;
use crate::key::TrackKey;

/// Well-known property names.
pub mod property {
    /// The event type marker.
    pub const TYPE: &str = "type";
    /// Identifier of the processor that produced the event.
    pub const OWNER_ID: &str = "owner_id";
    /// Definition locator of the processor that produced the event.
    pub const OWNER_URI: &str = "owner_uri";
}

/// Metadata properties attached to an event, keyed by property name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet(BTreeMap<String, Value>);

impl PropertySet {
    /// Create an empty property set.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Whether a property with this name is present.
    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Look up a property value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Set a property, returning the previous value if there was one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single observation about a tracked entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique id of this event instance.
    #[serde(default)]
    pub id: EventId,

    /// Key of the entity this event describes.
    pub track_id: TrackKey,

    /// Name of the schema the attributes conform to.
    #[serde(default)]
    pub definition: String,

    /// When the event entered the system.
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,

    /// Payload fields.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,

    /// Metadata properties.
    #[serde(default)]
    pub properties: PropertySet,
}

impl Event {
    /// Create an event with no attributes or properties.
    pub fn new(track_id: TrackKey, definition: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            track_id,
            definition: definition.into(),
            received_at: Utc::now(),
            attributes: BTreeMap::new(),
            properties: PropertySet::new(),
        }
    }

    /// Add a payload attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a metadata property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.set(name, value);
        self
    }

    /// Copy everything except the properties, which start empty.
    pub fn clone_payload(&self) -> Self {
        Self {
            id: self.id,
            track_id: self.track_id.clone(),
            definition: self.definition.clone(),
            received_at: self.received_at,
            attributes: self.attributes.clone(),
            properties: PropertySet::new(),
        }
    }
}
