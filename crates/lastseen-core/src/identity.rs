//! The processor's own identity, used to stamp derived events.

use serde::Deserialize;

/// Identifier and definition locator of a running processor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessorIdentity {
    /// Instance identifier, unique within a deployment.
    #[serde(default = "default_id")]
    pub id: String,

    /// Locator of the processor definition this instance was created from.
    #[serde(default = "default_definition_uri")]
    pub definition_uri: String,
}

impl ProcessorIdentity {
    /// Create an identity from its parts.
    pub fn new(id: impl Into<String>, definition_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            definition_uri: definition_uri.into(),
        }
    }

    /// Name of the destination derived events are published to.
    pub fn event_destination(&self) -> String {
        format!("{}:event", self.id)
    }
}

impl Default for ProcessorIdentity {
    fn default() -> Self {
        Self {
            id: default_id(),
            definition_uri: default_definition_uri(),
        }
    }
}

fn default_id() -> String {
    String::from("most-recent-cache")
}

fn default_definition_uri() -> String {
    String::from("lastseen://processor/most-recent-cache")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_is_derived_from_id() {
        let identity = ProcessorIdentity::new("tracks-1", "lastseen://processor/tracks");
        assert_eq!(identity.event_destination(), "tracks-1:event");
    }
}
