//! Derived-event construction.
//!
//! Every event re-emitted by the replay worker is a copy of the cached
//! event, stamped with the processor's provenance. Stamps are written first
//! and source properties are copied through only where no stamp exists, so
//! the stamps always win.

use lastseen_types::{Event, property};

use crate::identity::ProcessorIdentity;

/// Event type marker carried by every derived event.
pub const DERIVED_EVENT_TYPE: &str = "derived/event";

/// Build the outgoing copy of a cached event.
///
/// `source` is only borrowed; the cached entry is never modified.
pub fn derive_event(source: &Event, identity: &ProcessorIdentity) -> Event {
    let mut out = source.clone_payload();
    out.properties.set(property::TYPE, DERIVED_EVENT_TYPE);
    out.properties.set(property::OWNER_ID, identity.id.as_str());
    out.properties
        .set(property::OWNER_URI, identity.definition_uri.as_str());

    for (name, value) in source.properties.iter() {
        if !out.properties.has(name) {
            out.properties.set(name.clone(), value.clone());
        }
    }
    out
}
