//! Shared type definitions for the LastSeen processor.
//!
//! This crate is the single source of truth for the event shape that flows
//! through the workspace: inbound events are decoded into [`Event`], cached
//! by [`TrackKey`], and re-emitted with a stamped [`PropertySet`].
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for event identifiers
//! - [`key`] -- Validated cache key ([`TrackKey`])
//! - [`event`] -- The event payload and its property set

pub mod event;
pub mod ids;
pub mod key;

// Re-export all public types at crate root for convenience.
pub use event::{Event, PropertySet, property};
pub use ids::EventId;
pub use key::{KeyError, TrackKey};
