//! Most-recent cache, replay worker, and clear scheduler for the LastSeen
//! processor.
//!
//! The processor keeps only the latest event per [`TrackKey`] and
//! periodically re-emits the whole cache downstream. Two background
//! activities run for the lifetime of a started [`Processor`]:
//!
//! - the replay worker, which wakes every cycle interval and forwards a
//!   derived copy of each cached event to the [`EventSink`];
//! - the clear scheduler, which empties the cache once a day at a
//!   configured wall-clock time.
//!
//! # Modules
//!
//! - [`cache`] -- [`MostRecentCache`], the concurrent key to event map.
//! - [`clear`] -- Daily cache-clear timer.
//! - [`clock`] -- Wall-clock abstraction used by the clear scheduler.
//! - [`config`] -- Configuration loading from `lastseen-config.yaml` and
//!   schedule validation.
//! - [`derive`] -- Derived-event construction and provenance stamping.
//! - [`identity`] -- The processor's own identifier and definition locator.
//! - [`processor`] -- The orchestrator owning the cache and both tasks.
//! - [`replay`] -- The replay worker loop.
//! - [`sink`] -- [`EventSink`] trait and [`ChannelSink`].
//! - [`task`] -- Cancellable background task handle.
//!
//! [`TrackKey`]: lastseen_types::TrackKey
//! [`MostRecentCache`]: cache::MostRecentCache
//! [`Processor`]: processor::Processor
//! [`EventSink`]: sink::EventSink
//! [`ChannelSink`]: sink::ChannelSink

pub mod cache;
pub mod clear;
pub mod clock;
pub mod config;
pub mod derive;
pub mod identity;
pub mod processor;
pub mod replay;
pub mod sink;
pub mod task;
