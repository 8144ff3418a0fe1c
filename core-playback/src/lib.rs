//! # Core Playback
//!
//! Media transport layer for the playback engine. Wraps a platform
//! [`MediaElement`](bridge_traits::media::MediaElement) behind a transport
//! that owns load cancellation, readiness gating, and typed event delivery.
//!
//! ## Overview
//!
//! - **[`MediaTransport`]**: drives one media element. Every `load()` bumps a
//!   generation counter so that a superseded load can never start playback
//!   under a newer one.
//! - **[`ReadinessStrategy`]**: pluggable policy deciding when a freshly
//!   loaded source has buffered enough to start. [`EagerPlayback`] starts on
//!   the first ready signal; [`BufferGatedPlayback`] waits for a buffer
//!   runway, suited to constrained networks.
//! - **[`TransportEvent`]**: the transport's outbound event stream (ended,
//!   errored, time updates) consumed by the engine's dispatcher.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  load/play/seek  ┌────────────────┐  set_source/play  ┌──────────────┐
//! │    Engine    ├─────────────────>│ MediaTransport ├──────────────────>│ MediaElement │
//! │ (dispatcher) │<─────────────────┤  (generation,  │<──────────────────┤  (platform)  │
//! └──────────────┘  TransportEvent  │   readiness)   │ MediaElementEvent └──────────────┘
//!                                   └────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! The transport is `Send + Sync` and shared via `Arc`. The readiness gate
//! and event pump run as spawned tokio tasks.

pub mod error;
pub mod strategy;
pub mod transport;

pub use error::{ErrorKind, Result, TransportError};
pub use strategy::{BufferGatedPlayback, EagerPlayback, ReadinessStrategy};
pub use transport::{MediaTransport, TransportEvent, TransportState};
