//! Event bridge and access decisions for the Latchkey door gateway.
//!
//! ```text
//!  serial link                                   network
//! ┌────────────┐  frames  ┌────────┐  queue  ┌──────────────┐  lookups  ┌───────────┐
//! │ FrameSource│─────────>│ reader │────────>│ AccessEngine │<─────────>│ directory │
//! └────────────┘ (thread) └────────┘         └──────────────┘           └───────────┘
//!        ^                                     │        │
//!        └──────────── unlock (FrameSink) ─────┘        └──> telemetry
//! ```
//!
//! [`Gateway::run`] owns the lifecycle: it starts the reader, processes the
//! queue one message at a time, and on link loss or shutdown publishes a
//! final status and returns a non-zero exit code.

pub mod bridge;
pub mod context;
pub mod debounce;
pub mod engine;
pub mod gateway;
pub mod lifecycle;

pub use bridge::{ReaderExit, route_frame, spawn_reader};
pub use context::GatewayContext;
pub use debounce::Debouncer;
pub use engine::{AccessEngine, AccessOutcome, GrantSource, Processed, StatusReport};
pub use gateway::{Gateway, StopReason, Termination};
pub use lifecycle::{BridgeState, Lifecycle, StateTransition};
