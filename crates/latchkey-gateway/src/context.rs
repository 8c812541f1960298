//! Per-door context shared by the bridge and the decision engine.

use latchkey_core::Connectivity;
use tracing::Span;

/// Identity and shared state of the door this gateway serves.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    /// Name attached to every log line, e.g. `front-door`.
    pub door_name: String,

    /// Directory reachability, written by the directory client.
    pub connectivity: Connectivity,
}

impl GatewayContext {
    pub fn new(door_name: impl Into<String>, connectivity: Connectivity) -> Self {
        Self {
            door_name: door_name.into(),
            connectivity,
        }
    }

    /// Span wrapping the whole gateway run.
    pub fn span(&self) -> Span {
        tracing::info_span!("gateway", door = %self.door_name)
    }
}
