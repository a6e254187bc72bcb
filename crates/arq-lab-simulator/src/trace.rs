use crate::driver::RunOutcome;
use arq_lab_abstract::{RunConfig, TimedEvent};
use serde::Serialize;

/// Serializable snapshot of a finished (or aborted) run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub config: RunConfig,
    pub outcome: RunOutcome,
    pub duration_ms: u64,
    /// Sequence numbers the receiver handed to its application, in order.
    pub delivered: Vec<u32>,
    /// Data-frame transmissions, retransmissions included.
    pub frame_transmissions: u32,
    pub ack_count: u32,
    pub timeline: Vec<TimedEvent>,
}
