use serde::Serialize;

/// One entry of the core-to-presentation event stream.
///
/// The engine records these in simulation order; a front-end renders them,
/// the scenario runner asserts on them. Sequence numbers are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TraceEvent {
    /// A data frame was placed on the channel (first send or retransmission).
    FrameSent { seq: u32 },
    /// A data frame survived transit and reached the receiving endpoint.
    FrameDelivered { seq: u32 },
    /// A data frame was dropped mid-channel.
    FrameLost { seq: u32 },
    /// The receiver refused a frame that did not match its expected sequence.
    FrameDiscarded { seq: u32, expected: u32 },
    /// The receiver stored an out-of-order frame for later delivery.
    FrameBuffered { seq: u32 },
    /// The receiver handed a frame up to its application in order.
    FrameDeliveredToReceiver { seq: u32 },
    /// An acknowledgment was placed on the channel.
    AckSent { seq: u32 },
    /// An acknowledgment reached the sender.
    AckReceived { seq: u32 },
    /// The send window moved; covers sequence numbers `base..upper`.
    WindowChanged { base: u32, upper: u32 },
    StatusChanged { text: String },
    RunFinished,
    RunAborted,
}

/// A trace event stamped with the simulation time it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedEvent {
    pub time: u64,
    #[serde(flatten)]
    pub event: TraceEvent,
}
