use bytes::Bytes;

/// A data frame crossing the link. Sequence numbers are dense per run
/// (`0..total_frames`); the payload is opaque and only its identity matters
/// to the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: u32,
    pub payload: Bytes,
}

impl Frame {
    /// Build the canonical frame for a sequence number with a synthetic payload.
    pub fn new(seq: u32) -> Self {
        Self {
            seq,
            payload: Bytes::from(format!("frame-{seq}")),
        }
    }

    pub fn with_payload(seq: u32, payload: Bytes) -> Self {
        Self { seq, payload }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// An acknowledgment referencing one sequence number. Whether it is read as
/// individual (Stop-and-Wait, Selective Repeat) or cumulative (Go-Back-N) is
/// up to the protocol, not the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub seq: u32,
}

impl Ack {
    pub fn new(seq: u32) -> Self {
        Self { seq }
    }
}

/// The channel's unit of transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferUnit {
    Data(Frame),
    Ack(Ack),
}

impl TransferUnit {
    pub fn seq(&self) -> u32 {
        match self {
            TransferUnit::Data(frame) => frame.seq,
            TransferUnit::Ack(ack) => ack.seq,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, TransferUnit::Data(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_payload_identity() {
        let f = Frame::new(3);
        assert_eq!(f.seq, 3);
        assert_eq!(f.payload, Bytes::from_static(b"frame-3"));
    }

    #[test]
    fn unit_seq_matches_inner() {
        assert_eq!(TransferUnit::Data(Frame::new(7)).seq(), 7);
        assert_eq!(TransferUnit::Ack(Ack::new(9)).seq(), 9);
        assert!(!TransferUnit::Ack(Ack::new(9)).is_data());
    }
}
