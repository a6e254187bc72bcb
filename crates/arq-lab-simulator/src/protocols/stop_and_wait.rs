//! Stop-and-Wait: exactly one frame outstanding at a time.

use arq_lab_abstract::{
    Ack, Frame, LinkContext, ReceiverProtocol, RunConfig, SenderProtocol, TraceEvent, TransferUnit,
};

/// Per frame the sender walks `Idle -> Sending -> AwaitingAck`, resolving to
/// either the matching ACK (advance) or a timeout (retransmit, no advance).
pub struct StopAndWaitSender {
    total: u32,
    current: u32,
    awaiting: bool,
    timeout_ms: u64,
}

impl StopAndWaitSender {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            total: config.total_frames,
            current: 0,
            awaiting: false,
            timeout_ms: config.timing.timeout_ms,
        }
    }

    fn send_current(&mut self, ctx: &mut dyn LinkContext) {
        ctx.transmit(TransferUnit::Data(Frame::new(self.current)));
        ctx.start_timer(self.timeout_ms, self.current);
        self.awaiting = true;
    }
}

impl SenderProtocol for StopAndWaitSender {
    fn init(&mut self, ctx: &mut dyn LinkContext) {
        ctx.emit(TraceEvent::WindowChanged {
            base: 0,
            upper: 1.min(self.total),
        });
        self.send_current(ctx);
    }

    fn on_ack(&mut self, ctx: &mut dyn LinkContext, ack: Ack) {
        if !self.awaiting || ack.seq != self.current {
            return; // stale ACK from an earlier frame
        }
        ctx.cancel_timer(self.current);
        self.awaiting = false;
        self.current += 1;
        ctx.emit(TraceEvent::WindowChanged {
            base: self.current,
            upper: (self.current + 1).min(self.total),
        });
        if self.current < self.total {
            self.send_current(ctx);
        }
    }

    fn on_timer(&mut self, ctx: &mut dyn LinkContext, timer_id: u32) {
        if self.awaiting && timer_id == self.current {
            ctx.emit(TraceEvent::StatusChanged {
                text: format!("timeout, retransmitting frame {}", self.current),
            });
            self.send_current(ctx);
        }
    }

    fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

pub struct StopAndWaitReceiver {
    expected: u32,
}

impl StopAndWaitReceiver {
    pub fn new() -> Self {
        Self { expected: 0 }
    }
}

impl Default for StopAndWaitReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverProtocol for StopAndWaitReceiver {
    fn on_frame(&mut self, ctx: &mut dyn LinkContext, frame: Frame) {
        if frame.seq == self.expected {
            ctx.deliver(&frame);
            self.expected += 1;
            ctx.transmit(TransferUnit::Ack(Ack::new(frame.seq)));
        } else if frame.seq < self.expected {
            // Already delivered; repair the ACK without re-delivering.
            ctx.transmit(TransferUnit::Ack(Ack::new(frame.seq)));
        } else {
            // Cannot happen with a window of one; refuse rather than buffer.
            ctx.emit(TraceEvent::FrameDiscarded {
                seq: frame.seq,
                expected: self.expected,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::testing::RecordingContext;
    use arq_lab_abstract::Protocol;

    fn config(total: u32) -> RunConfig {
        RunConfig::new(Protocol::StopAndWait, total, 1)
    }

    #[test]
    fn sender_advances_only_on_matching_ack() {
        let mut sender = StopAndWaitSender::new(&config(2));
        let mut ctx = RecordingContext::new();
        sender.init(&mut ctx);
        assert_eq!(ctx.out.len(), 1);
        assert_eq!(ctx.out[0].seq(), 0);

        // An ACK for a different frame changes nothing.
        sender.on_ack(&mut ctx, Ack::new(1));
        assert!(!sender.is_complete());
        assert_eq!(ctx.out.len(), 1);

        sender.on_ack(&mut ctx, Ack::new(0));
        assert_eq!(ctx.cancelled, vec![0]);
        assert_eq!(ctx.out.len(), 2);
        assert_eq!(ctx.out[1].seq(), 1);

        sender.on_ack(&mut ctx, Ack::new(1));
        assert!(sender.is_complete());
    }

    #[test]
    fn timeout_retransmits_same_frame() {
        let mut sender = StopAndWaitSender::new(&config(1));
        let mut ctx = RecordingContext::new();
        sender.init(&mut ctx);
        sender.on_timer(&mut ctx, 0);
        assert_eq!(ctx.out.len(), 2);
        assert_eq!(ctx.out[0].seq(), 0);
        assert_eq!(ctx.out[1].seq(), 0);
        // Timer for a frame no longer current is ignored.
        sender.on_ack(&mut ctx, Ack::new(0));
        sender.on_timer(&mut ctx, 0);
        assert_eq!(ctx.out.len(), 2);
    }

    #[test]
    fn receiver_reacks_duplicates_without_redelivery() {
        let mut receiver = StopAndWaitReceiver::new();
        let mut ctx = RecordingContext::new();
        receiver.on_frame(&mut ctx, Frame::new(0));
        receiver.on_frame(&mut ctx, Frame::new(0));
        assert_eq!(ctx.delivered, vec![0]);
        assert_eq!(ctx.out.len(), 2); // both arrivals ACKed
    }
}
