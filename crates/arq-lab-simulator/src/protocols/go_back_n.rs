//! Go-Back-N: cumulative ACKs on the send side, discard-on-mismatch on the
//! receive side.
//!
//! One retransmit timer covers the window base. When it expires with frames
//! still unacknowledged, the sender rewinds `next_seq` to `base` and resends
//! the whole window — losing the base frame therefore always costs the full
//! batch, even if later frames made it across (the receiver discards them as
//! out of order).

use super::{PACE_TIMER, window_upper};
use arq_lab_abstract::{
    Ack, Frame, LinkContext, ReceiverProtocol, RunConfig, SenderProtocol, TraceEvent, TransferUnit,
};

pub struct GoBackNSender {
    total: u32,
    window: u32,
    base: u32,
    next_seq: u32,
    stagger_ms: u64,
    timeout_ms: u64,
    pace_pending: bool,
    /// Sequence number the retransmit timer is keyed on, when armed.
    timer_armed: Option<u32>,
}

impl GoBackNSender {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            total: config.total_frames,
            window: config.effective_window(),
            base: 0,
            next_seq: 0,
            stagger_ms: config.timing.stagger_ms,
            timeout_ms: config.timing.timeout_ms,
            pace_pending: false,
            timer_armed: None,
        }
    }

    fn upper(&self) -> u32 {
        window_upper(self.base, self.window, self.total)
    }

    fn arm_timer(&mut self, ctx: &mut dyn LinkContext) {
        if let Some(id) = self.timer_armed.take() {
            ctx.cancel_timer(id);
        }
        ctx.start_timer(self.timeout_ms, self.base);
        self.timer_armed = Some(self.base);
    }

    fn disarm_timer(&mut self, ctx: &mut dyn LinkContext) {
        if let Some(id) = self.timer_armed.take() {
            ctx.cancel_timer(id);
        }
    }

    /// Send at most one frame, keep the base timer armed, pace the rest.
    fn pump(&mut self, ctx: &mut dyn LinkContext) {
        if self.pace_pending || self.next_seq >= self.upper() {
            return;
        }
        ctx.transmit(TransferUnit::Data(Frame::new(self.next_seq)));
        if self.timer_armed.is_none() {
            self.arm_timer(ctx);
        }
        self.next_seq += 1;
        if self.next_seq < self.upper() {
            ctx.start_timer(self.stagger_ms, PACE_TIMER);
            self.pace_pending = true;
        }
    }
}

impl SenderProtocol for GoBackNSender {
    fn init(&mut self, ctx: &mut dyn LinkContext) {
        ctx.emit(TraceEvent::WindowChanged {
            base: 0,
            upper: self.upper(),
        });
        self.pump(ctx);
    }

    fn on_ack(&mut self, ctx: &mut dyn LinkContext, ack: Ack) {
        // Cumulative: ACK K acknowledges K and everything below it.
        if ack.seq < self.base || ack.seq >= self.next_seq {
            return; // stale or spurious
        }
        self.base = ack.seq + 1;
        ctx.emit(TraceEvent::WindowChanged {
            base: self.base,
            upper: self.upper(),
        });
        if self.base == self.next_seq {
            self.disarm_timer(ctx);
        } else {
            self.arm_timer(ctx); // restart for the new base
        }
        if self.base < self.total {
            self.pump(ctx);
        }
    }

    fn on_timer(&mut self, ctx: &mut dyn LinkContext, timer_id: u32) {
        if timer_id == PACE_TIMER {
            self.pace_pending = false;
            self.pump(ctx);
            return;
        }
        if self.timer_armed != Some(timer_id) {
            return;
        }
        self.timer_armed = None;
        if self.base < self.next_seq {
            ctx.emit(TraceEvent::StatusChanged {
                text: format!(
                    "timeout, going back: retransmitting frames {}..{}",
                    self.base, self.next_seq
                ),
            });
            self.next_seq = self.base;
            // The pump re-arms the timer on the first retransmission. A
            // pending pace tick resumes the batch from the rewound position.
            if !self.pace_pending {
                self.pump(ctx);
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.base >= self.total
    }
}

pub struct GoBackNReceiver {
    expected: u32,
}

impl GoBackNReceiver {
    pub fn new() -> Self {
        Self { expected: 0 }
    }
}

impl Default for GoBackNReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverProtocol for GoBackNReceiver {
    fn on_frame(&mut self, ctx: &mut dyn LinkContext, frame: Frame) {
        if frame.seq == self.expected {
            ctx.deliver(&frame);
            ctx.transmit(TransferUnit::Ack(Ack::new(frame.seq)));
            self.expected += 1;
        } else {
            // The GBN discard rule: anything but the expected sequence is
            // refused, and no ACK is emitted for it.
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

    fn sender(total: u32, window: u32) -> GoBackNSender {
        GoBackNSender::new(&RunConfig::new(Protocol::GoBackN, total, window))
    }

    fn drain_pace(s: &mut GoBackNSender, ctx: &mut RecordingContext) {
        while s.pace_pending {
            s.pace_pending = false;
            s.pump(ctx);
        }
    }

    #[test]
    fn timeout_rewinds_and_resends_window() {
        let mut s = sender(4, 2);
        let mut ctx = RecordingContext::new();
        s.init(&mut ctx);
        drain_pace(&mut s, &mut ctx);
        assert_eq!(ctx.sent_frames(), vec![0, 1]);
        assert_eq!(s.timer_armed, Some(0));

        // No ACK came back; the base timer fires.
        s.on_timer(&mut ctx, 0);
        drain_pace(&mut s, &mut ctx);
        assert_eq!(ctx.sent_frames(), vec![0, 1, 0, 1]);
        assert_eq!(s.base, 0);
        assert_eq!(s.next_seq, 2);
    }

    #[test]
    fn cumulative_ack_advances_base_and_opens_window() {
        let mut s = sender(4, 2);
        let mut ctx = RecordingContext::new();
        s.init(&mut ctx);
        drain_pace(&mut s, &mut ctx);

        s.on_ack(&mut ctx, Ack::new(0));
        drain_pace(&mut s, &mut ctx);
        assert_eq!(s.base, 1);
        assert_eq!(ctx.sent_frames(), vec![0, 1, 2]);

        // Cumulative jump: ACK 2 covers 1 and 2 at once.
        s.on_ack(&mut ctx, Ack::new(2));
        drain_pace(&mut s, &mut ctx);
        assert_eq!(s.base, 3);
        assert_eq!(ctx.sent_frames(), vec![0, 1, 2, 3]);

        s.on_ack(&mut ctx, Ack::new(3));
        assert!(s.is_complete());
        assert_eq!(s.timer_armed, None);
    }

    #[test]
    fn stale_and_spurious_acks_are_ignored() {
        let mut s = sender(4, 2);
        let mut ctx = RecordingContext::new();
        s.init(&mut ctx);
        drain_pace(&mut s, &mut ctx);
        s.on_ack(&mut ctx, Ack::new(0));

        let base = s.base;
        s.on_ack(&mut ctx, Ack::new(0)); // duplicate
        assert_eq!(s.base, base);
        s.on_ack(&mut ctx, Ack::new(3)); // beyond next_seq
        assert_eq!(s.base, base);
    }

    #[test]
    fn receiver_discards_out_of_order_without_ack() {
        let mut r = GoBackNReceiver::new();
        let mut ctx = RecordingContext::new();
        r.on_frame(&mut ctx, Frame::new(1));
        assert!(ctx.delivered.is_empty());
        assert!(ctx.sent_acks().is_empty());
        assert_eq!(ctx.events, vec![TraceEvent::FrameDiscarded {
            seq: 1,
            expected: 0
        }]);

        r.on_frame(&mut ctx, Frame::new(0));
        assert_eq!(ctx.delivered, vec![0]);
        assert_eq!(ctx.sent_acks(), vec![0]);
    }
}
