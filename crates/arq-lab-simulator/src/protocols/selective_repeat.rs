//! Selective Repeat: individual ACKs, out-of-order buffering, and
//! base-only retransmission.
//!
//! The sender keeps a per-frame acked table and one retransmit timer that
//! always tracks the current window base; an expiry resends that single
//! frame, never the window. The receiver buffers ahead of `expected` and
//! ACKs every arrival — including duplicates — so a lost ACK is repaired by
//! the sender's timeout without the receiver ever resending data.

use super::{PACE_TIMER, window_upper};
use arq_lab_abstract::{
    Ack, Frame, LinkContext, ReceiverProtocol, RunConfig, SenderProtocol, TraceEvent, TransferUnit,
};

pub struct SelectiveRepeatSender {
    total: u32,
    window: u32,
    base: u32,
    next_seq: u32,
    acked: Vec<bool>,
    stagger_ms: u64,
    timeout_ms: u64,
    pace_pending: bool,
    /// Sequence number the retransmit timer is keyed on, when armed.
    timer_armed: Option<u32>,
}

impl SelectiveRepeatSender {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            total: config.total_frames,
            window: config.effective_window(),
            base: 0,
            next_seq: 0,
            acked: vec![false; config.total_frames as usize],
            stagger_ms: config.timing.stagger_ms,
            timeout_ms: config.timing.timeout_ms,
            pace_pending: false,
            timer_armed: None,
        }
    }

    fn upper(&self) -> u32 {
        window_upper(self.base, self.window, self.total)
    }

    /// Point the retransmit timer at the current base, or disarm it when
    /// nothing is outstanding there.
    fn retarget_timer(&mut self, ctx: &mut dyn LinkContext) {
        if let Some(id) = self.timer_armed.take() {
            ctx.cancel_timer(id);
        }
        if self.base < self.total && !self.acked[self.base as usize] {
            ctx.start_timer(self.timeout_ms, self.base);
            self.timer_armed = Some(self.base);
        }
    }

    fn pump(&mut self, ctx: &mut dyn LinkContext) {
        if self.pace_pending || self.next_seq >= self.upper() {
            return;
        }
        ctx.transmit(TransferUnit::Data(Frame::new(self.next_seq)));
        if self.timer_armed.is_none() {
            self.retarget_timer(ctx);
        }
        self.next_seq += 1;
        if self.next_seq < self.upper() {
            ctx.start_timer(self.stagger_ms, PACE_TIMER);
            self.pace_pending = true;
        }
    }
}

impl SenderProtocol for SelectiveRepeatSender {
    fn init(&mut self, ctx: &mut dyn LinkContext) {
        ctx.emit(TraceEvent::WindowChanged {
            base: 0,
            upper: self.upper(),
        });
        self.pump(ctx);
    }

    fn on_ack(&mut self, ctx: &mut dyn LinkContext, ack: Ack) {
        let seq = ack.seq;
        if seq >= self.total || self.acked[seq as usize] {
            return; // duplicate or out-of-range ACK
        }
        self.acked[seq as usize] = true;
        if seq != self.base {
            return; // recorded; the window slides when the base is acked
        }
        // Slide across the acked prefix. Authoritative state is the acked
        // table, never which frame's round trip happened to complete.
        while self.base < self.total && self.acked[self.base as usize] {
            self.base += 1;
        }
        ctx.emit(TraceEvent::WindowChanged {
            base: self.base,
            upper: self.upper(),
        });
        self.retarget_timer(ctx);
        self.pump(ctx);
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
        if self.base < self.total && !self.acked[self.base as usize] {
            ctx.emit(TraceEvent::StatusChanged {
                text: format!("timeout, retransmitting frame {} only", self.base),
            });
            ctx.transmit(TransferUnit::Data(Frame::new(self.base)));
            ctx.start_timer(self.timeout_ms, self.base);
            self.timer_armed = Some(self.base);
        }
    }

    fn is_complete(&self) -> bool {
        self.base >= self.total
    }
}

pub struct SelectiveRepeatReceiver {
    expected: u32,
    /// Received-but-undelivered frames, indexed by sequence number. A slot
    /// is cleared exactly when its frame is delivered.
    buffer: Vec<Option<Frame>>,
}

impl SelectiveRepeatReceiver {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            expected: 0,
            buffer: (0..config.total_frames).map(|_| None).collect(),
        }
    }

    /// Deliver `expected` and every contiguously buffered frame above it.
    fn drain_from(&mut self, ctx: &mut dyn LinkContext, frame: Frame) {
        ctx.deliver(&frame);
        self.expected += 1;
        while let Some(slot) = self.buffer.get_mut(self.expected as usize) {
            match slot.take() {
                Some(buffered) => {
                    ctx.deliver(&buffered);
                    self.expected += 1;
                }
                None => break,
            }
        }
    }
}

impl ReceiverProtocol for SelectiveRepeatReceiver {
    fn on_frame(&mut self, ctx: &mut dyn LinkContext, frame: Frame) {
        let seq = frame.seq;
        if seq == self.expected {
            self.drain_from(ctx, frame);
        } else if seq > self.expected {
            if let Some(slot) = self.buffer.get_mut(seq as usize) {
                // An already-buffered slot means a duplicate; keep the first.
                if slot.is_none() {
                    ctx.emit(TraceEvent::FrameBuffered { seq });
                    *slot = Some(frame);
                }
            }
        }
        // seq < expected: old duplicate, nothing to deliver.

        // Every arrival is individually ACKed, duplicates included.
        ctx.transmit(TransferUnit::Ack(Ack::new(seq)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::testing::RecordingContext;
    use arq_lab_abstract::Protocol;

    fn config(total: u32, window: u32) -> RunConfig {
        RunConfig::new(Protocol::SelectiveRepeat, total, window)
    }

    fn sender(total: u32, window: u32) -> SelectiveRepeatSender {
        SelectiveRepeatSender::new(&config(total, window))
    }

    fn drain_pace(s: &mut SelectiveRepeatSender, ctx: &mut RecordingContext) {
        while s.pace_pending {
            s.pace_pending = false;
            s.pump(ctx);
        }
    }

    #[test]
    fn timeout_resends_only_the_base_frame() {
        let mut s = sender(3, 3);
        let mut ctx = RecordingContext::new();
        s.init(&mut ctx);
        drain_pace(&mut s, &mut ctx);
        assert_eq!(ctx.sent_frames(), vec![0, 1, 2]);

        s.on_ack(&mut ctx, Ack::new(1));
        s.on_ack(&mut ctx, Ack::new(2));
        assert_eq!(s.base, 0, "base stays until its own ACK arrives");

        s.on_timer(&mut ctx, 0);
        assert_eq!(ctx.sent_frames(), vec![0, 1, 2, 0]);

        s.on_ack(&mut ctx, Ack::new(0));
        assert!(s.is_complete(), "prefix slide jumps over acked 1 and 2");
    }

    #[test]
    fn slide_stops_at_first_unacked() {
        let mut s = sender(5, 5);
        let mut ctx = RecordingContext::new();
        s.init(&mut ctx);
        drain_pace(&mut s, &mut ctx);

        s.on_ack(&mut ctx, Ack::new(2));
        s.on_ack(&mut ctx, Ack::new(0));
        assert_eq!(s.base, 1);
        assert_eq!(s.timer_armed, Some(1));
    }

    #[test]
    fn duplicate_acks_do_not_disturb_state() {
        let mut s = sender(2, 2);
        let mut ctx = RecordingContext::new();
        s.init(&mut ctx);
        drain_pace(&mut s, &mut ctx);
        s.on_ack(&mut ctx, Ack::new(0));
        let base = s.base;
        s.on_ack(&mut ctx, Ack::new(0));
        assert_eq!(s.base, base);
    }

    #[test]
    fn receiver_buffers_ahead_and_drains_contiguously() {
        let mut r = SelectiveRepeatReceiver::new(&config(4, 4));
        let mut ctx = RecordingContext::new();

        r.on_frame(&mut ctx, Frame::new(1));
        r.on_frame(&mut ctx, Frame::new(2));
        assert!(ctx.delivered.is_empty());
        assert_eq!(ctx.events, vec![
            TraceEvent::FrameBuffered { seq: 1 },
            TraceEvent::FrameBuffered { seq: 2 },
        ]);
        assert_eq!(ctx.sent_acks(), vec![1, 2]);

        // The missing frame arrives: the whole run drains in one burst.
        r.on_frame(&mut ctx, Frame::new(0));
        assert_eq!(ctx.delivered, vec![0, 1, 2]);
        assert_eq!(ctx.sent_acks(), vec![1, 2, 0]);
        assert_eq!(r.expected, 3);
    }

    #[test]
    fn receiver_acks_duplicates_without_rebuffering() {
        let mut r = SelectiveRepeatReceiver::new(&config(3, 3));
        let mut ctx = RecordingContext::new();

        r.on_frame(&mut ctx, Frame::new(2));
        r.on_frame(&mut ctx, Frame::new(2)); // duplicate of a buffered frame
        assert_eq!(ctx.events.len(), 1, "buffered once");

        r.on_frame(&mut ctx, Frame::new(0));
        r.on_frame(&mut ctx, Frame::new(0)); // duplicate of a delivered frame
        assert_eq!(ctx.delivered, vec![0]);
        assert_eq!(ctx.sent_acks(), vec![2, 2, 0, 0]);
    }
}
