//! Pure sliding-window flow control over an ideal (lossless) link.
//!
//! The driver builds this variant on a lossless channel, so there is no
//! retransmission machinery at all: the only timer is the send pacer.

use super::{PACE_TIMER, window_upper};
use arq_lab_abstract::{
    Ack, Frame, LinkContext, ReceiverProtocol, RunConfig, SenderProtocol, TraceEvent, TransferUnit,
};

pub struct SlidingWindowSender {
    total: u32,
    window: u32,
    base: u32,
    next_seq: u32,
    stagger_ms: u64,
    pace_pending: bool,
}

impl SlidingWindowSender {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            total: config.total_frames,
            window: config.effective_window(),
            base: 0,
            next_seq: 0,
            stagger_ms: config.timing.stagger_ms,
            pace_pending: false,
        }
    }

    fn upper(&self) -> u32 {
        window_upper(self.base, self.window, self.total)
    }

    /// Send at most one frame, then pace the rest of the window.
    fn pump(&mut self, ctx: &mut dyn LinkContext) {
        if self.pace_pending || self.next_seq >= self.upper() {
            return;
        }
        ctx.transmit(TransferUnit::Data(Frame::new(self.next_seq)));
        self.next_seq += 1;
        if self.next_seq < self.upper() {
            ctx.start_timer(self.stagger_ms, PACE_TIMER);
            self.pace_pending = true;
        }
    }
}

impl SenderProtocol for SlidingWindowSender {
    fn init(&mut self, ctx: &mut dyn LinkContext) {
        ctx.emit(TraceEvent::WindowChanged {
            base: 0,
            upper: self.upper(),
        });
        self.pump(ctx);
    }

    fn on_ack(&mut self, ctx: &mut dyn LinkContext, ack: Ack) {
        // Strict in-order slide: frames always arrive in order on the ideal
        // link, so only the ACK matching the base moves the window.
        if ack.seq != self.base {
            return;
        }
        self.base += 1;
        ctx.emit(TraceEvent::WindowChanged {
            base: self.base,
            upper: self.upper(),
        });
        self.pump(ctx);
    }

    fn on_timer(&mut self, ctx: &mut dyn LinkContext, timer_id: u32) {
        if timer_id == PACE_TIMER {
            self.pace_pending = false;
            self.pump(ctx);
        }
    }

    fn is_complete(&self) -> bool {
        self.base >= self.total
    }
}

pub struct SlidingWindowReceiver {
    expected: u32,
}

impl SlidingWindowReceiver {
    pub fn new() -> Self {
        Self { expected: 0 }
    }
}

impl Default for SlidingWindowReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverProtocol for SlidingWindowReceiver {
    fn on_frame(&mut self, ctx: &mut dyn LinkContext, frame: Frame) {
        if frame.seq == self.expected {
            ctx.deliver(&frame);
            self.expected += 1;
            ctx.transmit(TransferUnit::Ack(Ack::new(frame.seq)));
        } else {
            // Unreachable on the ideal link; refuse rather than reorder.
            ctx.emit(TraceEvent::FrameDiscarded {
                seq: frame.seq,
                expected: self.expected,
            });
        }
    }
}
