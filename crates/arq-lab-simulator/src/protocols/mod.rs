mod go_back_n;
mod selective_repeat;
mod sliding_window;
mod stop_and_wait;

pub use go_back_n::{GoBackNReceiver, GoBackNSender};
pub use selective_repeat::{SelectiveRepeatReceiver, SelectiveRepeatSender};
pub use sliding_window::{SlidingWindowReceiver, SlidingWindowSender};
pub use stop_and_wait::{StopAndWaitReceiver, StopAndWaitSender};

use arq_lab_abstract::{Protocol, ReceiverProtocol, RunConfig, SenderProtocol};

/// Timer id reserved for pacing successive sends of a windowed batch.
/// Retransmit timers use the sequence number they guard, so this sits far
/// outside any realistic frame range.
pub(crate) const PACE_TIMER: u32 = u32::MAX;

/// Exclusive upper bound of the send window, clamped to the frame count.
pub(crate) fn window_upper(base: u32, window: u32, total: u32) -> u32 {
    base.saturating_add(window).min(total)
}

/// In-memory `LinkContext` for driving a state machine directly in tests.
#[cfg(test)]
pub(crate) mod testing {
    use arq_lab_abstract::{Frame, LinkContext, TraceEvent, TransferUnit};

    #[derive(Default)]
    pub struct RecordingContext {
        pub out: Vec<TransferUnit>,
        pub timers: Vec<(u64, u32)>,
        pub cancelled: Vec<u32>,
        pub delivered: Vec<u32>,
        pub events: Vec<TraceEvent>,
    }

    impl RecordingContext {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sequence numbers of transmitted data frames, in order.
        pub fn sent_frames(&self) -> Vec<u32> {
            self.out
                .iter()
                .filter(|u| u.is_data())
                .map(|u| u.seq())
                .collect()
        }

        /// Sequence numbers of transmitted ACKs, in order.
        pub fn sent_acks(&self) -> Vec<u32> {
            self.out
                .iter()
                .filter(|u| !u.is_data())
                .map(|u| u.seq())
                .collect()
        }
    }

    impl LinkContext for RecordingContext {
        fn transmit(&mut self, unit: TransferUnit) {
            self.out.push(unit);
        }
        fn start_timer(&mut self, delay_ms: u64, timer_id: u32) {
            self.timers.push((delay_ms, timer_id));
        }
        fn cancel_timer(&mut self, timer_id: u32) {
            self.cancelled.push(timer_id);
        }
        fn deliver(&mut self, frame: &Frame) {
            self.delivered.push(frame.seq);
        }
        fn emit(&mut self, event: TraceEvent) {
            self.events.push(event);
        }
        fn now(&self) -> u64 {
            0
        }
    }
}

/// Instantiate the sender/receiver pair for a validated run configuration.
pub fn build_pair(config: &RunConfig) -> (Box<dyn SenderProtocol>, Box<dyn ReceiverProtocol>) {
    match config.protocol {
        Protocol::StopAndWait => (
            Box::new(StopAndWaitSender::new(config)),
            Box::new(StopAndWaitReceiver::new()),
        ),
        Protocol::SlidingWindow => (
            Box::new(SlidingWindowSender::new(config)),
            Box::new(SlidingWindowReceiver::new()),
        ),
        Protocol::GoBackN => (
            Box::new(GoBackNSender::new(config)),
            Box::new(GoBackNReceiver::new()),
        ),
        Protocol::SelectiveRepeat => (
            Box::new(SelectiveRepeatSender::new(config)),
            Box::new(SelectiveRepeatReceiver::new(config)),
        ),
    }
}
