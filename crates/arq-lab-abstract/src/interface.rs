use crate::event::TraceEvent;
use crate::frame::{Ack, Frame, TransferUnit};

/// The capability the engine hands to a protocol state machine.
///
/// Actions are buffered for the duration of one callback and applied
/// afterwards, so a state machine never observes its own side effects
/// mid-callback.
pub trait LinkContext {
    /// Place a frame or acknowledgment on the channel.
    fn transmit(&mut self, unit: TransferUnit);

    /// Arm a timer. `timer_id` identifies it for later cancellation
    /// (protocols usually key it on a sequence number). Arming the same id
    /// twice leaves both registrations live; cancel first to replace one.
    fn start_timer(&mut self, delay_ms: u64, timer_id: u32);

    /// Cancel a timer. Cancellation before expiry guarantees the associated
    /// callback never fires.
    fn cancel_timer(&mut self, timer_id: u32);

    /// Hand a frame up to the receiving application, in order.
    fn deliver(&mut self, frame: &Frame);

    /// Publish an event on the presentation stream.
    fn emit(&mut self, event: TraceEvent);

    /// Current simulation time in ms.
    fn now(&self) -> u64;
}

/// Send-side half of an ARQ variant.
pub trait SenderProtocol {
    /// Called once when the run starts; typically emits the initial window
    /// and first transmissions.
    fn init(&mut self, _ctx: &mut dyn LinkContext) {}

    /// An acknowledgment arrived from the channel.
    fn on_ack(&mut self, ctx: &mut dyn LinkContext, ack: Ack);

    /// A timer armed by this sender expired (and was not cancelled).
    fn on_timer(&mut self, ctx: &mut dyn LinkContext, timer_id: u32);

    /// True once every frame has been delivered and acknowledged.
    fn is_complete(&self) -> bool;
}

/// Receive-side half of an ARQ variant.
pub trait ReceiverProtocol {
    fn init(&mut self, _ctx: &mut dyn LinkContext) {}

    /// A data frame arrived from the channel.
    fn on_frame(&mut self, ctx: &mut dyn LinkContext, frame: Frame);

    /// No receiver variant arms timers today; kept for symmetry.
    fn on_timer(&mut self, _ctx: &mut dyn LinkContext, _timer_id: u32) {}
}
