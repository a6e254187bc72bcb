use crate::channel::{Channel, TransitOutcome};
use arq_lab_abstract::{
    Frame, LinkContext, ReceiverProtocol, SenderProtocol, TimedEvent, TraceEvent, TransferUnit,
};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

/// Steps processed before a run is declared stalled. Far above anything a
/// legitimate run needs; bounds operator-driven retransmission loops.
const MAX_STEPS: u64 = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Sender,
    Receiver,
}

impl NodeId {
    pub fn peer(&self) -> Self {
        match self {
            NodeId::Sender => NodeId::Receiver,
            NodeId::Receiver => NodeId::Sender,
        }
    }
}

#[derive(Debug)]
enum EventKind {
    UnitArrival { to: NodeId, unit: TransferUnit },
    UnitDropped { seq: u32 },
    TimerExpiry { node: NodeId, timer_id: u32, generation: u64 },
}

#[derive(Debug)]
struct Event {
    time: u64,
    kind: EventKind,
    id: u64, // unique, differentiates events at the same time
}

// Custom Ord for min-heap behavior (smallest time pops first).
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Actions buffered during one protocol callback, applied afterwards.
#[derive(Default)]
struct ActionBuffer {
    outgoing: Vec<TransferUnit>,
    timers_start: Vec<(u64, u32)>,
    timers_cancel: Vec<u32>,
    delivered: Vec<u32>,
    events: Vec<TraceEvent>,
}

struct ScopedContext<'a> {
    buffer: &'a mut ActionBuffer,
    now: u64,
}

impl LinkContext for ScopedContext<'_> {
    fn transmit(&mut self, unit: TransferUnit) {
        self.buffer.outgoing.push(unit);
    }

    fn start_timer(&mut self, delay_ms: u64, timer_id: u32) {
        self.buffer.timers_start.push((delay_ms, timer_id));
    }

    fn cancel_timer(&mut self, timer_id: u32) {
        self.buffer.timers_cancel.push(timer_id);
    }

    fn deliver(&mut self, frame: &Frame) {
        self.buffer
            .events
            .push(TraceEvent::FrameDeliveredToReceiver { seq: frame.seq });
        self.buffer.delivered.push(frame.seq);
    }

    fn emit(&mut self, event: TraceEvent) {
        self.buffer.events.push(event);
    }

    fn now(&self) -> u64 {
        self.now
    }
}

/// Discrete-event core: one logical timeline driving the sender and receiver
/// state machines over the channel.
///
/// Every suspension point of a frame's journey (transit, stagger pacing,
/// timeout waits) is an entry in the event queue, and every protocol callback
/// runs to completion against buffered actions, so updates to shared window
/// state are fully serialized. Dropping the engine discards the queue, which
/// cancels every outstanding timer and in-flight transmission at once.
pub struct Engine {
    time: u64,
    queue: BinaryHeap<Event>,
    event_id_counter: u64,
    steps: u64,

    channel: Channel,
    sender: Box<dyn SenderProtocol>,
    receiver: Box<dyn ReceiverProtocol>,

    /// Cancellation bookkeeping: an expiry whose recorded generation is
    /// behind the counter for its `(node, timer_id)` key has been cancelled.
    timer_generations: HashMap<(NodeId, u32), u64>,

    timeline: Vec<TimedEvent>,
    delivered: Vec<u32>,
    frame_transmissions: u32,
    ack_count: u32,
}

impl Engine {
    pub fn new(
        channel: Channel,
        sender: Box<dyn SenderProtocol>,
        receiver: Box<dyn ReceiverProtocol>,
    ) -> Self {
        Self {
            time: 0,
            queue: BinaryHeap::new(),
            event_id_counter: 0,
            steps: 0,
            channel,
            sender,
            receiver,
            timer_generations: HashMap::new(),
            timeline: Vec::new(),
            delivered: Vec::new(),
            frame_transmissions: 0,
            ack_count: 0,
        }
    }

    pub fn current_time(&self) -> u64 {
        self.time
    }

    pub fn timeline(&self) -> &[TimedEvent] {
        &self.timeline
    }

    pub fn delivered(&self) -> &[u32] {
        &self.delivered
    }

    pub fn frame_transmissions(&self) -> u32 {
        self.frame_transmissions
    }

    pub fn ack_count(&self) -> u32 {
        self.ack_count
    }

    pub fn is_complete(&self) -> bool {
        self.sender.is_complete()
    }

    pub fn exhausted(&self) -> bool {
        self.steps >= MAX_STEPS
    }

    pub fn schedule_loss(&mut self, seq: u32) -> bool {
        self.channel.loss_table_mut().schedule(seq)
    }

    /// Append an event to the presentation stream at the current time.
    pub fn record(&mut self, event: TraceEvent) {
        debug!(time = self.time, ?event, "trace");
        self.timeline.push(TimedEvent {
            time: self.time,
            event,
        });
    }

    fn push_event(&mut self, time: u64, kind: EventKind) {
        self.queue.push(Event {
            time,
            kind,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    /// Run both state machines' init callbacks.
    pub fn init(&mut self) {
        let mut buffer = ActionBuffer::default();
        {
            let mut ctx = ScopedContext {
                buffer: &mut buffer,
                now: self.time,
            };
            self.sender.init(&mut ctx);
        }
        self.process_actions(NodeId::Sender, buffer);

        let mut buffer = ActionBuffer::default();
        {
            let mut ctx = ScopedContext {
                buffer: &mut buffer,
                now: self.time,
            };
            self.receiver.init(&mut ctx);
        }
        self.process_actions(NodeId::Receiver, buffer);
    }

    /// Process the next event. Returns false once the queue is empty.
    pub fn step(&mut self) -> bool {
        let event = match self.queue.pop() {
            Some(e) => e,
            None => return false,
        };

        self.time = event.time;
        self.steps += 1;
        debug!(time = self.time, kind = ?event.kind, "processing event");

        match event.kind {
            EventKind::UnitArrival { to, unit } => match (to, unit) {
                (NodeId::Receiver, TransferUnit::Data(frame)) => {
                    self.record(TraceEvent::FrameDelivered { seq: frame.seq });
                    let mut buffer = ActionBuffer::default();
                    {
                        let mut ctx = ScopedContext {
                            buffer: &mut buffer,
                            now: self.time,
                        };
                        self.receiver.on_frame(&mut ctx, frame);
                    }
                    self.process_actions(NodeId::Receiver, buffer);
                }
                (NodeId::Sender, TransferUnit::Ack(ack)) => {
                    self.record(TraceEvent::AckReceived { seq: ack.seq });
                    let mut buffer = ActionBuffer::default();
                    {
                        let mut ctx = ScopedContext {
                            buffer: &mut buffer,
                            now: self.time,
                        };
                        self.sender.on_ack(&mut ctx, ack);
                    }
                    self.process_actions(NodeId::Sender, buffer);
                }
                (to, unit) => {
                    debug!(?to, ?unit, "ignoring unit arriving at the wrong endpoint");
                }
            },
            EventKind::UnitDropped { seq } => {
                self.record(TraceEvent::FrameLost { seq });
            }
            EventKind::TimerExpiry {
                node,
                timer_id,
                generation,
            } => {
                let key = (node, timer_id);
                match self.timer_generations.get(&key) {
                    Some(&current) if current == generation => {}
                    _ => {
                        // Cancelled or orphaned; the callback must not fire.
                        debug!(?node, timer_id, "skipping stale timer expiry");
                        return true;
                    }
                }

                let mut buffer = ActionBuffer::default();
                {
                    let mut ctx = ScopedContext {
                        buffer: &mut buffer,
                        now: self.time,
                    };
                    match node {
                        NodeId::Sender => self.sender.on_timer(&mut ctx, timer_id),
                        NodeId::Receiver => self.receiver.on_timer(&mut ctx, timer_id),
                    }
                }
                self.process_actions(node, buffer);
            }
        }
        true
    }

    fn process_actions(&mut self, source: NodeId, buffer: ActionBuffer) {
        for event in buffer.events {
            self.record(event);
        }

        self.delivered.extend(buffer.delivered);

        // Cancellation bumps the generation, invalidating queued expiries.
        for timer_id in buffer.timers_cancel {
            let generation = self.timer_generations.entry((source, timer_id)).or_insert(0);
            *generation += 1;
        }

        for (delay, timer_id) in buffer.timers_start {
            let generation = *self.timer_generations.entry((source, timer_id)).or_insert(0);
            self.push_event(
                self.time + delay,
                EventKind::TimerExpiry {
                    node: source,
                    timer_id,
                    generation,
                },
            );
        }

        for unit in buffer.outgoing {
            match unit {
                TransferUnit::Data(frame) => {
                    self.frame_transmissions += 1;
                    self.record(TraceEvent::FrameSent { seq: frame.seq });
                    match self.channel.admit_frame(frame.seq) {
                        TransitOutcome::Delivered { after_ms } => {
                            self.push_event(
                                self.time + after_ms,
                                EventKind::UnitArrival {
                                    to: NodeId::Receiver,
                                    unit: TransferUnit::Data(frame),
                                },
                            );
                        }
                        TransitOutcome::Dropped { after_ms } => {
                            self.push_event(
                                self.time + after_ms,
                                EventKind::UnitDropped { seq: frame.seq },
                            );
                        }
                    }
                }
                TransferUnit::Ack(ack) => {
                    self.ack_count += 1;
                    self.record(TraceEvent::AckSent { seq: ack.seq });
                    if let TransitOutcome::Delivered { after_ms } = self.channel.admit_ack() {
                        self.push_event(
                            self.time + after_ms,
                            EventKind::UnitArrival {
                                to: NodeId::Sender,
                                unit: TransferUnit::Ack(ack),
                            },
                        );
                    }
                }
            }
        }
    }
}
