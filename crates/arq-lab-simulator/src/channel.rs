use arq_lab_abstract::ChannelConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use tracing::debug;

/// Sequence numbers scheduled to be dropped on their next transmission.
///
/// Entries have set semantics (re-scheduling an already-scheduled frame is a
/// no-op) and are deleted on first use: one `schedule` causes exactly one
/// drop, after which the frame travels normally unless re-armed. All
/// consume-on-first-use logic lives here so no protocol variant re-implements
/// it.
#[derive(Debug, Default)]
pub struct LossTable {
    scheduled: BTreeSet<u32>,
}

impl LossTable {
    /// Returns false when the entry was already present.
    pub fn schedule(&mut self, seq: u32) -> bool {
        self.scheduled.insert(seq)
    }

    /// Remove and report a pending entry for `seq`. Called exactly once per
    /// transmission of a data frame.
    pub fn consume_if_scheduled(&mut self, seq: u32) -> bool {
        self.scheduled.remove(&seq)
    }

    /// Drop all pending entries, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.scheduled.len();
        self.scheduled.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }
}

/// Fate of one unit placed on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitOutcome {
    /// Arrives at the peer after the full transit delay.
    Delivered { after_ms: u64 },
    /// Vanishes mid-channel after a partial transit delay.
    Dropped { after_ms: u64 },
}

/// The one bidirectional link between sender and receiver: fixed propagation
/// delay plus the loss model. Loss applies to data frames only; ACKs always
/// arrive.
pub struct Channel {
    transit_ms: u64,
    loss_enabled: bool,
    loss_rate: f64,
    rng: StdRng,
    loss_table: LossTable,
}

impl Channel {
    pub fn new(transit_ms: u64, config: ChannelConfig) -> Self {
        Self {
            transit_ms,
            loss_enabled: true,
            loss_rate: config.loss_rate,
            rng: StdRng::seed_from_u64(config.seed),
            loss_table: LossTable::default(),
        }
    }

    /// A channel that ignores scheduled and random loss alike. Used by the
    /// pure flow-control variant, which models an ideal link.
    pub fn lossless(transit_ms: u64) -> Self {
        let mut channel = Self::new(transit_ms, ChannelConfig::default());
        channel.loss_enabled = false;
        channel
    }

    pub fn loss_table_mut(&mut self) -> &mut LossTable {
        &mut self.loss_table
    }

    /// Decide the fate of a data frame entering the channel. Consumes a
    /// matching loss-table entry; otherwise rolls the random loss model.
    pub fn admit_frame(&mut self, seq: u32) -> TransitOutcome {
        if !self.loss_enabled {
            return TransitOutcome::Delivered {
                after_ms: self.transit_ms,
            };
        }
        if self.loss_table.consume_if_scheduled(seq) {
            debug!(seq, "dropping frame per loss schedule");
            return TransitOutcome::Dropped {
                after_ms: self.transit_ms / 2,
            };
        }
        if self.loss_rate > 0.0 && self.rng.random::<f64>() < self.loss_rate {
            debug!(seq, "dropping frame per random loss model");
            return TransitOutcome::Dropped {
                after_ms: self.transit_ms / 2,
            };
        }
        TransitOutcome::Delivered {
            after_ms: self.transit_ms,
        }
    }

    /// ACKs are never subject to loss in this model.
    pub fn admit_ack(&mut self) -> TransitOutcome {
        TransitOutcome::Delivered {
            after_ms: self.transit_ms,
        }
    }
}
