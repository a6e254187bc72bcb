use crate::channel::Channel;
use crate::engine::Engine;
use crate::protocols;
use crate::trace::RunReport;
use arq_lab_abstract::{ConfigError, Protocol, RunConfig, TraceEvent};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    /// Every frame was delivered and acknowledged.
    Finished,
    /// The run was reset, or the stall guard tripped.
    Aborted,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("no active run")]
    NoActiveRun,
    #[error("loss target {seq} outside the valid range 0..{total}")]
    LossTargetOutOfRange { seq: u32, total: u32 },
}

struct ActiveRun {
    config: RunConfig,
    engine: Engine,
    /// Init is deferred to the first step so losses scheduled between
    /// `start` and the run cover the very first transmissions.
    initialized: bool,
    outcome: Option<RunOutcome>,
}

impl ActiveRun {
    fn report(&self) -> RunReport {
        RunReport {
            config: self.config.clone(),
            outcome: self.outcome.unwrap_or(RunOutcome::Aborted),
            duration_ms: self.engine.current_time(),
            delivered: self.engine.delivered().to_vec(),
            frame_transmissions: self.engine.frame_transmissions(),
            ack_count: self.engine.ack_count(),
            timeline: self.engine.timeline().to_vec(),
        }
    }
}

/// Owns the run lifecycle: selects the protocol pair, drives the engine's
/// run-to-completion loop, and reports the terminal status.
///
/// Per-run state (windows, ack records, buffers, loss schedule) lives inside
/// the engine and is created by [`Driver::start`]; [`Driver::reset`] drops it
/// wholesale, which also discards every queued timer and in-flight
/// transmission.
#[derive(Default)]
pub struct Driver {
    run: Option<ActiveRun>,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and set up a fresh run. An already-active
    /// run is aborted first. On error no state changes at all.
    pub fn start(&mut self, config: RunConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if self.run.is_some() {
            self.reset();
        }

        let (sender, receiver) = protocols::build_pair(&config);
        let channel = if config.protocol == Protocol::SlidingWindow {
            Channel::lossless(config.timing.transit_ms)
        } else {
            Channel::new(config.timing.transit_ms, config.channel)
        };

        let mut engine = Engine::new(channel, sender, receiver);
        engine.record(TraceEvent::StatusChanged {
            text: format!(
                "starting {}: {} frames, window {}",
                config.protocol,
                config.total_frames,
                config.effective_window()
            ),
        });
        if config.protocol == Protocol::SlidingWindow {
            // Pure flow control models an ideal link; tell the operator that
            // any loss injection will be ignored for this run.
            engine.record(TraceEvent::StatusChanged {
                text: "loss injection disabled for pure sliding window (flow control only)"
                    .to_string(),
            });
        }

        info!(protocol = %config.protocol, frames = config.total_frames, "run started");
        self.run = Some(ActiveRun {
            config,
            engine,
            initialized: false,
            outcome: None,
        });
        Ok(())
    }

    /// Schedule the next transmission of `seq` to be dropped. Rejected when
    /// no run is configured or the target is out of range; the loss table is
    /// untouched on error.
    pub fn schedule_loss(&mut self, seq: u32) -> Result<(), CommandError> {
        let run = self.run.as_mut().ok_or(CommandError::NoActiveRun)?;
        let total = run.config.total_frames;
        if seq >= total {
            return Err(CommandError::LossTargetOutOfRange { seq, total });
        }
        run.engine.schedule_loss(seq);
        run.engine.record(TraceEvent::StatusChanged {
            text: format!("loss scheduled for frame {seq}"),
        });
        Ok(())
    }

    /// Process one event. Returns false once the run has reached a terminal
    /// state (or none is active).
    pub fn step(&mut self) -> bool {
        let Some(run) = self.run.as_mut() else {
            return false;
        };
        if run.outcome.is_some() {
            return false;
        }
        if !run.initialized {
            run.engine.init();
            run.initialized = true;
            return true;
        }
        if run.engine.is_complete() {
            Self::finish(run);
            return false;
        }
        if run.engine.exhausted() || !run.engine.step() {
            run.engine.record(TraceEvent::StatusChanged {
                text: "run stalled before completion".to_string(),
            });
            run.engine.record(TraceEvent::RunAborted);
            run.outcome = Some(RunOutcome::Aborted);
            return false;
        }
        true
    }

    /// Drive the run to its terminal state and return the report.
    pub fn run_to_completion(&mut self) -> Result<RunReport, CommandError> {
        while self.step() {}
        let run = self.run.as_ref().ok_or(CommandError::NoActiveRun)?;
        Ok(run.report())
    }

    fn finish(run: &mut ActiveRun) {
        run.engine.record(TraceEvent::StatusChanged {
            text: "finished".to_string(),
        });
        run.engine.record(TraceEvent::RunFinished);
        run.outcome = Some(RunOutcome::Finished);
        info!(
            duration_ms = run.engine.current_time(),
            transmissions = run.engine.frame_transmissions(),
            "run finished"
        );
    }

    /// Abort any active run and return to the clean initial state. Dropping
    /// the engine discards the event queue, so every outstanding timer and
    /// in-flight task is cancelled as a unit. Idempotent.
    pub fn reset(&mut self) {
        if let Some(mut run) = self.run.take() {
            if run.outcome.is_none() {
                run.engine.record(TraceEvent::RunAborted);
                info!("run aborted by reset");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.run.as_ref().and_then(|run| run.outcome)
    }

    /// Report for the current run, if one is active.
    pub fn report(&self) -> Option<RunReport> {
        self.run.as_ref().map(|run| run.report())
    }
}
