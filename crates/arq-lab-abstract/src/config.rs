use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The ARQ variant a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    StopAndWait,
    SlidingWindow,
    GoBackN,
    SelectiveRepeat,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::StopAndWait => "stop-and-wait",
            Protocol::SlidingWindow => "sliding-window",
            Protocol::GoBackN => "go-back-n",
            Protocol::SelectiveRepeat => "selective-repeat",
        };
        f.write_str(name)
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop-and-wait" => Ok(Protocol::StopAndWait),
            "sliding-window" => Ok(Protocol::SlidingWindow),
            "go-back-n" => Ok(Protocol::GoBackN),
            "selective-repeat" => Ok(Protocol::SelectiveRepeat),
            other => Err(ConfigError::UnknownProtocol(other.to_string())),
        }
    }
}

/// Simulated-time parameters, all in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Full one-way transit time of the channel.
    pub transit_ms: u64,
    /// Pause between successive sends of a windowed batch.
    pub stagger_ms: u64,
    /// Retransmission timeout. Must exceed one round trip to be useful.
    pub timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            transit_ms: 100,
            stagger_ms: 20,
            timeout_ms: 450,
        }
    }
}

/// Channel fault model. Scheduled (deterministic) loss lives in the loss
/// table; this adds an optional seeded random loss on top.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub loss_rate: f64,
    pub seed: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            seed: 0,
        }
    }
}

/// Immutable per-run configuration, validated by the driver at `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub protocol: Protocol,
    pub total_frames: u32,
    pub window_size: u32,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

impl RunConfig {
    pub fn new(protocol: Protocol, total_frames: u32, window_size: u32) -> Self {
        Self {
            protocol,
            total_frames,
            window_size,
            timing: TimingConfig::default(),
            channel: ChannelConfig::default(),
        }
    }

    /// Stop-and-Wait always runs with a window of exactly one frame.
    pub fn effective_window(&self) -> u32 {
        match self.protocol {
            Protocol::StopAndWait => 1,
            _ => self.window_size,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_frames == 0 {
            return Err(ConfigError::ZeroFrames);
        }
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !(0.0..=1.0).contains(&self.channel.loss_rate) {
            return Err(ConfigError::LossRateOutOfRange(self.channel.loss_rate));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("frame count must be a positive integer")]
    ZeroFrames,
    #[error("window size must be a positive integer")]
    ZeroWindow,
    #[error("loss rate must lie within 0.0..=1.0, got {0}")]
    LossRateOutOfRange(f64),
    #[error(
        "unknown protocol {0:?}; expected stop-and-wait, sliding-window, go-back-n or selective-repeat"
    )]
    UnknownProtocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_round_trips_through_str() {
        for name in [
            "stop-and-wait",
            "sliding-window",
            "go-back-n",
            "selective-repeat",
        ] {
            let p: Protocol = name.parse().unwrap();
            assert_eq!(p.to_string(), name);
        }
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        let err = "tcp-reno".parse::<Protocol>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProtocol(_)));
    }

    #[test]
    fn validation_rejects_degenerate_configs() {
        let mut cfg = RunConfig::new(Protocol::GoBackN, 0, 4);
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroFrames)));

        cfg.total_frames = 4;
        cfg.window_size = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroWindow)));

        cfg.window_size = 2;
        cfg.channel.loss_rate = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::LossRateOutOfRange(_))
        ));

        cfg.channel.loss_rate = 0.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn stop_and_wait_window_is_pinned_to_one() {
        let cfg = RunConfig::new(Protocol::StopAndWait, 5, 8);
        assert_eq!(cfg.effective_window(), 1);
        let cfg = RunConfig::new(Protocol::SelectiveRepeat, 5, 8);
        assert_eq!(cfg.effective_window(), 8);
    }
}
