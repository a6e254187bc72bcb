use crate::config::{Protocol, RunConfig};
use serde::Deserialize;

/// A declarative end-to-end test case, loaded from TOML.
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    pub config: RunOverride,
    #[serde(default)]
    pub actions: Vec<ScenarioAction>,
    pub assertions: Vec<ScenarioAssertion>,
}

/// Run configuration as written in a scenario file: the protocol and sizes
/// are mandatory, timing and channel knobs fall back to defaults.
#[derive(Deserialize, Debug, Clone)]
pub struct RunOverride {
    pub protocol: Protocol,
    pub total_frames: u32,
    pub window_size: u32,
    pub transit_ms: Option<u64>,
    pub stagger_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub loss_rate: Option<f64>,
    pub seed: Option<u64>,
}

impl RunOverride {
    pub fn to_run_config(&self) -> RunConfig {
        let mut config = RunConfig::new(self.protocol, self.total_frames, self.window_size);
        if let Some(v) = self.transit_ms {
            config.timing.transit_ms = v;
        }
        if let Some(v) = self.stagger_ms {
            config.timing.stagger_ms = v;
        }
        if let Some(v) = self.timeout_ms {
            config.timing.timeout_ms = v;
        }
        if let Some(v) = self.loss_rate {
            config.channel.loss_rate = v;
        }
        if let Some(v) = self.seed {
            config.channel.seed = v;
        }
        config
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Schedule the next transmission of `seq` to be dropped.
    ScheduleLoss { seq: u32 },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAssertion {
    /// The receiver delivered exactly these sequence numbers, in this order.
    DeliveredOrder { seqs: Vec<u32> },
    /// Total data-frame transmissions (including retransmissions) in range.
    FrameTransmissions { min: u32, max: Option<u32> },
    /// The run finished within this much simulated time.
    MaxDuration { ms: u64 },
    /// The run reached its terminal state rather than aborting.
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_applies_optional_fields_only() {
        let ov = RunOverride {
            protocol: Protocol::GoBackN,
            total_frames: 4,
            window_size: 2,
            transit_ms: Some(80),
            stagger_ms: None,
            timeout_ms: None,
            loss_rate: None,
            seed: Some(7),
        };
        let config = ov.to_run_config();
        assert_eq!(config.timing.transit_ms, 80);
        assert_eq!(config.timing.stagger_ms, 20);
        assert_eq!(config.channel.seed, 7);
    }
}
