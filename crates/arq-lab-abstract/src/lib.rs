pub mod config;
pub mod event;
pub mod frame;
pub mod interface;
pub mod scenario;

pub use config::{ChannelConfig, ConfigError, Protocol, RunConfig, TimingConfig};
pub use event::{TimedEvent, TraceEvent};
pub use frame::{Ack, Frame, TransferUnit};
pub use interface::{LinkContext, ReceiverProtocol, SenderProtocol};
pub use scenario::{RunOverride, ScenarioAction, ScenarioAssertion, TestScenario};
