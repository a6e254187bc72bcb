pub mod channel;
pub mod driver;
pub mod engine;
pub mod protocols;
pub mod scenario_runner;
pub mod trace;

pub use channel::{Channel, LossTable};
pub use driver::{CommandError, Driver, RunOutcome};
pub use engine::{Engine, NodeId};
pub use trace::RunReport;
