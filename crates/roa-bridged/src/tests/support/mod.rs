//! Test harness utilities shared by the bridge's unit and behavioural suites.

mod config_loader;
mod fake_bird;
mod feed;
mod logs;
mod process_world;
mod reporter;

pub use config_loader::{FailingConfigLoader, IncompleteConfigLoader, TestConfigLoader};
pub use fake_bird::{FakeBird, FakeReply};
pub use feed::ScriptedFeedFactory;
pub use logs::CapturedLogs;
pub use process_world::{ProcessTestWorld, StepResult};
pub use reporter::{HealthEvent, RecordingHealthReporter};
