pub mod check_runner;
pub mod command_runner;
pub mod fixture;
pub mod run;

pub use check_runner::{CheckRunner, CheckStatus, ItemOutcome};
pub use command_runner::{CommandOutput, CommandRunner};
pub use fixture::{CommandProvisioner, ExistingFixture, Fixture, FixtureProvisioner};
pub use run::{ItemResult, Orchestrator, RunOptions, RunSummary, RunTarget};
