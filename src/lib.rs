// featverify - feature verification tracking
// Ties human checklists and machine checks to the content of the files behind each feature

pub mod cli;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod state;
pub mod ui;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use models::{Feature, VerificationDocument};
pub use state::{StateMachine, Store};
