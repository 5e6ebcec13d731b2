pub mod config;
pub mod document;
pub mod feature;
pub mod machine;

pub use config::{get_actor_name, FeatverifyConfig, FixtureConfig};
pub use document::{Coverage, FeatureGroup, Statistics, VerificationDocument, UNCATEGORIZED};
pub use feature::{ChecklistItem, Feature, HistoryAction, HistoryEntry, CHECKLIST_ACTOR};
pub use machine::{Depth, MachineCommand, MachineSpec, MachineState};
