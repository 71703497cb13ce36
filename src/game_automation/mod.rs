// Game automation module
// Screen classification, turn policy and scripted actions for one emulator,
// driven by a single sequential loop.

pub mod actions;
pub mod channels;
pub mod fsm;
pub mod gesture;
pub mod layout;
pub mod match_image;
pub mod policy;
pub mod stats;
pub mod types;

// Re-export the main types and functions for easy access
pub use actions::ActionSequences;
pub use channels::create_automation_channels;
pub use fsm::GameAutomation;
pub use layout::{Layout, Point};
pub use match_image::{EvolutionButtons, ShieldScanner, TemplateRegistry};
pub use policy::TurnPolicy;
pub use stats::StatsRecorder;
pub use types::{AutomationCommand, Notification};
