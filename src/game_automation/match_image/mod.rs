//! Image matching for screen classification and shield detection
//!
//! Grayscale templates identify which screen is showing; colour patches locate
//! shielded followers inside the board bands.

pub mod detector;
pub mod region;
pub mod shield;
pub mod template;


// Re-export main types and functions
pub use detector::{Detection, MatchResult, best_match, classify, score_of};
pub use region::SearchRegion;
pub use shield::{ShieldScanner, ShieldTarget};
pub use template::{EvolutionButtons, Template, TemplateAction, TemplateRegistry};
