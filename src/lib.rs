pub mod adb;
pub mod args;
pub mod config;
pub mod console;
pub mod error;
pub mod game_automation;

pub use adb::{AdbClient, RustAdb};
pub use config::Settings;
