// ADB module - device boundary for the emulator
// Screen capture and synthetic pointer input go through the local ADB server;
// the automation only ever talks to the `AdbClient` trait.

pub mod error;
pub mod rust_impl;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-export the main types and functions for easy access
pub use error::{AdbError, AdbResult};
pub use rust_impl::RustAdb;
pub use types::{AdbClient, Device};
