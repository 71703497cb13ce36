use thiserror::Error;

/// A specialized `Result` type for ADB operations.
pub type AdbResult<T> = Result<T, AdbError>;

/// The error type for all ADB-related operations.
#[derive(Debug, Error)]
pub enum AdbError {
    #[error("Failed to query the ADB server: {source}")]
    ServerUnavailable { source: adb_client::RustADBError },

    #[error("No devices found. Make sure the emulator is running and 'adb connect {address}' works.")]
    NoDevices { address: String },

    #[error("Failed to open device '{serial}': {source}")]
    ConnectionFailed {
        serial: String,
        source: adb_client::RustADBError,
    },

    #[error("Shell command '{command}' failed: {source}")]
    ShellCommandFailed {
        command: String,
        source: adb_client::RustADBError,
    },

    #[error("Task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },

    #[error("Could not parse screen size from 'wm size' output.")]
    ScreenSizeParseFailed,

    #[error("Screen capture failed: {description}")]
    CaptureFailed { description: String },

    #[error("Failed to decode screenshot: {source}")]
    ScreenshotDecodeFailed {
        #[from]
        source: image::ImageError,
    },

    #[error("Pointer coordinates are out of bounds: x={x}, y={y}")]
    OutOfBounds { x: u32, y: u32 },
}

impl AdbError {
    /// Errors that only cost the current frame; the loop retries on the next tick
    pub fn is_transient_capture(&self) -> bool {
        matches!(
            self,
            AdbError::CaptureFailed { .. } | AdbError::ScreenshotDecodeFailed { .. }
        )
    }
}
