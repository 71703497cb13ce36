// Core ADB types and traits
use super::error::AdbResult;
use image::RgbImage;
use serde::Serialize;

// Trait defining what the automation needs from a device: frames in, pointer events out.
// Every call is awaited to completion; there is no timeout or retry at this layer.
#[allow(async_fn_in_trait)]
pub trait AdbClient: Send + Sync {
    /// Capture one full-resolution color frame
    async fn screen_capture(&self) -> AdbResult<RgbImage>;

    /// Single down+up at integer pixel coordinates
    async fn tap(&self, x: u32, y: u32) -> AdbResult<()>;

    async fn touch_down(&self, x: u32, y: u32) -> AdbResult<()>;
    async fn touch_move(&self, x: u32, y: u32) -> AdbResult<()>;
    async fn touch_up(&self, x: u32, y: u32) -> AdbResult<()>;

    fn screen_dimensions(&self) -> (u32, u32);
    fn device_name(&self) -> &str;
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct Device {
    pub name: String,
    pub state: String,
}
