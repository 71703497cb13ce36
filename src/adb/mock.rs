// In-memory device for unit tests: replays queued frames and records every pointer event
use super::error::{AdbError, AdbResult};
use super::types::AdbClient;
use image::RgbImage;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Tap(u32, u32),
    Down(u32, u32),
    Move(u32, u32),
    Up(u32, u32),
}

pub struct RecordingDevice {
    events: Mutex<Vec<PointerEvent>>,
    frames: Mutex<VecDeque<RgbImage>>,
    fallback: Option<RgbImage>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            frames: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    /// Every capture without a queued frame returns a clone of `frame`
    pub fn with_fallback(frame: RgbImage) -> Self {
        Self {
            fallback: Some(frame),
            ..Self::new()
        }
    }

    pub fn push_frame(&self, frame: RgbImage) {
        self.frames.lock().unwrap().push_back(frame);
    }

    pub fn events(&self) -> Vec<PointerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn taps(&self) -> Vec<(u32, u32)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PointerEvent::Tap(x, y) => Some((x, y)),
                _ => None,
            })
            .collect()
    }

    pub fn count_downs(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PointerEvent::Down(..)))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn record(&self, event: PointerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl AdbClient for RecordingDevice {
    async fn screen_capture(&self) -> AdbResult<RgbImage> {
        if let Some(frame) = self.frames.lock().unwrap().pop_front() {
            return Ok(frame);
        }
        self.fallback.clone().ok_or(AdbError::CaptureFailed {
            description: "no frame queued".to_string(),
        })
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        self.record(PointerEvent::Tap(x, y));
        Ok(())
    }

    async fn touch_down(&self, x: u32, y: u32) -> AdbResult<()> {
        self.record(PointerEvent::Down(x, y));
        Ok(())
    }

    async fn touch_move(&self, x: u32, y: u32) -> AdbResult<()> {
        self.record(PointerEvent::Move(x, y));
        Ok(())
    }

    async fn touch_up(&self, x: u32, y: u32) -> AdbResult<()> {
        self.record(PointerEvent::Up(x, y));
        Ok(())
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (1280, 720)
    }

    fn device_name(&self) -> &str {
        "mock-emulator"
    }
}
