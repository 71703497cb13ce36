//! Synthetic pointer gestures: curved drags and jittered taps

use super::layout::Point;
use crate::adb::{AdbClient, AdbResult};
use rand::Rng;
use std::time::Duration;

/// Exponent applied to the vertical progress of a drag
const CURVE_EXPONENT: f64 = 0.85;

/// Pixel spread for tap and drag jitter
pub const JITTER_PX: i32 = 2;

/// Intermediate points of a drag, one per step, ending exactly at `end`.
///
/// x advances linearly while y follows `t^0.85`, which bows the path like a thumb swipe.
pub fn curve_path(start: Point, end: Point, steps: u32) -> Vec<Point> {
    let steps = steps.max(1);
    let (sx, sy) = (start.x as f64, start.y as f64);
    let (dx, dy) = (end.x as f64 - sx, end.y as f64 - sy);
    (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let x = sx + dx * t;
            let y = sy + dy * t.powf(CURVE_EXPONENT);
            Point::new(x.max(0.0) as u32, y.max(0.0) as u32)
        })
        .collect()
}

/// Press at `start`, walk the curve in `steps` moves spread over `duration`, release at `end`
pub async fn curved_drag<D: AdbClient>(
    device: &D,
    start: Point,
    end: Point,
    duration: Duration,
    steps: u32,
) -> AdbResult<()> {
    let path = curve_path(start, end, steps);
    let step_delay = duration / path.len() as u32;

    device.touch_down(start.x, start.y).await?;
    for point in &path {
        device.touch_move(point.x, point.y).await?;
        tokio::time::sleep(step_delay).await;
    }
    device.touch_up(end.x, end.y).await
}

/// Offset both coordinates by up to `spread` pixels, never below zero
pub fn jitter<R: Rng>(point: Point, rng: &mut R, spread: i32) -> Point {
    Point::new(
        point.x.saturating_add_signed(rng.gen_range(-spread..=spread)),
        point.y.saturating_add_signed(rng.gen_range(-spread..=spread)),
    )
}
