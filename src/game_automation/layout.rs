//! Fixed screen coordinates for a 1280x720 landscape emulator.
//!
//! Every value can be overridden through the `layout` section of the config file.

use super::match_image::SearchRegion;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Point {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Follower slot centres on the own board, left to right
    pub follower_slots: Vec<Point>,
    /// Baseline probe sits this many pixels below each slot centre
    pub baseline_probe_offset: u32,
    pub enemy_shield_area: SearchRegion,
    pub own_shield_area: SearchRegion,
    pub enemy_leader: Point,
    pub energy_panel: Point,
    pub hand_expand: Point,
    pub close_panel: Point,
    pub daily_card_skip: Point,
    pub hand_start_y: u32,
    pub play_row_y: u32,
    /// Hand card x positions tried in the early rounds
    pub hand_order_early: Vec<u32>,
    /// Hand card x positions tried once the hand is expected to be full
    pub hand_order_late: Vec<u32>,
    pub late_hand_round: u32,
    /// Menu, confirm, then confirm again
    pub forfeit_taps: Vec<Point>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            follower_slots: [310, 389, 468, 547, 626, 705, 784, 863, 942]
                .into_iter()
                .map(|x| Point::new(x, 398))
                .collect(),
            baseline_probe_offset: 20,
            enemy_shield_area: SearchRegion::from_corners((247, 151), (1028, 312)),
            own_shield_area: SearchRegion::from_corners((254, 320), (1063, 484)),
            enemy_leader: Point::new(646, 64),
            energy_panel: Point::new(1173, 500),
            hand_expand: Point::new(1049, 646),
            close_panel: Point::new(1026, 178),
            daily_card_skip: Point::new(717, 80),
            hand_start_y: 672,
            play_row_y: 400,
            hand_order_early: vec![405, 501, 551, 600, 684, 700, 830, 900, 959],
            hand_order_late: vec![600, 700, 684, 551, 830, 501, 900, 405, 959],
            late_hand_round: 6,
            forfeit_taps: vec![Point::new(57, 63), Point::new(642, 148), Point::new(773, 560)],
        }
    }
}

impl Layout {
    /// Hand x positions for the given round
    pub fn hand_order(&self, round: u32) -> &[u32] {
        if round >= self.late_hand_round {
            &self.hand_order_late
        } else {
            &self.hand_order_early
        }
    }

    pub fn baseline_probe(&self, slot: Point) -> Point {
        Point::new(slot.x, slot.y + self.baseline_probe_offset)
    }
}
