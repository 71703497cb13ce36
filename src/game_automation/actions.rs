//! Scripted own-round sequences: play the hand, evolve, attack, forfeit

use super::gesture::{JITTER_PX, curved_drag, jitter};
use super::layout::{Layout, Point};
use super::match_image::{EvolutionButtons, ShieldScanner, ShieldTarget, Template, best_match};
use crate::adb::{AdbClient, AdbResult};
use crate::config::SlotDetection;
use image::{Rgb, RgbImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tokio::time::sleep;

const HAND_DRAG_DURATION: Duration = Duration::from_millis(50);
const HAND_DRAG_STEPS: u32 = 6;
const HAND_DRAG_GAP: Duration = Duration::from_millis(50);
const AFTER_HAND: Duration = Duration::from_millis(500);
const AFTER_ENERGY_TAP: Duration = Duration::from_millis(100);
const AFTER_HAND_EXPAND: Duration = Duration::from_millis(250);

const ATTACK_DRAG_DURATION: Duration = Duration::from_millis(50);
const ATTACK_DRAG_STEPS: u32 = 3;
const AFTER_LEADER_ATTACK: Duration = Duration::from_millis(30);
const AFTER_SHIELD_ATTACK: Duration = Duration::from_millis(2100);
const AFTER_ATTACKS: Duration = Duration::from_millis(250);
const AFTER_SEQUENCE: Duration = Duration::from_millis(100);

const AFTER_SLOT_TAP: Duration = Duration::from_millis(500);
const EVOLVE_ANIMATION: Duration = Duration::from_millis(6500);
const AFTER_PANEL_CLOSE: Duration = Duration::from_millis(100);

const FORFEIT_STEP: Duration = Duration::from_millis(500);
const AFTER_FORFEIT: Duration = Duration::from_secs(1);

/// Mean per-channel difference above which a slot counts as occupied
pub const SLOT_PRESENCE_THRESHOLD: f32 = 25.0;

/// Empty-board colours at a follower slot and just below it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotBaseline {
    pub top: Rgb<u8>,
    pub below: Rgb<u8>,
}

pub struct ActionSequences {
    layout: Layout,
    shields: ShieldScanner,
    evolution: EvolutionButtons,
    slot_detection: SlotDetection,
    rng: StdRng,
}

impl ActionSequences {
    pub fn new(
        layout: Layout,
        shields: ShieldScanner,
        evolution: EvolutionButtons,
        slot_detection: SlotDetection,
    ) -> Self {
        Self {
            layout,
            shields,
            evolution,
            slot_detection,
            rng: StdRng::from_entropy(),
        }
    }

    #[cfg(test)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Tap `point` offset by a couple of random pixels
    pub async fn tap_jittered<D: AdbClient>(&mut self, device: &D, point: Point) -> AdbResult<()> {
        let p = jitter(point, &mut self.rng, JITTER_PX);
        device.tap(p.x, p.y).await
    }

    /// Fresh frame scanned for the opponent's best shield; capture failure counts as no shield
    pub async fn scan_enemy_shield<D: AdbClient>(&self, device: &D) -> Option<ShieldTarget> {
        match device.screen_capture().await {
            Ok(frame) => self.shields.scan_enemy(&frame, self.layout.enemy_shield_area),
            Err(e) => {
                log::warn!("⚠️ Shield scan skipped: {}", e);
                None
            }
        }
    }

    /// Own-side shields in an already captured frame
    pub fn scan_own_shields(&self, frame: &RgbImage) -> Vec<ShieldTarget> {
        self.shields.scan_own(frame, self.layout.own_shield_area)
    }

    /// Sample the slot and probe colours of every follower slot
    pub fn capture_baseline(&self, frame: &RgbImage) -> Vec<SlotBaseline> {
        self.layout
            .follower_slots
            .iter()
            .map(|&slot| SlotBaseline {
                top: pixel_at(frame, slot),
                below: pixel_at(frame, self.layout.baseline_probe(slot)),
            })
            .collect()
    }

    /// A slot is occupied when either sample point drifted from the empty-board colour
    pub fn slot_occupied(&self, frame: &RgbImage, slot: Point, baseline: &SlotBaseline) -> bool {
        colour_distance(pixel_at(frame, slot), baseline.top) > SLOT_PRESENCE_THRESHOLD
            || colour_distance(pixel_at(frame, self.layout.baseline_probe(slot)), baseline.below)
                > SLOT_PRESENCE_THRESHOLD
    }

    // Slots to act from, in order; colour-baseline mode drops slots that look empty
    fn candidate_slots(
        &self,
        frame: Option<&RgbImage>,
        baseline: Option<&[SlotBaseline]>,
        right_to_left: bool,
    ) -> Vec<Point> {
        let mut slots: Vec<(Point, Option<&SlotBaseline>)> = self
            .layout
            .follower_slots
            .iter()
            .enumerate()
            .map(|(i, &p)| (p, baseline.and_then(|b| b.get(i))))
            .collect();
        if right_to_left {
            slots.reverse();
        }

        let use_colours = self.slot_detection == SlotDetection::ColorBaseline;
        match (use_colours, frame, baseline) {
            (true, Some(frame), Some(_)) => slots
                .into_iter()
                .filter(|(p, b)| b.is_some_and(|b| self.slot_occupied(frame, *p, b)))
                .map(|(p, _)| p)
                .collect(),
            _ => slots.into_iter().map(|(p, _)| p).collect(),
        }
    }

    /// Energy panel, expand the hand, then drag every hand position onto the board
    pub async fn play_hand<D: AdbClient>(&mut self, device: &D, round: u32) -> AdbResult<()> {
        device
            .tap(self.layout.energy_panel.x, self.layout.energy_panel.y)
            .await?;
        sleep(AFTER_ENERGY_TAP).await;
        device
            .tap(self.layout.hand_expand.x, self.layout.hand_expand.y)
            .await?;
        sleep(AFTER_HAND_EXPAND).await;

        let start_y = jitter(Point::new(0, self.layout.hand_start_y), &mut self.rng, JITTER_PX).y;
        let end_y = jitter(Point::new(0, self.layout.play_row_y), &mut self.rng, JITTER_PX).y;
        let order = self.layout.hand_order(round).to_vec();
        log::debug!("🃏 Playing hand, order {:?}", order);
        for x in order {
            let start = jitter(Point::new(x, start_y), &mut self.rng, JITTER_PX);
            let end = jitter(Point::new(x, end_y), &mut self.rng, JITTER_PX);
            curved_drag(
                device,
                Point::new(start.x, start_y),
                Point::new(end.x, end_y),
                HAND_DRAG_DURATION,
                HAND_DRAG_STEPS,
            )
            .await?;
            sleep(HAND_DRAG_GAP).await;
        }
        sleep(AFTER_HAND).await;
        Ok(())
    }

    /// Try each slot for an evolve button; returns whether one was pressed
    pub async fn evolve<D: AdbClient>(
        &mut self,
        device: &D,
        baseline: Option<&[SlotBaseline]>,
    ) -> AdbResult<bool> {
        // shielded opponent: evolve the right flank first
        let right_to_left = self.scan_enemy_shield(device).await.is_some();
        let board = match self.slot_detection {
            SlotDetection::ColorBaseline => device.screen_capture().await.ok(),
            SlotDetection::FullScan => None,
        };
        let slots = self.candidate_slots(board.as_ref(), baseline, right_to_left);

        for slot in slots {
            device.tap(slot.x, slot.y).await?;
            sleep(AFTER_SLOT_TAP).await;

            let frame = match device.screen_capture().await {
                Ok(frame) => image::imageops::grayscale(&frame),
                Err(e) => {
                    log::warn!("⚠️ No frame after tapping slot ({}, {}): {}", slot.x, slot.y, e);
                    continue;
                }
            };

            for button in [&self.evolution.super_evolve, &self.evolution.evolve]
                .into_iter()
                .flatten()
            {
                if let Some((x, y)) = pressable(&frame, button) {
                    device.tap(x, y).await?;
                    log::info!("✨ Pressed {} button", button.name);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Drag every follower at a shield if one is visible, otherwise at the enemy leader
    pub async fn attack<D: AdbClient>(
        &mut self,
        device: &D,
        frame: &RgbImage,
        baseline: Option<&[SlotBaseline]>,
    ) -> AdbResult<()> {
        let slots = self.candidate_slots(Some(frame), baseline, true);
        let mut board_clear = false;

        for slot in slots {
            let shield = if board_clear {
                None
            } else {
                self.scan_enemy_shield(device).await
            };

            let (target, settle) = match shield {
                Some(t) => {
                    log::info!("🛡️ Attacking shield at ({}, {})", t.x, t.y);
                    (Point::new(t.x, t.y), AFTER_SHIELD_ATTACK)
                }
                None => {
                    if !board_clear {
                        log::debug!("No shield, going face");
                    }
                    board_clear = true;
                    (self.layout.enemy_leader, AFTER_LEADER_ATTACK)
                }
            };
            curved_drag(device, slot, target, ATTACK_DRAG_DURATION, ATTACK_DRAG_STEPS).await?;
            sleep(settle).await;
        }
        sleep(AFTER_ATTACKS).await;
        Ok(())
    }

    pub async fn play_and_attack<D: AdbClient>(
        &mut self,
        device: &D,
        round: u32,
        baseline: Option<&[SlotBaseline]>,
    ) -> AdbResult<()> {
        self.play_hand(device, round).await?;
        self.attack_from_fresh_frame(device, baseline).await?;
        sleep(AFTER_SEQUENCE).await;
        Ok(())
    }

    pub async fn play_evolve_attack<D: AdbClient>(
        &mut self,
        device: &D,
        round: u32,
        baseline: Option<&[SlotBaseline]>,
    ) -> AdbResult<()> {
        self.play_hand(device, round).await?;
        if self.evolve(device, baseline).await? {
            sleep(EVOLVE_ANIMATION).await;
        }
        let close = self.layout.close_panel;
        self.tap_jittered(device, close).await?;
        sleep(AFTER_PANEL_CLOSE).await;
        self.attack_from_fresh_frame(device, baseline).await?;
        sleep(AFTER_SEQUENCE).await;
        Ok(())
    }

    async fn attack_from_fresh_frame<D: AdbClient>(
        &mut self,
        device: &D,
        baseline: Option<&[SlotBaseline]>,
    ) -> AdbResult<()> {
        match device.screen_capture().await {
            Ok(frame) => self.attack(device, &frame, baseline).await,
            Err(e) => {
                log::error!("❌ No frame before attacking, skipping attacks: {}", e);
                Ok(())
            }
        }
    }

    /// Surrender through the menu
    pub async fn forfeit<D: AdbClient>(&mut self, device: &D) -> AdbResult<()> {
        for point in self.layout.forfeit_taps.clone() {
            sleep(FORFEIT_STEP).await;
            device.tap(point.x, point.y).await?;
        }
        sleep(AFTER_FORFEIT).await;
        Ok(())
    }
}

/// Centre of `button` when it clears its threshold in `frame`
fn pressable(frame: &image::GrayImage, button: &Template) -> Option<(u32, u32)> {
    let result = best_match(frame, Some(button));
    match result.location {
        Some((x, y)) if result.score >= button.threshold => Some(button.get_tap_coordinates(x, y)),
        _ => None,
    }
}

fn pixel_at(frame: &RgbImage, p: Point) -> Rgb<u8> {
    frame.get_pixel_checked(p.x, p.y).copied().unwrap_or(Rgb([0, 0, 0]))
}

fn colour_distance(a: Rgb<u8>, b: Rgb<u8>) -> f32 {
    let sum: u32 = a.0.iter().zip(b.0.iter()).map(|(x, y)| x.abs_diff(*y) as u32).sum();
    sum as f32 / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adb::mock::{PointerEvent, RecordingDevice};

    fn board() -> RgbImage {
        RgbImage::from_pixel(1280, 720, Rgb([40, 60, 40]))
    }

    fn sequences(detection: SlotDetection) -> ActionSequences {
        ActionSequences::new(
            Layout::default(),
            ShieldScanner::new(Vec::new()),
            EvolutionButtons::default(),
            detection,
        )
        .with_seed(11)
    }

    #[tokio::test(start_paused = true)]
    async fn test_forfeit_is_exactly_three_taps() {
        let device = RecordingDevice::with_fallback(board());
        let mut actions = sequences(SlotDetection::FullScan);

        actions.forfeit(&device).await.unwrap();

        assert_eq!(device.taps(), vec![(57, 63), (642, 148), (773, 560)]);
        assert_eq!(device.events().len(), 3, "No drags during forfeit");
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_hand_taps_twice_and_drags_nine_cards() {
        let device = RecordingDevice::with_fallback(board());
        let mut actions = sequences(SlotDetection::FullScan);

        actions.play_hand(&device, 2).await.unwrap();

        assert_eq!(device.taps(), vec![(1173, 500), (1049, 646)]);
        assert_eq!(device.count_downs(), 9);
        let first_down = device
            .events()
            .into_iter()
            .find_map(|e| match e {
                PointerEvent::Down(x, y) => Some((x, y)),
                _ => None,
            })
            .unwrap();
        assert!(first_down.0.abs_diff(405) <= 2, "Early order starts at the left card");
        assert!(first_down.1.abs_diff(672) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attack_without_shields_goes_face_right_to_left() {
        let device = RecordingDevice::with_fallback(board());
        let mut actions = sequences(SlotDetection::FullScan);

        actions.attack(&device, &board(), None).await.unwrap();

        let downs: Vec<(u32, u32)> = device
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PointerEvent::Down(x, y) => Some((x, y)),
                _ => None,
            })
            .collect();
        let ups: Vec<(u32, u32)> = device
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PointerEvent::Up(x, y) => Some((x, y)),
                _ => None,
            })
            .collect();
        assert_eq!(downs.len(), 9);
        assert_eq!(downs[0], (942, 398), "Rightmost slot attacks first");
        assert_eq!(downs[8], (310, 398));
        assert!(ups.iter().all(|&u| u == (646, 64)), "Every drag ends on the leader");
    }

    #[tokio::test(start_paused = true)]
    async fn test_evolve_without_buttons_tries_every_slot_left_to_right() {
        let device = RecordingDevice::with_fallback(board());
        let mut actions = sequences(SlotDetection::FullScan);

        let evolved = actions.evolve(&device, None).await.unwrap();

        assert!(!evolved);
        let taps = device.taps();
        assert_eq!(taps.len(), 9);
        assert_eq!(taps[0], (310, 398), "No enemy shield: start from the left");
    }

    #[tokio::test(start_paused = true)]
    async fn test_evolve_presses_button_and_stops() {
        let device = RecordingDevice::new();
        let mut frame = RgbImage::from_pixel(200, 120, Rgb([40, 60, 40]));
        for (x, y, p) in frame.enumerate_pixels_mut() {
            if (120..160).contains(&x) && (60..90).contains(&y) {
                *p = Rgb([(x * 7 % 255) as u8, (y * 13 % 255) as u8, ((x + y) % 255) as u8]);
            }
        }
        // shield scan frame, then the frame captured after the first slot tap
        device.push_frame(board());
        device.push_frame(frame.clone());
        let gray = image::imageops::grayscale(&frame);
        let button = image::imageops::crop_imm(&gray, 120, 60, 40, 30).to_image();
        let mut actions = ActionSequences::new(
            Layout::default(),
            ShieldScanner::new(Vec::new()),
            EvolutionButtons {
                evolve: Some(Template::new("evolution", "evolution", button, 0.90)),
                super_evolve: None,
            },
            SlotDetection::FullScan,
        );

        let evolved = actions.evolve(&device, None).await.unwrap();

        assert!(evolved);
        assert_eq!(device.taps(), vec![(310, 398), (140, 75)]);
    }

    #[test]
    fn test_slot_presence_against_baseline() {
        let actions = sequences(SlotDetection::ColorBaseline);
        let empty = board();
        let baseline = actions.capture_baseline(&empty);
        assert_eq!(baseline.len(), 9);

        let mut occupied = empty.clone();
        occupied.put_pixel(389, 418, Rgb([200, 200, 200]));

        let slot = actions.layout().follower_slots[1];
        assert!(actions.slot_occupied(&occupied, slot, &baseline[1]), "Probe point changed");
        assert!(!actions.slot_occupied(&empty, slot, &baseline[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_colour_baseline_only_attacks_from_occupied_slots() {
        let device = RecordingDevice::with_fallback(board());
        let mut actions = sequences(SlotDetection::ColorBaseline);
        let baseline = actions.capture_baseline(&board());
        let mut frame = board();
        frame.put_pixel(468, 398, Rgb([250, 10, 10]));

        actions.attack(&device, &frame, Some(&baseline)).await.unwrap();

        assert_eq!(device.count_downs(), 1);
        assert_eq!(device.events()[0], PointerEvent::Down(468, 398));
    }
}
