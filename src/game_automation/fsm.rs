// Screen classifier loop: capture, classify, dispatch, sleep
use super::actions::ActionSequences;
use super::match_image::{TemplateAction, TemplateRegistry, classify, score_of};
use super::policy::{OwnRoundDecision, RoundPlan, TurnPolicy};
use super::stats::{DATE_FORMAT, StatsRecorder, format_run_duration};
use super::types::{AutomationCommand, Notification};
use crate::adb::{AdbClient, AdbResult};
use crate::console;
use chrono::Local;
use image::{GrayImage, RgbImage};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep};

const AFTER_TAP: Duration = Duration::from_millis(500);
const AFTER_ENEMY_ROUND: Duration = Duration::from_secs(1);
const PAUSED_POLL: Duration = Duration::from_secs(1);

pub struct GameAutomation<D: AdbClient> {
    device: D,
    registry: TemplateRegistry,
    actions: ActionSequences,
    policy: TurnPolicy,
    stats: StatsRecorder,
    scan_interval: Duration,
    command_rx: mpsc::Receiver<AutomationCommand>,
    notify_tx: mpsc::Sender<Notification>,
    // only used to keep repeated detections out of the info log
    last_detected: Option<String>,
    log_pause: bool,
}

impl<D: AdbClient> GameAutomation<D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: D,
        registry: TemplateRegistry,
        actions: ActionSequences,
        policy: TurnPolicy,
        stats: StatsRecorder,
        scan_interval: Duration,
        command_rx: mpsc::Receiver<AutomationCommand>,
        notify_tx: mpsc::Sender<Notification>,
    ) -> Self {
        Self {
            device,
            registry,
            actions,
            policy,
            stats,
            scan_interval,
            command_rx,
            notify_tx,
            last_detected: None,
            log_pause: true,
        }
    }

    pub fn policy(&self) -> &TurnPolicy {
        &self.policy
    }

    /// Run until a quit command arrives, then close out the match and print the summary
    pub async fn run(&mut self) {
        log::info!(
            "🎮 Automation loop started on {} (interval {:.1}s, {} templates)",
            self.device.device_name(),
            self.scan_interval.as_secs_f64(),
            self.registry.len()
        );
        self.detect_existing_match().await;

        while self.policy.is_running() {
            let tick_start = Instant::now();

            while let Ok(command) = self.command_rx.try_recv() {
                self.process_command(command);
            }
            if !self.policy.is_running() {
                break;
            }

            if self.policy.is_paused() {
                if self.log_pause {
                    log::info!("⏸️ Paused, enter 'r' to resume");
                    self.log_pause = false;
                }
                sleep(PAUSED_POLL).await;
                continue;
            }
            self.log_pause = true;

            let frame = match self.device.screen_capture().await {
                Ok(frame) => frame,
                Err(e) => {
                    if e.is_transient_capture() {
                        log::warn!("📸 Capture failed, retrying: {}", e);
                    } else {
                        log::error!("❌ Capture failed: {}", e);
                    }
                    sleep(self.scan_interval).await;
                    continue;
                }
            };

            if let Err(e) = self.tick(&frame).await {
                log::error!("❌ Action abandoned: {}", e);
            }

            sleep(self.scan_interval.saturating_sub(tick_start.elapsed())).await;
        }

        self.finish();
    }

    fn process_command(&mut self, command: AutomationCommand) {
        log::debug!("🤖 Processing automation command: {:?}", command);
        match command {
            AutomationCommand::Pause => {
                self.policy.pause();
                log::info!("⏸️ Automation paused");
            }
            AutomationCommand::Resume => {
                self.policy.resume();
                log::info!("▶️ Automation resumed");
            }
            AutomationCommand::Quit => {
                self.policy.quit();
                log::info!("🛑 Quit requested");
            }
            AutomationCommand::ShowStats => self.stats.log_report(),
        }
    }

    /// Classify one frame and act on the first confident template
    async fn tick(&mut self, frame: &RgbImage) -> AdbResult<()> {
        let gray = image::imageops::grayscale(frame);
        let Some(detection) = classify(&gray, &self.registry) else {
            return Ok(());
        };

        let repeated = self.last_detected.as_deref() == Some(detection.key.as_str());
        if repeated {
            log::debug!("🔎 {} again ({:.3})", detection.label, detection.score);
        } else {
            log::info!("🔎 Detected {} ({:.3})", detection.label, detection.score);
        }
        self.last_detected = Some(detection.key.clone());

        match detection.action {
            TemplateAction::EnemyRoundMarker => {
                self.policy.on_enemy_round();
                sleep(AFTER_ENEMY_ROUND).await;
                return Ok(());
            }
            TemplateAction::MatchStart => {
                if let Some(record) = self.policy.on_match_start(Local::now()) {
                    self.stats.record(record);
                }
            }
            TemplateAction::DailyCardSkip => {
                let skip = self.actions.layout().daily_card_skip;
                log::info!("🎁 Skipping daily card");
                self.device.tap(skip.x, skip.y).await?;
            }
            TemplateAction::OwnRoundTurn => {
                if self.policy.in_match() && self.own_round(frame).await? {
                    return Ok(());
                }
            }
            TemplateAction::GenericTap => {}
        }

        let (cx, cy) = detection.center();
        self.actions
            .tap_jittered(&self.device, (cx, cy).into())
            .await?;
        sleep(AFTER_TAP).await;
        Ok(())
    }

    /// Own round while in a match; returns true when paused for an own shield
    async fn own_round(&mut self, frame: &RgbImage) -> AdbResult<bool> {
        log::info!("🕹️ Own round (round {})", self.policy.round());
        if self.policy.needs_baseline() {
            let baseline = self.actions.capture_baseline(frame);
            self.policy.store_baseline(baseline);
            log::info!("🎨 Board baseline colours captured");
        }

        let own_shields = self.actions.scan_own_shields(frame);
        match self.policy.on_own_round(&own_shields) {
            OwnRoundDecision::NotInMatch => Ok(false),
            OwnRoundDecision::PauseForShield(target) => {
                let notification = Notification::new(
                    "Own shield detected",
                    format!(
                        "Shielded follower on your board at ({}, {}), confidence {:.2}.\n\
                         Automation paused. Handle it manually, then enter 'r' to resume.",
                        target.x, target.y, target.confidence
                    ),
                );
                console::send_notification(&self.notify_tx, notification).await;
                Ok(true)
            }
            OwnRoundDecision::Play { round, plan } => {
                let baseline = self.policy.baseline().map(<[_]>::to_vec);
                let baseline = baseline.as_deref();
                match plan {
                    RoundPlan::PlayEvolveAttack => {
                        log::info!("✨ Round {}: play, evolve, attack", round);
                        self.actions
                            .play_evolve_attack(&self.device, round, baseline)
                            .await?;
                    }
                    RoundPlan::Forfeit => {
                        log::info!("🏳️ Round {}: past the limit, forfeiting", round);
                        self.actions.forfeit(&self.device).await?;
                    }
                    RoundPlan::PlayAndAttack => {
                        log::info!("🃏 Round {}: play and attack", round);
                        self.actions
                            .play_and_attack(&self.device, round, baseline)
                            .await?;
                    }
                }
                Ok(false)
            }
        }
    }

    /// Start-up probe: resume round counting if a match is already on screen
    async fn detect_existing_match(&mut self) {
        let frame = match self.device.screen_capture().await {
            Ok(frame) => image::imageops::grayscale(&frame),
            Err(e) => {
                log::warn!("⚠️ Start-up match probe skipped: {}", e);
                return;
            }
        };

        let round = if self.confident(&frame, "end_round") || self.confident(&frame, "enemy_round")
        {
            Some(2)
        } else if self.confident(&frame, "decision") {
            Some(1)
        } else {
            None
        };
        if let Some(round) = round {
            self.policy.resume_existing(round, Local::now());
        }
    }

    fn confident(&self, frame: &GrayImage, key: &str) -> bool {
        let Some(template) = self.registry.get(key) else {
            return false;
        };
        score_of(frame, &self.registry, key).score >= template.threshold
    }

    /// Close out any running match, persist history and print the reports
    fn finish(&mut self) {
        let now = Local::now();
        match self.policy.close_match(now) {
            Some(record) => self.stats.record(record),
            None => {
                if let Err(e) = self.stats.save() {
                    log::error!("❌ {}", e);
                }
            }
        }
        self.stats.log_report();

        let session = self.policy.session();
        let run_time = (now - session.started_at).to_std().unwrap_or_default();
        log::info!("===== Run summary =====");
        log::info!("Started: {}", session.started_at.format(DATE_FORMAT));
        log::info!("Run time: {}", format_run_duration(run_time));
        log::info!("Matches this run: {}", session.matches_played);
        log::info!("🎮 Automation loop ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adb::mock::RecordingDevice;
    use crate::config::SlotDetection;
    use crate::game_automation::channels::create_automation_channels;
    use crate::game_automation::layout::Layout;
    use crate::game_automation::match_image::{
        EvolutionButtons, SearchRegion, ShieldScanner, Template,
    };
    use crate::game_automation::policy::TurnState;
    use image::Rgb;
    use tempfile::TempDir;

    const W: u32 = 120;
    const H: u32 = 80;

    fn bit(x: u32, y: u32, seed: u32) -> u8 {
        let mut h = x.wrapping_mul(2654435761)
            ^ y.wrapping_mul(2246822519)
            ^ seed.wrapping_mul(3266489917);
        h = (h ^ (h >> 13)).wrapping_mul(1274126177);
        if h >> 31 == 1 { 255 } else { 0 }
    }

    // Dark screen with one high-contrast 16x12 "button" at a key-specific spot
    fn screen(key: &str) -> RgbImage {
        let (seed, bx, by) = button_spec(key);
        RgbImage::from_fn(W, H, |x, y| {
            if (bx..bx + 16).contains(&x) && (by..by + 12).contains(&y) {
                let v = bit(x, y, seed);
                Rgb([v, v, v])
            } else {
                Rgb([10, 10, 10])
            }
        })
    }

    fn button_spec(key: &str) -> (u32, u32, u32) {
        match key {
            "war" => (1, 10, 10),
            "end_round" => (2, 60, 30),
            "enemy_round" => (3, 30, 55),
            _ => unreachable!(),
        }
    }

    fn template(key: &str) -> Template {
        let (_, bx, by) = button_spec(key);
        let gray = image::imageops::grayscale(&screen(key));
        let patch = image::imageops::crop_imm(&gray, bx, by, 16, 12).to_image();
        Template::new(key, key, patch, 0.85)
    }

    fn shield_patch() -> RgbImage {
        RgbImage::from_fn(6, 6, |x, y| {
            Rgb([
                (x * 40 + 10) as u8,
                (y * 35 + 20) as u8,
                ((x + y) * 20 + 30) as u8,
            ])
        })
    }

    struct Harness {
        automation: GameAutomation<RecordingDevice>,
        notify_rx: mpsc::Receiver<Notification>,
        cmd_tx: mpsc::Sender<AutomationCommand>,
        dir: TempDir,
    }

    fn harness(shields: Vec<RgbImage>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let (cmd_tx, cmd_rx, notify_tx, notify_rx) = create_automation_channels();
        let layout = Layout {
            own_shield_area: SearchRegion::new(80, 50, 40, 30),
            ..Layout::default()
        };
        let actions = ActionSequences::new(
            layout,
            ShieldScanner::new(shields),
            EvolutionButtons::default(),
            SlotDetection::FullScan,
        );
        let registry = TemplateRegistry::from_templates(vec![
            template("war"),
            template("end_round"),
            template("enemy_round"),
        ]);
        let policy = TurnPolicy::new(Local::now());
        let stats = StatsRecorder::load(&dir.path().join("stats.json"), &policy.session().run_id());
        let automation = GameAutomation::new(
            RecordingDevice::with_fallback(screen("enemy_round")),
            registry,
            actions,
            policy,
            stats,
            Duration::from_secs(2),
            cmd_rx,
            notify_tx,
        );
        Harness {
            automation,
            notify_rx,
            cmd_tx,
            dir,
        }
    }

    // ============================================================
    // DISPATCH
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_war_starts_match_and_taps_button() {
        let mut h = harness(Vec::new());

        h.automation.tick(&screen("war")).await.unwrap();

        assert!(h.automation.policy().in_match());
        assert_eq!(h.automation.policy().round(), 1);
        let taps = h.automation.device.taps();
        assert_eq!(taps.len(), 1);
        assert!(taps[0].0.abs_diff(18) <= 2 && taps[0].1.abs_diff(16) <= 2, "Tap near centre");
    }

    #[tokio::test(start_paused = true)]
    async fn test_enemy_round_does_not_tap() {
        let mut h = harness(Vec::new());

        h.automation.tick(&screen("enemy_round")).await.unwrap();

        assert!(h.automation.device.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_round_outside_match_is_just_tapped() {
        let mut h = harness(Vec::new());

        h.automation.tick(&screen("end_round")).await.unwrap();

        assert_eq!(h.automation.device.events().len(), 1, "Only the button tap");
        assert!(!h.automation.policy().in_match());
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_round_plays_then_ends_turn() {
        let mut h = harness(Vec::new());
        h.automation.tick(&screen("war")).await.unwrap();
        h.automation.device.clear();

        h.automation.tick(&screen("end_round")).await.unwrap();

        let device = &h.automation.device;
        assert_eq!(device.count_downs(), 18, "Nine hand drags and nine attacks");
        let last_tap = *device.taps().last().unwrap();
        assert!(last_tap.0.abs_diff(68) <= 2 && last_tap.1.abs_diff(36) <= 2, "End-turn tap last");
        assert_eq!(h.automation.policy().round(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_own_round_ticks_advance_once() {
        let mut h = harness(Vec::new());
        h.automation.tick(&screen("war")).await.unwrap();

        for _ in 0..3 {
            h.automation.tick(&screen("end_round")).await.unwrap();
        }
        assert_eq!(h.automation.policy().round(), 2);

        h.automation.tick(&screen("enemy_round")).await.unwrap();
        h.automation.tick(&screen("end_round")).await.unwrap();
        assert_eq!(h.automation.policy().round(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_past_limit_forfeits_then_ends_turn() {
        let mut h = harness(Vec::new());
        h.automation.policy.resume_existing(13, Local::now());

        h.automation.tick(&screen("end_round")).await.unwrap();

        let device = &h.automation.device;
        assert_eq!(device.count_downs(), 0, "No hand drags or attacks");
        let taps = device.taps();
        assert_eq!(taps.len(), 4, "Three forfeit taps plus the end-turn tap");
        assert_eq!(taps[..3], [(57, 63), (642, 148), (773, 560)]);
        assert!(taps[3].0.abs_diff(68) <= 2 && taps[3].1.abs_diff(36) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evolve_round_tries_every_slot_before_attacking() {
        let mut h = harness(Vec::new());
        h.automation.policy.resume_existing(4, Local::now());

        h.automation.tick(&screen("end_round")).await.unwrap();

        let device = &h.automation.device;
        assert_eq!(device.count_downs(), 18, "Nine hand drags and nine attacks");
        let taps = device.taps();
        // energy, hand expand, nine slot taps, close panel, end turn
        assert_eq!(taps.len(), 13);
        let slots: Vec<(u32, u32)> = h
            .automation
            .actions
            .layout()
            .follower_slots
            .iter()
            .map(|p| (p.x, p.y))
            .collect();
        assert_eq!(taps[2..11], slots[..]);
        assert_eq!(h.automation.policy().round(), 5);
    }

    // ============================================================
    // SAFETY PAUSE
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_own_shield_pauses_and_notifies() {
        let mut h = harness(vec![shield_patch()]);
        h.automation.tick(&screen("war")).await.unwrap();
        h.automation.device.clear();

        let mut frame = screen("end_round");
        image::imageops::replace(&mut frame, &shield_patch(), 95, 60);
        h.automation.tick(&frame).await.unwrap();

        assert!(h.automation.device.events().is_empty(), "No action while shielded");
        assert_eq!(h.automation.policy().state(), TurnState::PausedForShield);
        assert!(h.automation.policy().is_paused());
        assert_eq!(h.automation.policy().round(), 1);
        let note = h.notify_rx.try_recv().expect("Operator is notified");
        assert!(note.message.contains("(98, 63)"), "{}", note.message);
    }

    // ============================================================
    // MATCH CLOSE-OUT
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_new_match_persists_previous_record() {
        let mut h = harness(Vec::new());
        h.automation.tick(&screen("war")).await.unwrap();
        for _ in 0..4 {
            h.automation.tick(&screen("end_round")).await.unwrap();
            h.automation.tick(&screen("enemy_round")).await.unwrap();
        }
        assert_eq!(h.automation.policy().round(), 5);

        h.automation.tick(&screen("war")).await.unwrap();

        let reloaded = StatsRecorder::load(&h.dir.path().join("stats.json"), "x");
        assert_eq!(reloaded.history().len(), 1);
        assert_eq!(reloaded.history()[0].rounds, 5);
        assert_eq!(h.automation.policy().round(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_closes_match_on_shutdown() {
        let mut h = harness(Vec::new());
        h.cmd_tx.send(AutomationCommand::Quit).await.unwrap();

        // the fallback frame shows the enemy round, so the start-up probe enters a match
        h.automation.run().await;

        let reloaded = StatsRecorder::load(&h.dir.path().join("stats.json"), "x");
        assert_eq!(reloaded.history().len(), 1, "Running match recorded at shutdown");
        assert_eq!(reloaded.history()[0].rounds, 2);
        assert!(!h.automation.policy().in_match());
        assert!(h.automation.device.events().is_empty(), "Quit is seen before any tick");
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_probe_resumes_at_round_two() {
        let mut h = harness(Vec::new());

        h.automation.detect_existing_match().await;

        assert!(h.automation.policy().in_match());
        assert_eq!(h.automation.policy().round(), 2);
        assert_eq!(h.automation.policy().session().matches_played, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_probe_ignores_other_screens() {
        let mut h = harness(Vec::new());
        h.automation.device.push_frame(screen("war"));

        h.automation.detect_existing_match().await;

        assert!(!h.automation.policy().in_match());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_commands() {
        let mut h = harness(Vec::new());

        h.automation.process_command(AutomationCommand::Pause);
        assert!(h.automation.policy().is_paused());
        h.automation.process_command(AutomationCommand::Resume);
        assert!(!h.automation.policy().is_paused());
        h.automation.process_command(AutomationCommand::Quit);
        assert!(!h.automation.policy().is_running());
    }
}
