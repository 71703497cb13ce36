use chrono::Local;
use std::fs::OpenOptions;
use std::net::Ipv4Addr;
use std::process;
use std::time::Duration;
use sv_autoplay::adb::{AdbClient, RustAdb};
use sv_autoplay::args::{Args, Mode, version_line};
use sv_autoplay::config::Settings;
use sv_autoplay::console;
use sv_autoplay::game_automation::{
    ActionSequences, EvolutionButtons, GameAutomation, Notification, ShieldScanner,
    StatsRecorder, TemplateRegistry, TurnPolicy, create_automation_channels,
};

fn main() {
    let Some(args) = Args::parse() else {
        return;
    };
    init_logging(&args);
    log::info!("🤖 {}", version_line());

    let settings = match Settings::load_or_create(&args.config_path) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("❌ {} (using defaults)", e);
            Settings::default()
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start async runtime: {e}");
            process::exit(1);
        }
    };
    let code = rt.block_on(async move {
        match args.mode {
            Mode::Screenshot => screenshot(&settings).await,
            Mode::Run => run(settings).await,
        }
    });
    // the console reader may still be parked on stdin
    rt.shutdown_timeout(Duration::from_millis(200));
    process::exit(code);
}

fn init_logging(args: &Args) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.debug_mode {
        builder.filter_module("sv_autoplay", log::LevelFilter::Debug);
    }
    builder.format_timestamp_secs();
    if let Some(path) = &args.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("❌ Cannot open log file {}: {e}, logging to stderr", path.display())
            }
        }
    }
    builder.init();
}

async fn screenshot(settings: &Settings) -> i32 {
    println!("📸 CLI screenshot...");
    let device = match RustAdb::connect(Ipv4Addr::LOCALHOST, settings.emulator_port).await {
        Ok(device) => device,
        Err(e) => {
            println!("❌ Open device error: {e}");
            return 1;
        }
    };
    let (sx, sy) = device.screen_dimensions();
    println!("📱 Device: {} size: {}x{}", device.device_name(), sx, sy);
    let started = std::time::Instant::now();
    match device.screen_capture_bytes().await {
        Ok(bytes) => {
            if let Err(e) = tokio::fs::write("cli-screenshot.png", &bytes).await {
                println!("❌ Write failed: {e}");
                return 1;
            }
            println!(
                "✅ Screenshot ({}ms) saved to cli-screenshot.png",
                started.elapsed().as_millis()
            );
            0
        }
        Err(e) => {
            println!("❌ Screenshot failed: {e}");
            1
        }
    }
}

async fn run(settings: Settings) -> i32 {
    let (cmd_tx, cmd_rx, notify_tx, notify_rx) = create_automation_channels();
    let notifier = console::spawn_notifier(notify_rx);

    let device = match RustAdb::connect(Ipv4Addr::LOCALHOST, settings.emulator_port).await {
        Ok(device) => device,
        Err(e) => {
            log::error!("❌ Device connection failed: {}", e);
            let notification = Notification::new(
                "Device connection failed",
                format!(
                    "{e}\nCheck that the emulator is running on port {}.",
                    settings.emulator_port
                ),
            );
            console::send_notification(&notify_tx, notification).await;
            drop(notify_tx);
            let _ = notifier.await;
            return 1;
        }
    };

    let mut registry = TemplateRegistry::load(&settings.templates_dir);
    registry.merge_extra_dir(&settings.extra_templates_dir, settings.evolution_threshold);
    let actions = ActionSequences::new(
        settings.layout.clone(),
        ShieldScanner::load(&settings.shield_dir),
        EvolutionButtons::load(&settings.templates_dir),
        settings.slot_detection,
    );
    let policy = TurnPolicy::new(Local::now());
    let stats = StatsRecorder::load(&settings.stats_file, &policy.session().run_id());

    console::spawn_command_listener(cmd_tx.clone());
    console::spawn_ctrl_c(cmd_tx);
    log::info!("⌨️ Commands: 'p' pause, 'r' resume, 's' statistics, 'e' exit");

    let mut automation = GameAutomation::new(
        device,
        registry,
        actions,
        policy,
        stats,
        settings.scan_interval(),
        cmd_rx,
        notify_tx,
    );
    automation.run().await;
    0
}
