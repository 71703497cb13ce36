// https://crates.io/crates/adb_client
use super::error::{AdbError, AdbResult};
use super::types::{AdbClient, Device};
use adb_client::{ADBDeviceExt, ADBServer, ADBServerDevice};
use image::RgbImage;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Device reached through the local ADB server (emulators expose a TCP serial like `127.0.0.1:16384`)
pub struct RustAdb {
    device: Device,
    server_device: Arc<Mutex<ADBServerDevice>>,
    screen_x: u32,
    screen_y: u32,
}

impl RustAdb {
    /// Connect to the emulator at `host:port`, falling back to the first listed device
    pub async fn connect(host: Ipv4Addr, port: u16) -> AdbResult<Self> {
        let address = SocketAddrV4::new(host, port);
        let target_serial = address.to_string();

        let mut devices = Self::list_devices().await?;
        if !devices.iter().any(|d| d.name == target_serial) {
            log::info!("🔌 Trying to connect emulator at {}...", target_serial);
            let connect = tokio::task::spawn_blocking(move || {
                let mut server = ADBServer::default();
                server.connect_device(address)
            })
            .await?;
            match connect {
                Ok(()) => {
                    // the server needs a moment before the new serial is listed
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    devices = Self::list_devices().await?;
                }
                Err(e) => log::warn!("⚠️ adb connect {} failed: {}", target_serial, e),
            }
        }

        let device = match devices.iter().find(|d| d.name == target_serial) {
            Some(found) => found.clone(),
            None => {
                let first = devices.into_iter().next().ok_or_else(|| AdbError::NoDevices {
                    address: target_serial.clone(),
                })?;
                log::warn!(
                    "⚠️ Configured emulator {} not found, using first device: {} [{}]",
                    target_serial,
                    first.name,
                    first.state
                );
                first
            }
        };

        let serial = device.name.clone();
        let server_device = tokio::task::spawn_blocking(move || {
            let mut server = ADBServer::default();
            server
                .get_device_by_name(&serial)
                .map_err(|source| AdbError::ConnectionFailed { serial, source })
        })
        .await??;

        let mut adb = RustAdb {
            device,
            server_device: Arc::new(Mutex::new(server_device)),
            screen_x: 0,
            screen_y: 0,
        };
        let output = adb.shell(&["wm", "size"]).await?;
        let (sx, sy) = Self::parse_screen_size(&String::from_utf8_lossy(&output))?;
        adb.screen_x = sx;
        adb.screen_y = sy;
        log::info!(
            "📱 Connected device: {} [{}] ({}x{})",
            adb.device.name,
            adb.device.state,
            sx,
            sy
        );
        Ok(adb)
    }

    pub async fn list_devices() -> AdbResult<Vec<Device>> {
        let result = tokio::task::spawn_blocking(|| {
            let mut server = ADBServer::default();
            server.devices()
        })
        .await?;
        let device_list = result.map_err(|source| AdbError::ServerUnavailable { source })?;
        Ok(device_list
            .into_iter()
            .map(|d| Device {
                name: d.identifier,
                state: d.state.to_string(),
            })
            .collect())
    }

    /// Parse `wm size` output; an override size wins over the physical one
    pub fn parse_screen_size(stdout: &str) -> AdbResult<(u32, u32)> {
        let mut physical = None;
        let mut overridden = None;
        for line in stdout.lines() {
            let line = line.trim();
            let (slot, size_str) = if let Some(rest) = line.strip_prefix("Physical size: ") {
                (&mut physical, rest)
            } else if let Some(rest) = line.strip_prefix("Override size: ") {
                (&mut overridden, rest)
            } else {
                continue;
            };
            let parts: Vec<&str> = size_str.trim().split('x').collect();
            if parts.len() == 2
                && let (Ok(x), Ok(y)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>())
            {
                *slot = Some((x, y));
            }
        }
        overridden.or(physical).ok_or(AdbError::ScreenSizeParseFailed)
    }

    /// Raw PNG bytes as produced by `screencap -p`
    pub async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        let bytes = self.shell(&["screencap", "-p"]).await?;
        if bytes.is_empty() {
            return Err(AdbError::CaptureFailed {
                description: "screencap returned no data".to_string(),
            });
        }
        Ok(bytes)
    }

    // Wrap the blocking shell_command in spawn_blocking so the runtime keeps ticking
    async fn shell(&self, args: &[&str]) -> AdbResult<Vec<u8>> {
        let server_device = Arc::clone(&self.server_device);
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        tokio::task::spawn_blocking(move || {
            let mut out: Vec<u8> = Vec::new();
            let mut dev = server_device.blocking_lock();
            let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
            dev.shell_command(&refs, &mut out)
                .map_err(|source| AdbError::ShellCommandFailed {
                    command: args.join(" "),
                    source,
                })?;
            Ok(out)
        })
        .await?
    }

    // `wm size` reports the natural orientation; landscape games rotate it, so bound by the long side
    fn check_bounds(&self, x: u32, y: u32) -> AdbResult<()> {
        let limit = self.screen_x.max(self.screen_y);
        if x > limit || y > limit {
            return Err(AdbError::OutOfBounds { x, y });
        }
        Ok(())
    }

    async fn motion_event(&self, action: &str, x: u32, y: u32) -> AdbResult<()> {
        self.check_bounds(x, y)?;
        let xs = x.to_string();
        let ys = y.to_string();
        self.shell(&["input", "motionevent", action, &xs, &ys])
            .await
            .map(|_| ())
    }
}

impl AdbClient for RustAdb {
    async fn screen_capture(&self) -> AdbResult<RgbImage> {
        let bytes = self.screen_capture_bytes().await?;
        let frame = image::load_from_memory(&bytes)?;
        Ok(frame.to_rgb8())
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        self.check_bounds(x, y)?;
        let xs = x.to_string();
        let ys = y.to_string();
        self.shell(&["input", "tap", &xs, &ys]).await.map(|_| ())
    }

    async fn touch_down(&self, x: u32, y: u32) -> AdbResult<()> {
        self.motion_event("DOWN", x, y).await
    }

    async fn touch_move(&self, x: u32, y: u32) -> AdbResult<()> {
        self.motion_event("MOVE", x, y).await
    }

    async fn touch_up(&self, x: u32, y: u32) -> AdbResult<()> {
        self.motion_event("UP", x, y).await
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }
}
