//! Operator surface: console commands in, alert banners out

use crate::game_automation::{AutomationCommand, Notification};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Read commands from stdin until it closes or the loop stops listening
pub fn spawn_command_listener(cmd_tx: mpsc::Sender<AutomationCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("⚠️ Console read failed: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let Some(command) = AutomationCommand::parse(&line) else {
                log::warn!(
                    "Unknown command '{}'. Use 'p' pause, 'r' resume, 'e' exit or 's' stats",
                    line.trim()
                );
                continue;
            };
            let quit = command == AutomationCommand::Quit;
            if cmd_tx.send(command).await.is_err() || quit {
                break;
            }
        }
        log::debug!("Console listener stopped");
    })
}

/// Ctrl-C behaves like the exit command
pub fn spawn_ctrl_c(cmd_tx: mpsc::Sender<AutomationCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("🛑 Ctrl-C received, stopping after the current action");
            if cmd_tx.send(AutomationCommand::Quit).await.is_err() {
                log::warn!("⚠️ Automation loop already stopped");
            }
        }
    })
}

/// Queue an alert for the notifier; returns false (and logs) when the notifier is gone
pub async fn send_notification(
    notify_tx: &mpsc::Sender<Notification>,
    notification: Notification,
) -> bool {
    let title = notification.title.clone();
    if notify_tx.send(notification).await.is_err() {
        log::warn!("⚠️ Notifier is gone, '{}' alert only logged", title);
        return false;
    }
    true
}

/// Surface every notification as a highlighted log banner; ends when all senders are gone
pub fn spawn_notifier(mut notify_rx: mpsc::Receiver<Notification>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(note) = notify_rx.recv().await {
            log::warn!("🔔 ==================== {} ====================", note.title);
            for line in note.message.lines() {
                log::warn!("🔔 {}", line);
            }
        }
    })
}
