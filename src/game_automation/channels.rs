// Communication channels for game automation
use super::types::{AutomationCommand, Notification};
use tokio::sync::mpsc;

/// Helper function to create automation channels
pub fn create_automation_channels() -> (
    mpsc::Sender<AutomationCommand>,
    mpsc::Receiver<AutomationCommand>,
    mpsc::Sender<Notification>,
    mpsc::Receiver<Notification>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (notify_tx, notify_rx) = mpsc::channel(32);
    (cmd_tx, cmd_rx, notify_tx, notify_rx)
}
