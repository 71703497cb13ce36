// Types and enums for game automation

/// Operator commands, from the console or the Ctrl-C handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationCommand {
    Pause,
    Resume,
    Quit,
    ShowStats,
}

impl AutomationCommand {
    /// Console shortcut letters: `p`, `r`, `e`, `s`
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(AutomationCommand::Pause),
            "r" | "resume" => Some(AutomationCommand::Resume),
            "e" | "q" | "exit" | "quit" => Some(AutomationCommand::Quit),
            "s" | "stats" => Some(AutomationCommand::ShowStats),
            _ => None,
        }
    }
}

/// Alert the operator has to see
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_console_letters() {
        assert_eq!(AutomationCommand::parse("p"), Some(AutomationCommand::Pause));
        assert_eq!(AutomationCommand::parse(" R \n"), Some(AutomationCommand::Resume));
        assert_eq!(AutomationCommand::parse("e"), Some(AutomationCommand::Quit));
        assert_eq!(AutomationCommand::parse("s"), Some(AutomationCommand::ShowStats));
        assert_eq!(AutomationCommand::parse("x"), None);
        assert_eq!(AutomationCommand::parse(""), None);
    }
}
