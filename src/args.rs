use std::env;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Run,
    Screenshot,
}

#[derive(Debug, PartialEq)]
pub struct Args {
    pub mode: Mode,
    pub debug_mode: bool,
    pub config_path: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn parse() -> Option<Self> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse flags (without the program name); prints help or version and returns `None` when done
    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Option<Self> {
        let mut mode = Mode::Run;
        let mut debug_mode = false;
        let mut config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        let mut log_file = None;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!("{}", version_line());
                return None;
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--screenshot" || arg == "-s" {
                mode = Mode::Screenshot;
            } else if let Some(path) = arg.strip_prefix("--config=") {
                if path.is_empty() {
                    eprintln!("❌ --config= needs a path");
                    return None;
                }
                config_path = PathBuf::from(path);
            } else if let Some(path) = arg.strip_prefix("--log-file=") {
                if path.is_empty() {
                    eprintln!("❌ --log-file= needs a path");
                    return None;
                }
                log_file = Some(PathBuf::from(path));
            } else {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            }
        }

        Some(Args {
            mode,
            debug_mode,
            config_path,
            log_file,
        })
    }
}

pub fn version_line() -> String {
    format!(
        "SV Autoplay v{} ({})",
        env!("APP_VERSION_DISPLAY"),
        env!("APP_BUILD_YEAR")
    )
}

fn print_help() {
    println!("🤖 SV Autoplay - card game autoplay over ADB");
    println!();
    println!("USAGE:");
    println!("    sv-autoplay [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    (no flags)          Connect to the emulator and start the automation loop");
    println!("    --screenshot, -s    Take a screenshot and save to file (cli-screenshot.png)");
    println!("    --config=PATH       Settings file (default: config.json, created if missing)");
    println!("    --log-file=PATH     Append log records to PATH instead of stderr");
    println!("    --debug             Enable debug output for automation");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("COMMANDS (while running):");
    println!("    p  pause    r  resume    s  statistics    e  exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Args> {
        Args::parse_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.mode, Mode::Run);
        assert!(!args.debug_mode);
        assert_eq!(args.config_path, PathBuf::from("config.json"));
        assert_eq!(args.log_file, None);
    }

    #[test]
    fn test_flags() {
        let args = parse(&["--debug", "-s", "--config=alt.json", "--log-file=run.log"]).unwrap();
        assert_eq!(args.mode, Mode::Screenshot);
        assert!(args.debug_mode);
        assert_eq!(args.config_path, PathBuf::from("alt.json"));
        assert_eq!(args.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn test_unknown_and_empty_values_stop() {
        assert!(parse(&["--gui"]).is_none());
        assert!(parse(&["--config="]).is_none());
    }
}
