//! Persistent per-match round statistics

use crate::error::{AutoError, AutoResult};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const RUN_ID_FORMAT: &str = "%Y%m%d%H%M%S";

/// One finished match as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: String,
    pub rounds: u32,
    pub duration: String,
    #[serde(default)]
    pub run_id: String,
}

impl MatchRecord {
    pub fn new(ended_at: DateTime<Local>, rounds: u32, elapsed: Duration, run_id: &str) -> Self {
        Self {
            date: ended_at.format(DATE_FORMAT).to_string(),
            rounds,
            duration: format_match_duration(elapsed),
            run_id: run_id.to_string(),
        }
    }
}

/// `{minutes}m{seconds}s`
pub fn format_match_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m{}s", secs / 60, secs % 60)
}

/// `{hours}h {minutes}m {seconds}s`
pub fn format_run_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Aggregates over the stored history
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    pub total_matches: usize,
    pub total_rounds: u32,
    pub average_rounds: f64,
    pub run_matches: usize,
    pub run_rounds: u32,
    pub run_average_rounds: f64,
    /// round count -> number of matches
    pub distribution: BTreeMap<u32, usize>,
    /// Up to five most recent records, oldest first, flagged when they belong to this run
    pub recent: Vec<(MatchRecord, bool)>,
}

pub struct StatsRecorder {
    path: PathBuf,
    history: Vec<MatchRecord>,
    run_id: String,
}

impl StatsRecorder {
    /// Load history from `path`; a missing file starts empty, an unreadable one is logged and starts empty
    pub fn load(path: &Path, run_id: &str) -> Self {
        let history = match Self::read_history(path) {
            Ok(history) => history,
            Err(e) => {
                log::error!("❌ {}", e);
                Vec::new()
            }
        };
        log::debug!("📊 Loaded {} match records from {}", history.len(), path.display());
        Self {
            path: path.to_path_buf(),
            history,
            run_id: run_id.to_string(),
        }
    }

    fn read_history(path: &Path) -> AutoResult<Vec<MatchRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(path).map_err(|source| AutoError::StatsIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| AutoError::StatsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Append a record and rewrite the file
    pub fn record(&mut self, record: MatchRecord) {
        log::info!("🏁 Match finished: {} rounds in {}", record.rounds, record.duration);
        self.history.push(record);
        if let Err(e) = self.save() {
            log::error!("❌ {}", e);
        }
    }

    pub fn save(&self) -> AutoResult<()> {
        let text =
            serde_json::to_string_pretty(&self.history).map_err(|source| AutoError::StatsParse {
                path: self.path.clone(),
                source,
            })?;
        std::fs::write(&self.path, text).map_err(|source| AutoError::StatsIo {
            path: self.path.clone(),
            source,
        })
    }

    pub fn history(&self) -> &[MatchRecord] {
        &self.history
    }

    pub fn summary(&self) -> StatsSummary {
        let total_matches = self.history.len();
        let total_rounds: u32 = self.history.iter().map(|m| m.rounds).sum();
        let in_run: Vec<&MatchRecord> = self
            .history
            .iter()
            .filter(|m| m.run_id == self.run_id)
            .collect();
        let run_rounds: u32 = in_run.iter().map(|m| m.rounds).sum();

        let mut distribution = BTreeMap::new();
        for m in &self.history {
            *distribution.entry(m.rounds).or_insert(0) += 1;
        }

        let recent = self.history[total_matches.saturating_sub(5)..]
            .iter()
            .map(|m| (m.clone(), m.run_id == self.run_id))
            .collect();

        StatsSummary {
            total_matches,
            total_rounds,
            average_rounds: average(total_rounds, total_matches),
            run_matches: in_run.len(),
            run_rounds,
            run_average_rounds: average(run_rounds, in_run.len()),
            distribution,
            recent,
        }
    }

    /// Print the full statistics block to the log
    pub fn log_report(&self) {
        if self.history.is_empty() {
            log::info!("📊 No match statistics yet");
            return;
        }
        let s = self.summary();
        log::info!("===== Match round statistics =====");
        log::info!("Total matches: {}", s.total_matches);
        log::info!("Total rounds: {}", s.total_rounds);
        log::info!("Average rounds per match: {:.1}", s.average_rounds);
        log::info!("===== This run =====");
        log::info!("Matches: {}", s.run_matches);
        log::info!("Rounds: {}", s.run_rounds);
        log::info!("Average rounds per match: {:.1}", s.run_average_rounds);
        log::info!("Round distribution:");
        for (rounds, count) in &s.distribution {
            let pct = *count as f64 / s.total_matches as f64 * 100.0;
            log::info!("  {} rounds: {} ({:.1}%)", rounds, count, pct);
        }
        log::info!("Last {} matches:", s.recent.len());
        for (m, this_run) in &s.recent {
            let marker = if *this_run { " (this run)" } else { "" };
            log::info!("  {} - {} rounds ({}){}", m.date, m.rounds, m.duration, marker);
        }
    }
}

fn average(total: u32, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
