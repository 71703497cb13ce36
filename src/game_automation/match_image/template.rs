//! Template registry: the ordered list of screens the classifier knows about

use crate::error::{AutoError, AutoResult};
use image::GrayImage;
use std::path::{Path, PathBuf};

/// Default match threshold for the built-in screen templates
pub const DEFAULT_THRESHOLD: f32 = 0.85;

/// What the classifier does once a template is recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateAction {
    /// Tap the centre of the match
    GenericTap,
    /// Tap the fixed skip point, then the centre
    DailyCardSkip,
    /// A new match begins
    MatchStart,
    /// Our turn: run the round plan
    OwnRoundTurn,
    /// Opponent's turn: re-arm the round counter, no tap
    EnemyRoundMarker,
}

impl TemplateAction {
    pub fn for_key(key: &str) -> Self {
        match key {
            "war" => TemplateAction::MatchStart,
            "end_round" => TemplateAction::OwnRoundTurn,
            "enemy_round" => TemplateAction::EnemyRoundMarker,
            "dailyCard" => TemplateAction::DailyCardSkip,
            _ => TemplateAction::GenericTap,
        }
    }
}

/// Built-in templates in priority order: key, file name, label
const CANONICAL_TEMPLATES: &[(&str, &str, &str)] = &[
    ("dailyCard", "dailyCard.png", "daily card reward"),
    ("missionCompleted", "missionCompleted.png", "mission completed"),
    ("backTitle", "backTitle.png", "back to title"),
    ("errorBackMain", "errorBackMain.png", "error, back to main"),
    ("error_retry", "error_retry.png", "error, retry"),
    ("Ok", "Ok.png", "ok"),
    ("decision", "decision.png", "mulligan decision"),
    ("end_round", "end_round.png", "own round"),
    ("enemy_round", "enemy_round.png", "enemy round"),
    ("end", "end.png", "match end"),
    ("war", "war.png", "match start"),
    ("mainPage", "mainPage.png", "game main page"),
    ("MuMuPage", "MuMuPage.png", "emulator home"),
    ("LoginPage", "LoginPage.png", "login page"),
    ("enterGame", "enterGame.png", "enter game"),
    ("yes", "Yes.png", "confirm"),
    ("close1", "close1.png", "close dialog"),
    ("close2", "close2.png", "close dialog"),
    ("backMain", "backMain.png", "back to main"),
    ("rankUp", "rankUp.png", "rank up"),
    ("groupUp", "groupUp.png", "group up"),
    ("rank", "rank.png", "rank"),
];

#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub label: String,
    pub image: GrayImage,
    pub width: u32,
    pub height: u32,
    pub threshold: f32,
    pub action: TemplateAction,
}

impl Template {
    pub fn new(name: &str, label: &str, image: GrayImage, threshold: f32) -> Self {
        let (width, height) = image.dimensions();
        Self {
            name: name.to_string(),
            label: label.to_string(),
            action: TemplateAction::for_key(name),
            image,
            width,
            height,
            threshold,
        }
    }

    /// Load a template image from disk as grayscale
    pub fn open(name: &str, label: &str, path: &Path, threshold: f32) -> AutoResult<Self> {
        let image = image::open(path)
            .map_err(|source| AutoError::TemplateLoad {
                path: path.to_path_buf(),
                source,
            })?
            .to_luma8();
        Ok(Self::new(name, label, image, threshold))
    }

    /// Get the center tap coordinates for this template at a match location
    pub fn get_tap_coordinates(&self, match_x: u32, match_y: u32) -> (u32, u32) {
        (match_x + self.width / 2, match_y + self.height / 2)
    }
}

/// Ordered set of templates; earlier entries win when several match the same frame
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    pub fn from_templates(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    /// Load the built-in table from `dir`; missing or unreadable files are skipped with a warning
    pub fn load(dir: &Path) -> Self {
        let mut templates = Vec::new();
        for (key, file, label) in CANONICAL_TEMPLATES {
            let path = dir.join(file);
            match Template::open(key, label, &path, DEFAULT_THRESHOLD) {
                Ok(t) => templates.push(t),
                Err(e) => log::warn!("⚠️ Template '{}' not loaded: {}", key, e),
            }
        }
        log::info!(
            "🧩 Loaded {}/{} templates from {}",
            templates.len(),
            CANONICAL_TEMPLATES.len(),
            dir.display()
        );
        Self { templates }
    }

    /// Append every image in `dir`, keyed by file stem; names already registered are kept
    pub fn merge_extra_dir(&mut self, dir: &Path, threshold: f32) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            log::debug!("No extra template directory at {}", dir.display());
            return 0;
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_image_file(p))
            .collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if self.get(stem).is_some() {
                log::debug!("Extra template '{}' shadowed by an existing one", stem);
                continue;
            }
            match Template::open(stem, stem, &path, threshold) {
                Ok(t) => {
                    self.templates.push(t);
                    added += 1;
                }
                Err(e) => log::warn!("⚠️ {}", e),
            }
        }
        if added > 0 {
            log::info!("🧩 Added {} extra templates from {}", added, dir.display());
        }
        added
    }

    pub fn get(&self, key: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Extensions the template and shield loaders pick up
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub(crate) fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Evolve / super-evolve buttons, matched only inside the evolve step
#[derive(Debug, Clone, Default)]
pub struct EvolutionButtons {
    pub evolve: Option<Template>,
    pub super_evolve: Option<Template>,
}

impl EvolutionButtons {
    pub const EVOLVE_THRESHOLD: f32 = 0.90;
    pub const SUPER_EVOLVE_THRESHOLD: f32 = 0.825;

    pub fn load(dir: &Path) -> Self {
        let open = |name: &str, file: &str, threshold: f32| {
            Template::open(name, name, &dir.join(file), threshold)
                .map_err(|e| log::warn!("⚠️ {}", e))
                .ok()
        };
        Self {
            evolve: open("evolution", "evolution.png", Self::EVOLVE_THRESHOLD),
            super_evolve: open(
                "super_evolution",
                "super_evolution.png",
                Self::SUPER_EVOLVE_THRESHOLD,
            ),
        }
    }
}
