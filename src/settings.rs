//! Headless configuration
//!
//! Persisted separately from the meta record as a JSON file.

use serde::{Deserialize, Serialize};

use crate::sim::RunConfig;

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Play area ===
    pub arena_width: f32,
    pub arena_height: f32,

    // === Run ===
    /// Seed used when the host doesn't supply one
    pub seed: u32,
    /// Upgrades offered per level-up
    pub upgrade_choices: usize,
    /// Seconds the headless runner plays before stopping
    pub max_run_seconds: f32,

    // === Animation ===
    /// Moving flag grace period (seconds)
    pub move_grace: f32,
    pub anim_stiffness: f32,

    // === Storage ===
    /// Meta record file (native)
    pub save_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            arena_width: crate::consts::DEFAULT_ARENA_WIDTH,
            arena_height: crate::consts::DEFAULT_ARENA_HEIGHT,

            seed: 12345,
            upgrade_choices: 3,
            max_run_seconds: 600.0,

            move_grace: 0.12,
            anim_stiffness: crate::sim::motion::DEFAULT_STIFFNESS,

            save_path: "void_survivor_meta.json".to_string(),
        }
    }
}

impl Settings {
    /// Run configuration for `seed`
    pub fn to_run_config(&self, seed: u32) -> RunConfig {
        RunConfig {
            seed,
            arena: glam::Vec2::new(self.arena_width, self.arena_height),
            upgrade_choices: self.upgrade_choices.max(1),
            move_grace: self.move_grace.max(0.0),
            anim_stiffness: self.anim_stiffness,
        }
    }

    /// Run configuration using the configured seed
    pub fn run_config(&self) -> RunConfig {
        self.to_run_config(self.seed)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &std::path::Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                log::info!("Using default settings ({}: {e})", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring invalid settings in {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Save settings to a JSON file (best-effort)
    pub fn save(&self, path: &std::path::Path) {
        let result = serde_json::to_string_pretty(self)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(path, json));
        match result {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Failed to save settings: {e}"),
        }
    }
}
