/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to the built-in presets if the file is missing or incomplete.

use std::fmt;
use std::path::PathBuf;

use log::warn;
use serde::Deserialize;

use crate::domain::entity::AiMode;

/// Levels per difficulty tier.
pub const LEVELS_PER_DIFFICULTY: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn tag(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ── Public Config Struct ──

/// One difficulty preset as consumed by the round.
#[derive(Clone, Debug, PartialEq)]
pub struct DifficultyConfig {
    pub player_lives: u32,
    /// Multiplier on the enemy's base per-tile move time (higher = slower).
    pub enemy_speed: f32,
    pub enemy_ai: AiMode,
    pub bomb_time_ms: u32,
    pub extra_fire: u32,
    pub powerup_drop_rate: f64,
    pub time_limit_ms: Option<u32>,
    /// Carried for completeness; level generation ignores it.
    pub increase_blocks: u32,
}

impl DifficultyConfig {
    /// Built-in preset. Always a fresh value.
    pub fn preset(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => DifficultyConfig {
                player_lives: 5,
                enemy_speed: 8.0,
                enemy_ai: AiMode::Random,
                bomb_time_ms: 2000,
                extra_fire: 0,
                powerup_drop_rate: 0.20,
                time_limit_ms: None,
                increase_blocks: 0,
            },
            Difficulty::Medium => DifficultyConfig {
                player_lives: 3,
                enemy_speed: 4.0,
                enemy_ai: AiMode::AvoidBombs,
                bomb_time_ms: 1800,
                extra_fire: 0,
                powerup_drop_rate: 0.10,
                time_limit_ms: Some(150_000),
                increase_blocks: 0,
            },
            Difficulty::Hard => DifficultyConfig {
                player_lives: 1,
                enemy_speed: 1.0,
                enemy_ai: AiMode::ChasePlayer,
                bomb_time_ms: 1500,
                extra_fire: 1,
                powerup_drop_rate: 0.04,
                time_limit_ms: Some(90_000),
                increase_blocks: 0,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tick_rate_ms: u64,
    pub difficulty: Difficulty,
    pub seed: Option<u64>,
    presets: [DifficultyConfig; 3],
}

impl GameConfig {
    pub fn difficulty_config(&self, difficulty: Difficulty) -> &DifficultyConfig {
        &self.presets[difficulty as usize]
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default())
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    difficulty: TomlDifficulties,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_difficulty")]
    difficulty: Difficulty,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlDifficulties {
    #[serde(default)]
    easy: TomlDifficulty,
    #[serde(default)]
    medium: TomlDifficulty,
    #[serde(default)]
    hard: TomlDifficulty,
}

/// Per-key overrides; unset keys keep the preset value.
#[derive(Deserialize, Debug, Default)]
struct TomlDifficulty {
    player_lives: Option<u32>,
    enemy_speed: Option<f32>,
    enemy_ai: Option<String>,
    bomb_time_ms: Option<u32>,
    extra_fire: Option<u32>,
    powerup_drop_rate: Option<f64>,
    time_limit_ms: Option<u32>,
    increase_blocks: Option<u32>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }     // ~60 fps frame clock
fn default_difficulty() -> Difficulty { Difficulty::Easy }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tick_rate_ms: default_tick_rate(),
            difficulty: default_difficulty(),
            seed: None,
        }
    }
}

impl TomlDifficulty {
    fn merge_over(&self, difficulty: Difficulty) -> DifficultyConfig {
        let mut cfg = DifficultyConfig::preset(difficulty);
        if let Some(v) = self.player_lives { cfg.player_lives = v; }
        if let Some(v) = self.enemy_speed { cfg.enemy_speed = v.max(0.0); }
        if let Some(tag) = &self.enemy_ai {
            match AiMode::from_tag(tag) {
                Some(ai) => cfg.enemy_ai = ai,
                None => warn!("unknown enemy_ai {tag:?} for {difficulty}, keeping {}", cfg.enemy_ai.tag()),
            }
        }
        if let Some(v) = self.bomb_time_ms { cfg.bomb_time_ms = v; }
        if let Some(v) = self.extra_fire { cfg.extra_fire = v; }
        if let Some(v) = self.powerup_drop_rate { cfg.powerup_drop_rate = v.clamp(0.0, 1.0); }
        if let Some(v) = self.time_limit_ms {
            cfg.time_limit_ms = if v == 0 { None } else { Some(v) };
        }
        if let Some(v) = self.increase_blocks { cfg.increase_blocks = v; }
        cfg
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        GameConfig::from_toml(load_toml(&candidate_dirs()))
    }

    /// Parse a config document. Parse errors fall back to defaults.
    pub fn from_toml_str(text: &str) -> Self {
        match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => GameConfig::from_toml(cfg),
            Err(e) => {
                warn!("config parse error: {e}; using default settings");
                GameConfig::default()
            }
        }
    }

    fn from_toml(cfg: TomlConfig) -> Self {
        let d = &cfg.difficulty;
        GameConfig {
            tick_rate_ms: cfg.general.tick_rate_ms.max(1),
            difficulty: cfg.general.difficulty,
            seed: cfg.general.seed,
            presets: [
                d.easy.merge_over(Difficulty::Easy),
                d.medium.merge_over(Difficulty::Medium),
                d.hard.merge_over(Difficulty::Hard),
            ],
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warn!("{}: parse error: {e}; using default settings", path.display());
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_presets() {
        let cfg = GameConfig::from_toml_str("");
        assert_eq!(cfg.tick_rate_ms, 16);
        assert_eq!(cfg.difficulty, Difficulty::Easy);
        assert_eq!(cfg.seed, None);
        for d in Difficulty::ALL {
            assert_eq!(cfg.difficulty_config(d), &DifficultyConfig::preset(d));
        }
    }

    #[test]
    fn overrides_merge_per_key() {
        let cfg = GameConfig::from_toml_str(
            r#"
            [general]
            difficulty = "hard"
            seed = 42

            [difficulty.hard]
            player_lives = 2
            time_limit_ms = 0

            [difficulty.medium]
            enemy_ai = "chase_player"
            "#,
        );
        assert_eq!(cfg.difficulty, Difficulty::Hard);
        assert_eq!(cfg.seed, Some(42));
        let hard = cfg.difficulty_config(Difficulty::Hard);
        assert_eq!(hard.player_lives, 2);
        assert_eq!(hard.time_limit_ms, None);
        assert_eq!(hard.bomb_time_ms, 1500);
        assert_eq!(hard.extra_fire, 1);
        assert_eq!(cfg.difficulty_config(Difficulty::Medium).enemy_ai, AiMode::ChasePlayer);
    }

    #[test]
    fn unknown_ai_tag_keeps_preset() {
        let cfg = GameConfig::from_toml_str("[difficulty.easy]\nenemy_ai = \"berserk\"\n");
        assert_eq!(cfg.difficulty_config(Difficulty::Easy).enemy_ai, AiMode::Random);
    }

    #[test]
    fn parse_error_falls_back() {
        let cfg = GameConfig::from_toml_str("[general\ntick_rate_ms = ");
        assert_eq!(cfg.tick_rate_ms, 16);
    }

    #[test]
    fn presets_are_fresh_values() {
        let mut a = DifficultyConfig::preset(Difficulty::Medium);
        a.player_lives = 99;
        assert_eq!(DifficultyConfig::preset(Difficulty::Medium).player_lives, 3);
    }
}
