// Configuration loading and validation (slateforge.toml).

use directories::ProjectDirs;
use serde::Deserialize;
use slateforge_core::{
    DiversityPolicy, ExposureLimits, FlexSlot, PlayerId, RosterRules, RulesError, StackingRule,
};
use slateforge_optimizer::SolverLimits;
use slateforge_sim::SimulationConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "slateforge.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

impl ConfigError {
    fn from_rules(err: RulesError, prefix: &str) -> Self {
        let RulesError::InvalidRules { field, message } = err;
        ConfigError::ValidationError {
            field: format!("{prefix}{field}"),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub rules: RosterRules,
    /// Lineups requested per run.
    pub lineups: u32,
    pub stacking: StackingRule,
    pub exposure: ExposureLimits,
    pub diversity: DiversityPolicy,
    pub solver: SolverConfig,
    pub simulation: SimulationSettings,
    pub run: RunConfig,
    pub data: DataPaths,
}

// ---------------------------------------------------------------------------
// slateforge.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    contest: ContestSection,
    #[serde(default)]
    stacking: StackingRule,
    /// Keys are player ids as strings; TOML table keys are always strings.
    #[serde(default)]
    exposure: BTreeMap<String, f64>,
    #[serde(default)]
    diversity: DiversityPolicy,
    #[serde(default)]
    solver: SolverConfig,
    #[serde(default)]
    simulation: SimulationSettings,
    #[serde(default)]
    run: RunConfig,
    data: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContestSection {
    salary_cap: u32,
    roster_size: usize,
    lineups: u32,
    positions: BTreeMap<String, usize>,
    #[serde(default)]
    flex: Option<FlexSlot>,
}

/// Per-solve search budget. Both limits are off unless set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
    #[serde(default)]
    pub node_limit: Option<u64>,
}

impl SolverConfig {
    pub fn limits(&self) -> SolverLimits {
        SolverLimits {
            time_limit: self.time_limit_ms.map(Duration::from_millis),
            node_limit: self.node_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    pub enabled: bool,
    pub iterations: u32,
    pub win_threshold: f64,
    pub default_std_dev: f64,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let sim = SimulationConfig::default();
        SimulationSettings {
            enabled: true,
            iterations: sim.iterations,
            win_threshold: sim.win_threshold,
            default_std_dev: sim.default_std_dev,
            seed: sim.seed,
        }
    }
}

impl SimulationSettings {
    pub fn to_sim_config(&self) -> SimulationConfig {
        SimulationConfig {
            iterations: self.iterations,
            win_threshold: self.win_threshold,
            default_std_dev: self.default_std_dev,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Wall-clock deadline for the whole run. Lineups found before it are
    /// kept; simulation is dropped if it cannot finish in time.
    pub deadline_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig { deadline_secs: 60 }
    }
}

impl RunConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataPaths {
    /// Player pool CSV, relative to the working directory.
    pub players: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a config document. `path` is only used in errors.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let contest = file.contest;
    let rules = RosterRules {
        salary_cap: contest.salary_cap,
        roster_size: contest.roster_size,
        positions: contest.positions,
        flex: contest.flex,
    };

    let mut exposure = ExposureLimits::new();
    for (key, frac) in file.exposure {
        let id: u64 = key.trim().parse().map_err(|_| ConfigError::ValidationError {
            field: format!("exposure.{key}"),
            message: "key must be a numeric player id".into(),
        })?;
        exposure = exposure.with_limit(PlayerId(id), frac);
    }

    let config = Config {
        rules,
        lineups: contest.lineups,
        stacking: file.stacking,
        exposure,
        diversity: file.diversity,
        solver: file.solver,
        simulation: file.simulation,
        run: file.run,
        data: file.data,
    };

    validate(&config)?;

    Ok(config)
}

/// Load and validate the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    parse_config(&text, path)
}

/// Copy `defaults/slateforge.toml` to `config/slateforge.toml` under
/// `base_dir` when the latter is missing. Returns the written path, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let default_path = base_dir.join("defaults").join(CONFIG_FILE_NAME);
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE_NAME);

    if !default_path.is_file() || target.exists() {
        return Ok(None);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            let content =
                std::fs::read(&default_path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", default_path.display()),
                })?;
            std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(Some(target))
        }
        // lost a race with another process; theirs wins
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Candidate config locations in lookup order: `config/` under the working
/// directory, then the platform config directory.
pub fn config_search_paths(cwd: &Path) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join("config").join(CONFIG_FILE_NAME)];
    if let Some(dirs) = ProjectDirs::from("", "", "slateforge") {
        paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    paths
}

/// Convenience wrapper: seeds `config/` from `defaults/` if needed, then
/// loads the first config file found on the search path.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;

    let candidates = config_search_paths(&cwd);
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => load_config_from(path),
        None => Err(ConfigError::FileNotFound {
            path: candidates[0].clone(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    config
        .rules
        .validate()
        .map_err(|e| ConfigError::from_rules(e, "contest."))?;
    config
        .stacking
        .validate(&config.rules)
        .map_err(|e| ConfigError::from_rules(e, ""))?;
    config
        .exposure
        .validate()
        .map_err(|e| ConfigError::from_rules(e, ""))?;
    config
        .diversity
        .validate(&config.rules)
        .map_err(|e| ConfigError::from_rules(e, ""))?;

    if config.lineups == 0 {
        return Err(ConfigError::ValidationError {
            field: "contest.lineups".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.solver.time_limit_ms == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "solver.time_limit_ms".into(),
            message: "must be greater than 0 when set".into(),
        });
    }

    let sim = &config.simulation;
    if sim.enabled {
        if sim.iterations == 0 {
            return Err(ConfigError::ValidationError {
                field: "simulation.iterations".into(),
                message: "must be greater than 0".into(),
            });
        }
        if !sim.win_threshold.is_finite() {
            return Err(ConfigError::ValidationError {
                field: "simulation.win_threshold".into(),
                message: format!("must be finite, got {}", sim.win_threshold),
            });
        }
        if !sim.default_std_dev.is_finite() || sim.default_std_dev < 0.0 {
            return Err(ConfigError::ValidationError {
                field: "simulation.default_std_dev".into(),
                message: format!("must be >= 0, got {}", sim.default_std_dev),
            });
        }
    }

    if config.run.deadline_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "run.deadline_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.data.players.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data.players".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
