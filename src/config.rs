//! Configuration loading for Bhraman

use crate::error::{BhramanError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BhramanConfig {
    #[serde(default)]
    pub wander: WanderConfig,
    #[serde(default)]
    pub avoidance: AvoidanceConfig,
    #[serde(default)]
    pub startup: StartupConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Random drive timing and velocity ranges
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WanderConfig {
    /// Polling interval of the wander loop in milliseconds (default: 50)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Time after an obstacle trigger before sensors are re-subscribed (default: 4.0)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f32,

    /// Shortest drive window in whole seconds (default: 3)
    #[serde(default = "default_min_drive_secs")]
    pub min_drive_secs: u64,

    /// Longest drive window in whole seconds (default: 8)
    #[serde(default = "default_max_drive_secs")]
    pub max_drive_secs: u64,

    /// Lowest forward linear velocity, host percent (default: 20)
    #[serde(default = "default_min_linear")]
    pub min_linear: i32,

    /// Highest forward linear velocity, host percent (default: 25)
    #[serde(default = "default_max_linear")]
    pub max_linear: i32,

    /// Angular velocity is drawn from [-max_angular, max_angular] (default: 35)
    #[serde(default = "default_max_angular")]
    pub max_angular: i32,

    /// RNG seed for drive randomization (0 = random each run)
    #[serde(default)]
    pub random_seed: u64,
}

/// Obstacle detection thresholds for the sensor subscriptions
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AvoidanceConfig {
    /// Front ToF trigger distance in meters (default: 0.15)
    #[serde(default = "default_front_threshold")]
    pub front_threshold_m: f64,

    /// Left/right ToF trigger distance in meters (default: 0.15)
    #[serde(default = "default_side_threshold")]
    pub side_threshold_m: f64,

    /// Back ToF trigger distance in meters (default: 0.20).
    /// The rear sensor sits deeper in the chassis.
    #[serde(default = "default_back_threshold")]
    pub back_threshold_m: f64,

    /// Debounce for ToF events in milliseconds (default: 0)
    #[serde(default)]
    pub tof_debounce_ms: u64,

    /// Debounce for bump events in milliseconds (default: 250)
    #[serde(default = "default_bump_debounce_ms")]
    pub bump_debounce_ms: u64,
}

/// Head centering before the wander loop starts
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StartupConfig {
    #[serde(default = "default_center_head")]
    pub center_head: bool,

    /// Head move velocity, host percent (default: 100)
    #[serde(default = "default_head_velocity")]
    pub head_velocity: f32,

    /// Pause after centering the head in milliseconds (default: 3000)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Simulated host and synthetic sensor feed
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Sensor publish rate of the feeder thread (default: 10)
    #[serde(default = "default_reading_hz")]
    pub reading_hz: f32,

    /// Per-reading chance a ToF sensor sees a near obstacle (default: 0.01)
    #[serde(default = "default_obstacle_probability")]
    pub obstacle_probability: f32,

    /// Per-cycle chance of a bump contact (default: 0.002)
    #[serde(default = "default_bump_probability")]
    pub bump_probability: f32,

    /// Sleep for real inside host pauses (default: true)
    #[serde(default = "default_realtime_pauses")]
    pub realtime_pauses: bool,

    /// Keep a log of every issued host command (default: false)
    #[serde(default)]
    pub record_commands: bool,

    /// RNG seed for the feeder (0 = random each run)
    #[serde(default)]
    pub random_seed: u64,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            cooldown_secs: default_cooldown_secs(),
            min_drive_secs: default_min_drive_secs(),
            max_drive_secs: default_max_drive_secs(),
            min_linear: default_min_linear(),
            max_linear: default_max_linear(),
            max_angular: default_max_angular(),
            random_seed: 0,
        }
    }
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            front_threshold_m: default_front_threshold(),
            side_threshold_m: default_side_threshold(),
            back_threshold_m: default_back_threshold(),
            tof_debounce_ms: 0,
            bump_debounce_ms: default_bump_debounce_ms(),
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            center_head: default_center_head(),
            head_velocity: default_head_velocity(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            reading_hz: default_reading_hz(),
            obstacle_probability: default_obstacle_probability(),
            bump_probability: default_bump_probability(),
            realtime_pauses: default_realtime_pauses(),
            record_commands: false,
            random_seed: 0,
        }
    }
}

// Default value functions
fn default_tick_ms() -> u64 {
    50
}
fn default_cooldown_secs() -> f32 {
    4.0
}
fn default_min_drive_secs() -> u64 {
    3
}
fn default_max_drive_secs() -> u64 {
    8
}
fn default_min_linear() -> i32 {
    20
}
fn default_max_linear() -> i32 {
    25
}
fn default_max_angular() -> i32 {
    35
}

// Avoidance defaults
fn default_front_threshold() -> f64 {
    0.15
}
fn default_side_threshold() -> f64 {
    0.15
}
fn default_back_threshold() -> f64 {
    0.20
}
fn default_bump_debounce_ms() -> u64 {
    250
}

// Startup defaults
fn default_center_head() -> bool {
    true
}
fn default_head_velocity() -> f32 {
    100.0
}
fn default_settle_ms() -> u64 {
    3000
}

// Simulation defaults
fn default_reading_hz() -> f32 {
    10.0
}
fn default_obstacle_probability() -> f32 {
    0.01
}
fn default_bump_probability() -> f32 {
    0.002
}
fn default_realtime_pauses() -> bool {
    true
}

impl BhramanConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BhramanError::Config(format!("Failed to read config file: {}", e)))?;
        let config: BhramanConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the wander loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let w = &self.wander;
        if w.tick_ms == 0 {
            return Err(BhramanError::Config("wander.tick_ms must be > 0".into()));
        }
        if !(w.cooldown_secs > 0.0) {
            return Err(BhramanError::Config(
                "wander.cooldown_secs must be > 0".into(),
            ));
        }
        w.cooldown()?;
        if w.min_drive_secs > w.max_drive_secs {
            return Err(BhramanError::Config(format!(
                "drive window [{}, {}] is inverted",
                w.min_drive_secs, w.max_drive_secs
            )));
        }
        if w.min_linear > w.max_linear {
            return Err(BhramanError::Config(format!(
                "linear range [{}, {}] is inverted",
                w.min_linear, w.max_linear
            )));
        }
        if w.max_angular < 0 {
            return Err(BhramanError::Config(
                "wander.max_angular must be >= 0".into(),
            ));
        }

        let s = &self.simulation;
        if !(s.reading_hz > 0.0) {
            return Err(BhramanError::Config(
                "simulation.reading_hz must be > 0".into(),
            ));
        }
        s.reading_interval()?;
        for (name, p) in [
            ("obstacle_probability", s.obstacle_probability),
            ("bump_probability", s.bump_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(BhramanError::Config(format!(
                    "simulation.{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }
        Ok(())
    }
}

impl WanderConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn cooldown(&self) -> Result<Duration> {
        Duration::try_from_secs_f32(self.cooldown_secs).map_err(|e| {
            BhramanError::Config(format!(
                "wander.cooldown_secs {} is not a valid duration: {}",
                self.cooldown_secs, e
            ))
        })
    }
}

impl SimulationConfig {
    /// Time between two feeder cycles
    pub fn reading_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f32(1.0 / self.reading_hz).map_err(|e| {
            BhramanError::Config(format!(
                "simulation.reading_hz {} gives no usable interval: {}",
                self.reading_hz, e
            ))
        })
    }
}
