use std::time::Duration;
use tracing::Level;

use crate::error::SimError;
use crate::game::constants::{ship, timing};

/// Controller sandbox settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Run controllers on a worker thread with a one-tick deadline
    pub controller_timeout: bool,
    /// Absorb controller errors and panics instead of ending the run (timed mode only)
    pub ignore_exceptions: bool,
    /// Keep every evaluation duration and summarize them at the end
    pub track_compute_cost: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            controller_timeout: false,
            ignore_exceptions: false,
            track_compute_cost: false,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Ticks per simulated second
    pub frequency: u32,
    /// Wall-clock pacing; 0 runs as fast as possible
    pub real_time_multiplier: f32,
    /// Starting lives for ships that do not set their own
    pub lives: u32,
    pub sandbox: SandboxConfig,
    /// Record per-tick score history
    pub record_history: bool,
    pub log_level: Level,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frequency: timing::DEFAULT_FREQUENCY,
            real_time_multiplier: timing::DEFAULT_REAL_TIME_MULTIPLIER,
            lives: ship::DEFAULT_LIVES,
            sandbox: SandboxConfig::default(),
            record_history: false,
            log_level: Level::INFO,
        }
    }
}

impl SimConfig {
    /// Training environment: no pacing, untimed controllers
    pub fn headless() -> Self {
        Self {
            real_time_multiplier: 0.0,
            ..Self::default()
        }
    }

    /// Competition settings: no pacing, timed and fault-tolerant sandbox, cost tracking
    pub fn competition() -> Self {
        Self {
            real_time_multiplier: 0.0,
            sandbox: SandboxConfig {
                controller_timeout: true,
                ignore_exceptions: true,
                track_compute_cost: true,
            },
            ..Self::default()
        }
    }

    /// Tick duration in simulated seconds
    pub fn dt(&self) -> f32 {
        1.0 / self.frequency as f32
    }

    /// Wall-clock period between ticks, `None` when unpaced
    pub fn pacing(&self) -> Result<Option<Duration>, SimError> {
        if self.real_time_multiplier == 0.0 {
            return Ok(None);
        }
        Duration::try_from_secs_f32(self.dt() / self.real_time_multiplier)
            .map(Some)
            .map_err(|_| SimError::config(format!("real_time_multiplier {} gives no usable tick period", self.real_time_multiplier)))
    }

    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::load_or(Self::default())
    }

    /// Load config from environment on top of `base`
    pub fn load_or(base: Self) -> Self {
        let mut config = base;

        if let Ok(frequency) = std::env::var("SIM_FREQUENCY") {
            if let Ok(parsed) = frequency.parse::<u32>() {
                if parsed > 0 && parsed <= 10_000 {
                    config.frequency = parsed;
                } else {
                    tracing::warn!("SIM_FREQUENCY must be 1-10000, using default");
                }
            } else {
                tracing::warn!("Invalid SIM_FREQUENCY '{}', using default", frequency);
            }
        }

        if let Ok(multiplier) = std::env::var("REAL_TIME_MULTIPLIER") {
            match multiplier.parse::<f32>() {
                Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => config.real_time_multiplier = parsed,
                Ok(_) => tracing::warn!("REAL_TIME_MULTIPLIER must be >= 0, using default"),
                Err(_) => tracing::warn!("Invalid REAL_TIME_MULTIPLIER '{}', using default", multiplier),
            }
        }

        if let Ok(lives) = std::env::var("SHIP_LIVES") {
            if let Ok(parsed) = lives.parse::<u32>() {
                if parsed > 0 {
                    config.lives = parsed;
                } else {
                    tracing::warn!("SHIP_LIVES must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid SHIP_LIVES '{}', using default", lives);
            }
        }

        read_flag("CONTROLLER_TIMEOUT", &mut config.sandbox.controller_timeout);
        read_flag("IGNORE_EXCEPTIONS", &mut config.sandbox.ignore_exceptions);
        read_flag("TRACK_COMPUTE_COST", &mut config.sandbox.track_compute_cost);
        read_flag("RECORD_HISTORY", &mut config.record_history);

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if let Ok(parsed) = level.parse::<Level>() {
                config.log_level = parsed;
            } else {
                tracing::warn!("Invalid LOG_LEVEL '{}', using default", level);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), SimError> {
        if self.frequency == 0 {
            return Err(SimError::config("frequency must be at least 1 Hz"));
        }
        if !self.real_time_multiplier.is_finite() || self.real_time_multiplier < 0.0 {
            return Err(SimError::config("real_time_multiplier must be a finite value >= 0"));
        }
        self.pacing()?;
        if self.lives == 0 {
            return Err(SimError::config("lives must be at least 1"));
        }
        if self.sandbox.ignore_exceptions && !self.sandbox.controller_timeout {
            tracing::warn!("ignore_exceptions has no effect without controller_timeout");
        }
        Ok(())
    }
}

fn read_flag(var: &str, target: &mut bool) {
    if let Ok(value) = std::env::var(var) {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => *target = true,
            "0" | "false" | "no" | "off" => *target = false,
            _ => tracing::warn!("Invalid {} '{}', using default", var, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.frequency, 60);
        assert_eq!(config.real_time_multiplier, 1.0);
        assert_eq!(config.lives, 3);
        assert!(!config.sandbox.controller_timeout);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let headless = SimConfig::headless();
        assert_eq!(headless.real_time_multiplier, 0.0);

        let competition = SimConfig::competition();
        assert!(competition.sandbox.controller_timeout);
        assert!(competition.sandbox.ignore_exceptions);
        assert!(competition.sandbox.track_compute_cost);
        assert!(competition.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let config = SimConfig { frequency: 0, ..SimConfig::default() };
        assert!(matches!(config.validate(), Err(SimError::Configuration(_))));

        let config = SimConfig { real_time_multiplier: -1.0, ..SimConfig::default() };
        assert!(config.validate().is_err());

        let config = SimConfig { lives: 0, ..SimConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tiny_multiplier_rejected() {
        let config = SimConfig { real_time_multiplier: 1e-40, ..SimConfig::default() };
        assert!(matches!(config.validate(), Err(SimError::Configuration(_))));
        assert!(config.pacing().is_err());

        let config = SimConfig { real_time_multiplier: 2.0, frequency: 10, ..SimConfig::default() };
        assert_eq!(config.pacing().unwrap(), Some(Duration::from_millis(50)));
        assert_eq!(SimConfig::headless().pacing().unwrap(), None);
    }

    #[test]
    fn test_dt() {
        let config = SimConfig { frequency: 10, ..SimConfig::default() };
        assert!((config.dt() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_load_or_keeps_base() {
        let config = SimConfig::load_or(SimConfig::competition());
        assert!(config.frequency > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = SimConfig::load_or_default();
        assert!(config.frequency > 0);
    }
}
