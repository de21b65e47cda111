//! Application-level configuration loading: scoring defaults, TTLs, and timer delays.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_BACK_CONFIG_PATH";

/// Points awarded for a correct answer before the speed bonus.
const DEFAULT_BASE_POINTS: u32 = 1000;
/// Fraction of the base points available as speed bonus.
const DEFAULT_SPEED_BONUS_MULTIPLIER: f64 = 0.5;
/// Delay between `question-ended` and the next automatic step.
const DEFAULT_QUESTION_ADVANCE_DELAY_SECS: u64 = 5;
/// Grace period before a finished room is dropped from the store.
const DEFAULT_FINISHED_ROOM_GRACE_SECS: u64 = 300;
/// TTL for live room state, refreshed on every write.
const DEFAULT_ROOM_TTL_SECS: u64 = 2 * 60 * 60;
/// TTL for participant sessions, long enough to survive refreshes and breaks.
const DEFAULT_SESSION_TTL_SECS: u64 = 6 * 60 * 60;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Points awarded for a correct answer before the speed bonus.
    pub base_points: u32,
    /// Fraction of the base points available as speed bonus.
    pub speed_bonus_multiplier: f64,
    /// Delay between `question-ended` and the next automatic step.
    pub question_advance_delay: Duration,
    /// Grace period before a finished room is dropped from the store.
    pub finished_room_grace: Duration,
    /// TTL applied to room state on every write.
    pub room_ttl: Duration,
    /// TTL applied to participant sessions on every write.
    pub session_ttl: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_points: DEFAULT_BASE_POINTS,
            speed_bonus_multiplier: DEFAULT_SPEED_BONUS_MULTIPLIER,
            question_advance_delay: Duration::from_secs(DEFAULT_QUESTION_ADVANCE_DELAY_SECS),
            finished_room_grace: Duration::from_secs(DEFAULT_FINISHED_ROOM_GRACE_SECS),
            room_ttl: Duration::from_secs(DEFAULT_ROOM_TTL_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    base_points: Option<u32>,
    speed_bonus_multiplier: Option<f64>,
    question_advance_delay_secs: Option<u64>,
    finished_room_grace_secs: Option<u64>,
    room_ttl_secs: Option<u64>,
    session_ttl_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            base_points: raw.base_points.unwrap_or(defaults.base_points),
            speed_bonus_multiplier: raw
                .speed_bonus_multiplier
                .unwrap_or(defaults.speed_bonus_multiplier),
            question_advance_delay: raw
                .question_advance_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.question_advance_delay),
            finished_room_grace: raw
                .finished_room_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.finished_room_grace),
            room_ttl: raw
                .room_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.room_ttl),
            session_ttl: raw
                .session_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scoring_contract() {
        let config = AppConfig::default();
        assert_eq!(config.base_points, 1000);
        assert_eq!(config.speed_bonus_multiplier, 0.5);
        assert_eq!(config.question_advance_delay, Duration::from_secs(5));
        assert_eq!(config.finished_room_grace, Duration::from_secs(300));
    }

    #[test]
    fn partial_raw_config_keeps_defaults_for_missing_fields() {
        let raw: RawConfig = serde_json::from_str(r#"{"base_points": 500}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.base_points, 500);
        assert_eq!(config.speed_bonus_multiplier, 0.5);
        assert_eq!(config.session_ttl, Duration::from_secs(6 * 60 * 60));
    }
}
