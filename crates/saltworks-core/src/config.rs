//! Runtime configuration and launch options.
//!
//! `config.json` is read field by field: a missing or wrongly-typed field
//! keeps its default instead of rejecting the whole file.

use saltworks_logic::scoring::ScoringRules;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings read from `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub debug_panel_visible: bool,
    pub start_animation: bool,
    pub scoring_rules: ScoringRules,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug_panel_visible: true,
            start_animation: true,
            scoring_rules: ScoringRules::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse JSON text. Only malformed JSON is an error.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value))
    }

    /// Build from an already-parsed document, defaulting per field.
    pub fn from_value(value: &Value) -> Self {
        let mut config = Self::default();
        let Some(root) = value.as_object() else {
            log::warn!("config is not an object, using defaults");
            return config;
        };

        if let Some(v) = root.get("debugPanelVisible").and_then(Value::as_bool) {
            config.debug_panel_visible = v;
        }
        if let Some(v) = root.get("startAnimation").and_then(Value::as_bool) {
            config.start_animation = v;
        }
        if let Some(rules) = root.get("scoringRules").and_then(Value::as_object) {
            config.scoring_rules = read_rules(rules);
        }
        config
    }
}

fn read_rules(obj: &Map<String, Value>) -> ScoringRules {
    let defaults = ScoringRules::default();
    let mut rules = ScoringRules {
        first_time_points: read_u32(obj, "firstTimePoints", defaults.first_time_points),
        repeat_points: read_u32(obj, "repeatPoints", defaults.repeat_points),
        min_multiplier: read_f64(obj, "minMultiplier", defaults.min_multiplier),
        max_multiplier: read_f64(obj, "maxMultiplier", defaults.max_multiplier),
        multiplier_increment: read_f64(obj, "multiplierIncrement", defaults.multiplier_increment),
        max_attempts: read_u32(obj, "maxAttempts", defaults.max_attempts).max(1),
        countdown_seconds: read_u32(obj, "countdownSeconds", defaults.countdown_seconds),
        warning_threshold: read_u32(obj, "warningThreshold", defaults.warning_threshold),
    };
    if rules.max_multiplier < rules.min_multiplier {
        log::warn!(
            "maxMultiplier {} below minMultiplier {}, raising it",
            rules.max_multiplier,
            rules.min_multiplier
        );
        rules.max_multiplier = rules.min_multiplier;
    }
    rules
}

fn read_u32(obj: &Map<String, Value>, key: &str, default: u32) -> u32 {
    match obj.get(key) {
        None => default,
        Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => n,
            None => {
                log::warn!("config field {} has invalid value {}, using {}", key, v, default);
                default
            }
        },
    }
}

fn read_f64(obj: &Map<String, Value>, key: &str, default: f64) -> f64 {
    match obj.get(key) {
        None => default,
        Some(v) => match v.as_f64().filter(|n| n.is_finite()) {
            Some(n) => n,
            None => {
                log::warn!("config field {} has invalid value {}, using {}", key, v, default);
                default
            }
        },
    }
}

/// Options taken from the launch URL query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Requested starting level. Falls back to the first catalog level if
    /// the catalog has no such level.
    pub level: u32,
    /// Skip the quiz: every valid submission succeeds at once.
    pub fast_mode: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            level: 1,
            fast_mode: false,
        }
    }
}

impl LaunchOptions {
    /// Parse `?level=3&mode=fast`. The leading `?` is optional; unknown
    /// keys are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut options = Self::default();
        let query = query.trim().trim_start_matches('?');
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "level" => match value.parse::<u32>() {
                    Ok(level) if level > 0 => options.level = level,
                    _ => log::warn!("ignoring level parameter {:?}", value),
                },
                "mode" => options.fast_mode = value.eq_ignore_ascii_case("fast"),
                _ => {}
            }
        }
        if options.fast_mode {
            log::info!("fast mode enabled, skipping quizzes");
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = RuntimeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.scoring_rules.countdown_seconds, 9999);
    }

    #[test]
    fn test_reads_shipped_fields() {
        let config = RuntimeConfig::from_json_str(
            r#"{"debugPanelVisible": false, "scoringRules": {"countdownSeconds": 600, "repeatPoints": 40}}"#,
        )
        .unwrap();
        assert!(!config.debug_panel_visible);
        assert!(config.start_animation);
        assert_eq!(config.scoring_rules.countdown_seconds, 600);
        assert_eq!(config.scoring_rules.repeat_points, 40);
        assert_eq!(config.scoring_rules.first_time_points, 100);
    }

    #[test]
    fn test_bad_fields_fall_back_individually() {
        let config = RuntimeConfig::from_json_str(
            r#"{"debugPanelVisible": "yes", "scoringRules": {"maxAttempts": "two", "minMultiplier": 1.5, "firstTimePoints": -3}}"#,
        )
        .unwrap();
        assert!(config.debug_panel_visible);
        assert_eq!(config.scoring_rules.max_attempts, 2);
        assert_eq!(config.scoring_rules.first_time_points, 100);
        assert_eq!(config.scoring_rules.min_multiplier, 1.5);
    }

    #[test]
    fn test_max_multiplier_raised_to_min() {
        let config = RuntimeConfig::from_json_str(
            r#"{"scoringRules": {"minMultiplier": 2.0, "maxMultiplier": 1.0}}"#,
        )
        .unwrap();
        assert_eq!(config.scoring_rules.max_multiplier, 2.0);
    }

    #[test]
    fn test_non_object_uses_defaults() {
        let config = RuntimeConfig::from_json_str("[1, 2]").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert!(RuntimeConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_launch_options() {
        let opts = LaunchOptions::from_query("?level=4&mode=fast");
        assert_eq!(opts.level, 4);
        assert!(opts.fast_mode);

        let opts = LaunchOptions::from_query("level=0&mode=slow");
        assert_eq!(opts.level, 1);
        assert!(!opts.fast_mode);

        assert_eq!(LaunchOptions::from_query(""), LaunchOptions::default());
        assert_eq!(LaunchOptions::from_query("?level=abc").level, 1);
    }
}
