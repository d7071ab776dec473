// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile, TimingSection};
use crate::errors::{AppvisorError, Result};
use crate::supervisor::{JitterRange, SupervisorTiming};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AppvisorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_applications(&raw)?;
        validate_application_names(&raw)?;
        let timing = build_timing(&raw.timing)?;
        Ok(ConfigFile::new_unchecked(raw.supervisor, timing, raw.application))
    }
}

/// Validate a raw config without keeping the result.
pub fn validate_config(raw: &RawConfigFile) -> Result<()> {
    ConfigFile::try_from(raw.clone()).map(|_| ())
}

fn ensure_has_applications(cfg: &RawConfigFile) -> Result<()> {
    if cfg.application.is_empty() {
        return Err(AppvisorError::ConfigError(
            "config must contain at least one [[application]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_application_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for app in &cfg.application {
        if app.name.trim().is_empty() {
            return Err(AppvisorError::ConfigError(format!(
                "application at {:?} has an empty name",
                app.path
            )));
        }
        if !seen.insert(app.name.as_str()) {
            return Err(AppvisorError::DuplicateApplication(app.name.clone()));
        }
    }
    Ok(())
}

fn build_timing(section: &TimingSection) -> Result<SupervisorTiming> {
    let defaults = SupervisorTiming::default();

    let timing = SupervisorTiming {
        first_attempt: duration_or("first_attempt", &section.first_attempt, defaults.first_attempt)?,
        missing_retry: range_or(
            "missing_retry",
            &section.missing_retry_min,
            &section.missing_retry_max,
            defaults.missing_retry,
        )?,
        fault_retry: range_or(
            "fault_retry",
            &section.fault_retry_min,
            &section.fault_retry_max,
            defaults.fault_retry,
        )?,
        reload_delay: range_or(
            "reload_delay",
            &section.reload_delay_min,
            &section.reload_delay_max,
            defaults.reload_delay,
        )?,
        debounce: duration_or("debounce", &section.debounce, defaults.debounce)?,
        teardown_attempts: section.teardown_attempts.unwrap_or(defaults.teardown_attempts),
        teardown_pause: duration_or("teardown_pause", &section.teardown_pause, defaults.teardown_pause)?,
    };

    if timing.teardown_attempts == 0 {
        return Err(AppvisorError::ConfigError(
            "[timing].teardown_attempts must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(timing)
}

fn duration_or(key: &str, value: &Option<String>, default: Duration) -> Result<Duration> {
    match value {
        Some(s) => parse_duration(s)
            .map_err(|e| AppvisorError::ConfigError(format!("[timing].{key}: {e}"))),
        None => Ok(default),
    }
}

fn range_or(
    key: &str,
    min: &Option<String>,
    max: &Option<String>,
    default: JitterRange,
) -> Result<JitterRange> {
    let range = JitterRange::new(
        duration_or(&format!("{key}_min"), min, default.min)?,
        duration_or(&format!("{key}_max"), max, default.max)?,
    );
    if range.min >= range.max {
        return Err(AppvisorError::ConfigError(format!(
            "[timing].{key}_min ({:?}) must be less than {key}_max ({:?})",
            range.min, range.max
        )));
    }
    Ok(range)
}
