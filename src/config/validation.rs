//! Configuration validation
//!
//! Semantic checks on a deserialized [`FlowConfig`]. Validation collects
//! every error and warning instead of stopping at the first one.

use std::collections::HashSet;

use crate::config::loader::ConfigLimits;
use crate::config::schema::FlowConfig;
use crate::error::{Severity, ValidationIssue};
use crate::flow::Stage;
use crate::sequencer::MAX_INTERVAL;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &FlowConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_timing(config);
        self.validate_stages(config, limits);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Timing
    // ========================================================================

    fn validate_timing(&mut self, config: &FlowConfig) {
        let timing = &config.timing;
        if timing.step_interval.is_zero() {
            self.add_error("timing.step_interval", "Step interval must be greater than zero");
        }
        if timing.score_step_interval.is_zero() {
            self.add_error(
                "timing.score_step_interval",
                "Score step interval must be greater than zero",
            );
        }
        for (path, value) in [
            ("timing.step_interval", timing.step_interval),
            ("timing.score_step_interval", timing.score_step_interval),
            ("timing.completion_delay", timing.completion_delay),
        ] {
            if value > MAX_INTERVAL {
                self.add_error(
                    path,
                    &format!(
                        "Value {} exceeds the maximum of {}",
                        humantime::format_duration(value),
                        humantime::format_duration(MAX_INTERVAL)
                    ),
                );
            }
        }
        if timing.completion_delay.is_zero() {
            self.add_warning(
                "timing.completion_delay",
                "Completion delay is zero; the final score is reported without a pause",
            );
        }
    }

    // ========================================================================
    // Stages
    // ========================================================================

    fn validate_stages(&mut self, config: &FlowConfig, limits: &ConfigLimits) {
        if config.stages.is_empty() {
            self.add_error("stages", "At least one stage is required");
            return;
        }

        let mut seen = HashSet::new();
        for (i, entry) in config.stages.iter().enumerate() {
            let path = format!("stages[{i}]");
            if !seen.insert(entry.stage) {
                self.add_error(
                    &format!("{path}.stage"),
                    &format!("Stage '{}' is configured more than once", entry.stage),
                );
            }

            if entry.target_score == Some(0) {
                self.add_error(
                    &format!("{path}.target_score"),
                    "Target score must be greater than zero",
                );
            }

            if let Some(steps) = &entry.steps {
                if steps.is_empty() {
                    self.add_error(&format!("{path}.steps"), "At least one step is required");
                }
                if steps.len() > limits.max_steps {
                    self.add_error(
                        &format!("{path}.steps"),
                        &format!(
                            "Stage has {} steps, more than the limit of {}",
                            steps.len(),
                            limits.max_steps
                        ),
                    );
                }
                for (j, label) in steps.iter().enumerate() {
                    if label.trim().is_empty() {
                        self.add_error(
                            &format!("{path}.steps[{j}]"),
                            "Step label cannot be empty",
                        );
                    }
                }
            }
        }

        for stage in Stage::ALL {
            if !seen.contains(&stage) {
                self.add_warning(
                    "stages",
                    &format!("Stage '{stage}' is not configured and scores zero on the scorecard"),
                );
            }
        }

        let order = config.order();
        let mut sorted = order.clone();
        sorted.sort();
        if order != sorted {
            self.add_warning("stages", "Stages are not in twitter, telegram, wallet order");
        }
    }

    /// Adds an error to the collection.
    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StageConfig;
    use std::time::Duration;

    fn validate(config: &FlowConfig) -> ValidationResult {
        Validator::new().validate(config, &ConfigLimits::default())
    }

    #[test]
    fn test_default_config_is_valid() {
        let result = validate(&FlowConfig::default());
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = FlowConfig::default();
        config.timing.step_interval = Duration::ZERO;
        config.timing.score_step_interval = Duration::ZERO;
        config.stages[0].target_score = Some(0);
        config.stages[1].steps = Some(vec![]);
        let result = validate(&config);
        assert!(result.has_errors());
        let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "timing.step_interval",
                "timing.score_step_interval",
                "stages[0].target_score",
                "stages[1].steps",
            ]
        );
    }

    #[test]
    fn test_oversized_timing_rejected() {
        let mut config = FlowConfig::default();
        config.timing.step_interval = Duration::from_secs(2 * 60 * 60);
        config.timing.completion_delay = Duration::from_secs(u64::MAX / 2);
        let result = validate(&config);
        let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["timing.step_interval", "timing.completion_delay"]);
        assert!(result.errors[0].message.contains("maximum of 1h"));
    }

    #[test]
    fn test_duplicate_stage() {
        let mut config = FlowConfig::default();
        config.stages.push(StageConfig::new(Stage::Twitter));
        let result = validate(&config);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "stages[3].stage");
    }

    #[test]
    fn test_blank_step_label() {
        let mut config = FlowConfig::default();
        config.stages[2].steps = Some(vec!["ok".to_string(), "  ".to_string()]);
        let result = validate(&config);
        assert_eq!(result.errors[0].path, "stages[2].steps[1]");
    }

    #[test]
    fn test_step_limit() {
        let mut config = FlowConfig::default();
        let limits = ConfigLimits {
            max_steps: 2,
            ..ConfigLimits::default()
        };
        config.stages[0].steps = Some(vec!["a".into(), "b".into(), "c".into()]);
        let result = Validator::new().validate(&config, &limits);
        assert!(result.errors[0].message.contains("limit of 2"));
    }

    #[test]
    fn test_no_stages() {
        let config = FlowConfig {
            stages: vec![],
            ..FlowConfig::default()
        };
        let result = validate(&config);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "stages");
    }

    #[test]
    fn test_warnings() {
        let mut config = FlowConfig::default();
        config.timing.completion_delay = Duration::ZERO;
        config.stages.retain(|s| s.stage != Stage::Telegram);
        config.stages.reverse();
        let result = validate(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 3);
        assert!(result.warnings[1].message.contains("telegram"));
    }
}
