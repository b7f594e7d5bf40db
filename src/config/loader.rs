//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check and UTF-8 BOM removal
//! 2. Environment variable expansion (on raw text, before parsing)
//! 3. YAML parsing and deserialization
//! 4. Validation
//! 5. Freeze with `Arc`

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::schema::FlowConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Source label used for configurations loaded from a string.
const INLINE_SOURCE: &str = "<inline>";

// ============================================================================
// Public API
// ============================================================================

/// Limits that keep a configuration from exhausting resources.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,

    /// Maximum number of verification steps per stage.
    pub max_steps: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("DEGENSCORE_MAX_CONFIG_SIZE", 1024 * 1024),
            max_steps: env_or("DEGENSCORE_MAX_STEPS", 64),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<FlowConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({location})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
}

impl ConfigLoader {
    /// Creates a loader with the given limits.
    #[must_use]
    pub const fn new(limits: ConfigLimits) -> Self {
        Self { limits }
    }

    /// Creates a loader with limits taken from the environment.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Limits applied by this loader.
    #[must_use]
    pub const fn limits(&self) -> &ConfigLimits {
        &self.limits
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is missing, unreadable or over the size limit
    /// - A required environment variable is unset
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        self.check_size(file_size)?;

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        self.load_source(&raw, &path.display().to_string())
    }

    /// Loads a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file errors.
    pub fn load_from_str(&self, content: &str) -> Result<LoadResult, ConfigError> {
        self.check_size(content.len())?;
        self.load_source(content, INLINE_SOURCE)
    }

    fn check_size(&self, size: usize) -> Result<(), ConfigError> {
        if size > self.limits.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{size} bytes"),
                expected: format!("at most {} bytes", self.limits.max_config_size),
            });
        }
        Ok(())
    }

    fn load_source(&self, raw: &str, source: &str) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let mut env_sub = EnvSubstitution::new(source);
        let substituted = env_sub.substitute(raw)?;
        let mut warnings = env_sub.warnings;

        let config: FlowConfig = if substituted.trim().is_empty() {
            warnings.push(LoadWarning {
                message: "Configuration is empty, using built-in defaults".to_string(),
                location: Some(source.to_string()),
            });
            FlowConfig::default()
        } else {
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: source.into(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        let result = Validator::new().validate(&config, &self.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: source.to_string(),
                errors: result.errors,
            });
        }
        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        debug!(
            source,
            stages = config.stages.len(),
            warnings = warnings.len(),
            "configuration loaded"
        );
        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Substitution
// ============================================================================

/// Expands `${...}` references in raw YAML text.
struct EnvSubstitution<'a> {
    source: &'a str,
    warnings: Vec<LoadWarning>,
}

impl<'a> EnvSubstitution<'a> {
    const fn new(source: &'a str) -> Self {
        Self {
            source,
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset, with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw: &str) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = self.parse_var_spec(&mut chars)?;
                    self.expand(spec, &mut result)?;
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    fn expand(&mut self, spec: VarSpec, out: &mut String) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var(&spec.name) {
            out.push_str(&value);
            return Ok(());
        }
        match spec.fallback {
            Fallback::Default(default) => out.push_str(&default),
            Fallback::Required(message) => {
                return Err(ConfigError::EnvVarNotSet {
                    var: spec.name,
                    message,
                });
            }
            Fallback::Empty => self.warnings.push(LoadWarning {
                message: format!(
                    "Environment variable '{}' is not set, using empty string",
                    spec.name
                ),
                location: Some(self.source.to_string()),
            }),
        }
        Ok(())
    }

    /// Parses the inside of `${...}`; the opening brace is already consumed.
    fn parse_var_spec(
        &self,
        chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    ) -> Result<VarSpec, ConfigError> {
        let mut name = String::new();

        while let Some(c) = chars.next() {
            match c {
                '}' => {
                    return Ok(VarSpec {
                        name,
                        fallback: Fallback::Empty,
                    });
                }
                ':' if chars.peek() == Some(&'-') => {
                    chars.next();
                    let default = self.read_until_close(chars, &name)?;
                    return Ok(VarSpec {
                        name,
                        fallback: Fallback::Default(default),
                    });
                }
                ':' if chars.peek() == Some(&'?') => {
                    chars.next();
                    let message = self.read_until_close(chars, &name)?;
                    return Ok(VarSpec {
                        name,
                        fallback: Fallback::Required(message),
                    });
                }
                _ => name.push(c),
            }
        }

        Err(self.unclosed(&name))
    }

    /// Reads up to the matching `}`, keeping nested braces.
    fn read_until_close(
        &self,
        chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
        name: &str,
    ) -> Result<String, ConfigError> {
        let mut value = String::new();
        let mut depth = 1usize;

        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(value);
                    }
                }
                _ => {}
            }
            value.push(c);
        }

        Err(self.unclosed(name))
    }

    fn unclosed(&self, name: &str) -> ConfigError {
        ConfigError::ParseError {
            path: self.source.into(),
            line: None,
            message: format!("unclosed environment variable reference: ${{{name}"),
        }
    }
}

struct VarSpec {
    name: String,
    fallback: Fallback,
}

enum Fallback {
    Empty,
    Default(String),
    Required(String),
}

/// Reads a numeric limit from the environment, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Stage;
    use std::time::Duration;

    fn substitute(raw: &str) -> Result<(String, Vec<LoadWarning>), ConfigError> {
        let mut env_sub = EnvSubstitution::new("test.yaml");
        let out = env_sub.substitute(raw)?;
        Ok((out, env_sub.warnings))
    }

    #[test]
    fn test_load_from_str() {
        let loader = ConfigLoader::with_defaults();
        let result = loader
            .load_from_str("timing:\n  step_interval: 10ms\n")
            .unwrap();
        assert_eq!(result.config.timing.step_interval, Duration::from_millis(10));
        assert_eq!(result.config.order(), Stage::ALL);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let result = ConfigLoader::with_defaults().load_from_str("  \n").unwrap();
        assert_eq!(*result.config, FlowConfig::default());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_bom_is_stripped() {
        let result = ConfigLoader::with_defaults()
            .load_from_str("\u{feff}stages:\n  - stage: twitter\n    target_score: 10\n")
            .unwrap();
        assert_eq!(result.config.stages[0].target_score(), 10);
    }

    #[test]
    fn test_parse_error_has_line() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("stages:\n  - stage: [unclosed\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { line: Some(_), .. }));
    }

    #[test]
    fn test_validation_error() {
        let err = ConfigLoader::with_defaults()
            .load_from_str("stages: []\n")
            .unwrap_err();
        match err {
            ConfigError::ValidationError { errors, .. } => assert_eq!(errors.len(), 1),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_size_limit() {
        let loader = ConfigLoader::new(ConfigLimits {
            max_config_size: 8,
            max_steps: 64,
        });
        let err = loader.load_from_str("timing: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigLoader::with_defaults()
            .load(Path::new("/definitely/not/here.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_validation_warnings_are_returned() {
        let result = ConfigLoader::with_defaults()
            .load_from_str("stages:\n  - stage: wallet\n")
            .unwrap();
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.warnings[0].location.as_deref(), Some("stages"));
    }

    #[test]
    fn test_env_default_and_escape() {
        let (out, warnings) =
            substitute("a: ${DEGENSCORE_TEST_SURELY_UNSET:-7}\nb: $$HOME\nc: $x").unwrap();
        assert_eq!(out, "a: 7\nb: $HOME\nc: $x");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_env_set_variable() {
        let (out, _) = substitute("path: ${PATH}").unwrap();
        assert_eq!(out, format!("path: {}", std::env::var("PATH").unwrap()));
    }

    #[test]
    fn test_env_missing_warns() {
        let (out, warnings) = substitute("a: '${DEGENSCORE_TEST_SURELY_UNSET}'").unwrap();
        assert_eq!(out, "a: ''");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].location.as_deref(), Some("test.yaml"));
    }

    #[test]
    fn test_env_required() {
        let err = substitute("a: ${DEGENSCORE_TEST_SURELY_UNSET:?set the target}").unwrap_err();
        match err {
            ConfigError::EnvVarNotSet { var, message } => {
                assert_eq!(var, "DEGENSCORE_TEST_SURELY_UNSET");
                assert_eq!(message, "set the target");
            }
            other => panic!("expected EnvVarNotSet, got {other:?}"),
        }
    }

    #[test]
    fn test_env_nested_default() {
        let (out, _) = substitute("a: ${DEGENSCORE_TEST_SURELY_UNSET:-{x}}").unwrap();
        assert_eq!(out, "a: {x}");
    }

    #[test]
    fn test_env_unclosed() {
        assert!(matches!(
            substitute("a: ${OPEN"),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
