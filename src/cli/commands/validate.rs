//! The `validate` command.

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ConfigLoader;
use crate::error::{ConfigError, DegenScoreError};

/// Validate a configuration file and report the result.
///
/// # Errors
///
/// Returns the loader's `ConfigError` when the file is missing, malformed
/// or invalid. Every validation issue is printed before returning.
pub fn run(args: &ValidateArgs) -> Result<(), DegenScoreError> {
    tracing::info!(file = %args.config.display(), "validating configuration");

    let loaded = match ConfigLoader::with_defaults().load(&args.config) {
        Ok(loaded) => loaded,
        Err(err) => {
            report_failure(args, &err);
            return Err(err.into());
        }
    };

    for warning in &loaded.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    match args.format {
        OutputFormat::Human => {
            println!("{}: valid", args.config.display());
            for warning in &loaded.warnings {
                println!("  warning: {warning}");
            }
        }
        OutputFormat::Json => {
            let warnings: Vec<String> = loaded.warnings.iter().map(ToString::to_string).collect();
            let body = serde_json::json!({
                "file": args.config.display().to_string(),
                "valid": true,
                "stages": loaded.config.order(),
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    tracing::info!(file = %args.config.display(), "configuration valid");
    Ok(())
}

fn report_failure(args: &ValidateArgs, err: &ConfigError) {
    let issues: Vec<String> = match err {
        ConfigError::ValidationError { errors, .. } => {
            errors.iter().map(ToString::to_string).collect()
        }
        other => vec![other.to_string()],
    };
    match args.format {
        OutputFormat::Human => {
            eprintln!("{}: invalid", args.config.display());
            for issue in &issues {
                eprintln!("  {issue}");
            }
        }
        OutputFormat::Json => {
            let body = serde_json::json!({
                "file": args.config.display().to_string(),
                "valid": false,
                "errors": issues,
            });
            println!("{body}");
        }
    }
}
