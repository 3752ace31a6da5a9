//! Configuration validation utilities.

use braze_core::BotConfig;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, RuntimeConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RuntimeConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates the engine-facing bot settings.
fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.api_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "bot.api_timeout_secs must be greater than 0",
        ));
    }

    // An empty prefix would turn every message into a command.
    if bot.command_prefixes.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::validation(
            "bot.command_prefixes cannot contain empty strings",
        ));
    }

    Ok(())
}

/// Validates the logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output = \"file\" requires logging.file_path",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = RuntimeConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = RuntimeConfig::default();
        config.bot.api_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_command_prefix() {
        let mut config = RuntimeConfig::default();
        config.bot.command_prefixes.push(String::new());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = RuntimeConfig::default();
        config.logging.output = LogOutput::File;

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));

        config.logging.file_path = Some("braze.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
