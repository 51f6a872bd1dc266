//! Checks run on a loaded configuration before a bot is built from it.

use regex::Regex;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, LoggingConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &BotConfig) -> ConfigResult<()> {
    let id = &config.phone_number_id;
    if id.is_empty() {
        return Err(ConfigError::MissingField {
            field: "phone_number_id",
        });
    }
    if id.chars().any(char::is_whitespace) {
        return Err(ConfigError::invalid(
            "phone_number_id",
            "must not contain whitespace",
        ));
    }

    if let Err(e) = Regex::new(&config.conversation.end_keyword) {
        return Err(ConfigError::invalid("conversation.end_keyword", e.to_string()));
    }

    check_logging(&config.logging)
}

fn check_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    check_level("logging.level", &logging.level)?;
    if let Some(level) = &logging.dispatch_level {
        check_level("logging.dispatch_level", level)?;
    }
    for level in logging.filters.values() {
        check_level("logging.filters", level)?;
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::MissingField {
            field: "logging.file_path",
        });
    }
    Ok(())
}

fn check_level(field: &'static str, level: &str) -> ConfigResult<()> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("unknown level `{level}`, expected one of {LOG_LEVELS:?}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BotConfig {
        BotConfig {
            phone_number_id: "1234567890".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_minimal_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_missing_phone_number_id() {
        let result = validate_config(&BotConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_validate_phone_number_id_whitespace() {
        let mut config = valid();
        config.phone_number_id = "123 456".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = valid();
        config.logging.level = "invalid".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config
            .logging
            .filters
            .insert("wabot_framework".to_string(), "loud".to_string());
        assert!(validate_config(&config).is_err());

        let mut config = valid();
        config.logging.dispatch_level = Some("chatty".to_string());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidValue {
                field: "logging.dispatch_level",
                ..
            })
        ));

        config.logging.dispatch_level = Some("DEBUG".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_end_keyword() {
        let mut config = valid();
        config.conversation.end_keyword = "(unclosed".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidValue {
                field: "conversation.end_keyword",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = valid();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("bot.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
