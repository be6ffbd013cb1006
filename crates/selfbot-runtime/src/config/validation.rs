//! Configuration validation.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, RuntimeConfig};

/// Validates the configuration.
///
/// Command override names are checked later, against the commands actually
/// registered with the runtime.
pub fn validate_config(config: &RuntimeConfig) -> ConfigResult<()> {
    validate_logging(config)?;
    validate_rate_limit(config)?;
    validate_dispatch(config)?;
    validate_commands(config)?;
    Ok(())
}

fn validate_logging(config: &RuntimeConfig) -> ConfigResult<()> {
    let logging = &config.logging;

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "logging.filters contains an empty module name: {module:?}"
        )));
    }

    Ok(())
}

fn validate_rate_limit(config: &RuntimeConfig) -> ConfigResult<()> {
    let limit = &config.rate_limit;

    if limit.max_invocations == 0 {
        return Err(ConfigError::validation(
            "rate_limit.max_invocations must be greater than 0",
        ));
    }
    if limit.window_ms == 0 {
        return Err(ConfigError::validation(
            "rate_limit.window_ms must be greater than 0",
        ));
    }
    if limit.sweep_interval_ms == 0 {
        return Err(ConfigError::validation(
            "rate_limit.sweep_interval_ms must be greater than 0",
        ));
    }
    // An actor must not be evicted while still inside its window.
    if limit.idle_evict_ms < limit.window_ms {
        return Err(ConfigError::validation(format!(
            "rate_limit.idle_evict_ms ({}) must be at least rate_limit.window_ms ({})",
            limit.idle_evict_ms, limit.window_ms
        )));
    }

    Ok(())
}

fn validate_dispatch(config: &RuntimeConfig) -> ConfigResult<()> {
    let dispatch = &config.dispatch;

    if dispatch.command_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "dispatch.command_timeout_ms must be greater than 0",
        ));
    }
    if dispatch.workers == 0 {
        return Err(ConfigError::validation(
            "dispatch.workers must be greater than 0",
        ));
    }
    if dispatch.queue_capacity == 0 {
        return Err(ConfigError::validation(
            "dispatch.queue_capacity must be greater than 0",
        ));
    }

    let mut actors = dispatch
        .allowed_actors
        .iter()
        .chain(&dispatch.blocked_actors);
    if actors.any(|a| a.trim().is_empty()) {
        return Err(ConfigError::validation(
            "dispatch actor lists must not contain empty ids",
        ));
    }

    let blocked: HashSet<&str> = dispatch.blocked_actors.iter().map(String::as_str).collect();
    if let Some(actor) = dispatch
        .allowed_actors
        .iter()
        .find(|a| blocked.contains(a.as_str()))
    {
        return Err(ConfigError::validation(format!(
            "actor '{actor}' is both allowed and blocked"
        )));
    }

    Ok(())
}

fn validate_commands(config: &RuntimeConfig) -> ConfigResult<()> {
    for (name, command) in &config.commands {
        if command.timeout_ms == Some(0) {
            return Err(ConfigError::validation(format!(
                "commands.{name}.timeout_ms must be greater than 0"
            )));
        }
        if let Some(alias) = command
            .aliases
            .iter()
            .find(|a| {
                !a.starts_with(|c: char| c.is_ascii_punctuation())
                    || a.chars().any(char::is_whitespace)
            })
        {
            return Err(ConfigError::validation(format!(
                "commands.{name}.aliases contains an invalid trigger: {alias:?}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{CommandConfig, LogLevel};

    fn assert_invalid(config: &RuntimeConfig, needle: &str) {
        match validate_config(config) {
            Err(ConfigError::ValidationError { message }) => {
                assert!(message.contains(needle), "unexpected message: {message}")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RuntimeConfig::default()).is_ok());
    }

    #[test]
    fn test_rate_limit_bounds() {
        let mut config = RuntimeConfig::default();
        config.rate_limit.max_invocations = 0;
        assert_invalid(&config, "max_invocations");

        let mut config = RuntimeConfig::default();
        config.rate_limit.window_ms = 0;
        assert_invalid(&config, "window_ms");

        let mut config = RuntimeConfig::default();
        config.rate_limit.idle_evict_ms = 5_000;
        assert_invalid(&config, "idle_evict_ms");

        let mut config = RuntimeConfig::default();
        config.rate_limit.sweep_interval_ms = 0;
        assert_invalid(&config, "sweep_interval_ms");
    }

    #[test]
    fn test_dispatch_bounds() {
        let mut config = RuntimeConfig::default();
        config.dispatch.command_timeout_ms = 0;
        assert_invalid(&config, "command_timeout_ms");

        let mut config = RuntimeConfig::default();
        config.dispatch.workers = 0;
        assert_invalid(&config, "workers");

        let mut config = RuntimeConfig::default();
        config.dispatch.queue_capacity = 0;
        assert_invalid(&config, "queue_capacity");
    }

    #[test]
    fn test_conflicting_actor_lists() {
        let mut config = RuntimeConfig::default();
        config.dispatch.allowed_actors = vec!["1".into(), "2".into()];
        config.dispatch.blocked_actors = vec!["2".into()];
        assert_invalid(&config, "actor '2' is both allowed and blocked");

        config.dispatch.blocked_actors = vec![" ".into()];
        assert_invalid(&config, "empty ids");
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = RuntimeConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some("selfbot.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_filter_module() {
        let mut config = RuntimeConfig::default();
        config.logging.filters.insert(String::new(), LogLevel::Debug);
        assert_invalid(&config, "empty module name");
    }

    #[test]
    fn test_command_overrides() {
        let mut config = RuntimeConfig::default();
        config.commands.insert(
            "ping".into(),
            CommandConfig {
                timeout_ms: Some(0),
                ..CommandConfig::default()
            },
        );
        assert_invalid(&config, "commands.ping.timeout_ms");

        config.commands.insert(
            "ping".into(),
            CommandConfig {
                aliases: vec![".p ing".into()],
                ..CommandConfig::default()
            },
        );
        assert_invalid(&config, "invalid trigger");

        config.commands.insert(
            "ping".into(),
            CommandConfig {
                aliases: vec!["p".into()],
                ..CommandConfig::default()
            },
        );
        assert_invalid(&config, "invalid trigger");
    }
}
