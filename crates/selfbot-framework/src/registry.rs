//! Command registry and trigger resolution.
//!
//! The registry is filled once during startup and then frozen behind an
//! `Arc`, so resolution never takes a lock.
//!
//! Resolution is a plain prefix match on the message text (after leading
//! whitespace is dropped). When several triggers are prefixes of the same
//! text, the longest one wins, so `.helpme` can coexist with `.help`.
//!
//! Every trigger starts with a punctuation prefix. The built-ins use
//! [`DEFAULT_PREFIX`]; other prefixes such as `!` are accepted so a command
//! set can live beside another bot's. A bare word is rejected because it would
//! fire on ordinary chat.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::command::{BoxedCommand, Command, CommandOptions, RegisteredCommand};
use crate::error::{RegistryError, RegistryResult};

/// Prefix shared by the built-in command triggers.
pub const DEFAULT_PREFIX: &str = ".";

/// A successful resolution of a message to a command.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The matched command.
    pub command: Arc<RegisteredCommand>,
    /// The trigger or alias that matched.
    pub trigger: String,
    /// Text following the trigger, trimmed.
    pub args: String,
}

/// Counts reported by [`CommandRegistry::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
}

/// The set of registered commands.
#[derive(Default)]
pub struct CommandRegistry {
    /// Commands in registration order.
    commands: Vec<Arc<RegisteredCommand>>,
    /// Trigger or alias -> index into `commands`.
    by_trigger: HashMap<String, usize>,
    /// Name -> index into `commands`.
    by_name: HashMap<String, usize>,
    /// Byte length of the longest trigger, bounds the prefix search.
    max_trigger_len: usize,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command with default options.
    pub fn register<C: Command>(&mut self, command: C) -> RegistryResult<()> {
        self.register_with(command, CommandOptions::default())
    }

    /// Registers a command with explicit options.
    pub fn register_with<C: Command>(
        &mut self,
        command: C,
        options: CommandOptions,
    ) -> RegistryResult<()> {
        self.register_boxed(Arc::new(command), options)
    }

    /// Registers an already type-erased command.
    ///
    /// Every check runs before anything is inserted, so a failed registration
    /// leaves the registry exactly as it was.
    pub fn register_boxed(
        &mut self,
        command: BoxedCommand,
        options: CommandOptions,
    ) -> RegistryResult<()> {
        let entry = RegisteredCommand::new(command, options);
        self.validate(&entry)?;

        let index = self.commands.len();
        for trigger in entry.triggers() {
            self.max_trigger_len = self.max_trigger_len.max(trigger.len());
            self.by_trigger.insert(trigger.to_string(), index);
        }
        self.by_name.insert(entry.name().to_string(), index);
        self.commands.push(Arc::new(entry));

        Ok(())
    }

    fn validate(&self, entry: &RegisteredCommand) -> RegistryResult<()> {
        let name = entry.name();
        if name.trim().is_empty() {
            return Err(RegistryError::invalid(name, "name must not be empty"));
        }
        if entry.description().trim().is_empty() {
            return Err(RegistryError::invalid(name, "description must not be empty"));
        }

        let mut seen: Vec<&str> = Vec::new();
        for trigger in entry.triggers() {
            if trigger.is_empty() {
                return Err(RegistryError::invalid(name, "trigger must not be empty"));
            }
            if !trigger.starts_with(|c: char| c.is_ascii_punctuation()) {
                return Err(RegistryError::invalid(
                    name,
                    format!("trigger '{trigger}' must start with a prefix like '{DEFAULT_PREFIX}'"),
                ));
            }
            if trigger.chars().any(char::is_whitespace) {
                return Err(RegistryError::invalid(
                    name,
                    format!("trigger '{trigger}' contains whitespace"),
                ));
            }
            if let Some(&existing) = self.by_trigger.get(trigger) {
                return Err(RegistryError::DuplicateTrigger {
                    trigger: trigger.to_string(),
                    existing: self.commands[existing].name().to_string(),
                });
            }
            if seen.contains(&trigger) {
                return Err(RegistryError::DuplicateTrigger {
                    trigger: trigger.to_string(),
                    existing: name.to_string(),
                });
            }
            seen.push(trigger);
        }

        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }

        Ok(())
    }

    /// Resolves message text to the command with the longest matching trigger.
    pub fn resolve(&self, text: &str) -> Option<Resolved> {
        let text = text.trim_start();
        let upper = self.max_trigger_len.min(text.len());

        (1..=upper)
            .rev()
            .filter(|&len| text.is_char_boundary(len))
            .find_map(|len| {
                let trigger = &text[..len];
                self.by_trigger.get(trigger).map(|&index| Resolved {
                    command: Arc::clone(&self.commands[index]),
                    trigger: trigger.to_string(),
                    args: text[len..].trim().to_string(),
                })
            })
    }

    /// Iterates over commands in registration order.
    pub fn list(&self) -> impl Iterator<Item = &Arc<RegisteredCommand>> {
        self.commands.iter()
    }

    /// Looks up a command by name.
    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredCommand>> {
        self.by_name.get(name).map(|&index| &self.commands[index])
    }

    /// Looks up a command the way a user would type it: by trigger or alias,
    /// by trigger with the default prefix added, or by name.
    pub fn find(&self, identifier: &str) -> Option<&Arc<RegisteredCommand>> {
        let identifier = identifier.trim();
        if let Some(&index) = self.by_trigger.get(identifier) {
            return Some(&self.commands[index]);
        }
        if !identifier.starts_with(DEFAULT_PREFIX) {
            let prefixed = format!("{DEFAULT_PREFIX}{identifier}");
            if let Some(&index) = self.by_trigger.get(prefixed.as_str()) {
                return Some(&self.commands[index]);
            }
        }
        self.get(identifier)
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Enabled and disabled command counts.
    pub fn stats(&self) -> RegistryStats {
        let enabled = self.commands.iter().filter(|c| c.is_enabled()).count();
        RegistryStats {
            total: self.commands.len(),
            enabled,
            disabled: self.commands.len() - enabled,
        }
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.len())
            .field("triggers", &self.by_trigger.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandContext, CommandOutput, FnCommand};

    fn cmd(name: &'static str, trigger: &'static str) -> BoxedCommand {
        Arc::new(FnCommand::new(
            name,
            trigger,
            format!("{name} command"),
            move |_ctx: CommandContext| async move { Ok(CommandOutput::reply(name)) },
        ))
    }

    fn registry(entries: &[(&'static str, &'static str)]) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        for &(name, trigger) in entries {
            registry
                .register_boxed(cmd(name, trigger), CommandOptions::default())
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_resolve_exact_and_with_args() {
        let registry = registry(&[("ping", ".ping"), ("help", ".help")]);

        let resolved = registry.resolve(".ping").unwrap();
        assert_eq!(resolved.command.name(), "ping");
        assert_eq!(resolved.trigger, ".ping");
        assert_eq!(resolved.args, "");

        let resolved = registry.resolve("   .help   ping  ").unwrap();
        assert_eq!(resolved.command.name(), "help");
        assert_eq!(resolved.args, "ping");
    }

    #[test]
    fn test_resolve_no_match() {
        let registry = registry(&[("ping", ".ping")]);
        assert!(registry.resolve(".unknown").is_none());
        assert!(registry.resolve("hello .ping").is_none());
        assert!(registry.resolve("").is_none());
        assert!(registry.resolve(".pin").is_none());
    }

    #[test]
    fn test_resolve_longest_trigger_wins() {
        let registry = registry(&[("help", ".help"), ("helpme", ".helpme")]);

        assert_eq!(registry.resolve(".helpme now").unwrap().command.name(), "helpme");
        assert_eq!(registry.resolve(".help me").unwrap().command.name(), "help");
    }

    #[test]
    fn test_resolve_every_unique_trigger() {
        let entries = [
            ("a", "!a"),
            ("b", ".b"),
            ("c", ".ccc"),
            ("d", "?d"),
            ("e", "emoji✨"),
        ];
        let registry = registry(&entries);
        for (name, trigger) in entries {
            let text = format!("{trigger} tail");
            assert_eq!(registry.resolve(&text).unwrap().command.name(), name);
        }
    }

    #[test]
    fn test_resolve_multibyte_text() {
        let registry = registry(&[("ping", ".ping")]);
        assert!(registry.resolve("✨✨").is_none());
        assert!(registry.resolve(".pi✨").is_none());
    }

    #[test]
    fn test_resolve_by_alias() {
        let mut registry = CommandRegistry::new();
        registry
            .register_boxed(cmd("ping", ".ping"), CommandOptions::new().alias(".p"))
            .unwrap();

        let resolved = registry.resolve(".p").unwrap();
        assert_eq!(resolved.command.name(), "ping");
        assert_eq!(resolved.trigger, ".p");
    }

    #[test]
    fn test_duplicate_trigger_is_atomic() {
        let mut registry = registry(&[("ping", ".ping")]);

        let err = registry
            .register_boxed(cmd("pong", ".ping"), CommandOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTrigger {
                trigger: ".ping".into(),
                existing: "ping".into(),
            }
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.get("pong").is_none());
        assert_eq!(registry.resolve(".ping").unwrap().command.name(), "ping");
    }

    #[test]
    fn test_duplicate_alias_leaves_registry_unchanged() {
        let mut registry = registry(&[("ping", ".ping")]);

        let options = CommandOptions::new().alias(".pg").alias(".ping");
        assert!(matches!(
            registry.register_boxed(cmd("pong", ".pong"), options),
            Err(RegistryError::DuplicateTrigger { .. })
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(".pg").is_none());
        assert!(registry.resolve(".pong").is_none());
    }

    #[test]
    fn test_alias_repeating_own_trigger() {
        let mut registry = CommandRegistry::new();
        let err = registry
            .register_boxed(cmd("ping", ".ping"), CommandOptions::new().alias(".ping"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTrigger { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_name() {
        let mut registry = registry(&[("ping", ".ping")]);
        let err = registry
            .register_boxed(cmd("ping", ".ping2"), CommandOptions::default())
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("ping".into()));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ping").unwrap().trigger(), ".ping");
        // The rejected trigger was never added; the text falls back to `.ping`.
        let resolved = registry.resolve(".ping2").unwrap();
        assert_eq!(resolved.trigger, ".ping");
        assert_eq!(resolved.args, "2");
    }

    #[test]
    fn test_invalid_commands() {
        let mut registry = CommandRegistry::new();
        let cases = [("", ".x"), ("x", ""), ("x", ". x"), ("x", "x"), ("x", "7x")];
        for (name, trigger) in cases {
            let err = registry
                .register_boxed(cmd(name, trigger), CommandOptions::default())
                .unwrap_err();
            assert!(matches!(err, RegistryError::InvalidCommand { .. }));
        }

        let blank = FnCommand::new("x", ".x", " ", |_ctx: CommandContext| async move {
            Ok(CommandOutput::silent())
        });
        assert!(matches!(
            registry.register(blank),
            Err(RegistryError::InvalidCommand { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let registry = registry(&[("zeta", ".z"), ("alpha", ".a"), ("mid", ".m")]);
        let names: Vec<_> = registry.list().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        // The listing can be restarted.
        assert_eq!(registry.list().count(), 3);
    }

    #[test]
    fn test_find() {
        let mut registry = registry(&[("ping", ".ping")]);
        registry
            .register_boxed(cmd("shout", "!shout"), CommandOptions::new().alias("!s"))
            .unwrap();

        assert_eq!(registry.find(".ping").unwrap().name(), "ping");
        assert_eq!(registry.find("ping").unwrap().name(), "ping");
        assert_eq!(registry.find("!s").unwrap().name(), "shout");
        assert_eq!(registry.find("shout").unwrap().name(), "shout");
        assert!(registry.find("nope").is_none());
    }

    #[test]
    fn test_stats() {
        let mut registry = registry(&[("ping", ".ping")]);
        registry
            .register_boxed(cmd("help", ".help"), CommandOptions::new().enabled(false))
            .unwrap();

        assert_eq!(
            registry.stats(),
            RegistryStats {
                total: 2,
                enabled: 1,
                disabled: 1,
            }
        );
    }
}
