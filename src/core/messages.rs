// src/core/messages.rs

use colored::*;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// --- MESSAGE KEYS ---

/// Keys the closed set of dispatch-failure notifications, plus any
/// embedder-defined keys created with [`MessageKey::of`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey(Cow<'static, str>);

impl MessageKey {
    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    pub fn of(key: impl Into<String>) -> Self {
        Self(Cow::Owned(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A required argument was missing from the token stream.
pub const NOT_ENOUGH_ARGUMENTS: MessageKey = MessageKey::from_static("not-enough-arguments");

/// A purely positional command received trailing tokens it cannot consume.
pub const TOO_MANY_ARGUMENTS: MessageKey = MessageKey::from_static("too-many-arguments");

/// A token was rejected by the resolver assigned to its argument.
pub const INVALID_ARGUMENT: MessageKey = MessageKey::from_static("invalid-argument");

/// No command matched the input; emitted by the embedding registry layer.
pub const UNKNOWN_COMMAND: MessageKey = MessageKey::from_static("unknown-command");

/// The caller's runtime type does not satisfy the command's declared caller type.
pub const INVALID_CALLER: MessageKey = MessageKey::from_static("invalid-caller");

/// Default key for requirements that declare no message key of their own.
pub const UNMET_REQUIREMENT: MessageKey = MessageKey::from_static("unmet-requirement");

// --- MESSAGE CONTEXTS ---

/// Structured context attached to every emitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContext {
    Default {
        parent_name: String,
        command_name: String,
    },
    InvalidArgument {
        parent_name: String,
        command_name: String,
        /// The offending raw token.
        value: String,
        /// The declared name of the argument that rejected it.
        argument: String,
        expected_type: String,
    },
}

impl MessageContext {
    pub fn parent_name(&self) -> &str {
        match self {
            Self::Default { parent_name, .. } | Self::InvalidArgument { parent_name, .. } => {
                parent_name
            }
        }
    }

    pub fn command_name(&self) -> &str {
        match self {
            Self::Default { command_name, .. } | Self::InvalidArgument { command_name, .. } => {
                command_name
            }
        }
    }

    /// `"parent name"`, or just the name for root commands.
    pub fn qualified_name(&self) -> String {
        if self.parent_name().is_empty() {
            self.command_name().to_string()
        } else {
            format!("{} {}", self.parent_name(), self.command_name())
        }
    }
}

// --- MESSAGE REGISTRY ---

type MessageResolver<C> = Arc<dyn Fn(&C, &MessageContext) + Send + Sync>;

/// Maps message keys to renderer callbacks supplied by the embedder.
///
/// Created once at startup and threaded through construction; the engine
/// reads it but never mutates it after the application reaches steady state.
pub struct MessageRegistry<C> {
    messages: HashMap<MessageKey, MessageResolver<C>>,
}

impl<C> MessageRegistry<C> {
    pub fn new() -> Self {
        Self {
            messages: HashMap::new(),
        }
    }

    /// A registry pre-loaded with colored stderr renderers for the closed
    /// key set. Embedders override individual keys with [`register`](Self::register).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(NOT_ENOUGH_ARGUMENTS, |_, ctx: &MessageContext| {
            eprintln!(
                "{} Not enough arguments for '{}'.",
                "Error:".red(),
                ctx.qualified_name().cyan()
            );
        });
        registry.register(TOO_MANY_ARGUMENTS, |_, ctx: &MessageContext| {
            eprintln!(
                "{} Too many arguments for '{}'.",
                "Error:".red(),
                ctx.qualified_name().cyan()
            );
        });
        registry.register(INVALID_ARGUMENT, |_, ctx: &MessageContext| {
            if let MessageContext::InvalidArgument {
                value,
                argument,
                expected_type,
                ..
            } = ctx
            {
                eprintln!(
                    "{} Invalid value '{}' for argument '{}' (expected {}) in '{}'.",
                    "Error:".red(),
                    value.yellow(),
                    argument.cyan(),
                    expected_type,
                    ctx.qualified_name().cyan()
                );
            }
        });
        registry.register(UNKNOWN_COMMAND, |_, ctx: &MessageContext| {
            eprintln!(
                "{} Unknown command '{}'.",
                "Error:".red(),
                ctx.qualified_name().cyan()
            );
        });
        registry.register(INVALID_CALLER, |_, ctx: &MessageContext| {
            eprintln!(
                "{} You cannot run the command '{}'.",
                "Error:".red(),
                ctx.qualified_name().cyan()
            );
        });
        registry.register(UNMET_REQUIREMENT, |_, ctx: &MessageContext| {
            eprintln!(
                "{} You do not meet the requirements to run '{}'.",
                "Error:".red(),
                ctx.qualified_name().cyan()
            );
        });
        registry
    }

    /// Registers (or replaces) the renderer for a key.
    pub fn register(
        &mut self,
        key: MessageKey,
        resolver: impl Fn(&C, &MessageContext) + Send + Sync + 'static,
    ) {
        self.messages.insert(key, Arc::new(resolver));
    }

    pub fn has_key(&self, key: &MessageKey) -> bool {
        self.messages.contains_key(key)
    }

    /// Dispatches one message. A key without a registered renderer is logged
    /// and otherwise dropped; the engine never fails because of it.
    pub fn send(&self, key: &MessageKey, caller: &C, context: MessageContext) {
        match self.messages.get(key) {
            Some(resolver) => resolver(caller, &context),
            None => log::warn!(
                "No message renderer registered for key '{}' (command '{}').",
                key,
                context.qualified_name()
            ),
        }
    }
}

impl<C> Default for MessageRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for MessageRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRegistry")
            .field("keys", &self.messages.keys().collect::<Vec<_>>())
            .finish()
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn default_context() -> MessageContext {
        MessageContext::Default {
            parent_name: "bank".to_string(),
            command_name: "pay".to_string(),
        }
    }

    #[test]
    fn test_send_reaches_registered_resolver() {
        let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let mut registry: MessageRegistry<()> = MessageRegistry::new();
        registry.register(NOT_ENOUGH_ARGUMENTS, move |_, ctx| {
            sink.lock().unwrap().push(ctx.qualified_name());
        });

        registry.send(&NOT_ENOUGH_ARGUMENTS, &(), default_context());
        assert_eq!(*received.lock().unwrap(), vec!["bank pay".to_string()]);
    }

    #[test]
    fn test_send_unregistered_key_is_silent() {
        let _ = env_logger::builder().is_test(true).try_init();
        let registry: MessageRegistry<()> = MessageRegistry::new();
        // Must not panic; the miss is logged only.
        registry.send(&TOO_MANY_ARGUMENTS, &(), default_context());
    }

    #[test]
    fn test_defaults_cover_the_closed_key_set() {
        let registry: MessageRegistry<()> = MessageRegistry::with_defaults();
        for key in [
            NOT_ENOUGH_ARGUMENTS,
            TOO_MANY_ARGUMENTS,
            INVALID_ARGUMENT,
            UNKNOWN_COMMAND,
            INVALID_CALLER,
            UNMET_REQUIREMENT,
        ] {
            assert!(registry.has_key(&key), "missing default for '{}'", key);
        }
    }

    #[test]
    fn test_invalid_argument_context_accessors() {
        let context = MessageContext::InvalidArgument {
            parent_name: String::new(),
            command_name: "pay".to_string(),
            value: "five".to_string(),
            argument: "amount".to_string(),
            expected_type: "int".to_string(),
        };
        assert_eq!(context.qualified_name(), "pay");
        assert_eq!(context.command_name(), "pay");
    }
}
