// src/core/requirement.rs

use std::fmt;

use crate::core::messages::{MessageContext, MessageKey, MessageRegistry, UNMET_REQUIREMENT};
use crate::core::registry::RequirementResolver;

/// A named precondition over the caller, bound to its predicate at
/// registration time. Commands may carry any number of requirements; they
/// are evaluated in unspecified order and all must pass before dispatch
/// proceeds.
pub struct Requirement<C> {
    resolver: RequirementResolver<C>,
    message_key: Option<MessageKey>,
}

impl<C> Requirement<C> {
    pub(crate) fn new(resolver: RequirementResolver<C>, message_key: Option<MessageKey>) -> Self {
        Self {
            resolver,
            message_key,
        }
    }

    /// Evaluates the predicate against the caller.
    pub fn is_met(&self, caller: &C) -> bool {
        (self.resolver)(caller)
    }

    /// Emits the requirement's declared message, or the engine default.
    pub(crate) fn send_message(
        &self,
        messages: &MessageRegistry<C>,
        caller: &C,
        parent_name: &str,
        command_name: &str,
    ) {
        let key = self.message_key.clone().unwrap_or(UNMET_REQUIREMENT);
        messages.send(
            &key,
            caller,
            MessageContext::Default {
                parent_name: parent_name.to_string(),
                command_name: command_name.to_string(),
            },
        );
    }
}

impl<C> fmt::Debug for Requirement<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("message_key", &self.message_key)
            .finish()
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_is_met_delegates_to_predicate() {
        let requirement: Requirement<u32> = Requirement::new(Arc::new(|level| *level >= 5), None);
        assert!(requirement.is_met(&7));
        assert!(!requirement.is_met(&3));
    }

    #[test]
    fn test_default_message_key_is_used() {
        let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let mut messages: MessageRegistry<u32> = MessageRegistry::new();
        messages.register(UNMET_REQUIREMENT, move |_, ctx| {
            sink.lock().unwrap().push(ctx.qualified_name());
        });

        let requirement: Requirement<u32> = Requirement::new(Arc::new(|_| false), None);
        requirement.send_message(&messages, &0, "bank", "pay");
        assert_eq!(*received.lock().unwrap(), vec!["bank pay".to_string()]);
    }

    #[test]
    fn test_custom_message_key_takes_precedence() {
        let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);

        let custom = MessageKey::of("no-permission");
        let mut messages: MessageRegistry<u32> = MessageRegistry::new();
        messages.register(custom.clone(), move |_, _| {
            sink.lock().unwrap().push("custom".to_string());
        });

        let requirement: Requirement<u32> =
            Requirement::new(Arc::new(|_| false), Some(custom));
        requirement.send_message(&messages, &0, "", "pay");
        assert_eq!(*received.lock().unwrap(), vec!["custom".to_string()]);
    }
}
