// src/core/dispatch.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::argument::{ArgValue, ArgumentFailure};
use crate::core::builder::CommandModel;
use crate::core::caller::CallerValidator;
use crate::core::execution::{CommandExecutionError, ExecutionProvider};
use crate::core::messages::{
    INVALID_ARGUMENT, INVALID_CALLER, MessageContext, MessageRegistry, NOT_ENOUGH_ARGUMENTS,
    TOO_MANY_ARGUMENTS,
};

/// The handler body bound to a command. Receives the caller and one typed
/// value per declared argument, in declaration order; omitted optionals
/// arrive as [`ArgValue::None`].
pub type CommandHandler<C> = Arc<dyn Fn(&C, &[ArgValue]) -> anyhow::Result<()> + Send + Sync>;

/// Drives one command from raw tokens to handler invocation.
///
/// Dispatch never fails structurally: every user-input problem emits a keyed
/// message and returns `Ok(())`, keeping the engine usable. Only a failure
/// raised by the handler body itself surfaces as [`CommandExecutionError`]
/// (and only under the synchronous provider).
pub struct CommandDispatcher<C> {
    model: Arc<CommandModel<C>>,
    handler: CommandHandler<C>,
    messages: Arc<MessageRegistry<C>>,
    validator: Arc<dyn CallerValidator<C>>,
    execution: Arc<dyn ExecutionProvider>,
}

impl<C> CommandDispatcher<C> {
    /// Wires a validated model to its handler. The registrar picks the
    /// execution provider to match [`CommandModel::run_async`].
    pub fn new(
        model: Arc<CommandModel<C>>,
        handler: CommandHandler<C>,
        messages: Arc<MessageRegistry<C>>,
        validator: Arc<dyn CallerValidator<C>>,
        execution: Arc<dyn ExecutionProvider>,
    ) -> Self {
        Self {
            model,
            handler,
            messages,
            validator,
            execution,
        }
    }

    pub fn model(&self) -> &CommandModel<C> {
        &self.model
    }

    fn default_context(&self) -> MessageContext {
        MessageContext::Default {
            parent_name: self.model.parent_name().to_string(),
            command_name: self.model.name().to_string(),
        }
    }

    fn send_failure(&self, caller: &C, failure: ArgumentFailure) {
        match failure {
            ArgumentFailure::Invalid {
                token,
                argument,
                type_name,
            } => self.messages.send(
                &INVALID_ARGUMENT,
                caller,
                MessageContext::InvalidArgument {
                    parent_name: self.model.parent_name().to_string(),
                    command_name: self.model.name().to_string(),
                    value: token,
                    argument,
                    expected_type: type_name,
                },
            ),
            ArgumentFailure::MissingRequired => {
                self.messages
                    .send(&NOT_ENOUGH_ARGUMENTS, caller, self.default_context());
            }
        }
    }

    /// Walks the declared arguments over the token stream, producing one
    /// typed value per argument. `None` means a message was already emitted
    /// and the invocation is over.
    fn validate_and_collect(&self, caller: &C, tokens: &[String]) -> Option<Vec<ArgValue>> {
        let mut values = Vec::with_capacity(self.model.arguments().len());
        let mut cursor = 0usize;

        for argument in self.model.arguments() {
            if argument.is_limitless() {
                // Final by construction: absorb everything that is left.
                let leftovers = tokens.get(cursor..).unwrap_or(&[]);
                match argument.resolve_remaining(caller, leftovers) {
                    Ok(value) => {
                        values.push(value);
                        cursor = tokens.len();
                    }
                    Err(failure) => {
                        self.send_failure(caller, failure);
                        return None;
                    }
                }
                continue;
            }

            match tokens.get(cursor) {
                Some(token) if !token.is_empty() => {
                    match argument.resolve_single(caller, token) {
                        Ok(value) => {
                            log::trace!(
                                "Command '{}': argument '{}' resolved from '{}'.",
                                self.model.qualified_name(),
                                argument.name(),
                                token
                            );
                            values.push(value);
                            cursor += 1;
                        }
                        Err(failure) => {
                            self.send_failure(caller, failure);
                            return None;
                        }
                    }
                }
                // An empty token counts as missing.
                token => {
                    if !argument.is_optional() {
                        self.messages
                            .send(&NOT_ENOUGH_ARGUMENTS, caller, self.default_context());
                        return None;
                    }
                    if token.is_some() {
                        cursor += 1;
                    }
                    values.push(ArgValue::None);
                }
            }
        }

        if cursor < tokens.len() {
            self.messages
                .send(&TOO_MANY_ARGUMENTS, caller, self.default_context());
            return None;
        }

        Some(values)
    }

    /// Resolves and invokes: caller validation, requirements, argument
    /// collection, surplus check, then exactly one handler invocation.
    pub fn execute(
        &self,
        caller: &Arc<C>,
        tokens: &[String],
    ) -> Result<(), CommandExecutionError>
    where
        C: Send + Sync + 'static,
    {
        log::debug!(
            "Dispatching '{}' with {} token(s).",
            self.model.qualified_name(),
            tokens.len()
        );

        if !self
            .validator
            .is_compatible(self.model.caller_type(), caller)
        {
            self.messages
                .send(&INVALID_CALLER, caller, self.default_context());
            return Ok(());
        }

        for requirement in self.model.requirements() {
            if !requirement.is_met(caller) {
                requirement.send_message(
                    &self.messages,
                    caller,
                    self.model.parent_name(),
                    self.model.name(),
                );
                return Ok(());
            }
        }

        let Some(values) = self.validate_and_collect(caller, tokens) else {
            return Ok(());
        };

        let handler = Arc::clone(&self.handler);
        let caller = Arc::clone(caller);
        let parent_name = self.model.parent_name().to_string();
        let name = self.model.name().to_string();

        self.execution.execute(Box::new(move || {
            handler(caller.as_ref(), &values).map_err(|source| CommandExecutionError {
                parent_name,
                name,
                source,
            })
        }))
    }

    /// Named-argument entry point: values arrive keyed by argument name
    /// instead of by position. Names absent from the map become empty tokens,
    /// which count as missing.
    pub fn execute_named(
        &self,
        caller: &Arc<C>,
        named: &HashMap<String, String>,
    ) -> Result<(), CommandExecutionError>
    where
        C: Send + Sync + 'static,
    {
        let tokens = self.map_arguments(named);
        self.execute(caller, &tokens)
    }

    /// Reorders a name-keyed value map into the declared positional order.
    fn map_arguments(&self, named: &HashMap<String, String>) -> Vec<String> {
        self.model
            .arguments()
            .iter()
            .map(|argument| named.get(argument.name()).cloned().unwrap_or_default())
            .collect()
    }
}

impl<C> fmt::Debug for CommandDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("command", &self.model.qualified_name())
            .field("run_async", &self.model.run_async())
            .finish()
    }
}

// MARK: --- UNIT TESTS ---
