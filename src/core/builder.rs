// src/core/builder.rs

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::constants::DEFAULT_DESCRIPTION;
use crate::core::argument::{Argument, ArgumentMeta};
use crate::core::caller::CallerValidator;
use crate::core::flags::{FlagGroup, FlagOptions};
use crate::core::messages::MessageKey;
use crate::core::registry::{RequirementRegistry, ResolverRegistry};
use crate::core::requirement::Requirement;
use crate::models::{CallerTag, CommandDescriptor, ParameterSpec, TypeTag};

// --- REGISTRATION ERRORS ---

/// A descriptor rejected at registration time. Registration failures are
/// fatal to the command being registered and never reach dispatch.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The descriptor declares a caller type outside the platform
    /// validator's allow-list.
    #[error("Command '{command}' declares the caller type '{caller}'; the platform accepts only {allowed:?}.")]
    InvalidCallerType {
        command: String,
        caller: String,
        allowed: Vec<String>,
    },

    /// A parameter or flag value names a type with no registered resolver
    /// and no enumeration fallback.
    #[error("Command '{command}' uses the argument type '{type_name}', which has no registered resolver.")]
    UnregisteredArgumentType { command: String, type_name: String },

    /// A flag declaration is malformed: missing both identifiers, an
    /// identifier with whitespace or a leading '-', or a conflicting id.
    #[error("Command '{command}' declares an invalid flag: {reason}.")]
    InvalidFlag { command: String, reason: String },

    /// A requirement references a key absent from the requirement registry.
    #[error("Command '{command}' references the unknown requirement key '{key}'.")]
    UnknownRequirementKey { command: String, key: String },

    /// An optional argument is followed by further arguments.
    #[error("Command '{command}': the optional argument '{argument}' must be the last argument.")]
    OptionalNotLast { command: String, argument: String },

    /// An argument that consumes all remaining tokens is not in final
    /// position.
    #[error("Command '{command}': the argument '{argument}' consumes all remaining input and must be last.")]
    LimitlessNotLast { command: String, argument: String },

    /// A flag-carrier argument exists but the descriptor declares no flags.
    #[error("Command '{command}' declares a flag-carrier argument but no flags.")]
    EmptyFlagGroup { command: String },

    /// A split pattern failed to compile.
    #[error("Command '{command}': the split pattern of argument '{argument}' is not a valid regex.")]
    InvalidSplitPattern {
        command: String,
        argument: String,
        #[source]
        source: regex::Error,
    },

    /// A modifier combination the argument vocabulary cannot express.
    #[error("Command '{command}': the argument '{argument}' carries unsupported modifiers ({reason}).")]
    UnsupportedModifiers {
        command: String,
        argument: String,
        reason: String,
    },
}

// --- NAME CANONICALIZATION ---

lazy_static! {
    static ref CAMEL_BOUNDARY_RE: Regex = Regex::new(r"([a-z0-9])([A-Z])").unwrap();
}

/// Canonicalizes a declared identifier (`lowerCamel` or `snake_case`) into
/// the lower-hyphen form users type.
pub fn canonicalize_name(declared: &str) -> String {
    CAMEL_BOUNDARY_RE
        .replace_all(declared, "$1-$2")
        .replace('_', "-")
        .to_ascii_lowercase()
}

// --- COMMAND MODEL ---

/// A fully validated command: the output of [`build_command`]. Immutable
/// after construction and safe to share across dispatching threads.
#[derive(Debug)]
pub struct CommandModel<C> {
    parent_name: String,
    name: String,
    aliases: Vec<String>,
    description: String,
    caller_type: CallerTag,
    arguments: Vec<Argument<C>>,
    requirements: Vec<Requirement<C>>,
    named_arguments: bool,
    run_async: bool,
    contains_limitless: bool,
}

impl<C> CommandModel<C> {
    pub fn parent_name(&self) -> &str {
        &self.parent_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"parent name"`, or just the name for root commands.
    pub fn qualified_name(&self) -> String {
        if self.parent_name.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.parent_name, self.name)
        }
    }

    /// Lowercased alternative names the embedder may route to this command.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn caller_type(&self) -> &CallerTag {
        &self.caller_type
    }

    pub fn arguments(&self) -> &[Argument<C>] {
        &self.arguments
    }

    pub fn requirements(&self) -> &[Requirement<C>] {
        &self.requirements
    }

    pub fn named_arguments(&self) -> bool {
        self.named_arguments
    }

    pub fn run_async(&self) -> bool {
        self.run_async
    }

    /// Whether the final argument consumes all remaining tokens.
    pub fn contains_limitless(&self) -> bool {
        self.contains_limitless
    }

    /// Finds an argument by name: exact match (case-insensitive) first, then
    /// a unique case-insensitive prefix. An ambiguous prefix finds nothing.
    pub fn argument(&self, name: &str) -> Option<&Argument<C>> {
        if let Some(exact) = self
            .arguments
            .iter()
            .find(|argument| argument.name().eq_ignore_ascii_case(name))
        {
            return Some(exact);
        }

        let lowered = name.to_ascii_lowercase();
        let mut matches = self
            .arguments
            .iter()
            .filter(|argument| argument.name().to_ascii_lowercase().starts_with(&lowered));

        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

// --- BUILDER ---

/// Validates a descriptor against the registries and the platform caller
/// validator, producing the immutable command model dispatch runs against.
///
/// Every failure mode is a [`RegistrationError`]; a descriptor that builds
/// successfully can no longer fail structurally at dispatch time.
pub fn build_command<C>(
    descriptor: &CommandDescriptor,
    resolvers: &ResolverRegistry<C>,
    requirements: &RequirementRegistry<C>,
    validator: &dyn CallerValidator<C>,
) -> Result<CommandModel<C>, RegistrationError> {
    let command = descriptor.qualified_name();
    log::debug!("Building command model for '{}'.", command);

    let allowed = validator.allowed();
    if !allowed.contains(&descriptor.caller) {
        return Err(RegistrationError::InvalidCallerType {
            command,
            caller: descriptor.caller.to_string(),
            allowed: allowed.iter().map(|tag| tag.to_string()).collect(),
        });
    }

    let mut flag_group = if descriptor.flags.is_empty() {
        None
    } else {
        Some(build_flag_group(descriptor, resolvers)?)
    };

    let mut requirement_list = Vec::with_capacity(descriptor.requirements.len());
    for spec in &descriptor.requirements {
        let resolver = requirements.requirement(&spec.key).ok_or_else(|| {
            RegistrationError::UnknownRequirementKey {
                command: command.clone(),
                key: spec.key.clone(),
            }
        })?;
        let message_key = spec.message_key.as_deref().map(MessageKey::of);
        requirement_list.push(Requirement::new(resolver, message_key));
    }

    let mut arguments = Vec::with_capacity(descriptor.parameters.len());
    for (position, spec) in descriptor.parameters.iter().enumerate() {
        let argument = build_argument(descriptor, spec, position, resolvers, &mut flag_group)?;
        log::trace!(
            "Command '{}': built argument '{}' at position {}.",
            command,
            argument.name(),
            position
        );
        arguments.push(argument);
    }

    // Declared flags that no argument carries would never reach the handler.
    if flag_group.is_some() {
        return Err(RegistrationError::InvalidFlag {
            command,
            reason: "flags are declared but no argument carries them".to_string(),
        });
    }

    let last = arguments.len().saturating_sub(1);
    for (position, argument) in arguments.iter().enumerate() {
        if argument.is_limitless() && position != last {
            return Err(RegistrationError::LimitlessNotLast {
                command,
                argument: argument.name().to_string(),
            });
        }
        // In named-argument mode every argument is addressed by name, so
        // positional ordering of optionals is irrelevant.
        if argument.is_optional() && position != last && !descriptor.named_arguments {
            return Err(RegistrationError::OptionalNotLast {
                command,
                argument: argument.name().to_string(),
            });
        }
    }

    let contains_limitless = arguments.last().is_some_and(Argument::is_limitless);

    Ok(CommandModel {
        parent_name: descriptor.parent_name.clone(),
        name: descriptor.name.clone(),
        aliases: descriptor
            .aliases
            .iter()
            .map(|alias| alias.to_ascii_lowercase())
            .collect(),
        description: descriptor
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        caller_type: descriptor.caller.clone(),
        arguments,
        requirements: requirement_list,
        named_arguments: descriptor.named_arguments,
        run_async: descriptor.run_async,
        contains_limitless,
    })
}

fn build_flag_group<C>(
    descriptor: &CommandDescriptor,
    resolvers: &ResolverRegistry<C>,
) -> Result<FlagGroup<C>, RegistrationError> {
    let command = descriptor.qualified_name();
    let mut group = FlagGroup::new(descriptor.unknown_flags);

    for spec in &descriptor.flags {
        if spec.short.is_none() && spec.long.is_none() {
            return Err(RegistrationError::InvalidFlag {
                command,
                reason: "a flag needs a short or a long identifier".to_string(),
            });
        }

        for id in [spec.short.as_deref(), spec.long.as_deref()]
            .into_iter()
            .flatten()
        {
            validate_flag_id(&command, id)?;
            if group
                .claimed_ids()
                .iter()
                .any(|claimed| claimed.eq_ignore_ascii_case(id))
            {
                return Err(RegistrationError::InvalidFlag {
                    command,
                    reason: format!("the identifier '{}' is declared more than once", id),
                });
            }
        }

        let value = match &spec.value_type {
            Some(type_tag) => {
                let id = spec.long.as_deref().or(spec.short.as_deref()).unwrap_or("");
                let meta = ArgumentMeta {
                    name: id.to_string(),
                    description: DEFAULT_DESCRIPTION.to_string(),
                    type_name: type_tag.name().to_string(),
                    position: 0,
                    optional: spec.optional_value,
                };
                Some(build_element(&command, type_tag, meta, resolvers)?)
            }
            None => None,
        };

        group.add(FlagOptions::new(
            spec.short.clone(),
            spec.long.clone(),
            value,
            spec.optional_value,
            spec.required,
        ));
    }

    Ok(group)
}

fn validate_flag_id(command: &str, id: &str) -> Result<(), RegistrationError> {
    let reason = if id.is_empty() {
        Some("a flag identifier must not be empty")
    } else if id.chars().any(char::is_whitespace) {
        Some("a flag identifier must not contain whitespace")
    } else if id.starts_with('-') {
        Some("a flag identifier must not start with '-'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RegistrationError::InvalidFlag {
            command: command.to_string(),
            reason: format!("{} ('{}')", reason, id),
        }),
        None => Ok(()),
    }
}

/// Builds a single-token argument from a type tag: the registered resolver
/// wins; an enumeration without one falls back to the built-in variant
/// matcher; anything else is unresolvable.
fn build_element<C>(
    command: &str,
    type_tag: &TypeTag,
    meta: ArgumentMeta,
    resolvers: &ResolverRegistry<C>,
) -> Result<Argument<C>, RegistrationError> {
    if let Some(resolver) = resolvers.resolver(type_tag.name()) {
        return Ok(Argument::Resolved { meta, resolver });
    }

    if let TypeTag::Enumeration { variants, .. } = type_tag {
        return Ok(Argument::Enumeration {
            meta,
            variants: variants.clone(),
        });
    }

    Err(RegistrationError::UnregisteredArgumentType {
        command: command.to_string(),
        type_name: type_tag.name().to_string(),
    })
}

fn build_argument<C>(
    descriptor: &CommandDescriptor,
    spec: &ParameterSpec,
    position: usize,
    resolvers: &ResolverRegistry<C>,
    flag_group: &mut Option<FlagGroup<C>>,
) -> Result<Argument<C>, RegistrationError> {
    let command = descriptor.qualified_name();
    let name = spec
        .name_override
        .clone()
        .unwrap_or_else(|| canonicalize_name(&spec.declared_name));
    let description = spec
        .description
        .clone()
        .or_else(|| descriptor.arg_descriptions.get(position).cloned())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
    let optional = spec.modifiers.optional || descriptor.named_arguments;

    let meta = ArgumentMeta {
        name: name.clone(),
        description,
        type_name: spec.type_tag.name().to_string(),
        position,
        optional,
    };

    let modifiers = &spec.modifiers;
    let unsupported = |reason: &str| RegistrationError::UnsupportedModifiers {
        command: command.clone(),
        argument: name.clone(),
        reason: reason.to_string(),
    };

    if modifiers.flag_carrier {
        if modifiers.join.is_some() || modifiers.split.is_some() || modifiers.collection.is_some()
        {
            return Err(unsupported("a flag carrier takes no shape modifiers"));
        }
        let Some(group) = flag_group.take() else {
            return Err(if descriptor.flags.is_empty() {
                RegistrationError::EmptyFlagGroup { command }
            } else {
                RegistrationError::InvalidFlag {
                    command,
                    reason: "the flag group is already carried by an earlier argument"
                        .to_string(),
                }
            });
        };
        return Ok(Argument::FlagCarrier { meta, group });
    }

    if let Some(kind) = modifiers.collection {
        if modifiers.join.is_some() {
            return Err(unsupported("join applies only to plain string arguments"));
        }
        let element_meta = ArgumentMeta {
            name: name.clone(),
            description: meta.description.clone(),
            type_name: meta.type_name.clone(),
            position,
            optional: false,
        };
        let element = Box::new(build_element(
            &command,
            &spec.type_tag,
            element_meta,
            resolvers,
        )?);

        return match &modifiers.split {
            Some(pattern) => {
                let pattern = Regex::new(pattern).map_err(|source| {
                    RegistrationError::InvalidSplitPattern {
                        command: command.clone(),
                        argument: name.clone(),
                        source,
                    }
                })?;
                Ok(Argument::SplitString {
                    meta,
                    pattern,
                    kind,
                    element,
                })
            }
            None => Ok(Argument::Collection {
                meta,
                kind,
                element,
            }),
        };
    }

    if modifiers.split.is_some() {
        return Err(unsupported("split applies only to collection arguments"));
    }

    if let Some(separator) = &modifiers.join {
        if spec.type_tag != TypeTag::string() {
            return Err(unsupported("join applies only to string arguments"));
        }
        return Ok(Argument::JoinedString {
            meta,
            separator: separator.clone(),
        });
    }

    build_element(&command, &spec.type_tag, meta, resolvers)
}

// MARK: --- UNIT TESTS ---
