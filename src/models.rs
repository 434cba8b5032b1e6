// src/models.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{TYPE_BOOL, TYPE_FLAGS, TYPE_FLOAT, TYPE_INT, TYPE_STRING};

// --- DESCRIPTOR MODELS ---
// These are the primary structures an embedder hands to the builder. They are
// plain data: the core never inspects source-language metadata, so a binding
// layer (or a config file, via serde) must produce one of these per handler.

/// Identifies the value type of a declared parameter or flag value.
///
/// `Value` types resolve through the [`ResolverRegistry`](crate::core::registry::ResolverRegistry)
/// by name. `Enumeration` types resolve through the registry first; when no
/// resolver is registered for the name, a built-in case-insensitive variant
/// matcher takes over.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Value(String),
    Enumeration { name: String, variants: Vec<String> },
}

impl TypeTag {
    pub fn value(name: impl Into<String>) -> Self {
        Self::Value(name.into())
    }

    pub fn enumeration(name: impl Into<String>, variants: &[&str]) -> Self {
        Self::Enumeration {
            name: name.into(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// The registry lookup name of this type.
    pub fn name(&self) -> &str {
        match self {
            Self::Value(name) => name,
            Self::Enumeration { name, .. } => name,
        }
    }

    pub fn string() -> Self {
        Self::value(TYPE_STRING)
    }

    pub fn int() -> Self {
        Self::value(TYPE_INT)
    }

    pub fn float() -> Self {
        Self::value(TYPE_FLOAT)
    }

    pub fn bool() -> Self {
        Self::value(TYPE_BOOL)
    }
}

/// Tags the kind of caller a command accepts (e.g. "player", "console").
/// The meaning of a tag is entirely up to the embedding platform's
/// [`CallerValidator`](crate::core::caller::CallerValidator).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerTag(String);

impl CallerTag {
    pub fn of(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The wildcard tag accepted by the built-in tag validator.
    pub fn any() -> Self {
        Self::of("any")
    }

    pub fn is_any(&self) -> bool {
        self.0 == "any"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shape of a collection parameter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// An ordered sequence; duplicates are kept.
    Sequence,
    /// An order-preserving set; duplicates are dropped after first occurrence.
    Set,
}

/// Declarative modifiers of a single parameter.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterModifiers {
    #[serde(default)]
    pub optional: bool,
    /// Join all remaining tokens with this separator (string parameters only).
    #[serde(default)]
    pub join: Option<String>,
    /// Split a single token into collection elements by this regex pattern.
    #[serde(default)]
    pub split: Option<String>,
    /// The parameter is a collection of the declared element type.
    #[serde(default)]
    pub collection: Option<CollectionKind>,
    /// The parameter is the reserved flag-carrier slot.
    #[serde(default)]
    pub flag_carrier: bool,
}

/// One declared handler parameter, excluding the caller slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub type_tag: TypeTag,
    /// The identifier as declared on the handler (`lowerCamel` or
    /// `snake_case`); canonicalized to lower-hyphen unless overridden.
    pub declared_name: String,
    #[serde(default)]
    pub name_override: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub modifiers: ParameterModifiers,
}

impl ParameterSpec {
    /// A plain value parameter resolved via the resolver registry.
    pub fn value(declared_name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            type_tag,
            declared_name: declared_name.into(),
            name_override: None,
            description: None,
            modifiers: ParameterModifiers::default(),
        }
    }

    /// An ordered sequence of the given element type.
    pub fn sequence(declared_name: impl Into<String>, element: TypeTag) -> Self {
        let mut spec = Self::value(declared_name, element);
        spec.modifiers.collection = Some(CollectionKind::Sequence);
        spec
    }

    /// An order-preserving set of the given element type.
    pub fn set(declared_name: impl Into<String>, element: TypeTag) -> Self {
        let mut spec = Self::value(declared_name, element);
        spec.modifiers.collection = Some(CollectionKind::Set);
        spec
    }

    /// A string parameter that joins all remaining tokens with `separator`.
    pub fn joined(declared_name: impl Into<String>, separator: impl Into<String>) -> Self {
        let mut spec = Self::value(declared_name, TypeTag::string());
        spec.modifiers.join = Some(separator.into());
        spec
    }

    /// The reserved flag-carrier parameter.
    pub fn flags(declared_name: impl Into<String>) -> Self {
        let mut spec = Self::value(declared_name, TypeTag::value(TYPE_FLAGS));
        spec.modifiers.flag_carrier = true;
        spec
    }

    pub fn optional(mut self) -> Self {
        self.modifiers.optional = true;
        self
    }

    /// Splits the single consumed token by the given regex pattern
    /// (collection parameters only).
    pub fn split(mut self, pattern: impl Into<String>) -> Self {
        self.modifiers.split = Some(pattern.into());
        self
    }

    /// Overrides the canonicalized argument name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name_override = Some(name.into());
        self
    }

    pub fn described(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Policy for flag-section tokens that match no declared flag.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownFlagPolicy {
    /// Skip the token silently.
    #[default]
    Ignore,
    /// Fail resolution for the whole invocation.
    Reject,
}

/// One declared flag: a short id (`-f`), a long id (`--force`), or both,
/// with an optionally typed value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    /// Type of the flag's value. `None` means the flag is a bare switch.
    #[serde(default)]
    pub value_type: Option<TypeTag>,
    /// The value may be omitted even though a value type is declared.
    #[serde(default)]
    pub optional_value: bool,
    /// The flag must be present on every invocation.
    #[serde(default)]
    pub required: bool,
}

impl FlagSpec {
    pub fn short(id: impl Into<String>) -> Self {
        Self {
            short: Some(id.into()),
            long: None,
            value_type: None,
            optional_value: false,
            required: false,
        }
    }

    pub fn long(id: impl Into<String>) -> Self {
        Self {
            short: None,
            long: Some(id.into()),
            value_type: None,
            optional_value: false,
            required: false,
        }
    }

    pub fn with_long(mut self, id: impl Into<String>) -> Self {
        self.long = Some(id.into());
        self
    }

    pub fn with_value(mut self, type_tag: TypeTag) -> Self {
        self.value_type = Some(type_tag);
        self
    }

    pub fn value_optional(mut self) -> Self {
        self.optional_value = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A named precondition reference, resolved against the
/// [`RequirementRegistry`](crate::core::registry::RequirementRegistry) at
/// registration time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequirementSpec {
    pub key: String,
    /// Message key to emit when unmet; defaults to the engine's
    /// unmet-requirement key.
    #[serde(default)]
    pub message_key: Option<String>,
}

impl RequirementSpec {
    pub fn of(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message_key: None,
        }
    }

    pub fn with_message(mut self, key: impl Into<String>) -> Self {
        self.message_key = Some(key.into());
        self
    }
}

/// Static metadata describing one command handler: its caller type, ordered
/// parameters, flags, requirements and execution mode. Built once, validated
/// once, then immutable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Name of the parent command ("" for root commands). Flows into every
    /// message context.
    pub parent_name: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Positional default descriptions, used when a parameter declares none.
    #[serde(default)]
    pub arg_descriptions: Vec<String>,
    /// The caller-type tag of the handler's first parameter.
    pub caller: CallerTag,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub flags: Vec<FlagSpec>,
    #[serde(default)]
    pub requirements: Vec<RequirementSpec>,
    /// Dispatch receives name→value pairs instead of positional tokens.
    #[serde(default)]
    pub named_arguments: bool,
    /// Hand the invocation off to the asynchronous execution provider.
    #[serde(default)]
    pub run_async: bool,
    #[serde(default)]
    pub unknown_flags: UnknownFlagPolicy,
}

impl CommandDescriptor {
    pub fn new(
        parent_name: impl Into<String>,
        name: impl Into<String>,
        caller: CallerTag,
    ) -> Self {
        Self {
            parent_name: parent_name.into(),
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            arg_descriptions: Vec::new(),
            caller,
            parameters: Vec::new(),
            flags: Vec::new(),
            requirements: Vec::new(),
            named_arguments: false,
            run_async: false,
            unknown_flags: UnknownFlagPolicy::default(),
        }
    }

    /// `"parent name"`, or just the name for root commands.
    pub fn qualified_name(&self) -> String {
        if self.parent_name.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.parent_name, self.name)
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn with_requirement(mut self, requirement: RequirementSpec) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn with_arg_descriptions(mut self, descriptions: &[&str]) -> Self {
        self.arg_descriptions = descriptions.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn named_arguments(mut self) -> Self {
        self.named_arguments = true;
        self
    }

    pub fn run_async(mut self) -> Self {
        self.run_async = true;
        self
    }

    pub fn with_unknown_flags(mut self, policy: UnknownFlagPolicy) -> Self {
        self.unknown_flags = policy;
        self
    }
}

// MARK: --- UNIT TESTS ---
