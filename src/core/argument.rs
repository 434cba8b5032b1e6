// src/core/argument.rs

use regex::Regex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::core::flags::{FlagGroup, FlagSet};
use crate::core::registry::ArgumentResolver;
use crate::models::CollectionKind;

// --- TYPED VALUES ---

/// The typed value a resolver produces and a handler receives.
///
/// `None` is the placeholder appended for an omitted optional argument.
/// `Other` carries embedder-defined types behind `Any`; two `Other` values
/// compare equal only when they share the same allocation.
#[derive(Clone)]
pub enum ArgValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Sequence(Vec<ArgValue>),
    Set(Vec<ArgValue>),
    Flags(FlagSet),
    Other(Arc<dyn Any + Send + Sync>),
}

impl ArgValue {
    pub fn other<T: Any + Send + Sync>(value: T) -> Self {
        Self::Other(Arc::new(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[ArgValue]> {
        match self {
            Self::Sequence(values) | Self::Set(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&FlagSet> {
        match self {
            Self::Flags(set) => Some(set),
            _ => None,
        }
    }

    /// Downcasts an `Other` value to a concrete embedder type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Self::Other(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Sequence(a), Self::Sequence(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Flags(a), Self::Flags(b)) => a == b,
            (Self::Other(a), Self::Other(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(value) => write!(f, "Bool({})", value),
            Self::Int(value) => write!(f, "Int({})", value),
            Self::Float(value) => write!(f, "Float({})", value),
            Self::Text(value) => write!(f, "Text({:?})", value),
            Self::Sequence(values) => f.debug_tuple("Sequence").field(values).finish(),
            Self::Set(values) => f.debug_tuple("Set").field(values).finish(),
            Self::Flags(set) => f.debug_tuple("Flags").field(set).finish(),
            Self::Other(_) => f.write_str("Other(..)"),
        }
    }
}

// --- ARGUMENT MODEL ---

/// Identity shared by every argument variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentMeta {
    pub name: String,
    pub description: String,
    /// Display name of the expected type, used in invalid-argument messages.
    pub type_name: String,
    pub position: usize,
    pub optional: bool,
}

/// Why a single argument failed to resolve. The dispatch engine turns these
/// into user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentFailure {
    /// A token was present but the resolver rejected it.
    Invalid {
        token: String,
        argument: String,
        type_name: String,
    },
    /// A required argument (or required flag) had no token to consume.
    MissingRequired,
}

/// One declared parameter of a command, after registration-time validation.
///
/// The closed variant set is the engine's whole argument vocabulary: every
/// variant is either single-token (`Resolved`, `Enumeration`, `SplitString`)
/// or limitless (`JoinedString`, `Collection`, `FlagCarrier`), so dispatch
/// handles each argument in exactly one of the two resolution paths.
pub enum Argument<C> {
    /// Resolves one token via the assigned registry resolver.
    Resolved {
        meta: ArgumentMeta,
        resolver: ArgumentResolver<C>,
    },
    /// Built-in fallback for enumeration types without a registered resolver;
    /// matches the token case-insensitively and yields the canonical variant.
    Enumeration {
        meta: ArgumentMeta,
        variants: Vec<String>,
    },
    /// Concatenates all remaining tokens with a fixed separator.
    JoinedString {
        meta: ArgumentMeta,
        separator: String,
    },
    /// Splits one token by a pattern and resolves each piece via `element`.
    SplitString {
        meta: ArgumentMeta,
        pattern: Regex,
        kind: CollectionKind,
        element: Box<Argument<C>>,
    },
    /// Resolves every remaining token via `element` into a sequence or set.
    Collection {
        meta: ArgumentMeta,
        kind: CollectionKind,
        element: Box<Argument<C>>,
    },
    /// Parses the flag-bearing remainder of the token stream.
    FlagCarrier {
        meta: ArgumentMeta,
        group: FlagGroup<C>,
    },
}

impl<C> Argument<C> {
    pub fn meta(&self) -> &ArgumentMeta {
        match self {
            Self::Resolved { meta, .. }
            | Self::Enumeration { meta, .. }
            | Self::JoinedString { meta, .. }
            | Self::SplitString { meta, .. }
            | Self::Collection { meta, .. }
            | Self::FlagCarrier { meta, .. } => meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn is_optional(&self) -> bool {
        self.meta().optional
    }

    /// Whether this argument consumes all remaining tokens as a single unit.
    /// At most one limitless argument may exist, and only in final position.
    pub fn is_limitless(&self) -> bool {
        matches!(
            self,
            Self::JoinedString { .. } | Self::Collection { .. } | Self::FlagCarrier { .. }
        )
    }

    fn invalid(&self, token: &str) -> ArgumentFailure {
        ArgumentFailure::Invalid {
            token: token.to_string(),
            argument: self.meta().name.clone(),
            type_name: self.meta().type_name.clone(),
        }
    }

    /// Resolves a single token. Only meaningful for non-limitless variants;
    /// dispatch guarantees the split by construction.
    pub fn resolve_single(&self, caller: &C, token: &str) -> Result<ArgValue, ArgumentFailure> {
        match self {
            Self::Resolved { resolver, .. } => {
                resolver(caller, token).ok_or_else(|| self.invalid(token))
            }
            Self::Enumeration { variants, .. } => variants
                .iter()
                .find(|variant| variant.eq_ignore_ascii_case(token))
                .map(|variant| ArgValue::Text(variant.clone()))
                .ok_or_else(|| self.invalid(token)),
            Self::SplitString {
                pattern,
                kind,
                element,
                ..
            } => {
                let mut values = Vec::new();
                for piece in pattern.split(token).filter(|piece| !piece.is_empty()) {
                    values.push(element.resolve_single(caller, piece)?);
                }
                Ok(collect_values(*kind, values))
            }
            // Limitless variants never reach the single-token path.
            _ => Err(self.invalid(token)),
        }
    }

    /// Resolves all remaining tokens as one unit (limitless variants only).
    /// An empty remainder is valid and yields the variant's empty value.
    pub fn resolve_remaining(
        &self,
        caller: &C,
        leftovers: &[String],
    ) -> Result<ArgValue, ArgumentFailure> {
        match self {
            Self::JoinedString { separator, .. } => {
                Ok(ArgValue::Text(leftovers.join(separator.as_str())))
            }
            Self::Collection { kind, element, .. } => {
                let mut values = Vec::with_capacity(leftovers.len());
                for token in leftovers {
                    values.push(element.resolve_single(caller, token)?);
                }
                Ok(collect_values(*kind, values))
            }
            Self::FlagCarrier { group, .. } => {
                group.parse(caller, leftovers).map(ArgValue::Flags)
            }
            // Single-token variants never reach the limitless path.
            _ => Err(ArgumentFailure::MissingRequired),
        }
    }
}

/// Shapes resolved element values into the declared collection kind.
/// Sets preserve order and drop duplicates after the first occurrence.
fn collect_values(kind: CollectionKind, values: Vec<ArgValue>) -> ArgValue {
    match kind {
        CollectionKind::Sequence => ArgValue::Sequence(values),
        CollectionKind::Set => {
            let mut unique: Vec<ArgValue> = Vec::with_capacity(values.len());
            for value in values {
                if !unique.contains(&value) {
                    unique.push(value);
                }
            }
            ArgValue::Set(unique)
        }
    }
}

impl<C> fmt::Debug for Argument<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Resolved { .. } => "Resolved",
            Self::Enumeration { .. } => "Enumeration",
            Self::JoinedString { .. } => "JoinedString",
            Self::SplitString { .. } => "SplitString",
            Self::Collection { .. } => "Collection",
            Self::FlagCarrier { .. } => "FlagCarrier",
        };
        f.debug_struct("Argument")
            .field("kind", &kind)
            .field("meta", self.meta())
            .finish()
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::ResolverRegistry;

    fn meta(name: &str, type_name: &str) -> ArgumentMeta {
        ArgumentMeta {
            name: name.to_string(),
            description: "No description provided.".to_string(),
            type_name: type_name.to_string(),
            position: 0,
            optional: false,
        }
    }

    fn int_argument() -> Argument<()> {
        let registry: ResolverRegistry<()> = ResolverRegistry::with_defaults();
        Argument::Resolved {
            meta: meta("amount", "int"),
            resolver: registry.resolver("int").unwrap(),
        }
    }

    #[test]
    fn test_resolved_argument() {
        let argument = int_argument();
        assert_eq!(argument.resolve_single(&(), "5"), Ok(ArgValue::Int(5)));
        assert_eq!(
            argument.resolve_single(&(), "five"),
            Err(ArgumentFailure::Invalid {
                token: "five".to_string(),
                argument: "amount".to_string(),
                type_name: "int".to_string(),
            })
        );
    }

    #[test]
    fn test_enumeration_is_case_insensitive_and_canonical() {
        let argument: Argument<()> = Argument::Enumeration {
            meta: meta("mode", "mode"),
            variants: vec!["Survival".to_string(), "Creative".to_string()],
        };
        assert_eq!(
            argument.resolve_single(&(), "creative"),
            Ok(ArgValue::Text("Creative".to_string()))
        );
        assert!(argument.resolve_single(&(), "hardcore").is_err());
    }

    #[test]
    fn test_joined_string_absorbs_everything() {
        let argument: Argument<()> = Argument::JoinedString {
            meta: meta("message", "string"),
            separator: " ".to_string(),
        };
        let tokens = vec!["hello".to_string(), "there".to_string()];
        assert_eq!(
            argument.resolve_remaining(&(), &tokens),
            Ok(ArgValue::Text("hello there".to_string()))
        );
        assert_eq!(
            argument.resolve_remaining(&(), &[]),
            Ok(ArgValue::Text(String::new()))
        );
    }

    #[test]
    fn test_split_string_resolves_each_piece() {
        let argument: Argument<()> = Argument::SplitString {
            meta: meta("ids", "int"),
            pattern: Regex::new(",").unwrap(),
            kind: CollectionKind::Sequence,
            element: Box::new(int_argument()),
        };
        assert_eq!(
            argument.resolve_single(&(), "1,2,3"),
            Ok(ArgValue::Sequence(vec![
                ArgValue::Int(1),
                ArgValue::Int(2),
                ArgValue::Int(3),
            ]))
        );
        // The offending piece is reported, not the whole token.
        assert_eq!(
            argument.resolve_single(&(), "1,x,3"),
            Err(ArgumentFailure::Invalid {
                token: "x".to_string(),
                argument: "amount".to_string(),
                type_name: "int".to_string(),
            })
        );
    }

    #[test]
    fn test_collection_set_deduplicates_in_order() {
        let argument: Argument<()> = Argument::Collection {
            meta: meta("ids", "int"),
            kind: CollectionKind::Set,
            element: Box::new(int_argument()),
        };
        let tokens: Vec<String> = ["3", "1", "3", "2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            argument.resolve_remaining(&(), &tokens),
            Ok(ArgValue::Set(vec![
                ArgValue::Int(3),
                ArgValue::Int(1),
                ArgValue::Int(2),
            ]))
        );
    }

    #[test]
    fn test_limitless_classification() {
        assert!(!int_argument().is_limitless());
        let joined: Argument<()> = Argument::JoinedString {
            meta: meta("message", "string"),
            separator: " ".to_string(),
        };
        assert!(joined.is_limitless());
        let split: Argument<()> = Argument::SplitString {
            meta: meta("ids", "int"),
            pattern: Regex::new(",").unwrap(),
            kind: CollectionKind::Set,
            element: Box::new(int_argument()),
        };
        // A split collection consumes exactly one token.
        assert!(!split.is_limitless());
    }

    #[test]
    fn test_other_values_compare_by_identity() {
        let a = ArgValue::other(42_u32);
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, ArgValue::other(42_u32));
        assert_eq!(a.downcast::<u32>(), Some(&42));
    }
}
