// src/core/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::{TYPE_BOOL, TYPE_FLOAT, TYPE_INT, TYPE_STRING};
use crate::core::argument::ArgValue;

// --- RESOLVER REGISTRY ---

/// Converts one raw token into a typed value, or `None` on failure.
/// Resolvers receive the caller so context-sensitive conversions (e.g.
/// "the player named X on the caller's server") are possible.
pub type ArgumentResolver<C> = Arc<dyn Fn(&C, &str) -> Option<ArgValue> + Send + Sync>;

/// Maps a value-type name to its token resolver.
///
/// Open for embedder extension before startup completes; the engine only
/// reads it. Concurrent registration during live dispatch is unsupported and
/// must be serialized by the embedder.
pub struct ResolverRegistry<C> {
    resolvers: HashMap<String, ArgumentResolver<C>>,
}

impl<C> ResolverRegistry<C> {
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// A registry pre-loaded with the built-in `string`, `int`, `float` and
    /// `bool` resolvers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TYPE_STRING, |_, token| {
            Some(ArgValue::Text(token.to_string()))
        });
        registry.register(TYPE_INT, |_, token| {
            token.parse::<i64>().ok().map(ArgValue::Int)
        });
        registry.register(TYPE_FLOAT, |_, token| {
            token.parse::<f64>().ok().map(ArgValue::Float)
        });
        registry.register(TYPE_BOOL, |_, token| {
            match token.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Some(ArgValue::Bool(true)),
                "false" | "no" | "off" => Some(ArgValue::Bool(false)),
                _ => None,
            }
        });
        registry
    }

    /// Registers (or replaces) the resolver for a type name.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        resolver: impl Fn(&C, &str) -> Option<ArgValue> + Send + Sync + 'static,
    ) {
        self.resolvers.insert(type_name.into(), Arc::new(resolver));
    }

    /// Gets the resolver for a type name, if one is registered.
    pub fn resolver(&self, type_name: &str) -> Option<ArgumentResolver<C>> {
        self.resolvers.get(type_name).map(Arc::clone)
    }
}

impl<C> Default for ResolverRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ResolverRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("types", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// --- REQUIREMENT REGISTRY ---

/// A stateless predicate over the caller context.
pub type RequirementResolver<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// Maps a requirement key to its predicate, for all commands to reference.
pub struct RequirementRegistry<C> {
    requirements: HashMap<String, RequirementResolver<C>>,
}

impl<C> RequirementRegistry<C> {
    pub fn new() -> Self {
        Self {
            requirements: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        key: impl Into<String>,
        resolver: impl Fn(&C) -> bool + Send + Sync + 'static,
    ) {
        self.requirements.insert(key.into(), Arc::new(resolver));
    }

    /// Gets the predicate for a key, if one is registered.
    pub fn requirement(&self, key: &str) -> Option<RequirementResolver<C>> {
        self.requirements.get(key).map(Arc::clone)
    }
}

impl<C> Default for RequirementRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for RequirementRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequirementRegistry")
            .field("keys", &self.requirements.keys().collect::<Vec<_>>())
            .finish()
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolvers() {
        let registry: ResolverRegistry<()> = ResolverRegistry::with_defaults();

        let int = registry.resolver(TYPE_INT).unwrap();
        assert_eq!(int(&(), "42"), Some(ArgValue::Int(42)));
        assert_eq!(int(&(), "forty-two"), None);

        let float = registry.resolver(TYPE_FLOAT).unwrap();
        assert_eq!(float(&(), "2.5"), Some(ArgValue::Float(2.5)));

        let boolean = registry.resolver(TYPE_BOOL).unwrap();
        assert_eq!(boolean(&(), "TRUE"), Some(ArgValue::Bool(true)));
        assert_eq!(boolean(&(), "off"), Some(ArgValue::Bool(false)));
        assert_eq!(boolean(&(), "maybe"), None);

        let string = registry.resolver(TYPE_STRING).unwrap();
        assert_eq!(
            string(&(), "alice"),
            Some(ArgValue::Text("alice".to_string()))
        );
    }

    #[test]
    fn test_unregistered_type_is_none() {
        let registry: ResolverRegistry<()> = ResolverRegistry::with_defaults();
        assert!(registry.resolver("player").is_none());
    }

    #[test]
    fn test_custom_resolver_sees_caller() {
        struct Caller {
            prefix: String,
        }

        let mut registry: ResolverRegistry<Caller> = ResolverRegistry::new();
        registry.register("tagged", |caller, token| {
            Some(ArgValue::Text(format!("{}:{}", caller.prefix, token)))
        });

        let resolver = registry.resolver("tagged").unwrap();
        let caller = Caller {
            prefix: "srv".to_string(),
        };
        assert_eq!(
            resolver(&caller, "alice"),
            Some(ArgValue::Text("srv:alice".to_string()))
        );
    }

    #[test]
    fn test_requirement_registry() {
        let mut registry: RequirementRegistry<u32> = RequirementRegistry::new();
        registry.register("level.10", |level| *level >= 10);

        let requirement = registry.requirement("level.10").unwrap();
        assert!(requirement(&12));
        assert!(!requirement(&3));
        assert!(registry.requirement("level.99").is_none());
    }
}
