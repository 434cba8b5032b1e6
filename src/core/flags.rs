// src/core/flags.rs

use std::fmt;

use crate::constants::{LONG_FLAG_PREFIX, SHORT_FLAG_PREFIX};
use crate::core::argument::{ArgValue, Argument, ArgumentFailure};
use crate::models::UnknownFlagPolicy;

// --- DECLARED FLAGS ---

/// One declared flag after registration-time validation. The value argument,
/// when present, is a single-token argument built with the same precedence
/// as a positional Resolved argument.
pub struct FlagOptions<C> {
    short: Option<String>,
    long: Option<String>,
    value: Option<Argument<C>>,
    optional_value: bool,
    required: bool,
}

impl<C> FlagOptions<C> {
    pub(crate) fn new(
        short: Option<String>,
        long: Option<String>,
        value: Option<Argument<C>>,
        optional_value: bool,
        required: bool,
    ) -> Self {
        Self {
            short,
            long,
            value,
            optional_value,
            required,
        }
    }

    pub fn short(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub fn long(&self) -> Option<&str> {
        self.long.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// `--long` when a long id exists, else `-short`.
    pub fn display_name(&self) -> String {
        match (&self.long, &self.short) {
            (Some(long), _) => format!("{}{}", LONG_FLAG_PREFIX, long),
            (None, Some(short)) => format!("{}{}", SHORT_FLAG_PREFIX, short),
            // Validated at registration: at least one id exists.
            (None, None) => String::new(),
        }
    }

    fn matches_long(&self, name: &str) -> bool {
        self.long
            .as_deref()
            .is_some_and(|long| long.eq_ignore_ascii_case(name))
    }

    fn matches_short(&self, name: &str) -> bool {
        self.short
            .as_deref()
            .is_some_and(|short| short.eq_ignore_ascii_case(name))
    }

    fn long_has_prefix(&self, prefix: &str) -> bool {
        self.long
            .as_deref()
            .is_some_and(|long| long.to_ascii_lowercase().starts_with(prefix))
    }
}

impl<C> fmt::Debug for FlagOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagOptions")
            .field("short", &self.short)
            .field("long", &self.long)
            .field("has_value", &self.value.is_some())
            .field("optional_value", &self.optional_value)
            .field("required", &self.required)
            .finish()
    }
}

// --- FLAG GROUP ---

/// The ordered set of flags declared for one command, plus the parser that
/// segments the trailing token stream into flag occurrences.
pub struct FlagGroup<C> {
    flags: Vec<FlagOptions<C>>,
    policy: UnknownFlagPolicy,
}

impl<C> FlagGroup<C> {
    pub(crate) fn new(policy: UnknownFlagPolicy) -> Self {
        Self {
            flags: Vec::new(),
            policy,
        }
    }

    pub(crate) fn add(&mut self, options: FlagOptions<C>) {
        self.flags.push(options);
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// All identifiers already claimed by declared flags, for conflict checks.
    pub(crate) fn claimed_ids(&self) -> Vec<&str> {
        self.flags
            .iter()
            .flat_map(|options| [options.short.as_deref(), options.long.as_deref()])
            .flatten()
            .collect()
    }

    /// Finds a flag by its long name: exact match (case-insensitive) first,
    /// then a unique prefix. An ambiguous prefix matches nothing.
    fn find_long(&self, name: &str) -> Option<&FlagOptions<C>> {
        if let Some(exact) = self.flags.iter().find(|options| options.matches_long(name)) {
            return Some(exact);
        }

        let lowered = name.to_ascii_lowercase();
        let mut matches = self
            .flags
            .iter()
            .filter(|options| options.long_has_prefix(&lowered));

        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// Finds a flag by its short id (exact, case-insensitive).
    fn find_short(&self, name: &str) -> Option<&FlagOptions<C>> {
        self.flags.iter().find(|options| options.matches_short(name))
    }

    /// Segments the limitless remainder of the token stream into flag
    /// occurrences and their optional values.
    ///
    /// Token forms: `--long`, `--long=value`, `-s`, `-s=value`; a flag whose
    /// value is not optional also accepts the following non-flag token.
    pub(crate) fn parse(
        &self,
        caller: &C,
        tokens: &[String],
    ) -> Result<FlagSet, ArgumentFailure> {
        let mut set = FlagSet::default();
        let mut tokens_iter = tokens.iter().peekable();

        while let Some(token) = tokens_iter.next() {
            let (name, inline_value, is_long) =
                if let Some(rest) = token.strip_prefix(LONG_FLAG_PREFIX) {
                    let (name, value) = split_inline_value(rest);
                    (name, value, true)
                } else if let Some(rest) = token.strip_prefix(SHORT_FLAG_PREFIX) {
                    if rest.is_empty() {
                        self.reject_unknown(token)?;
                        continue;
                    }
                    let (name, value) = split_inline_value(rest);
                    (name, value, false)
                } else {
                    // A bare token inside the flag section matches nothing.
                    self.reject_unknown(token)?;
                    continue;
                };

            // A bare `--` or `-` (or `--=value`) strips to an empty name,
            // which must not reach the prefix pass: every long id starts
            // with the empty prefix.
            if name.is_empty() {
                self.reject_unknown(token)?;
                continue;
            }

            let options = if is_long {
                self.find_long(name)
            } else {
                self.find_short(name)
            };

            let Some(options) = options else {
                self.reject_unknown(token)?;
                continue;
            };

            let value = match &options.value {
                None => {
                    // A bare switch takes no value; `--switch=x` is a user error.
                    if let Some(inline) = inline_value {
                        return Err(ArgumentFailure::Invalid {
                            token: inline.to_string(),
                            argument: options.display_name(),
                            type_name: "flag".to_string(),
                        });
                    }
                    None
                }
                Some(value_argument) => {
                    let token_value = match inline_value {
                        Some(inline) => Some(inline.to_string()),
                        None if !options.optional_value => {
                            // The value is mandatory: claim the next token
                            // unless it is a declared flag. Tokens that merely
                            // start with '-' (negative numbers) are values.
                            match tokens_iter.peek() {
                                Some(next) if !self.is_declared_flag_token(next) => {
                                    tokens_iter.next().map(|next| next.to_string())
                                }
                                _ => return Err(ArgumentFailure::MissingRequired),
                            }
                        }
                        None => None,
                    };

                    match token_value {
                        Some(raw) => Some(value_argument.resolve_single(caller, &raw).map_err(
                            |_| ArgumentFailure::Invalid {
                                token: raw.clone(),
                                argument: options.display_name(),
                                type_name: value_argument.meta().type_name.clone(),
                            },
                        )?),
                        None => None,
                    }
                }
            };

            set.insert(options.short.clone(), options.long.clone(), value);
        }

        // Every required flag must have been seen.
        for options in &self.flags {
            let seen = options
                .short
                .as_deref()
                .map(|short| set.has(short))
                .or_else(|| options.long.as_deref().map(|long| set.has(long)))
                .unwrap_or(false);
            if options.required && !seen {
                return Err(ArgumentFailure::MissingRequired);
            }
        }

        Ok(set)
    }

    /// Whether a token names a flag of this group (in any accepted form).
    fn is_declared_flag_token(&self, token: &str) -> bool {
        if let Some(rest) = token.strip_prefix(LONG_FLAG_PREFIX) {
            let (name, _) = split_inline_value(rest);
            !name.is_empty() && self.find_long(name).is_some()
        } else if let Some(rest) = token.strip_prefix(SHORT_FLAG_PREFIX) {
            let (name, _) = split_inline_value(rest);
            !name.is_empty() && self.find_short(name).is_some()
        } else {
            false
        }
    }

    fn reject_unknown(&self, token: &str) -> Result<(), ArgumentFailure> {
        match self.policy {
            UnknownFlagPolicy::Ignore => {
                log::trace!("Ignoring unknown flag token '{}'.", token);
                Ok(())
            }
            UnknownFlagPolicy::Reject => Err(ArgumentFailure::Invalid {
                token: token.to_string(),
                argument: "flags".to_string(),
                type_name: "flag".to_string(),
            }),
        }
    }
}

impl<C> fmt::Debug for FlagGroup<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagGroup")
            .field("flags", &self.flags)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Splits `name=value` into its parts; `None` when no `=` is present.
fn split_inline_value(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (token, None),
    }
}

// --- PARSED FLAG SET ---

#[derive(Debug, Clone, PartialEq)]
struct FlagEntry {
    short: Option<String>,
    long: Option<String>,
    value: Option<ArgValue>,
}

impl FlagEntry {
    fn answers_to(&self, id: &str) -> bool {
        self.short
            .as_deref()
            .is_some_and(|short| short.eq_ignore_ascii_case(id))
            || self
                .long
                .as_deref()
                .is_some_and(|long| long.eq_ignore_ascii_case(id))
    }
}

/// The opaque result of parsing the flag section, handed to the handler.
/// A flag is addressable by either of its declared identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagSet {
    entries: Vec<FlagEntry>,
}

impl FlagSet {
    fn insert(&mut self, short: Option<String>, long: Option<String>, value: Option<ArgValue>) {
        // A repeated flag keeps its last occurrence.
        if let Some(existing) = self.entries.iter_mut().find(|entry| {
            entry.short == short && entry.long == long
        }) {
            existing.value = value;
            return;
        }
        self.entries.push(FlagEntry { short, long, value });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the flag was present on the token stream.
    pub fn has(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.answers_to(id))
    }

    /// The typed value supplied for the flag, if the flag was present with
    /// a value. Type inspection happens through [`ArgValue`]'s accessors.
    pub fn value(&self, id: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|entry| entry.answers_to(id))
            .and_then(|entry| entry.value.as_ref())
    }

    /// The typed value supplied for the flag, or `default` when the flag is
    /// absent or carries no value.
    pub fn value_or<'a>(&'a self, id: &str, default: &'a ArgValue) -> &'a ArgValue {
        self.value(id).unwrap_or(default)
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::argument::ArgumentMeta;
    use crate::core::registry::ResolverRegistry;

    fn value_argument(type_name: &str) -> Argument<()> {
        let registry: ResolverRegistry<()> = ResolverRegistry::with_defaults();
        Argument::Resolved {
            meta: ArgumentMeta {
                name: type_name.to_string(),
                description: String::new(),
                type_name: type_name.to_string(),
                position: 0,
                optional: false,
            },
            resolver: registry.resolver(type_name).unwrap(),
        }
    }

    fn group(policy: UnknownFlagPolicy) -> FlagGroup<()> {
        let mut group = FlagGroup::new(policy);
        group.add(FlagOptions::new(
            Some("s".to_string()),
            Some("silent".to_string()),
            None,
            false,
            false,
        ));
        group.add(FlagOptions::new(
            None,
            Some("tag".to_string()),
            Some(value_argument("int")),
            false,
            false,
        ));
        group.add(FlagOptions::new(
            Some("m".to_string()),
            Some("mode".to_string()),
            Some(value_argument("string")),
            true,
            false,
        ));
        group
    }

    fn tokens(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_switch_by_short_and_long() {
        let group = group(UnknownFlagPolicy::Ignore);
        let set = group.parse(&(), &tokens(&["--silent"])).unwrap();
        assert!(set.has("silent"));
        assert!(set.has("s"));
        assert!(set.value("silent").is_none());

        let set = group.parse(&(), &tokens(&["-s"])).unwrap();
        assert!(set.has("silent"));
    }

    #[test]
    fn test_valued_flag_inline_and_next_token() {
        let group = group(UnknownFlagPolicy::Ignore);

        let set = group.parse(&(), &tokens(&["--tag=7"])).unwrap();
        assert_eq!(set.value("tag"), Some(&ArgValue::Int(7)));

        let set = group.parse(&(), &tokens(&["--tag", "7"])).unwrap();
        assert_eq!(set.value("tag"), Some(&ArgValue::Int(7)));
    }

    #[test]
    fn test_valued_flag_missing_value() {
        let group = group(UnknownFlagPolicy::Ignore);
        assert_eq!(
            group.parse(&(), &tokens(&["--tag"])),
            Err(ArgumentFailure::MissingRequired)
        );
        // A declared flag cannot be claimed as the value.
        assert_eq!(
            group.parse(&(), &tokens(&["--tag", "--silent"])),
            Err(ArgumentFailure::MissingRequired)
        );
    }

    #[test]
    fn test_negative_value_claimed_for_mandatory_flag() {
        let group = group(UnknownFlagPolicy::Ignore);
        let set = group.parse(&(), &tokens(&["--tag", "-5"])).unwrap();
        assert_eq!(set.value("tag"), Some(&ArgValue::Int(-5)));
    }

    #[test]
    fn test_bare_prefix_tokens_match_nothing() {
        let mut group: FlagGroup<()> = FlagGroup::new(UnknownFlagPolicy::Ignore);
        group.add(FlagOptions::new(
            Some("f".to_string()),
            Some("force".to_string()),
            None,
            false,
            false,
        ));

        // The sole long id must not be "prefix-matched" by an empty name.
        for stream in [&["--"][..], &["--=5"], &["-"], &["-=5"]] {
            let set = group.parse(&(), &tokens(stream)).unwrap();
            assert!(set.is_empty(), "'{}' marked a flag present", stream.join(" "));
        }

        let mut reject: FlagGroup<()> = FlagGroup::new(UnknownFlagPolicy::Reject);
        reject.add(FlagOptions::new(
            None,
            Some("force".to_string()),
            None,
            false,
            false,
        ));
        assert_eq!(
            reject.parse(&(), &tokens(&["--"])),
            Err(ArgumentFailure::Invalid {
                token: "--".to_string(),
                argument: "flags".to_string(),
                type_name: "flag".to_string(),
            })
        );
    }

    #[test]
    fn test_valued_flag_invalid_value() {
        let group = group(UnknownFlagPolicy::Ignore);
        let error = group.parse(&(), &tokens(&["--tag", "seven"])).unwrap_err();
        assert_eq!(
            error,
            ArgumentFailure::Invalid {
                token: "seven".to_string(),
                argument: "--tag".to_string(),
                type_name: "int".to_string(),
            }
        );
    }

    #[test]
    fn test_optional_value_flag() {
        let group = group(UnknownFlagPolicy::Ignore);

        // Present without a value.
        let set = group.parse(&(), &tokens(&["-m"])).unwrap();
        assert!(set.has("mode"));
        assert!(set.value("mode").is_none());

        // The inline form still supplies one.
        let set = group.parse(&(), &tokens(&["--mode=fast"])).unwrap();
        assert_eq!(set.value("mode"), Some(&ArgValue::Text("fast".to_string())));
    }

    #[test]
    fn test_prefix_matching_precedence() {
        let mut group: FlagGroup<()> = FlagGroup::new(UnknownFlagPolicy::Ignore);
        group.add(FlagOptions::new(
            None,
            Some("silent".to_string()),
            None,
            false,
            false,
        ));
        group.add(FlagOptions::new(
            None,
            Some("silver".to_string()),
            None,
            false,
            false,
        ));
        group.add(FlagOptions::new(
            None,
            Some("sil".to_string()),
            None,
            false,
            false,
        ));

        // Exact match wins even though it prefixes the others.
        let set = group.parse(&(), &tokens(&["--sil"])).unwrap();
        assert!(set.has("sil"));
        assert!(!set.has("silent"));

        // A unique prefix resolves.
        let set = group.parse(&(), &tokens(&["--silv"])).unwrap();
        assert!(set.has("silver"));

        // An ambiguous prefix matches nothing (ignored under the default
        // policy).
        let set = group.parse(&(), &tokens(&["--si"])).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_unknown_flag_policies() {
        let ignore = group(UnknownFlagPolicy::Ignore);
        let set = ignore
            .parse(&(), &tokens(&["--bogus", "--silent"]))
            .unwrap();
        assert!(set.has("silent"));

        let reject = group(UnknownFlagPolicy::Reject);
        let error = reject.parse(&(), &tokens(&["--bogus"])).unwrap_err();
        assert_eq!(
            error,
            ArgumentFailure::Invalid {
                token: "--bogus".to_string(),
                argument: "flags".to_string(),
                type_name: "flag".to_string(),
            }
        );
    }

    #[test]
    fn test_required_flag_missing() {
        let mut group: FlagGroup<()> = FlagGroup::new(UnknownFlagPolicy::Ignore);
        group.add(FlagOptions::new(
            Some("f".to_string()),
            Some("force".to_string()),
            None,
            false,
            true,
        ));

        assert_eq!(
            group.parse(&(), &tokens(&[])),
            Err(ArgumentFailure::MissingRequired)
        );
        assert!(group.parse(&(), &tokens(&["-f"])).is_ok());
    }

    #[test]
    fn test_repeated_flag_keeps_last_value() {
        let group = group(UnknownFlagPolicy::Ignore);
        let set = group
            .parse(&(), &tokens(&["--tag=1", "--tag=2"]))
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.value("tag"), Some(&ArgValue::Int(2)));
    }

    #[test]
    fn test_value_or_default() {
        let group = group(UnknownFlagPolicy::Ignore);
        let set = group.parse(&(), &tokens(&[])).unwrap();
        let default = ArgValue::Int(10);
        assert_eq!(set.value_or("tag", &default), &ArgValue::Int(10));
    }
}
