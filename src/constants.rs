// src/constants.rs

/// Default description used for commands and arguments that declare none.
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";

/// Prefix of long flag tokens (`--force`).
pub const LONG_FLAG_PREFIX: &str = "--";

/// Prefix of short flag tokens (`-f`).
pub const SHORT_FLAG_PREFIX: &str = "-";

/// Registry name of the built-in string type.
pub const TYPE_STRING: &str = "string";

/// Registry name of the built-in integer type.
pub const TYPE_INT: &str = "int";

/// Registry name of the built-in float type.
pub const TYPE_FLOAT: &str = "float";

/// Registry name of the built-in boolean type.
pub const TYPE_BOOL: &str = "bool";

/// Reserved type name of the flag-carrier parameter slot.
pub const TYPE_FLAGS: &str = "flags";
