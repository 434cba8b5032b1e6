// src/core/caller.rs

use std::fmt;
use std::sync::Arc;

use crate::models::CallerTag;

/// Decides which caller types the platform accepts at registration time, and
/// whether a live caller satisfies a command's declared caller type at
/// dispatch time.
pub trait CallerValidator<C>: Send + Sync {
    /// Tags a command may declare as its caller slot. Registration fails for
    /// any tag outside this set.
    fn allowed(&self) -> Vec<CallerTag>;

    /// Whether the live caller satisfies the declared tag.
    fn is_compatible(&self, declared: &CallerTag, caller: &C) -> bool;
}

/// Tag-based validator: the embedder supplies the allow-list and a projection
/// from a live caller to its tag. The wildcard tag [`CallerTag::any`] accepts
/// every caller.
pub struct TagValidator<C> {
    allowed: Vec<CallerTag>,
    tag_of: Arc<dyn Fn(&C) -> CallerTag + Send + Sync>,
}

impl<C> TagValidator<C> {
    pub fn new(
        allowed: Vec<CallerTag>,
        tag_of: impl Fn(&C) -> CallerTag + Send + Sync + 'static,
    ) -> Self {
        Self {
            allowed,
            tag_of: Arc::new(tag_of),
        }
    }

    /// A validator that accepts only the wildcard tag, for embedders with a
    /// single caller kind.
    pub fn any_only() -> Self {
        Self::new(vec![CallerTag::any()], |_| CallerTag::any())
    }
}

impl<C> CallerValidator<C> for TagValidator<C> {
    fn allowed(&self) -> Vec<CallerTag> {
        self.allowed.clone()
    }

    fn is_compatible(&self, declared: &CallerTag, caller: &C) -> bool {
        declared.is_any() || (self.tag_of)(caller) == *declared
    }
}

impl<C> fmt::Debug for TagValidator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagValidator")
            .field("allowed", &self.allowed)
            .finish()
    }
}

// MARK: --- UNIT TESTS ---
