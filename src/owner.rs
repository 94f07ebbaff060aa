//! Owner identity scoping.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The identifier every stored entity is scoped to.
///
/// Owner identifiers are minted by the host's auth boundary and treated as
/// opaque strings here. Every query filters by owner; nothing in this crate
/// crosses owner boundaries or inspects the identifier's contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap a verified owner identifier.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for OwnerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
