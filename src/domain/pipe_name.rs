//! Pipe names.
//!
//! [`PipeName`] is a newtype around `String` so that pipe names cannot be
//! confused with other strings. Unique names combine an owner label with a
//! UUID v4.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name under which a pipe is registered in a [`super::PipeRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipeName(String);

impl PipeName {
    /// Wraps an arbitrary name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a name that no other call will produce: `"{owner}-{uuid}"`.
    #[must_use]
    pub fn unique(owner: &str) -> Self {
        Self(format!("{owner}-{}", uuid::Uuid::new_v4()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PipeName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for PipeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<PipeName> for String {
    fn from(name: PipeName) -> Self {
        name.0
    }
}

impl AsRef<str> for PipeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PipeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
