//! Type-safe broadcast group name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Name of a broadcast group on the [`super::ChannelLayer`].
///
/// Fewer than 100 characters, drawn from ASCII letters, digits, `-`, `_`
/// and `.`, so names built from route captures stay predictable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupName(String);

impl GroupName {
    /// Maximum length, exclusive.
    pub const MAX_LEN: usize = 100;

    /// Validates and wraps a group name.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the name is empty, too long,
    /// or contains characters outside the allowed set.
    pub fn new(name: impl Into<String>) -> Result<Self, GatewayError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() < Self::MAX_LEN
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
        if valid {
            Ok(Self(name))
        } else {
            Err(GatewayError::Internal(format!("invalid group name {name:?}")))
        }
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
