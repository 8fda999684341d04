// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation and validation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum byte length accepted for an externally supplied identifier
/// (job ids submitted through the orchestrator API).
pub const EXTERNAL_ID_MAX_LEN: usize = 128;

/// Errors produced when validating externally supplied identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier exceeds {EXTERNAL_ID_MAX_LEN} bytes ({0} bytes)")]
    TooLong(usize),
    #[error("identifier contains control character at byte {0}")]
    ControlCharacter(usize),
}

/// Validate an externally supplied identifier (opaque string).
///
/// Accepts any non-empty string up to [`EXTERNAL_ID_MAX_LEN`] bytes that
/// carries no control characters. Returns the identifier unchanged so the
/// call can be chained at API boundaries.
pub fn validate_external_id(id: &str) -> Result<&str, IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if id.len() > EXTERNAL_ID_MAX_LEN {
        return Err(IdError::TooLong(id.len()));
    }
    if let Some(pos) = id.bytes().position(|b| b.is_ascii_control()) {
        return Err(IdError::ControlCharacter(pos));
    }
    Ok(id)
}

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Define a newtype ID wrapper around `String` with a generated form.
///
/// Generates `generate()` for random ID creation (`{prefix}{nanoid(16)}`),
/// `new()` for wrapping existing strings, `as_str()`, `short()`, `Display`,
/// `From<String>`, `From<&str>`, `PartialEq<str>`, and `Borrow<str>`.
///
/// Unlike generated ids in closed systems, armada ids also arrive from
/// external callers (job ids are caller-chosen), so the wrapper accepts any
/// string and validation happens separately via [`validate_external_id`].
///
/// ```ignore
/// crate::define_id! {
///     /// Doc comment for the ID type.
///     pub struct JobId("job-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
                 serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random ID with the type prefix.
            pub fn generate() -> Self {
                Self(format!("{}{}", Self::PREFIX, nanoid::nanoid!(16)))
            }

            /// Wrap an existing identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the ID truncated to at most `n` characters for display.
            pub fn short(&self, n: usize) -> &str {
                $crate::id::short(&self.0, n)
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Unique identifier for a schedule entry.
    pub struct ScheduleId("sch-");
}

/// Correlation token pairing a request frame with its response frame.
///
/// Client-generated; carried verbatim in both directions on the robot
/// channel. Serialized transparently as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(nanoid::nanoid!(12))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
