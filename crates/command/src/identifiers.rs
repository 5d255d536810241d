//! Newtype identifiers.
//!
//! A program token and a run identifier are both "just strings" at the OS
//! boundary; wrapping them keeps them from being swapped for arbitrary argument
//! text or log labels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// The program token of a command: `argv[0]` exactly as the caller wrote it.
    ///
    /// Either an absolute path (`"/bin/echo"`) or a bare name (`"cat"`) that the
    /// resolver looks up on the search path.
    ProgramName
}

impl ProgramName {
    /// Returns `true` if the token is an absolute path and bypasses search-path
    /// lookup.
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/')
    }
}

// ---------------------------------------------------------------------------

/// Identifies a single `run` of a stage.
///
/// Generated fresh for every run and attached to its tracing span so all
/// spawn, relay and reap events of one pipeline can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`RunId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_name_rejects_empty() {
        assert!(ProgramName::new("").is_none());
        assert_eq!(ProgramName::new("cat").unwrap().as_str(), "cat");
    }

    #[test]
    fn program_name_absolute_only_with_leading_slash() {
        assert!(ProgramName::new("/bin/echo").unwrap().is_absolute());
        assert!(!ProgramName::new("bin/echo").unwrap().is_absolute());
        assert!(!ProgramName::new("./echo").unwrap().is_absolute());
    }

    #[test]
    fn run_ids_are_distinct() {
        assert_ne!(RunId::new_random(), RunId::new_random());
    }
}
