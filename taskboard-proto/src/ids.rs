//! Opaque string identifiers assigned by the remote store.
//!
//! The store owns identity: ids are never fabricated on the client, only
//! carried around. Each kind of id is a distinct newtype so a comment id
//! cannot be passed where a task id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a store-provided identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a task row.
    TaskId
);
string_id!(
    /// Identifier of a user profile.
    UserId
);
string_id!(
    /// Identifier of the project a task belongs to.
    ProjectId
);
string_id!(
    /// Identifier of a comment row.
    CommentId
);
string_id!(
    /// Identifier of an uploaded task file.
    FileId
);
