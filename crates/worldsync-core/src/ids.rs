//! Strongly typed identifiers.
//!
//! The store addresses groups, users and roles by plain strings. The newtypes
//! keep a user id from being passed where a group id is expected.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};

/// Defines a string-backed identifier type.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a group in the store (a world or one of its role subgroups).
    GroupId
);

define_id!(
    /// Identifier of a user in the store.
    UserId
);

define_id!(
    /// Canonical role identifier as defined by a world's `sakai:roles`.
    RoleId
);

impl GroupId {
    /// Id of the subgroup holding `role` members of this world: `{world}-{role}`.
    #[must_use]
    pub fn role_subgroup(&self, role: &RoleId) -> GroupId {
        GroupId(format!("{}-{}", self.0, role.0))
    }
}
