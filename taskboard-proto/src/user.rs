//! User profile references embedded in comments, files and assignments.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Public profile fields of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Profile id.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Optional avatar image.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserRef {
    /// Creates a profile reference with a display name and no avatar.
    pub fn new(id: impl Into<UserId>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: Some(full_name.into()),
            avatar_url: None,
        }
    }

    /// A reference known only by id (profile row missing).
    #[must_use]
    pub const fn anonymous(id: UserId) -> Self {
        Self {
            id,
            full_name: None,
            avatar_url: None,
        }
    }

    /// Name to show, falling back to the raw id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.id.as_str())
    }

    /// Avatar initials: the first letter of each name part, upper-cased.
    ///
    /// Users without a name get `"U"`.
    #[must_use]
    pub fn initials(&self) -> String {
        let initials: String = self
            .full_name
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }
}
