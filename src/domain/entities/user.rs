//! Message sender identity.

use serde::{Deserialize, Serialize};

/// Unique identifier for a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Role of a sender within the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum SenderRole {
    #[default]
    Member,
    Moderator,
    Admin,
    Owner,
    Guest,
    System,
}

impl SenderRole {
    /// Parses a wire role name, falling back to [`SenderRole::Member`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "moderator" | "mod" => Self::Moderator,
            "admin" => Self::Admin,
            "owner" => Self::Owner,
            "guest" => Self::Guest,
            "system" => Self::System,
            _ => Self::Member,
        }
    }
}

/// Author of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Sender {
    id: UserId,
    display_name: String,
    avatar: Option<String>,
    role: SenderRole,
}

#[allow(missing_docs)]
impl Sender {
    #[must_use]
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar: None,
            role: SenderRole::Member,
        }
    }

    #[must_use]
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    #[must_use]
    pub const fn with_role(mut self, role: SenderRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    #[must_use]
    pub const fn role(&self) -> SenderRole {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("admin", SenderRole::Admin ; "admin")]
    #[test_case("MOD", SenderRole::Moderator ; "short_moderator_uppercase")]
    #[test_case("owner", SenderRole::Owner ; "owner")]
    #[test_case("something-else", SenderRole::Member ; "unknown_falls_back")]
    fn test_role_parse(input: &str, expected: SenderRole) {
        assert_eq!(SenderRole::parse(input), expected);
    }

    #[test]
    fn test_sender_builder() {
        let sender = Sender::new("u1", "Alice")
            .with_avatar("a.png")
            .with_role(SenderRole::Admin);

        assert_eq!(sender.id().as_str(), "u1");
        assert_eq!(sender.display_name(), "Alice");
        assert_eq!(sender.avatar(), Some("a.png"));
        assert_eq!(sender.role(), SenderRole::Admin);
    }
}
