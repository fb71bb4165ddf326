use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// User reference as embedded by the API in participants, senders,
/// reactions and read receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserRef {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            first_name: None,
            last_name: None,
        }
    }

    /// "First Last" when the API sent a name, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// The signed-in user, passed explicitly into every controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(UserRef);

impl CurrentUser {
    pub fn new(user: UserRef) -> Self {
        Self(user)
    }

    pub fn id(&self) -> UserId {
        self.0.id
    }

    pub fn user(&self) -> &UserRef {
        &self.0
    }

    pub fn is(&self, user: &UserRef) -> bool {
        self.0.id == user.id
    }
}
