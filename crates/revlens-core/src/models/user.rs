use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::constants::SYSTEM_USERNAME;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

/// Actor for notes the platform writes on its own (approvals, status changes).
pub static SYSTEM_USER: LazyLock<User> = LazyLock::new(|| User::new(SYSTEM_USERNAME));

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn system() -> Self {
        SYSTEM_USER.clone()
    }

    pub fn is_system(&self) -> bool {
        self.username == SYSTEM_USERNAME
    }
}
