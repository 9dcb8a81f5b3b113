//! Authentication session shared by the API client and the command layer.
//!
//! A `Session` starts empty, is issued a token at login and cleared at
//! logout. Clones share the same underlying state, so the API client sees a
//! login performed through the dispatcher immediately.

use std::sync::{Arc, RwLock};

use gudang_core::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.issue(token);
        session
    }

    /// Store a freshly issued token, replacing any previous one.
    pub fn issue(&self, token: impl Into<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.into());
    }

    /// Forget the token (logout).
    pub fn clear(&self) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

/// Identity returned by `/me/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Option<UserId>,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl CurrentUser {
    /// The identity assumed when there is no token or `/me/` fails.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            username: String::new(),
            is_staff: false,
            is_superuser: false,
        }
    }

    /// Staff may delete records; everyone else may only read and write.
    pub fn is_admin(&self) -> bool {
        self.is_staff
    }

    /// `"Admin - alice"` / `"Staff"` for the role badge.
    pub fn role_label(&self) -> String {
        let role = if self.is_admin() { "Admin" } else { "Staff" };
        if self.username.is_empty() {
            role.to_string()
        } else {
            format!("{role} - {}", self.username)
        }
    }
}
