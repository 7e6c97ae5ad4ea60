//! Explicit identity context for the signed-in user.
//!
//! One [`AuthHandle`] is shared by the HTTP client (bearer header) and the
//! view layer (edit rights). It is the only place the token lives, and the
//! only place it is replaced or cleared.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

/// The signed-in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub email: String,
    pub role: Role,
    pub token: String,
}

impl AuthContext {
    pub fn new(email: impl Into<String>, role: Role, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role,
            token: token.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Short hash of the token, safe to log.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.token.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..4])
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &self.fingerprint())
            .finish()
    }
}

impl fmt::Display for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, token {})", self.email, self.role, self.fingerprint())
    }
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Shared, replaceable holder of the current [`AuthContext`].
#[derive(Debug, Clone, Default)]
pub struct AuthHandle {
    inner: Arc<RwLock<Option<AuthContext>>>,
}

impl AuthHandle {
    /// A handle with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(context: AuthContext) -> Self {
        let handle = Self::default();
        handle.replace(context);
        handle
    }

    /// Snapshot of the current identity.
    pub fn current(&self) -> Option<AuthContext> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|ctx| ctx.token)
    }

    pub fn is_admin(&self) -> bool {
        self.current().is_some_and(|ctx| ctx.is_admin())
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.current().is_some_and(|ctx| ctx.role == role)
    }

    pub fn replace(&self, context: AuthContext) {
        info!(user = %context, "Session updated");
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(context);
        }
    }

    /// Forgets the current identity (logout or expired token).
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            if let Some(previous) = guard.take() {
                info!(user = %previous, "Session cleared");
            }
        }
    }
}
