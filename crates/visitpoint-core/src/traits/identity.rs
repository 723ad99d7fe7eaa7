//! Identity/auth provider trait.

use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::id::UserId;

/// Supplies the authenticated user for the current client.
///
/// The engine trusts whatever this returns.
#[async_trait]
pub trait IdentityProvider: Send + Sync + fmt::Debug + 'static {
    /// The authenticated user, or an authentication failure.
    async fn current_user(&self) -> AppResult<UserId>;
}

/// Identity provider holding one (switchable) signed-in user.
#[derive(Debug, Default)]
pub struct FixedIdentity {
    user: RwLock<Option<UserId>>,
}

impl FixedIdentity {
    /// Provider with `user` signed in.
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// Switch the signed-in user.
    pub fn sign_in(&self, user: UserId) {
        *self.user.write().unwrap_or_else(|p| p.into_inner()) = Some(user);
    }

    /// Clear the signed-in user.
    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn current_user(&self) -> AppResult<UserId> {
        self.user
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .ok_or_else(|| AppError::validation("No user is signed in"))
    }
}
