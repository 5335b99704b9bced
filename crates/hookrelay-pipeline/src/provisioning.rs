// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Users, accounts, and memberships as seen by operators.

use std::sync::Arc;

use hookrelay_core::types::{Account, Membership, Role, User};
use hookrelay_core::{RelayError, StorageAdapter};
use tracing::info;

use crate::credentials::{digest_token, generate_account_secret, issue_session_token};

/// A newly created user together with their session token.
///
/// The plaintext token exists only here; storage keeps its digest.
#[derive(Clone)]
pub struct IssuedUser {
    pub user: User,
    pub token: String,
}

impl std::fmt::Debug for IssuedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedUser")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
pub struct Provisioner {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
}

impl Provisioner {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>) -> Self {
        Self { storage }
    }

    pub async fn create_user(&self, email: &str) -> Result<IssuedUser, RelayError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(RelayError::Validation(vec![format!(
                "`{email}` is not an email address"
            )]));
        }
        let token = issue_session_token();
        let user = self.storage.create_user(email, &digest_token(&token)).await?;
        info!(user_id = user.id, "user created");
        Ok(IssuedUser { user, token })
    }

    /// Identify the holder of a session token.
    pub async fn authenticate_session(&self, token: &str) -> Result<Option<User>, RelayError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.storage
            .find_user_by_token_digest(&digest_token(token))
            .await
    }

    /// Create an account with a freshly generated secret.
    pub async fn create_account(&self, name: &str) -> Result<Account, RelayError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RelayError::Validation(vec![
                "account name must not be empty".to_string(),
            ]));
        }
        let account = self
            .storage
            .create_account(name, &generate_account_secret())
            .await?;
        info!(account_id = account.id, name = %account.name, "account created");
        Ok(account)
    }

    pub async fn add_member(
        &self,
        account_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Membership, RelayError> {
        let membership = self.storage.add_member(account_id, user_id, role).await?;
        info!(account_id, user_id, %role, "membership granted");
        Ok(membership)
    }

    pub async fn membership(
        &self,
        account_id: i64,
        user_id: i64,
    ) -> Result<Option<Membership>, RelayError> {
        self.storage.get_membership(account_id, user_id).await
    }

    /// Delete an account with all of its destinations, memberships, and events.
    pub async fn delete_account(&self, account_id: i64) -> Result<(), RelayError> {
        if self.storage.delete_account(account_id).await? {
            info!(account_id, "account deleted");
            Ok(())
        } else {
            Err(RelayError::NotFound {
                entity: "account",
                id: account_id,
            })
        }
    }
}
