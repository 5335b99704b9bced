// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Users, accounts, and account memberships.

use hookrelay_core::types::{Account, Membership, Role, User};
use hookrelay_core::RelayError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, parse_column, split_conflict, with_conflict, Database};

const ACCOUNT_COLUMNS: &str = "id, name, secret_token, created_at, updated_at";

fn account_from_row(row: &rusqlite::Row<'_>) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        secret_token: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Insert a user. Duplicate email or token digest is a conflict.
pub async fn create_user(
    db: &Database,
    email: &str,
    token_digest: &str,
) -> Result<User, RelayError> {
    let email = email.to_string();
    let token_digest = token_digest.to_string();
    let result = db
        .connection()
        .call(move |conn| {
            split_conflict(conn.query_row(
                "INSERT INTO users (email, token_digest) VALUES (?1, ?2)
                 RETURNING id, email, created_at",
                params![email, token_digest],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            ))
        })
        .await;
    with_conflict(result)
}

/// Look a user up by the digest of their session token.
pub async fn find_user_by_token_digest(
    db: &Database,
    token_digest: &str,
) -> Result<Option<User>, RelayError> {
    let token_digest = token_digest.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, email, created_at FROM users WHERE token_digest = ?1",
                params![token_digest],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert an account with the given secret token.
pub async fn create_account(
    db: &Database,
    name: &str,
    secret_token: &str,
) -> Result<Account, RelayError> {
    let name = name.to_string();
    let secret_token = secret_token.to_string();
    let result = db
        .connection()
        .call(move |conn| {
            split_conflict(conn.query_row(
                &format!(
                    "INSERT INTO accounts (name, secret_token) VALUES (?1, ?2)
                     RETURNING {ACCOUNT_COLUMNS}"
                ),
                params![name, secret_token],
                account_from_row,
            ))
        })
        .await;
    with_conflict(result)
}

pub async fn get_account(db: &Database, id: i64) -> Result<Option<Account>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id],
                account_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an account. Destinations, memberships, ledger entries, and their
/// queued deliveries go with it.
pub async fn delete_account(db: &Database, id: i64) -> Result<bool, RelayError> {
    db.connection()
        .call(move |conn| {
            let affected = conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Add (or re-role) a member of an account.
pub async fn add_member(
    db: &Database,
    account_id: i64,
    user_id: i64,
    role: Role,
) -> Result<Membership, RelayError> {
    let result = db
        .connection()
        .call(move |conn| {
            split_conflict(conn.execute(
                "INSERT INTO account_members (account_id, user_id, role) VALUES (?1, ?2, ?3)
                 ON CONFLICT (account_id, user_id) DO UPDATE SET role = excluded.role",
                params![account_id, user_id, role.to_string()],
            ))
        })
        .await;
    with_conflict(result)?;
    Ok(Membership {
        account_id,
        user_id,
        role,
    })
}

pub async fn get_membership(
    db: &Database,
    account_id: i64,
    user_id: i64,
) -> Result<Option<Membership>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT account_id, user_id, role FROM account_members
                 WHERE account_id = ?1 AND user_id = ?2",
                params![account_id, user_id],
                |row| {
                    Ok(Membership {
                        account_id: row.get(0)?,
                        user_id: row.get(1)?,
                        role: parse_column(2, row.get(2)?)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Accounts whose secret equals `secret` and which `user_id` belongs to.
///
/// Returns every match so the caller can tell "none" from "more than one".
pub async fn find_accounts_by_secret(
    db: &Database,
    secret: &str,
    user_id: i64,
) -> Result<Vec<Account>, RelayError> {
    let secret = secret.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.name, a.secret_token, a.created_at, a.updated_at
                 FROM accounts a
                 JOIN account_members m ON m.account_id = a.id
                 WHERE a.secret_token = ?1 AND m.user_id = ?2
                 ORDER BY a.id",
            )?;
            let rows = stmt.query_map(params![secret, user_id], account_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn user_round_trips_by_digest() {
        let (_dir, db) = open_temp().await;
        let user = create_user(&db, "ops@acme.test", "digest-1").await.unwrap();
        let found = find_user_by_token_digest(&db, "digest-1").await.unwrap();
        assert_eq!(found, Some(user));
        assert!(find_user_by_token_digest(&db, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (_dir, db) = open_temp().await;
        create_user(&db, "ops@acme.test", "d1").await.unwrap();
        let err = create_user(&db, "ops@acme.test", "d2").await.unwrap_err();
        assert!(err.is_conflict(), "got {err:?}");
    }

    #[tokio::test]
    async fn secret_lookup_is_scoped_to_membership() {
        let (_dir, db) = open_temp().await;
        let member = create_user(&db, "member@acme.test", "d1").await.unwrap();
        let outsider = create_user(&db, "outsider@acme.test", "d2").await.unwrap();
        let acme = create_account(&db, "acme", "11111111-1111-1111-1111-111111111111")
            .await
            .unwrap();
        add_member(&db, acme.id, member.id, Role::Member).await.unwrap();

        let hits = find_accounts_by_secret(&db, &acme.secret_token, member.id)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "acme");

        let misses = find_accounts_by_secret(&db, &acme.secret_token, outsider.id)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn add_member_updates_existing_role() {
        let (_dir, db) = open_temp().await;
        let user = create_user(&db, "a@acme.test", "d1").await.unwrap();
        let acme = create_account(&db, "acme", "s1").await.unwrap();
        add_member(&db, acme.id, user.id, Role::Member).await.unwrap();
        add_member(&db, acme.id, user.id, Role::Admin).await.unwrap();

        let membership = get_membership(&db, acme.id, user.id).await.unwrap().unwrap();
        assert_eq!(membership.role, Role::Admin);
    }

    #[tokio::test]
    async fn membership_for_unknown_account_is_a_conflict() {
        let (_dir, db) = open_temp().await;
        let user = create_user(&db, "a@acme.test", "d1").await.unwrap();
        let err = add_member(&db, 999, user.id, Role::Admin).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn delete_account_reports_whether_it_existed() {
        let (_dir, db) = open_temp().await;
        let acme = create_account(&db, "acme", "s1").await.unwrap();
        assert!(delete_account(&db, acme.id).await.unwrap());
        assert!(!delete_account(&db, acme.id).await.unwrap());
        assert!(get_account(&db, acme.id).await.unwrap().is_none());
    }
}
