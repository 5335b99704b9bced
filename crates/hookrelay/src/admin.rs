// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hookrelay admin` subcommands.
//!
//! Each command prints one JSON document on stdout.

use std::sync::Arc;

use hookrelay_config::model::RelayConfig;
use hookrelay_core::types::{HeaderSet, NewDestination};
use hookrelay_core::{RelayError, StorageAdapter};
use hookrelay_pipeline::{DestinationRegistry, Provisioner};
use serde_json::{json, Value};

use crate::serve::open_storage;
use crate::AdminCommand;

pub async fn run_admin(config: RelayConfig, command: AdminCommand) -> Result<(), RelayError> {
    let storage = open_storage(&config).await?;
    let result = execute(storage.clone(), command).await;
    storage.close().await?;
    println!("{:#}", result?);
    Ok(())
}

pub(crate) async fn execute(
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    command: AdminCommand,
) -> Result<Value, RelayError> {
    let provisioner = Provisioner::new(storage.clone());
    match command {
        AdminCommand::CreateUser { email } => {
            let issued = provisioner.create_user(&email).await?;
            Ok(json!({
                "user": issued.user,
                "session_token": issued.token,
            }))
        }
        AdminCommand::CreateAccount { name } => {
            let account = provisioner.create_account(&name).await?;
            // The secret is skipped by the account's serializer.
            Ok(json!({
                "account": account,
                "secret_token": account.secret_token,
            }))
        }
        AdminCommand::AddMember {
            account_id,
            user_id,
            role,
        } => {
            let membership = provisioner.add_member(account_id, user_id, role).await?;
            Ok(json!({ "membership": membership }))
        }
        AdminCommand::AddDestination {
            account_id,
            url,
            method,
            headers,
        } => {
            let destination = NewDestination {
                url,
                http_method: method,
                headers: parse_headers(&headers)?,
            };
            let created = DestinationRegistry::new(storage)
                .create(account_id, &destination)
                .await?;
            Ok(json!({ "destination": created }))
        }
        AdminCommand::DeleteAccount { account_id } => {
            provisioner.delete_account(account_id).await?;
            Ok(json!({ "deleted_account": account_id }))
        }
    }
}

/// Parse `NAME=VALUE` pairs. Later duplicates win.
fn parse_headers(raw: &[String]) -> Result<HeaderSet, RelayError> {
    let mut headers = HeaderSet::new();
    let mut problems = Vec::new();
    for pair in raw {
        match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                headers.insert(name.trim().to_string(), value.to_string());
            }
            _ => problems.push(format!("header `{pair}` is not NAME=VALUE")),
        }
    }
    if problems.is_empty() {
        Ok(headers)
    } else {
        Err(RelayError::Validation(problems))
    }
}
