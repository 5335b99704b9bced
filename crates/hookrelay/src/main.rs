// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! hookrelay - multi-tenant webhook ingestion and fan-out relay.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hookrelay_core::{HttpMethod, Role};

/// hookrelay - multi-tenant webhook ingestion and fan-out relay.
#[derive(Parser, Debug)]
#[command(name = "hookrelay", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway together with the delivery worker pool.
    Serve,
    /// Run only the delivery worker pool.
    Worker,
    /// Manage users, accounts, and destinations.
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
pub(crate) enum AdminCommand {
    /// Create a user and print their session token.
    CreateUser { email: String },
    /// Create an account and print its secret.
    CreateAccount { name: String },
    /// Grant a user membership of an account.
    AddMember {
        account_id: i64,
        user_id: i64,
        #[arg(long, default_value = "member")]
        role: Role,
    },
    /// Register a destination for an account.
    AddDestination {
        account_id: i64,
        url: String,
        #[arg(long, default_value = "POST")]
        method: HttpMethod,
        /// Header to send, as NAME=VALUE. Repeatable.
        #[arg(long = "header", value_name = "NAME=VALUE", required = true)]
        headers: Vec<String>,
    },
    /// Delete an account with its destinations, memberships, and events.
    DeleteAccount { account_id: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => hookrelay_config::load_and_validate_path(path),
        None => hookrelay_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            hookrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.server.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Worker => serve::run_worker(config).await,
        Commands::Admin(command) => admin::run_admin(config, command).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_config_is_valid() {
        let config = hookrelay_config::load_and_validate_str("").unwrap();
        assert_eq!(config.gateway.rate_limit_per_second, 5);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn add_destination_parses_method_and_headers() {
        let cli = Cli::try_parse_from([
            "hookrelay",
            "--config",
            "/tmp/relay.toml",
            "admin",
            "add-destination",
            "3",
            "https://hooks.example.com/in",
            "--method",
            "PUT",
            "--header",
            "X-Api-Key=abc",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/relay.toml")));
        match cli.command {
            Commands::Admin(AdminCommand::AddDestination {
                account_id,
                method,
                headers,
                ..
            }) => {
                assert_eq!(account_id, 3);
                assert_eq!(method, HttpMethod::Put);
                assert_eq!(headers, vec!["X-Api-Key=abc".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_member_role_defaults_to_member() {
        let cli = Cli::try_parse_from(["hookrelay", "admin", "add-member", "1", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Admin(AdminCommand::AddMember {
                role: Role::Member,
                ..
            })
        ));
    }

    #[test]
    fn lowercase_method_is_rejected() {
        let parsed = Cli::try_parse_from([
            "hookrelay",
            "admin",
            "add-destination",
            "1",
            "https://x.example.com",
            "--method",
            "post",
            "--header",
            "A=b",
        ]);
        assert!(parsed.is_err());
    }
}
