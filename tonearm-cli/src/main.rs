// Tonearm - Content management and storefront backend for hi-fi brands
// Copyright (C) 2025 Tonearm Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::io::Write;
use std::sync::Arc;
use tonearm_core::SiteConfig;
use tonearm_db::local::{init_database, LocalAuth, SqliteTables};
use tonearm_db::{AdminUserRepository, SiteConfigRepository, TableClient};
use tonearm_web::Config;

#[derive(Parser)]
#[command(name = "tonearm")]
#[command(about = "Tonearm CLI for the local database, admins and site settings")]
struct Cli {
    /// Database to operate on (defaults to the server configuration)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database (create tables)
    Init,

    /// Admin allowlist commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Local sign-in accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Site settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Allow a user into /Manage
    Add {
        /// Email address
        email: String,
        /// Auth provider user id (looked up among local users if omitted)
        #[arg(long)]
        user_id: Option<String>,
    },

    /// Remove a user from the allowlist
    Remove {
        /// Email address
        email: String,
    },

    /// List allowlisted admins
    List,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a local user that can sign in with a password
    Create {
        /// Email address
        email: String,
        /// Also add the user to the admin allowlist
        #[arg(long)]
        admin: bool,
        /// Password (will prompt if not provided)
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print a setting as JSON
    Get {
        key: String,
    },

    /// Store a setting; the value must be valid JSON
    Set {
        key: String,
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = match cli.database_url {
        Some(url) => url,
        None => Config::from_env()?.database_url,
    };

    match cli.command {
        Commands::Init => {
            println!("Initializing database at: {}", database_url);
            connect_database(&database_url).await?;
            println!("Database initialized successfully!");
            Ok(())
        }
        Commands::Admin { command } => {
            let pool = connect_database(&database_url).await?;
            handle_admin_command(command, &pool).await
        }
        Commands::User { command } => {
            let pool = connect_database(&database_url).await?;
            handle_user_command(command, &pool).await
        }
        Commands::Config { command } => {
            let pool = connect_database(&database_url).await?;
            handle_config_command(command, &pool).await
        }
    }
}

async fn connect_database(database_url: &str) -> Result<SqlitePool> {
    init_database(database_url)
        .await
        .with_context(|| format!("Failed to open database: {}", database_url))
}

fn tables(pool: &SqlitePool) -> Arc<dyn TableClient> {
    Arc::new(SqliteTables::new(pool.clone()))
}

fn local_auth(pool: &SqlitePool) -> LocalAuth {
    let config = Config::default();
    LocalAuth::new(pool.clone(), &config.mfa_issuer, config.session_ttl())
}

async fn handle_admin_command(command: AdminCommands, pool: &SqlitePool) -> Result<()> {
    let admins = AdminUserRepository::new(tables(pool));

    match command {
        AdminCommands::Add { email, user_id } => {
            let user_id = match user_id {
                Some(id) => id,
                None => {
                    local_auth(pool)
                        .find_user_by_email(&email)
                        .await?
                        .ok_or_else(|| {
                            anyhow!("No local user with email {}. Pass --user-id for hosted accounts.", email)
                        })?
                        .id
                }
            };
            let admin = admins.grant(&user_id, &email).await?;
            println!("Admin access granted to {} ({})", admin.email, admin.user_id);
            Ok(())
        }

        AdminCommands::Remove { email } => {
            let admin = admins
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow!("{} is not an admin", email))?;
            admins.remove(&admin.user_id).await?;
            println!("Admin access removed from {}", admin.email);
            Ok(())
        }

        AdminCommands::List => {
            let list = admins.list().await?;
            if list.is_empty() {
                println!("No admins yet. Use 'tonearm admin add <email>' to add one.");
            }
            for admin in list {
                println!(
                    "  {} {} ({}){}",
                    if admin.is_active { "•" } else { "-" },
                    admin.email,
                    admin.user_id,
                    if admin.mfa_enabled { " [2FA]" } else { "" }
                );
            }
            Ok(())
        }
    }
}

async fn handle_user_command(command: UserCommands, pool: &SqlitePool) -> Result<()> {
    match command {
        UserCommands::Create {
            email,
            admin,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => {
                    print!("Password: ");
                    std::io::stdout().flush()?;
                    rpassword::read_password()?
                }
            };

            let user = local_auth(pool).create_user(&email, &password).await?;
            println!("User created: {} ({})", email, user.id);

            if admin {
                AdminUserRepository::new(tables(pool))
                    .grant(&user.id, &email)
                    .await?;
                println!("Admin access granted");
            }
            Ok(())
        }
    }
}

async fn handle_config_command(command: ConfigCommands, pool: &SqlitePool) -> Result<()> {
    let settings = SiteConfigRepository::new(tables(pool));

    match command {
        ConfigCommands::Get { key } => match settings.get(&key).await? {
            Some(entry) => {
                println!("{}", entry.value_as_text());
                Ok(())
            }
            None => bail!("No setting named {}", key),
        },

        ConfigCommands::Set { key, value } => {
            let value = SiteConfig::parse_value(&value).map_err(|e| anyhow!(e))?;
            settings.set(&key, value).await?;
            println!("Setting {} saved", key);
            Ok(())
        }
    }
}
