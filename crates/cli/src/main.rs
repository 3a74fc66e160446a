//! Haven CLI - Privileged admin tooling.
//!
//! # Usage
//!
//! ```bash
//! # Grant the admin role to an existing account
//! haven-cli admin promote -e manager@haven.com
//!
//! # Create (or reuse) a confirmed admin account with a profile
//! haven-cli admin setup -e manager@haven.com -p 'long-password' --first-name Meera --last-name Iyer
//!
//! # Replace an account's password
//! haven-cli admin reset-password -e manager@haven.com -p 'new-password'
//! ```
//!
//! # Environment Variables
//!
//! - `PLATFORM_URL` - Platform project URL
//! - `PLATFORM_ANON_KEY` - Public key, sent as `apikey`
//! - `PLATFORM_SERVICE_ROLE_KEY` - Service-role key (never given to the site)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "haven-cli")]
#[command(author, version, about = "Haven admin tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to an existing account
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Create or reuse an account, save its profile and grant the admin role
    Setup {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Password for a new account (ignored when the account exists)
        #[arg(short, long)]
        password: String,

        /// First name shown on the dashboard
        #[arg(long, default_value = "Admin")]
        first_name: String,

        /// Last name shown on the dashboard
        #[arg(long, default_value = "User")]
        last_name: String,
    },
    /// Replace an account's password
    ResetPassword {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New password
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Admin { action } => {
            let provisioner = commands::admin::provisioner()?;
            match action {
                AdminAction::Promote { email } => {
                    commands::admin::promote(&provisioner, &email).await?;
                }
                AdminAction::Setup {
                    email,
                    password,
                    first_name,
                    last_name,
                } => {
                    let setup = haven_site::services::provision::AdminSetup {
                        email,
                        password,
                        first_name,
                        last_name,
                    };
                    commands::admin::setup(&provisioner, &setup).await?;
                }
                AdminAction::ResetPassword { email, password } => {
                    commands::admin::reset_password(&provisioner, &email, &password).await?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_setup_name_defaults() {
        let cli = Cli::try_parse_from([
            "haven-cli", "admin", "setup", "-e", "a@haven.test", "-p", "hunter22",
        ]);
        let Ok(Cli {
            command:
                Commands::Admin {
                    action: AdminAction::Setup {
                        first_name,
                        last_name,
                        ..
                    },
                },
        }) = cli
        else {
            panic!("expected setup command");
        };
        assert_eq!(first_name, "Admin");
        assert_eq!(last_name, "User");
    }
}
