use std::io;
use std::io::Write;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::app;
use crate::app::MigrationError;
use crate::auth;
use crate::core::{DbContext, DbError};
use crate::db::{self, NewUser, Role, User};

#[rustfmt::skip]
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Migration creation failed")]
    MigrationCreateFailed { #[source] source: MigrationError },

    #[error("Checking migration status failed")]
    MigrationStatusCheckFailed { #[source] source: MigrationError },

    #[error("Running migrations failed")]
    MigrationRunFailed { #[source] source: MigrationError },

    #[error("User '{0}' already exists")]
    UserAlreadyExists(String),

    #[error("{0}")]
    PasswordRejected(&'static str),

    #[error("Failed to read password")]
    PasswordPromptFailed { #[from] source: io::Error },

    #[error("Failed to hash password")]
    PasswordHashingFailed { #[from] source: argon2::password_hash::Error },

    #[error("Database operation failed")]
    DatabaseOperationFailed { #[from] source: DbError },
}

#[derive(Parser)]
#[command(name = "rentdesk")]
#[command(about = "Rental property management server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Database migration utility
    Migrate {
        #[command(subcommand)]
        command: MigrateCommand,
    },
    /// Create a super admin user
    CreateAdmin {
        /// Username for the admin user
        #[arg(short, long)]
        username: String,
        /// Email for the admin user
        #[arg(short, long)]
        email: String,
        /// Display name
        #[arg(long)]
        full_name: Option<String>,
        /// Contact phone number
        #[arg(long)]
        phone: Option<String>,
    },
    /// Insert the default message templates into an empty templates table
    SeedTemplates,
}

#[derive(Subcommand)]
enum MigrateCommand {
    /// Create a new migration file
    Create {
        /// Name of the migration
        name: String,
    },
    /// List all available migrations
    List,
    /// Check if there are pending migrations
    Status,
    /// Run all pending migrations
    Run,
}

/// Runs the command given on the command line, if any.
/// Returns `true` when a command ran and the server should not start.
pub async fn run_cli(db: &DbContext) -> Result<bool, CliError> {
    let Some(command) = Cli::parse().command else {
        return Ok(false);
    };

    match command {
        Command::Migrate { command } => run_migrate_command(db, command).await?,
        Command::CreateAdmin { username, email, full_name, phone } => {
            app::run_migrations(db).await.map_err(|e| CliError::MigrationRunFailed { source: e })?;

            print!("Enter password for admin user '{username}': ");
            io::stdout().flush()?;
            let password = rpassword::read_password()?;
            let user = create_admin_user(db, &username, &email, &password, full_name, phone).await?;
            println!("Admin user '{}' created successfully (id {})!", user.username, user.id);
        }
        Command::SeedTemplates => {
            app::run_migrations(db).await.map_err(|e| CliError::MigrationRunFailed { source: e })?;
            match app::seed_default_templates(db).await? {
                0 => println!("Templates already exist, nothing to seed."),
                count => println!("Created {count} message templates!"),
            }
        }
    }
    Ok(true)
}

async fn run_migrate_command(db: &DbContext, command: MigrateCommand) -> Result<(), CliError> {
    match command {
        MigrateCommand::Create { name } => {
            let filename = app::create_migration(&name).map_err(|e| CliError::MigrationCreateFailed { source: e })?;
            println!("Created new migration file: {filename}");
        }
        MigrateCommand::List => {
            let migrations = app::list_migrations();
            if migrations.is_empty() {
                println!("No migrations found.");
            } else {
                println!("Available migrations:");
                for (i, migration) in migrations.iter().enumerate() {
                    println!("{}. {}", i + 1, migration);
                }
            }
        }
        MigrateCommand::Status => match app::migration_status(db).await {
            Ok(status) if status.pending() > 0 => {
                println!("{} of {} migrations applied, {} pending.", status.applied, status.available, status.pending());
            }
            Ok(status) => println!("Database is up to date ({} migrations applied).", status.applied),
            Err(MigrationError::NoMigrationsApplied) => println!("No migrations have been applied yet."),
            Err(e) => return Err(CliError::MigrationStatusCheckFailed { source: e }),
        },
        MigrateCommand::Run => {
            app::run_migrations(db).await.map_err(|e| CliError::MigrationRunFailed { source: e })?;
            println!("Migrations applied successfully.");
        }
    }
    Ok(())
}

pub async fn create_admin_user(
    db: &DbContext,
    username: &str,
    email: &str,
    password: &str,
    full_name: Option<String>,
    phone: Option<String>,
) -> Result<User, CliError> {
    auth::check_password_policy(password).map_err(CliError::PasswordRejected)?;
    if db::get_user_by_name(db, username).await.is_ok() || db::get_user_by_email(db, email).await.is_ok() {
        return Err(CliError::UserAlreadyExists(username.to_string()));
    }

    let user = db::create_user(db, NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password_hash: auth::hash_password(password)?,
        role: Role::SuperAdmin,
        phone,
        full_name,
    })
    .await?;
    tracing::info!(user_id = user.id, "Created super admin {}", user.username);
    Ok(user)
}
