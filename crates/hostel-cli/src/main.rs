//! InstaSolve CLI - log in to the hostel complaint system and manage the session.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use hostel_auth::{AuthError, LoginType};

/// InstaSolve CLI - authentication and session management.
#[derive(Parser)]
#[command(name = "instasolve")]
#[command(about = "InstaSolve CLI for hostel complaint system accounts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Backend API root, e.g. http://localhost:8000/accounts/api/
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with a roll number or institute email
    Login {
        /// Which login form to use
        #[arg(short = 't', long = "type", value_enum, default_value = "student")]
        login_type: LoginTypeArg,

        /// Roll number (students) or @iiitkottayam.ac.in email (staff); prompted if omitted
        identifier: Option<String>,

        /// Keep the session after this process exits
        #[arg(short, long)]
        remember: bool,
    },

    /// Logout and clear the stored session
    Logout,

    /// Check authentication status
    Status,

    /// Exchange the refresh token for a new access token now
    Refresh,

    /// Keep the session fresh until interrupted
    Keepalive {
        /// Seconds between refreshes; defaults to the config file
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Check whether the current session may open an application route
    Route {
        /// Route path, e.g. /SDash
        path: String,
    },

    /// Show the logged-in user's profile
    Profile,

    /// Reset a forgotten password
    ResetPassword {
        #[command(subcommand)]
        command: ResetCommands,
    },
}

#[derive(Subcommand)]
enum ResetCommands {
    /// Email a reset link
    Request {
        /// Institute email or roll number
        email_or_roll: String,
    },
    /// Set a new password from a reset link
    Confirm {
        /// `uid` parameter of the reset link
        uid: String,
        /// `token` parameter of the reset link
        token: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LoginTypeArg {
    Student,
    Staff,
}

impl From<LoginTypeArg> for LoginType {
    fn from(arg: LoginTypeArg) -> Self {
        match arg {
            LoginTypeArg::Student => LoginType::Student,
            LoginTypeArg::Staff => LoginType::Staff,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let ctx = match commands::Context::build(cli.log_level.as_deref(), cli.api_url.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output::print_error(&format!("{:#}", e), &cli.format);
            std::process::exit(1);
        }
    };

    let format = cli.format;
    let result = match cli.command {
        Commands::Login {
            login_type,
            identifier,
            remember,
        } => commands::login(&ctx, login_type.into(), identifier, remember, &format).await,
        Commands::Logout => commands::logout(&ctx, &format),
        Commands::Status => commands::status(&ctx, &format),
        Commands::Refresh => commands::refresh(&ctx, &format).await,
        Commands::Keepalive { interval_secs } => {
            commands::keepalive(&ctx, interval_secs, &format).await
        }
        Commands::Route { path } => commands::route(&ctx, &path, &format),
        Commands::Profile => commands::profile(&ctx, &format).await,
        Commands::ResetPassword { command } => match command {
            ResetCommands::Request { email_or_roll } => {
                commands::reset_request(&ctx, &email_or_roll, &format).await
            }
            ResetCommands::Confirm { uid, token } => {
                commands::reset_confirm(&ctx, &uid, &token, &format).await
            }
        },
    };

    if let Err(e) = result {
        output::print_error(&error_message(&e), &format);
        std::process::exit(1);
    }
}

/// Render an error chain, with a retry hint when the failure is transient.
fn error_message(error: &anyhow::Error) -> String {
    let message = format!("{:#}", error);
    match error.downcast_ref::<AuthError>() {
        Some(auth_error) if auth_error.is_retryable() => {
            format!("{}. Check your connection and try again.", message)
        }
        _ => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_suggest_retrying() {
        let error = anyhow::Error::from(AuthError::Network("connection refused".to_string()));
        assert_eq!(
            error_message(&error),
            "Network error: connection refused. Check your connection and try again."
        );

        let error = anyhow::Error::from(AuthError::HttpStatus {
            status: 503,
            message: "Service unavailable".to_string(),
        });
        assert!(error_message(&error).ends_with("try again."));
    }

    #[test]
    fn test_other_errors_have_no_retry_hint() {
        let error = anyhow::Error::from(AuthError::InvalidCredentials(
            "Invalid roll number or password".to_string(),
        ));
        assert_eq!(error_message(&error), "Invalid roll number or password");

        let error = anyhow::anyhow!("Session ended; log in again");
        assert_eq!(error_message(&error), "Session ended; log in again");
    }
}
