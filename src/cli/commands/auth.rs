use clap::Subcommand;
use serde_json::json;

use super::{open_context, require_session};
use crate::cli::utils::{self, output_success};
use crate::cli::OutputFormat;
use crate::navigation::screens_for;

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the credential
    Login {
        /// Username to sign in as
        username: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and remove the stored credential
    Logout,
    /// Show session status and the screens available to the role
    Status,
    /// Print the signed-in user
    Whoami,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;

    match cmd {
        AuthCommands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => utils::prompt_line("Password: ")?,
            };

            let principal = ctx.login(&username, &password).await?;
            ctx.shutdown().await;

            output_success(
                &output_format,
                &format!("Signed in as {} ({})", principal.display_name, principal.role.as_str()),
                Some(serde_json::to_value(&principal)?),
            )
        }

        AuthCommands::Logout => {
            // Restore first so the backend is told about the credential being dropped
            let _ = ctx.session().restore().await;
            ctx.logout().await;
            output_success(&output_format, "Signed out", None)
        }

        AuthCommands::Status => {
            let principal = ctx.session().restore().await;
            let expires_at = ctx.session().credential_expiry().await;
            let screens: Vec<&str> = principal
                .as_ref()
                .map(|p| screens_for(p.role).iter().map(|s| s.title(ctx.locale())).collect())
                .unwrap_or_default();

            match output_format {
                OutputFormat::Json => {
                    let status = json!({
                        "authenticated": principal.is_some(),
                        "principal": principal,
                        "expires_at": expires_at,
                        "screens": screens,
                        "api_url": ctx.config().api.base_url,
                    });
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                OutputFormat::Text => match principal {
                    Some(p) => {
                        println!("Signed in as {} ({})", p.username, p.role.as_str());
                        if let Some(exp) = expires_at {
                            println!("Token expires: {}", exp.format("%Y-%m-%d %H:%M:%S UTC"));
                        }
                        println!("Screens: {}", screens.join(", "));
                        println!("API: {}", ctx.config().api.base_url);
                    }
                    None => println!("Not signed in"),
                },
            }
            Ok(())
        }

        AuthCommands::Whoami => {
            let principal = require_session(&ctx).await?;
            utils::output_item(
                &output_format,
                &principal,
                vec![format!("{} ({}) - {}", principal.username, principal.role.as_str(), principal.display_name)],
            )
        }
    }
}
