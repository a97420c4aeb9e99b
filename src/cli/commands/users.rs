use clap::Subcommand;

use super::{open_context, require_session, CliConfirm};
use crate::api::Page;
use crate::cli::utils::{self, output_item, output_list, output_success};
use crate::cli::OutputFormat;
use crate::models::{RoleInput, User, UserInput, UserUpdate};
use crate::screens::{DeleteOutcome, UsersScreen};

#[derive(Subcommand)]
pub enum UserCommands {
    /// List users
    List {
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Show one user
    Show { id: i64 },
    /// Show the signed-in user record
    Me,
    /// Create a user
    Create {
        username: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        role_id: i64,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Update fields of a user; omitted fields are left unchanged
    Update {
        id: i64,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        role_id: Option<i64>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a user
    Delete {
        id: i64,
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// List roles
    Roles,
    /// Add a role
    AddRole {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
}

fn user_line(user: &User) -> String {
    let status = if user.is_active { "" } else { " [inactive]" };
    format!(
        "{:>5}  {:<20} {:<30} {}{}",
        user.id, user.username, user.full_name, user.role.name, status
    )
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;
    require_session(&ctx).await?;
    let screen = UsersScreen::new(&ctx);

    match cmd {
        UserCommands::List { skip, limit } => {
            let users = screen.list(Page::new(skip, limit)).await?;
            output_list(&output_format, "users", &users, "No users found", user_line)
        }

        UserCommands::Show { id } => {
            let user = screen
                .detail(Some(id))
                .await?
                .ok_or_else(|| anyhow::anyhow!("User {} not found", id))?;
            output_item(&output_format, &user, vec![user_line(&user)])
        }

        UserCommands::Me => {
            let user = screen.current().await?;
            output_item(&output_format, &user, vec![user_line(&user)])
        }

        UserCommands::Create { username, full_name, role_id, password } => {
            let password = match password {
                Some(p) => p,
                None => utils::prompt_line("Password for new user: ")?,
            };
            let user = screen
                .create(&UserInput {
                    username,
                    full_name,
                    password,
                    role_id,
                })
                .await?;
            output_success(
                &output_format,
                &format!("User '{}' created (id {})", user.username, user.id),
                Some(serde_json::to_value(&user)?),
            )
        }

        UserCommands::Update { id, username, full_name, password, role_id, active } => {
            let update = UserUpdate {
                username,
                full_name,
                password,
                role_id,
                is_active: active,
            };
            let user = screen.update(id, &update).await?;
            output_success(
                &output_format,
                &format!("User '{}' updated", user.username),
                Some(serde_json::to_value(&user)?),
            )
        }

        UserCommands::Delete { id, yes } => {
            let confirm = CliConfirm { assume_yes: yes };
            match screen.delete_by_id(id, &format!("#{}", id), &confirm).await? {
                DeleteOutcome::Deleted(user) => {
                    output_success(&output_format, &format!("User '{}' deleted", user.username), None)
                }
                DeleteOutcome::Cancelled => output_success(&output_format, "Cancelled", None),
            }
        }

        UserCommands::Roles => {
            let roles = screen.roles().await?;
            output_list(&output_format, "roles", &roles, "No roles defined", |r| {
                format!("{:>5}  {:<12} {}", r.id, r.name, r.description.as_deref().unwrap_or(""))
            })
        }

        UserCommands::AddRole { name, description } => {
            let role = screen.create_role(&RoleInput { name, description }).await?;
            output_success(
                &output_format,
                &format!("Role '{}' created (id {})", role.name, role.id),
                Some(serde_json::to_value(&role)?),
            )
        }
    }
}
