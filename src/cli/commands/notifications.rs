use clap::Subcommand;

use super::{open_context, require_session};
use crate::api::Page;
use crate::cli::utils::{output_list, output_success};
use crate::cli::OutputFormat;
use crate::models::{AuditLog, Notification};
use crate::screens::{NotificationFilter, NotificationsScreen};

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// List notifications
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Mark one notification as read
    Read { id: i64 },
    /// Mark every notification as read
    ReadAll,
    /// Audit trail (administrators)
    Audit {
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "100")]
        limit: u32,
    },
}

fn notification_line(notification: &Notification) -> String {
    let marker = if notification.is_read { " " } else { "*" };
    let kind = notification
        .notification_type
        .as_ref()
        .map(|t| t.name.as_str())
        .unwrap_or("-");
    format!(
        "{}{:>5}  {}  [{}] {}",
        marker,
        notification.id,
        notification.created_at.format("%Y-%m-%d %H:%M"),
        kind,
        notification.message
    )
}

fn audit_line(entry: &AuditLog) -> String {
    let who = entry.user.as_ref().map(|u| u.username.as_str()).unwrap_or("system");
    let target = match (&entry.target_entity_type, entry.target_entity_id) {
        (Some(kind), Some(id)) => format!(" {}#{}", kind, id),
        (Some(kind), None) => format!(" {}", kind),
        _ => String::new(),
    };
    format!(
        "{}  {:<12} {:<24}{} [{}]",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        who,
        entry.action,
        target,
        entry.status
    )
}

pub async fn handle(cmd: NotificationCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;
    require_session(&ctx).await?;
    let screen = NotificationsScreen::new(&ctx);

    match cmd {
        NotificationCommands::List { unread, skip, limit } => {
            let filter = NotificationFilter {
                unread_only: unread,
                page: Page::new(skip, limit),
            };
            let notifications = screen.list(&filter).await?;
            output_list(&output_format, "notifications", &notifications, "No notifications", notification_line)
        }

        NotificationCommands::Read { id } => {
            let notification = screen.mark_read(id).await?;
            output_success(
                &output_format,
                &format!("Notification {} marked as read", notification.id),
                None,
            )
        }

        NotificationCommands::ReadAll => {
            let ack = screen.mark_all_read().await?;
            let message = if ack.message.is_empty() {
                "All notifications marked as read".to_string()
            } else {
                ack.message
            };
            output_success(&output_format, &message, None)
        }

        NotificationCommands::Audit { skip, limit } => {
            let entries = screen
                .audit_logs(Page::new(skip, limit))
                .await?
                .ok_or_else(|| anyhow::anyhow!("The audit trail is only available to administrators"))?;
            output_list(&output_format, "audit_logs", &entries, "No audit entries", audit_line)
        }
    }
}
