use crate::api::{Page, Query};
use crate::cache::{CacheKey, EntityKind};
use crate::channel::{ConnectionState, InboundMessage};
use crate::context::AppContext;
use crate::models::{AuditLog, Notification, ServerMessage};
use crate::navigation::Capability;
use crate::notice::{Notice, Operation};

use super::{load, mutate};

const NOTIFICATIONS: &str = "/api/notifications/";
const AUDIT_LOGS: &str = "/api/audit-logs/";

#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub page: Page,
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            unread_only: false,
            page: Page::first(100),
        }
    }
}

impl NotificationFilter {
    pub fn unread(limit: u32) -> Self {
        Self {
            unread_only: true,
            page: Page::first(limit),
        }
    }

    pub fn to_query(&self) -> Query {
        Query::new().page(self.page).push("unread_only", self.unread_only)
    }
}

pub struct NotificationsScreen<'a> {
    ctx: &'a AppContext,
}

impl<'a> NotificationsScreen<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &NotificationFilter) -> Result<Vec<Notification>, Notice> {
        let query = filter.to_query();
        let key = CacheKey::with_query(EntityKind::Notifications, &query);
        load(self.ctx, key, NOTIFICATIONS.to_string(), query).await
    }

    pub async fn mark_read(&self, id: i64) -> Result<Notification, Notice> {
        let path = format!("{}{}/mark-as-read", NOTIFICATIONS, id);
        let empty = Query::new();
        let request = self.ctx.api().post_query::<Notification>(&path, &empty);
        mutate(
            self.ctx,
            Operation::MarkNotificationRead,
            request,
            &[EntityKind::Notifications.into()],
        )
        .await
    }

    pub async fn mark_all_read(&self) -> Result<ServerMessage, Notice> {
        let path = format!("{}mark-all-as-read", NOTIFICATIONS);
        let empty = Query::new();
        let request = self.ctx.api().post_query::<ServerMessage>(&path, &empty);
        mutate(
            self.ctx,
            Operation::MarkAllNotificationsRead,
            request,
            &[EntityKind::Notifications.into()],
        )
        .await
    }

    /// Recent audit trail; `None` for everyone but administrators
    pub async fn audit_logs(&self, page: Page) -> Result<Option<Vec<AuditLog>>, Notice> {
        if !self.ctx.can(Capability::ViewAuditLogs).await {
            return Ok(None);
        }
        let query = Query::new().page(page);
        let key = CacheKey::with_query(EntityKind::AuditLogs, &query);
        load(self.ctx, key, AUDIT_LOGS.to_string(), query).await.map(Some)
    }

    /// Messages received over the live channel, oldest first
    pub async fn live_messages(&self) -> Vec<InboundMessage> {
        self.ctx.channel().recent_messages().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ctx.channel().state()
    }
}
