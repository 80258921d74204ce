//! crates/membership_core/src/notifications.rs
//!
//! Delivers notifications to one user or to everyone and tracks read state.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Notification, NotificationDraft, NotificationType};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::DatabaseService;
use crate::session::SessionContext;

pub const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    User(Uuid),
    All,
}

/// One manual send as shown in the admin history. A broadcast appears once.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub recipients: usize,
}

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<dyn DatabaseService>,
}

impl NotificationService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Admin send. `Recipient::All` writes one row per profile in a single
    /// store call. Returns the number of notifications created.
    pub async fn notify(
        &self,
        ctx: &SessionContext,
        recipient: Recipient,
        mut draft: NotificationDraft,
    ) -> ServiceResult<u64> {
        let admin_id = ctx.require_admin()?;
        draft.title = draft.title.trim().to_string();
        draft.message = draft.message.trim().to_string();
        if draft.title.is_empty() || draft.message.is_empty() {
            return Err(ServiceError::Validation(
                "title and message are required".to_string(),
            ));
        }
        draft.link = draft.link.filter(|l| !l.trim().is_empty());
        draft.sender_id = draft.sender_id.or(Some(admin_id));

        let written = match recipient {
            Recipient::User(user_id) => {
                self.db.insert_notification(user_id, draft).await?;
                1
            }
            Recipient::All => self.db.insert_notification_for_all(draft).await?,
        };
        info!(%admin_id, ?recipient, written, "notification sent");
        Ok(written)
    }

    /// System-originated notification to a single user; no caller check.
    pub(crate) async fn notify_system(
        &self,
        user_id: Uuid,
        draft: NotificationDraft,
    ) -> ServiceResult<Notification> {
        Ok(self.db.insert_notification(user_id, draft).await?)
    }

    pub async fn list_for_user(
        &self,
        ctx: &SessionContext,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Notification>> {
        let user_id = ctx.require_user()?;
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 200);
        Ok(self.db.list_notifications(user_id, limit).await?)
    }

    pub async fn unread_count(&self, ctx: &SessionContext) -> ServiceResult<i64> {
        let user_id = ctx.require_user()?;
        Ok(self.db.count_unread_notifications(user_id).await?)
    }

    /// Marks one of the caller's notifications read. Someone else's id is
    /// reported as not found.
    pub async fn mark_read(&self, ctx: &SessionContext, notification_id: Uuid) -> ServiceResult<()> {
        let user_id = ctx.require_user()?;
        let notification = self.db.get_notification(notification_id).await?;
        if notification.user_id != user_id {
            return Err(ServiceError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }
        if !notification.read {
            self.db.mark_notification_read(notification_id).await?;
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, ctx: &SessionContext) -> ServiceResult<u64> {
        let user_id = ctx.require_user()?;
        Ok(self.db.mark_all_notifications_read(user_id).await?)
    }

    /// Recent manual sends, grouped by title, message and send second.
    pub async fn sent_history(&self, ctx: &SessionContext) -> ServiceResult<Vec<SentNotification>> {
        ctx.require_admin()?;
        let rows = self
            .db
            .list_notifications_by_type(NotificationType::Manual, 500)
            .await?;
        let mut history: Vec<SentNotification> = Vec::new();
        for n in rows {
            let second = n.created_at.timestamp();
            match history.iter_mut().find(|h| {
                h.title == n.title && h.message == n.message && h.created_at.timestamp() == second
            }) {
                Some(existing) => existing.recipients += 1,
                None => history.push(SentNotification {
                    title: n.title,
                    message: n.message,
                    link: n.link,
                    created_at: n.created_at,
                    recipients: 1,
                }),
            }
        }
        history.truncate(DEFAULT_LIST_LIMIT as usize);
        Ok(history)
    }
}
