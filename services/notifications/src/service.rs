//! The notification service used by ingestion/OCR/reporting/analytics
//! workers (spec §4.L): creates an in-app row and optionally dispatches
//! email. Email failures never fail the caller.

use std::sync::Arc;

use carbonledger_core::entities::{Notification, NotificationKind};
use carbonledger_core::error::AppResult;
use carbonledger_storage::repositories::core::UserRepository;
use carbonledger_storage::repositories::notifications::NotificationRepository;
use chrono::Utc;
use uuid::Uuid;

use crate::email::{EmailMessage, EmailSender};
use crate::templates;

#[derive(Clone)]
pub struct NotificationService {
    notifications: NotificationRepository,
    users: UserRepository,
    email: Arc<dyn EmailSender>,
}

impl NotificationService {
    pub fn new(
        notifications: NotificationRepository,
        users: UserRepository,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            notifications,
            users,
            email,
        }
    }

    /// Create the in-app row and, best-effort, mirror it by email.
    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: &str,
        action_url: Option<&str>,
        also_email: bool,
    ) -> AppResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.to_string(),
            body: body.to_string(),
            action_url: action_url.map(str::to_string),
            is_read: false,
            created_at: Utc::now(),
        };
        self.notifications.create(&notification).await?;

        if also_email {
            if let Ok(user) = self.users.find_by_id(user_id).await {
                let html_body = templates::render(kind, title, body, action_url);
                self.email
                    .send(EmailMessage {
                        to: user.email,
                        subject: title.to_string(),
                        html_body,
                    })
                    .await;
            } else {
                tracing::warn!(%user_id, "notification target user not found, skipping email");
            }
        }

        Ok(notification)
    }
}
