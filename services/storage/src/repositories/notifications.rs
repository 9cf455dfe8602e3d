//! In-app notifications, badges and leaderboard rows.

use carbonledger_core::entities::{Badge, LeaderboardEntry, Notification, NotificationKind, UserBadge};
use carbonledger_core::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    title: String,
    body: String,
    action_url: Option<String>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: parse_kind(&row.kind)?,
            title: row.title,
            body: row.body,
            action_url: row.action_url,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

fn parse_kind(raw: &str) -> AppResult<NotificationKind> {
    match raw {
        "invoice_processed" => Ok(NotificationKind::InvoiceProcessed),
        "report_ready" => Ok(NotificationKind::ReportReady),
        "anomaly" => Ok(NotificationKind::Anomaly),
        "supplier_invite" => Ok(NotificationKind::SupplierInvite),
        "general" => Ok(NotificationKind::General),
        other => Err(AppError::Internal(format!("unknown notification kind {other}"))),
    }
}

pub fn kind_str(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::InvoiceProcessed => "invoice_processed",
        NotificationKind::ReportReady => "report_ready",
        NotificationKind::Anomaly => "anomaly",
        NotificationKind::SupplierInvite => "supplier_invite",
        NotificationKind::General => "general",
    }
}

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, body, action_url, is_read, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(kind_str(notification.kind))
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.action_url)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: Uuid, unread_only: bool) -> AppResult<Vec<Notification>> {
        let rows = if unread_only {
            sqlx::query_as::<_, NotificationRow>(
                "SELECT id, user_id, kind, title, body, action_url, is_read, created_at
                 FROM notifications WHERE user_id = $1 AND is_read = FALSE ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, NotificationRow>(
                "SELECT id, user_id, kind, title, body, action_url, is_read, created_at
                 FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
        };
        rows.into_iter().map(Notification::try_from).collect()
    }

    pub async fn mark_read(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct BadgeRepository {
    pool: PgPool,
}

impl BadgeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<Badge>> {
        let badge = sqlx::query_as::<_, Badge>(
            "SELECT id, code, name, description FROM badges WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(badge)
    }

    pub async fn award(&self, user_id: Uuid, badge_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_badges (user_id, badge_id, earned_at) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, badge_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(badge_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<UserBadge>> {
        let rows = sqlx::query_as::<_, UserBadge>(
            "SELECT user_id, badge_id, earned_at FROM user_badges WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(Clone)]
pub struct LeaderboardRepository {
    pool: PgPool,
}

impl LeaderboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replaces the ranked rows for an industry/region pair in one transaction,
    /// called by the weekly analytics refresh.
    pub async fn replace_for_industry_region(
        &self,
        industry_type: &str,
        region: &str,
        entries: &[(Uuid, i32, Decimal)],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM leaderboard_entries WHERE industry_type = $1 AND region = $2")
            .bind(industry_type)
            .bind(region)
            .execute(&mut *tx)
            .await?;

        for (company_id, rank, score) in entries {
            sqlx::query(
                "INSERT INTO leaderboard_entries
                 (id, company_id, industry_type, region, rank, efficiency_score, computed_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(company_id)
            .bind(industry_type)
            .bind(region)
            .bind(rank)
            .bind(score)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_top(
        &self,
        industry_type: &str,
        region: &str,
        limit: i64,
    ) -> AppResult<Vec<LeaderboardEntry>> {
        let rows = sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT id, company_id, industry_type, region, rank, efficiency_score, computed_at
             FROM leaderboard_entries
             WHERE industry_type = $1 AND region = $2
             ORDER BY rank ASC LIMIT $3",
        )
        .bind(industry_type)
        .bind(region)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
