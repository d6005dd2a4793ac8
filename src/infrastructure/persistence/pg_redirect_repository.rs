//! PostgreSQL implementation of the redirect repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{Destination, NewRedirectRule, RedirectRule, RuleId, RuleStatus};
use crate::domain::repositories::{RedirectRepository, StatusFilter};
use crate::error::AppError;

const RULE_COLUMNS: &str = "id, from_path, from_hash, post_id, target_url, status, created_at";

/// PostgreSQL repository for redirect rules.
///
/// Rules live in `legacy_redirects` with a unique index on `from_hash`.
pub struct PgRedirectRepository {
    pool: Arc<PgPool>,
}

impl PgRedirectRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RuleRow {
    id: i64,
    from_path: String,
    from_hash: String,
    post_id: Option<i64>,
    target_url: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RuleRow> for RedirectRule {
    type Error = AppError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let destination = match (row.post_id, row.target_url) {
            (Some(post_id), None) => Destination::Post(post_id),
            (None, Some(url)) => Destination::Url(url),
            _ => {
                return Err(AppError::internal(
                    "Redirect rule has an invalid destination",
                    json!({ "id": row.id }),
                ));
            }
        };

        let status = row.status.parse::<RuleStatus>().map_err(|e| {
            AppError::internal(
                "Redirect rule has an invalid status",
                json!({ "id": row.id, "reason": e }),
            )
        })?;

        Ok(RedirectRule::new(
            row.id,
            row.from_path,
            row.from_hash.trim_end().to_string(),
            destination,
            status,
            row.created_at,
        ))
    }
}

#[async_trait]
impl RedirectRepository for PgRedirectRepository {
    async fn insert(&self, new_rule: NewRedirectRule) -> Result<RedirectRule, AppError> {
        let (post_id, target_url) = match &new_rule.destination {
            Destination::Post(id) => (Some(*id), None),
            Destination::Url(url) => (None, Some(url.as_str())),
        };

        let sql = format!(
            "INSERT INTO legacy_redirects (from_path, from_hash, post_id, target_url) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            RULE_COLUMNS
        );

        let row = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(&new_rule.from_path)
            .bind(&new_rule.from_hash)
            .bind(post_id)
            .bind(target_url)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| match AppError::from(e) {
                err if err.is_conflict() => AppError::duplicate_rule(&new_rule.from_path),
                err => err,
            })?;

        row.try_into()
    }

    async fn find_by_hash(&self, from_hash: &str) -> Result<Option<RedirectRule>, AppError> {
        let sql = format!(
            "SELECT {} FROM legacy_redirects WHERE from_hash = $1",
            RULE_COLUMNS
        );

        let row = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(from_hash)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(RedirectRule::try_from).transpose()
    }

    async fn find_by_id(&self, id: RuleId) -> Result<Option<RedirectRule>, AppError> {
        let sql = format!("SELECT {} FROM legacy_redirects WHERE id = $1", RULE_COLUMNS);

        let row = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(RedirectRule::try_from).transpose()
    }

    async fn update_status(&self, id: RuleId, status: RuleStatus) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE legacy_redirects SET status = $2 WHERE id = $1 AND status <> $2")
                .bind(id)
                .bind(status.as_str())
                .execute(self.pool.as_ref())
                .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM legacy_redirects WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool.as_ref())
                .await?;

        if exists {
            Ok(false)
        } else {
            Err(AppError::not_found(
                "Redirect rule not found",
                json!({ "id": id }),
            ))
        }
    }

    async fn count(&self, filter: StatusFilter) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM legacy_redirects WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(filter.status().map(|s| s.as_str()))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn page(
        &self,
        filter: StatusFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RedirectRule>, AppError> {
        let sql = format!(
            "SELECT {} FROM legacy_redirects \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY COALESCE(post_id, 0), id \
             LIMIT $2 OFFSET $3",
            RULE_COLUMNS
        );

        let rows = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(filter.status().map(|s| s.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.into_iter().map(RedirectRule::try_from).collect()
    }

    async fn list_url_destinations(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<String>, AppError> {
        let urls = sqlx::query_scalar::<_, String>(
            "SELECT target_url FROM legacy_redirects \
             WHERE target_url LIKE 'http%' \
             ORDER BY id \
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(urls)
    }
}
