use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;

use crate::models::{ConversationSummary, Interaction, Message, Page, Report};
use crate::services::store::{MessageStore, RelationshipStore, RelationshipTx, StoreError};

/// PostgreSQL-backed relationship and message store
///
/// Interactions are keyed by the `(actor_id, target_id)` primary key, so the
/// database rejects a second row for the same ordered pair even when two
/// inserts race. Every unit of work runs at `SERIALIZABLE` isolation.
#[derive(Clone)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Serializable transaction over the relationship tables
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RelationshipTx for PostgresTx {
    async fn find_interaction(
        &mut self,
        actor_id: &str,
        target_id: &str,
    ) -> Result<Option<Interaction>, StoreError> {
        let query = r#"
            SELECT actor_id, target_id, state, created_at
            FROM interactions
            WHERE actor_id = $1 AND target_id = $2
            FOR UPDATE
        "#;

        let interaction = sqlx::query_as::<_, Interaction>(query)
            .bind(actor_id)
            .bind(target_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(interaction)
    }

    async fn insert_interaction(&mut self, interaction: &Interaction) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO interactions (actor_id, target_id, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
        "#;

        sqlx::query(query)
            .bind(&interaction.actor_id)
            .bind(&interaction.target_id)
            .bind(interaction.state)
            .bind(interaction.created_at)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn mark_matched(&mut self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let query = r#"
            UPDATE interactions
            SET state = 'matched', updated_at = NOW()
            WHERE actor_id = $1 AND target_id = $2 AND state = 'liked'
        "#;

        let result = sqlx::query(query)
            .bind(actor_id)
            .bind(target_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_match(&mut self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let query = r#"
            UPDATE interactions
            SET state = 'unmatched', updated_at = NOW()
            WHERE actor_id = $1 AND target_id = $2 AND state = 'matched'
        "#;

        let result = sqlx::query(query)
            .bind(actor_id)
            .bind(target_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_block(&mut self, user_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let query = r#"
            INSERT INTO blocks (user_id, target_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, target_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .bind(target_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_block(&mut self, user_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM blocks WHERE user_id = $1 AND target_id = $2")
            .bind(user_id)
            .bind(target_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_report(&mut self, report: &Report) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO reports (id, reporter_id, target_id, reason, created_at)
            VALUES ($1, $2, $3, $4, $5)
        "#;

        sqlx::query(query)
            .bind(report.id)
            .bind(&report.reporter_id)
            .bind(&report.target_id)
            .bind(&report.reason)
            .bind(report.created_at)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RelationshipStore for PostgresClient {
    async fn begin(&self) -> Result<Box<dyn RelationshipTx>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PostgresTx { tx }))
    }

    async fn is_matched(&self, user_a: &str, user_b: &str) -> Result<bool, StoreError> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1
                FROM interactions
                WHERE state = 'matched'
                  AND ((actor_id = $1 AND target_id = $2) OR (actor_id = $2 AND target_id = $1))
            )
        "#;

        let matched: bool = sqlx::query_scalar(query)
            .bind(user_a)
            .bind(user_b)
            .fetch_one(&self.pool)
            .await?;

        Ok(matched)
    }

    async fn interacted_targets(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let targets: Vec<String> = sqlx::query_scalar(
            "SELECT target_id FROM interactions WHERE actor_id = $1 ORDER BY target_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!("User {} has interacted with {} users", user_id, targets.len());

        Ok(targets)
    }

    async fn matched_partners(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let partners: Vec<String> = sqlx::query_scalar(
            "SELECT target_id FROM interactions WHERE actor_id = $1 AND state = 'matched' ORDER BY target_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(partners)
    }

    async fn blocked_users(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let blocked: Vec<String> = sqlx::query_scalar(
            "SELECT target_id FROM blocks WHERE user_id = $1 ORDER BY target_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(blocked)
    }

    async fn is_blocked(&self, user_id: &str, target_id: &str) -> Result<bool, StoreError> {
        let blocked: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM blocks WHERE user_id = $1 AND target_id = $2)",
        )
        .bind(user_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(blocked)
    }

    async fn reports_for(&self, target_id: &str) -> Result<Vec<Report>, StoreError> {
        let query = r#"
            SELECT id, reporter_id, target_id, reason, created_at
            FROM reports
            WHERE target_id = $1
            ORDER BY created_at ASC
        "#;

        let reports = sqlx::query_as::<_, Report>(query)
            .bind(target_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(reports)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl MessageStore for PostgresClient {
    async fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#;

        sqlx::query(query)
            .bind(message.id)
            .bind(&message.sender_id)
            .bind(&message.receiver_id)
            .bind(&message.content)
            .bind(message.read)
            .bind(message.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64, StoreError> {
        let query = r#"
            UPDATE messages
            SET read = TRUE
            WHERE sender_id = $1 AND receiver_id = $2 AND read = FALSE
        "#;

        let result = sqlx::query(query)
            .bind(sender_id)
            .bind(receiver_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
        page: Page,
    ) -> Result<Vec<Message>, StoreError> {
        let query = r#"
            SELECT id, sender_id, receiver_id, content, read, created_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
        "#;

        let messages = sqlx::query_as::<_, Message>(query)
            .bind(user_a)
            .bind(user_b)
            .bind(page.limit as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(messages)
    }

    async fn conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let query = r#"
            WITH thread AS (
                SELECT
                    CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END AS partner_id,
                    id, sender_id, receiver_id, content, read, created_at
                FROM messages
                WHERE sender_id = $1 OR receiver_id = $1
            ),
            last_messages AS (
                SELECT DISTINCT ON (partner_id)
                    partner_id, id, sender_id, receiver_id, content, read, created_at
                FROM thread
                ORDER BY partner_id, created_at DESC
            ),
            unread_counts AS (
                SELECT sender_id AS partner_id, COUNT(*) AS unread_count
                FROM messages
                WHERE receiver_id = $1 AND read = FALSE
                GROUP BY sender_id
            )
            SELECT
                lm.partner_id, lm.id, lm.sender_id, lm.receiver_id, lm.content, lm.read, lm.created_at,
                COALESCE(uc.unread_count, 0) AS unread_count
            FROM last_messages lm
            LEFT JOIN unread_counts uc ON uc.partner_id = lm.partner_id
            ORDER BY lm.created_at DESC
        "#;

        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(summary_from_row).collect())
    }
}

fn summary_from_row(row: &PgRow) -> ConversationSummary {
    ConversationSummary {
        partner_id: row.get("partner_id"),
        last_message: Message {
            id: row.get("id"),
            sender_id: row.get("sender_id"),
            receiver_id: row.get("receiver_id"),
            content: row.get("content"),
            read: row.get("read"),
            created_at: row.get("created_at"),
        },
        unread_count: row.get("unread_count"),
    }
}
