use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use stayswap_core::repository::TargetRepository;
use stayswap_core::RepoResult;
use stayswap_domain::{SwapTarget, TargetStatus};
use uuid::Uuid;

pub struct PostgresTargetRepository {
    pub pool: PgPool,
}

pub(crate) fn row_to_target(row: &PgRow) -> RepoResult<SwapTarget> {
    let status: String = row.try_get("status")?;
    Ok(SwapTarget {
        id: row.try_get("id")?,
        source_swap_id: row.try_get("source_swap_id")?,
        target_swap_id: row.try_get("target_swap_id")?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Serializes concurrent inserts against the same target swap, then re-checks
/// incoming exclusivity inside the transaction. The advisory lock is released
/// at commit or rollback. Returns false when another active incoming edge
/// already exists.
async fn incoming_slot_free(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    target_swap_id: Uuid,
    excluding: Option<Uuid>,
) -> RepoResult<bool> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(target_swap_id)
        .execute(&mut **tx)
        .await?;
    let taken = sqlx::query(
        r#"
        SELECT 1 FROM swap_targets
        WHERE target_swap_id = $1 AND status = 'ACTIVE'
          AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(target_swap_id)
    .bind(excluding)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(taken.is_none())
}

async fn insert_edge_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    edge: &SwapTarget,
) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO swap_targets (id, source_swap_id, target_swap_id, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(edge.id)
    .bind(edge.source_swap_id)
    .bind(edge.target_swap_id)
    .bind(edge.status.to_string())
    .bind(edge.created_at)
    .bind(edge.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl TargetRepository for PostgresTargetRepository {
    async fn insert_target(&self, edge: &SwapTarget, exclusive_target: bool) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;
        if exclusive_target && !incoming_slot_free(&mut tx, edge.target_swap_id, None).await? {
            tx.rollback().await?;
            return Ok(false);
        }
        insert_edge_row(&mut tx, edge).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn get_target(&self, id: Uuid) -> RepoResult<Option<SwapTarget>> {
        let row = sqlx::query("SELECT * FROM swap_targets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_target).transpose()
    }

    async fn set_target_status(
        &self,
        id: Uuid,
        from: TargetStatus,
        to: TargetStatus,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE swap_targets SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(to.to_string())
        .bind(id)
        .bind(from.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn outgoing(
        &self,
        source_swap_id: Uuid,
        include_historical: bool,
    ) -> RepoResult<Vec<SwapTarget>> {
        let sql = if include_historical {
            "SELECT * FROM swap_targets WHERE source_swap_id = $1 ORDER BY created_at"
        } else {
            "SELECT * FROM swap_targets WHERE source_swap_id = $1 AND status = 'ACTIVE'"
        };
        let rows = sqlx::query(sql)
            .bind(source_swap_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_target).collect()
    }

    async fn incoming(
        &self,
        target_swap_id: Uuid,
        include_historical: bool,
    ) -> RepoResult<Vec<SwapTarget>> {
        let sql = if include_historical {
            "SELECT * FROM swap_targets WHERE target_swap_id = $1 ORDER BY created_at"
        } else {
            "SELECT * FROM swap_targets WHERE target_swap_id = $1 AND status = 'ACTIVE'"
        };
        let rows = sqlx::query(sql)
            .bind(target_swap_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_target).collect()
    }

    async fn replace_outgoing(
        &self,
        cancel_edge_id: Uuid,
        new_edge: &SwapTarget,
        exclusive_target: bool,
    ) -> RepoResult<bool> {
        // One transaction: the cancel must not commit if the insert fails,
        // and a refused replacement leaves the old edge untouched.
        let mut tx = self.pool.begin().await?;

        if exclusive_target
            && !incoming_slot_free(&mut tx, new_edge.target_swap_id, Some(cancel_edge_id)).await?
        {
            tx.rollback().await?;
            return Ok(false);
        }

        let cancelled = sqlx::query(
            "UPDATE swap_targets SET status = 'CANCELLED', updated_at = NOW() WHERE id = $1 AND status = 'ACTIVE'",
        )
        .bind(cancel_edge_id)
        .execute(&mut *tx)
        .await?;
        if cancelled.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(format!("edge {} is not active", cancel_edge_id).into());
        }

        insert_edge_row(&mut tx, new_edge).await?;
        tx.commit().await?;
        Ok(true)
    }
}
