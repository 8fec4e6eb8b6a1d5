use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use stayswap_core::repository::{AcceptWrite, MatchRepository};
use stayswap_core::RepoResult;
use stayswap_domain::{MatchRecord, MatchStatus};
use uuid::Uuid;

pub struct PostgresMatchRepository {
    pub pool: PgPool,
}

fn row_to_match(row: &PgRow) -> RepoResult<MatchRecord> {
    let status: String = row.try_get("status")?;
    Ok(MatchRecord {
        id: row.try_get("id")?,
        edge_id: row.try_get("edge_id")?,
        source_swap_id: row.try_get("source_swap_id")?,
        target_swap_id: row.try_get("target_swap_id")?,
        source_booking_id: row.try_get("source_booking_id")?,
        target_booking_id: row.try_get("target_booking_id")?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl MatchRepository for PostgresMatchRepository {
    async fn get_match(&self, id: Uuid) -> RepoResult<Option<MatchRecord>> {
        let row = sqlx::query("SELECT * FROM swap_matches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_match).transpose()
    }

    async fn set_match_status(
        &self,
        id: Uuid,
        from: MatchStatus,
        to: MatchStatus,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE swap_matches SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(to.to_string())
        .bind(id)
        .bind(from.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit_accept(&self, record: &MatchRecord) -> RepoResult<AcceptWrite> {
        // Edge, both swaps, and the match row move together or not at all.
        let mut tx = self.pool.begin().await?;

        let accepted = sqlx::query(
            "UPDATE swap_targets SET status = 'ACCEPTED', updated_at = NOW() WHERE id = $1 AND status = 'ACTIVE'",
        )
        .bind(record.edge_id)
        .execute(&mut *tx)
        .await?;
        if accepted.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(AcceptWrite::EdgeNotActive);
        }

        for swap_id in [record.source_swap_id, record.target_swap_id] {
            let matched = sqlx::query(
                "UPDATE swaps SET status = 'MATCHED', updated_at = NOW() WHERE id = $1 AND status = 'ACTIVE'",
            )
            .bind(swap_id)
            .execute(&mut *tx)
            .await?;
            if matched.rows_affected() != 1 {
                tx.rollback().await?;
                return Ok(AcceptWrite::SwapNotActive(swap_id));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO swap_matches (id, edge_id, source_swap_id, target_swap_id,
                                      source_booking_id, target_booking_id, status,
                                      created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.edge_id)
        .bind(record.source_swap_id)
        .bind(record.target_swap_id)
        .bind(record.source_booking_id)
        .bind(record.target_booking_id)
        .bind(record.status.to_string())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AcceptWrite::Applied)
    }

    async fn commit_rollback(&self, record: &MatchRecord) -> RepoResult<bool> {
        // Gated on the match still being PENDING; a repeat commits nothing.
        let mut tx = self.pool.begin().await?;

        let rolled = sqlx::query(
            "UPDATE swap_matches SET status = 'ROLLED_BACK', updated_at = NOW() WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(record.id)
        .execute(&mut *tx)
        .await?;
        if rolled.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE swap_targets SET status = 'ACTIVE', updated_at = NOW() WHERE id = $1 AND status = 'ACCEPTED'",
        )
        .bind(record.edge_id)
        .execute(&mut *tx)
        .await?;

        for swap_id in [record.source_swap_id, record.target_swap_id] {
            sqlx::query(
                "UPDATE swaps SET status = 'ACTIVE', updated_at = NOW() WHERE id = $1 AND status = 'MATCHED'",
            )
            .bind(swap_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}
