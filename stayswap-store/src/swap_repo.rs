use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use stayswap_core::booking::BookingDirectory;
use stayswap_core::repository::SwapRepository;
use stayswap_core::RepoResult;
use stayswap_domain::{
    AuctionWindow, Booking, BookingStatus, DateRange, Location, Swap, SwapStatus, SwapTarget,
};
use uuid::Uuid;

pub struct PostgresSwapRepository {
    pub pool: PgPool,
}

fn row_to_swap(row: &PgRow) -> RepoResult<Swap> {
    let auction_starts: Option<DateTime<Utc>> = row.try_get("auction_starts_at")?;
    let auction_ends: Option<DateTime<Utc>> = row.try_get("auction_ends_at")?;
    let auction_window = match (auction_starts, auction_ends) {
        (Some(starts_at), Some(ends_at)) => Some(AuctionWindow { starts_at, ends_at }),
        _ => None,
    };

    let mode: String = row.try_get("mode")?;
    let status: String = row.try_get("status")?;

    Ok(Swap {
        id: row.try_get("id")?,
        source_booking_id: row.try_get("source_booking_id")?,
        mode: mode.parse()?,
        auction_window,
        expires_at: row.try_get("expires_at")?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl SwapRepository for PostgresSwapRepository {
    async fn insert_swap(&self, swap: &Swap) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO swaps (id, source_booking_id, mode, auction_starts_at, auction_ends_at,
                               expires_at, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(swap.id)
        .bind(swap.source_booking_id)
        .bind(swap.mode.to_string())
        .bind(swap.auction_window.map(|w| w.starts_at))
        .bind(swap.auction_window.map(|w| w.ends_at))
        .bind(swap.expires_at)
        .bind(swap.status.to_string())
        .bind(swap.created_at)
        .bind(swap.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_swap(&self, id: Uuid) -> RepoResult<Option<Swap>> {
        let row = sqlx::query("SELECT * FROM swaps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_swap).transpose()
    }

    async fn find_active_by_booking(&self, booking_id: Uuid) -> RepoResult<Option<Swap>> {
        let row = sqlx::query("SELECT * FROM swaps WHERE source_booking_id = $1 AND status = 'ACTIVE'")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_swap).transpose()
    }

    async fn set_swap_status(&self, id: Uuid, from: SwapStatus, to: SwapStatus) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE swaps SET status = $1, updated_at = NOW() WHERE id = $2 AND status = $3",
        )
        .bind(to.to_string())
        .bind(id)
        .bind(from.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> RepoResult<Vec<Swap>> {
        let rows = sqlx::query("SELECT * FROM swaps WHERE status = 'ACTIVE' AND expires_at <= $1")
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_swap).collect()
    }

    async fn expire_swap(&self, id: Uuid) -> RepoResult<Option<Vec<SwapTarget>>> {
        // Expire the swap and sever its edges in one transaction; a crash
        // cannot leave an expired swap with live edges.
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query(
            "UPDATE swaps SET status = 'EXPIRED', updated_at = NOW() WHERE id = $1 AND status = 'ACTIVE'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if expired.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(None);
        }

        let rows = sqlx::query(
            r#"
            UPDATE swap_targets SET status = 'CANCELLED', updated_at = NOW()
            WHERE status = 'ACTIVE' AND (source_swap_id = $1 OR target_swap_id = $1)
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let cancelled = rows
            .iter()
            .map(crate::target_repo::row_to_target)
            .collect::<RepoResult<Vec<_>>>()?;

        tx.commit().await?;
        Ok(Some(cancelled))
    }
}

/// Booking read model backed by the shared database. Writes only the status
/// column; everything else belongs to the booking collaborator.
pub struct PostgresBookingDirectory {
    pub pool: PgPool,
}

fn row_to_booking(row: &PgRow) -> RepoResult<Booking> {
    let city: Option<String> = row.try_get("city")?;
    let country: Option<String> = row.try_get("country")?;
    let location = match (city, country) {
        (Some(city), Some(country)) => Some(Location { city, country }),
        _ => None,
    };

    let start: NaiveDate = row.try_get("stay_start")?;
    let end: NaiveDate = row.try_get("stay_end")?;
    let accommodation_type: String = row.try_get("accommodation_type")?;
    let status: String = row.try_get("status")?;
    let guest_capacity: Option<i32> = row.try_get("guest_capacity")?;

    Ok(Booking {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        location,
        date_range: DateRange { start, end },
        original_price_cents: row.try_get("original_price_cents")?,
        swap_value_cents: row.try_get("swap_value_cents")?,
        currency: row.try_get("currency")?,
        accommodation_type: accommodation_type.parse()?,
        guest_capacity: guest_capacity.map(|c| c as u32),
        status: status.parse()?,
    })
}

#[async_trait]
impl BookingDirectory for PostgresBookingDirectory {
    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_booking).transpose()
    }

    async fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> RepoResult<()> {
        let result = sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(format!("booking {} not found", id).into());
        }
        Ok(())
    }
}
