use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, QueryBuilder, Row};
use stayswap_core::repository::TargetEventLog;
use stayswap_core::RepoResult;
use stayswap_domain::{
    EventFilter, Page, PageRequest, SortOrder, TargetEvent, TargetStatus,
};

pub struct PostgresTargetEventLog {
    pub pool: PgPool,
}

fn row_to_event(row: &PgRow) -> RepoResult<TargetEvent> {
    let kind: String = row.try_get("kind")?;
    let from_status: Option<String> = row.try_get("from_status")?;
    let to_status: String = row.try_get("to_status")?;
    let severity: String = row.try_get("severity")?;

    let from_status = from_status
        .map(|s| s.parse::<TargetStatus>())
        .transpose()?;

    Ok(TargetEvent {
        id: row.try_get("id")?,
        edge_id: row.try_get("edge_id")?,
        source_swap_id: row.try_get("source_swap_id")?,
        target_swap_id: row.try_get("target_swap_id")?,
        actor: row.try_get("actor")?,
        kind: kind.parse()?,
        from_status,
        to_status: to_status.parse()?,
        severity: severity.parse()?,
        reason: row.try_get("reason")?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

fn push_filter(builder: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &EventFilter) {
    if let Some(actor) = filter.actor {
        builder.push(" AND actor = ").push_bind(actor);
    }
    if let Some(swap_id) = filter.swap_id {
        builder
            .push(" AND (source_swap_id = ")
            .push_bind(swap_id)
            .push(" OR target_swap_id = ")
            .push_bind(swap_id)
            .push(")");
    }
    if let Some(edge_id) = filter.edge_id {
        builder.push(" AND edge_id = ").push_bind(edge_id);
    }
    if let Some(kind) = filter.kind {
        builder.push(" AND kind = ").push_bind(kind.to_string());
    }
    if let Some(severity) = filter.severity {
        builder
            .push(" AND severity = ")
            .push_bind(severity.to_string());
    }
    if let Some(after) = filter.occurred_after {
        builder.push(" AND occurred_at >= ").push_bind(after);
    }
    if let Some(before) = filter.occurred_before {
        builder.push(" AND occurred_at <= ").push_bind(before);
    }
}

#[async_trait]
impl TargetEventLog for PostgresTargetEventLog {
    async fn append(&self, event: &TargetEvent) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO swap_target_events (id, edge_id, source_swap_id, target_swap_id, actor,
                                            kind, from_status, to_status, severity, reason, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(event.id)
        .bind(event.edge_id)
        .bind(event.source_swap_id)
        .bind(event.target_swap_id)
        .bind(event.actor)
        .bind(event.kind.to_string())
        .bind(event.from_status.map(|s| s.to_string()))
        .bind(event.to_status.to_string())
        .bind(event.severity.to_string())
        .bind(event.reason.clone())
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query(&self, filter: &EventFilter, page: &PageRequest) -> RepoResult<Page<TargetEvent>> {
        let norm = page.normalized();

        let mut count_builder =
            QueryBuilder::new("SELECT COUNT(*) AS total FROM swap_target_events WHERE 1=1");
        push_filter(&mut count_builder, filter);
        let total: i64 = count_builder
            .build()
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let mut builder = QueryBuilder::new("SELECT * FROM swap_target_events WHERE 1=1");
        push_filter(&mut builder, filter);
        builder.push(match norm.sort {
            SortOrder::Asc => " ORDER BY occurred_at ASC",
            SortOrder::Desc => " ORDER BY occurred_at DESC",
        });
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(norm.per_page))
            .push(" OFFSET ")
            .push_bind(norm.offset() as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(row_to_event).collect::<RepoResult<Vec<_>>>()?;

        Ok(Page {
            items,
            total: total as u64,
            page: norm.page,
            per_page: norm.per_page,
        })
    }
}
