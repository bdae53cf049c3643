use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{DifferenceRow, EventRow, MarketDifferenceRow};
use crate::error::AppError;
use crate::types::{Category, ClassificationResult};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/events", get(get_events))
        .route("/differences", get(get_differences))
        .route("/markets/:id/differences", get(get_market_differences))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub volume: Option<f64>,
    pub liquidity: Option<f64>,
    pub category: Category,
    pub is_financial: bool,
    pub is_crypto: bool,
    pub is_big_event: bool,
}

#[derive(Serialize)]
pub struct DifferenceResponse {
    pub id: i64,
    pub entity_id: String,
    pub event_id: String,
    pub compared_at: i64,
    pub updated_at: i64,
    pub differences: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn get_events(
    State(state): State<ApiState>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let wanted = params
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let rows: Vec<EventRow> = sqlx::query_as(
        r#"
        SELECT id, title, description, category, end_date, resolution_source, active,
               volume, volume24hr, liquidity, liquidity_clob,
               is_financial, is_crypto, is_big_event, is_excluded
        FROM events
        WHERE active = 1
        ORDER BY volume DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let events = rows
        .into_iter()
        .map(|r| {
            let flags = ClassificationResult {
                is_financial: r.is_financial,
                is_crypto: r.is_crypto,
                is_big_event: r.is_big_event,
                is_excluded: r.is_excluded,
                is_relevant: !r.is_excluded,
            };
            EventResponse {
                id: r.id,
                title: r.title,
                volume: r.volume,
                liquidity: r.liquidity,
                category: flags.category(),
                is_financial: r.is_financial,
                is_crypto: r.is_crypto,
                is_big_event: r.is_big_event,
            }
        })
        .filter(|e| wanted.map_or(true, |c| e.category == c))
        .collect();

    Ok(Json(events))
}

async fn get_differences(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<DifferenceResponse>>, AppError> {
    let limit = params.limit.unwrap_or(50);

    let rows: Vec<DifferenceRow> = sqlx::query_as(
        r#"
        SELECT id, event_id, differences_data, compared_at, updated_at
        FROM data_differences
        ORDER BY compared_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    let diffs = rows
        .into_iter()
        .map(|r| DifferenceResponse {
            id: r.id,
            entity_id: r.event_id.clone(),
            event_id: r.event_id,
            compared_at: r.compared_at,
            updated_at: r.updated_at,
            differences: parse_payload(&r.differences_data),
        })
        .collect();

    Ok(Json(diffs))
}

async fn get_market_differences(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<DifferenceResponse>>, AppError> {
    let limit = params.limit.unwrap_or(100);

    let rows: Vec<MarketDifferenceRow> = sqlx::query_as(
        r#"
        SELECT id, market_id, event_id, differences_data, compared_at, updated_at
        FROM market_differences
        WHERE market_id = ?
        ORDER BY compared_at DESC
        LIMIT ?
        "#,
    )
    .bind(market_id)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    let diffs = rows
        .into_iter()
        .map(|r| DifferenceResponse {
            id: r.id,
            entity_id: r.market_id,
            event_id: r.event_id,
            compared_at: r.compared_at,
            updated_at: r.updated_at,
            differences: parse_payload(&r.differences_data),
        })
        .collect();

    Ok(Json(diffs))
}

/// Stored payloads are written by us; a corrupt one is served as null.
fn parse_payload(s: &str) -> serde_json::Value {
    serde_json::from_str(s).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::db::Store;
    use crate::types::{EventDifferenceRecord, FieldDelta};

    async fn seeded_state() -> (Store, ApiState) {
        let store = Store::in_memory().await;
        let delta = FieldDelta { old: 1_000.0, new: 3_000.0, difference: 2_000.0, percent_change: 200.0 };
        let records: Vec<_> = [10, 20]
            .into_iter()
            .map(|ts| EventDifferenceRecord {
                event_id: "e1".to_string(),
                fields: BTreeMap::from([("volume".to_string(), delta)]),
                markets: Vec::new(),
                compared_at: ts,
            })
            .collect();
        store.diff_writer().persist(&records).await.expect("persist");
        let state = ApiState { pool: store.pool().clone() };
        (store, state)
    }

    #[tokio::test]
    async fn differences_newest_first_with_limit() {
        let (_store, state) = seeded_state().await;
        let Json(diffs) = get_differences(State(state), Query(LimitQuery { limit: Some(1) }))
            .await
            .expect("handler");
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].compared_at, 20);
        assert_eq!(diffs[0].differences["volume"]["difference"], 2_000.0);
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let (_store, state) = seeded_state().await;
        let result = get_events(
            State(state),
            Query(EventsQuery { category: Some("sports".to_string()) }),
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn corrupt_payload_is_null() {
        assert_eq!(parse_payload("{broken"), serde_json::Value::Null);
    }
}
