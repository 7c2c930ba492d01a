//! Inbound request handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::bulk::{BulkSettings, BulkSummary, ItemOutcome};
use crate::client::{CreateServiceRequest, CreateServiceResponse, ServiceResponse};
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Body of a bulk retrieval: a single id, a list, or neither.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkRetrieveRequest {
    pub service_id: Option<String>,
    pub service_ids: Vec<String>,
}

impl BulkRetrieveRequest {
    /// The list wins when non-empty; otherwise the single id; otherwise nothing.
    pub fn into_service_ids(self) -> Vec<String> {
        if !self.service_ids.is_empty() {
            return self.service_ids;
        }
        match self.service_id {
            Some(id) if !id.is_empty() => vec![id],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkQuery {
    pub include_results: bool,
}

/// Bulk response: `summary` always, `data` only when results were asked for.
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ItemOutcome>>,
    pub summary: BulkSummary,
}

fn validate_create(request: &CreateServiceRequest) -> Result<(), ApiError> {
    if request.resources.is_empty() {
        return Err(ApiError::BadRequest("resources must not be empty".to_string()));
    }
    if let Some(index) = request.resources.iter().position(|r| r.id.trim().is_empty()) {
        return Err(ApiError::BadRequest(format!("resources[{}].id must not be empty", index)));
    }
    Ok(())
}

pub async fn create_services(
    State(state): State<AppState>,
    payload: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateServiceResponse>), ApiError> {
    let Json(request) = payload?;
    validate_create(&request)?;

    let cancel = state.cancel.child_token();
    let created = state.client.create_services(&request, &cancel).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn retrieve_service(
    State(state): State<AppState>,
    Path(service_id): Path<String>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let cancel = state.cancel.child_token();
    let service = state.client.retrieve_service_by_id(&service_id, &cancel).await?;
    Ok(Json(service))
}

pub async fn retrieve_services_bulk(
    State(state): State<AppState>,
    Query(query): Query<BulkQuery>,
    payload: Result<Json<BulkRetrieveRequest>, JsonRejection>,
) -> Result<Json<BulkResponse>, ApiError> {
    let Json(request) = payload?;
    let service_ids = request.into_service_ids();

    let settings = BulkSettings::from(&**state.dynamic.load());
    tracing::info!(
        total_service_ids = service_ids.len(),
        parallelism = settings.parallelism,
        steps = settings.step_count,
        "Handling bulk retrieve request"
    );

    let report = state
        .orchestrator
        .run_with_deadline(
            service_ids,
            settings,
            &state.cancel,
            Duration::from_secs(state.bulk.deadline_secs),
        )
        .await?;

    Ok(Json(BulkResponse {
        data: query.include_results.then_some(report.outcomes),
        summary: report.summary,
    }))
}

pub async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness plus the state of every circuit breaker.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let breakers: serde_json::Map<String, serde_json::Value> = state
        .breakers
        .snapshot()
        .into_iter()
        .map(|(name, s)| (name, serde_json::Value::from(s.as_str())))
        .collect();

    Json(serde_json::json!({
        "status": "ready",
        "circuitBreakers": breakers,
    }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Resource;

    #[test]
    fn test_list_wins_over_single_id() {
        let request: BulkRetrieveRequest =
            serde_json::from_str(r#"{"serviceId": "x", "serviceIds": ["a", "b"]}"#).unwrap();
        assert_eq!(request.into_service_ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_single_id_and_empty_body() {
        let single: BulkRetrieveRequest = serde_json::from_str(r#"{"serviceId": "x"}"#).unwrap();
        assert_eq!(single.into_service_ids(), vec!["x"]);

        let empty: BulkRetrieveRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.into_service_ids().is_empty());

        let blank: BulkRetrieveRequest = serde_json::from_str(r#"{"serviceId": ""}"#).unwrap();
        assert!(blank.into_service_ids().is_empty());
    }

    #[test]
    fn test_create_validation() {
        assert!(validate_create(&CreateServiceRequest { resources: Vec::new() }).is_err());

        let blank_id = CreateServiceRequest {
            resources: vec![Resource {
                id: " ".to_string(),
                owners: Vec::new(),
            }],
        };
        assert!(validate_create(&blank_id).is_err());

        let valid = CreateServiceRequest {
            resources: vec![Resource {
                id: "r-1".to_string(),
                owners: Vec::new(),
            }],
        };
        assert!(validate_create(&valid).is_ok());
    }

    #[test]
    fn test_bulk_response_omits_data_by_default() {
        let body = serde_json::to_value(BulkResponse {
            data: None,
            summary: BulkSummary::default(),
        })
        .unwrap();
        assert!(body.get("data").is_none());
        assert_eq!(body["summary"]["totalRequests"], 0);
    }
}
